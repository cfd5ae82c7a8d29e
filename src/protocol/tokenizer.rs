//! Command Tokenizers
//!
//! Incoming commands arrive as one trimmed line of text. Most commands are
//! split on plain whitespace, but SET accepts a double-quoted value so that
//! stored strings may contain literal spaces:
//!
//! ```text
//! SET greeting "hello world"     ->  ["SET", "greeting", "hello world"]
//! ```
//!
//! Quote characters toggle quoting and are stripped from the token; an
//! unterminated quote silently runs to the end of the line. Consecutive
//! separators never produce empty tokens.

/// Splits a line on whitespace, with no quote awareness.
///
/// This is the tokenizer used by every command except SET.
pub fn split_plain(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

/// Splits a line on spaces outside double quotes, stripping the quotes.
///
/// Only SET routes its line through here, so a value argument may carry
/// embedded spaces. Quotes may open and close anywhere in a token; the
/// quoted span is joined onto whatever surrounds it.
pub fn split_quoted(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in line.chars() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ' ' if !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}
