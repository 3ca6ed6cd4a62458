//! Slash-delimited command path tokenizer.
//!
//! Commands arrive as paths like `lego/train/switch/0/1`. [`PathTokenizer`]
//! walks such a path with an explicit cursor and hands out borrowed slices,
//! so two transports can tokenize at the same time without sharing buffers.
//!
//! # Example
//!
//! ```rust
//! use rs_trackside::tokenizer::PathTokenizer;
//!
//! let mut tokens = PathTokenizer::new("lego/train/config");
//! assert_eq!(tokens.next_token(), "lego");
//! assert_eq!(tokens.next_token(), "train");
//! assert_eq!(tokens.next_token(), "config");
//! assert_eq!(tokens.next_token(), "");
//! ```

use crate::config::truncate_at_char_boundary;

/// Path segment separator.
pub const DELIMITER: char = '/';

/// Longest token handed out, in bytes. Longer segments are truncated.
pub const MAX_TOKEN_LEN: usize = 32;

/// Cursor-based tokenizer over an immutable command string.
///
/// Never fails: once the input is exhausted every call returns `""`.
#[derive(Clone, Debug)]
pub struct PathTokenizer<'a> {
    input: &'a str,
    cursor: usize,
}

impl<'a> PathTokenizer<'a> {
    /// Start tokenizing `input` from the beginning.
    pub fn new(input: &'a str) -> Self {
        Self::with_cursor(input, 0)
    }

    /// Resume tokenizing `input` at a caller-held cursor.
    ///
    /// A cursor past the end, or inside a multi-byte character, is moved to
    /// the end of the input.
    pub fn with_cursor(input: &'a str, cursor: usize) -> Self {
        let cursor = if input.is_char_boundary(cursor) {
            cursor
        } else {
            input.len()
        };
        Self { input, cursor }
    }

    /// Byte offset of the next unread character.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Input that has not been tokenized yet.
    pub fn remaining(&self) -> &'a str {
        &self.input[self.cursor..]
    }

    /// True once every token has been handed out.
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.input.len()
    }

    /// Return the next token and advance past its delimiter.
    pub fn next_token(&mut self) -> &'a str {
        let rest = self.remaining();
        let (token, consumed) = match rest.find(DELIMITER) {
            Some(end) => (&rest[..end], end + DELIMITER.len_utf8()),
            None => (rest, rest.len()),
        };
        self.cursor += consumed;
        truncate_at_char_boundary(token, MAX_TOKEN_LEN)
    }
}

impl<'a> Iterator for PathTokenizer<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_exhausted() {
            None
        } else {
            Some(self.next_token())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_on_slash() {
        let mut t = PathTokenizer::new("lego/train/switch/0/1");
        assert_eq!(t.next_token(), "lego");
        assert_eq!(t.next_token(), "train");
        assert_eq!(t.next_token(), "switch");
        assert_eq!(t.next_token(), "0");
        assert_eq!(t.next_token(), "1");
        assert!(t.is_exhausted());
    }

    #[test]
    fn exhausted_input_yields_empty_tokens() {
        let mut t = PathTokenizer::new("a");
        assert_eq!(t.next_token(), "a");
        assert_eq!(t.next_token(), "");
        assert_eq!(t.next_token(), "");
    }

    #[test]
    fn empty_segments_are_empty_tokens() {
        let mut t = PathTokenizer::new("a//b/");
        assert_eq!(t.next_token(), "a");
        assert_eq!(t.next_token(), "");
        assert_eq!(t.next_token(), "b");
        assert!(t.is_exhausted());
        assert_eq!(t.next_token(), "");
    }

    #[test]
    fn cursor_advances_past_delimiter() {
        let mut t = PathTokenizer::new("ab/cd");
        assert_eq!(t.cursor(), 0);
        t.next_token();
        assert_eq!(t.cursor(), 3);
        assert_eq!(t.remaining(), "cd");
        t.next_token();
        assert_eq!(t.cursor(), 5);
    }

    #[test]
    fn resumes_from_caller_cursor() {
        let input = "lego/train/config";
        let mut first = PathTokenizer::new(input);
        first.next_token();
        let cursor = first.cursor();

        let mut resumed = PathTokenizer::with_cursor(input, cursor);
        assert_eq!(resumed.next_token(), "train");
    }

    #[test]
    fn cursor_out_of_range_is_clamped() {
        let mut t = PathTokenizer::with_cursor("abc", 99);
        assert!(t.is_exhausted());
        assert_eq!(t.next_token(), "");
    }

    #[test]
    fn long_tokens_are_truncated() {
        let long = "x".repeat(100);
        let input = alloc::format!("{}/next", long);
        let mut t = PathTokenizer::new(&input);
        assert_eq!(t.next_token().len(), MAX_TOKEN_LEN);
        // The cursor still skips the whole segment
        assert_eq!(t.next_token(), "next");
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let input = "\u{e9}".repeat(40); // 2 bytes each
        let mut t = PathTokenizer::new(&input);
        let token = t.next_token();
        assert_eq!(token.len(), MAX_TOKEN_LEN);
        assert!(token.chars().all(|c| c == '\u{e9}'));
    }

    #[test]
    fn iterator_stops_at_end() {
        let tokens: alloc::vec::Vec<&str> = PathTokenizer::new("a/b/c").collect();
        assert_eq!(tokens, ["a", "b", "c"]);
    }
}
