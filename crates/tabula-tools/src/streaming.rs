// SPDX-FileCopyrightText: 2026 Tabula Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Incremental JSON accumulation for streamed tool-call arguments.
//!
//! Model backends deliver tool-call arguments as partial JSON fragments.
//! [`JsonStreamParser`] accumulates fragments, tracks nesting and string
//! state as bytes arrive, and can attempt a bounded repair of a truncated
//! document: close an open string, then close unbalanced objects and
//! arrays in nesting order. Repair is capped so garbage input fails fast
//! instead of ballooning.

use serde_json::Value;

/// Maximum number of closing delimiters a repair pass may append.
const MAX_REPAIR_CLOSERS: usize = 16;

/// Nesting frame kinds tracked while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Object,
    Array,
}

/// Accumulates streamed JSON fragments and tracks parse state.
#[derive(Debug, Default)]
pub struct JsonStreamParser {
    buf: String,
    stack: Vec<Frame>,
    in_string: bool,
    escaped: bool,
}

impl JsonStreamParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a fragment and updates nesting/string state.
    pub fn feed(&mut self, fragment: &str) {
        for c in fragment.chars() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '{' => self.stack.push(Frame::Object),
                '[' => self.stack.push(Frame::Array),
                '}' => {
                    if self.stack.last() == Some(&Frame::Object) {
                        self.stack.pop();
                    }
                }
                ']' => {
                    if self.stack.last() == Some(&Frame::Array) {
                        self.stack.pop();
                    }
                }
                _ => {}
            }
        }
        self.buf.push_str(fragment);
    }

    /// Accumulated text so far.
    pub fn buffer(&self) -> &str {
        &self.buf
    }

    /// Whether all opened strings, objects, and arrays are closed.
    pub fn is_balanced(&self) -> bool {
        !self.in_string && self.stack.is_empty()
    }

    /// Depth of currently open objects/arrays.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Parses the buffer as-is, without repair.
    pub fn parse(&self) -> Option<Value> {
        serde_json::from_str(self.buf.trim()).ok()
    }

    /// Parses the buffer, attempting a bounded repair if it is truncated.
    ///
    /// Repair closes an open string literal, strips a dangling `,` or `:`,
    /// then appends closers for unbalanced frames in nesting order. At most
    /// [`MAX_REPAIR_CLOSERS`] closers are appended; deeper nesting is
    /// treated as unrecoverable.
    pub fn parse_with_repair(&self) -> Option<Value> {
        if let Some(value) = self.parse() {
            return Some(value);
        }
        if self.stack.len() > MAX_REPAIR_CLOSERS {
            return None;
        }

        let mut repaired = self.buf.trim_end().to_string();
        if self.in_string {
            if self.escaped {
                repaired.pop();
            }
            repaired.push('"');
        }
        // A fragment cut right after a comma or key separator leaves a
        // dangling token that no closer can fix.
        while repaired.ends_with(',') || repaired.ends_with(':') {
            repaired.pop();
            while repaired.ends_with(char::is_whitespace) {
                repaired.pop();
            }
        }
        for frame in self.stack.iter().rev() {
            repaired.push(match frame {
                Frame::Object => '}',
                Frame::Array => ']',
            });
        }
        serde_json::from_str(repaired.trim()).ok()
    }

    /// Clears all accumulated state.
    pub fn reset(&mut self) {
        self.buf.clear();
        self.stack.clear();
        self.in_string = false;
        self.escaped = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_document_parses_without_repair() {
        let mut p = JsonStreamParser::new();
        p.feed(r#"{"sql": "SELECT 1"}"#);
        assert!(p.is_balanced());
        assert_eq!(p.parse().unwrap()["sql"], "SELECT 1");
    }

    #[test]
    fn fragments_accumulate_across_feeds() {
        let mut p = JsonStreamParser::new();
        p.feed(r#"{"table": "#);
        assert!(!p.is_balanced());
        assert_eq!(p.depth(), 1);
        p.feed(r#""orders"}"#);
        assert!(p.is_balanced());
        assert_eq!(p.parse().unwrap()["table"], "orders");
    }

    #[test]
    fn repair_closes_truncated_object() {
        let mut p = JsonStreamParser::new();
        p.feed(r#"{"sql": "SELECT count(*) FROM orders"#);
        assert!(p.parse().is_none());
        let v = p.parse_with_repair().unwrap();
        assert_eq!(v["sql"], "SELECT count(*) FROM orders");
    }

    #[test]
    fn repair_closes_nested_structures_in_order() {
        let mut p = JsonStreamParser::new();
        p.feed(r#"{"tables": ["orders", "customers""#);
        let v = p.parse_with_repair().unwrap();
        assert_eq!(v["tables"][1], "customers");
    }

    #[test]
    fn repair_strips_dangling_comma() {
        let mut p = JsonStreamParser::new();
        p.feed(r#"{"a": 1,"#);
        let v = p.parse_with_repair().unwrap();
        assert_eq!(v["a"], 1);
    }

    #[test]
    fn braces_inside_strings_do_not_affect_nesting() {
        let mut p = JsonStreamParser::new();
        p.feed(r#"{"sql": "SELECT '{' FROM t"#);
        assert_eq!(p.depth(), 1);
        let v = p.parse_with_repair().unwrap();
        assert_eq!(v["sql"], "SELECT '{' FROM t");
    }

    #[test]
    fn escaped_quote_keeps_string_open() {
        let mut p = JsonStreamParser::new();
        p.feed(r#"{"note": "he said \"hi\"", "n": 1}"#);
        assert!(p.is_balanced());
        assert_eq!(p.parse().unwrap()["n"], 1);
    }

    #[test]
    fn repair_gives_up_beyond_the_closer_cap() {
        let mut p = JsonStreamParser::new();
        p.feed(&"[".repeat(MAX_REPAIR_CLOSERS + 1));
        assert!(p.parse_with_repair().is_none());
    }

    #[test]
    fn reset_clears_state() {
        let mut p = JsonStreamParser::new();
        p.feed(r#"{"a": ["#);
        p.reset();
        assert!(p.buffer().is_empty());
        assert!(p.is_balanced());
    }
}
