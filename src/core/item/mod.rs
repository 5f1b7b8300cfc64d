//! # Item Module
//!
//! The values that flow through pipeline channels.
//!
//! Every item has one canonical textual form, its `Display` output. Stages
//! hash that form, so `Item::Int(7)` and `Item::Text("7".into())` produce the
//! same signature.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::BufRead;

/// A value carried between pipeline stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item {
    /// An integer input, rendered in decimal
    Int(i64),
    /// Free-form text, rendered verbatim
    Text(String),
}

impl Item {
    /// Parse a line of input. Integers become `Int`, anything else `Text`.
    ///
    /// Only lines already in canonical decimal form are treated as integers,
    /// so parsing never changes the text that gets hashed.
    pub fn parse(line: &str) -> Self {
        match line.parse::<i64>() {
            Ok(n) if n.to_string() == line => Item::Int(n),
            _ => Item::Text(line.to_string()),
        }
    }

    /// Canonical string form used by every hashing stage
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Item::Int(n) => write!(f, "{}", n),
            Item::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Item {
    fn from(n: i64) -> Self {
        Item::Int(n)
    }
}

impl From<i32> for Item {
    fn from(n: i32) -> Self {
        Item::Int(i64::from(n))
    }
}

impl From<u32> for Item {
    fn from(n: u32) -> Self {
        Item::Int(i64::from(n))
    }
}

impl From<String> for Item {
    fn from(s: String) -> Self {
        Item::Text(s)
    }
}

impl From<&str> for Item {
    fn from(s: &str) -> Self {
        Item::Text(s.to_string())
    }
}

/// Read items one per line, skipping blank lines.
///
/// Surrounding whitespace is trimmed before parsing.
pub fn read_items<R: BufRead>(reader: R) -> std::io::Result<Vec<Item>> {
    let mut items = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        items.push(Item::parse(trimmed));
    }
    Ok(items)
}
