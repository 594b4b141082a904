//! Core data models shared by the bundle, index, and query layers.
//!
//! These types describe the quote records stored in category files, the
//! line-oriented index entries derived from them, and the package metadata
//! written after each download.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One of the 12 fixed quote categories, identified by a letter `a`..`l`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Category(char);

impl Category {
    /// All categories in canonical order.
    pub const ALL: [Category; 12] = [
        Category('a'),
        Category('b'),
        Category('c'),
        Category('d'),
        Category('e'),
        Category('f'),
        Category('g'),
        Category('h'),
        Category('i'),
        Category('j'),
        Category('k'),
        Category('l'),
    ];

    /// Parse a single category letter.
    pub fn from_letter(letter: char) -> Option<Category> {
        if ('a'..='l').contains(&letter) {
            Some(Category(letter))
        } else {
            None
        }
    }

    /// Parse a list of categories from strings such as `"a"`, `"abc"`, or `"a,b"`.
    pub fn parse_many<S: AsRef<str>>(values: &[S]) -> Result<Vec<Category>, String> {
        let mut out: Vec<Category> = Vec::new();
        for value in values {
            for ch in value.as_ref().chars() {
                if ch == ',' || ch.is_whitespace() {
                    continue;
                }
                let category = Category::from_letter(ch).ok_or_else(|| {
                    format!("invalid category '{}', expected a letter from a to l", ch)
                })?;
                if !out.contains(&category) {
                    out.push(category);
                }
            }
        }
        Ok(out)
    }

    pub fn letter(self) -> char {
        self.0
    }

    /// Name of the category file inside the bundle (e.g. `a.json`).
    pub fn file_name(self) -> String {
        format!("{}.json", self.0)
    }

    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self.0 {
            'a' => "动画 (anime)",
            'b' => "漫画 (comic)",
            'c' => "游戏 (game)",
            'd' => "文学 (literature)",
            'e' => "原创 (original)",
            'f' => "来自网络 (internet)",
            'g' => "其他 (other)",
            'h' => "影视 (film & TV)",
            'i' => "诗词 (poetry)",
            'j' => "网易云 (NetEase Cloud Music)",
            'k' => "哲学 (philosophy)",
            _ => "抖机灵 (wit)",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(ch), None) => Category::from_letter(ch.to_ascii_lowercase())
                .ok_or_else(|| format!("invalid category '{}', expected a letter from a to l", s)),
            _ => Err(format!(
                "invalid category '{}', expected a single letter from a to l",
                s
            )),
        }
    }
}

/// A quote record as stored in a category file or returned by the API.
///
/// The record is kept exactly as read, so lookups and JSON output return
/// it unchanged: absent keys stay absent, explicit `null`s and fields this
/// crate does not interpret (`creator`, `reviewer`, ...) survive. Typed
/// access goes through the accessor methods, which treat a mistyped value
/// as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quote {
    record: Map<String, Value>,
}

impl Quote {
    /// Wrap a JSON value; `None` unless it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(record) => Some(Self { record }),
            _ => None,
        }
    }

    pub fn id(&self) -> Option<i64> {
        self.record.get("id").and_then(Value::as_i64)
    }

    /// Non-empty uuid, if any.
    pub fn uuid(&self) -> Option<&str> {
        self.str_field("uuid").filter(|u| !u.is_empty())
    }

    /// Category letter from the `type` field.
    pub fn category(&self) -> Option<&str> {
        self.str_field("type")
    }

    /// Quote text; empty when missing.
    pub fn text(&self) -> &str {
        self.str_field("hitokoto").unwrap_or_default()
    }

    pub fn from(&self) -> Option<&str> {
        self.str_field("from")
    }

    pub fn from_who(&self) -> Option<&str> {
        self.str_field("from_who")
    }

    /// Recorded length, or the character count of the text when absent.
    pub fn length(&self) -> u64 {
        self.record
            .get("length")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| self.text().chars().count() as u64)
    }

    /// Raw value of any field, interpreted or not.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.record.get(key)
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.record.get(key).and_then(Value::as_str)
    }
}

/// One line of `index.jsonl`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: i64,
    pub uuid: String,
    #[serde(rename = "type")]
    pub category: String,
    /// Category file path relative to the bundle root.
    pub file: String,
    pub length: u64,
}

/// One downloaded category file as recorded in `package-info.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub amount: u64,
    /// Mirror key that actually supplied this file.
    pub source: String,
    /// Hex SHA-256 of the persisted file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

/// Contents of `package-info.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageInfo {
    pub source: String,
    pub source_url: String,
    pub files_amount: usize,
    pub files: Vec<FileInfo>,
    pub amount: u64,
    pub last_update: DateTime<Utc>,
    pub last_check: DateTime<Utc>,
    #[serde(default)]
    pub source_usage: BTreeMap<String, usize>,
    #[serde(default)]
    pub failed_types: Vec<String>,
}
