//! # Bundle Manifests
//!
//! A manifest is the record stored per bundle id. Its `files` mapping is kept
//! as an ordered snapshot so that every "first match wins" decision made by
//! the resolver follows the order in which the record listed its files.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::error::Result;

/// A structured file record: content plus optional typing hints.
///
/// Both spellings of each hint are kept because precedence between them is
/// decided when the file is served, not when the record is read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructuredEntry {
    /// Raw text, or standard base64 for binary files
    pub content: String,
    /// `mime` field
    pub mime: Option<String>,
    /// `mimeType` field
    pub mime_type: Option<String>,
    /// `binary` field
    pub binary: Option<bool>,
    /// `isBinary` field
    pub is_binary: Option<bool>,
}

impl StructuredEntry {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Set the `mime` field
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Set the `mimeType` field
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Set the `binary` field
    pub fn with_binary(mut self, binary: bool) -> Self {
        self.binary = Some(binary);
        self
    }

    /// Set the `isBinary` field
    pub fn with_is_binary(mut self, is_binary: bool) -> Self {
        self.is_binary = Some(is_binary);
        self
    }

    /// The declared MIME type, `mime` before `mimeType`. Empty strings count
    /// as undeclared.
    pub fn declared_mime(&self) -> Option<&str> {
        [self.mime.as_deref(), self.mime_type.as_deref()]
            .into_iter()
            .flatten()
            .find(|mime| !mime.is_empty())
    }

    /// The declared disposition, `binary` before `isBinary`.
    pub fn declared_binary(&self) -> Option<bool> {
        self.binary.or(self.is_binary)
    }
}

/// One file of a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEntry {
    /// The stored value is the content itself
    Raw(String),
    /// The stored value is a record with a `content` field
    Structured(StructuredEntry),
}

impl FileEntry {
    pub fn raw(content: impl Into<String>) -> Self {
        FileEntry::Raw(content.into())
    }

    /// Classify a stored JSON value.
    ///
    /// Strings are raw content and objects carrying a `content` key are
    /// structured. Anything else is served as its JSON text.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::String(content) => FileEntry::Raw(content),
            Value::Object(mut fields) if fields.contains_key("content") => {
                let content = fields
                    .remove("content")
                    .map(value_to_text)
                    .unwrap_or_default();
                FileEntry::Structured(StructuredEntry {
                    content,
                    mime: take_string(&mut fields, "mime"),
                    mime_type: take_string(&mut fields, "mimeType"),
                    binary: take_flag(&mut fields, "binary"),
                    is_binary: take_flag(&mut fields, "isBinary"),
                })
            }
            other => FileEntry::Raw(other.to_string()),
        }
    }

    /// The stored content string, regardless of variant.
    pub fn content(&self) -> &str {
        match self {
            FileEntry::Raw(content) => content,
            FileEntry::Structured(entry) => &entry.content,
        }
    }
}

impl From<StructuredEntry> for FileEntry {
    fn from(entry: StructuredEntry) -> Self {
        FileEntry::Structured(entry)
    }
}

fn value_to_text(value: Value) -> String {
    match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(text)) => Some(text),
        _ => None,
    }
}

/// A present flag counts as declared whatever its type; `null` and other
/// falsy values declare `false`.
fn take_flag(fields: &mut Map<String, Value>, key: &str) -> Option<bool> {
    fields.remove(key).map(|value| is_truthy(&value))
}

/// Ordered mapping from path to file entry.
///
/// Iteration follows insertion order. Re-inserting a path replaces the entry
/// but keeps the position of the first insertion.
#[derive(Debug, Clone, Default)]
pub struct FileMap {
    entries: Vec<(String, FileEntry)>,
    index: HashMap<String, usize>,
}

impl FileMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, entry: FileEntry) {
        let path = path.into();
        match self.index.get(&path) {
            Some(&slot) => self.entries[slot].1 = entry,
            None => {
                self.index.insert(path.clone(), self.entries.len());
                self.entries.push((path, entry));
            }
        }
    }

    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.index.get(path).map(|&slot| &self.entries[slot].1)
    }

    pub fn get_key_value(&self, path: &str) -> Option<(&str, &FileEntry)> {
        self.index.get(path).map(|&slot| {
            let (path, entry) = &self.entries[slot];
            (path.as_str(), entry)
        })
    }

    /// Entries in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FileEntry)> {
        self.entries
            .iter()
            .map(|(path, entry)| (path.as_str(), entry))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for FileMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for FileMap {}

impl<P: Into<String>> FromIterator<(P, FileEntry)> for FileMap {
    fn from_iter<I: IntoIterator<Item = (P, FileEntry)>>(iter: I) -> Self {
        let mut files = FileMap::new();
        for (path, entry) in iter {
            files.insert(path, entry);
        }
        files
    }
}

/// The record stored for a bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleManifest {
    /// `None` when the record has no usable `files` mapping. The router
    /// treats such a bundle as missing.
    pub files: Option<FileMap>,
}

impl BundleManifest {
    pub fn with_files(files: FileMap) -> Self {
        Self { files: Some(files) }
    }

    /// Build a manifest from a stored record.
    ///
    /// Falsy records (`null`, `false`, `0`, `""`) are no record at all.
    pub fn from_record(record: Value) -> Option<Self> {
        if !is_truthy(&record) {
            return None;
        }

        let files = match record {
            Value::Object(mut fields) => match fields.remove("files") {
                Some(Value::Object(files)) => Some(
                    files
                        .into_iter()
                        .map(|(path, value)| (path, FileEntry::from_value(value)))
                        .collect(),
                ),
                _ => None,
            },
            _ => None,
        };

        Some(Self { files })
    }

    /// Parse a stored JSON record.
    pub fn parse(json: &str) -> Result<Option<Self>> {
        let record: Value = serde_json::from_str(json)?;
        Ok(Self::from_record(record))
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_files_keep_record_order() {
        let manifest = BundleManifest::parse(
            r#"{"files": {"z.js": "1", "a.js": "2", "m/index.html": "3"}}"#,
        )
        .unwrap()
        .unwrap();

        let paths: Vec<&str> = manifest
            .files
            .as_ref()
            .unwrap()
            .iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec!["z.js", "a.js", "m/index.html"]);
    }

    #[test]
    fn test_duplicate_keys_last_write_wins() {
        let manifest = BundleManifest::parse(r#"{"files": {"a": "old", "b": "x", "a": "new"}}"#)
            .unwrap()
            .unwrap();
        let files = manifest.files.unwrap();

        assert_eq!(files.len(), 2);
        assert_eq!(files.get("a"), Some(&FileEntry::raw("new")));
        assert_eq!(files.iter().next().unwrap().0, "a");
    }

    #[test]
    fn test_falsy_records_are_absent() {
        for record in [json!(null), json!(false), json!(0), json!("")] {
            assert!(BundleManifest::from_record(record).is_none());
        }
    }

    #[test]
    fn test_record_without_files_has_no_file_set() {
        let manifest = BundleManifest::from_record(json!({"name": "demo"})).unwrap();
        assert!(manifest.files.is_none());

        let manifest = BundleManifest::from_record(json!({"files": "nope"})).unwrap();
        assert!(manifest.files.is_none());

        let manifest = BundleManifest::from_record(json!("just a string")).unwrap();
        assert!(manifest.files.is_none());
    }

    #[test]
    fn test_entry_classification() {
        assert_eq!(
            FileEntry::from_value(json!("<html></html>")),
            FileEntry::raw("<html></html>")
        );

        let structured = FileEntry::from_value(json!({
            "content": "AAEC",
            "mimeType": "image/png",
            "isBinary": true
        }));
        assert_eq!(
            structured,
            FileEntry::Structured(
                StructuredEntry::new("AAEC")
                    .with_mime_type("image/png")
                    .with_is_binary(true)
            )
        );

        // Object without content is served as its JSON text
        assert_eq!(
            FileEntry::from_value(json!({"size": 3})),
            FileEntry::raw(r#"{"size":3}"#)
        );
    }

    #[test]
    fn test_empty_content_is_still_structured() {
        let entry = FileEntry::from_value(json!({"content": "", "mime": "text/plain"}));
        match entry {
            FileEntry::Structured(entry) => {
                assert_eq!(entry.content, "");
                assert_eq!(entry.declared_mime(), Some("text/plain"));
            }
            other => panic!("expected structured entry, got {other:?}"),
        }
    }

    #[test]
    fn test_present_binary_flag_is_declared_even_when_null() {
        let entry = FileEntry::from_value(json!({
            "content": "plain text",
            "binary": null,
            "isBinary": true
        }));
        match entry {
            FileEntry::Structured(entry) => {
                assert_eq!(entry.binary, Some(false));
                assert_eq!(entry.declared_binary(), Some(false));
            }
            other => panic!("expected structured entry, got {other:?}"),
        }

        let entry = FileEntry::from_value(json!({"content": "AAE=", "isBinary": 1}));
        match entry {
            FileEntry::Structured(entry) => assert_eq!(entry.declared_binary(), Some(true)),
            other => panic!("expected structured entry, got {other:?}"),
        }
    }

    #[test]
    fn test_hint_precedence() {
        let entry = StructuredEntry::new("x")
            .with_mime("text/css")
            .with_mime_type("text/plain")
            .with_binary(false)
            .with_is_binary(true);
        assert_eq!(entry.declared_mime(), Some("text/css"));
        assert_eq!(entry.declared_binary(), Some(false));

        let entry = StructuredEntry::new("x").with_mime("").with_mime_type("font/ttf");
        assert_eq!(entry.declared_mime(), Some("font/ttf"));
        assert_eq!(entry.declared_binary(), None);
    }
}
