//! # Content Typing
//!
//! Decides the MIME type and text/binary disposition of a resolved entry and
//! turns its stored content into a response body.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;

use crate::error::Result;
use crate::manifest::FileEntry;

pub const OCTET_STREAM: &str = "application/octet-stream";

const MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("wasm", "application/wasm"),
    ("txt", "text/plain"),
    ("xml", "application/xml"),
    ("webp", "image/webp"),
    ("mp3", "audio/mpeg"),
    ("ogg", "audio/ogg"),
    ("wav", "audio/wav"),
];

const TEXT_EXTENSIONS: &[&str] = &[
    "html", "htm", "css", "js", "mjs", "json", "xml", "txt", "md", "csv", "svg",
];

/// Lower-cased extension of the last path segment, empty if it has none.
pub fn extension(path: &str) -> String {
    let segment = path.rsplit(['/', '\\']).next().unwrap_or(path);
    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .unwrap_or_default()
}

/// MIME type for an extension; unknown extensions are octet streams.
pub fn mime_for_extension(ext: &str) -> &'static str {
    MIME_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(OCTET_STREAM)
}

/// Whether files with this extension are served as text.
pub fn is_text_extension(ext: &str) -> bool {
    TEXT_EXTENSIONS.contains(&ext)
}

/// A resolved entry with its serving decisions made
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypedContent<'a> {
    pub content: &'a str,
    pub mime_type: &'a str,
    pub is_binary: bool,
}

/// Work out how to serve `entry`, which was found under `matched_path`.
///
/// Hints declared on a structured entry take precedence; whatever is not
/// declared is inferred from the extension of `matched_path`.
pub fn type_of<'a>(entry: &'a FileEntry, matched_path: &str) -> TypedContent<'a> {
    let ext = extension(matched_path);
    let inferred_mime = mime_for_extension(&ext);
    let inferred_binary = !is_text_extension(&ext);

    match entry {
        FileEntry::Structured(structured) => TypedContent {
            content: &structured.content,
            mime_type: structured.declared_mime().unwrap_or(inferred_mime),
            is_binary: structured.declared_binary().unwrap_or(inferred_binary),
        },
        FileEntry::Raw(content) => TypedContent {
            content,
            mime_type: inferred_mime,
            is_binary: inferred_binary,
        },
    }
}

impl TypedContent<'_> {
    /// `Content-Type` header value; text gets an explicit UTF-8 charset.
    pub fn content_type(&self) -> String {
        if self.is_binary {
            self.mime_type.to_owned()
        } else {
            format!("{}; charset=utf-8", self.mime_type)
        }
    }

    /// Response body: base64-decoded bytes for binary content, the stored
    /// text otherwise.
    pub fn decode(&self) -> Result<Bytes> {
        if self.is_binary {
            Ok(Bytes::from(STANDARD.decode(self.content)?))
        } else {
            Ok(Bytes::copy_from_slice(self.content.as_bytes()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LoaderError;
    use crate::manifest::StructuredEntry;

    #[test]
    fn test_extension() {
        assert_eq!(extension("index.HTML"), "html");
        assert_eq!(extension("assets/archive.tar.gz"), "gz");
        assert_eq!(extension("README"), "");
        assert_eq!(extension("v1.2/LICENSE"), "");
        assert_eq!(extension("win\\style.css"), "css");
    }

    #[test]
    fn test_raw_entry_typed_by_extension() {
        let entry = FileEntry::raw("body { color: red }");
        let typed = type_of(&entry, "css/Main.CSS");
        assert_eq!(typed.mime_type, "text/css");
        assert!(!typed.is_binary);
        assert_eq!(typed.content_type(), "text/css; charset=utf-8");
    }

    #[test]
    fn test_text_extensions_without_table_entry() {
        let entry = FileEntry::raw("# notes");
        let typed = type_of(&entry, "NOTES.md");
        assert_eq!(typed.mime_type, OCTET_STREAM);
        assert!(!typed.is_binary);
    }

    #[test]
    fn test_unknown_extension_defaults_to_binary_octet_stream() {
        let entry = FileEntry::raw("AAEC");
        let typed = type_of(&entry, "data/level.bin");
        assert_eq!(typed.mime_type, OCTET_STREAM);
        assert!(typed.is_binary);
        assert_eq!(typed.content_type(), OCTET_STREAM);

        let typed = type_of(&entry, "Makefile");
        assert_eq!(typed.mime_type, OCTET_STREAM);
        assert!(typed.is_binary);
    }

    #[test]
    fn test_structured_hints_override_extension() {
        let entry = FileEntry::from(
            StructuredEntry::new("hello")
                .with_mime_type("text/x-custom")
                .with_is_binary(false),
        );
        let typed = type_of(&entry, "blob.bin");
        assert_eq!(typed.mime_type, "text/x-custom");
        assert!(!typed.is_binary);
    }

    #[test]
    fn test_structured_without_hints_falls_back_to_extension() {
        let entry = FileEntry::from(StructuredEntry::new("iVBORw0KGgo="));
        let typed = type_of(&entry, "img/logo.png");
        assert_eq!(typed.mime_type, "image/png");
        assert!(typed.is_binary);

        let entry = FileEntry::from(StructuredEntry::new("").with_mime("text/html"));
        let typed = type_of(&entry, "index.html");
        assert_eq!(typed.content, "");
        assert!(!typed.is_binary);
    }

    #[test]
    fn test_null_binary_flag_serves_text() {
        let entry = FileEntry::from_value(serde_json::json!({
            "content": "not base64",
            "binary": null,
            "isBinary": true
        }));
        let typed = type_of(&entry, "sprite.png");
        assert_eq!(typed.mime_type, "image/png");
        assert!(!typed.is_binary);
        assert_eq!(typed.decode().unwrap(), Bytes::from("not base64"));
    }

    #[test]
    fn test_text_body_is_verbatim() {
        let text = "console.log('héllo');\n";
        let entry = FileEntry::raw(text);
        let body = type_of(&entry, "main.js").decode().unwrap();
        assert_eq!(body, Bytes::from(text));
    }

    #[test]
    fn test_binary_body_round_trips_through_base64() {
        let encoded = "iVBORw0KGgoAAAANSUhEUg==";
        let entry = FileEntry::raw(encoded);
        let body = type_of(&entry, "logo.png").decode().unwrap();

        assert_eq!(&body[..4], b"\x89PNG");
        assert_eq!(STANDARD.encode(&body), encoded);
    }

    #[test]
    fn test_malformed_base64_is_a_decode_error() {
        let entry = FileEntry::from(StructuredEntry::new("not base64!").with_binary(true));
        let err = type_of(&entry, "x.png").decode().unwrap_err();
        assert!(matches!(err, LoaderError::Decode(_)));
    }
}
