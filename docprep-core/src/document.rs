//! The document payload carried inside a [`crate::task::Task`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An author attribution on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub institution: String,
}

/// A single keyword tag on a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub name: String,
}

/// The document a [`crate::task::Task`] asks the pipeline to process.
///
/// `file_name` is the object key within the PDF bucket and may itself contain
/// `/`; the pipeline derives a "stem" from it (the key without its extension)
/// to address the preprocessed-artifact prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub title: String,

    #[serde(default)]
    pub authors: Vec<Author>,

    #[serde(default)]
    pub keywords: Vec<Keyword>,

    pub file_name: String,

    #[serde(alias = "doc_type")]
    pub doc_type: String,

    /// Overrides the default PDF bucket when non-empty.
    #[serde(default)]
    pub bucket: Option<String>,

    #[serde(default)]
    pub publication_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub language: Option<String>,
}

impl Document {
    /// The object key stem: `file_name` with its final extension removed.
    ///
    /// `"papers/a.pdf"` -> `"papers/a"`; a file name without a `.` is
    /// returned unchanged.
    #[must_use]
    pub fn stem(&self) -> &str {
        match self.file_name.rfind('.') {
            Some(idx) => &self.file_name[..idx],
            None => &self.file_name,
        }
    }

    /// JSON metadata derived from this document, repeated across every
    /// chunk/row the pipeline stores for it.
    #[must_use]
    pub fn to_metadata(&self) -> serde_json::Value {
        serde_json::json!({
            "title": self.title,
            "authors": self.authors,
            "keywords": self.keywords,
            "publicationDate": self.publication_date,
            "language": self.language,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stem_strips_extension_but_keeps_directory() {
        let doc = sample_document("papers/a.pdf");
        assert_eq!(doc.stem(), "papers/a");
    }

    #[test]
    fn stem_is_unchanged_without_extension() {
        let doc = sample_document("README");
        assert_eq!(doc.stem(), "README");
    }

    #[test]
    fn accepts_doc_type_and_doctype_aliases() {
        let camel = serde_json::json!({
            "title": "Doc A", "authors": [], "keywords": [],
            "fileName": "a.pdf", "docType": "paper"
        });
        let snake = serde_json::json!({
            "title": "Doc A", "authors": [], "keywords": [],
            "fileName": "a.pdf", "doc_type": "paper"
        });
        let a: Document = serde_json::from_value(camel).unwrap();
        let b: Document = serde_json::from_value(snake).unwrap();
        assert_eq!(a, b);
    }

    fn sample_document(file_name: &str) -> Document {
        Document {
            title: "t".into(),
            authors: vec![],
            keywords: vec![],
            file_name: file_name.into(),
            doc_type: "paper".into(),
            bucket: None,
            publication_date: None,
            language: None,
        }
    }
}
