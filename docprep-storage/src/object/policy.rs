//! Bucket-defaulting policy shared by every [`super::ObjectStore`] implementation.
//!
//! Uploads and existence checks default to the preprocessed-artifacts bucket;
//! downloads pick the preprocessed bucket only when the key looks like a
//! derived artifact (`contains a '/'` and does not end in `.pdf`), otherwise
//! the source PDF bucket. An explicit `bucket` argument always wins.

/// Names of the two buckets an ingestion worker talks to.
#[derive(Debug, Clone)]
pub struct BucketPolicy {
    pub pdf_bucket: String,
    pub preprocessed_bucket: String,
}

impl BucketPolicy {
    #[must_use]
    pub fn new(pdf_bucket: impl Into<String>, preprocessed_bucket: impl Into<String>) -> Self {
        Self {
            pdf_bucket: pdf_bucket.into(),
            preprocessed_bucket: preprocessed_bucket.into(),
        }
    }

    /// Bucket an `upload` call should target absent an explicit override.
    #[must_use]
    pub fn upload_bucket<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit.unwrap_or(&self.preprocessed_bucket)
    }

    /// Bucket an `exists` check should target absent an explicit override.
    #[must_use]
    pub fn exists_bucket<'a>(&'a self, explicit: Option<&'a str>) -> &'a str {
        explicit.unwrap_or(&self.preprocessed_bucket)
    }

    /// Bucket a `download` call should target absent an explicit override.
    #[must_use]
    pub fn download_bucket<'a>(&'a self, object_name: &str, explicit: Option<&'a str>) -> &'a str {
        if let Some(bucket) = explicit {
            return bucket;
        }
        let looks_derived = object_name.contains('/') && !object_name.to_lowercase().ends_with(".pdf");
        if looks_derived {
            &self.preprocessed_bucket
        } else {
            &self.pdf_bucket
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> BucketPolicy {
        BucketPolicy::new("mybucket", "prep")
    }

    #[test]
    fn upload_and_exists_default_to_preprocessed() {
        let p = policy();
        assert_eq!(p.upload_bucket(None), "prep");
        assert_eq!(p.exists_bucket(None), "prep");
    }

    #[test]
    fn download_of_bare_pdf_uses_pdf_bucket() {
        let p = policy();
        assert_eq!(p.download_bucket("a.pdf", None), "mybucket");
    }

    #[test]
    fn download_of_prefixed_pdf_uses_pdf_bucket() {
        let p = policy();
        assert_eq!(p.download_bucket("incoming/a.pdf", None), "mybucket");
    }

    #[test]
    fn download_of_derived_text_uses_preprocessed_bucket() {
        let p = policy();
        assert_eq!(p.download_bucket("a/text.txt", None), "prep");
    }

    #[test]
    fn explicit_bucket_always_wins() {
        let p = policy();
        assert_eq!(p.download_bucket("a/text.txt", Some("override")), "override");
        assert_eq!(p.upload_bucket(Some("override")), "override");
    }
}
