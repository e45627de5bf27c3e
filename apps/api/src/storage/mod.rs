//! Artifact storage — one contract, three backing stores.
//!
//! Every provider implements the same upload/delete/sign contract; the
//! router picks exactly one at startup (see `router.rs`). Object keys are
//! always `{folder}/{uuid}.{extension}` so that no user-supplied filename
//! ever reaches a backing store.

mod gcs;
mod local;
mod router;
mod s3;

pub use gcs::GcsProvider;
pub use local::LocalDiskProvider;
pub use router::StorageRouter;
pub use s3::S3Provider;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Extension used when the original filename has none we can trust.
pub const DEFAULT_EXTENSION: &str = "bin";

/// Reference to a stored artifact, as returned by every provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageObject {
    /// Provider-relative key, always `{folder}/{uuid}.{extension}`.
    pub key: String,
    /// Resolvable location of the object.
    pub url: String,
    /// Which provider produced the object.
    pub provider: String,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload failed: {0}")]
    Upload(String),

    #[error("delete failed: {0}")]
    Delete(String),

    #[error("signing failed: {0}")]
    Sign(String),

    #[error("signed URLs are not supported by the {0} provider")]
    SigningUnsupported(&'static str),

    #[error("storage {0} timed out")]
    Timeout(&'static str),
}

/// Contract implemented identically by every backing store.
///
/// Providers hold no shared mutable state between calls; every method is an
/// independent I/O operation.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Provider identity, for logging and the `StorageObject.provider` field.
    fn name(&self) -> &'static str;

    /// Stores `bytes` under a freshly generated key inside `folder`.
    /// Fails atomically: no partial object is left addressable on failure.
    async fn upload(
        &self,
        bytes: Bytes,
        content_type: &str,
        original_filename: &str,
        folder: &str,
    ) -> Result<StorageObject, StorageError>;

    /// Removes an object. Deleting an absent key is success, not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Returns a time-limited access URL. Providers without the capability
    /// return `StorageError::SigningUnsupported`.
    async fn signed_url(&self, key: &str, ttl: Duration) -> Result<String, StorageError>;
}

/// Derives a safe extension from an untrusted filename.
///
/// No dot, a bare leading-dot name (`.gitignore`), a trailing dot, or a
/// final segment with non-alphanumeric characters all fall back to
/// [`DEFAULT_EXTENSION`]; everything else keeps the segment after the final
/// dot verbatim.
pub(crate) fn safe_extension(original_filename: &str) -> &str {
    match original_filename.rsplit_once('.') {
        None => DEFAULT_EXTENSION,
        Some(("", _)) => DEFAULT_EXTENSION,
        Some((_, "")) => DEFAULT_EXTENSION,
        Some((_, ext)) if ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext,
        Some(_) => DEFAULT_EXTENSION,
    }
}

/// Builds a fresh collision-resistant object key: `{folder}/{uuid}.{ext}`.
pub(crate) fn object_key(folder: &str, original_filename: &str) -> String {
    format!(
        "{folder}/{}.{}",
        Uuid::new_v4(),
        safe_extension(original_filename)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_from_simple_filename() {
        assert_eq!(safe_extension("resume.pdf"), "pdf");
    }

    #[test]
    fn test_extension_uses_final_segment() {
        assert_eq!(safe_extension("archive.tar.gz"), "gz");
    }

    #[test]
    fn test_no_extension_defaults_to_bin() {
        assert_eq!(safe_extension("resume"), "bin");
    }

    #[test]
    fn test_leading_dot_only_defaults_to_bin() {
        assert_eq!(safe_extension(".gitignore"), "bin");
    }

    #[test]
    fn test_trailing_dot_defaults_to_bin() {
        assert_eq!(safe_extension("resume."), "bin");
    }

    #[test]
    fn test_hidden_file_with_extension_keeps_it() {
        assert_eq!(safe_extension(".env.local"), "local");
    }

    #[test]
    fn test_non_alphanumeric_extension_defaults_to_bin() {
        assert_eq!(safe_extension("weird.p/df"), "bin");
        assert_eq!(safe_extension("weird.p df"), "bin");
    }

    #[test]
    fn test_object_key_shape() {
        let key = object_key("resumes", "resume");
        let (folder, rest) = key.split_once('/').expect("key has a folder segment");
        assert_eq!(folder, "resumes");
        let (id, ext) = rest.rsplit_once('.').expect("key has an extension");
        assert_eq!(ext, "bin");
        assert!(Uuid::parse_str(id).is_ok(), "key id was {id}");
    }

    #[test]
    fn test_object_keys_never_collide_on_same_name() {
        let a = object_key("resumes", "resume.pdf");
        let b = object_key("resumes", "resume.pdf");
        assert_ne!(a, b);
    }
}
