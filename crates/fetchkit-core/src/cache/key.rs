//! Cache file name derivation
//!
//! One file per distinct URL. The name is the SHA-256 hex digest of the
//! canonical URL string: collision-resistant, fixed-length, and safe for
//! any filesystem regardless of what characters the URL contains.

use sha2::{Digest, Sha256};

/// Extension shared by every entry file in a store directory
pub(crate) const ENTRY_EXTENSION: &str = "entry";

/// File name for the cache entry belonging to `url`
pub(crate) fn entry_file_name(url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    format!("{:x}.{}", hasher.finalize(), ENTRY_EXTENSION)
}
