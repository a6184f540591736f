//! Layout of the shared file storage root.
//!
//! Uploaded images live under `images/` and are served publicly. Score PDFs
//! live under `scores/` and are only handed out through paid download links.

use std::path::{Component, Path, PathBuf};

/// Directory under the storage root that holds public images.
pub const IMAGES_DIR: &str = "images";

/// Directory under the storage root that holds score PDFs.
pub const SCORES_DIR: &str = "scores";

/// Whether `path` is a plain relative path to a file inside `scores/`.
///
/// Absolute paths, `..` and the bare directory are rejected.
#[must_use]
pub fn is_score_path(path: &str) -> bool {
    let mut components = Path::new(path).components();
    if components.next() != Some(Component::Normal(SCORES_DIR.as_ref())) {
        return false;
    }
    let mut rest = components.peekable();
    rest.peek().is_some() && rest.all(|c| matches!(c, Component::Normal(_)))
}

/// Join a stored score path onto the storage root, if it passes
/// [`is_score_path`].
#[must_use]
pub fn resolve_score_path(storage_dir: &Path, relative: &str) -> Option<PathBuf> {
    is_score_path(relative).then(|| storage_dir.join(relative))
}
