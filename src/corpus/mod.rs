//! Image set loading and before/after correspondence.
//!
//! An [`ImageSet`] is one directory of images keyed by a name-derived
//! [`ImageKey`]. Two sets (the "before" input and the "after" output) are
//! paired by key, and [`correspondence::validate`] checks that the pairing is
//! total before any metric runs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lowlight_eval::corpus::{correspondence, ImageSet};
//!
//! let input = ImageSet::load("./low")?;
//! let output = ImageSet::load("./enhanced")?;
//! correspondence::validate(&input.key_set(), &output.key_set())?;
//! ```

pub mod correspondence;
mod discovery;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};

use imgref::ImgVec;
use rgb::RGB8;
use serde::{Deserialize, Serialize};

pub use discovery::{
    Listing, SUPPORTED_EXTENSIONS, decode_image, ensure_dir, is_supported, list_candidates,
};

use crate::error::{Result, Shape};

/// Correspondence key derived from a filename.
///
/// The key is the first two `_`-delimited tokens of the raw filename,
/// rejoined with `_`. The extension is not stripped, so a name with at most
/// one underscore keeps its extension inside the key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageKey(String);

impl ImageKey {
    /// Derive the key for a filename.
    ///
    /// ```
    /// use lowlight_eval::corpus::ImageKey;
    ///
    /// assert_eq!(ImageKey::derive("low_001_a.png").as_str(), "low_001");
    /// assert_eq!(ImageKey::derive("frame7.png").as_str(), "frame7.png");
    /// assert_eq!(ImageKey::derive("B_2.png").as_str(), "B_2.png");
    /// ```
    #[must_use]
    pub fn derive(file_name: &str) -> Self {
        let tokens: Vec<&str> = file_name.split('_').take(2).collect();
        Self(tokens.join("_"))
    }

    /// The key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ImageKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ImageKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// A decoded image together with the file it came from.
#[derive(Clone)]
pub struct LoadedImage {
    /// Source file.
    pub path: PathBuf,
    /// Decoded pixels, 8 bits per sample, in decoder-native RGB order.
    pub pixels: ImgVec<RGB8>,
}

impl LoadedImage {
    /// Image shape as (height, width, channels).
    #[must_use]
    pub fn shape(&self) -> Shape {
        (self.pixels.height(), self.pixels.width(), 3)
    }

    /// Filename component of the source path.
    #[must_use]
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("")
    }
}

impl fmt::Debug for LoadedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedImage")
            .field("path", &self.path)
            .field("shape", &self.shape())
            .finish()
    }
}

/// A file that qualified by extension but was left out of its set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedFile {
    /// Path to the skipped file.
    pub path: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// Two files that derived the same key; the later one replaced the earlier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyCollision {
    /// The shared key.
    pub key: ImageKey,
    /// File that ended up in the set.
    pub kept: PathBuf,
    /// File that was overwritten.
    pub replaced: PathBuf,
}

/// An ordered, immutable mapping from key to decoded image for one directory.
#[derive(Debug, Clone)]
pub struct ImageSet {
    root: PathBuf,
    images: BTreeMap<ImageKey, LoadedImage>,
    skipped: Vec<SkippedFile>,
    collisions: Vec<KeyCollision>,
}

impl ImageSet {
    /// Load every supported image in `dir`.
    ///
    /// Fails with [`Error::NotFound`](crate::Error::NotFound) when the
    /// directory does not exist. Files that cannot be decoded are recorded in
    /// [`skipped`](Self::skipped) and never abort the load. On a key
    /// collision the file visited last (in sorted filename order) wins.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self> {
        discovery::load_image_set(dir.as_ref())
    }

    /// Directory the set was loaded from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Look up the image for a key.
    #[must_use]
    pub fn get(&self, key: &ImageKey) -> Option<&LoadedImage> {
        self.images.get(key)
    }

    /// Keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &ImageKey> {
        self.images.keys()
    }

    /// Owned set of keys, for correspondence checks.
    #[must_use]
    pub fn key_set(&self) -> BTreeSet<ImageKey> {
        self.images.keys().cloned().collect()
    }

    /// Entries in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ImageKey, &LoadedImage)> {
        self.images.iter()
    }

    /// Number of keys in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.images.len()
    }

    /// Whether the set holds no images.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Files excluded because they could not be decoded.
    #[must_use]
    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Key collisions resolved during the load.
    #[must_use]
    pub fn collisions(&self) -> &[KeyCollision] {
        &self.collisions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_takes_first_two_tokens() {
        assert_eq!(ImageKey::derive("low_001_a.png"), ImageKey::derive("low_001_b.png"));
        assert_eq!(ImageKey::derive("low_001_a.png").as_str(), "low_001");
        assert_eq!(ImageKey::derive("A_1_x.png").as_str(), "A_1");
    }

    #[test]
    fn test_key_without_underscore_keeps_extension() {
        assert_eq!(ImageKey::derive("frame7.png").as_str(), "frame7.png");
    }

    #[test]
    fn test_key_with_single_underscore_keeps_extension() {
        assert_eq!(ImageKey::derive("B_2.png").as_str(), "B_2.png");
        assert_ne!(ImageKey::derive("B_2.png"), ImageKey::derive("B_2_x.png"));
    }

    #[test]
    fn test_key_empty_tokens_are_preserved() {
        assert_eq!(ImageKey::derive("_a_b.png").as_str(), "_a");
        assert_eq!(ImageKey::derive("a__b.png").as_str(), "a_");
        assert_eq!(ImageKey::derive("").as_str(), "");
    }

    #[test]
    fn test_key_ordering_is_lexicographic() {
        let mut keys = vec![
            ImageKey::from("b_1"),
            ImageKey::from("A_2"),
            ImageKey::from("a_1"),
        ];
        keys.sort();
        let names: Vec<&str> = keys.iter().map(ImageKey::as_str).collect();
        assert_eq!(names, ["A_2", "a_1", "b_1"]);
    }
}
