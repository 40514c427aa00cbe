//! Image discovery and decoding for a single directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use imgref::ImgVec;
use rgb::RGB8;
use tracing::{debug, info, warn};

use crate::corpus::{ImageKey, ImageSet, KeyCollision, LoadedImage, SkippedFile};
use crate::error::{Error, Result};

/// Supported image extensions (matched case-insensitively as a filename suffix).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Whether a filename ends with one of the supported extensions.
#[must_use]
pub fn is_supported(file_name: &str) -> bool {
    let lower = file_name.to_lowercase();
    SUPPORTED_EXTENSIONS.iter().any(|ext| {
        lower
            .strip_suffix(ext)
            .is_some_and(|stem| stem.ends_with('.'))
    })
}

/// Supported files of a directory in sorted filename order.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    /// Regular files with a supported extension and a UTF-8 name.
    pub files: Vec<PathBuf>,
    /// Entries that matched the extension filter but cannot be used.
    pub skipped: Vec<SkippedFile>,
}

/// Fail with [`Error::NotFound`] unless `dir` is an existing directory.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        Ok(())
    } else {
        Err(Error::NotFound {
            path: dir.to_path_buf(),
        })
    }
}

/// List the supported files of `dir`, sorted by filename.
///
/// Entries without a supported extension are ignored silently.
pub fn list_candidates(dir: &Path) -> Result<Listing> {
    ensure_dir(dir)?;

    let mut entries = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        entries.push((entry.file_name(), entry.path()));
    }
    entries.sort_by(|a, b| a.0.cmp(&b.0));

    let mut listing = Listing::default();
    for (name, path) in entries {
        let Some(name) = name.to_str() else {
            if is_supported(&name.to_string_lossy()) {
                listing.skipped.push(SkippedFile {
                    path,
                    reason: "filename is not valid UTF-8".to_string(),
                });
            }
            continue;
        };

        if !is_supported(name) {
            continue;
        }

        if !path.is_file() {
            listing.skipped.push(SkippedFile {
                path,
                reason: "not a regular file".to_string(),
            });
            continue;
        }

        listing.files.push(path);
    }

    Ok(listing)
}

/// Decode an image file into 8-bit RGB.
///
/// The format is sniffed from the content. Grayscale sources are replicated
/// across channels, alpha is dropped, and deeper samples are reduced to 8 bit.
pub fn decode_image(path: &Path) -> Result<ImgVec<RGB8>> {
    let decode_error = |reason: String| Error::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let reader = image::ImageReader::open(path)
        .and_then(|r| r.with_guessed_format())
        .map_err(|e| decode_error(e.to_string()))?;
    let decoded = reader.decode().map_err(|e| decode_error(e.to_string()))?;

    let rgb = decoded.to_rgb8();
    let (width, height) = rgb.dimensions();
    if width == 0 || height == 0 {
        return Err(decode_error("image has no pixels".to_string()));
    }

    let pixels: Vec<RGB8> = rgb.pixels().map(|p| RGB8::new(p[0], p[1], p[2])).collect();
    Ok(ImgVec::new(pixels, width as usize, height as usize))
}

pub(crate) fn load_image_set(dir: &Path) -> Result<ImageSet> {
    let Listing { files, mut skipped } = list_candidates(dir)?;

    let mut images: BTreeMap<ImageKey, LoadedImage> = BTreeMap::new();
    let mut collisions = Vec::new();

    for path in files {
        let Some(file_name) = path.file_name().and_then(|s| s.to_str()) else {
            continue;
        };
        let key = ImageKey::derive(file_name);

        let pixels = match decode_image(&path) {
            Ok(pixels) => pixels,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping undecodable file");
                skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        debug!(
            path = %path.display(),
            key = %key,
            width = pixels.width(),
            height = pixels.height(),
            "decoded image"
        );

        let loaded = LoadedImage {
            path: path.clone(),
            pixels,
        };
        if let Some(previous) = images.insert(key.clone(), loaded) {
            warn!(
                key = %key,
                kept = %path.display(),
                replaced = %previous.path.display(),
                "key collision, keeping the later file"
            );
            collisions.push(KeyCollision {
                key,
                kept: path,
                replaced: previous.path,
            });
        }
    }

    info!(
        dir = %dir.display(),
        images = images.len(),
        skipped = skipped.len(),
        collisions = collisions.len(),
        "loaded image set"
    );

    Ok(ImageSet {
        root: dir.to_path_buf(),
        images,
        skipped,
        collisions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use tempfile::TempDir;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32, value: u8) {
        RgbImage::from_pixel(width, height, Rgb([value, value / 2, value / 3]))
            .save(dir.join(name))
            .unwrap();
    }

    #[test]
    fn test_ensure_dir() {
        let tmp = TempDir::new().unwrap();
        assert!(ensure_dir(tmp.path()).is_ok());
        let file = tmp.path().join("a_1.png");
        write_image(tmp.path(), "a_1.png", 2, 2, 0);
        assert!(matches!(ensure_dir(&file), Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_is_supported() {
        assert!(is_supported("a.png"));
        assert!(is_supported("A.PNG"));
        assert!(is_supported("photo.JpEg"));
        assert!(is_supported("x.bmp"));
        assert!(is_supported(".png"));
        assert!(!is_supported("a.gif"));
        assert!(!is_supported("apng"));
        assert!(!is_supported("notes.txt"));
    }

    #[test]
    fn test_missing_directory_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        let result = ImageSet::load(&missing);
        assert!(matches!(result, Err(Error::NotFound { path }) if path == missing));
    }

    #[test]
    fn test_load_filters_and_keys() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "low_001_a.png", 4, 3, 10);
        write_image(tmp.path(), "frame7.png", 4, 3, 20);
        RgbImage::from_pixel(2, 2, Rgb([30, 30, 30]))
            .save_with_format(tmp.path().join("UPPER_CASE_X.BMP"), image::ImageFormat::Bmp)
            .unwrap();
        fs::write(tmp.path().join("notes.txt"), b"not an image").unwrap();

        let set = ImageSet::load(tmp.path()).unwrap();
        let keys: Vec<&str> = set.keys().map(ImageKey::as_str).collect();
        assert_eq!(keys, ["UPPER_CASE", "frame7.png", "low_001"]);
        assert!(set.skipped().is_empty());

        let img = set.get(&ImageKey::from("low_001")).unwrap();
        assert_eq!(img.shape(), (3, 4, 3));
        assert_eq!(img.pixels.buf()[0], RGB8::new(10, 5, 3));
    }

    #[test]
    fn test_corrupt_file_is_skipped_not_raised() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "good_1.png", 2, 2, 50);
        fs::write(tmp.path().join("bad_2.png"), b"definitely not a png").unwrap();

        let set = ImageSet::load(tmp.path()).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.skipped().len(), 1);
        assert!(set.skipped()[0].path.ends_with("bad_2.png"));
    }

    #[test]
    fn test_content_is_sniffed_not_extension() {
        let tmp = TempDir::new().unwrap();
        RgbImage::from_pixel(3, 3, Rgb([1, 2, 3]))
            .save_with_format(tmp.path().join("mislabeled_1.jpg"), image::ImageFormat::Png)
            .unwrap();

        let set = ImageSet::load(tmp.path()).unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.skipped().is_empty());
    }

    #[test]
    fn test_collision_keeps_last_sorted_file() {
        let tmp = TempDir::new().unwrap();
        write_image(tmp.path(), "A_1_y.png", 2, 2, 200);
        write_image(tmp.path(), "A_1_x.png", 2, 2, 100);
        write_image(tmp.path(), "B_2.png", 2, 2, 50);

        let set = ImageSet::load(tmp.path()).unwrap();
        assert_eq!(set.len(), 2);

        let kept = set.get(&ImageKey::from("A_1")).unwrap();
        assert_eq!(kept.file_name(), "A_1_y.png");
        assert_eq!(kept.pixels.buf()[0].r, 200);

        assert_eq!(set.collisions().len(), 1);
        let collision = &set.collisions()[0];
        assert_eq!(collision.key.as_str(), "A_1");
        assert!(collision.replaced.ends_with("A_1_x.png"));
        assert!(collision.kept.ends_with("A_1_y.png"));
    }

    #[test]
    fn test_directory_with_image_name_is_skipped() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("folder.png")).unwrap();

        let set = ImageSet::load(tmp.path()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.skipped().len(), 1);
    }

    #[test]
    fn test_empty_directory_loads_empty_set() {
        let tmp = TempDir::new().unwrap();
        let set = ImageSet::load(tmp.path()).unwrap();
        assert!(set.is_empty());
        assert_eq!(set.root(), tmp.path());
    }
}
