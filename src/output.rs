//! Generated-image lookup for a tool's output folder.

use crate::error::{Error, Result};
use std::fs;
use std::path::{Component, Path};

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif", "tif", "tiff"];

pub fn is_image_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}

/// Image file names directly inside `folder`, sorted by name.
///
/// A folder that does not exist or cannot be read yields an empty list.
pub fn list_images(folder: impl AsRef<Path>) -> Vec<String> {
    let folder = folder.as_ref();
    let entries = match fs::read_dir(folder) {
        Ok(entries) => entries,
        Err(e) => {
            log::debug!("[Output] Cannot read {}: {}", folder.display(), e);
            return Vec::new();
        }
    };

    let mut images: Vec<String> = entries
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|e| e.file_name().into_string().ok())
        .filter(|name| is_image_file(name))
        .collect();
    images.sort();
    images
}

pub fn read_image(folder: impl AsRef<Path>, file_name: &str) -> Result<Vec<u8>> {
    let mut components = Path::new(file_name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => {}
        _ => return Err(Error::InvalidPath(file_name.to_string())),
    }
    Ok(fs::read(folder.as_ref().join(file_name))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_extensions_case_insensitively() {
        assert!(is_image_file("grid-0001.PNG"));
        assert!(is_image_file("scan.tif"));
        assert!(is_image_file("photo.JpEg"));
        assert!(!is_image_file("params.txt"));
        assert!(!is_image_file("png"));
    }

    #[test]
    fn lists_only_images_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.webp", "notes.txt", "c.GIF"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("nested.png")).unwrap();

        assert_eq!(list_images(dir.path()), vec!["a.webp", "b.png", "c.GIF"]);
    }

    #[test]
    fn missing_folder_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_images(dir.path().join("absent")).is_empty());
    }

    #[test]
    fn read_rejects_paths() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.png"), b"PNG").unwrap();

        assert_eq!(read_image(dir.path(), "a.png").unwrap(), b"PNG");
        assert!(matches!(
            read_image(dir.path(), "../a.png"),
            Err(Error::InvalidPath(_))
        ));
        assert!(matches!(
            read_image(dir.path(), "sub/a.png"),
            Err(Error::InvalidPath(_))
        ));
    }
}
