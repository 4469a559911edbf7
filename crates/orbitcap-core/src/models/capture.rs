use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File name prefix for captured images
pub const IMAGE_PREFIX: &str = "IMG_";

/// Suffix of color images
pub const IMAGE_SUFFIX: &str = ".png";

/// Suffix of depth maps, appended to the color image stem
pub const DEPTH_SUFFIX: &str = "_depth.TIF";

/// One captured image (and optional depth map) inside a capture folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureItem {
    /// Frame counter value at capture time
    pub id: u32,

    pub image_path: PathBuf,

    /// Present only if the depth file exists on disk
    pub depth_path: Option<PathBuf>,
}

impl CaptureItem {
    /// Paths of every file backing this item
    pub fn files(&self) -> Vec<&Path> {
        let mut files = vec![self.image_path.as_path()];
        if let Some(depth) = &self.depth_path {
            files.push(depth.as_path());
        }
        files
    }
}

/// Zero-padded stem shared by the color image and its depth map
pub fn frame_stem(id: u32) -> String {
    format!("{}{:04}", IMAGE_PREFIX, id)
}

pub fn image_file_name(id: u32) -> String {
    format!("{}{}", frame_stem(id), IMAGE_SUFFIX)
}

pub fn depth_file_name(id: u32) -> String {
    format!("{}{}", frame_stem(id), DEPTH_SUFFIX)
}

/// Parse the capture id out of a color image file name.
///
/// Returns `None` for depth maps and names that do not follow the
/// `IMG_<digits>.png` pattern.
pub fn parse_image_id(file_name: &str) -> Option<u32> {
    if file_name.ends_with(DEPTH_SUFFIX) {
        return None;
    }
    let stem = file_name.strip_suffix(IMAGE_SUFFIX)?;
    if stem.ends_with("_depth") {
        return None;
    }
    let digits = stem.strip_prefix(IMAGE_PREFIX)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_names_pair_up() {
        assert_eq!(image_file_name(7), "IMG_0007.png");
        assert_eq!(depth_file_name(7), "IMG_0007_depth.TIF");
        assert_eq!(image_file_name(12345), "IMG_12345.png");
    }

    #[test]
    fn test_parse_image_id() {
        assert_eq!(parse_image_id("IMG_0000.png"), Some(0));
        assert_eq!(parse_image_id("IMG_0042.png"), Some(42));
        assert_eq!(parse_image_id("IMG_0042_depth.TIF"), None);
        assert_eq!(parse_image_id("IMG_0042_depth.png"), None);
        assert_eq!(parse_image_id("metadata.json"), None);
        assert_eq!(parse_image_id("IMG_.png"), None);
        assert_eq!(parse_image_id("IMG_12a.png"), None);
    }
}
