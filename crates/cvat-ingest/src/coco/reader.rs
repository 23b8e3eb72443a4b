// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON readers and image directory listing.

use super::types::*;
use crate::Error;
use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

/// COCO annotation file reader.
///
/// # Example
///
/// ```rust,no_run
/// use cvat_ingest::coco::CocoReader;
///
/// let reader = CocoReader::new();
/// let dataset = reader.read_json("gt.json")?;
/// println!("Loaded {} images", dataset.images.len());
/// # Ok::<(), cvat_ingest::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CocoReader {}

impl CocoReader {
    /// Create a new COCO reader.
    pub fn new() -> Self {
        Self {}
    }

    /// Read COCO dataset from a JSON file.
    pub fn read_json<P: AsRef<Path>>(&self, path: P) -> Result<CocoDataset, Error> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::with_capacity(64 * 1024, file);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Returns true when `name` ends with one of `extensions` (case-insensitive,
/// without the leading dot).
pub fn has_image_extension(name: &str, extensions: &[String]) -> bool {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|x| x.eq_ignore_ascii_case(ext)))
}

/// List image files in a directory tree.
///
/// # Returns
/// Vector of `(relative_path, absolute_path)` for each image, sorted by
/// relative path.
pub fn list_images<P: AsRef<Path>>(
    path: P,
    extensions: &[String],
) -> Result<Vec<(String, PathBuf)>, Error> {
    let path = path.as_ref();
    if !path.is_dir() {
        return Err(Error::InvalidParameters(format!(
            "Images path {:?} is not a directory",
            path
        )));
    }

    let mut images = Vec::new();
    for entry in walkdir::WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let filename = entry.file_name().to_string_lossy();
        if has_image_extension(&filename, extensions) {
            let rel_path = entry
                .path()
                .strip_prefix(path)
                .unwrap_or(entry.path())
                .to_string_lossy()
                .to_string();
            images.push((rel_path, entry.path().to_path_buf()));
        }
    }

    images.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(images)
}
