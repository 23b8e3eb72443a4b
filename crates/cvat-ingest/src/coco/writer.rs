// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON writer.

use super::types::CocoDataset;
use crate::Error;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

/// COCO writer for generating JSON files.
///
/// # Example
///
/// ```rust,no_run
/// use cvat_ingest::coco::{CocoDataset, CocoWriter};
///
/// let writer = CocoWriter::new();
/// let dataset = CocoDataset::default();
/// writer.write_json(&dataset, "annotations.json")?;
/// # Ok::<(), cvat_ingest::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct CocoWriter {}

impl CocoWriter {
    /// Create a new COCO writer.
    pub fn new() -> Self {
        Self {}
    }

    /// Write COCO dataset to a JSON file, creating the parent directory if
    /// needed.
    pub fn write_json<P: AsRef<Path>>(&self, dataset: &CocoDataset, path: P) -> Result<(), Error> {
        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(path.as_ref())?;
        let mut writer = BufWriter::with_capacity(64 * 1024, file);

        serde_json::to_writer(&mut writer, dataset)?;
        writer.flush()?;
        Ok(())
    }
}
