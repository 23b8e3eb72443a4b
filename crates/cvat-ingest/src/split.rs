// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Dataset splitter.
//!
//! Partitions one COCO annotation file into ordered segments of at most
//! `segment_size` images. Each segment keeps every annotation whose
//! `image_id` belongs to one of its images, plus every other top-level field
//! of the source file unchanged. Annotations that reference an image id not
//! present in the file are dropped from all segments. Image ids and file
//! names must be unique across the file.
//!
//! ```rust,no_run
//! use cvat_ingest::split_file;
//!
//! # fn example() -> Result<(), cvat_ingest::Error> {
//! let summary = split_file("gt.json", "gt_splits", 500)?;
//! for segment in summary.segments() {
//!     println!("{:?}: {} images", segment.path(), segment.image_count());
//! }
//! # Ok(())
//! # }
//! ```

use crate::{
    Error,
    coco::{CocoDataset, CocoReader, CocoWriter},
};
use log::debug;
use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
};

/// In-memory result of partitioning a dataset.
#[derive(Debug, Clone)]
pub struct Partition {
    /// One dataset per segment, in source image order.
    pub segments: Vec<CocoDataset>,
    /// Annotations whose `image_id` matched no image.
    pub dropped_annotations: usize,
}

/// A segment annotation file written by the splitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentFile {
    index: usize,
    path: PathBuf,
    image_count: usize,
    annotation_count: usize,
}

impl SegmentFile {
    /// Zero-based position of the segment in the source image order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn annotation_count(&self) -> usize {
        self.annotation_count
    }

    /// Read the segment file back from disk.
    pub fn load(&self) -> Result<CocoDataset, Error> {
        CocoReader::new().read_json(&self.path)
    }

    /// Image file names listed in the segment file, in order.
    pub fn image_names(&self) -> Result<Vec<String>, Error> {
        Ok(self
            .load()?
            .images
            .into_iter()
            .map(|img| img.file_name)
            .collect())
    }
}

/// Outcome of a split written to disk.
#[derive(Debug, Clone)]
pub struct SplitSummary {
    segments: Vec<SegmentFile>,
    image_count: usize,
    dropped_annotations: usize,
}

impl SplitSummary {
    pub fn segments(&self) -> &[SegmentFile] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<SegmentFile> {
        self.segments
    }

    /// Total images across all segments.
    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn dropped_annotations(&self) -> usize {
        self.dropped_annotations
    }
}

/// Suffix used for the segment at `index`, shared by segment file names and
/// created task names.
pub fn segment_suffix(index: usize) -> String {
    format!("{:04}", index)
}

/// Partition `dataset` into segments of at most `segment_size` images.
///
/// Fails with [`Error::InvalidParameters`] when the segment size is zero, the
/// dataset has no images, or two images share an id or a file name.
pub fn partition(dataset: &CocoDataset, segment_size: usize) -> Result<Partition, Error> {
    if segment_size == 0 {
        return Err(Error::InvalidParameters(
            "Segment size must be greater than zero".to_owned(),
        ));
    }
    if dataset.images.is_empty() {
        return Err(Error::InvalidParameters(
            "Annotation file contains no images".to_owned(),
        ));
    }

    let mut segments: Vec<CocoDataset> =
        Vec::with_capacity(dataset.images.len().div_ceil(segment_size));
    let mut owner: HashMap<u64, usize> = HashMap::with_capacity(dataset.images.len());
    let mut names: HashSet<&str> = HashSet::with_capacity(dataset.images.len());

    for (index, chunk) in dataset.images.chunks(segment_size).enumerate() {
        let mut segment = dataset.empty_like();
        segment.images = chunk.to_vec();
        for image in chunk {
            if owner.insert(image.id, index).is_some() {
                return Err(Error::InvalidParameters(format!(
                    "Duplicate image id {} ({})",
                    image.id, image.file_name
                )));
            }
            if !names.insert(image.file_name.as_str()) {
                return Err(Error::InvalidParameters(format!(
                    "Duplicate image file name {}",
                    image.file_name
                )));
            }
        }
        segments.push(segment);
    }

    let mut dropped_annotations = 0;
    for annotation in &dataset.annotations {
        match owner.get(&annotation.image_id) {
            Some(&index) => segments[index].annotations.push(annotation.clone()),
            None => dropped_annotations += 1,
        }
    }

    Ok(Partition {
        segments,
        dropped_annotations,
    })
}

/// Split `dataset` into segment files named `segment_NNNN.json` under
/// `output_dir`.
pub fn split_dataset<P: AsRef<Path>>(
    dataset: &CocoDataset,
    output_dir: P,
    segment_size: usize,
) -> Result<SplitSummary, Error> {
    write_segments(dataset, output_dir.as_ref(), "segment", segment_size)
}

/// Read the annotation file at `annotations` and split it into segment files
/// named after the source file (`gt.json` → `gt_0000.json`, `gt_0001.json`,
/// ...).
pub fn split_file<P: AsRef<Path>, Q: AsRef<Path>>(
    annotations: P,
    output_dir: Q,
    segment_size: usize,
) -> Result<SplitSummary, Error> {
    let annotations = annotations.as_ref();
    let dataset = CocoReader::new().read_json(annotations)?;
    let stem = annotations
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("segment");

    write_segments(&dataset, output_dir.as_ref(), stem, segment_size)
}

fn write_segments(
    dataset: &CocoDataset,
    output_dir: &Path,
    stem: &str,
    segment_size: usize,
) -> Result<SplitSummary, Error> {
    let partition = partition(dataset, segment_size)?;
    std::fs::create_dir_all(output_dir)?;

    if partition.dropped_annotations > 0 {
        debug!(
            "Dropped {} annotations referencing unknown image ids",
            partition.dropped_annotations
        );
    }

    let writer = CocoWriter::new();
    let mut segments = Vec::with_capacity(partition.segments.len());

    for (index, segment) in partition.segments.iter().enumerate() {
        let path = output_dir.join(format!("{}_{}.json", stem, segment_suffix(index)));
        writer.write_json(segment, &path)?;

        debug!(
            "Wrote segment {} with {} images and {} annotations to {:?}",
            index,
            segment.images.len(),
            segment.annotations.len(),
            path
        );

        segments.push(SegmentFile {
            index,
            path,
            image_count: segment.images.len(),
            annotation_count: segment.annotations.len(),
        });
    }

    Ok(SplitSummary {
        segments,
        image_count: dataset.images.len(),
        dropped_annotations: partition.dropped_annotations,
    })
}
