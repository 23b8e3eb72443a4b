// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! COCO JSON data structures for serde serialization/deserialization.
//!
//! Only the fields the splitter reasons about are typed: image ids and file
//! names, and the image each annotation belongs to. Everything else, at the
//! top level and on each record, is kept as raw JSON in a flattened `extra`
//! map so a segment file carries the source schema through unchanged. That
//! includes explicit nulls, float-valued sizes and any category or license
//! keys outside the COCO reference.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Top-level COCO dataset structure.
///
/// This is the root structure for annotation files like
/// `instances_default.json` as exported by CVAT. `info`, `licenses` and
/// `categories` live in `extra` as written by the source.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoDataset {
    /// List of images in the dataset.
    pub images: Vec<CocoImage>,
    /// List of annotations (one per object instance).
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    /// Every other top-level key.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Image metadata.
///
/// Each image has a unique ID and a file name relative to the images folder.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoImage {
    /// Unique image ID.
    pub id: u64,
    /// Filename (relative path within the images folder).
    pub file_name: String,
    /// Remaining per-image fields (width, height, license, urls, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Annotation for object detection and instance segmentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoAnnotation {
    /// ID of the image containing this object.
    pub image_id: u64,
    /// Remaining per-annotation fields (id, category, bbox, segmentation,
    /// attributes, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CocoDataset {
    /// Copy of this dataset carrying every field except images and
    /// annotations.
    pub(crate) fn empty_like(&self) -> Self {
        CocoDataset {
            images: Vec::new(),
            annotations: Vec::new(),
            extra: self.extra.clone(),
        }
    }
}
