// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # COCO Annotation File Support
//!
//! Reading and writing of COCO detection annotation files as produced and
//! consumed by CVAT's "COCO 1.0" format. Records keep any field this crate
//! does not model, so files written back out keep the source schema.
//!
//! ## Example
//!
//! ```rust,no_run
//! use cvat_ingest::coco::{CocoReader, CocoWriter};
//!
//! # fn example() -> Result<(), cvat_ingest::Error> {
//! let dataset = CocoReader::new().read_json("gt.json")?;
//! println!("Found {} images and {} annotations",
//!          dataset.images.len(), dataset.annotations.len());
//! CocoWriter::new().write_json(&dataset, "copy.json")?;
//! # Ok(())
//! # }
//! ```

mod reader;
mod types;
mod writer;

pub use types::{CocoAnnotation, CocoDataset, CocoImage};

pub use reader::{CocoReader, has_image_extension, list_images};
pub use writer::CocoWriter;
