// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! # CVAT Bulk Ingestion Library
//!
//! Loads large annotated image datasets into a CVAT server. CVAT does not
//! handle thousands of images in a single task well, so the dataset is split
//! into bounded-size segments and each segment becomes its own task.
//!
//! ## Features
//!
//! - **Splitting**: Partition a COCO annotation file into segment files of at
//!   most N images, each carrying its own annotations and the shared
//!   categories
//! - **Project Setup**: Create a project and push its label schema, or reuse
//!   an existing one
//! - **Ingestion**: Per segment, create a task, upload its images, wait for
//!   the server to confirm them, then import the segment annotations
//! - **Configuration**: TOML file plus `CVAT_INGEST__*` environment variables
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cvat_ingest::{Client, Error, IngestOptions, Ingestor, split_file};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Error> {
//!     let client = Client::new("http://localhost:8080")?
//!         .with_login("username", "password")
//!         .await?;
//!
//!     let summary = split_file("gt.json", "gt_splits", 500)?;
//!     let ingestor = Ingestor::new(client, IngestOptions::new("images"));
//!     let report = ingestor.run(summary.segments(), None).await?;
//!
//!     println!("Ingested {} segments", report.done());
//!     Ok(())
//! }
//! ```
//!
//! ## Optional Features
//!
//! - `profiling`: Emits `tracing` spans around the ingestion phases

mod api;
mod client;
pub mod coco;
mod config;
mod error;
mod ingest;
mod poll;
mod service;
mod split;

pub use crate::{
    api::{Label, LabelType, Project, ProjectID, ServerAbout, Task, TaskID},
    client::Client,
    config::{IngestConfig, PollConfig, ProjectConfig, TaskConfig, default_config_path},
    error::Error,
    ingest::{
        CreateFailurePolicy, IngestOptions, IngestReport, Ingestor, Progress, ProjectMode,
        SegmentOutcome, SegmentReport, SegmentState, TaskMode,
    },
    poll::{PollPolicy, Polled, poll_until},
    service::{AnnotationService, ImageFile},
    split::{
        Partition, SegmentFile, SplitSummary, partition, segment_suffix, split_dataset,
        split_file,
    },
};
