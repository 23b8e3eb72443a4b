// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! The narrow capability surface the ingestion workflow needs from the
//! annotation service.
//!
//! [`Client`](crate::Client) implements it against the CVAT REST API. Tests
//! and dry runs can provide their own implementation.

use crate::{Error, Label, ProjectID, TaskID};
use std::path::{Path, PathBuf};

/// An image on local disk, uploaded under `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    name: String,
    path: PathBuf,
}

impl ImageFile {
    pub fn new(name: &str, path: PathBuf) -> Self {
        ImageFile {
            name: name.to_owned(),
            path,
        }
    }

    /// File name the server will see.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Operations of the annotation service used by the ingestion workflow.
///
/// Every operation fails with [`Error::ServiceError`] when the service
/// answers with a non-2xx status and with [`Error::HttpError`] when it cannot
/// be reached.
#[allow(async_fn_in_trait)]
pub trait AnnotationService {
    /// Create a project and return its id.
    async fn create_project(&self, name: &str) -> Result<ProjectID, Error>;

    /// Replace the full label set of a project.
    async fn set_project_labels(&self, project: ProjectID, labels: &[Label]) -> Result<(), Error>;

    /// Create a task under `project` and return its id.
    async fn create_task(
        &self,
        project: ProjectID,
        name: &str,
        assignee: Option<u64>,
    ) -> Result<TaskID, Error>;

    /// Upload every image of a task in one single-shot multi-file request.
    async fn upload_images(&self, task: TaskID, images: &[ImageFile]) -> Result<(), Error>;

    /// Number of images the server has ingested for the task, or `None`
    /// while the task does not report a size yet.
    async fn uploaded_count(&self, task: TaskID) -> Result<Option<u64>, Error>;

    /// Import an annotation file into the task using the named format (for
    /// example `"COCO 1.0"`). Returns once the import has completed.
    async fn import_annotations(&self, task: TaskID, path: &Path, format: &str)
    -> Result<(), Error>;
}
