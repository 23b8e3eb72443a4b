// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Ingestion orchestrator.
//!
//! Drives every segment produced by the splitter through the annotation
//! service, one at a time:
//!
//! ```text
//! Pending → TaskCreated → ImagesUploaded → UploadConfirmed → AnnotationsImported → Done
//! ```
//!
//! There is no transition back and no retry. A failure halts the run, except
//! for task creation under [`CreateFailurePolicy::Skip`] which records the
//! segment as skipped and moves on.

use crate::{
    Error, Label, ProjectID, TaskID,
    coco::{has_image_extension, list_images},
    poll::{PollPolicy, poll_until},
    service::{AnnotationService, ImageFile},
    split::{SegmentFile, segment_suffix},
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Display,
    path::PathBuf,
    time::{Duration, Instant},
};
use tokio::sync::mpsc::Sender;

/// Progress information for long-running operations.
///
/// Sent once per finished (or skipped) segment.
///
/// # Examples
///
/// ```rust
/// use cvat_ingest::Progress;
///
/// let progress = Progress {
///     current: 2,
///     total: 8,
/// };
/// let percentage = (progress.current as f64 / progress.total as f64) * 100.0;
/// println!("Progress: {:.1}% ({}/{})", percentage, progress.current, progress.total);
/// ```
#[derive(Debug, Clone)]
pub struct Progress {
    /// Current number of completed items.
    pub current: usize,
    /// Total number of items to process.
    pub total: usize,
}

/// Where the project comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectMode {
    /// Create a new project and push the configured labels to it.
    Create,
    /// Use a project that already exists on the server.
    Existing(ProjectID),
}

/// Where each segment's task comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskMode {
    /// Create one task per segment.
    Create,
    /// Use existing tasks, one id per segment in segment order.
    Existing(Vec<TaskID>),
}

/// What to do when creating a segment's task fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CreateFailurePolicy {
    /// Stop the run with the error.
    #[default]
    Abort,
    /// Record the segment as skipped and continue with the next one.
    Skip,
}

/// Last state a segment reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegmentState {
    Pending,
    TaskCreated,
    ImagesUploaded,
    UploadConfirmed,
    AnnotationsImported,
    Done,
}

impl Display for SegmentState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SegmentState::Pending => "pending",
            SegmentState::TaskCreated => "task created",
            SegmentState::ImagesUploaded => "images uploaded",
            SegmentState::UploadConfirmed => "upload confirmed",
            SegmentState::AnnotationsImported => "annotations imported",
            SegmentState::Done => "done",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentOutcome {
    Done,
    Skipped { reason: String },
}

/// What happened to one segment.
#[derive(Debug, Clone)]
pub struct SegmentReport {
    pub index: usize,
    pub task_id: Option<TaskID>,
    pub image_count: usize,
    /// Time spent waiting for the server to confirm the upload.
    pub upload_wait: Duration,
    /// Time spent importing annotations.
    pub import_time: Duration,
    pub state: SegmentState,
    pub outcome: SegmentOutcome,
}

impl SegmentReport {
    fn skipped(index: usize, reason: String) -> Self {
        SegmentReport {
            index,
            task_id: None,
            image_count: 0,
            upload_wait: Duration::ZERO,
            import_time: Duration::ZERO,
            state: SegmentState::Pending,
            outcome: SegmentOutcome::Skipped { reason },
        }
    }

    pub fn is_done(&self) -> bool {
        self.outcome == SegmentOutcome::Done
    }
}

/// Result of a complete ingestion run.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub project: ProjectID,
    pub segments: Vec<SegmentReport>,
    /// Wall-clock time of the whole run.
    pub total: Duration,
}

impl IngestReport {
    pub fn done(&self) -> usize {
        self.segments.iter().filter(|s| s.is_done()).count()
    }

    pub fn skipped(&self) -> usize {
        self.segments.len() - self.done()
    }

    /// Images uploaded across every completed segment.
    pub fn image_count(&self) -> usize {
        self.segments.iter().map(|s| s.image_count).sum()
    }
}

/// Settings of an ingestion run.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Directory holding the image files named in the segments.
    pub images_dir: PathBuf,
    pub project_mode: ProjectMode,
    /// Name of the project to create under [`ProjectMode::Create`].
    pub project_name: String,
    /// Labels pushed to a created project.
    pub labels: Vec<Label>,
    pub task_mode: TaskMode,
    /// Base name of created tasks; the segment suffix is appended.
    pub task_name: String,
    pub assignee: Option<u64>,
    /// Lowercase extensions accepted for upload, without the dot.
    pub image_extensions: Vec<String>,
    pub import_format: String,
    pub poll: PollPolicy,
    pub on_create_failure: CreateFailurePolicy,
}

impl IngestOptions {
    pub fn new<P: Into<PathBuf>>(images_dir: P) -> Self {
        IngestOptions {
            images_dir: images_dir.into(),
            project_mode: ProjectMode::Create,
            project_name: "cvat-ingest".to_owned(),
            labels: Vec::new(),
            task_mode: TaskMode::Create,
            task_name: "segment".to_owned(),
            assignee: None,
            image_extensions: ["png", "jpg", "jpeg"].map(String::from).to_vec(),
            import_format: "COCO 1.0".to_owned(),
            poll: PollPolicy::default(),
            on_create_failure: CreateFailurePolicy::Abort,
        }
    }

    /// Name given to the task created for the segment at `index`.
    pub fn task_name_for(&self, index: usize) -> String {
        format!("{}_{}", self.task_name, segment_suffix(index))
    }
}

/// Runs segments through an [`AnnotationService`].
///
/// ```rust,no_run
/// use cvat_ingest::{Client, IngestOptions, Ingestor, split_file};
///
/// # async fn example() -> Result<(), cvat_ingest::Error> {
/// let client = Client::new("http://localhost:8080")?
///     .with_login("annotator", "secret")
///     .await?;
/// let summary = split_file("gt.json", "gt_splits", 500)?;
///
/// let ingestor = Ingestor::new(client, IngestOptions::new("images"));
/// let report = ingestor.run(summary.segments(), None).await?;
/// println!("{} segments done in {:?}", report.done(), report.total);
/// # Ok(())
/// # }
/// ```
pub struct Ingestor<S> {
    service: S,
    options: IngestOptions,
}

impl<S: AnnotationService> Ingestor<S> {
    pub fn new(service: S, options: IngestOptions) -> Self {
        Ingestor { service, options }
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Count the recognised images on disk and warn when the count differs
    /// from `expected`.
    pub fn scan_images(&self, expected: usize) -> Result<usize, Error> {
        let found = list_images(&self.options.images_dir, &self.options.image_extensions)?.len();
        info!("Found {} images in {:?}", found, self.options.images_dir);
        if found != expected {
            warn!(
                "Annotation file lists {} images but {} were found in {:?}",
                expected, found, self.options.images_dir
            );
        }
        Ok(found)
    }

    /// Resolve the project to ingest into, creating it and pushing the labels
    /// under [`ProjectMode::Create`].
    pub async fn prepare_project(&self) -> Result<ProjectID, Error> {
        match &self.options.project_mode {
            ProjectMode::Existing(id) => {
                info!("Using existing project {}", id);
                Ok(*id)
            }
            ProjectMode::Create => {
                let id = self
                    .service
                    .create_project(&self.options.project_name)
                    .await?;
                info!("Created project {} ({})", self.options.project_name, id);

                if !self.options.labels.is_empty() {
                    self.service
                        .set_project_labels(id, &self.options.labels)
                        .await?;
                    debug!("Pushed {} labels to project {}", self.options.labels.len(), id);
                }

                Ok(id)
            }
        }
    }

    /// Ingest every segment in order.
    ///
    /// Fails before any service call when `segments` is empty or when
    /// [`TaskMode::Existing`] supplies fewer ids than there are segments.
    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(skip_all, fields(segments = segments.len()))
    )]
    pub async fn run(
        &self,
        segments: &[SegmentFile],
        progress: Option<Sender<Progress>>,
    ) -> Result<IngestReport, Error> {
        if segments.is_empty() {
            return Err(Error::InvalidParameters("No segments to ingest".to_owned()));
        }
        if let TaskMode::Existing(ids) = &self.options.task_mode
            && ids.len() < segments.len()
        {
            return Err(Error::InvalidParameters(format!(
                "{} task ids supplied for {} segments",
                ids.len(),
                segments.len()
            )));
        }

        let start = Instant::now();
        let project = self.prepare_project().await?;
        let total = segments.len();
        let mut reports = Vec::with_capacity(total);

        for (current, segment) in segments.iter().enumerate() {
            let task = match self.resolve_task(project, current, segment).await {
                Ok(task) => task,
                Err(err) if self.options.on_create_failure == CreateFailurePolicy::Skip => {
                    warn!("Skipping segment {}: {}", segment.index(), err);
                    reports.push(SegmentReport::skipped(segment.index(), err.to_string()));
                    if let Some(progress) = &progress {
                        let _ = progress
                            .send(Progress {
                                current: current + 1,
                                total,
                            })
                            .await;
                    }
                    continue;
                }
                Err(err) => return Err(err),
            };

            let report = self.ingest_segment(segment, task).await?;
            info!(
                "Segment {}: {} images into task {}, upload confirmed after {:.1}s, import took {:.1}s",
                report.index,
                report.image_count,
                task,
                report.upload_wait.as_secs_f64(),
                report.import_time.as_secs_f64()
            );
            reports.push(report);

            if let Some(progress) = &progress {
                let _ = progress
                    .send(Progress {
                        current: current + 1,
                        total,
                    })
                    .await;
            }
        }

        drop(progress);

        let total = start.elapsed();
        info!(
            "Ingested {} segments into project {} in {:.1}s",
            reports.iter().filter(|r| r.is_done()).count(),
            project,
            total.as_secs_f64()
        );

        Ok(IngestReport {
            project,
            segments: reports,
            total,
        })
    }

    async fn resolve_task(
        &self,
        project: ProjectID,
        position: usize,
        segment: &SegmentFile,
    ) -> Result<TaskID, Error> {
        match &self.options.task_mode {
            TaskMode::Existing(ids) => ids.get(position).copied().ok_or_else(|| {
                Error::InvalidParameters(format!("No task id for segment {}", segment.index()))
            }),
            TaskMode::Create => {
                let name = self.options.task_name_for(segment.index());
                let id = self
                    .service
                    .create_task(project, &name, self.options.assignee)
                    .await?;
                debug!("Created task {} ({})", name, id);
                Ok(id)
            }
        }
    }

    #[cfg_attr(
        feature = "profiling",
        tracing::instrument(skip_all, fields(segment = segment.index(), task = %task))
    )]
    async fn ingest_segment(
        &self,
        segment: &SegmentFile,
        task: TaskID,
    ) -> Result<SegmentReport, Error> {
        let mut state = SegmentState::TaskCreated;
        debug!("Segment {} is {}", segment.index(), state);

        let images = self.resolve_images(segment)?;
        self.service.upload_images(task, &images).await?;
        state = advance(segment, state, SegmentState::ImagesUploaded);

        let expected = images.len() as u64;
        let polled = poll_until(&self.options.poll, move || async move {
            let count = self.service.uploaded_count(task).await?;
            Ok(count.filter(|&n| n == expected))
        })
        .await?;
        let upload_wait = polled.elapsed;
        state = advance(segment, state, SegmentState::UploadConfirmed);

        let import_start = Instant::now();
        self.service
            .import_annotations(task, segment.path(), &self.options.import_format)
            .await?;
        let import_time = import_start.elapsed();
        state = advance(segment, state, SegmentState::AnnotationsImported);

        Ok(SegmentReport {
            index: segment.index(),
            task_id: Some(task),
            image_count: images.len(),
            upload_wait,
            import_time,
            state: advance(segment, state, SegmentState::Done),
            outcome: SegmentOutcome::Done,
        })
    }

    /// Image files of a segment with a recognised extension, in segment order.
    fn resolve_images(&self, segment: &SegmentFile) -> Result<Vec<ImageFile>, Error> {
        let names = segment.image_names()?;
        let mut images = Vec::with_capacity(names.len());
        let mut missing = Vec::new();

        for name in &names {
            if !has_image_extension(name, &self.options.image_extensions) {
                continue;
            }
            let path = self.options.images_dir.join(name);
            if !path.is_file() {
                missing.push(name.as_str());
                continue;
            }
            images.push(ImageFile::new(name, path));
        }

        if !missing.is_empty() {
            return Err(Error::MissingImages(format!(
                "{} images of segment {} not found in {:?}: {}",
                missing.len(),
                segment.index(),
                self.options.images_dir,
                missing.join(", ")
            )));
        }

        let filtered = names.len() - images.len();
        if filtered > 0 {
            warn!(
                "Segment {}: {} images have no recognised extension and were not uploaded",
                segment.index(),
                filtered
            );
        }

        if images.is_empty() {
            return Err(Error::InvalidParameters(format!(
                "Segment {} has no uploadable images",
                segment.index()
            )));
        }

        Ok(images)
    }
}

fn advance(segment: &SegmentFile, from: SegmentState, to: SegmentState) -> SegmentState {
    debug_assert!(from < to);
    debug!("Segment {} is {}", segment.index(), to);
    to
}
