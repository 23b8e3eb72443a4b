// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Run configuration.
//!
//! [`IngestConfig`] is loaded from an optional TOML file layered under
//! environment variables prefixed with `CVAT_INGEST` (nested keys separated
//! by `__`):
//!
//! ```toml
//! server = "http://localhost:8080"
//! username = "annotator"
//! images_dir = "/data/images"
//! annotations = "/data/gt.json"
//! segment_size = 500
//!
//! [project]
//! name = "vehicles"
//! labels = [
//!     { name = "car", color = "#2080c0", type = "rectangle" },
//!     { name = "truck", color = "#c08020" },
//! ]
//!
//! [task]
//! name = "vehicles"
//!
//! [poll]
//! interval_secs = 2.0
//! ```
//!
//! `CVAT_INGEST__SEGMENT_SIZE=250` overrides `segment_size`,
//! `CVAT_INGEST__POLL__MAX_ATTEMPTS=600` overrides `poll.max_attempts`.

use crate::{
    Error, Label, ProjectID, TaskID,
    ingest::{CreateFailurePolicy, IngestOptions, ProjectMode, TaskMode},
    poll::PollPolicy,
};
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

const ENV_PREFIX: &str = "CVAT_INGEST";
const CONFIG_FILE: &str = "ingest.toml";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ProjectConfig {
    pub name: String,
    pub labels: Vec<Label>,
    /// Existing project used when `create_project` is false.
    pub id: Option<u64>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        ProjectConfig {
            name: "cvat-ingest".to_owned(),
            labels: Vec::new(),
            id: None,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TaskConfig {
    /// Base name of created tasks.
    pub name: String,
    pub assignee: Option<u64>,
    /// Existing tasks, one per segment, used when `create_task` is false.
    pub ids: Vec<u64>,
}

impl Default for TaskConfig {
    fn default() -> Self {
        TaskConfig {
            name: "segment".to_owned(),
            assignee: None,
            ids: Vec::new(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct PollConfig {
    pub interval_secs: f64,
    pub max_attempts: Option<u32>,
    pub timeout_secs: Option<f64>,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval_secs: 1.0,
            max_attempts: None,
            timeout_secs: None,
        }
    }
}

/// Everything an ingestion run needs.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub images_dir: PathBuf,
    /// Source COCO annotation file.
    pub annotations: PathBuf,
    /// Where segment files are written; defaults to `<stem>_splits` next to
    /// the annotation file.
    pub output_dir: Option<PathBuf>,
    pub segment_size: usize,
    pub project: ProjectConfig,
    pub task: TaskConfig,
    pub create_project: bool,
    pub create_task: bool,
    pub on_create_failure: CreateFailurePolicy,
    pub import_format: String,
    pub image_extensions: Vec<String>,
    pub poll: PollConfig,
}

impl Default for IngestConfig {
    fn default() -> Self {
        IngestConfig {
            server: String::new(),
            username: String::new(),
            password: String::new(),
            images_dir: PathBuf::new(),
            annotations: PathBuf::new(),
            output_dir: None,
            segment_size: 500,
            project: ProjectConfig::default(),
            task: TaskConfig::default(),
            create_project: true,
            create_task: true,
            on_create_failure: CreateFailurePolicy::Abort,
            import_format: "COCO 1.0".to_owned(),
            image_extensions: ["png", "jpg", "jpeg"].map(String::from).to_vec(),
            poll: PollConfig::default(),
        }
    }
}

/// Default location of the configuration file, for example
/// `~/.config/cvat-ingest/ingest.toml` on Linux.
pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "cvat-ingest").map(|dirs| dirs.config_dir().join(CONFIG_FILE))
}

impl IngestConfig {
    /// Load the configuration from `path`, or from the default location when
    /// `path` is `None` and that file exists, overridden by `CVAT_INGEST__*`
    /// environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        let path = match path {
            Some(path) => Some(path.to_path_buf()),
            None => default_config_path().filter(|p| p.is_file()),
        };

        Self::from_sources(path.as_deref(), environment())
    }

    fn from_sources(path: Option<&Path>, env: Environment) -> Result<Self, Error> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            log::debug!("Loading configuration from {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder.add_source(env).build()?;
        Ok(config.try_deserialize()?)
    }

    /// Checks needed before splitting.
    pub fn validate_split(&self) -> Result<(), Error> {
        if self.annotations.as_os_str().is_empty() {
            return Err(Error::InvalidParameters(
                "No annotation file configured".to_owned(),
            ));
        }
        if self.segment_size == 0 {
            return Err(Error::InvalidParameters(
                "Segment size must be greater than zero".to_owned(),
            ));
        }
        Ok(())
    }

    /// Checks needed before a full ingestion run.
    pub fn validate(&self) -> Result<(), Error> {
        self.validate_split()?;

        for (field, value) in [
            ("server", &self.server),
            ("username", &self.username),
            ("password", &self.password),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidParameters(format!("No {} configured", field)));
            }
        }
        Url::parse(&self.server)?;

        if self.images_dir.as_os_str().is_empty() {
            return Err(Error::InvalidParameters(
                "No images directory configured".to_owned(),
            ));
        }

        let mut names = HashSet::new();
        for label in &self.project.labels {
            if !names.insert(label.name()) {
                return Err(Error::InvalidParameters(format!(
                    "Duplicate label name {}",
                    label.name()
                )));
            }
        }

        self.poll_policy()?;
        Ok(())
    }

    pub fn output_dir(&self) -> PathBuf {
        if let Some(dir) = &self.output_dir {
            return dir.clone();
        }
        let stem = self
            .annotations
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("segments");
        self.annotations
            .with_file_name(format!("{}_splits", stem))
    }

    /// Extensions lowercased with any leading dot removed.
    pub fn image_extensions(&self) -> Vec<String> {
        self.image_extensions
            .iter()
            .map(|ext| ext.trim().trim_start_matches('.').to_lowercase())
            .filter(|ext| !ext.is_empty())
            .collect()
    }

    pub fn poll_policy(&self) -> Result<PollPolicy, Error> {
        let interval = secs(self.poll.interval_secs, "poll.interval_secs")?;
        let mut policy = PollPolicy::default().with_interval(interval);
        if let Some(max) = self.poll.max_attempts {
            policy = policy.with_max_attempts(max);
        }
        if let Some(timeout) = self.poll.timeout_secs {
            policy = policy.with_timeout(secs(timeout, "poll.timeout_secs")?);
        }
        Ok(policy)
    }

    pub fn project_mode(&self) -> Result<ProjectMode, Error> {
        if self.create_project {
            return Ok(ProjectMode::Create);
        }
        match self.project.id {
            Some(id) => Ok(ProjectMode::Existing(ProjectID::from(id))),
            None => Err(Error::InvalidParameters(
                "Project creation disabled but no project id supplied".to_owned(),
            )),
        }
    }

    pub fn task_mode(&self) -> Result<TaskMode, Error> {
        if self.create_task {
            return Ok(TaskMode::Create);
        }
        if self.task.ids.is_empty() {
            return Err(Error::InvalidParameters(
                "Task creation disabled but no task ids supplied".to_owned(),
            ));
        }
        Ok(TaskMode::Existing(
            self.task.ids.iter().copied().map(TaskID::from).collect(),
        ))
    }

    /// Options for the [`Ingestor`](crate::Ingestor).
    pub fn ingest_options(&self) -> Result<IngestOptions, Error> {
        let mut options = IngestOptions::new(&self.images_dir);
        options.project_mode = self.project_mode()?;
        options.project_name = self.project.name.clone();
        options.labels = self.project.labels.clone();
        options.task_mode = self.task_mode()?;
        options.task_name = self.task.name.clone();
        options.assignee = self.task.assignee;
        options.image_extensions = self.image_extensions();
        options.import_format = self.import_format.clone();
        options.poll = self.poll_policy()?;
        options.on_create_failure = self.on_create_failure;
        Ok(options)
    }
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("image_extensions")
        .with_list_parse_key("task.ids")
}

fn secs(value: f64, field: &str) -> Result<Duration, Error> {
    if value <= 0.0 {
        return Err(Error::InvalidParameters(format!(
            "{} must be positive",
            field
        )));
    }
    Duration::try_from_secs_f64(value)
        .map_err(|err| Error::InvalidParameters(format!("{}: {}", field, err)))
}
