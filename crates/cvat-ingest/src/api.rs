// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

#[derive(Deserialize)]
pub struct LoginResult {
    #[serde(default)]
    pub(crate) key: Option<String>,
}

/// Unique identifier for a CVAT project.
///
/// CVAT assigns plain integer ids, so the id displays and parses as a decimal
/// number.
///
/// # Examples
///
/// ```rust
/// use cvat_ingest::ProjectID;
/// use std::str::FromStr;
///
/// let project_id = ProjectID::from(42);
/// assert_eq!(project_id.to_string(), "42");
///
/// let project_id = ProjectID::from_str("17").unwrap();
/// assert_eq!(project_id.value(), 17);
/// ```
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ProjectID(u64);

impl Display for ProjectID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProjectID {
    fn from(id: u64) -> Self {
        ProjectID(id)
    }
}

impl From<ProjectID> for u64 {
    fn from(val: ProjectID) -> Self {
        val.0
    }
}

impl ProjectID {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<&str> for ProjectID {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        ProjectID::from_str(s)
    }
}

impl TryFrom<String> for ProjectID {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        ProjectID::from_str(&s)
    }
}

impl FromStr for ProjectID {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().parse::<u64>()?;
        Ok(ProjectID(id))
    }
}

/// Unique identifier for a CVAT task.
///
/// # Examples
///
/// ```rust
/// use cvat_ingest::TaskID;
///
/// let task_id: TaskID = "128".try_into().unwrap();
/// assert_eq!(task_id.value(), 128);
/// assert!(TaskID::try_from("t-128").is_err());
/// ```
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TaskID(u64);

impl Display for TaskID {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TaskID {
    fn from(id: u64) -> Self {
        TaskID(id)
    }
}

impl From<TaskID> for u64 {
    fn from(val: TaskID) -> Self {
        val.0
    }
}

impl TaskID {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl TryFrom<&str> for TaskID {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        TaskID::from_str(s)
    }
}

impl TryFrom<String> for TaskID {
    type Error = Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        TaskID::from_str(&s)
    }
}

impl FromStr for TaskID {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let id = s.trim().parse::<u64>()?;
        Ok(TaskID(id))
    }
}

/// Shape type a label is drawn with in the annotation UI.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LabelType {
    /// Any shape may be used with the label.
    Any,
    #[default]
    Rectangle,
    Polygon,
    Polyline,
    Points,
    Ellipse,
    Cuboid,
    Mask,
    Skeleton,
    Tag,
}

impl Display for LabelType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let name = match self {
            LabelType::Any => "any",
            LabelType::Rectangle => "rectangle",
            LabelType::Polygon => "polygon",
            LabelType::Polyline => "polyline",
            LabelType::Points => "points",
            LabelType::Ellipse => "ellipse",
            LabelType::Cuboid => "cuboid",
            LabelType::Mask => "mask",
            LabelType::Skeleton => "skeleton",
            LabelType::Tag => "tag",
        };
        write!(f, "{}", name)
    }
}

/// Project-scope label definition.
///
/// # Examples
///
/// ```rust
/// use cvat_ingest::{Label, LabelType};
///
/// let label = Label::new("car", "#2080c0", LabelType::Rectangle);
/// assert_eq!(label.name(), "car");
/// ```
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Label {
    name: String,
    color: String,
    #[serde(rename = "type", default)]
    kind: LabelType,
}

impl Label {
    pub fn new(name: &str, color: &str, kind: LabelType) -> Self {
        Label {
            name: name.to_owned(),
            color: color.to_owned(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn kind(&self) -> LabelType {
        self.kind
    }
}

/// Label as sent in a project PATCH request.
#[derive(Serialize)]
pub(crate) struct LabelWrite<'a> {
    pub name: &'a str,
    pub color: &'a str,
    #[serde(rename = "type")]
    pub kind: LabelType,
    pub attributes: Vec<serde_json::Value>,
    pub multi_shapes: bool,
}

impl<'a> From<&'a Label> for LabelWrite<'a> {
    fn from(label: &'a Label) -> Self {
        LabelWrite {
            name: &label.name,
            color: &label.color,
            kind: label.kind,
            attributes: Vec::new(),
            multi_shapes: false,
        }
    }
}

#[derive(Serialize)]
pub(crate) struct ProjectLabelsPatch<'a> {
    pub labels: Vec<LabelWrite<'a>>,
}

#[derive(Serialize)]
pub(crate) struct ProjectCreate<'a> {
    pub name: &'a str,
}

#[derive(Serialize)]
pub(crate) struct StorageLocation {
    pub location: &'static str,
}

#[derive(Serialize)]
pub(crate) struct TaskCreate<'a> {
    pub name: &'a str,
    pub project_id: ProjectID,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<u64>,
    pub source_storage: StorageLocation,
}

/// Project as returned by the service.
#[derive(Deserialize, Clone, Debug)]
pub struct Project {
    id: ProjectID,
    #[serde(default)]
    name: String,
}

impl Display for Project {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.id(), self.name())
    }
}

impl Project {
    pub fn id(&self) -> ProjectID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Task metadata as returned by the service.
///
/// `size` is the number of frames the server has ingested for the task. It
/// is absent (or null) until the data upload has been processed.
#[derive(Deserialize, Clone, Debug)]
pub struct Task {
    id: TaskID,
    #[serde(default)]
    name: String,
    #[serde(default)]
    project_id: Option<ProjectID>,
    #[serde(default)]
    size: Option<u64>,
}

impl Display for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} {}", self.id(), self.name())
    }
}

impl Task {
    pub fn id(&self) -> TaskID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn project_id(&self) -> Option<ProjectID> {
        self.project_id
    }

    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

/// Background request handle returned when an import is queued.
#[derive(Deserialize, Debug)]
pub(crate) struct RequestHandle {
    pub rq_id: String,
}

/// Status of a queued background request.
#[derive(Deserialize, Debug)]
pub(crate) struct RequestStatus {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
}

/// Server identification returned by the about endpoint.
#[derive(Deserialize, Clone, Debug)]
pub struct ServerAbout {
    #[serde(default)]
    pub name: String,
    pub version: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parsing() {
        assert_eq!(ProjectID::from_str("12").unwrap().value(), 12);
        assert_eq!(TaskID::try_from(" 7\n").unwrap().value(), 7);
        assert!(ProjectID::from_str("p-12").is_err());
        assert!(TaskID::from_str("").is_err());
    }

    #[test]
    fn test_label_write_shape() {
        let label = Label::new("person", "#c06060", LabelType::Rectangle);
        let patch = ProjectLabelsPatch {
            labels: vec![LabelWrite::from(&label)],
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "labels": [{
                    "name": "person",
                    "color": "#c06060",
                    "type": "rectangle",
                    "attributes": [],
                    "multi_shapes": false,
                }]
            })
        );
    }

    #[test]
    fn test_task_size_absent() {
        let task: Task = serde_json::from_str(r#"{"id": 3, "name": "t"}"#).unwrap();
        assert_eq!(task.size(), None);

        let task: Task = serde_json::from_str(r#"{"id": 3, "size": null}"#).unwrap();
        assert_eq!(task.size(), None);

        let task: Task = serde_json::from_str(r#"{"id": 3, "size": 500}"#).unwrap();
        assert_eq!(task.size(), Some(500));
    }

    #[test]
    fn test_task_create_omits_missing_assignee() {
        let create = TaskCreate {
            name: "segment",
            project_id: ProjectID::from(4),
            assignee_id: None,
            source_storage: StorageLocation { location: "local" },
        };
        let json = serde_json::to_value(&create).unwrap();
        assert!(json.get("assignee_id").is_none());
        assert_eq!(json["project_id"], 4);
        assert_eq!(json["source_storage"]["location"], "local");
    }
}
