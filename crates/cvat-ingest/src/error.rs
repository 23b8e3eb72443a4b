// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use std::time::Duration;

/// Error type for every CVAT ingestion operation.
///
/// Covers local failures (file I/O, JSON, configuration), transport failures
/// reaching the annotation service, and errors reported by the service
/// itself.
#[derive(Debug)]
pub enum Error {
    /// An I/O error occurred during file operations.
    IoError(std::io::Error),
    /// Configuration parsing or loading error.
    ConfigError(config::ConfigError),
    /// JSON serialization or deserialization error.
    JsonError(serde_json::Error),
    /// Transport-level failure from the reqwest client (connection refused,
    /// DNS, timeouts).
    HttpError(reqwest::Error),
    /// URL parsing error.
    UrlParseError(url::ParseError),
    /// Integer parsing error.
    ParseIntError(std::num::ParseIntError),
    /// The service answered with a non-2xx status.
    ServiceError { status: u16, message: String },
    /// Login was rejected or did not produce a session token.
    AuthenticationFailed(String),
    /// Server returned an invalid or unexpected response.
    InvalidResponse,
    /// Invalid parameters provided to an operation.
    InvalidParameters(String),
    /// Images listed in a segment are missing from the images directory.
    MissingImages(String),
    /// A bounded poll gave up before the condition was met.
    PollTimeout { attempts: u32, elapsed: Duration },
    /// The service accepted an annotation import and later reported failure.
    ImportFailed(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err)
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Error::ConfigError(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonError(err)
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::HttpError(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::UrlParseError(err)
    }
}

impl From<std::num::ParseIntError> for Error {
    fn from(err: std::num::ParseIntError) -> Self {
        Error::ParseIntError(err)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(e) => write!(f, "I/O error: {}", e),
            Error::ConfigError(e) => write!(f, "Configuration error: {}", e),
            Error::JsonError(e) => write!(f, "JSON error: {}", e),
            Error::HttpError(e) => write!(f, "HTTP error: {}", e),
            Error::UrlParseError(e) => write!(f, "URL parse error: {}", e),
            Error::ParseIntError(e) => write!(f, "Integer parse error: {}", e),
            Error::ServiceError { status, message } => {
                write!(f, "Service error {}: {}", status, message)
            }
            Error::AuthenticationFailed(s) => write!(f, "Authentication failed: {}", s),
            Error::InvalidResponse => write!(f, "Invalid server response"),
            Error::InvalidParameters(s) => write!(f, "Invalid parameters: {}", s),
            Error::MissingImages(s) => write!(f, "Missing images: {}", s),
            Error::PollTimeout { attempts, elapsed } => write!(
                f,
                "Gave up polling after {} attempts ({:.1}s)",
                attempts,
                elapsed.as_secs_f64()
            ),
            Error::ImportFailed(s) => write!(f, "Annotation import failed: {}", s),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(e) => Some(e),
            Error::ConfigError(e) => Some(e),
            Error::JsonError(e) => Some(e),
            Error::HttpError(e) => Some(e),
            Error::UrlParseError(e) => Some(e),
            Error::ParseIntError(e) => Some(e),
            _ => None,
        }
    }
}
