// SPDX-FileCopyrightText: 2025 Caspar Water Company
//
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Node type reported for a filesystem entry.
///
/// The numeric codes match the resource types generic filesystem callers
/// expect in the `details` namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    Unknown,
    Directory,
    File,
}

impl ResourceType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Unknown => "unknown",
            ResourceType::Directory => "directory",
            ResourceType::File => "file",
        }
    }

    #[must_use]
    pub fn code(&self) -> u8 {
        match self {
            ResourceType::Unknown => 0,
            ResourceType::Directory => 1,
            ResourceType::File => 2,
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Metadata for one entry, derived from a single remote response.
///
/// Never cached: two calls may disagree if the branch moved in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Info {
    name: String,
    resource_type: ResourceType,
    size: u64,
    modified: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
struct Basic<'a> {
    name: &'a str,
    is_dir: bool,
}

#[derive(Serialize)]
struct Details {
    #[serde(rename = "type")]
    resource_type: u8,
    size: u64,
    modified: Option<f64>,
}

#[derive(Serialize)]
struct Namespaces<'a> {
    basic: Basic<'a>,
    details: Details,
}

impl Info {
    pub fn file<S: Into<String>>(name: S, size: u64, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            resource_type: ResourceType::File,
            size,
            modified,
        }
    }

    pub fn directory<S: Into<String>>(name: S, modified: Option<DateTime<Utc>>) -> Self {
        Self {
            name: name.into(),
            resource_type: ResourceType::Directory,
            size: 0,
            modified,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.resource_type == ResourceType::Directory
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        self.resource_type == ResourceType::File
    }

    #[must_use]
    pub fn resource_type(&self) -> ResourceType {
        self.resource_type
    }

    /// Size in bytes; always 0 for directories.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Time of the commit that last changed this entry, when the client knows it.
    #[must_use]
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    /// Render the `basic` and `details` namespaces as a JSON object.
    pub fn to_namespaces(&self) -> serde_json::Value {
        let raw = Namespaces {
            basic: Basic {
                name: &self.name,
                is_dir: self.is_dir(),
            },
            details: Details {
                resource_type: self.resource_type.code(),
                size: self.size,
                modified: self
                    .modified
                    .map(|t| t.timestamp_micros() as f64 / 1_000_000.0),
            },
        };
        serde_json::to_value(raw).unwrap_or(serde_json::Value::Null)
    }
}
