//! Flow artifacts and device targets exchanged with the external
//! collaborators.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::navigation::NavigationPath;

/// An opaque, producer-generated automation flow for one case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowArtifact {
    /// Where the flow lives (usually a Maestro YAML file).
    pub location: PathBuf,
    /// Navigation path the flow takes to reach the case's entry point,
    /// when the producer declares one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_path: Option<NavigationPath>,
}

impl FlowArtifact {
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            navigation_path: None,
        }
    }

    pub fn with_navigation_path(mut self, path: NavigationPath) -> Self {
        self.navigation_path = Some(path);
        self
    }
}

/// The device or emulator a flow runs against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    /// Device id passed to the automation CLI; `None` lets it pick.
    pub device: Option<String>,
    /// Application id under test.
    pub app_id: String,
}
