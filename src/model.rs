//! Read-only snapshots received from the backend API

use crate::container::Container;
use serde::{Deserialize, Serialize};

/// An accounting entry selected for removal
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountingRecord {
    /// Backend identifier; `None` means there is nothing to remove
    #[serde(default)]
    pub id: Option<String>,

    /// User the accounting belongs to (display only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Image the accounting grants access to (display only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_name: Option<String>,
}

impl AccountingRecord {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn without_id() -> Self {
        Self::default()
    }
}

/// Display and mount policy attached to an image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default)]
    pub allow_home: bool,
    #[serde(default)]
    pub volume_source: Option<String>,
    #[serde(default)]
    pub volume_target: Option<String>,
    #[serde(default)]
    pub volume_mode: Option<String>,
}

impl Policy {
    /// The mount triple, only when every part is present and non-empty
    pub fn volume(&self) -> Option<(&str, &str, &str)> {
        fn non_empty(v: &Option<String>) -> Option<&str> {
            v.as_deref().filter(|s| !s.is_empty())
        }

        Some((
            non_empty(&self.volume_source)?,
            non_empty(&self.volume_target)?,
            non_empty(&self.volume_mode)?,
        ))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    #[serde(default)]
    pub ui_name: String,
    /// Base64 encoded 128px PNG icon, empty when the image has none
    #[serde(default)]
    pub icon_128: String,
    #[serde(default)]
    pub policy: Policy,
}

impl Image {
    /// Name shown to the user: the UI name when set, else the image name
    pub fn display_name(&self) -> &str {
        if self.ui_name.is_empty() {
            &self.name
        } else {
            &self.ui_name
        }
    }
}

/// One launchable application and, if running, its container
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApplicationEntry {
    #[serde(default)]
    pub mapping_id: String,
    pub image: Image,
    #[serde(default)]
    pub container: Option<Container>,
}

impl ApplicationEntry {
    pub fn is_running(&self) -> bool {
        self.container.is_some()
    }
}
