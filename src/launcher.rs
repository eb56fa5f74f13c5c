//! Button handlers that start, stop and open containers via the backend

use crate::dialog::COMMUNICATION_ERROR;
use crate::model::ApplicationEntry;
use crate::resources::ApplicationResource;
use crate::util::url_path_join;
use crate::views::{ButtonHandlers, ClickOutcome};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

pub struct RemoteLauncher {
    applications: Arc<dyn ApplicationResource>,
    base_url: String,
}

impl RemoteLauncher {
    pub fn new(applications: Arc<dyn ApplicationResource>, base_url: impl Into<String>) -> Self {
        Self {
            applications,
            base_url: base_url.into(),
        }
    }

    /// Where the UI of a running container is served
    pub fn container_url(&self, url_id: &str) -> String {
        url_path_join(&[&self.base_url, "containers", url_id, "/"])
    }
}

#[async_trait]
impl ButtonHandlers for RemoteLauncher {
    async fn x_button_clicked(&self, index: usize, entry: &ApplicationEntry) -> ClickOutcome {
        if let Some(container) = &entry.container {
            return ClickOutcome::Navigate(self.container_url(&container.url_id));
        }

        match self.applications.start(&entry.mapping_id).await {
            Ok(()) => {
                info!(index, mapping_id = %entry.mapping_id, "Application started");
                ClickOutcome::Started
            }
            Err(e) => {
                warn!(index, mapping_id = %entry.mapping_id, error = %e, "Failed to start application");
                ClickOutcome::Failed(COMMUNICATION_ERROR.to_string())
            }
        }
    }

    async fn y_button_clicked(&self, index: usize, entry: &ApplicationEntry) -> ClickOutcome {
        let Some(container) = &entry.container else {
            return ClickOutcome::Ignored;
        };

        match self.applications.stop(&container.url_id).await {
            Ok(()) => {
                info!(index, url_id = %container.url_id, "Application stopped");
                ClickOutcome::Stopped
            }
            Err(e) => {
                warn!(index, url_id = %container.url_id, error = %e, "Failed to stop application");
                ClickOutcome::Failed(COMMUNICATION_ERROR.to_string())
            }
        }
    }
}
