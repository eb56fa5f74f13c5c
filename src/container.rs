//! Running container snapshot and conversion from Docker listings

use bollard::models::ContainerSummary;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Label namespace for image metadata
pub const LABEL_NS: &str = "org.remoteapp.docker.";

/// Label namespace for per-run information attached at container start
pub const RUNINFO_NS: &str = "org.remoteapp.docker.runinfo.";

/// Errors converting a Docker listing into a [`Container`]
#[derive(Debug, Error, PartialEq)]
pub enum ContainerError {
    #[error("container {docker_id} exposes {count} ports, expected at most one")]
    MultiplePorts { docker_id: String, count: usize },

    #[error("container {docker_id} has invalid url path '{urlpath}'")]
    InvalidUrlPath { docker_id: String, urlpath: String },
}

/// A container started for an application
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Container {
    pub docker_id: String,
    pub name: String,
    pub image_name: String,
    pub image_id: String,
    pub user: String,
    pub mapping_id: String,
    /// Opaque identifier used in the container's public URL
    pub url_id: String,
    pub urlpath: String,
    pub realm: String,
    pub ip: Option<String>,
    pub port: Option<u16>,
}

impl Container {
    /// Address the container's web server answers on
    pub fn host_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.ip.as_deref().unwrap_or("0.0.0.0"),
            self.port.map(|p| p.to_string()).unwrap_or_default()
        )
    }

    /// Build a container from a `docker ps` style summary
    pub fn from_docker_summary(summary: &ContainerSummary) -> Result<Self, ContainerError> {
        let docker_id = summary.id.clone().unwrap_or_default();
        let empty = HashMap::new();
        let labels = summary.labels.as_ref().unwrap_or(&empty);
        let runinfo = |key: &str| {
            labels
                .get(&format!("{RUNINFO_NS}{key}"))
                .cloned()
                .unwrap_or_default()
        };

        let urlpath = runinfo("urlpath");
        if !urlpath.is_empty() && !is_valid_urlpath(&urlpath) {
            return Err(ContainerError::InvalidUrlPath { docker_id, urlpath });
        }

        let ports = summary.ports.as_deref().unwrap_or_default();
        let (ip, port) = match ports {
            [] => (None, None),
            [port] => (
                port.ip.clone(),
                Some(port.public_port.unwrap_or(port.private_port)),
            ),
            _ => {
                return Err(ContainerError::MultiplePorts {
                    docker_id,
                    count: ports.len(),
                })
            }
        };

        Ok(Self {
            name: summary
                .names
                .as_ref()
                .and_then(|names| names.first().cloned())
                .unwrap_or_default(),
            image_name: summary.image.clone().unwrap_or_default(),
            image_id: summary.image_id.clone().unwrap_or_default(),
            user: runinfo("user"),
            mapping_id: runinfo("mapping_id"),
            url_id: runinfo("url_id"),
            realm: runinfo("realm"),
            urlpath,
            ip,
            port,
            docker_id,
        })
    }
}

/// `/a/b/c`: rooted, no trailing slash, no empty segments
fn is_valid_urlpath(path: &str) -> bool {
    match path.strip_prefix('/') {
        Some(rest) => !rest.is_empty() && rest.split('/').all(|segment| !segment.is_empty()),
        None => false,
    }
}
