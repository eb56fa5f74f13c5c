//! Remoteapp - server-rendered admin UI for remote applications
//!
//! This library provides:
//! - An application list with start, view and stop buttons whose clicks are
//!   forwarded to pluggable handlers
//! - A confirmation dialog that removes accounting records through the backend API
//! - The HTTP server hosting both, configured from a TOML file
//! - [`container::Container::from_docker_summary`] for backends that build
//!   the container records from Docker's container listing

pub mod config;
pub mod container;
pub mod dashboard;
pub mod dialog;
pub mod error;
pub mod launcher;
pub mod model;
pub mod resources;
pub mod server;
pub mod util;
pub mod views;
