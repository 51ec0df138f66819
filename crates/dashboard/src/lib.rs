//! Dashboard flow: who is uploading, what, and what they have uploaded.
//!
//! This crate has no UI. A front end picks a file, hands it to
//! [`Dashboard::upload`] with its own progress observer, and renders the
//! refreshed listing that comes back on success.

pub mod dashboard;
pub mod error;
pub mod types;

pub use dashboard::Dashboard;
pub use error::DashboardError;
pub use types::{SelectedFile, UploadReport};
