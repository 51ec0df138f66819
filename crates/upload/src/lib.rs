//! Retryable single-file upload.
//!
//! [`UploadController`] pushes one [`UploadRequest`](filedrop_protocol::UploadRequest)
//! through a [`StorageCapability`](filedrop_storage::StorageCapability) with
//! a bounded number of attempts and a fixed delay between them, reporting
//! to a [`ProgressObserver`] as it goes.
//!
//! # Flow
//!
//! 1. **Validate**: reject `max_attempts = 0` and malformed requests
//!    before any storage call
//! 2. **Attempt**: announce `attempt/max`, call `put`
//! 3. **Decide**: success returns, fatal failure returns, transient
//!    failure sleeps and tries again until the budget is spent

pub mod controller;
pub mod error;
pub mod observer;
pub mod progress;

pub use controller::{UploadController, attempt_upload};
pub use error::UploadError;
pub use observer::{ChannelObserver, NoopObserver, ProgressObserver, UploadEvent};
pub use progress::ProgressGauge;
