//! The retry loop.

use std::time::Duration;

use filedrop_protocol::{AttemptOutcome, RetryPolicy, UploadRequest, UploadResult};
use filedrop_storage::{StorageCapability, validate_object_path};
use tracing::{debug, error, info, warn};

use crate::error::UploadError;
use crate::observer::ProgressObserver;
use crate::progress::{ProgressGauge, attempt_percent};

/// Runs uploads against one storage backend with a fixed retry policy.
pub struct UploadController<'a> {
    storage: &'a dyn StorageCapability,
    policy: RetryPolicy,
}

impl<'a> UploadController<'a> {
    pub fn new(storage: &'a dyn StorageCapability, policy: RetryPolicy) -> Self {
        Self { storage, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Uploads `request`, retrying transient failures.
    ///
    /// Produces exactly one terminal [`UploadResult`]. `Err` is only
    /// returned for input rejected before the first storage call; the
    /// rejection is also reported to the observer.
    ///
    /// The last observer call is either an error status or `on_progress(100)`.
    pub async fn attempt_upload(
        &self,
        request: &UploadRequest,
        observer: &dyn ProgressObserver,
    ) -> Result<UploadResult, UploadError> {
        if let Err(e) = validate(request, &self.policy) {
            warn!(error = %e, "upload rejected");
            observer.on_status(&e.to_string(), true);
            return Err(e);
        }

        let path = request.object_path();
        let max_attempts = self.policy.max_attempts;
        let backend = self.storage.backend_name();
        let gauge = ProgressGauge::new();
        let on_bytes = |sent: u64, total: u64| {
            if let Some(percent) = gauge.report_bytes(sent, total) {
                observer.on_progress(percent);
            }
        };

        let mut attempt: u32 = 0;
        let mut last_message = String::new();

        while attempt < max_attempts {
            let number = attempt + 1;
            observer.on_attempt(number, max_attempts);
            if let Some(percent) = gauge.report(attempt_percent(attempt, max_attempts)) {
                observer.on_progress(percent);
            }

            info!(
                path = %path,
                backend,
                attempt = number,
                max_attempts,
                bytes = request.size_bytes,
                "upload attempt"
            );

            let outcome = self
                .storage
                .put(
                    &path,
                    request.payload.clone(),
                    &request.mime_type,
                    Some(&on_bytes),
                )
                .await;

            match outcome {
                AttemptOutcome::Success { access_url } => {
                    info!(path = %path, attempts = number, "upload complete");
                    observer.on_status(&format!("Uploaded! {access_url}"), false);
                    observer.on_progress(gauge.complete());
                    return Ok(UploadResult::Success { access_url });
                }
                AttemptOutcome::TransientFailure { message } => {
                    warn!(
                        path = %path,
                        attempt = number,
                        max_attempts,
                        error = %message,
                        "upload attempt failed"
                    );
                    if number >= max_attempts {
                        return Ok(exhausted(observer, &path, message, number));
                    }

                    let delay = self.policy.delay_between_attempts;
                    observer.on_status(
                        &format!(
                            "Attempt {number} failed: {message}. Retrying in {:.1}s...",
                            delay.as_secs_f64()
                        ),
                        false,
                    );
                    debug!(path = %path, delay_ms = millis(delay), "waiting before retry");
                    tokio::time::sleep(delay).await;

                    last_message = message;
                    attempt += 1;
                }
                AttemptOutcome::FatalFailure { message } => {
                    warn!(
                        path = %path,
                        attempt = number,
                        error = %message,
                        "upload failed, not retrying"
                    );
                    return Ok(exhausted(observer, &path, message, number));
                }
            }
        }

        // Unreachable while max_attempts >= 1.
        error!(path = %path, attempts = attempt, "retry loop ended without a terminal outcome");
        Ok(exhausted(observer, &path, last_message, attempt))
    }
}

/// Uploads `request` to `storage` under `policy`, reporting to `observer`.
pub async fn attempt_upload(
    request: &UploadRequest,
    policy: RetryPolicy,
    storage: &dyn StorageCapability,
    observer: &dyn ProgressObserver,
) -> Result<UploadResult, UploadError> {
    UploadController::new(storage, policy)
        .attempt_upload(request, observer)
        .await
}

fn exhausted(
    observer: &dyn ProgressObserver,
    path: &str,
    last_message: String,
    attempts_made: u32,
) -> UploadResult {
    info!(path, attempts = attempts_made, "upload gave up");
    observer.on_status(
        &format!("Upload failed after {attempts_made} attempt(s): {last_message}"),
        true,
    );
    UploadResult::ExhaustedRetries {
        last_message,
        attempts_made,
    }
}

/// Whole milliseconds in `delay`, saturating at `u64::MAX`.
fn millis(delay: Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

fn validate(request: &UploadRequest, policy: &RetryPolicy) -> Result<(), UploadError> {
    if policy.max_attempts == 0 {
        return Err(UploadError::InvalidPolicy);
    }
    if request.owner_id.is_empty() {
        return Err(UploadError::InvalidRequest("no authenticated owner".into()));
    }
    if request.file_identifier.is_empty() {
        return Err(UploadError::InvalidRequest("empty file name".into()));
    }
    if request.size_bytes != request.payload.len() as u64 {
        return Err(UploadError::InvalidRequest(format!(
            "declared size {} does not match payload size {}",
            request.size_bytes,
            request.payload.len()
        )));
    }
    validate_object_path(&request.object_path())
        .map_err(|e| UploadError::InvalidRequest(e.to_string()))
}
