//! Defaults shared across crates.

use std::time::Duration;

/// Default number of attempts per upload.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default fixed delay between upload attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(2000);

/// Default `cache-control` max-age (seconds) sent with uploaded objects.
pub const DEFAULT_CACHE_CONTROL: &str = "3600";

/// Content type used when the MIME type of a file cannot be determined.
pub const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

/// Separator between the owner folder and the file name in object paths.
pub const PATH_SEPARATOR: char = '/';
