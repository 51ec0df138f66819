//! Storage capability and backend adapters.
//!
//! The upload controller only knows the [`StorageCapability`] trait. Each
//! backend the dashboard can be wired to is one adapter behind it:
//!
//! - [`MemoryStorage`]: in-process map, for tests and dry runs
//! - [`LocalStorage`]: files under a root directory
//! - [`HttpStorage`]: Supabase-style REST object API
//!
//! Adapters report failures as [`StorageError`], which knows whether a
//! failure is worth retrying.

pub mod content_type;
pub mod encoding;
pub mod error;
pub mod http;
pub mod local;
pub mod memory;
pub mod traits;
pub mod validation;

pub use content_type::{content_type_or_default, detect_content_type};
pub use encoding::{encode_object_path, encode_segment};
pub use error::{StorageError, into_outcome};
pub use http::{ApiKey, HttpStorage, HttpStorageConfig};
pub use local::LocalStorage;
pub use memory::MemoryStorage;
pub use traits::{BoxFuture, ByteProgress, PutOptions, StorageCapability};
pub use validation::{validate_object_path, validate_owner_folder};
