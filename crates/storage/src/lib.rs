pub mod backend;
pub mod error;
mod object;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::object::{Access, PutOptions, StoredObject};
pub use crate::path::validate as validate_key;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
