pub mod auth;
pub mod backend;
pub mod error;
mod models;
mod path;

pub use crate::auth::{StaticToken, TokenHandle, TokenProvider};
pub use crate::backend::StorageBackend;
pub use crate::models::{FolderFacet, FolderReference, Listing, RemoteItem};
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;
