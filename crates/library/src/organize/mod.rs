//! Emptying the photos folder into the dated Camera hierarchy.
//!
//! Every item in the source folder goes through the same steps: it is
//! [classified](crate::classify) by MIME type, its local date is
//! [resolved](crate::resolve_date), the destination folder is provisioned
//! (created if missing), and finally the item is moved there with retries.
//!
//! The primary entry point is [`organize`] which streams an [`OrganizeEvent`]
//! per moved item while repeatedly listing the source folder until it is
//! empty. [`run`] drives the same stream to completion, and [`organize_item`]
//! handles a single item.

pub mod error;
mod file;
mod mover;
mod provision;
mod stream;

pub use self::file::{Moved, organize_item};
pub use self::mover::Mover;
pub use self::provision::FolderProvisioner;
pub use self::stream::{OrganizeEvent, Outcome, Progress, organize, run};
