//! Public types for the sync API
pub use crate::sync::history::{SyncItem, SyncReport};
