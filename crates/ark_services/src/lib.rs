//! Ark Services Layer
//!
//! Collaborators built on top of the core's external contracts:
//! runtime settings and JSON entity snapshots.

pub mod settings;
pub mod snapshot;

pub use settings::{RuntimeSettings, SettingsError};
pub use snapshot::{JsonDirector, SnapshotError};
