//! Events recorded against objects.
//!
//! - [`types`]: `Event`, `EventType` and the involved-object reference
//! - [`recorder`]: the `EventRecorder` trait and a broadcast-channel implementation

pub mod recorder;
pub mod types;

pub use recorder::{BroadcastEventRecorder, EventRecorder};
pub use types::{Event, EventType, InvolvedObject};
