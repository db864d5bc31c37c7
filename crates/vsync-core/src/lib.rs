pub mod error;
pub mod events;
pub mod gvk;
pub mod key;
pub mod object;

pub use error::{CoreError, ErrorCategory, Result};
pub use events::{BroadcastEventRecorder, Event, EventRecorder, EventType};
pub use gvk::GroupVersionKind;
pub use key::ObjectKey;
pub use object::{Object, ObjectMeta, OwnerReference};
