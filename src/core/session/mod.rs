//! Call sessions: the actor that owns one call's pipeline, and the registry of live calls.

mod actor;
mod errors;
mod events;
mod registry;

pub use actor::{Session, SessionConfig};
pub use errors::{SessionError, SessionResult};
pub use events::SessionEvent;
pub use registry::{SessionInfo, SessionRegistry};
