//! Host collaborator boundaries.
//!
//! The engine never renders anything and never touches the filesystem.
//! Hosts implement two traits at this seam:
//!
//! - [`MessageSink`]: receives composed notices and URL-open requests.
//! - [`InstanceStore`]: a flat string-keyed store scoped to a persisted
//!   instance, used by instance-gated rules.
//!
//! [`SessionId`] and [`InstanceId`] identify the host's lifecycle scopes:
//! a session is a live object that changes identity when the host swaps
//! the active game/workspace; an instance is the persisted entity that
//! survives process restarts.

mod session;
mod sink;
mod store;

pub use session::{InstanceId, SessionId};
pub use sink::{MessageSink, Notice};
pub use store::{InstanceStore, MemoryStore};
