// Session lifecycle core
// Token minting, a bounded per-user registry over an expiring ordered-set
// store, and the login/logout/validate state transitions.

pub mod registry;
pub mod service;
pub mod token;

pub use registry::SessionRegistry;
pub use service::{SessionService, SessionValidation};
