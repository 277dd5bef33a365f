//! Domain models shared across forumcp crates.

mod auth;
mod bypass;
mod site;

pub use auth::{AuthMode, AuthOverride, LoginCredentials, find_override};
pub use bypass::{BypassMethod, BypassTechnique};
pub use site::{normalize_base, same_origin};
