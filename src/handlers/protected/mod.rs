// handlers/protected - endpoints behind bearer authentication
//
// Every handler here receives the caller as Extension<AuthUser>, inserted by
// middleware::require_user.
pub mod content;
pub mod me;
pub mod progress;

pub use content::{challenges_get, lessons_get};
pub use me::me_get;
pub use progress::{progress_get, progress_put};
