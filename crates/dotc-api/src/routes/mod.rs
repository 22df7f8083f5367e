//! # API Route Modules
//!
//! Each module exposes a `router()` returning `Router<AppState>`.

pub mod cafs;
pub mod classify;
pub mod routing;
