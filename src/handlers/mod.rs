// handlers/mod.rs - HTTP handlers, mounted under the API base path by `app::router`
pub mod public;

pub use public::*;
