//! Agent dev server and shared bootstrap for the binaries.

pub mod bootstrap;
pub mod server;
