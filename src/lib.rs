//! Shared code for the sandboxed launcher and its helper programs.

#![cfg(unix)]

mod err;
pub use err::*;

pub mod config;
pub use config::Config;

mod stage;
pub use stage::*;

mod system;
pub use system::*;

mod launcher;
pub use launcher::*;
