pub mod artifacts;
pub mod config;
pub mod error;
pub mod footprint;
pub mod ident;
pub mod input;
pub mod io;
pub mod manifest;
pub mod orchestrator;
pub mod packer;
pub mod report;
pub mod template;
pub mod types;

pub use error::{PackError, Result};
