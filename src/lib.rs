#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_field_names,
    clippy::must_use_candidate,
    clippy::return_self_not_must_use
)]

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod judge;
pub mod optimize;
pub mod prompt;
pub mod providers;
pub mod scenario;
pub mod scoring;
pub mod store;
pub mod synthesis;
pub mod taxonomy;
pub mod transfer;

pub use config::Config;
pub use error::{BenchError, Result};
