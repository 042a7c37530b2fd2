#![forbid(unsafe_code)]
#![doc = include_str!("../README.md")]

mod blueprint;
pub mod config;
mod core;
pub mod engine;
mod error;
pub mod pipeline;
pub mod shell;
mod utils;

pub use crate::blueprint::{Blueprint, Pipeline, TaskBinder, TaskDef};
pub use crate::config::ProjectConfig;
pub use crate::core::{Environment, Hash32, Mode, TaskContext};
pub use crate::engine::{Dependencies, Diagnostics, Handle, Outputs};
pub use crate::error::*;
pub use crate::pipeline::{BuildSummary, Invocation};
pub use crate::utils::{as_overhead, init_logging};
