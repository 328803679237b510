//! Core orchestration for pbnforge.
//!
//! This crate ties the generator and the WordPress client together into the
//! batch runner, and owns the task input and results manifest formats.

pub mod import;
pub mod manifest;
pub mod pipeline;
pub mod tasks;

pub use import::{import_csv, parse_csv};
pub use manifest::{read_results, write_results};
pub use pipeline::{RunProgress, RunReport, SilentProgress, TaskRunner};
pub use tasks::{load_tasks, parse_tasks};
