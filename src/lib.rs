// Library surface for the binary, headless integration tests and reuse.
pub mod app;
pub mod app_dirs;
pub mod calibration;
pub mod config;
pub mod director;
pub mod drill;
pub mod error;
pub mod geometry;
pub mod hit_policy;
pub mod logging;
pub mod metrics;
pub mod mode;
pub mod motion;
pub mod optimizer;
pub mod profiles;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod submission;
pub mod target;
pub mod ui;
pub mod util;

pub use error::{ReticleError, Result};
