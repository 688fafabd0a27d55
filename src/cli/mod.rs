mod app;
mod args;
mod commands;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub(crate) mod theme;
mod timeline;

pub use app::{AppState, UiRegions, run_app};
pub use args::CliArgs;
