pub mod app;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod normalize;
pub mod source;
pub mod state;
pub mod stats;
pub mod ui;

pub use app::router;
pub use config::{Config, Schema};
pub use state::AppState;
pub use stats::build_report_at;
