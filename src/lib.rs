pub mod app;
pub mod config;
pub mod counter;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod models;
pub mod plan;
pub mod state;
pub mod stats;
pub mod storage;
pub mod survey;

pub use app::router;
pub use config::Config;
pub use errors::{AppError, StoreError};
pub use state::AppState;
pub use storage::{RecordStore, StoreChange};
pub use survey::SurveyStore;
