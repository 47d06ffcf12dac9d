use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(handlers::get_today))
        .route("/api/today/increment", post(handlers::increment))
        .route("/api/today/decrement", post(handlers::decrement))
        .route("/api/today/reset", post(handlers::reset))
        .route("/api/today/count", put(handlers::set_count))
        .route(
            "/api/settings",
            get(handlers::get_settings).patch(handlers::update_settings),
        )
        .route("/api/logs", get(handlers::list_logs))
        .route(
            "/api/logs/:date",
            get(handlers::get_log)
                .put(handlers::put_log)
                .patch(handlers::set_notes)
                .delete(handlers::delete_log),
        )
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/history", get(handlers::get_history))
        .route(
            "/api/survey",
            get(handlers::get_survey)
                .put(handlers::save_survey)
                .delete(handlers::reset_survey),
        )
        .route("/api/plan", get(handlers::get_plan))
        .route("/api/plan/progress", get(handlers::get_progress))
        .route("/api/export/json", get(handlers::export_json))
        .route("/api/export/csv", get(handlers::export_csv))
        .route("/api/import", post(handlers::import_data))
        .route("/api/data", delete(handlers::clear_data))
        .route("/api/events", get(handlers::events))
        .with_state(state)
}
