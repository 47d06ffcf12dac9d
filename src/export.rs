//! JSON/CSV exports of the stored data, and JSON import.
//!
//! CSV cells are wrapped in double quotes but embedded quotes are written
//! as-is; readers that need strict RFC 4180 should use the JSON export.

use crate::errors::StoreError;
use crate::models::{DailyLog, ExportDocument, SCHEMA_VERSION, Settings};
use crate::storage::RecordStore;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tracing::info;

pub const CSV_HEADERS: [&str; 4] = ["Fecha", "Cantidad", "Objetivo", "Notas"];
pub const EXPORT_FILENAME_PREFIX: &str = "smokelog_export";

pub async fn export_json(store: &RecordStore) -> Result<String, StoreError> {
    let settings = store.get_settings().await?;
    let logs = store.get_all_logs().await;
    info!(logs = logs.len(), "exporting json");
    render_json(settings, logs, Utc::now())
}

pub async fn export_csv(store: &RecordStore) -> String {
    let logs = store.get_all_logs().await;
    info!(logs = logs.len(), "exporting csv");
    render_csv(&logs)
}

pub async fn import_json(store: &RecordStore, json: &str) -> Result<(), StoreError> {
    store.import(parse_export(json)?).await
}

pub fn build_document(
    settings: Settings,
    daily_logs: Vec<DailyLog>,
    exported_at: DateTime<Utc>,
) -> ExportDocument {
    ExportDocument {
        version: SCHEMA_VERSION,
        export_date: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        settings,
        daily_logs,
    }
}

pub fn render_json(
    settings: Settings,
    daily_logs: Vec<DailyLog>,
    exported_at: DateTime<Utc>,
) -> Result<String, StoreError> {
    let document = build_document(settings, daily_logs, exported_at);
    Ok(serde_json::to_string_pretty(&document)?)
}

pub fn parse_export(json: &str) -> Result<ExportDocument, StoreError> {
    Ok(serde_json::from_str(json)?)
}

/// Header line plus one row per log, in the order given.
pub fn render_csv(logs: &[DailyLog]) -> String {
    let mut lines = Vec::with_capacity(logs.len() + 1);
    lines.push(CSV_HEADERS.join(","));
    for log in logs {
        let cells = [
            log.date.to_string(),
            log.count.to_string(),
            log.goal.to_string(),
            log.notes.clone().unwrap_or_default(),
        ];
        let row: Vec<String> = cells.iter().map(|cell| format!("\"{cell}\"")).collect();
        lines.push(row.join(","));
    }
    lines.join("\n")
}

pub fn export_filename(date: NaiveDate, extension: &str) -> String {
    format!("{EXPORT_FILENAME_PREFIX}_{}.{extension}", date.format("%Y-%m-%d"))
}
