use crate::counter::{self, CounterAction};
use crate::errors::AppError;
use crate::export;
use crate::models::{
    DailyLog, ExportDocument, HistoryQuery, HistoryResponse, LogEntry, LogQuery, LogRequest,
    NotesRequest, PlanOverview, ProgressPoint, SetCountRequest, Settings, SettingsUpdate,
    Statistics, SurveyAnswers, SurveyStatus, TodaySummary,
};
use crate::plan;
use crate::state::AppState;
use crate::stats;
use crate::storage::StoreChange;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{
        IntoResponse,
        sse::{Event, KeepAlive, Sse},
    },
};
use chrono::{Local, NaiveDate, Utc};
use futures::stream::{self, Stream};
use std::convert::Infallible;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

const HISTORY_WEEKS: usize = 8;

pub async fn get_today(State(state): State<AppState>) -> Result<Json<TodaySummary>, AppError> {
    let answers = state.survey.load().await?;
    let summary = counter::today_at(&state.store, answers.as_ref(), today(), now_ms()).await?;
    Ok(Json(summary))
}

pub async fn increment(State(state): State<AppState>) -> Result<Json<TodaySummary>, AppError> {
    apply_action(&state, CounterAction::Increment).await
}

pub async fn decrement(State(state): State<AppState>) -> Result<Json<TodaySummary>, AppError> {
    apply_action(&state, CounterAction::Decrement).await
}

pub async fn reset(State(state): State<AppState>) -> Result<Json<TodaySummary>, AppError> {
    apply_action(&state, CounterAction::Reset).await
}

pub async fn set_count(
    State(state): State<AppState>,
    Json(payload): Json<SetCountRequest>,
) -> Result<Json<TodaySummary>, AppError> {
    let count = parse_count(payload.count)?;
    apply_action(&state, CounterAction::Set(count)).await
}

async fn apply_action(
    state: &AppState,
    action: CounterAction,
) -> Result<Json<TodaySummary>, AppError> {
    let answers = state.survey.load().await?;
    let summary =
        counter::apply_at(&state.store, answers.as_ref(), today(), action, now_ms()).await?;
    Ok(Json(summary))
}

pub async fn get_settings(State(state): State<AppState>) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.store.get_settings().await?))
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<SettingsUpdate>,
) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.store.update_settings(update).await?))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> Result<Json<Vec<DailyLog>>, AppError> {
    let logs = match (query.start, query.end, query.limit) {
        (Some(start), Some(end), _) => state.store.get_logs_in_range(start, end).await,
        (Some(_), None, _) | (None, Some(_), _) => {
            return Err(AppError::bad_request("start and end must be given together"));
        }
        (None, None, Some(limit)) => state.store.get_recent_logs(limit).await,
        (None, None, None) => state.store.get_all_logs().await,
    };
    Ok(Json(logs))
}

pub async fn get_log(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<Json<DailyLog>, AppError> {
    state
        .store
        .get_log(date)
        .await
        .map(Json)
        .ok_or_else(|| AppError::not_found(format!("no log recorded for {date}")))
}

pub async fn put_log(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Json(payload): Json<LogRequest>,
) -> Result<Json<DailyLog>, AppError> {
    let count = parse_count(payload.count)?;
    let timestamp = now_ms();
    let log = state
        .store
        .update_log_with(date, |existing, settings| {
            let goal = payload
                .goal
                .or(existing.map(|log| log.goal))
                .unwrap_or(settings.daily_goal);
            Some(LogEntry {
                date,
                count,
                goal,
                timestamp,
                notes: payload.notes.filter(|notes| !notes.is_empty()),
            })
        })
        .await?;
    log.map(Json)
        .ok_or_else(|| AppError::not_found(format!("no log recorded for {date}")))
}

pub async fn set_notes(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
    Json(payload): Json<NotesRequest>,
) -> Result<Json<DailyLog>, AppError> {
    let log = counter::set_notes_at(&state.store, today(), date, payload.notes).await?;
    Ok(Json(log))
}

pub async fn delete_log(
    State(state): State<AppState>,
    Path(date): Path<NaiveDate>,
) -> Result<StatusCode, AppError> {
    state.store.delete_log(date).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_stats(State(state): State<AppState>) -> Json<Statistics> {
    Json(stats::collect_statistics(&state.store, today()).await)
}

pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<HistoryResponse> {
    let all = state.store.get_all_logs().await;
    Json(HistoryResponse {
        period: query.period,
        logs: stats::filter_period(&all, query.period),
        weekly_totals: stats::weekly_totals_at(today(), &all, HISTORY_WEEKS),
    })
}

pub async fn get_survey(State(state): State<AppState>) -> Result<Json<SurveyStatus>, AppError> {
    let completed = state.survey.is_completed().await?;
    let answers = state.survey.load().await?;
    Ok(Json(SurveyStatus { completed, answers }))
}

pub async fn save_survey(
    State(state): State<AppState>,
    Json(answers): Json<SurveyAnswers>,
) -> Result<StatusCode, AppError> {
    state.survey.save(&answers).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn reset_survey(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.survey.reset().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_plan(State(state): State<AppState>) -> Result<Json<PlanOverview>, AppError> {
    let settings = state.store.get_settings().await?;
    let answers = state.survey.load().await?;
    let logs = state.store.get_all_logs().await;
    Ok(Json(plan::plan_overview(
        &settings,
        answers.as_ref(),
        &logs,
        today(),
    )))
}

pub async fn get_progress(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProgressPoint>>, AppError> {
    let settings = state.store.get_settings().await?;
    let answers = state.survey.load().await?.unwrap_or_default();
    let logs = state.store.get_all_logs().await;
    Ok(Json(plan::progress_chart_data(
        &logs,
        settings.start_date,
        &answers,
    )))
}

pub async fn export_json(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let body = export::export_json(&state.store).await?;
    Ok((
        attachment_headers("application/json; charset=utf-8", "json"),
        body,
    ))
}

pub async fn export_csv(State(state): State<AppState>) -> impl IntoResponse {
    let body = export::export_csv(&state.store).await;
    (attachment_headers("text/csv; charset=utf-8", "csv"), body)
}

pub async fn import_data(
    State(state): State<AppState>,
    Json(document): Json<ExportDocument>,
) -> Result<StatusCode, AppError> {
    state.store.import(document).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn clear_data(State(state): State<AppState>) -> Result<Json<Settings>, AppError> {
    Ok(Json(state.store.clear_all().await?))
}

/// Streams a `change` event after every committed write. Clients that fall
/// behind get a `resync` event and should re-query everything.
pub async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let changes = state.store.subscribe();
    let stream = stream::unfold(changes, |mut changes| async move {
        let event = match changes.recv().await {
            Ok(change) => change_event(&change),
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "event subscriber lagged");
                Event::default().event("resync").data(skipped.to_string())
            }
            Err(RecvError::Closed) => return None,
        };
        Some((Ok(event), changes))
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}

fn change_event(change: &StoreChange) -> Event {
    let payload = serde_json::to_string(change).unwrap_or_default();
    Event::default().event("change").data(payload)
}

fn attachment_headers(content_type: &str, extension: &str) -> [(header::HeaderName, String); 2] {
    let filename = export::export_filename(today(), extension);
    [
        (header::CONTENT_TYPE, content_type.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ]
}

fn parse_count(count: i64) -> Result<u32, AppError> {
    u32::try_from(count).map_err(|_| AppError::bad_request("count must be a non-negative integer"))
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
