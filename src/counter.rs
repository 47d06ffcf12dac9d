use crate::errors::StoreError;
use crate::models::{DailyLog, LogEntry, ProgressStatus, SurveyAnswers, TodaySummary};
use crate::plan::today_target;
use crate::storage::RecordStore;
use chrono::NaiveDate;
use tracing::debug;

const WARNING_THRESHOLD: f64 = 0.8;
const EXCEEDED_THRESHOLD: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterAction {
    Increment,
    Decrement,
    Reset,
    Set(u32),
}

impl CounterAction {
    /// New count, or `None` when the action leaves the row alone.
    fn apply(self, current: u32) -> Option<u32> {
        match self {
            CounterAction::Increment => Some(current.saturating_add(1)),
            CounterAction::Decrement if current == 0 => None,
            CounterAction::Decrement => Some(current - 1),
            CounterAction::Reset => Some(0),
            CounterAction::Set(count) => Some(count),
        }
    }
}

/// Today's row, created with a zero count on first view.
pub async fn today_at(
    store: &RecordStore,
    answers: Option<&SurveyAnswers>,
    today: NaiveDate,
    now_ms: i64,
) -> Result<TodaySummary, StoreError> {
    let log = store
        .update_log_with_at(today, today, |existing, settings| {
            if existing.is_some() {
                return None;
            }
            Some(LogEntry {
                date: today,
                count: 0,
                goal: today_target(settings, answers, today),
                timestamp: now_ms,
                notes: None,
            })
        })
        .await?;
    Ok(summarize(today, log.as_ref()))
}

/// Applies a counter action to today's row through the upsert path. The
/// goal is refreshed to today's target and notes are kept.
pub async fn apply_at(
    store: &RecordStore,
    answers: Option<&SurveyAnswers>,
    today: NaiveDate,
    action: CounterAction,
    now_ms: i64,
) -> Result<TodaySummary, StoreError> {
    let log = store
        .update_log_with_at(today, today, |existing, settings| {
            let current = existing.map_or(0, |log| log.count);
            let count = action.apply(current)?;
            Some(LogEntry {
                date: today,
                count,
                goal: today_target(settings, answers, today),
                timestamp: now_ms,
                notes: existing.and_then(|log| log.notes.clone()),
            })
        })
        .await?;
    debug!(?action, count = ?log.as_ref().map(|l| l.count), "counter updated");
    Ok(summarize(today, log.as_ref()))
}

/// Replaces the notes on an existing row. Count, goal and timestamp are
/// left as they are; empty notes clear the field.
pub async fn set_notes_at(
    store: &RecordStore,
    today: NaiveDate,
    date: NaiveDate,
    notes: Option<String>,
) -> Result<DailyLog, StoreError> {
    let notes = notes.filter(|notes| !notes.trim().is_empty());
    store
        .update_log_with_at(today, date, |existing, _settings| {
            let log = existing?;
            Some(LogEntry {
                date,
                count: log.count,
                goal: log.goal,
                timestamp: log.timestamp,
                notes,
            })
        })
        .await?
        .ok_or(StoreError::LogNotFound(date))
}

pub fn summarize(date: NaiveDate, log: Option<&DailyLog>) -> TodaySummary {
    let count = log.map_or(0, |log| log.count);
    let goal = log.map_or(0, |log| log.goal);
    let ratio = if goal > 0 {
        f64::from(count) / f64::from(goal)
    } else {
        0.0
    };

    TodaySummary {
        date,
        count,
        goal,
        notes: log.and_then(|log| log.notes.clone()),
        progress_percentage: ratio * 100.0,
        status: progress_status(ratio),
        can_decrement: count > 0,
    }
}

fn progress_status(ratio: f64) -> ProgressStatus {
    if ratio >= EXCEEDED_THRESHOLD {
        ProgressStatus::Exceeded
    } else if ratio >= WARNING_THRESHOLD {
        ProgressStatus::Warning
    } else {
        ProgressStatus::Good
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GoalType, SmokeType};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn store_started(start: NaiveDate) -> (tempfile::TempDir, RecordStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = RecordStore::open(dir.path().join("store.json")).await.unwrap();
        store.initialize_at(start).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn first_view_creates_zero_row() {
        let today = date(2026, 1, 5);
        let (_dir, store) = store_started(today).await;

        let summary = today_at(&store, None, today, 1).await.unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(summary.goal, 20);
        assert!(!summary.can_decrement);
        assert_eq!(store.get_log(today).await.map(|l| l.timestamp), Some(1));

        // A second view does not touch the row.
        today_at(&store, None, today, 2).await.unwrap();
        assert_eq!(store.get_log(today).await.map(|l| l.timestamp), Some(1));
    }

    #[tokio::test]
    async fn actions_update_todays_row() {
        let today = date(2026, 1, 5);
        let (_dir, store) = store_started(today).await;

        for _ in 0..3 {
            apply_at(&store, None, today, CounterAction::Increment, 10)
                .await
                .unwrap();
        }
        let summary = apply_at(&store, None, today, CounterAction::Decrement, 11)
            .await
            .unwrap();
        assert_eq!(summary.count, 2);
        assert!(summary.can_decrement);

        let summary = apply_at(&store, None, today, CounterAction::Set(17), 12)
            .await
            .unwrap();
        assert_eq!(summary.count, 17);
        assert_eq!(summary.status, ProgressStatus::Warning);

        let summary = apply_at(&store, None, today, CounterAction::Reset, 13)
            .await
            .unwrap();
        assert_eq!(summary.count, 0);
        assert_eq!(store.get_all_logs().await.len(), 1);
    }

    #[tokio::test]
    async fn decrement_at_zero_is_a_no_op() {
        let today = date(2026, 1, 5);
        let (_dir, store) = store_started(today).await;

        let summary = apply_at(&store, None, today, CounterAction::Decrement, 1)
            .await
            .unwrap();
        assert_eq!(summary.count, 0);
        assert!(store.get_log(today).await.is_none());
    }

    #[tokio::test]
    async fn notes_survive_counter_updates() {
        let today = date(2026, 1, 5);
        let (_dir, store) = store_started(today).await;
        store
            .upsert_log(LogEntry {
                date: today,
                count: 1,
                goal: 20,
                timestamp: 0,
                notes: Some("coffee".into()),
            })
            .await
            .unwrap();

        let summary = apply_at(&store, None, today, CounterAction::Increment, 5)
            .await
            .unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.notes.as_deref(), Some("coffee"));
    }

    #[tokio::test]
    async fn goal_follows_plan_when_survey_done() {
        let start = date(2026, 1, 1);
        let (_dir, store) = store_started(start).await;
        let answers = SurveyAnswers {
            q1_type: Some(SmokeType::Smoke),
            q2_goal: Some(GoalType::Complete),
            q5_daily_amount: Some(300),
            ..SurveyAnswers::default()
        };

        let summary = apply_at(
            &store,
            Some(&answers),
            date(2026, 1, 31),
            CounterAction::Increment,
            1,
        )
        .await
        .unwrap();
        // Baseline 30 cigarettes, a third of the way through the plan.
        assert_eq!(summary.goal, 20);
    }

    #[tokio::test]
    async fn set_notes_keeps_the_rest_of_the_row() {
        let today = date(2026, 1, 5);
        let (_dir, store) = store_started(today).await;
        store
            .upsert_log(LogEntry {
                date: today,
                count: 6,
                goal: 0,
                timestamp: 42,
                notes: None,
            })
            .await
            .unwrap();

        let log = set_notes_at(&store, today, today, Some("after dinner".into()))
            .await
            .unwrap();
        assert_eq!(log.count, 6);
        assert_eq!(log.goal, 0);
        assert_eq!(log.timestamp, 42);
        assert_eq!(log.notes.as_deref(), Some("after dinner"));

        let cleared = set_notes_at(&store, today, today, Some("  ".into()))
            .await
            .unwrap();
        assert_eq!(cleared.notes, None);
        assert_eq!(store.get_log(today).await.unwrap().notes, None);
    }

    #[tokio::test]
    async fn set_notes_needs_an_existing_row() {
        let today = date(2026, 1, 5);
        let (_dir, store) = store_started(today).await;

        let err = set_notes_at(&store, today, date(2026, 1, 4), Some("x".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::LogNotFound(day) if day == date(2026, 1, 4)));
        assert!(store.get_all_logs().await.is_empty());
    }

    #[test]
    fn status_thresholds() {
        let log = |count, goal| DailyLog {
            id: 1,
            date: date(2026, 1, 5),
            count,
            goal,
            timestamp: 0,
            notes: None,
        };
        let day = date(2026, 1, 5);
        assert_eq!(summarize(day, Some(&log(7, 10))).status, ProgressStatus::Good);
        assert_eq!(summarize(day, Some(&log(8, 10))).status, ProgressStatus::Warning);
        assert_eq!(summarize(day, Some(&log(10, 10))).status, ProgressStatus::Exceeded);
        assert_eq!(summarize(day, Some(&log(3, 0))).progress_percentage, 0.0);
        assert_eq!(summarize(day, None).count, 0);
    }
}
