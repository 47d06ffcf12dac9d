use crate::models::{DailyLog, DayRecord, HistoryPeriod, Statistics, WeeklyTotal};
use crate::storage::RecordStore;
use chrono::{Datelike, Duration, NaiveDate};
use std::collections::HashMap;

pub const DAYS_IN_WEEK: usize = 7;
pub const DAYS_IN_MONTH: usize = 30;

/// Windows the dashboard summarizes. `weekly` and `monthly` are expected
/// newest first, as the store returns them.
#[derive(Debug, Clone, Copy)]
pub struct StatsInput<'a> {
    pub weekly: &'a [DailyLog],
    pub monthly: &'a [DailyLog],
    pub today: Option<&'a DailyLog>,
    pub yesterday: Option<&'a DailyLog>,
}

/// Loads the usual windows (last 7 and last 30 logged days) and summarizes them.
pub async fn collect_statistics(store: &RecordStore, today: NaiveDate) -> Statistics {
    let weekly = store.get_recent_logs(DAYS_IN_WEEK).await;
    let monthly = store.get_recent_logs(DAYS_IN_MONTH).await;
    let today_log = store.get_log(today).await;
    let yesterday_log = store.get_log(today - Duration::days(1)).await;

    build_statistics_at(
        today,
        StatsInput {
            weekly: &weekly,
            monthly: &monthly,
            today: today_log.as_ref(),
            yesterday: yesterday_log.as_ref(),
        },
    )
}

pub fn build_statistics_at(today: NaiveDate, input: StatsInput<'_>) -> Statistics {
    let total_this_week = total(input.weekly);
    let total_this_month = total(input.monthly);

    let today_count = i64::from(input.today.map_or(0, |log| log.count));
    let yesterday_count = i64::from(input.yesterday.map_or(0, |log| log.count));

    // Same weekday, any earlier date inside the weekly window.
    let last_week_count = input
        .weekly
        .iter()
        .find(|log| log.date.weekday() == today.weekday() && log.date != today)
        .map_or(0, |log| i64::from(log.count));

    Statistics {
        weekly_average: average(total_this_week, input.weekly.len()),
        monthly_average: average(total_this_month, input.monthly.len()),
        total_this_week,
        total_this_month,
        best_day: best_day(input.weekly),
        worst_day: worst_day(input.weekly),
        comparison_with_yesterday: today_count - yesterday_count,
        comparison_with_last_week: today_count - last_week_count,
        streak: calculate_streak_days(input.weekly),
    }
}

/// Consecutive most recent days with `count <= goal`. Sorts by date
/// (newest first) before counting, so input order does not matter.
pub fn calculate_streak_days(logs: &[DailyLog]) -> u32 {
    let mut sorted: Vec<&DailyLog> = logs.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date));
    sorted
        .iter()
        .take_while(|log| log.count <= log.goal)
        .count() as u32
}

/// Lowest count in the window; ties go to the first row in window order.
pub fn best_day(logs: &[DailyLog]) -> Option<DayRecord> {
    let mut sorted: Vec<&DailyLog> = logs.iter().collect();
    sorted.sort_by_key(|log| log.count);
    sorted.first().map(|log| day_record(log))
}

/// Highest count in the window; ties go to the first row in window order.
pub fn worst_day(logs: &[DailyLog]) -> Option<DayRecord> {
    let mut sorted: Vec<&DailyLog> = logs.iter().collect();
    sorted.sort_by(|a, b| b.count.cmp(&a.count));
    sorted.first().map(|log| day_record(log))
}

pub fn filter_period(logs: &[DailyLog], period: HistoryPeriod) -> Vec<DailyLog> {
    let limit = match period {
        HistoryPeriod::Week => DAYS_IN_WEEK,
        HistoryPeriod::Month => DAYS_IN_MONTH,
        HistoryPeriod::All => logs.len(),
    };
    logs.iter().take(limit).cloned().collect()
}

/// Totals for the last `week_count` ISO weeks ending with the current one,
/// oldest first. Averages divide by the days of each week that have
/// already started.
pub fn weekly_totals_at(
    today: NaiveDate,
    logs: &[DailyLog],
    week_count: usize,
) -> Vec<WeeklyTotal> {
    let counts: HashMap<NaiveDate, u32> = logs.iter().map(|log| (log.date, log.count)).collect();
    let current_week_start = week_start(today);
    let mut totals = Vec::with_capacity(week_count);

    for offset in (0..week_count).rev() {
        let start = current_week_start - Duration::weeks(offset as i64);
        let end = start + Duration::days(6);

        let mut sum = 0u32;
        for day_offset in 0..7 {
            let date = start + Duration::days(day_offset);
            sum = sum.saturating_add(counts.get(&date).copied().unwrap_or_default());
        }

        let days_counted = if today < start {
            0
        } else if today > end {
            7
        } else {
            (today - start).num_days() as u8 + 1
        };

        totals.push(WeeklyTotal {
            week: week_label(start),
            start_date: start,
            end_date: end,
            total: sum,
            days_counted,
            average: average(sum, usize::from(days_counted)),
        });
    }

    totals
}

fn total(logs: &[DailyLog]) -> u32 {
    logs.iter().fold(0u32, |acc, log| acc.saturating_add(log.count))
}

/// Mean rounded to one decimal; an empty window averages to 0.
fn average(total: u32, len: usize) -> f64 {
    if len == 0 {
        return 0.0;
    }
    round_to_tenth(f64::from(total) / len as f64)
}

fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn day_record(log: &DailyLog) -> DayRecord {
    DayRecord {
        date: log.date,
        count: log.count,
    }
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn week_label(date: NaiveDate) -> String {
    let iso = date.iso_week();
    format!("{}-W{:02}", iso.year(), iso.week())
}
