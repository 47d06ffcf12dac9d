use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Version of the persisted document layout, carried in exports.
pub const SCHEMA_VERSION: u32 = 1;

pub const DEFAULT_DAILY_GOAL: u32 = 20;
pub const MIN_DAILY_GOAL: u32 = 1;
pub const MAX_DAILY_GOAL: u32 = 100;

/// One row per calendar date. `id` is a surrogate key; `date` is the natural one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLog {
    pub id: u64,
    pub date: NaiveDate,
    pub count: u32,
    pub goal: u32,
    /// Unix milliseconds of the last write.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Input to the single write path for daily logs.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub date: NaiveDate,
    pub count: u32,
    pub goal: u32,
    pub timestamp: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub daily_goal: u32,
    pub start_date: NaiveDate,
    pub notifications_enabled: bool,
}

impl Settings {
    pub fn new_at(today: NaiveDate) -> Self {
        Self {
            daily_goal: DEFAULT_DAILY_GOAL,
            start_date: today,
            notifications_enabled: false,
        }
    }
}

/// Partial settings update; absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    pub daily_goal: Option<u32>,
    pub start_date: Option<NaiveDate>,
    pub notifications_enabled: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SmokeType {
    #[serde(rename = "fumar")]
    Smoke,
    #[serde(rename = "vapear")]
    Vape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GoalType {
    Complete,
    Reduce,
}

/// Onboarding answers, stored as an opaque blob next to the record store.
///
/// Question 5 (`daily_amount`) is always captured in puffs regardless of
/// the habit type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SurveyAnswers {
    #[serde(default)]
    pub q1_type: Option<SmokeType>,
    #[serde(default)]
    pub q2_goal: Option<GoalType>,
    #[serde(default)]
    pub q3_duration: Option<String>,
    #[serde(default)]
    pub q4_frequency: Option<String>,
    #[serde(default, rename = "q5_dailyAmount")]
    pub q5_daily_amount: Option<u32>,
    #[serde(default)]
    pub q6_difficulty: Option<String>,
    #[serde(default, rename = "q7_affectedArea")]
    pub q7_affected_area: Option<String>,
    #[serde(default, rename = "q8_monthlySpending")]
    pub q8_monthly_spending: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SurveyStatus {
    pub completed: bool,
    pub answers: Option<SurveyAnswers>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "cigarros")]
    Cigarettes,
    #[serde(rename = "caladas")]
    Puffs,
}

impl Unit {
    pub fn label(self) -> &'static str {
        match self {
            Unit::Cigarettes => "cigarros",
            Unit::Puffs => "caladas",
        }
    }

    pub fn singular(self) -> &'static str {
        match self {
            Unit::Cigarettes => "cigarro",
            Unit::Puffs => "calada",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDay {
    /// 1-based plan day.
    pub day: u32,
    pub target: u32,
    pub nicotine_mg: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressPoint {
    pub day: u32,
    pub date: NaiveDate,
    pub planned: u32,
    pub actual: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanDayStatus {
    Completed,
    Exceeded,
    Future,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDayRow {
    pub day: u32,
    pub date: NaiveDate,
    pub target: u32,
    pub nicotine_mg: u32,
    pub actual: Option<u32>,
    pub status: PlanDayStatus,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanOverview {
    pub start_date: NaiveDate,
    pub current_day: u32,
    pub days_remaining: u32,
    pub baseline: u32,
    pub unit: Unit,
    pub quit_completely: bool,
    pub money_saved: u64,
    pub streak: u32,
    pub motivation: &'static str,
    pub main_difficulty: Option<String>,
    pub affected_area: Option<String>,
    pub days: Vec<PlanDayRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayRecord {
    pub date: NaiveDate,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub weekly_average: f64,
    pub monthly_average: f64,
    pub total_this_week: u32,
    pub total_this_month: u32,
    pub best_day: Option<DayRecord>,
    pub worst_day: Option<DayRecord>,
    /// Negative means fewer than yesterday.
    pub comparison_with_yesterday: i64,
    pub comparison_with_last_week: i64,
    pub streak: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Good,
    Warning,
    Exceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TodaySummary {
    pub date: NaiveDate,
    pub count: u32,
    pub goal: u32,
    pub notes: Option<String>,
    pub progress_percentage: f64,
    pub status: ProgressStatus,
    pub can_decrement: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HistoryPeriod {
    #[default]
    #[serde(rename = "7days")]
    Week,
    #[serde(rename = "30days")]
    Month,
    #[serde(rename = "all")]
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyTotal {
    pub week: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub total: u32,
    pub days_counted: u8,
    pub average: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub period: HistoryPeriod,
    pub logs: Vec<DailyLog>,
    pub weekly_totals: Vec<WeeklyTotal>,
}

/// Full data export. Key names are part of the file format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub version: u32,
    pub export_date: String,
    pub settings: Settings,
    pub daily_logs: Vec<DailyLog>,
}

#[derive(Debug, Deserialize)]
pub struct SetCountRequest {
    pub count: i64,
}

#[derive(Debug, Deserialize)]
pub struct LogRequest {
    pub count: i64,
    #[serde(default)]
    pub goal: Option<u32>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NotesRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    #[serde(default)]
    pub period: HistoryPeriod,
}
