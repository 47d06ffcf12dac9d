//! 90-day reduction plan derived from the onboarding survey.
//!
//! Everything here is a pure projection of `(start date, answers)`; no
//! target schedule is ever stored.

use crate::models::{
    DailyLog, GoalType, PlanDay, PlanDayRow, PlanDayStatus, PlanOverview, ProgressPoint, Settings,
    SmokeType, SurveyAnswers, Unit,
};
use crate::stats::calculate_streak_days;
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;

pub const PLAN_DAYS: u32 = 90;

const DEFAULT_DAILY_PUFFS: u32 = 100;
const PUFFS_PER_CIGARETTE: f64 = 10.0;
const NICOTINE_MG_PER_CIGARETTE: f64 = 8.0;
/// Share of the baseline a "reduce" plan descends by over the horizon.
const REDUCTION_SPAN: f64 = 0.7;
/// Share of the baseline a "reduce" plan settles at after the horizon.
const REDUCTION_FLOOR: f64 = 0.3;
const DAYS_PER_MONTH: f64 = 30.0;

pub fn measurement_unit(answers: &SurveyAnswers) -> Unit {
    match answers.q1_type {
        Some(SmokeType::Smoke) => Unit::Cigarettes,
        _ => Unit::Puffs,
    }
}

/// Self-reported daily consumption in the user's unit.
///
/// The raw answer is in puffs; smokers get it converted to cigarettes at
/// 10 puffs each. A missing (or zero) answer counts as 100 puffs.
pub fn daily_baseline(answers: &SurveyAnswers) -> u32 {
    let raw = answers
        .q5_daily_amount
        .filter(|amount| *amount > 0)
        .unwrap_or(DEFAULT_DAILY_PUFFS);

    match answers.q1_type {
        Some(SmokeType::Smoke) => (f64::from(raw) / PUFFS_PER_CIGARETTE).round() as u32,
        _ => raw,
    }
}

pub fn wants_to_quit_completely(answers: &SurveyAnswers) -> bool {
    answers.q2_goal == Some(GoalType::Complete)
}

pub fn monthly_spending(answers: &SurveyAnswers) -> f64 {
    answers
        .q8_monthly_spending
        .filter(|spending| spending.is_finite() && *spending > 0.0)
        .unwrap_or(0.0)
}

pub fn main_difficulty(answers: &SurveyAnswers) -> Option<&str> {
    answers.q6_difficulty.as_deref().filter(|s| !s.is_empty())
}

pub fn affected_area(answers: &SurveyAnswers) -> Option<&str> {
    answers.q7_affected_area.as_deref().filter(|s| !s.is_empty())
}

/// Target for a zero-based plan day.
///
/// "complete" plans descend linearly to zero; "reduce" plans descend to 30%
/// of the baseline. Past the horizon the target stays at the floor.
pub fn calculate_daily_target(day_index: u32, total_days: u32, answers: &SurveyAnswers) -> u32 {
    let baseline = f64::from(daily_baseline(answers));
    let complete = wants_to_quit_completely(answers);

    if day_index >= total_days {
        return if complete {
            0
        } else {
            (baseline * REDUCTION_FLOOR).round() as u32
        };
    }

    let progress = f64::from(day_index) / f64::from(total_days);
    let remaining = if complete {
        1.0 - progress
    } else {
        1.0 - progress * REDUCTION_SPAN
    };
    (baseline * remaining).round() as u32
}

pub fn calculate_nicotine_mg(amount: u32, unit: Unit) -> u32 {
    let cigarettes = match unit {
        Unit::Cigarettes => f64::from(amount),
        Unit::Puffs => f64::from(amount) / PUFFS_PER_CIGARETTE,
    };
    (cigarettes * NICOTINE_MG_PER_CIGARETTE).round() as u32
}

fn cost_per_unit(answers: &SurveyAnswers) -> Option<(u32, f64)> {
    let baseline = daily_baseline(answers);
    let spending = monthly_spending(answers);
    if baseline == 0 || spending == 0.0 {
        return None;
    }
    Some((baseline, spending / (f64::from(baseline) * DAYS_PER_MONTH)))
}

/// Money saved by consuming `current_amount` per day for `days` days instead
/// of the baseline, rounded to cents. Never negative.
pub fn calculate_money_saved(current_amount: u32, days: u32, answers: &SurveyAnswers) -> f64 {
    let Some((baseline, unit_cost)) = cost_per_unit(answers) else {
        return 0.0;
    };
    let units = f64::from(baseline.saturating_sub(current_amount)) * f64::from(days);
    (units * unit_cost * 100.0).round() / 100.0
}

/// Whole currency units saved across `logs`. Days over the baseline save
/// nothing rather than counting against the total.
pub fn calculate_total_money_saved(logs: &[DailyLog], answers: &SurveyAnswers) -> u64 {
    let Some((baseline, unit_cost)) = cost_per_unit(answers) else {
        return 0;
    };
    let units: u64 = logs
        .iter()
        .map(|log| u64::from(baseline.saturating_sub(log.count)))
        .sum();
    (units as f64 * unit_cost).floor() as u64
}

pub fn daily_plan_targets(answers: &SurveyAnswers) -> Vec<PlanDay> {
    let unit = measurement_unit(answers);
    (0..PLAN_DAYS)
        .map(|index| {
            let target = calculate_daily_target(index, PLAN_DAYS, answers);
            PlanDay {
                day: index + 1,
                target,
                nicotine_mg: calculate_nicotine_mg(target, unit),
            }
        })
        .collect()
}

/// Planned vs. logged consumption for each plan day.
pub fn progress_chart_data(
    logs: &[DailyLog],
    start_date: NaiveDate,
    answers: &SurveyAnswers,
) -> Vec<ProgressPoint> {
    let actuals = counts_by_date(logs);
    (0..PLAN_DAYS)
        .map(|index| {
            let date = start_date + Duration::days(i64::from(index));
            ProgressPoint {
                day: index + 1,
                date,
                planned: calculate_daily_target(index, PLAN_DAYS, answers),
                actual: actuals.get(&date).copied(),
            }
        })
        .collect()
}

pub fn plan_day_rows(
    logs: &[DailyLog],
    start_date: NaiveDate,
    answers: &SurveyAnswers,
) -> Vec<PlanDayRow> {
    let actuals = counts_by_date(logs);
    daily_plan_targets(answers)
        .into_iter()
        .map(|plan| {
            let date = start_date + Duration::days(i64::from(plan.day - 1));
            let actual = actuals.get(&date).copied();
            let status = match actual {
                Some(count) if count <= plan.target => PlanDayStatus::Completed,
                Some(_) => PlanDayStatus::Exceeded,
                None => PlanDayStatus::Future,
            };
            PlanDayRow {
                day: plan.day,
                date,
                target: plan.target,
                nicotine_mg: plan.nicotine_mg,
                actual,
                status,
            }
        })
        .collect()
}

/// Zero-based offset of `today` into the plan; days before the start clamp to 0.
pub fn plan_day_index(start_date: NaiveDate, today: NaiveDate) -> u32 {
    u32::try_from((today - start_date).num_days()).unwrap_or(0)
}

/// 1-based plan day, clamped to `1..=90`.
pub fn current_plan_day(start_date: NaiveDate, today: NaiveDate) -> u32 {
    plan_day_index(start_date, today)
        .saturating_add(1)
        .clamp(1, PLAN_DAYS)
}

pub fn days_remaining(start_date: NaiveDate, today: NaiveDate) -> u32 {
    (PLAN_DAYS + 1).saturating_sub(current_plan_day(start_date, today))
}

/// Goal written into today's log: the plan target once the survey is
/// done, otherwise the configured daily goal.
pub fn today_target(settings: &Settings, answers: Option<&SurveyAnswers>, today: NaiveDate) -> u32 {
    match answers {
        Some(answers) => calculate_daily_target(
            plan_day_index(settings.start_date, today),
            PLAN_DAYS,
            answers,
        ),
        None => settings.daily_goal,
    }
}

pub fn motivation_message(answers: Option<&SurveyAnswers>) -> &'static str {
    let Some(answers) = answers else {
        return "¡Sigue adelante! Cada día es un paso hacia una vida más saludable.";
    };

    match affected_area(answers) {
        Some("health") => "Tu salud mejora con cada día que pasa. ¡Sigue así!",
        Some("mental_health") => "Cuida tu bienestar mental. Cada progreso cuenta.",
        Some("finances") => "Estás ahorrando dinero cada día. ¡Tu bolsillo te lo agradece!",
        Some("relationships") => "Tus relaciones mejorarán con este cambio positivo.",
        Some("energy") => "Pronto sentirás más energía y mejor concentración.",
        _ if wants_to_quit_completely(answers) => {
            "¡Vas camino a dejarlo por completo! No te rindas."
        }
        _ => "¡Cada reducción es un logro! Estás progresando.",
    }
}

/// Everything the plan screen needs. `logs` is the full history.
pub fn plan_overview(
    settings: &Settings,
    answers: Option<&SurveyAnswers>,
    logs: &[DailyLog],
    today: NaiveDate,
) -> PlanOverview {
    let defaults = SurveyAnswers::default();
    let survey = answers.unwrap_or(&defaults);
    PlanOverview {
        start_date: settings.start_date,
        current_day: current_plan_day(settings.start_date, today),
        days_remaining: days_remaining(settings.start_date, today),
        baseline: daily_baseline(survey),
        unit: measurement_unit(survey),
        quit_completely: wants_to_quit_completely(survey),
        money_saved: calculate_total_money_saved(logs, survey),
        streak: calculate_streak_days(logs),
        motivation: motivation_message(answers),
        main_difficulty: main_difficulty(survey).map(str::to_string),
        affected_area: affected_area(survey).map(str::to_string),
        days: plan_day_rows(logs, settings.start_date, survey),
    }
}

fn counts_by_date(logs: &[DailyLog]) -> HashMap<NaiveDate, u32> {
    logs.iter().map(|log| (log.date, log.count)).collect()
}
