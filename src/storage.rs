use crate::errors::StoreError;
use crate::models::{
    DailyLog, ExportDocument, LogEntry, MAX_DAILY_GOAL, MIN_DAILY_GOAL, SCHEMA_VERSION, Settings,
    SettingsUpdate,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::{Mutex, broadcast};
use tracing::{debug, error, info, warn};

const CHANGE_CAPACITY: usize = 64;

/// On-disk document: the settings record plus one log per date.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreData {
    #[serde(default = "current_schema")]
    pub schema_version: u32,
    #[serde(default = "first_id")]
    pub next_id: u64,
    #[serde(default)]
    pub settings: Option<Settings>,
    #[serde(default)]
    pub daily_logs: BTreeMap<NaiveDate, DailyLog>,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            next_id: first_id(),
            settings: None,
            daily_logs: BTreeMap::new(),
        }
    }
}

fn current_schema() -> u32 {
    SCHEMA_VERSION
}

fn first_id() -> u64 {
    1
}

/// Published after every committed write so readers can re-query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum StoreChange {
    Settings,
    Log { date: NaiveDate },
    LogDeleted { date: NaiveDate },
    Cleared,
    Imported,
}

/// Durable store for the settings record and daily logs.
///
/// Every write is applied to a copy, persisted, and only then swapped in,
/// so a failed write leaves the in-memory view unchanged. All operations
/// hold the same lock, which also serializes read-modify-write sequences
/// for a given date.
pub struct RecordStore {
    path: PathBuf,
    data: Mutex<StoreData>,
    changes: broadcast::Sender<StoreChange>,
}

impl RecordStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let data = load_data(&path).await?;
        debug!(
            path = %path.display(),
            logs = data.daily_logs.len(),
            "record store opened"
        );
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            path,
            data: Mutex::new(data),
            changes,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    /// Creates the default settings record if none exists. Safe to call on
    /// every launch.
    pub async fn initialize(&self) -> Result<Settings, StoreError> {
        self.initialize_at(today()).await
    }

    pub async fn initialize_at(&self, today: NaiveDate) -> Result<Settings, StoreError> {
        let mut data = self.data.lock().await;
        if data.settings.is_none() {
            info!(start_date = %today, "initializing settings with defaults");
        }
        self.settings_or_default(&mut data, today).await
    }

    /// Returns the settings record, recreating defaults if it went missing.
    pub async fn get_settings(&self) -> Result<Settings, StoreError> {
        self.get_settings_at(today()).await
    }

    pub async fn get_settings_at(&self, today: NaiveDate) -> Result<Settings, StoreError> {
        let mut data = self.data.lock().await;
        if data.settings.is_none() {
            warn!("settings record missing, recreating defaults");
        }
        self.settings_or_default(&mut data, today).await
    }

    pub async fn update_settings(&self, update: SettingsUpdate) -> Result<Settings, StoreError> {
        if let Some(goal) = update.daily_goal {
            validate_goal(goal)?;
        }

        let mut data = self.data.lock().await;
        let mut settings = self.settings_or_default(&mut data, today()).await?;
        if let Some(goal) = update.daily_goal {
            settings.daily_goal = goal;
        }
        if let Some(start_date) = update.start_date {
            settings.start_date = start_date;
        }
        if let Some(enabled) = update.notifications_enabled {
            settings.notifications_enabled = enabled;
        }

        let mut next = data.clone();
        next.settings = Some(settings.clone());
        self.commit(&mut data, next, StoreChange::Settings).await?;
        Ok(settings)
    }

    /// `None` means nothing was logged for the date, which is distinct from
    /// a log with a zero count.
    pub async fn get_log(&self, date: NaiveDate) -> Option<DailyLog> {
        self.data.lock().await.daily_logs.get(&date).cloned()
    }

    /// Overwrites the row for `entry.date` in place or inserts a new one.
    /// Returns the row id.
    pub async fn upsert_log(&self, entry: LogEntry) -> Result<u64, StoreError> {
        let mut data = self.data.lock().await;
        let date = entry.date;
        let mut next = data.clone();
        let id = apply_upsert(&mut next, entry);
        self.commit(&mut data, next, StoreChange::Log { date }).await?;
        Ok(id)
    }

    /// Reads the current row for `date` and upserts whatever `build` returns,
    /// without releasing the lock in between. Returning `None` skips the
    /// write. The result is the row as stored afterwards.
    pub async fn update_log_with<F>(
        &self,
        date: NaiveDate,
        build: F,
    ) -> Result<Option<DailyLog>, StoreError>
    where
        F: FnOnce(Option<&DailyLog>, &Settings) -> Option<LogEntry>,
    {
        self.update_log_with_at(today(), date, build).await
    }

    /// Like [`RecordStore::update_log_with`]; `today` is the start date used
    /// if the settings record has to be recreated.
    pub async fn update_log_with_at<F>(
        &self,
        today: NaiveDate,
        date: NaiveDate,
        build: F,
    ) -> Result<Option<DailyLog>, StoreError>
    where
        F: FnOnce(Option<&DailyLog>, &Settings) -> Option<LogEntry>,
    {
        let mut data = self.data.lock().await;
        let settings = self.settings_or_default(&mut data, today).await?;
        let Some(mut entry) = build(data.daily_logs.get(&date), &settings) else {
            return Ok(data.daily_logs.get(&date).cloned());
        };
        entry.date = date;

        let mut next = data.clone();
        apply_upsert(&mut next, entry);
        self.commit(&mut data, next, StoreChange::Log { date }).await?;
        Ok(data.daily_logs.get(&date).cloned())
    }

    /// All logs, newest date first.
    pub async fn get_all_logs(&self) -> Vec<DailyLog> {
        self.data.lock().await.daily_logs.values().rev().cloned().collect()
    }

    /// Logs with `start <= date <= end`, newest date first.
    pub async fn get_logs_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<DailyLog> {
        if start > end {
            return Vec::new();
        }
        self.data
            .lock()
            .await
            .daily_logs
            .range(start..=end)
            .rev()
            .map(|(_, log)| log.clone())
            .collect()
    }

    /// The `n` most recently dated logs, newest first.
    pub async fn get_recent_logs(&self, n: usize) -> Vec<DailyLog> {
        self.data
            .lock()
            .await
            .daily_logs
            .values()
            .rev()
            .take(n)
            .cloned()
            .collect()
    }

    pub async fn delete_log(&self, date: NaiveDate) -> Result<(), StoreError> {
        let mut data = self.data.lock().await;
        if !data.daily_logs.contains_key(&date) {
            return Err(StoreError::LogNotFound(date));
        }
        let mut next = data.clone();
        next.daily_logs.remove(&date);
        self.commit(&mut data, next, StoreChange::LogDeleted { date })
            .await
    }

    /// Removes every log and the settings record, then reinitializes, in a
    /// single write.
    pub async fn clear_all(&self) -> Result<Settings, StoreError> {
        self.clear_all_at(today()).await
    }

    pub async fn clear_all_at(&self, today: NaiveDate) -> Result<Settings, StoreError> {
        let mut data = self.data.lock().await;
        let settings = Settings::new_at(today);
        let next = StoreData {
            next_id: data.next_id,
            settings: Some(settings.clone()),
            ..StoreData::default()
        };
        let removed = data.daily_logs.len();
        self.commit(&mut data, next, StoreChange::Cleared).await?;
        info!(removed, "cleared all data");
        Ok(settings)
    }

    /// Replaces all stored data with the contents of an export.
    pub async fn import(&self, document: ExportDocument) -> Result<(), StoreError> {
        validate_goal(document.settings.daily_goal)?;

        let mut daily_logs = BTreeMap::new();
        for log in document.daily_logs {
            if daily_logs.insert(log.date, log).is_some() {
                return Err(StoreError::invalid("export contains duplicate dates"));
            }
        }
        let next_id = daily_logs.values().map(|log| log.id).max().unwrap_or(0) + 1;

        let mut data = self.data.lock().await;
        let next = StoreData {
            schema_version: SCHEMA_VERSION,
            next_id: next_id.max(data.next_id),
            settings: Some(document.settings),
            daily_logs,
        };
        let imported = next.daily_logs.len();
        self.commit(&mut data, next, StoreChange::Imported).await?;
        info!(imported, "imported export document");
        Ok(())
    }

    async fn settings_or_default(
        &self,
        data: &mut StoreData,
        today: NaiveDate,
    ) -> Result<Settings, StoreError> {
        if let Some(settings) = &data.settings {
            return Ok(settings.clone());
        }
        let settings = Settings::new_at(today);
        let mut next = data.clone();
        next.settings = Some(settings.clone());
        self.commit(data, next, StoreChange::Settings).await?;
        Ok(settings)
    }

    async fn commit(
        &self,
        current: &mut StoreData,
        next: StoreData,
        change: StoreChange,
    ) -> Result<(), StoreError> {
        persist_data(&self.path, &next).await?;
        *current = next;
        // No subscribers is fine.
        let _ = self.changes.send(change);
        Ok(())
    }
}

fn apply_upsert(data: &mut StoreData, entry: LogEntry) -> u64 {
    if let Some(existing) = data.daily_logs.get_mut(&entry.date) {
        existing.count = entry.count;
        existing.goal = entry.goal;
        existing.timestamp = entry.timestamp;
        existing.notes = entry.notes;
        return existing.id;
    }

    let id = data.next_id;
    data.next_id += 1;
    data.daily_logs.insert(
        entry.date,
        DailyLog {
            id,
            date: entry.date,
            count: entry.count,
            goal: entry.goal,
            timestamp: entry.timestamp,
            notes: entry.notes,
        },
    );
    id
}

pub fn validate_goal(goal: u32) -> Result<(), StoreError> {
    if (MIN_DAILY_GOAL..=MAX_DAILY_GOAL).contains(&goal) {
        Ok(())
    } else {
        Err(StoreError::invalid(format!(
            "daily goal must be between {MIN_DAILY_GOAL} and {MAX_DAILY_GOAL}, got {goal}"
        )))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

pub async fn load_data(path: &Path) -> Result<StoreData, StoreError> {
    match fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| {
            error!("failed to parse data file {}: {err}", path.display());
            StoreError::from(err)
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(StoreData::default()),
        Err(err) => {
            error!("failed to read data file {}: {err}", path.display());
            Err(err.into())
        }
    }
}

pub async fn persist_data(path: &Path, data: &StoreData) -> Result<(), StoreError> {
    let payload = serde_json::to_vec_pretty(data)?;
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }
    fs::write(path, payload).await.map_err(|err| {
        error!("failed to write data file {}: {err}", path.display());
        StoreError::from(err)
    })
}
