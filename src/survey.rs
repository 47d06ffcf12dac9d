//! Onboarding answers, kept as a single JSON blob outside the record store.

use crate::errors::StoreError;
use crate::models::SurveyAnswers;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, warn};

#[derive(Debug, Serialize, Deserialize)]
struct SurveyBlob {
    completed: bool,
    answers: SurveyAnswers,
}

#[derive(Debug, Clone)]
pub struct SurveyStore {
    path: PathBuf,
}

impl SurveyStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stored answers, or `None` if the survey was never completed or the
    /// blob is unreadable.
    pub async fn load(&self) -> Result<Option<SurveyAnswers>, StoreError> {
        Ok(self.load_blob().await?.map(|blob| blob.answers))
    }

    pub async fn is_completed(&self) -> Result<bool, StoreError> {
        Ok(self
            .load_blob()
            .await?
            .is_some_and(|blob| blob.completed))
    }

    /// Stores the answers and marks onboarding as completed.
    pub async fn save(&self, answers: &SurveyAnswers) -> Result<(), StoreError> {
        let blob = SurveyBlob {
            completed: true,
            answers: answers.clone(),
        };
        let payload = serde_json::to_vec_pretty(&blob)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&self.path, payload).await.map_err(|err| {
            error!("failed to write survey file {}: {err}", self.path.display());
            StoreError::from(err)
        })?;
        info!("survey answers saved");
        Ok(())
    }

    pub async fn reset(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => {
                info!("survey answers removed");
                Ok(())
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                error!("failed to remove survey file {}: {err}", self.path.display());
                Err(err.into())
            }
        }
    }

    async fn load_blob(&self) -> Result<Option<SurveyBlob>, StoreError> {
        match fs::read(&self.path).await {
            Ok(bytes) => match serde_json::from_slice(&bytes) {
                Ok(blob) => Ok(Some(blob)),
                Err(err) => {
                    warn!("ignoring unreadable survey file: {err}");
                    Ok(None)
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => {
                error!("failed to read survey file {}: {err}", self.path.display());
                Err(err.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GoalType, SmokeType};

    #[tokio::test]
    async fn save_load_and_reset() {
        let dir = tempfile::tempdir().unwrap();
        let store = SurveyStore::new(dir.path().join("survey.json"));

        assert!(store.load().await.unwrap().is_none());
        assert!(!store.is_completed().await.unwrap());

        let answers = SurveyAnswers {
            q1_type: Some(SmokeType::Smoke),
            q2_goal: Some(GoalType::Reduce),
            q5_daily_amount: Some(150),
            q8_monthly_spending: Some(90.0),
            ..SurveyAnswers::default()
        };
        store.save(&answers).await.unwrap();

        assert!(store.is_completed().await.unwrap());
        assert_eq!(store.load().await.unwrap(), Some(answers));

        store.reset().await.unwrap();
        assert!(store.load().await.unwrap().is_none());
        store.reset().await.unwrap();
    }

    #[tokio::test]
    async fn reads_blob_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(
            &path,
            r#"{"completed":true,"answers":{"q1_type":"vapear","q2_goal":"complete","q5_dailyAmount":80,"q7_affectedArea":"finances","q8_monthlySpending":null}}"#,
        )
        .unwrap();

        let answers = SurveyStore::new(&path).load().await.unwrap().unwrap();
        assert_eq!(answers.q1_type, Some(SmokeType::Vape));
        assert_eq!(answers.q2_goal, Some(GoalType::Complete));
        assert_eq!(answers.q5_daily_amount, Some(80));
        assert_eq!(answers.q7_affected_area.as_deref(), Some("finances"));
        assert_eq!(answers.q8_monthly_spending, None);
    }

    #[tokio::test]
    async fn unreadable_blob_counts_as_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("survey.json");
        std::fs::write(&path, b"garbage").unwrap();

        let store = SurveyStore::new(&path);
        assert!(store.load().await.unwrap().is_none());
        assert!(!store.is_completed().await.unwrap());
    }
}
