use crate::storage::RecordStore;
use crate::survey::SurveyStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub survey: Arc<SurveyStore>,
}

impl AppState {
    pub fn new(store: RecordStore, survey: SurveyStore) -> Self {
        Self {
            store: Arc::new(store),
            survey: Arc::new(survey),
        }
    }
}
