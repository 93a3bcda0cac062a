use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::{DetectionResult, ModuleConfig, NewSubmissionRecord, RecordKey, SubmissionRecord};
use crate::repositories::{detection_records, module_configs};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UpsertOutcome {
    Inserted,
    /// A pending record already existed and received the new classification.
    Merged,
    Unchanged,
}

/// Persistence contract for detection records and per-module settings.
#[async_trait]
pub(crate) trait ResultStore: Send + Sync {
    async fn find_record(&self, key: &RecordKey) -> Result<Option<SubmissionRecord>, sqlx::Error>;

    /// Returns `false` when a record with the same key already exists.
    async fn insert_if_absent(&self, record: &NewSubmissionRecord) -> Result<bool, sqlx::Error>;

    /// Fills classification fields on a record that has none; never touches analysed records.
    async fn update_with_detection_result(
        &self,
        key: &RecordKey,
        result: &DetectionResult,
    ) -> Result<bool, sqlx::Error>;

    /// Records for the given users in one module, oldest first.
    async fn list_records_for_users(
        &self,
        course_module_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<SubmissionRecord>, sqlx::Error>;

    async fn get_module_config(&self, course_module_id: i64) -> Result<Option<ModuleConfig>, sqlx::Error>;

    async fn upsert_module_config(&self, config: &ModuleConfig) -> Result<(), sqlx::Error>;

    async fn ping(&self) -> Result<(), sqlx::Error>;

    /// Existing data wins: a second write for the same key only fills in a missing classification.
    async fn upsert_record(&self, record: &NewSubmissionRecord) -> Result<UpsertOutcome, sqlx::Error> {
        if self.insert_if_absent(record).await? {
            return Ok(UpsertOutcome::Inserted);
        }

        match &record.result {
            Some(result) if self.update_with_detection_result(&record.key, result).await? => {
                Ok(UpsertOutcome::Merged)
            }
            _ => Ok(UpsertOutcome::Unchanged),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct PgResultStore {
    pool: PgPool,
}

impl PgResultStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for PgResultStore {
    async fn find_record(&self, key: &RecordKey) -> Result<Option<SubmissionRecord>, sqlx::Error> {
        detection_records::find_by_key(&self.pool, key).await
    }

    async fn insert_if_absent(&self, record: &NewSubmissionRecord) -> Result<bool, sqlx::Error> {
        detection_records::insert_if_absent(&self.pool, record).await
    }

    async fn update_with_detection_result(
        &self,
        key: &RecordKey,
        result: &DetectionResult,
    ) -> Result<bool, sqlx::Error> {
        detection_records::fill_classification_if_missing(&self.pool, key, result).await
    }

    async fn list_records_for_users(
        &self,
        course_module_id: i64,
        user_ids: &[i64],
    ) -> Result<Vec<SubmissionRecord>, sqlx::Error> {
        detection_records::list_for_users(&self.pool, course_module_id, user_ids).await
    }

    async fn get_module_config(&self, course_module_id: i64) -> Result<Option<ModuleConfig>, sqlx::Error> {
        module_configs::find_by_module(&self.pool, course_module_id).await
    }

    async fn upsert_module_config(&self, config: &ModuleConfig) -> Result<(), sqlx::Error> {
        module_configs::upsert(&self.pool, config).await
    }

    async fn ping(&self) -> Result<(), sqlx::Error> {
        crate::db::ping(&self.pool).await
    }
}
