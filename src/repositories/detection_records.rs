use sqlx::PgPool;

use crate::db::models::{DetectionResult, NewSubmissionRecord, RecordKey, SubmissionRecord};

pub(crate) const COLUMNS: &str = "\
    id, course_module_id, user_id, user_email, identifier, filename, content, submitted_at, \
    predicted_class, class_probability, confidence_category, scan_id, scan_url, attempt_count";

pub(crate) async fn find_by_key(
    pool: &PgPool,
    key: &RecordKey,
) -> Result<Option<SubmissionRecord>, sqlx::Error> {
    sqlx::query_as::<_, SubmissionRecord>(&format!(
        "SELECT {COLUMNS}
         FROM detection_records
         WHERE course_module_id = $1 AND user_id = $2 AND identifier = $3"
    ))
    .bind(key.course_module_id)
    .bind(key.user_id)
    .bind(&key.identifier)
    .fetch_optional(pool)
    .await
}

/// Inserts the record unless one already exists for its key.
///
/// Returns `true` when a row was written.
pub(crate) async fn insert_if_absent(
    pool: &PgPool,
    record: &NewSubmissionRecord,
) -> Result<bool, sqlx::Error> {
    let result = record.result.as_ref();
    let inserted = sqlx::query(
        "INSERT INTO detection_records (
            course_module_id, user_id, user_email, identifier, filename, content, submitted_at,
            predicted_class, class_probability, confidence_category, scan_id, scan_url,
            attempt_count
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,0)
         ON CONFLICT (course_module_id, user_id, identifier) DO NOTHING",
    )
    .bind(record.key.course_module_id)
    .bind(record.key.user_id)
    .bind(record.user_email.as_deref())
    .bind(&record.key.identifier)
    .bind(record.filename.as_deref())
    .bind(record.content.as_deref())
    .bind(record.submitted_at)
    .bind(result.map(|value| value.predicted_class.as_str()))
    .bind(result.map(|value| value.class_probability))
    .bind(result.and_then(|value| value.confidence_category.as_deref()))
    .bind(result.and_then(|value| value.scan_id.as_deref()))
    .bind(result.and_then(|value| value.scan_url.as_deref()))
    .execute(pool)
    .await?
    .rows_affected();

    Ok(inserted > 0)
}

/// Writes classification fields onto a record that has none yet.
///
/// Already classified rows are left untouched.
pub(crate) async fn fill_classification_if_missing(
    pool: &PgPool,
    key: &RecordKey,
    result: &DetectionResult,
) -> Result<bool, sqlx::Error> {
    let updated = sqlx::query(
        "UPDATE detection_records
         SET predicted_class = $1,
             class_probability = $2,
             confidence_category = $3,
             scan_id = $4,
             scan_url = $5
         WHERE course_module_id = $6
           AND user_id = $7
           AND identifier = $8
           AND (predicted_class IS NULL OR predicted_class = '')",
    )
    .bind(&result.predicted_class)
    .bind(result.class_probability)
    .bind(result.confidence_category.as_deref())
    .bind(result.scan_id.as_deref())
    .bind(result.scan_url.as_deref())
    .bind(key.course_module_id)
    .bind(key.user_id)
    .bind(&key.identifier)
    .execute(pool)
    .await?
    .rows_affected();

    Ok(updated > 0)
}

pub(crate) async fn list_for_users(
    pool: &PgPool,
    course_module_id: i64,
    user_ids: &[i64],
) -> Result<Vec<SubmissionRecord>, sqlx::Error> {
    if user_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, SubmissionRecord>(&format!(
        "SELECT {COLUMNS}
         FROM detection_records
         WHERE course_module_id = $1
           AND user_id = ANY($2)
         ORDER BY id"
    ))
    .bind(course_module_id)
    .bind(user_ids)
    .fetch_all(pool)
    .await
}
