use sqlx::PgPool;

use crate::db::models::ModuleConfig;

pub(crate) const COLUMNS: &str = "\
    course_module_id, use_detection, show_student_results, external_assignment_id, \
    creator_email, created_at, updated_at";

pub(crate) async fn find_by_module(
    pool: &PgPool,
    course_module_id: i64,
) -> Result<Option<ModuleConfig>, sqlx::Error> {
    sqlx::query_as::<_, ModuleConfig>(&format!(
        "SELECT {COLUMNS}
         FROM detection_module_configs
         WHERE course_module_id = $1"
    ))
    .bind(course_module_id)
    .fetch_optional(pool)
    .await
}

/// Creates or replaces the settings row for a course module.
///
/// The external assignment id and creator are only filled when the stored row lacks them.
pub(crate) async fn upsert(pool: &PgPool, config: &ModuleConfig) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO detection_module_configs (
            course_module_id, use_detection, show_student_results, external_assignment_id,
            creator_email, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         ON CONFLICT (course_module_id) DO UPDATE
         SET use_detection = EXCLUDED.use_detection,
             show_student_results = EXCLUDED.show_student_results,
             external_assignment_id = COALESCE(
                 detection_module_configs.external_assignment_id,
                 EXCLUDED.external_assignment_id
             ),
             creator_email = COALESCE(
                 detection_module_configs.creator_email,
                 EXCLUDED.creator_email
             ),
             updated_at = EXCLUDED.updated_at",
    )
    .bind(config.course_module_id)
    .bind(config.use_detection)
    .bind(config.show_student_results)
    .bind(config.external_assignment_id.as_deref())
    .bind(config.creator_email.as_deref())
    .bind(config.created_at)
    .bind(config.updated_at)
    .execute(pool)
    .await?;

    Ok(())
}
