use sqlx::PgPool;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct HostUserRow {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct HostModuleRow {
    pub(crate) id: i64,
    pub(crate) course_id: i64,
    pub(crate) module_type: String,
    pub(crate) instance_name: String,
    pub(crate) team_submission: bool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct HostFileRow {
    pub(crate) pathname_hash: String,
    pub(crate) content_hash: Option<String>,
    pub(crate) filename: String,
    pub(crate) filepath: String,
    pub(crate) mimetype: Option<String>,
    pub(crate) content: Vec<u8>,
}

pub(crate) async fn find_user(pool: &PgPool, user_id: i64) -> Result<Option<HostUserRow>, sqlx::Error> {
    sqlx::query_as::<_, HostUserRow>(
        "SELECT id, username, email
         FROM host_users
         WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_module(
    pool: &PgPool,
    course_module_id: i64,
) -> Result<Option<HostModuleRow>, sqlx::Error> {
    sqlx::query_as::<_, HostModuleRow>(
        "SELECT id, course_id, module_type, instance_name, team_submission
         FROM host_course_modules
         WHERE id = $1",
    )
    .bind(course_module_id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn find_file(
    pool: &PgPool,
    pathname_hash: &str,
) -> Result<Option<HostFileRow>, sqlx::Error> {
    sqlx::query_as::<_, HostFileRow>(
        "SELECT pathname_hash, content_hash, filename, filepath, mimetype, content
         FROM host_files
         WHERE pathname_hash = $1",
    )
    .bind(pathname_hash)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn list_user_groups(
    pool: &PgPool,
    course_id: i64,
    user_id: i64,
) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT group_id
         FROM host_group_members
         WHERE course_id = $1 AND user_id = $2
         ORDER BY group_id",
    )
    .bind(course_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_group_members(pool: &PgPool, group_id: i64) -> Result<Vec<i64>, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT user_id
         FROM host_group_members
         WHERE group_id = $1
         ORDER BY user_id",
    )
    .bind(group_id)
    .fetch_all(pool)
    .await
}
