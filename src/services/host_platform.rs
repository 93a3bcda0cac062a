use async_trait::async_trait;
use sqlx::PgPool;

use crate::repositories::host_directory;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct UserProfile {
    pub(crate) id: i64,
    pub(crate) username: String,
    pub(crate) email: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ModuleInfo {
    pub(crate) id: i64,
    pub(crate) course_id: i64,
    pub(crate) module_type: String,
    pub(crate) name: String,
    pub(crate) team_submission: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct HostFile {
    pub(crate) pathname_hash: String,
    pub(crate) content_hash: Option<String>,
    pub(crate) filename: String,
    pub(crate) filepath: String,
    pub(crate) mimetype: Option<String>,
    pub(crate) content: Vec<u8>,
}

impl HostFile {
    pub(crate) fn is_directory(&self) -> bool {
        self.filename == "."
    }
}

/// What the pipeline needs to know about the learning platform it is attached to.
///
/// Users, course modules, groups and stored files all belong to the host; this
/// service only reads them.
#[async_trait]
pub(crate) trait HostPlatform: Send + Sync {
    async fn user_profile(&self, user_id: i64) -> Result<Option<UserProfile>, sqlx::Error>;

    /// `None` once the host has deleted the module.
    async fn module_info(&self, course_module_id: i64) -> Result<Option<ModuleInfo>, sqlx::Error>;

    async fn file_by_pathname_hash(&self, pathname_hash: &str) -> Result<Option<HostFile>, sqlx::Error>;

    async fn user_groups(&self, course_id: i64, user_id: i64) -> Result<Vec<i64>, sqlx::Error>;

    async fn group_members(&self, group_id: i64) -> Result<Vec<i64>, sqlx::Error>;
}

/// Reads the host mirror tables in the service database.
#[derive(Debug, Clone)]
pub(crate) struct PgHostPlatform {
    pool: PgPool,
}

impl PgHostPlatform {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HostPlatform for PgHostPlatform {
    async fn user_profile(&self, user_id: i64) -> Result<Option<UserProfile>, sqlx::Error> {
        let row = host_directory::find_user(&self.pool, user_id).await?;
        Ok(row.map(|row| UserProfile { id: row.id, username: row.username, email: row.email }))
    }

    async fn module_info(&self, course_module_id: i64) -> Result<Option<ModuleInfo>, sqlx::Error> {
        let row = host_directory::find_module(&self.pool, course_module_id).await?;
        Ok(row.map(|row| ModuleInfo {
            id: row.id,
            course_id: row.course_id,
            module_type: row.module_type,
            name: row.instance_name,
            team_submission: row.team_submission,
        }))
    }

    async fn file_by_pathname_hash(&self, pathname_hash: &str) -> Result<Option<HostFile>, sqlx::Error> {
        let row = host_directory::find_file(&self.pool, pathname_hash).await?;
        Ok(row.map(|row| HostFile {
            pathname_hash: row.pathname_hash,
            content_hash: row.content_hash,
            filename: row.filename,
            filepath: row.filepath,
            mimetype: row.mimetype,
            content: row.content,
        }))
    }

    async fn user_groups(&self, course_id: i64, user_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        host_directory::list_user_groups(&self.pool, course_id, user_id).await
    }

    async fn group_members(&self, group_id: i64) -> Result<Vec<i64>, sqlx::Error> {
        host_directory::list_group_members(&self.pool, group_id).await
    }
}
