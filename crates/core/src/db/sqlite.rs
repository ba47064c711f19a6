use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};

use crate::error::{Result, SyncError};
use crate::models::{
    common::Context,
    sync::{SyncRun, SyncRunStatus},
    user::{LocalUser, MergedUser},
};

use super::repository::{LocalUserStore, SyncRunRepository, UserRepository, UserTransaction};

const USER_COLUMNS: &str = "uid, dn, configuration_uid, disabled, deleted, fields";

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All rows of a context's table, ordered by uid. Reads outside any transaction.
    pub async fn list_users(&self, context: Context) -> Result<Vec<LocalUser>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM {} ORDER BY uid",
            table_name(context)
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_local_user).collect()
    }

    /// Insert a row that is not linked to any directory entry, like a user
    /// maintained by hand in the application.
    #[cfg(test)]
    async fn insert_unlinked_user(
        &self,
        context: Context,
        fields: &BTreeMap<String, String>,
    ) -> Result<i64> {
        let result = sqlx::query(&format!(
            "INSERT INTO {} (dn, configuration_uid, disabled, deleted, fields) VALUES (NULL, NULL, 0, 0, ?1)",
            table_name(context)
        ))
        .bind(fields_to_str(fields)?)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }
}

#[async_trait]
impl UserRepository for SqliteRepository {
    async fn begin(&self) -> Result<Box<dyn UserTransaction>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteUserTransaction { tx }))
    }
}

/// A SQLite transaction over the user tables. Rolled back when dropped uncommitted.
pub struct SqliteUserTransaction {
    tx: Transaction<'static, Sqlite>,
}

impl SqliteUserTransaction {
    async fn fetch_user(&mut self, uid: i64, context: Context) -> Result<LocalUser> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM {} WHERE uid = ?1",
            table_name(context)
        ))
        .bind(uid)
        .fetch_optional(&mut *self.tx)
        .await?;
        match row {
            Some(r) => row_to_local_user(&r),
            None => Err(SyncError::Store(format!(
                "{context} user {uid} does not exist"
            ))),
        }
    }

    async fn set_flag(
        &mut self,
        user: &LocalUser,
        context: Context,
        column: &str,
        value: bool,
    ) -> Result<()> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET {column} = ?2 WHERE uid = ?1",
            table_name(context)
        ))
        .bind(user.uid)
        .bind(value)
        .execute(&mut *self.tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(SyncError::Store(format!(
                "{context} user {} does not exist",
                user.uid
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LocalUserStore for SqliteUserTransaction {
    async fn find_by_dn(&mut self, dn: &str, context: Context) -> Result<Option<LocalUser>> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM {} WHERE dn = ?1 COLLATE NOCASE
             ORDER BY deleted ASC, disabled ASC, uid ASC LIMIT 1",
            table_name(context)
        ))
        .bind(dn)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.as_ref().map(row_to_local_user).transpose()
    }

    async fn list_linked(
        &mut self,
        configuration_uid: u32,
        context: Context,
    ) -> Result<Vec<LocalUser>> {
        let rows = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM {} WHERE configuration_uid = ?1 AND dn IS NOT NULL AND dn != '' ORDER BY uid",
            table_name(context)
        ))
        .bind(i64::from(configuration_uid))
        .fetch_all(&mut *self.tx)
        .await?;
        rows.iter().map(row_to_local_user).collect()
    }

    async fn upsert(
        &mut self,
        merged: &MergedUser,
        configuration_uid: u32,
        context: Context,
    ) -> Result<LocalUser> {
        let fields = fields_to_str(&merged.fields)?;
        let uid = match merged.uid {
            Some(uid) => {
                let result = sqlx::query(&format!(
                    "UPDATE {} SET dn = ?2, configuration_uid = ?3, fields = ?4 WHERE uid = ?1",
                    table_name(context)
                ))
                .bind(uid)
                .bind(&merged.dn)
                .bind(i64::from(configuration_uid))
                .bind(&fields)
                .execute(&mut *self.tx)
                .await?;
                if result.rows_affected() == 0 {
                    return Err(SyncError::Store(format!(
                        "{context} user {uid} does not exist"
                    )));
                }
                uid
            }
            None => {
                let result = sqlx::query(&format!(
                    "INSERT INTO {} (dn, configuration_uid, disabled, deleted, fields) VALUES (?1, ?2, 0, 0, ?3)",
                    table_name(context)
                ))
                .bind(&merged.dn)
                .bind(i64::from(configuration_uid))
                .bind(&fields)
                .execute(&mut *self.tx)
                .await?;
                result.last_insert_rowid()
            }
        };
        self.fetch_user(uid, context).await
    }

    async fn disable(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.set_flag(user, context, "disabled", true).await
    }

    async fn soft_delete(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.set_flag(user, context, "deleted", true).await
    }

    async fn enable(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.set_flag(user, context, "disabled", false).await
    }

    async fn undelete(&mut self, user: &LocalUser, context: Context) -> Result<()> {
        self.set_flag(user, context, "deleted", false).await
    }
}

#[async_trait]
impl UserTransaction for SqliteUserTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}

// -- Helper functions --

fn table_name(context: Context) -> &'static str {
    match context {
        Context::Fe => "fe_users",
        Context::Be => "be_users",
    }
}

fn fields_to_str(fields: &BTreeMap<String, String>) -> Result<String> {
    Ok(serde_json::to_string(fields)?)
}

fn row_to_local_user(r: &sqlx::sqlite::SqliteRow) -> Result<LocalUser> {
    let fields: String = r.get("fields");
    let configuration_uid: Option<i64> = r.get("configuration_uid");
    Ok(LocalUser {
        uid: r.get("uid"),
        dn: r.get("dn"),
        configuration_uid: configuration_uid.and_then(|v| u32::try_from(v).ok()),
        disabled: r.get::<i64, _>("disabled") != 0,
        deleted: r.get::<i64, _>("deleted") != 0,
        fields: serde_json::from_str(&fields)?,
    })
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn datetime_to_str(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn parse_sync_run_status(s: &str) -> SyncRunStatus {
    match s {
        "completed" => SyncRunStatus::Completed,
        "failed" => SyncRunStatus::Failed,
        _ => SyncRunStatus::Running,
    }
}

fn sync_run_status_to_str(s: &SyncRunStatus) -> &'static str {
    match s {
        SyncRunStatus::Running => "running",
        SyncRunStatus::Completed => "completed",
        SyncRunStatus::Failed => "failed",
    }
}

fn row_to_sync_run(r: &sqlx::sqlite::SqliteRow) -> SyncRun {
    let completed: Option<String> = r.get("completed_at");
    SyncRun {
        id: r.get("id"),
        started_at: parse_datetime(r.get("started_at")),
        completed_at: completed.map(|s| parse_datetime(&s)),
        status: parse_sync_run_status(r.get("status")),
        pairs: r.get("pairs"),
        failures: r.get("failures"),
        error_details: r.get("error_details"),
        dry_run: r.get::<i32, _>("dry_run") != 0,
    }
}

#[async_trait]
impl SyncRunRepository for SqliteRepository {
    async fn create_sync_run(&self, dry_run: bool) -> Result<SyncRun> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO sync_runs (id, started_at, status, dry_run) VALUES (?1, ?2, 'running', ?3)",
        )
        .bind(&id)
        .bind(datetime_to_str(&now))
        .bind(dry_run as i32)
        .execute(&self.pool)
        .await?;

        Ok(SyncRun {
            id,
            started_at: now,
            completed_at: None,
            status: SyncRunStatus::Running,
            pairs: 0,
            failures: 0,
            error_details: None,
            dry_run,
        })
    }

    async fn finish_sync_run(
        &self,
        id: &str,
        status: SyncRunStatus,
        pairs: i64,
        failures: i64,
        error_details: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE sync_runs SET status = ?2, completed_at = ?3, pairs = ?4, failures = ?5, error_details = ?6 WHERE id = ?1",
        )
        .bind(id)
        .bind(sync_run_status_to_str(&status))
        .bind(datetime_to_str(&Utc::now()))
        .bind(pairs)
        .bind(failures)
        .bind(error_details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_sync_run(&self, id: &str) -> Result<Option<SyncRun>> {
        let row = sqlx::query("SELECT * FROM sync_runs WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_sync_run))
    }

    async fn get_latest_sync_run(&self) -> Result<Option<SyncRun>> {
        let row = sqlx::query("SELECT * FROM sync_runs ORDER BY started_at DESC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_sync_run))
    }

    async fn list_sync_runs(&self, limit: i64) -> Result<Vec<SyncRun>> {
        let rows = sqlx::query("SELECT * FROM sync_runs ORDER BY started_at DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_sync_run).collect())
    }
}
