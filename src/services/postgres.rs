use async_trait::async_trait;
use crate::core::error::StoreError;
use crate::core::store::RecordStore;
use crate::models::{RelationshipRecord, SetField, SetOp, UserId};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};
use std::collections::BTreeSet;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with PostgreSQL
#[derive(Debug, Error)]
pub enum PostgresError {
    #[error("SQLx error: {0}")]
    SqlxError(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    MigrateError(#[from] sqlx::migrate::MigrateError),
}

impl From<PostgresError> for StoreError {
    fn from(err: PostgresError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

/// Column backing a record field
fn column(field: SetField) -> &'static str {
    match field {
        SetField::Likes => "likes",
        SetField::Dislikes => "dislikes",
        SetField::Matches => "matches",
        SetField::Roommates => "roommates",
        SetField::PendingRoommateRequests => "pending_roommate_requests",
    }
}

/// Build a single-row UPDATE applying `ops` in order
///
/// `$1` is the user id and `$2..` the op values, in op order. Ops on the same
/// column are folded into one nested expression since a column may only be
/// assigned once per statement. Add is remove-then-append so a value never
/// appears twice.
fn build_apply_sql(ops: &[SetOp]) -> String {
    let mut assignments = Vec::new();

    for field in SetField::ALL {
        let col = column(field);
        let mut expr = col.to_string();
        let mut touched = false;

        for (i, op) in ops.iter().enumerate() {
            if op.field() != field {
                continue;
            }
            let param = i + 2;
            expr = match op {
                SetOp::Add(..) => format!(
                    "array_append(array_remove({}, ${}::text), ${}::text)",
                    expr, param, param
                ),
                SetOp::Remove(..) => format!("array_remove({}, ${}::text)", expr, param),
            };
            touched = true;
        }

        if touched {
            assignments.push(format!("{} = {}", col, expr));
        }
    }

    assignments.push("updated_at = NOW()".to_string());

    format!(
        "UPDATE relationship_records SET {} WHERE user_id = $1",
        assignments.join(", ")
    )
}

/// PostgreSQL-backed relationship record store
///
/// One row per user with a `TEXT[]` column per set field. Every batch of set
/// operations is a single UPDATE, so it is atomic for that row.
pub struct PostgresClient {
    pool: PgPool,
}

impl PostgresClient {
    /// Create a new PostgreSQL client from a connection string
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, PostgresError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a new PostgreSQL client from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, PostgresError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    /// Health check for the database connection
    pub async fn health_check(&self) -> Result<bool, PostgresError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }

    fn read_set(row: &PgRow, field: SetField) -> Result<BTreeSet<UserId>, sqlx::Error> {
        let values: Vec<String> = row.try_get(column(field))?;
        Ok(values.into_iter().map(UserId::from).collect())
    }
}

#[async_trait]
impl RecordStore for PostgresClient {
    async fn get_record(&self, id: &UserId) -> Result<Option<RelationshipRecord>, StoreError> {
        let query = r#"
            SELECT likes, dislikes, matches, roommates, pending_roommate_requests
            FROM relationship_records
            WHERE user_id = $1
        "#;

        let row = sqlx::query(query)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut record = RelationshipRecord::default();
        for field in SetField::ALL {
            *record.set_mut(field) = Self::read_set(&row, field).map_err(|e| StoreError::Corrupt {
                user_id: id.to_string(),
                reason: e.to_string(),
            })?;
        }

        Ok(Some(record))
    }

    async fn create_if_absent(
        &self,
        id: &UserId,
        initial: &RelationshipRecord,
    ) -> Result<(), StoreError> {
        let query = r#"
            INSERT INTO relationship_records
                (user_id, likes, dislikes, matches, roommates, pending_roommate_requests, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, NOW())
            ON CONFLICT (user_id) DO NOTHING
        "#;

        let as_vec = |field: SetField| -> Vec<String> {
            initial.set(field).iter().map(|v| v.as_str().to_string()).collect()
        };

        let result = sqlx::query(query)
            .bind(id.as_str())
            .bind(as_vec(SetField::Likes))
            .bind(as_vec(SetField::Dislikes))
            .bind(as_vec(SetField::Matches))
            .bind(as_vec(SetField::Roommates))
            .bind(as_vec(SetField::PendingRoommateRequests))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            tracing::debug!("Created relationship record for {}", id);
        }

        Ok(())
    }

    async fn apply(&self, id: &UserId, ops: &[SetOp]) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }

        let sql = build_apply_sql(ops);
        let mut query = sqlx::query(&sql).bind(id.as_str());
        for op in ops {
            query = query.bind(op.value().as_str());
        }

        let result = query.execute(&self.pool).await?;

        tracing::debug!(
            "Applied {} set ops to {} ({} rows)",
            ops.len(),
            id,
            result.rows_affected()
        );

        Ok(())
    }
}
