//! The tag store: allocation from the `tag_id` sequence, lookups, link
//! transitions and snapshot restore.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgRow};
use sqlx::Row;
use thiserror::Error;

use tagmint_id::TagVariant;

use super::DbError;

/// A row from the `tags` table.
///
/// The external id is deliberately absent: it is derived from `id` and
/// `variant` at the serialization boundary, never persisted.
#[derive(Debug, Clone)]
pub struct TagRow {
    pub id: i64,
    pub secondary: Option<String>,
    pub variant: TagVariant,
    pub link_target: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, PgRow> for TagRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let variant: String = row.try_get("variant")?;
        let variant = variant
            .parse::<TagVariant>()
            .map_err(|e| sqlx::Error::ColumnDecode {
                index: "variant".to_string(),
                source: Box::new(e),
            })?;

        Ok(Self {
            id: row.try_get("id")?,
            secondary: row.try_get("secondary")?,
            variant,
            link_target: row.try_get("link_target")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const TAG_COLUMNS: &str = "id, secondary, variant, link_target, created_at, updated_at";

/// Error from the write-once claim path.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// No tag with that id.
    #[error("tag does not exist")]
    NotFound,

    /// The tag already has a link target. Claims are write-once; the
    /// existing target is carried for the conflict report.
    #[error("tag is already linked to {existing}")]
    AlreadyLinked { existing: String },

    #[error(transparent)]
    Db(#[from] DbError),
}

/// Store handle for tag rows.
#[derive(Clone)]
pub struct TagStore {
    pool: PgPool,
}

impl TagStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Allocates `count` fresh tags in one atomic statement.
    ///
    /// Each row draws its id from the `tag_id` sequence; the table's range
    /// check rejects the whole batch if the sequence ever outgrows the
    /// printable label bound.
    pub async fn create_batch(
        &self,
        count: i64,
        variant: TagVariant,
        link_target: Option<&str>,
    ) -> Result<Vec<TagRow>, DbError> {
        let rows = sqlx::query_as::<_, TagRow>(&format!(
            r#"
            INSERT INTO tags (id, variant, link_target)
            SELECT nextval('tag_id'), $1, $2
            FROM generate_series(1, $3)
            RETURNING {TAG_COLUMNS}
            "#
        ))
        .bind(variant.as_str())
        .bind(link_target)
        .bind(count)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        Ok(rows)
    }

    /// Looks up a tag by internal id.
    pub async fn get(&self, id: i64) -> Result<Option<TagRow>, DbError> {
        sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    /// Looks up a tag by its secondary (NFC) id.
    pub async fn get_by_secondary(&self, secondary: &str) -> Result<Option<TagRow>, DbError> {
        sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags WHERE secondary = $1"
        ))
        .bind(secondary)
        .fetch_optional(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    /// Write-once claim: sets `link_target` if and only if it is unset.
    ///
    /// The check and the update run in one transaction with the row locked,
    /// so a losing concurrent claim observes the conflict instead of
    /// overwriting.
    pub async fn claim(&self, id: i64, target: &str) -> Result<(), ClaimError> {
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        let existing: Option<(Option<String>,)> =
            sqlx::query_as("SELECT link_target FROM tags WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(DbError::Query)?;

        match existing {
            None => Err(ClaimError::NotFound),
            Some((Some(existing),)) => Err(ClaimError::AlreadyLinked { existing }),
            Some((None,)) => {
                sqlx::query("UPDATE tags SET link_target = $2, updated_at = now() WHERE id = $1")
                    .bind(id)
                    .bind(target)
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::Query)?;
                tx.commit().await.map_err(DbError::Query)?;
                Ok(())
            }
        }
    }

    /// Administrative range relink: points every tag in the inclusive range
    /// at `target`, overwriting any existing link.
    ///
    /// Intentionally a different policy from [`TagStore::claim`]: relink is
    /// an idempotent overwrite used to reassign batches to a devicehub, the
    /// claim path is write-once.
    pub async fn relink_range(
        &self,
        start: i64,
        end: i64,
        target: &str,
    ) -> Result<Vec<TagRow>, DbError> {
        let mut rows = sqlx::query_as::<_, TagRow>(&format!(
            r#"
            UPDATE tags SET link_target = $3, updated_at = now()
            WHERE id BETWEEN $1 AND $2
            RETURNING {TAG_COLUMNS}
            "#
        ))
        .bind(start)
        .bind(end)
        .bind(target)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)?;

        rows.sort_by_key(|row| row.id);
        Ok(rows)
    }

    /// Every tag, ordered by internal id. Snapshot source.
    pub async fn all_ordered(&self) -> Result<Vec<TagRow>, DbError> {
        sqlx::query_as::<_, TagRow>(&format!(
            "SELECT {TAG_COLUMNS} FROM tags ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::Query)
    }

    /// Destructive snapshot restore: truncates the table, re-inserts the
    /// given rows verbatim and reseeds the `tag_id` sequence to continue
    /// above the highest restored id.
    ///
    /// Runs as one transaction; any failure leaves the previous contents in
    /// place. Callers must guarantee no concurrent writers for the duration.
    pub async fn replace_all(&self, rows: &[TagRow]) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await.map_err(DbError::Query)?;

        sqlx::query("TRUNCATE TABLE tags")
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO tags (id, secondary, variant, link_target, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(row.id)
            .bind(&row.secondary)
            .bind(row.variant.as_str())
            .bind(&row.link_target)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(DbError::Query)?;
        }

        match rows.iter().map(|row| row.id).max() {
            Some(max_id) => {
                // nextval will return max_id + 1.
                sqlx::query("SELECT setval('tag_id', $1, true)")
                    .bind(max_id)
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::Query)?;
            }
            None => {
                // Empty restore: the next allocation starts over at 1.
                sqlx::query("SELECT setval('tag_id', 1, false)")
                    .execute(&mut *tx)
                    .await
                    .map_err(DbError::Query)?;
            }
        }

        tx.commit().await.map_err(DbError::Query)?;
        Ok(())
    }
}
