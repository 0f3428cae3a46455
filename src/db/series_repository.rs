use sqlx::SqlitePool;
use tracing::{debug, info, instrument};

use crate::db::DbError;
use crate::finalizer::{ConsolidatedDataset, DefinitionRow, ObservationRow};
use crate::importers::workbook_importer::CellValue;

/// Persists the consolidated dataset with replace-table semantics.
#[derive(Clone)]
pub struct SeriesRepository {
    pool: SqlitePool,
}

impl SeriesRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write both tables, replacing any previous contents, and (re)create
    /// the lookup indexes. Re-running is idempotent.
    pub async fn replace_dataset(&self, dataset: &ConsolidatedDataset) -> Result<(), DbError> {
        self.replace_definitions(&dataset.definitions).await?;
        self.replace_observations(&dataset.observations).await?;
        self.create_indexes().await
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    pub async fn replace_definitions(&self, rows: &[DefinitionRow]) -> Result<(), DbError> {
        debug!("Replacing series_definition table");
        let mut tx = self.pool.begin().await?;

        sqlx::query("DROP TABLE IF EXISTS series_definition")
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            r#"
            CREATE TABLE series_definition (
                "group" TEXT,
                id      TEXT,
                name    TEXT,
                unit    TEXT,
                note    TEXT
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        for row in rows {
            sqlx::query(
                r#"
                INSERT INTO series_definition ("group", id, name, unit, note)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(&row.group)
            .bind(&row.id)
            .bind(&row.name)
            .bind(&row.unit)
            .bind(&row.note)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!("Wrote {} series definitions", rows.len());
        Ok(())
    }

    #[instrument(skip(self, rows), fields(count = rows.len()))]
    pub async fn replace_observations(&self, rows: &[ObservationRow]) -> Result<(), DbError> {
        debug!("Replacing series table");
        let mut tx = self.pool.begin().await?;

        sqlx::query("DROP TABLE IF EXISTS series")
            .execute(&mut *tx)
            .await?;
        // `value` carries no type affinity: numeric observations store as
        // REAL, textual ones as TEXT, missing ones as NULL.
        sqlx::query(
            r#"
            CREATE TABLE series (
                id    TEXT,
                date  TEXT,
                value
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;

        for row in rows {
            let query = sqlx::query("INSERT INTO series (id, date, value) VALUES (?1, ?2, ?3)")
                .bind(&row.id)
                .bind(&row.date);
            let query = match &row.value {
                Some(CellValue::Number(n)) => query.bind(*n),
                Some(CellValue::Text(s)) => query.bind(s.clone()),
                None => query.bind(Option::<String>::None),
            };
            query.execute(&mut *tx).await?;
        }

        tx.commit().await?;
        info!("Wrote {} series observations", rows.len());
        Ok(())
    }

    /// Lookup indexes: definitions by id, observations by (id, date).
    /// The tables are recreated on every run, so the indexes are too.
    pub async fn create_indexes(&self) -> Result<(), DbError> {
        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_series_definition_id ON series_definition (id)",
        )
        .execute(&self.pool)
        .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_series_id_date ON series (id, date)")
            .execute(&self.pool)
            .await?;
        debug!("Indexes in place");
        Ok(())
    }
}
