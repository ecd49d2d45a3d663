//! Targeted single-cell writes, the edit path behind each search result.

use sqlx::SqlitePool;

use crate::classify;
use crate::error::{EngineError, Result};
use crate::schema::quote_ident;

pub struct CellUpdater {
    pool: SqlitePool,
}

impl CellUpdater {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Write `content` into one column of the row matching the primary-key
    /// value. If the submitted text parses as the decoded notation of a
    /// structured value it is re-encoded first, so edited blobs land in
    /// storage in their serialized form. Exactly one UPDATE is issued; the
    /// affected-row count is not validated against one.
    pub async fn update_cell(
        &self,
        table: &str,
        column: &str,
        primary_key: &str,
        primary_value: &str,
        content: &str,
    ) -> Result<()> {
        if table.is_empty() || column.is_empty() || primary_key.is_empty() || primary_value.is_empty()
        {
            return Err(EngineError::Validation(
                "table, column, primary key and primary value are all required".into(),
            ));
        }

        let stored = match classify::encode(content) {
            Some(encoded) => encoded,
            None => content.to_string(),
        };

        let sql = format!(
            "UPDATE {table} SET {column} = ? WHERE {pk} = ?",
            table = quote_ident(table),
            column = quote_ident(column),
            pk = quote_ident(primary_key),
        );
        sqlx::query(&sql)
            .bind(&stored)
            .bind(primary_value)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!(
                    "Cell update failed on {}.{} ({}={}): {}",
                    table,
                    column,
                    primary_key,
                    primary_value,
                    e
                );
                EngineError::Database(e)
            })?;

        tracing::info!("Cell updated: {}.{} where {}={}", table, column, primary_key, primary_value);
        Ok(())
    }
}
