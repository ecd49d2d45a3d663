//! Live schema introspection.
//!
//! Descriptors are rebuilt on every scan; the admin UI (or anything else
//! sharing the database) may alter the schema between calls, so nothing is
//! cached.

use sqlx::SqlitePool;

use crate::error::Result;

/// One column of a live table, straight from `PRAGMA table_info`.
#[derive(Debug, Clone)]
pub struct ColumnDescriptor {
    pub name: String,
    pub declared_type: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct TableDescriptor {
    pub name: String,
    pub columns: Vec<ColumnDescriptor>,
    /// Resolved primary-key column. Falls back to a conventional identifier
    /// name when the table declares none; updates against a table that lacks
    /// that column will simply fail.
    pub primary_key: String,
}

pub struct SchemaScanner {
    pool: SqlitePool,
}

impl SchemaScanner {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// All user tables in the database, in enumeration order.
    pub async fn list_tables(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    /// Columns of one table in declared order.
    pub async fn describe_columns(&self, table: &str) -> Result<Vec<ColumnDescriptor>> {
        let rows: Vec<(i32, String, String, i32, Option<String>, i32)> =
            sqlx::query_as(&format!("PRAGMA table_info({})", quote_ident(table)))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows
            .into_iter()
            .map(|(_, name, declared_type, _, _, pk)| ColumnDescriptor {
                name,
                declared_type,
                is_primary: pk > 0,
            })
            .collect())
    }

    /// Full descriptor for a table, or `None` if introspection fails
    /// (the table is then skipped, not fatal).
    pub async fn describe_table(&self, table: &str, fallback_key: &str) -> Option<TableDescriptor> {
        match self.describe_columns(table).await {
            Ok(columns) if !columns.is_empty() => {
                let primary_key = primary_key_of(&columns, fallback_key);
                Some(TableDescriptor {
                    name: table.to_string(),
                    columns,
                    primary_key,
                })
            }
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Skipping table {}: introspection failed: {}", table, e);
                None
            }
        }
    }
}

/// First primary-key-flagged column in declared order wins; otherwise the
/// conventional fallback name.
pub fn primary_key_of(columns: &[ColumnDescriptor], fallback_key: &str) -> String {
    columns
        .iter()
        .find(|c| c.is_primary)
        .map(|c| c.name.clone())
        .unwrap_or_else(|| fallback_key.to_string())
}

/// Text-family check over declared types. Closed set: only variable-length
/// text columns are worth searching.
pub fn is_text_type(declared_type: &str) -> bool {
    let lower = declared_type.to_lowercase();
    lower.contains("text") || lower.contains("varchar") || lower.contains("clob")
}

/// Quote an identifier for splicing into dynamic SQL. Table and column names
/// cannot be bound parameters, so embedded quotes are doubled instead.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(name: &str, ty: &str, pk: bool) -> ColumnDescriptor {
        ColumnDescriptor {
            name: name.to_string(),
            declared_type: ty.to_string(),
            is_primary: pk,
        }
    }

    #[test]
    fn test_is_text_type() {
        assert!(is_text_type("TEXT"));
        assert!(is_text_type("text"));
        assert!(is_text_type("VARCHAR(255)"));
        assert!(is_text_type("LONGTEXT"));
        assert!(is_text_type("CLOB"));
        assert!(!is_text_type("INTEGER"));
        assert!(!is_text_type("REAL"));
        assert!(!is_text_type("BLOB"));
        assert!(!is_text_type(""));
    }

    #[test]
    fn test_primary_key_resolution() {
        let columns = vec![
            column("body", "TEXT", false),
            column("id", "INTEGER", true),
            column("other_id", "INTEGER", true),
        ];
        assert_eq!(primary_key_of(&columns, "ID"), "id");

        let keyless = vec![column("body", "TEXT", false)];
        assert_eq!(primary_key_of(&keyless, "ID"), "ID");
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("posts"), "\"posts\"");
        assert_eq!(quote_ident("weird\"name"), "\"weird\"\"name\"");
    }

    #[tokio::test]
    async fn test_live_introspection() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query("CREATE TABLE posts (ID INTEGER PRIMARY KEY, post_content TEXT, post_type VARCHAR(20))")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("CREATE TABLE notes (body TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        let scanner = SchemaScanner::new(pool);
        let tables = scanner.list_tables().await.unwrap();
        assert_eq!(tables, vec!["notes".to_string(), "posts".to_string()]);

        let posts = scanner.describe_table("posts", "ID").await.unwrap();
        assert_eq!(posts.primary_key, "ID");
        assert_eq!(posts.columns.len(), 3);
        assert!(posts.columns[1].is_primary == false);
        assert!(posts.columns[0].is_primary);

        let notes = scanner.describe_table("notes", "ID").await.unwrap();
        assert_eq!(notes.primary_key, "ID");

        assert!(scanner.describe_table("missing", "ID").await.is_none());
    }
}
