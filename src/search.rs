//! Schema-agnostic substring search across every text-like column.
//!
//! Each eligible column gets one bounded `LIKE` page, so total work stays
//! proportional to the schema rather than the data. Matches on the raw stored
//! form are re-checked against the decoded value before they are reported,
//! since serialized blobs can match on their framing alone.

use serde::Serialize;
use sqlx::SqlitePool;

use crate::classify;
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::resolver::{TableResolver, TableRole};
use crate::schema::{is_text_type, quote_ident, SchemaScanner, TableDescriptor};

/// One matched cell. Ephemeral: built per search, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub table: String,
    pub column: String,
    /// Human label derived from the row (content type, or a generic label).
    pub context: String,
    /// Bounded, markup-escaped excerpt of the matched value.
    pub snippet: String,
    pub primary_key: String,
    /// Missing when the table has no usable key; no edit is possible then.
    pub primary_key_value: Option<String>,
    /// External editor link for recognized content and metadata rows.
    pub edit_url: Option<String>,
    /// Decoded content, so the caller's editor can populate itself.
    pub content: String,
}

pub struct SearchEngine {
    scanner: SchemaScanner,
    resolver: TableResolver,
    cfg: EngineConfig,
    pool: SqlitePool,
}

impl SearchEngine {
    pub fn new(pool: SqlitePool, cfg: EngineConfig) -> Self {
        Self {
            scanner: SchemaScanner::new(pool.clone()),
            resolver: TableResolver::new(cfg.clone()),
            cfg,
            pool,
        }
    }

    /// Search every table for `term`. Result order follows table enumeration
    /// order, then column declaration order, then row fetch order; there is
    /// no relevance ranking. An empty result set is not an error.
    pub async fn search(&self, term: &str) -> Result<Vec<SearchResult>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(EngineError::Validation("search term is required".into()));
        }

        let mut results = Vec::new();
        for table in self.scanner.list_tables().await? {
            if self.cfg.is_backup_table(&table) {
                continue;
            }
            let Some(desc) = self.scanner.describe_table(&table, &self.cfg.fallback_key).await
            else {
                continue;
            };
            self.search_table(&desc, term, &mut results).await;
        }

        tracing::debug!("Search for {:?} matched {} cells", term, results.len());
        Ok(results)
    }

    async fn search_table(&self, desc: &TableDescriptor, term: &str, results: &mut Vec<SearchResult>) {
        let role = self.resolver.resolve(&desc.name);
        let has_column = |name: &str| desc.columns.iter().any(|c| c.name == name);

        // Optional columns fetched alongside the match, NULL when the table
        // does not carry them.
        let pk_expr = if has_column(&desc.primary_key) {
            format!("CAST({} AS TEXT)", quote_ident(&desc.primary_key))
        } else {
            "NULL".to_string()
        };
        let type_expr = if role == TableRole::Content && has_column(&self.cfg.type_column) {
            format!("CAST({} AS TEXT)", quote_ident(&self.cfg.type_column))
        } else {
            "NULL".to_string()
        };
        let link_expr = if role == TableRole::Metadata && has_column(&self.cfg.meta_link_column) {
            format!("CAST({} AS TEXT)", quote_ident(&self.cfg.meta_link_column))
        } else {
            "NULL".to_string()
        };

        for column in &desc.columns {
            if self.cfg.is_excluded_column(&column.name) || !is_text_type(&column.declared_type) {
                continue;
            }

            // Revisions duplicate published content; drop them at the query.
            let revision_filter = if type_expr != "NULL" {
                format!(" AND {} != ?", quote_ident(&self.cfg.type_column))
            } else {
                String::new()
            };

            let sql = format!(
                "SELECT CAST({col} AS TEXT), {pk}, {ty}, {link} FROM {table} WHERE {col} LIKE ? ESCAPE '\\'{filter} LIMIT {limit}",
                col = quote_ident(&column.name),
                pk = pk_expr,
                ty = type_expr,
                link = link_expr,
                table = quote_ident(&desc.name),
                filter = revision_filter,
                limit = self.cfg.search_page_size,
            );

            let mut query = sqlx::query_as::<_, (Option<String>, Option<String>, Option<String>, Option<String>)>(&sql)
                .bind(format!("%{}%", escape_like(term)));
            if !revision_filter.is_empty() {
                query = query.bind(&self.cfg.revision_type);
            }

            let rows = match query.fetch_all(&self.pool).await {
                Ok(rows) => rows,
                Err(e) => {
                    // One broken column must not sink the whole scan.
                    tracing::warn!("Search query failed on {}.{}: {}", desc.name, column.name, e);
                    continue;
                }
            };

            for (raw, pk_value, type_value, linked_id) in rows {
                let raw = raw.unwrap_or_default();
                let content = classify::decode(&raw).unwrap_or_else(|| raw.clone());

                // The LIKE matched the stored form; only keep rows whose
                // decoded content still contains the term.
                if !content.contains(term) {
                    continue;
                }

                let edit_url = self.resolver.edit_link(
                    role,
                    type_value.as_deref(),
                    pk_value.as_deref(),
                    linked_id.as_deref(),
                );
                results.push(SearchResult {
                    table: desc.name.clone(),
                    column: column.name.clone(),
                    context: self.resolver.context_label(role, type_value.as_deref()),
                    snippet: escape_html(&truncate_chars(&content, self.cfg.snippet_length)),
                    primary_key: desc.primary_key.clone(),
                    primary_key_value: pk_value,
                    edit_url,
                    content,
                });
            }
        }
    }
}

/// Escape LIKE metacharacters in the user's term; the query uses `ESCAPE '\'`.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn fixture_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE posts (ID INTEGER PRIMARY KEY, post_content TEXT, post_type VARCHAR(20))",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            "CREATE TABLE postmeta (meta_id INTEGER PRIMARY KEY, post_id INTEGER, meta_key TEXT)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE users (user_id INTEGER PRIMARY KEY, guid TEXT, bio TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        pool
    }

    fn engine(pool: &SqlitePool) -> SearchEngine {
        SearchEngine::new(pool.clone(), EngineConfig::default())
    }

    async fn insert_post(pool: &SqlitePool, id: i64, content: &str, post_type: &str) {
        sqlx::query("INSERT INTO posts (ID, post_content, post_type) VALUES (?, ?, ?)")
            .bind(id)
            .bind(content)
            .bind(post_type)
            .execute(pool)
            .await
            .unwrap();
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\now"), "50\\%\\_off\\\\now");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[tokio::test]
    async fn test_revisions_are_excluded() {
        let pool = fixture_pool().await;
        insert_post(&pool, 1, "hello world", "post").await;
        insert_post(&pool, 2, "hello world", "revision").await;

        let results = engine(&pool).search("hello").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].primary_key_value.as_deref(), Some("1"));
        assert_eq!(results[0].context, "Post");
        assert_eq!(
            results[0].edit_url.as_deref(),
            Some("/wp-admin/post.php?post=1&action=edit")
        );
    }

    #[tokio::test]
    async fn test_deny_listed_columns_are_never_searched() {
        let pool = fixture_pool().await;
        sqlx::query("INSERT INTO users (user_id, guid, bio) VALUES (1, 'needle', 'nothing')")
            .execute(&pool)
            .await
            .unwrap();

        let results = engine(&pool).search("needle").await.unwrap();
        assert!(results.is_empty());

        // Same value in an allowed column is found.
        sqlx::query("UPDATE users SET bio = 'needle here'")
            .execute(&pool)
            .await
            .unwrap();
        let results = engine(&pool).search("needle").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].column, "bio");
        assert_eq!(results[0].context, "General Data");
        assert_eq!(results[0].primary_key, "user_id");
    }

    #[tokio::test]
    async fn test_backup_tables_are_skipped() {
        let pool = fixture_pool().await;
        insert_post(&pool, 1, "hello", "post").await;
        sqlx::query("CREATE TABLE posts_backup_1700000000 AS SELECT * FROM posts")
            .execute(&pool)
            .await
            .unwrap();

        let results = engine(&pool).search("hello").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].table, "posts");
    }

    #[tokio::test]
    async fn test_snippet_is_bounded_and_escaped() {
        let pool = fixture_pool().await;
        let long = format!("<b>needle</b>{}", "x".repeat(300));
        insert_post(&pool, 1, &long, "post").await;

        let results = engine(&pool).search("needle").await.unwrap();
        assert_eq!(results.len(), 1);
        let snippet = &results[0].snippet;
        assert!(snippet.starts_with("&lt;b&gt;needle&lt;/b&gt;"));
        // Bound applies before escaping; undo the entities to measure it.
        let unescaped = snippet
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&");
        assert_eq!(unescaped.chars().count(), 150);
        assert!(!snippet.contains('<'));
        assert_eq!(results[0].content, long);
    }

    #[tokio::test]
    async fn test_serialized_content_is_decoded_before_matching() {
        let pool = fixture_pool().await;
        insert_post(&pool, 1, "a:1:{s:3:\"key\";s:5:\"hello\";}", "post").await;

        // Decoded content contains the term.
        let results = engine(&pool).search("hello").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "{\"key\" => \"hello\"}");

        // Raw form matches on framing only; the decoded re-check drops it.
        let results = engine(&pool).search("s:3").await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_metadata_rows_link_through_owning_content() {
        let pool = fixture_pool().await;
        sqlx::query("INSERT INTO postmeta (meta_id, post_id, meta_key) VALUES (5, 12, 'needle_key')")
            .execute(&pool)
            .await
            .unwrap();

        let results = engine(&pool).search("needle_key").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].table, "postmeta");
        assert_eq!(results[0].primary_key_value.as_deref(), Some("5"));
        assert_eq!(
            results[0].edit_url.as_deref(),
            Some("/wp-admin/post.php?post=12&action=edit")
        );
    }

    #[tokio::test]
    async fn test_keyless_table_yields_result_without_edit_affordance() {
        let pool = fixture_pool().await;
        sqlx::query("CREATE TABLE notes (body TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO notes (body) VALUES ('needle in a keyless table')")
            .execute(&pool)
            .await
            .unwrap();

        let results = engine(&pool).search("needle").await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].primary_key, "ID");
        assert!(results[0].primary_key_value.is_none());
        assert!(results[0].edit_url.is_none());
    }

    #[tokio::test]
    async fn test_empty_term_is_a_validation_error() {
        let pool = fixture_pool().await;
        let err = engine(&pool).search("   ").await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_page_size_bounds_per_column_results() {
        let pool = fixture_pool().await;
        for id in 1..=25 {
            insert_post(&pool, id, "needle everywhere", "post").await;
        }
        let results = engine(&pool).search("needle").await.unwrap();
        assert_eq!(results.len(), 10);
    }
}
