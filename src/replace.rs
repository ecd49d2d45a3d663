//! Bulk substring replacement over the published content table.
//!
//! Every run snapshots the whole content table into a timestamped backup
//! table before touching a single row; the backup is the recovery mechanism,
//! not a rollback log. Batches commit individually, so a failure mid-run
//! leaves earlier batches applied. Offset pagination is best-effort under
//! concurrent writers: rows inserted or deleted during the run can be
//! skipped or visited twice.

use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::schema::{quote_ident, SchemaScanner};

#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub primary_key_value: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReplacementOutcome {
    /// Rows written back across all batches. Per-row failures are listed
    /// below but still counted here, matching the aggregate-only reporting
    /// this tool has always had.
    pub rows_updated: u64,
    pub backup_table: Option<String>,
    pub failures: Vec<RowFailure>,
}

pub struct MassReplaceEngine {
    scanner: SchemaScanner,
    cfg: EngineConfig,
    pool: SqlitePool,
}

impl MassReplaceEngine {
    pub fn new(pool: SqlitePool, cfg: EngineConfig) -> Self {
        Self {
            scanner: SchemaScanner::new(pool.clone()),
            cfg,
            pool,
        }
    }

    /// Replace `term` with `replacement` in the text field of every published
    /// content row. Not transactional across the table; see module docs.
    pub async fn mass_replace(
        &self,
        term: &str,
        replacement: &str,
        case_sensitive: bool,
    ) -> Result<ReplacementOutcome> {
        let term = term.trim();
        let replacement = replacement.trim();
        if term.is_empty() || replacement.is_empty() {
            return Err(EngineError::Validation(
                "both a search word and a replace word are required".into(),
            ));
        }

        let desc = self
            .scanner
            .describe_table(&self.cfg.content_table, &self.cfg.fallback_key)
            .await
            .ok_or_else(|| {
                EngineError::Validation(format!(
                    "content table {} not found",
                    self.cfg.content_table
                ))
            })?;

        // Snapshot first, unconditionally. If this fails nothing has been
        // mutated yet and the whole run aborts.
        let backup_table = format!("{}_{}", self.cfg.backup_prefix, Utc::now().timestamp());
        sqlx::query(&format!(
            "CREATE TABLE {} AS SELECT * FROM {}",
            quote_ident(&backup_table),
            quote_ident(&self.cfg.content_table),
        ))
        .execute(&self.pool)
        .await?;
        tracing::info!("Backup table created: {}", backup_table);

        let has_key = desc.columns.iter().any(|c| c.name == desc.primary_key);
        let pk_expr = if has_key {
            format!("CAST({} AS TEXT)", quote_ident(&desc.primary_key))
        } else {
            "NULL".to_string()
        };
        let select_sql = format!(
            "SELECT {pk}, CAST({content} AS TEXT) FROM {table} WHERE {ty} = ? LIMIT ? OFFSET ?",
            pk = pk_expr,
            content = quote_ident(&self.cfg.content_column),
            table = quote_ident(&self.cfg.content_table),
            ty = quote_ident(&self.cfg.type_column),
        );
        let update_sql = format!(
            "UPDATE {table} SET {content} = ? WHERE {pk} = ?",
            table = quote_ident(&self.cfg.content_table),
            content = quote_ident(&self.cfg.content_column),
            pk = quote_ident(&desc.primary_key),
        );

        let mut offset: i64 = 0;
        let mut rows_updated: u64 = 0;
        let mut failures = Vec::new();

        loop {
            let rows: Vec<(Option<String>, Option<String>)> = sqlx::query_as(&select_sql)
                .bind(&self.cfg.published_type)
                .bind(self.cfg.batch_size as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

            if rows.is_empty() {
                break;
            }

            for (pk_value, content) in &rows {
                let content = content.clone().unwrap_or_default();
                let rewritten = if case_sensitive {
                    content.replace(term, replacement)
                } else {
                    replace_case_insensitive(&content, term, replacement)
                };

                match pk_value {
                    Some(pk_value) => {
                        let result = sqlx::query(&update_sql)
                            .bind(&rewritten)
                            .bind(pk_value)
                            .execute(&self.pool)
                            .await;
                        if let Err(e) = result {
                            tracing::error!(
                                "Row update failed for {}={}: {}",
                                desc.primary_key,
                                pk_value,
                                e
                            );
                            failures.push(RowFailure {
                                primary_key_value: pk_value.clone(),
                                error: e.to_string(),
                            });
                        }
                    }
                    None => {
                        failures.push(RowFailure {
                            primary_key_value: String::new(),
                            error: "row has no primary key value".to_string(),
                        });
                    }
                }
                rows_updated += 1;
            }

            offset += self.cfg.batch_size as i64;
        }

        tracing::info!(
            "Mass replace finished: {} rows rewritten, {} failures, backup {}",
            rows_updated,
            failures.len(),
            backup_table
        );
        Ok(ReplacementOutcome {
            rows_updated,
            backup_table: Some(backup_table),
            failures,
        })
    }
}

/// Case-insensitive literal substring replacement. Characters are compared
/// through their full Unicode lowercase mapping, one haystack character per
/// needle character.
fn replace_case_insensitive(hay: &str, from: &str, to: &str) -> String {
    if from.is_empty() {
        return hay.to_string();
    }
    let mut out = String::with_capacity(hay.len());
    let mut rest = hay;
    while !rest.is_empty() {
        if let Some(matched) = ci_prefix_len(rest, from) {
            out.push_str(to);
            rest = &rest[matched..];
        } else {
            let ch = rest.chars().next().expect("rest is non-empty");
            out.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }
    out
}

/// Byte length of a leading case-insensitive match of `needle` in `hay`.
fn ci_prefix_len(hay: &str, needle: &str) -> Option<usize> {
    let mut consumed = 0;
    let mut hay_chars = hay.chars();
    for nc in needle.chars() {
        let hc = hay_chars.next()?;
        if !hc.to_lowercase().eq(nc.to_lowercase()) {
            return None;
        }
        consumed += hc.len_utf8();
    }
    Some(consumed)
}
