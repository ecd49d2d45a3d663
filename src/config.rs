//! Application configuration module.
//!
//! Loaded from config.json next to the binary; a default file is written on
//! first run. The engine section is deliberately a plain value handed to each
//! engine at construction, so tests can vary deny-lists, batch sizes and
//! table conventions per case instead of fighting a global.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub engine: EngineConfig,
    /// Bearer token required by the HTTP layer for all engine operations.
    /// Generated on first run and logged once at startup.
    pub admin_token: String,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Target database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub data_dir: String,
    pub db_file: String,
}

/// Core engine knobs. Everything the search/replace/update engines branch on
/// lives here rather than in module-level constants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Column names never searched, regardless of table. Matches there are
    /// identifiers and routing noise, not content. Compared case-insensitively.
    pub excluded_columns: Vec<String>,
    /// Tables whose name starts with this prefix are never searched or
    /// replaced into; they are previous backups.
    pub backup_prefix: String,
    /// Rows fetched per page during mass replace.
    pub batch_size: u32,
    /// Row cap per column during search, to bound work on large tables.
    pub search_page_size: u32,
    /// Snippet truncation length in characters, before escaping.
    pub snippet_length: usize,
    /// Conventional primary-key name used when a table declares none.
    pub fallback_key: String,
    /// The canonical content table and its well-known columns.
    pub content_table: String,
    pub content_column: String,
    pub type_column: String,
    /// Content type targeted by mass replace.
    pub published_type: String,
    /// Content type excluded from search results as duplicate noise.
    pub revision_type: String,
    /// Content types that get an external editor link.
    pub linkable_types: Vec<String>,
    /// The metadata table and the column linking its rows back to content.
    pub meta_table: String,
    pub meta_link_column: String,
    /// External editor URL; `{id}` is replaced with the content identifier.
    pub editor_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            engine: EngineConfig::default(),
            admin_token: generate_admin_token(32),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8280,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".to_string(),
            db_file: "site.db".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            excluded_columns: [
                "url",
                "guid",
                "slug",
                "filename",
                "source_url",
                "post_name",
                "option_value",
                "package",
                "real_path",
                "path",
                "wordpress_path",
                "meta_value",
                "user_nicename",
                "username",
                "name",
                "layers",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            backup_prefix: "posts_backup".to_string(),
            batch_size: 100,
            search_page_size: 10,
            snippet_length: 150,
            fallback_key: "ID".to_string(),
            content_table: "posts".to_string(),
            content_column: "post_content".to_string(),
            type_column: "post_type".to_string(),
            published_type: "post".to_string(),
            revision_type: "revision".to_string(),
            linkable_types: ["post", "page", "elementor_library", "template"]
                .into_iter()
                .map(String::from)
                .collect(),
            meta_table: "postmeta".to_string(),
            meta_link_column: "post_id".to_string(),
            editor_url: "/wp-admin/post.php?post={id}&action=edit".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn is_excluded_column(&self, column: &str) -> bool {
        self.excluded_columns
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
    }

    pub fn is_backup_table(&self, table: &str) -> bool {
        table.starts_with(&self.backup_prefix)
    }

    pub fn edit_link_for(&self, id: &str) -> String {
        self.editor_url.replace("{id}", id)
    }
}

impl AppConfig {
    pub fn get_database_url(&self) -> String {
        let db_path = Path::new(&self.database.data_dir).join(&self.database.db_file);
        format!("sqlite:{}?mode=rwc", db_path.to_string_lossy())
    }

    pub fn get_data_dir(&self) -> PathBuf {
        PathBuf::from(&self.database.data_dir)
    }

    pub fn get_bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Generate the admin token on first run.
fn generate_admin_token(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZabcdefghjkmnpqrstuvwxyz23456789";
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

/// Load configuration from file, or create a default one if not present.
pub fn load_config() -> Result<AppConfig, String> {
    load_config_from(&get_config_path())
}

pub fn load_config_from(config_path: &Path) -> Result<AppConfig, String> {
    if config_path.exists() {
        let content = std::fs::read_to_string(config_path)
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let config: AppConfig = serde_json::from_str(&content)
            .map_err(|e| format!("Failed to parse config file: {}", e))?;

        tracing::info!("Loaded configuration from {:?}", config_path);
        Ok(config)
    } else {
        let config = AppConfig::default();
        save_config_to(&config, config_path)?;
        tracing::info!("Created default configuration at {:?}", config_path);
        Ok(config)
    }
}

/// Save configuration to file.
pub fn save_config_to(config: &AppConfig, config_path: &Path) -> Result<(), String> {
    let content = serde_json::to_string_pretty(config)
        .map_err(|e| format!("Failed to serialize config: {}", e))?;

    std::fs::write(config_path, content)
        .map_err(|e| format!("Failed to write config file: {}", e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excluded_column_is_case_insensitive() {
        let cfg = EngineConfig::default();
        assert!(cfg.is_excluded_column("guid"));
        assert!(cfg.is_excluded_column("GUID"));
        assert!(cfg.is_excluded_column("Meta_Value"));
        assert!(!cfg.is_excluded_column("post_content"));
    }

    #[test]
    fn test_backup_table_prefix() {
        let cfg = EngineConfig::default();
        assert!(cfg.is_backup_table("posts_backup_1700000000"));
        assert!(cfg.is_backup_table("posts_backup"));
        assert!(!cfg.is_backup_table("posts"));
        assert!(!cfg.is_backup_table("backup_posts"));
    }

    #[test]
    fn test_edit_link_template() {
        let cfg = EngineConfig::default();
        assert_eq!(
            cfg.edit_link_for("7"),
            "/wp-admin/post.php?post=7&action=edit"
        );
    }

    #[test]
    fn test_config_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let created = load_config_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(created.admin_token.len(), 32);

        // Second load reads the saved file instead of regenerating.
        let reloaded = load_config_from(&path).unwrap();
        assert_eq!(reloaded.admin_token, created.admin_token);
        assert_eq!(reloaded.engine.backup_prefix, "posts_backup");
    }
}
