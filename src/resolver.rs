//! Table classification.
//!
//! The search engine treats three kinds of tables differently: the canonical
//! content table (context label from its type column, editor links for known
//! content types, revision rows suppressed), the metadata table (editor link
//! through the owning content row), and everything else. That mapping lives
//! here instead of being scattered through the scan loop.

use crate::config::EngineConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRole {
    Content,
    Metadata,
    Generic,
}

pub struct TableResolver {
    cfg: EngineConfig,
}

impl TableResolver {
    pub fn new(cfg: EngineConfig) -> Self {
        Self { cfg }
    }

    pub fn resolve(&self, table: &str) -> TableRole {
        if table == self.cfg.content_table {
            TableRole::Content
        } else if table == self.cfg.meta_table {
            TableRole::Metadata
        } else {
            TableRole::Generic
        }
    }

    /// Human label shown in the result row. Content rows are labelled by
    /// their type value, everything else gets a generic label.
    pub fn context_label(&self, role: TableRole, type_value: Option<&str>) -> String {
        match role {
            TableRole::Content => human_case(type_value.unwrap_or("")),
            _ => "General Data".to_string(),
        }
    }

    /// An external editor link, when the row belongs to a recognized content
    /// type. Metadata rows link through the related content identifier, not
    /// their own key.
    pub fn edit_link(
        &self,
        role: TableRole,
        type_value: Option<&str>,
        primary_value: Option<&str>,
        linked_id: Option<&str>,
    ) -> Option<String> {
        match role {
            TableRole::Content => {
                let ty = type_value?;
                if self.cfg.linkable_types.iter().any(|t| t == ty) {
                    Some(self.cfg.edit_link_for(primary_value?))
                } else {
                    None
                }
            }
            TableRole::Metadata => Some(self.cfg.edit_link_for(linked_id?)),
            TableRole::Generic => None,
        }
    }
}

/// Uppercase the first letter, like the original's `ucfirst`.
fn human_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver() -> TableResolver {
        TableResolver::new(EngineConfig::default())
    }

    #[test]
    fn test_roles() {
        let r = resolver();
        assert_eq!(r.resolve("posts"), TableRole::Content);
        assert_eq!(r.resolve("postmeta"), TableRole::Metadata);
        assert_eq!(r.resolve("users"), TableRole::Generic);
        assert_eq!(r.resolve("posts_backup_1700000000"), TableRole::Generic);
    }

    #[test]
    fn test_context_labels() {
        let r = resolver();
        assert_eq!(r.context_label(TableRole::Content, Some("page")), "Page");
        assert_eq!(r.context_label(TableRole::Content, None), "");
        assert_eq!(r.context_label(TableRole::Generic, None), "General Data");
        assert_eq!(r.context_label(TableRole::Metadata, Some("x")), "General Data");
    }

    #[test]
    fn test_edit_links() {
        let r = resolver();
        assert_eq!(
            r.edit_link(TableRole::Content, Some("post"), Some("3"), None),
            Some("/wp-admin/post.php?post=3&action=edit".to_string())
        );
        // Unknown content types get no external link.
        assert_eq!(
            r.edit_link(TableRole::Content, Some("attachment"), Some("3"), None),
            None
        );
        // Metadata rows expose the owning content id, not their own key.
        assert_eq!(
            r.edit_link(TableRole::Metadata, None, Some("99"), Some("12")),
            Some("/wp-admin/post.php?post=12&action=edit".to_string())
        );
        assert_eq!(r.edit_link(TableRole::Generic, None, Some("1"), None), None);
    }
}
