//! Search query language over items and topics.
//!
//! Parsing and filtering are synchronous and pure. Name lookups against the
//! store happen up front by loading a [`ResolverSnapshot`].

pub mod filter;
pub mod keywords;
pub mod parser;

pub use filter::{ItemsFilter, TopicsFilter};
pub use keywords::{FilterToken, KeywordSet, ITEM_KEYWORDS, TOPIC_KEYWORDS};
pub use parser::{LabelToken, QueryParser};

use crate::db::UserDirectory;
use crate::errors::AppError;
use crate::models::{Label, User};

/// Labels and users preloaded for resolving `#label` and `@user` tokens.
#[derive(Debug, Clone, Default)]
pub struct ResolverSnapshot {
    labels: Vec<Label>,
    users: Vec<User>,
}

impl ResolverSnapshot {
    pub fn new(labels: Vec<Label>, users: Vec<User>) -> Self {
        Self { labels, users }
    }

    pub async fn load<D: UserDirectory>(directory: &D, labels: Vec<Label>) -> Result<Self, AppError> {
        let users = directory.list_users().await?;
        Ok(Self::new(labels, users))
    }

    /// Ids of labels whose name contains `name`, ignoring case.
    pub fn label_ids(&self, name: &str) -> Vec<String> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.labels
            .iter()
            .filter(|label| label.name.to_lowercase().contains(&needle))
            .map(|label| label.id.clone())
            .collect()
    }

    /// Ids of users with exactly this username, ignoring case.
    pub fn user_ids(&self, username: &str) -> Vec<String> {
        self.users
            .iter()
            .filter(|user| user.username.eq_ignore_ascii_case(username))
            .map(|user| user.id.clone())
            .collect()
    }

    /// A parser wired to this snapshot.
    pub fn parser(&self, keywords: &'static KeywordSet, current_user_id: &str) -> QueryParser<'_> {
        QueryParser::new(keywords)
            .with_label_resolver(move |name| self.label_ids(name))
            .with_user_resolver(move |name| self.user_ids(name))
            .with_current_user(current_user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DEFAULT_LABEL_COLOR;

    fn snapshot() -> ResolverSnapshot {
        let label = |id: &str, name: &str| Label {
            id: id.to_string(),
            name: name.to_string(),
            color: DEFAULT_LABEL_COLOR.to_string(),
            is_disabled: false,
            is_default_label: false,
        };
        let user = |id: &str, username: &str| User {
            id: id.to_string(),
            username: username.to_string(),
            profile_name: None,
            email: None,
        };
        ResolverSnapshot::new(
            vec![label("l1", "Team Meeting"), label("l2", "Decision")],
            vec![user("u1", "jdoe"), user("u2", "asmith")],
        )
    }

    #[test]
    fn test_label_and_user_lookup() {
        let snapshot = snapshot();
        assert_eq!(snapshot.label_ids("team"), ["l1"]);
        assert_eq!(snapshot.label_ids("team meeting"), ["l1"]);
        assert!(snapshot.label_ids("team minutes").is_empty());
        assert!(snapshot.label_ids("").is_empty());
        assert!(snapshot.label_ids("  ").is_empty());
        assert_eq!(snapshot.user_ids("JDoe"), ["u1"]);
        assert!(snapshot.user_ids("jd").is_empty());
    }

    #[test]
    fn test_parser_from_snapshot() {
        let snapshot = snapshot();
        let mut parser = snapshot.parser(&ITEM_KEYWORDS, "u2");
        parser.parse("#team meeting notes @jdoe @me");

        assert_eq!(parser.label_tokens()[0].token, "team meeting");
        assert_eq!(parser.label_tokens()[0].ids, ["l1"]);
        assert_eq!(parser.search_tokens(), ["notes"]);
        assert_eq!(parser.filter_tokens()[0].ids, ["u1"]);
        assert_eq!(parser.filter_tokens()[1].ids, ["u2"]);
    }

    #[test]
    fn test_bare_label_prefix_resolves_to_nothing() {
        let snapshot = snapshot();
        let mut parser = snapshot.parser(&ITEM_KEYWORDS, "u1");
        parser.parse("#");
        assert_eq!(parser.label_tokens().len(), 1);
        assert!(parser.label_tokens()[0].ids.is_empty());

        let mut item = crate::models::ItemDoc::new(crate::models::ItemType::InfoItem, "labeled");
        item.labels = vec!["l1".to_string()];
        assert!(!filter::matches(&item, &parser));
    }
}
