//! Query parser for the item and topic search.
//!
//! A query is split on whitespace and every token becomes a filter token
//! (`key:value` or `@user`), part of a label (`#name`, possibly spanning
//! several words) or a free-text search token.

use serde::Serialize;

use super::keywords::{FilterToken, KeywordSet, DO, MATCH_CASE, USER_KEY};

/// Resolves a label or user name to matching ids.
pub type IdResolver<'a> = Box<dyn Fn(&str) -> Vec<String> + Send + Sync + 'a>;

const LABEL_PREFIX: char = '#';
const CURRENT_USER_ALIAS: &str = "me";

/// A label reference with the ids it resolved to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelToken {
    pub token: String,
    pub ids: Vec<String>,
}

pub struct QueryParser<'a> {
    keywords: &'static KeywordSet,
    label_resolver: Option<IdResolver<'a>>,
    user_resolver: Option<IdResolver<'a>>,
    current_user_id: Option<String>,
    search_tokens: Vec<String>,
    filter_tokens: Vec<FilterToken>,
    label_tokens: Vec<LabelToken>,
    case_sensitive: bool,
    in_label: bool,
}

impl<'a> QueryParser<'a> {
    pub fn new(keywords: &'static KeywordSet) -> Self {
        Self {
            keywords,
            label_resolver: None,
            user_resolver: None,
            current_user_id: None,
            search_tokens: Vec::new(),
            filter_tokens: Vec::new(),
            label_tokens: Vec::new(),
            case_sensitive: false,
            in_label: false,
        }
    }

    pub fn with_label_resolver(
        mut self,
        resolver: impl Fn(&str) -> Vec<String> + Send + Sync + 'a,
    ) -> Self {
        self.label_resolver = Some(Box::new(resolver));
        self
    }

    pub fn with_user_resolver(
        mut self,
        resolver: impl Fn(&str) -> Vec<String> + Send + Sync + 'a,
    ) -> Self {
        self.user_resolver = Some(Box::new(resolver));
        self
    }

    /// Id that `@me` stands for.
    pub fn with_current_user(mut self, user_id: impl Into<String>) -> Self {
        self.current_user_id = Some(user_id.into());
        self
    }

    pub fn reset(&mut self) {
        self.search_tokens.clear();
        self.filter_tokens.clear();
        self.label_tokens.clear();
        self.case_sensitive = false;
        self.in_label = false;
    }

    /// Parses `query`, replacing the result of any earlier call.
    pub fn parse(&mut self, query: &str) {
        self.reset();
        for token in query.split_whitespace() {
            self.consume(token);
        }
        self.in_label = false;
    }

    fn consume(&mut self, token: &str) {
        if self.keywords.is_keyword(token) {
            self.in_label = false;
            self.add_filter_token(token);
        } else if let Some(name) = token.strip_prefix(LABEL_PREFIX) {
            self.start_label(name);
        } else if self.in_label {
            self.extend_label(token);
        } else {
            self.search_tokens.push(token.to_string());
        }
    }

    fn add_filter_token(&mut self, token: &str) {
        let Some(mut filter) = self.keywords.keyword_from_token(token) else {
            return;
        };

        if filter.key == USER_KEY {
            if filter.value == CURRENT_USER_ALIAS {
                filter.value = String::new();
                filter.ids = self.current_user_id.iter().cloned().collect();
            } else if let Some(resolve) = &self.user_resolver {
                filter.ids = resolve(&filter.value);
            }
        } else if filter.key == DO && filter.value == MATCH_CASE {
            self.case_sensitive = true;
        }

        self.filter_tokens.push(filter);
    }

    fn start_label(&mut self, name: &str) {
        let ids = self.resolve_label(name);
        self.label_tokens.push(LabelToken {
            token: name.to_string(),
            ids,
        });
        self.in_label = true;
    }

    /// Appends `word` to the open label. With a resolver the label only grows
    /// while the longer name still resolves; otherwise the label is closed
    /// and `word` becomes a search token.
    fn extend_label(&mut self, word: &str) {
        let Some(current) = self.label_tokens.last() else {
            self.in_label = false;
            self.search_tokens.push(word.to_string());
            return;
        };

        let extended = if current.token.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current.token, word)
        };

        let ids = match &self.label_resolver {
            Some(resolve) => {
                let ids = resolve(&extended);
                if ids.is_empty() {
                    self.in_label = false;
                    self.search_tokens.push(word.to_string());
                    return;
                }
                ids
            }
            None => Vec::new(),
        };

        if let Some(label) = self.label_tokens.last_mut() {
            label.token = extended;
            label.ids = ids;
        }
    }

    fn resolve_label(&self, name: &str) -> Vec<String> {
        self.label_resolver
            .as_ref()
            .map(|resolve| resolve(name))
            .unwrap_or_default()
    }

    pub fn search_tokens(&self) -> &[String] {
        &self.search_tokens
    }

    pub fn filter_tokens(&self) -> &[FilterToken] {
        &self.filter_tokens
    }

    pub fn label_tokens(&self) -> &[LabelToken] {
        &self.label_tokens
    }

    /// Whether a filter token with the given key (case-insensitive) and value
    /// was parsed.
    pub fn has_keyword(&self, key: &str, value: &str) -> bool {
        self.filter_tokens
            .iter()
            .any(|token| token.key.eq_ignore_ascii_case(key) && token.value == value)
    }

    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn keywords(&self) -> &'static KeywordSet {
        self.keywords
    }
}

impl std::fmt::Debug for QueryParser<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryParser")
            .field("search_tokens", &self.search_tokens)
            .field("filter_tokens", &self.filter_tokens)
            .field("label_tokens", &self.label_tokens)
            .field("case_sensitive", &self.case_sensitive)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::keywords::{ITEM_KEYWORDS, TOPIC_KEYWORDS};

    fn labels(parser: &QueryParser) -> Vec<String> {
        parser
            .label_tokens()
            .iter()
            .map(|t| t.token.clone())
            .collect()
    }

    #[test]
    fn test_only_search_tokens() {
        let mut parser = QueryParser::new(&ITEM_KEYWORDS);
        parser.parse("hello world");

        assert!(parser.filter_tokens().is_empty());
        assert!(parser.label_tokens().is_empty());
        assert_eq!(parser.search_tokens(), ["hello", "world"]);
    }

    #[test]
    fn test_only_label_tokens() {
        let mut parser = QueryParser::new(&ITEM_KEYWORDS);
        parser.parse("#label 1 #label zwo");

        assert!(parser.filter_tokens().is_empty());
        assert!(parser.search_tokens().is_empty());
        assert_eq!(labels(&parser), ["label 1", "label zwo"]);
    }

    #[test]
    fn test_mixed_query() {
        let mut parser = QueryParser::new(&ITEM_KEYWORDS);
        parser.parse("hello is:open world #my label");

        assert_eq!(parser.search_tokens(), ["hello", "world"]);
        assert_eq!(
            parser.filter_tokens(),
            [FilterToken {
                key: "is".to_string(),
                value: "open".to_string(),
                ids: vec![],
            }]
        );
        assert_eq!(labels(&parser), ["my label"]);
        assert!(parser.has_keyword("is", "open"));
        assert!(parser.has_keyword("IS", "open"));
        assert!(!parser.has_keyword("is", "closed"));
    }

    #[test]
    fn test_keyword_ends_label() {
        let mut parser = QueryParser::new(&ITEM_KEYWORDS);
        parser.parse("#team meeting is:action notes");

        assert_eq!(labels(&parser), ["team meeting"]);
        assert_eq!(parser.search_tokens(), ["notes"]);
    }

    #[test]
    fn test_due_keyword() {
        let mut parser = QueryParser::new(&ITEM_KEYWORDS);
        parser.parse("hello due:2017 world");

        assert_eq!(parser.filter_tokens().len(), 1);
        assert_eq!(parser.filter_tokens()[0].key, "due");
        assert_eq!(parser.filter_tokens()[0].value, "2017");
    }

    #[test]
    fn test_label_resolver_limits_label_extension() {
        let mut parser = QueryParser::new(&ITEM_KEYWORDS).with_label_resolver(|name| {
            if name.split_whitespace().count() > 2 {
                return vec![];
            }
            vec![format!("{}-{}", name, name.len())]
        });
        parser.parse("#my label hello world");

        assert!(parser.filter_tokens().is_empty());
        assert_eq!(
            parser.label_tokens(),
            [LabelToken {
                token: "my label".to_string(),
                ids: vec!["my label-8".to_string()],
            }]
        );
        assert_eq!(parser.search_tokens(), ["hello", "world"]);
    }

    #[test]
    fn test_user_tokens() {
        let mut parser = QueryParser::new(&ITEM_KEYWORDS)
            .with_user_resolver(|name| match name {
                "jdoe" => vec!["u-jdoe".to_string()],
                _ => vec![],
            })
            .with_current_user("u-me");
        parser.parse("@jdoe @me @nobody");

        let tokens = parser.filter_tokens();
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].ids, ["u-jdoe"]);
        assert_eq!(tokens[1].value, "");
        assert_eq!(tokens[1].ids, ["u-me"]);
        assert_eq!(tokens[2].value, "nobody");
        assert!(tokens[2].ids.is_empty());
    }

    #[test]
    fn test_match_case_and_reset() {
        let mut parser = QueryParser::new(&TOPIC_KEYWORDS);
        parser.parse("Budget do:match-case");
        assert!(parser.is_case_sensitive());

        parser.parse("budget");
        assert!(!parser.is_case_sensitive());
        assert_eq!(parser.search_tokens(), ["budget"]);
        assert!(parser.filter_tokens().is_empty());

        parser.reset();
        assert!(parser.search_tokens().is_empty());
    }

    #[test]
    fn test_unknown_keyword_is_free_text() {
        let mut parser = QueryParser::new(&TOPIC_KEYWORDS);
        parser.parse("is:sticky prio:1");
        assert!(parser.filter_tokens().is_empty());
        assert_eq!(parser.search_tokens(), ["is:sticky", "prio:1"]);
    }
}
