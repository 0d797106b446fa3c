//! Filter keyword vocabularies for items and topics.

use serde::Serialize;

/// Key of the user filter (`@name`).
pub const USER_KEY: &str = "@";

/// Values accepted for a keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedValues {
    Any,
    OneOf(&'static [&'static str]),
}

impl AllowedValues {
    pub fn accepts(&self, value: &str) -> bool {
        match self {
            AllowedValues::Any => true,
            AllowedValues::OneOf(values) => values.contains(&value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordDef {
    pub key: &'static str,
    pub values: AllowedValues,
    pub format: &'static str,
    pub description: &'static str,
}

/// A parsed `key:value` or `@user` token with resolved ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterToken {
    pub key: String,
    pub value: String,
    pub ids: Vec<String>,
}

/// A keyword vocabulary.
#[derive(Debug)]
pub struct KeywordSet {
    pub keywords: &'static [KeywordDef],
    pub user: Option<KeywordDef>,
}

pub const IS: &str = "is";
pub const HAS: &str = "has";
pub const DO: &str = "do";
pub const PRIO: &str = "prio";
pub const DUE: &str = "due";

pub const MATCH_CASE: &str = "match-case";

const USER_DEF: KeywordDef = KeywordDef {
    key: USER_KEY,
    values: AllowedValues::Any,
    format: "@<username>",
    description: "Shows only elements the given user is responsible for",
};

const DO_DEF: KeywordDef = KeywordDef {
    key: DO,
    values: AllowedValues::OneOf(&[MATCH_CASE]),
    format: "do:match-case",
    description: "Makes the free-text search case sensitive",
};

pub static ITEM_KEYWORDS: KeywordSet = KeywordSet {
    keywords: &[
        KeywordDef {
            key: IS,
            values: AllowedValues::OneOf(&["open", "closed", "info", "action", "new", "sticky"]),
            format: "is:<open|closed|info|action|new|sticky>",
            description: "Filters items by state or type",
        },
        DO_DEF,
        KeywordDef {
            key: PRIO,
            values: AllowedValues::Any,
            format: "prio:<1-5>",
            description: "Shows only action items with the given priority",
        },
        KeywordDef {
            key: DUE,
            values: AllowedValues::Any,
            format: "due:<YYYY-MM-DD prefix>",
            description: "Shows only action items due on the given date prefix",
        },
    ],
    user: Some(USER_DEF),
};

pub static TOPIC_KEYWORDS: KeywordSet = KeywordSet {
    keywords: &[
        KeywordDef {
            key: IS,
            values: AllowedValues::OneOf(&["uncompleted", "completed", "new"]),
            format: "is:<uncompleted|completed|new>",
            description: "Filters topics by state",
        },
        KeywordDef {
            key: HAS,
            values: AllowedValues::OneOf(&["item", "action", "info"]),
            format: "has:<item|action|info>",
            description: "Shows only topics containing the given kind of item",
        },
        DO_DEF,
    ],
    user: Some(USER_DEF),
};

impl KeywordSet {
    /// Keyword definition by case-insensitive key.
    pub fn find(&self, key: &str) -> Option<&KeywordDef> {
        if key == USER_KEY {
            return self.user.as_ref();
        }
        self.keywords
            .iter()
            .find(|def| def.key.eq_ignore_ascii_case(key))
    }

    pub fn is_allowed_value_for_key(&self, key: &str, value: &str) -> bool {
        self.find(key)
            .map(|def| def.values.accepts(value))
            .unwrap_or(false)
    }

    /// `@name`, or `key:value` with a known key and an accepted value.
    pub fn is_keyword(&self, token: &str) -> bool {
        if self.user.is_some() && token.starts_with(USER_KEY) {
            return true;
        }
        let parts: Vec<&str> = token.split(':').collect();
        parts.len() == 2 && self.is_allowed_value_for_key(parts[0], parts[1])
    }

    /// Splits a keyword token into key and value. The key is normalized to
    /// its vocabulary spelling; ids are resolved by the parser.
    pub fn keyword_from_token(&self, token: &str) -> Option<FilterToken> {
        if !self.is_keyword(token) {
            return None;
        }
        if let Some(name) = token.strip_prefix(USER_KEY) {
            return Some(FilterToken {
                key: USER_KEY.to_string(),
                value: name.to_string(),
                ids: Vec::new(),
            });
        }
        let (key, value) = token.split_once(':')?;
        let key = self.find(key).map(|def| def.key).unwrap_or(key);
        Some(FilterToken {
            key: key.to_string(),
            value: value.to_string(),
            ids: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_keywords() {
        assert!(ITEM_KEYWORDS.is_keyword("is:open"));
        assert!(ITEM_KEYWORDS.is_keyword("IS:sticky"));
        assert!(ITEM_KEYWORDS.is_keyword("prio:2"));
        assert!(ITEM_KEYWORDS.is_keyword("due:2024-03"));
        assert!(ITEM_KEYWORDS.is_keyword("do:match-case"));
        assert!(ITEM_KEYWORDS.is_keyword("@jdoe"));

        assert!(!ITEM_KEYWORDS.is_keyword("is:uncompleted"));
        assert!(!ITEM_KEYWORDS.is_keyword("is:Open"));
        assert!(!ITEM_KEYWORDS.is_keyword("has:item"));
        assert!(!ITEM_KEYWORDS.is_keyword("foo:bar"));
        assert!(!ITEM_KEYWORDS.is_keyword("is:open:now"));
        assert!(!ITEM_KEYWORDS.is_keyword("hello"));
    }

    #[test]
    fn test_topic_keywords() {
        assert!(TOPIC_KEYWORDS.is_keyword("is:uncompleted"));
        assert!(TOPIC_KEYWORDS.is_keyword("has:action"));
        assert!(TOPIC_KEYWORDS.is_keyword("@me"));
        assert!(!TOPIC_KEYWORDS.is_keyword("is:sticky"));
        assert!(!TOPIC_KEYWORDS.is_keyword("prio:1"));
    }

    #[test]
    fn test_keyword_from_token_normalizes_key() {
        let token = ITEM_KEYWORDS.keyword_from_token("Is:open").unwrap();
        assert_eq!(token.key, "is");
        assert_eq!(token.value, "open");
        assert!(token.ids.is_empty());

        let user = ITEM_KEYWORDS.keyword_from_token("@jdoe").unwrap();
        assert_eq!(user.key, USER_KEY);
        assert_eq!(user.value, "jdoe");

        assert!(ITEM_KEYWORDS.keyword_from_token("plain").is_none());
    }
}
