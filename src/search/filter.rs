//! Filters item and topic collections with a parsed query.
//!
//! A document matches when every filter token matches, every label token's
//! ids intersect the document labels, and at least one search token occurs in
//! one of its texts. Results keep input order and borrow from the input.

use super::keywords::{FilterToken, DO, DUE, HAS, IS, PRIO, USER_KEY};
use super::parser::QueryParser;
use crate::models::{ItemDoc, TopicDoc};

/// A document the query engine can match against.
pub trait Filterable {
    /// Texts searched by free-text tokens.
    fn search_texts(&self) -> Vec<&str>;

    fn label_ids(&self) -> &[String];

    fn matches_filter(&self, token: &FilterToken) -> bool;
}

fn has_responsible(responsibles: &[String], token: &FilterToken) -> bool {
    (!token.value.is_empty() && responsibles.contains(&token.value))
        || token.ids.iter().any(|id| responsibles.contains(id))
}

impl Filterable for ItemDoc {
    fn search_texts(&self) -> Vec<&str> {
        std::iter::once(self.subject.as_str())
            .chain(self.details.iter().map(|d| d.text.as_str()))
            .collect()
    }

    fn label_ids(&self) -> &[String] {
        &self.labels
    }

    fn matches_filter(&self, token: &FilterToken) -> bool {
        match token.key.as_str() {
            IS => match token.value.as_str() {
                "open" => self.is_action_item() && self.is_open(),
                "closed" => self.is_action_item() && !self.is_open(),
                "info" => !self.is_action_item(),
                "action" => self.is_action_item(),
                "new" => self.is_new,
                "sticky" => self.is_sticky(),
                _ => true,
            },
            PRIO => self.is_action_item() && self.priority_label() == token.value,
            DUE => {
                self.is_action_item()
                    && self
                        .duedate
                        .as_deref()
                        .is_some_and(|due| due.starts_with(&token.value))
            }
            USER_KEY => self.is_action_item() && has_responsible(&self.responsibles, token),
            DO => true,
            _ => true,
        }
    }
}

impl Filterable for TopicDoc {
    fn search_texts(&self) -> Vec<&str> {
        let mut texts = vec![self.subject.as_str()];
        for item in &self.info_items {
            texts.extend(item.search_texts());
        }
        texts
    }

    fn label_ids(&self) -> &[String] {
        &self.labels
    }

    fn matches_filter(&self, token: &FilterToken) -> bool {
        match token.key.as_str() {
            IS => match token.value.as_str() {
                "uncompleted" => self.is_open,
                "completed" => !self.is_open,
                "new" => self.is_new,
                _ => true,
            },
            HAS => match token.value.as_str() {
                "item" => !self.info_items.is_empty(),
                "action" => self.info_items.iter().any(ItemDoc::is_action_item),
                "info" => self.info_items.iter().any(|i| !i.is_action_item()),
                _ => true,
            },
            USER_KEY => has_responsible(&self.responsibles, token),
            _ => true,
        }
    }
}

/// Whether `doc` satisfies the parsed query.
pub fn matches<T: Filterable>(doc: &T, parser: &QueryParser<'_>) -> bool {
    if !parser
        .filter_tokens()
        .iter()
        .all(|token| doc.matches_filter(token))
    {
        return false;
    }

    let labels = doc.label_ids();
    if !parser
        .label_tokens()
        .iter()
        .all(|label| label.ids.iter().any(|id| labels.contains(id)))
    {
        return false;
    }

    matches_search_tokens(doc, parser.search_tokens(), parser.is_case_sensitive())
}

fn matches_search_tokens<T: Filterable>(doc: &T, tokens: &[String], case_sensitive: bool) -> bool {
    if tokens.is_empty() {
        return true;
    }

    let texts = doc.search_texts();
    if case_sensitive {
        return tokens
            .iter()
            .any(|token| texts.iter().any(|text| text.contains(token.as_str())));
    }

    let texts: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
    tokens.iter().any(|token| {
        let token = token.to_lowercase();
        texts.iter().any(|text| text.contains(&token))
    })
}

fn filter_documents<'d, T: Filterable>(docs: &'d [T], parser: &QueryParser<'_>) -> Vec<&'d T> {
    docs.iter().filter(|doc| matches(*doc, parser)).collect()
}

/// Filters info and action items.
#[derive(Debug, Default, Clone, Copy)]
pub struct ItemsFilter;

impl ItemsFilter {
    pub fn filter<'d>(&self, items: &'d [ItemDoc], parser: &QueryParser<'_>) -> Vec<&'d ItemDoc> {
        filter_documents(items, parser)
    }
}

/// Filters topics with the topic vocabulary.
#[derive(Debug, Default, Clone, Copy)]
pub struct TopicsFilter;

impl TopicsFilter {
    pub fn filter<'d>(&self, topics: &'d [TopicDoc], parser: &QueryParser<'_>) -> Vec<&'d TopicDoc> {
        filter_documents(topics, parser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Detail, ItemType};
    use crate::search::keywords::{ITEM_KEYWORDS, TOPIC_KEYWORDS};

    fn info(subject: &str) -> ItemDoc {
        ItemDoc::new(ItemType::InfoItem, subject)
    }

    fn action(subject: &str, open: bool) -> ItemDoc {
        let mut item = ItemDoc::new(ItemType::ActionItem, subject);
        item.is_open = Some(open);
        item.priority = Some(3);
        item.duedate = Some("2024-03-15".to_string());
        item
    }

    fn subjects<'a>(items: &[&'a ItemDoc]) -> Vec<&'a str> {
        items.iter().map(|i| i.subject.as_str()).collect()
    }

    fn item_parser(query: &str) -> QueryParser<'static> {
        let mut parser = QueryParser::new(&ITEM_KEYWORDS);
        parser.parse(query);
        parser
    }

    #[test]
    fn test_no_tokens_matches_everything() {
        let items = vec![info("a"), action("b", true)];
        let result = ItemsFilter.filter(&items, &item_parser(""));
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_state_keywords() {
        let items = vec![info("note"), action("todo", true), action("done", false)];

        assert_eq!(subjects(&ItemsFilter.filter(&items, &item_parser("is:open"))), ["todo"]);
        assert_eq!(subjects(&ItemsFilter.filter(&items, &item_parser("is:closed"))), ["done"]);
        assert_eq!(subjects(&ItemsFilter.filter(&items, &item_parser("is:info"))), ["note"]);
        assert_eq!(
            subjects(&ItemsFilter.filter(&items, &item_parser("is:action"))),
            ["todo", "done"]
        );
        assert_eq!(subjects(&ItemsFilter.filter(&items, &item_parser("is:sticky"))), ["todo"]);
        assert!(ItemsFilter
            .filter(&items, &item_parser("is:info is:action"))
            .is_empty());
    }

    #[test]
    fn test_prio_and_due() {
        let mut urgent = action("urgent", true);
        urgent.priority = Some(1);
        urgent.duedate = Some("2024-04-01".to_string());
        let items = vec![action("normal", true), urgent];

        assert_eq!(subjects(&ItemsFilter.filter(&items, &item_parser("prio:1"))), ["urgent"]);
        assert_eq!(subjects(&ItemsFilter.filter(&items, &item_parser("due:2024-03"))), ["normal"]);
        assert_eq!(ItemsFilter.filter(&items, &item_parser("due:2024")).len(), 2);
    }

    #[test]
    fn test_free_text_searches_subject_and_details() {
        let mut with_detail = info("Status");
        with_detail.details.push(Detail {
            id: "d1".to_string(),
            created_in_minute: None,
            date: "2024-01-01".to_string(),
            text: "Server migration planned".to_string(),
            is_new: true,
            is_edited_by: None,
            is_edited_date: None,
        });
        let items = vec![info("Budget review"), with_detail];

        assert_eq!(subjects(&ItemsFilter.filter(&items, &item_parser("MIGRATION"))), ["Status"]);
        assert_eq!(
            subjects(&ItemsFilter.filter(&items, &item_parser("budget migration"))),
            ["Budget review", "Status"]
        );
        assert!(ItemsFilter
            .filter(&items, &item_parser("MIGRATION do:match-case"))
            .is_empty());
    }

    #[test]
    fn test_label_tokens_require_resolved_ids() {
        let mut labeled = info("labeled");
        labeled.labels = vec!["l-1".to_string()];
        let items = vec![info("plain"), labeled];

        let mut parser = QueryParser::new(&ITEM_KEYWORDS).with_label_resolver(|name| {
            if name == "ops" {
                vec!["l-1".to_string()]
            } else {
                vec![]
            }
        });
        parser.parse("#ops");
        assert_eq!(subjects(&ItemsFilter.filter(&items, &parser)), ["labeled"]);

        parser.parse("#unknown");
        assert!(ItemsFilter.filter(&items, &parser).is_empty());
    }

    #[test]
    fn test_user_filter() {
        let mut mine = action("mine", true);
        mine.responsibles = vec!["u-me".to_string()];
        let mut external = action("external", true);
        external.responsibles = vec!["partner@example.com".to_string()];
        let items = vec![mine, external, action("nobody", true)];

        let mut parser = QueryParser::new(&ITEM_KEYWORDS).with_current_user("u-me");
        parser.parse("@me");
        assert_eq!(subjects(&ItemsFilter.filter(&items, &parser)), ["mine"]);

        parser.parse("@partner@example.com");
        assert_eq!(subjects(&ItemsFilter.filter(&items, &parser)), ["external"]);
    }

    #[test]
    fn test_filter_does_not_mutate_input() {
        let items = vec![action("b", true), info("a")];
        let before = items.clone();
        let _ = ItemsFilter.filter(&items, &item_parser("is:open a"));
        assert_eq!(items, before);
    }

    #[test]
    fn test_topics_filter() {
        let mut open_with_action = TopicDoc::new("Roadmap");
        open_with_action.info_items.push(action("Draft timeline", true));
        let mut closed = TopicDoc::new("Budget");
        closed.is_open = false;
        closed.is_new = false;
        closed.info_items.push(info("Approved"));
        let topics = vec![open_with_action, closed];

        let parse = |query: &str| {
            let mut parser = QueryParser::new(&TOPIC_KEYWORDS);
            parser.parse(query);
            parser
        };
        let names = |found: Vec<&TopicDoc>| -> Vec<String> {
            found.iter().map(|t| t.subject.clone()).collect()
        };

        assert_eq!(names(TopicsFilter.filter(&topics, &parse("is:uncompleted"))), ["Roadmap"]);
        assert_eq!(names(TopicsFilter.filter(&topics, &parse("is:completed"))), ["Budget"]);
        assert_eq!(names(TopicsFilter.filter(&topics, &parse("has:action"))), ["Roadmap"]);
        assert_eq!(names(TopicsFilter.filter(&topics, &parse("has:info"))), ["Budget"]);
        assert_eq!(names(TopicsFilter.filter(&topics, &parse("is:new"))), ["Roadmap"]);
        assert_eq!(names(TopicsFilter.filter(&topics, &parse("timeline"))), ["Roadmap"]);
        assert_eq!(TopicsFilter.filter(&topics, &parse("has:item")).len(), 2);
    }
}
