//! Reconciles minutes snapshots with the topic ledger of their series.
//!
//! Both directions are pure functions over loaded documents. The caller
//! persists the ledger and the minutes in one transaction.

use crate::aggregate::{Placement, SeriesLedger, TopicParent};
use crate::models::{Detail, ItemDoc, Minutes, TopicDoc};

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

fn find_prior_item<'a>(
    topic_id: &str,
    item_id: &str,
    ledger_topic: Option<&'a TopicDoc>,
    previous: Option<&'a Minutes>,
) -> Option<&'a ItemDoc> {
    ledger_topic
        .and_then(|t| t.find_item(item_id))
        .or_else(|| {
            previous
                .and_then(|m| m.find_topic(topic_id))
                .and_then(|t| t.find_item(item_id))
        })
}

/// Details written in these minutes take the id and lineage of the first
/// prior detail with the same text. Details carried from earlier minutes
/// keep theirs.
fn stamp_detail(detail: &mut Detail, prior: Option<&ItemDoc>, minutes_id: &str) {
    let written_here = detail
        .created_in_minute
        .as_deref()
        .map_or(true, |created| created == minutes_id);
    if written_here {
        if let Some(existing) = prior.and_then(|item| item.details.iter().find(|d| d.text == detail.text)) {
            detail.id = existing.id.clone();
            detail.created_in_minute = existing
                .created_in_minute
                .clone()
                .or_else(|| Some(minutes_id.to_string()));
            return;
        }
        detail.created_in_minute = Some(minutes_id.to_string());
    }
    if detail.id.is_empty() {
        detail.id = new_id();
    }
}

fn stamp_item(item: &mut ItemDoc, prior: Option<&ItemDoc>, minutes_id: &str) {
    if item.id.is_empty() {
        item.id = new_id();
    }
    if item.created_in_minute.is_none() {
        match prior {
            Some(existing) => {
                item.created_in_minute = existing
                    .created_in_minute
                    .clone()
                    .or_else(|| Some(minutes_id.to_string()));
                item.created_at = existing.created_at.or(item.created_at);
            }
            None => item.created_in_minute = Some(minutes_id.to_string()),
        }
    }
    for detail in &mut item.details {
        stamp_detail(detail, prior, minutes_id);
    }
}

/// Stamps missing lineage on a minutes topic. Sub-documents that already
/// existed in the ledger or in the previous minutes keep their lineage.
fn stamp_topic(
    topic: &mut TopicDoc,
    ledger_topic: Option<&TopicDoc>,
    previous: Option<&Minutes>,
    minutes_id: &str,
) {
    if topic.id.is_empty() {
        topic.id = new_id();
    }
    if topic.created_in_minute.is_none() {
        topic.created_in_minute = ledger_topic
            .and_then(|t| t.created_in_minute.clone())
            .or_else(|| Some(minutes_id.to_string()));
    }
    let topic_id = topic.id.clone();
    for item in &mut topic.info_items {
        let prior = find_prior_item(&topic_id, &item.id, ledger_topic, previous);
        stamp_item(item, prior, minutes_id);
    }
}

/// Merges the topics of the minutes being finalized into the ledger.
///
/// The minutes snapshot is stamped with lineage in place. Finally completed
/// topics leave the ledger; skipped topics keep their ledger sort order.
pub fn merge_topics_for_finalize(
    ledger: &mut SeriesLedger,
    minutes: &mut Minutes,
    previous: Option<&Minutes>,
) {
    let minutes_id = minutes.id.clone();

    for topic in &mut minutes.topics {
        let existing = ledger.find_topic(&topic.id).cloned();
        stamp_topic(topic, existing.as_ref(), previous, &minutes_id);

        if topic.is_finally_completed() {
            if ledger.remove(&topic.id).is_some() {
                tracing::debug!(topic_id = %topic.id, "Finally completed topic removed from ledger");
            }
            continue;
        }

        let mut merged = topic.clone();
        merged.tailor();
        merged.invalidate_is_new_flag();
        merged.is_edited_by = None;
        merged.is_edited_date = None;
        if topic.is_skipped {
            if let Some(existing) = &existing {
                merged.sort_order = existing.sort_order;
            }
        }
        ledger.upsert_topic(merged, Placement::Bottom);
    }
}

/// Rebuilds the ledger as it was before the latest finalize by replaying
/// every earlier finalized minutes, oldest first.
pub fn merge_topics_for_unfinalize(ledger: &mut SeriesLedger, earlier_finalized: &[Minutes]) {
    ledger.clear();
    let mut previous: Option<Minutes> = None;
    for minutes in earlier_finalized {
        let mut replayed = minutes.clone();
        merge_topics_for_finalize(ledger, &mut replayed, previous.as_ref());
        previous = Some(replayed);
    }
}
