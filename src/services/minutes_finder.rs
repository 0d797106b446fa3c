//! Date-ordered lookups over the minutes of one series.

use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::Minutes;

/// Minutes of a series, oldest first.
#[derive(Debug, Clone, Default)]
pub struct MinutesFinder {
    minutes: Vec<Minutes>,
}

impl MinutesFinder {
    pub fn new(mut minutes: Vec<Minutes>) -> Self {
        minutes.sort_by(|a, b| a.date.cmp(&b.date).then(a.created_at.cmp(&b.created_at)));
        Self { minutes }
    }

    pub async fn load<S: DocumentStore>(store: &S, series_id: &str) -> Result<Self, AppError> {
        Ok(Self::new(store.list_minutes_of_series(series_id).await?))
    }

    pub fn is_empty(&self) -> bool {
        self.minutes.is_empty()
    }

    /// All minutes, newest first unless `last_first` is false, cut to `limit`.
    pub fn all_minutes_of_series(&self, limit: Option<usize>, last_first: bool) -> Vec<&Minutes> {
        let limit = limit.unwrap_or(usize::MAX);
        if last_first {
            self.minutes.iter().rev().take(limit).collect()
        } else {
            self.minutes.iter().take(limit).collect()
        }
    }

    pub fn first_minutes(&self) -> Option<&Minutes> {
        self.minutes.first()
    }

    pub fn last_minutes(&self) -> Option<&Minutes> {
        self.minutes.last()
    }

    pub fn second_last_minutes(&self) -> Option<&Minutes> {
        let len = self.minutes.len();
        if len < 2 {
            return None;
        }
        self.minutes.get(len - 2)
    }

    fn position(&self, minutes_id: &str) -> Option<usize> {
        self.minutes.iter().position(|m| m.id == minutes_id)
    }

    pub fn previous_minutes(&self, minutes_id: &str) -> Option<&Minutes> {
        let index = self.position(minutes_id)?;
        index.checked_sub(1).and_then(|i| self.minutes.get(i))
    }

    pub fn next_minutes(&self, minutes_id: &str) -> Option<&Minutes> {
        let index = self.position(minutes_id)?;
        self.minutes.get(index + 1)
    }

    /// Finalized minutes dated before the given minutes, oldest first.
    pub fn finalized_minutes_before(&self, minutes_id: &str) -> Vec<&Minutes> {
        let end = self.position(minutes_id).unwrap_or(self.minutes.len());
        self.minutes[..end].iter().filter(|m| m.is_finalized).collect()
    }

    /// Latest finalized minutes dated before the given minutes.
    pub fn last_finalized_before(&self, minutes_id: &str) -> Option<&Minutes> {
        self.finalized_minutes_before(minutes_id).last().copied()
    }

    /// Latest date among every minutes except the given one.
    pub fn latest_date_except(&self, minutes_id: &str) -> Option<&str> {
        self.minutes
            .iter()
            .filter(|m| m.id != minutes_id)
            .map(|m| m.date.as_str())
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finder() -> MinutesFinder {
        let mut second = Minutes::new("s1", "2024-02-01");
        second.id = "m2".to_string();
        second.is_finalized = true;
        let mut first = Minutes::new("s1", "2024-01-01");
        first.id = "m1".to_string();
        first.is_finalized = true;
        let mut third = Minutes::new("s1", "2024-03-01");
        third.id = "m3".to_string();
        MinutesFinder::new(vec![second, third, first])
    }

    fn ids(minutes: Vec<&Minutes>) -> Vec<&str> {
        minutes.into_iter().map(|m| m.id.as_str()).collect()
    }

    #[test]
    fn test_all_minutes_order_and_limit() {
        let finder = finder();
        assert_eq!(ids(finder.all_minutes_of_series(None, true)), ["m3", "m2", "m1"]);
        assert_eq!(ids(finder.all_minutes_of_series(Some(2), true)), ["m3", "m2"]);
        assert_eq!(ids(finder.all_minutes_of_series(Some(3), false)), ["m1", "m2", "m3"]);
    }

    #[test]
    fn test_first_last_and_neighbours() {
        let finder = finder();
        assert_eq!(finder.first_minutes().unwrap().id, "m1");
        assert_eq!(finder.last_minutes().unwrap().id, "m3");
        assert_eq!(finder.second_last_minutes().unwrap().id, "m2");
        assert_eq!(finder.previous_minutes("m2").unwrap().id, "m1");
        assert!(finder.previous_minutes("m1").is_none());
        assert_eq!(finder.next_minutes("m2").unwrap().id, "m3");
        assert!(finder.next_minutes("m3").is_none());
        assert!(finder.next_minutes("unknown").is_none());
    }

    #[test]
    fn test_empty_series() {
        let finder = MinutesFinder::default();
        assert!(finder.is_empty());
        assert!(finder.first_minutes().is_none());
        assert!(finder.last_minutes().is_none());
        assert!(finder.second_last_minutes().is_none());
    }

    #[test]
    fn test_finalized_before() {
        let finder = finder();
        assert_eq!(ids(finder.finalized_minutes_before("m3")), ["m1", "m2"]);
        assert_eq!(ids(finder.finalized_minutes_before("m2")), ["m1"]);
        assert_eq!(finder.last_finalized_before("m3").unwrap().id, "m2");
        assert_eq!(finder.latest_date_except("m3"), Some("2024-02-01"));
    }
}
