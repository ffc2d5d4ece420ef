//! First-match evaluation over an ordered list.
//!
//! The statement variant fallback, the rubric threshold scan and the rating
//! label scan all walk a fixed list in order and stop at the first entry
//! that applies. They share this helper so the scan order lives in one place.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ordered<T> {
    items: Vec<T>,
}

impl<T> Ordered<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    /// Build from items, sorted by `key` (ascending unless `descending`).
    /// The sort is stable so entries with equal keys keep their given order.
    pub fn sorted_by_key(mut items: Vec<T>, descending: bool, key: impl Fn(&T) -> f64) -> Self {
        items.sort_by(|a, b| {
            let ord = key(a).total_cmp(&key(b));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
        Self { items }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.last()
    }

    /// First item satisfying `pred`.
    pub fn first_match(&self, mut pred: impl FnMut(&T) -> bool) -> Option<&T> {
        self.items.iter().find(|item| pred(item))
    }

    /// First `Some` produced by `f`, in list order.
    pub fn first_map<R>(&self, f: impl FnMut(&T) -> Option<R>) -> Option<R> {
        self.items.iter().find_map(f)
    }

    /// Like [`Ordered::first_map`] but stops at the first error.
    pub fn try_first_map<R, E>(
        &self,
        mut f: impl FnMut(&T) -> Result<Option<R>, E>,
    ) -> Result<Option<R>, E> {
        for item in &self.items {
            if let Some(found) = f(item)? {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }
}

impl<T> From<Vec<T>> for Ordered<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_match_respects_order() {
        let rules = Ordered::new(vec![(3.0, "c"), (2.0, "b"), (1.0, "a")]);
        let hit = rules.first_match(|(t, _)| 2.5 > *t).unwrap();
        assert_eq!(hit.1, "b");
        assert!(rules.first_match(|(t, _)| 0.5 > *t).is_none());
    }

    #[test]
    fn test_sorted_by_key() {
        let rules = Ordered::sorted_by_key(vec![1.0, 3.0, 2.0], true, |x| *x);
        assert_eq!(rules.items(), &[3.0, 2.0, 1.0]);
        let rules = Ordered::sorted_by_key(vec![f64::INFINITY, 0.4, 0.8], false, |x| *x);
        assert_eq!(rules.items(), &[0.4, 0.8, f64::INFINITY]);
    }

    #[test]
    fn test_try_first_map_stops_on_error() {
        let rules = Ordered::new(vec![1, 2, 3]);
        let mut seen = Vec::new();
        let out: Result<Option<i32>, String> = rules.try_first_map(|x| {
            seen.push(*x);
            if *x == 2 {
                Err("boom".to_string())
            } else {
                Ok(None)
            }
        });
        assert!(out.is_err());
        assert_eq!(seen, vec![1, 2]);

        let found: Result<Option<i32>, String> =
            rules.try_first_map(|x| Ok((*x > 1).then_some(*x * 10)));
        assert_eq!(found.unwrap(), Some(20));
    }
}
