//! Recently edited pages.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

/// Collaborator told about every successful save.
pub trait RecentPages: Send + Sync {
    /// Record that `title` was saved. `old_title` is its title before this
    /// save, equal to `title` unless the page was renamed.
    fn record(&self, old_title: &str, title: &str);
}

/// In-memory most-recent-first list of page titles.
///
/// Holds at most `limit` titles. Saving a page moves it to the front; a
/// rename also drops the old title.
#[derive(Debug)]
pub struct RecentList {
    limit: usize,
    titles: Mutex<VecDeque<String>>,
}

impl RecentList {
    /// Create an empty list holding at most `limit` titles.
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            titles: Mutex::new(VecDeque::with_capacity(limit)),
        }
    }

    /// Titles, most recent first.
    #[must_use]
    pub fn titles(&self) -> Vec<String> {
        self.titles
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }
}

impl RecentPages for RecentList {
    fn record(&self, old_title: &str, title: &str) {
        let title = title.trim();
        if title.is_empty() || self.limit == 0 {
            return;
        }

        let mut titles = self.titles.lock().unwrap_or_else(PoisonError::into_inner);
        titles.retain(|existing| existing != title && existing != old_title.trim());
        titles.push_front(title.to_owned());
        titles.truncate(self.limit);
    }
}
