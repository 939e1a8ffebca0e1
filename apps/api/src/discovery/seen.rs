use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError};

/// URLs already surfaced per session. Grows for the life of the process;
/// sessions are never evicted.
#[derive(Debug, Default)]
pub struct SessionSeenStore {
    sessions: Mutex<HashMap<String, HashSet<String>>>,
}

impl SessionSeenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot copy of the session's seen set. Later marks do not affect it.
    pub fn seen(&self, session_id: &str) -> HashSet<String> {
        let sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.get(session_id).cloned().unwrap_or_default()
    }

    /// Marks `urls` as seen and returns the ones that were not already marked.
    /// Check and insert happen under one lock, so two concurrent calls for the
    /// same session never both claim a URL.
    pub fn mark_seen<I, S>(&self, session_id: &str, urls: I) -> HashSet<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        let seen = sessions.entry(session_id.to_string()).or_default();
        urls.into_iter()
            .map(Into::into)
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    #[cfg(test)]
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_session_is_empty() {
        let store = SessionSeenStore::new();
        assert!(store.seen("s1").is_empty());
        assert_eq!(store.session_count(), 0);
    }

    #[test]
    fn test_mark_then_seen() {
        let store = SessionSeenStore::new();
        store.mark_seen("s1", ["https://a.com/1", "https://a.com/2"]);
        let fresh = store.mark_seen("s1", ["https://a.com/2", "https://a.com/3"]);
        assert_eq!(fresh, HashSet::from(["https://a.com/3".to_string()]));
        assert_eq!(store.seen("s1").len(), 3);
    }

    #[test]
    fn test_concurrent_marks_claim_each_url_once() {
        let store = std::sync::Arc::new(SessionSeenStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.mark_seen("s1", ["https://a.com/1"]).len())
            })
            .collect();
        let claimed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(claimed, 1);
    }

    #[test]
    fn test_sessions_isolated() {
        let store = SessionSeenStore::new();
        store.mark_seen("s1", ["https://a.com/1"]);
        assert!(store.seen("s2").is_empty());
    }

    #[test]
    fn test_snapshot_not_live() {
        let store = SessionSeenStore::new();
        store.mark_seen("s1", ["https://a.com/1"]);
        let snapshot = store.seen("s1");
        store.mark_seen("s1", ["https://a.com/2"]);
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.seen("s1").len(), 2);
    }
}
