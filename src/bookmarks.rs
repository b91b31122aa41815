use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    RwLock,
};

use crate::{
    app::errors::{AppError, AppResult},
    config::UrlPolicy,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub url: String,
    pub user: String,
    pub created_at: DateTime<Utc>,

    /// Insertion order; breaks ties between equal timestamps
    #[serde(skip)]
    seq: u64,
}

pub trait BookmarkLog: Send + Sync {
    fn add(&self, url: &str) -> AppResult<Bookmark>;
    /// At most `n` entries, newest first.
    fn recent(&self, n: usize) -> Vec<Bookmark>;
}

/// Append-only bookmark list that lives as long as the process.
#[derive(Debug)]
pub struct MemoryBookmarkLog {
    list: RwLock<Vec<Bookmark>>,
    next_seq: AtomicU64,
    user: String,
    policy: UrlPolicy,
}

impl MemoryBookmarkLog {
    pub fn new(user: impl Into<String>, policy: UrlPolicy) -> Self {
        Self {
            list: RwLock::new(vec![]),
            next_seq: AtomicU64::new(0),
            user: user.into(),
            policy,
        }
    }

    fn check(&self, url: &str) -> AppResult<()> {
        if url.trim().is_empty() {
            return Err(AppError::Validation("url must not be empty".to_string()));
        }

        if self.policy == UrlPolicy::Validate {
            let parsed = url::Url::parse(url)
                .map_err(|err| AppError::Validation(format!("{url:?} is not a valid url: {err}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(AppError::Validation(format!(
                    "{url:?} is not an http(s) url"
                )));
            }
        }

        Ok(())
    }
}

impl BookmarkLog for MemoryBookmarkLog {
    fn add(&self, url: &str) -> AppResult<Bookmark> {
        self.check(url)?;

        let mut list = self
            .list
            .write()
            .map_err(|_| anyhow::anyhow!("bookmark list lock is poisoned"))?;

        let bmark = Bookmark {
            url: url.to_string(),
            user: self.user.clone(),
            created_at: Utc::now(),
            seq: self.next_seq.fetch_add(1, Ordering::SeqCst),
        };
        list.push(bmark.clone());

        log::info!("stored bookmark {url:?}");
        Ok(bmark)
    }

    fn recent(&self, n: usize) -> Vec<Bookmark> {
        let list = match self.list.read() {
            Ok(list) => list,
            Err(poisoned) => poisoned.into_inner(),
        };

        let mut bmarks = list.clone();
        drop(list);

        bmarks.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        bmarks.truncate(n);
        bmarks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    impl MemoryBookmarkLog {
        fn len(&self) -> usize {
            self.list.read().unwrap().len()
        }
    }

    fn log() -> MemoryBookmarkLog {
        MemoryBookmarkLog::new("TEDster", UrlPolicy::Verbatim)
    }

    #[test]
    fn recent_returns_newest_first() {
        let bmarks = log();
        bmarks.add("http://x").unwrap();
        bmarks.add("http://y").unwrap();

        let recent = bmarks.recent(1);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].url, "http://y");
        assert_eq!(recent[0].user, "TEDster");

        let all = bmarks.recent(10);
        let urls: Vec<_> = all.iter().map(|b| b.url.as_str()).collect();
        assert_eq!(urls, vec!["http://y", "http://x"]);
    }

    #[test]
    fn recent_never_exceeds_count() {
        let bmarks = log();
        assert!(bmarks.recent(5).is_empty());
        for i in 0..3 {
            bmarks.add(&format!("http://example.com/{i}")).unwrap();
        }
        assert_eq!(bmarks.recent(0).len(), 0);
        assert_eq!(bmarks.recent(2).len(), 2);
        assert_eq!(bmarks.recent(50).len(), 3);
    }

    #[test]
    fn recent_is_sorted_by_creation_time() {
        let bmarks = log();
        for i in 0..20 {
            bmarks.add(&format!("http://example.com/{i}")).unwrap();
        }
        let recent = bmarks.recent(20);
        assert!(recent.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert_eq!(recent[0].url, "http://example.com/19");
        assert_eq!(recent[19].url, "http://example.com/0");
    }

    #[test]
    fn duplicates_are_kept() {
        let bmarks = log();
        bmarks.add("http://x").unwrap();
        bmarks.add("http://x").unwrap();
        assert_eq!(bmarks.len(), 2);
    }

    #[test]
    fn verbatim_policy_stores_anything_but_blank() {
        let bmarks = log();
        assert_eq!(bmarks.add("not a url").unwrap().url, "not a url");
        assert!(matches!(bmarks.add("   "), Err(AppError::Validation(_))));
        assert_eq!(bmarks.len(), 1);
    }

    #[test]
    fn validate_policy_rejects_malformed_urls() {
        let bmarks = MemoryBookmarkLog::new("TEDster", UrlPolicy::Validate);
        assert!(matches!(bmarks.add("not a url"), Err(AppError::Validation(_))));
        assert!(matches!(bmarks.add("ftp://x.org/f"), Err(AppError::Validation(_))));
        assert!(bmarks.add("https://www.ted.com/talks/x").is_ok());
        assert_eq!(bmarks.len(), 1);
    }

    #[test]
    fn concurrent_appends_are_all_kept() {
        let bmarks = Arc::new(log());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let bmarks = bmarks.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        bmarks.add(&format!("http://example.com/{t}/{i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(bmarks.len(), 400);
        let recent = bmarks.recent(400);
        assert!(recent.windows(2).all(|w| {
            (w[0].created_at, w[0].seq) > (w[1].created_at, w[1].seq)
        }));
    }
}
