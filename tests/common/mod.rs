//! Shared test helpers: a canned transport and feed builders.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;

use tidings::config::FeedSource;
use tidings::feed::{FeedTransport, FetchError, FetchedFeed, FetchedItem, SourceFetch};

/// Transport fake serving canned responses by source URL.
#[derive(Default)]
pub struct CannedTransport {
    responses: Mutex<HashMap<String, Result<FetchedFeed, String>>>,
}

impl CannedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(&self, url: &str, feed: FetchedFeed) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Ok(feed));
    }

    #[allow(dead_code)] // Not every test file exercises fetch failures
    pub fn fail(&self, url: &str, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), Err(message.to_string()));
    }
}

#[async_trait]
impl FeedTransport for CannedTransport {
    async fn fetch_all(&self, sources: &[FeedSource]) -> Vec<SourceFetch> {
        let responses = self.responses.lock().unwrap();
        sources
            .iter()
            .map(|source| SourceFetch {
                source: source.clone(),
                result: match responses.get(&source.url) {
                    Some(Ok(feed)) => Ok(feed.clone()),
                    Some(Err(message)) => Err(FetchError::Parse(message.clone())),
                    None => Err(FetchError::Parse("no canned response".to_string())),
                },
            })
            .collect()
    }
}

pub fn source(url: &str) -> FeedSource {
    FeedSource {
        url: url.to_string(),
        display_name: None,
    }
}

pub fn feed(title: &str, items: Vec<FetchedItem>) -> FetchedFeed {
    FetchedFeed {
        title: title.to_string(),
        items,
    }
}

pub fn item(title: &str, published: Option<DateTime<Utc>>) -> FetchedItem {
    FetchedItem {
        title: title.to_string(),
        link: format!("https://example.com/{}", title.replace(' ', "-")),
        description: Some(format!("About {}", title)),
        body: None,
        published,
        updated: None,
    }
}
