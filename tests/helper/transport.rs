//! Recording in-memory transport

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use pom_resolver::error::FetchError;
use pom_resolver::repository::Transport;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get(String),
    Head(String),
}

/// Serves fixed bodies by URL and records every request.
///
/// GET of an unknown URL is a miss; HEAD succeeds only for reachable URLs.
/// Failing URLs return a transport error for both.
#[derive(Default)]
pub struct FakeTransport {
    bodies: HashMap<String, Vec<u8>>,
    reachable: HashSet<String>,
    failing: HashSet<String>,
    requests: Mutex<Vec<Request>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    pub fn with_reachable(mut self, url: &str) -> Self {
        self.reachable.insert(url.to_string());
        self
    }

    pub fn with_failure(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    pub fn gets(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Get(url) => Some(url),
                Request::Head(_) => None,
            })
            .collect()
    }

    pub fn heads(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter_map(|r| match r {
                Request::Head(url) => Some(url),
                Request::Get(_) => None,
            })
            .collect()
    }

    fn record(&self, request: Request) {
        self.requests.lock().unwrap().push(request);
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>, FetchError> {
        self.record(Request::Get(url.to_string()));
        if self.failing.contains(url) {
            return Err(FetchError::InvalidResponse(format!("connection reset: {url}")));
        }
        Ok(self.bodies.get(url).cloned())
    }

    async fn head(&self, url: &str) -> Result<bool, FetchError> {
        self.record(Request::Head(url.to_string()));
        if self.failing.contains(url) {
            return Err(FetchError::InvalidResponse(format!("connection reset: {url}")));
        }
        Ok(self.reachable.contains(url))
    }
}
