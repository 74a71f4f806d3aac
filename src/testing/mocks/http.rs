//! Scripted HTTP fetcher for deterministic collector tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

use crate::collector::{Credentials, HttpFetcher, HttpResponse, RequestSpec, TransportError};

/// What the stub answers to one request
#[derive(Debug, Clone)]
pub struct StubReply {
    outcome: Result<HttpResponse, TransportError>,
    delay: Duration,
}

impl StubReply {
    /// No response at all
    pub fn transport(error: TransportError) -> Self {
        Self {
            outcome: Err(error),
            delay: Duration::ZERO,
        }
    }

    /// A plain-text response
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            outcome: Ok(HttpResponse::new(status, body.as_bytes().to_vec())),
            delay: Duration::ZERO,
        }
    }

    pub fn json(status: u16, body: &str) -> Self {
        Self::status(status, body).with_header("content-type", "application/json")
    }

    pub fn bytes(status: u16, body: Vec<u8>) -> Self {
        Self {
            outcome: Ok(HttpResponse::new(status, body)),
            delay: Duration::ZERO,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Ok(response) = self.outcome {
            self.outcome = Ok(response.with_header(name, value));
        }
        self
    }

    /// Answer only after `delay`
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A request the stub received
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub credentials: Credentials,
}

#[derive(Default)]
struct Route {
    queued: VecDeque<StubReply>,
    fallback: Option<StubReply>,
}

/// Answers requests by url from queued replies, then from a per-url
/// default. Unknown urls get a 404.
#[derive(Default)]
pub struct StubFetcher {
    routes: Mutex<HashMap<String, Route>>,
    received: Mutex<Vec<RecordedRequest>>,
    completed: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl StubFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `reply` for the next request to `url`
    pub fn push(&self, url: &str, reply: StubReply) {
        let mut routes = self.routes.lock().unwrap();
        routes.entry(canonical(url)).or_default().queued.push_back(reply);
    }

    /// Answer every request to `url` with `reply` once the queue is empty
    pub fn set_default(&self, url: &str, reply: StubReply) {
        let mut routes = self.routes.lock().unwrap();
        routes.entry(canonical(url)).or_default().fallback = Some(reply);
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.received.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        let url = canonical(url);
        self.received
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url == url)
            .count()
    }

    pub fn total_requests(&self) -> usize {
        self.received.lock().unwrap().len()
    }

    /// Urls in the order their replies were delivered
    pub fn completion_order(&self) -> Vec<String> {
        self.completed.lock().unwrap().clone()
    }

    /// Most requests that were ever in flight at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn next_reply(&self, url: &str) -> StubReply {
        let mut routes = self.routes.lock().unwrap();
        routes
            .get_mut(url)
            .and_then(|route| route.queued.pop_front().or_else(|| route.fallback.clone()))
            .unwrap_or_else(|| StubReply::status(404, "no stub for this url"))
    }
}

#[async_trait]
impl HttpFetcher for StubFetcher {
    async fn fetch(
        &self,
        request: &RequestSpec,
        credentials: &Credentials,
    ) -> Result<HttpResponse, TransportError> {
        let url = request.url.to_string();
        self.received.lock().unwrap().push(RecordedRequest {
            url: url.clone(),
            headers: request.headers.clone(),
            credentials: credentials.clone(),
        });
        let reply = self.next_reply(&url);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.completed.lock().unwrap().push(url);
        reply.outcome
    }
}

fn canonical(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}
