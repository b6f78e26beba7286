//! In-process network double
//!
//! Routes are matched on the exact request URL; unknown URLs answer 404.
//! Every request is recorded so tests can assert how often the network was
//! actually hit.

use async_trait::async_trait;
use fuelq::shared::{Request, Response, SharedError};
use fuelq::worker::Network;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct CountingNetwork {
    routes: Mutex<HashMap<String, Response>>,
    offline: AtomicBool,
    calls: Mutex<Vec<Request>>,
}

impl CountingNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, url: &str, response: Response) -> &Self {
        self.routes.lock().unwrap().insert(url.to_string(), response);
        self
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Request> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, url: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.url == url).count()
    }
}

#[async_trait]
impl Network for CountingNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, SharedError> {
        self.calls.lock().unwrap().push(request.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(SharedError::network(&request.url, "connection refused"));
        }
        Ok(self
            .routes
            .lock()
            .unwrap()
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}
