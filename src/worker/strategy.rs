//! # Fetch Strategies
//!
//! Request classification and the three caching policies the worker applies
//! to intercepted GET requests:
//!
//! | class     | policy                  | partition |
//! |-----------|-------------------------|-----------|
//! | `Api`     | network-first           | dynamic   |
//! | `Image`   | cache-first             | images    |
//! | `General` | stale-while-revalidate  | dynamic   |

use crate::shared::{Request, RequestDestination, Response, SharedError};
use crate::worker::cache::{CacheStorage, Partition};
use crate::worker::network::Network;
use regex::Regex;
use std::sync::{Arc, LazyLock};
use tokio::task::JoinHandle;

static IMAGE_EXTENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\.(png|jpe?g|gif|svg|webp|avif|ico)$").expect("valid image extension regex")
});

/// Request class
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    Api,
    Image,
    General,
}

/// Classify a request by URL and destination
pub fn classify(request: &Request) -> RequestClass {
    let path = strip_query(&request.url);
    if path.contains("/api/") || path.ends_with("/api") {
        RequestClass::Api
    } else if request.destination == RequestDestination::Image || IMAGE_EXTENSION.is_match(path) {
        RequestClass::Image
    } else {
        RequestClass::General
    }
}

fn strip_query(url: &str) -> &str {
    let end = url.find(|c: char| c == '?' || c == '#').unwrap_or(url.len());
    &url[..end]
}

/// Network-first: live response when reachable, cached copy or synthetic 503 otherwise
pub async fn network_first(
    request: &Request,
    network: &dyn Network,
    cache: &CacheStorage,
) -> Result<Response, SharedError> {
    match network.fetch(request).await {
        Ok(response) => {
            if response.ok() {
                if let Err(e) = cache.put(Partition::Dynamic, &request.url, &response).await {
                    tracing::warn!("[Strategy] Failed to cache {}: {}", request.url, e);
                }
            }
            Ok(response)
        }
        Err(e) if e.is_offline() => {
            tracing::debug!("[Strategy] Network unavailable for {}, trying cache", request.url);
            match cache.match_any(&request.url).await? {
                Some((_, cached)) => Ok(cached),
                None => Ok(Response::offline_json()),
            }
        }
        Err(e) => Err(e),
    }
}

/// Cache-first: cached copy when present, otherwise fetch and store in images
pub async fn cache_first(
    request: &Request,
    network: &dyn Network,
    cache: &CacheStorage,
) -> Result<Response, SharedError> {
    if let Some((_, cached)) = cache.match_any(&request.url).await? {
        tracing::debug!("[Strategy] Cache hit for {}", request.url);
        return Ok(cached);
    }

    let response = network.fetch(request).await?;
    if response.ok() {
        cache.put(Partition::Images, &request.url, &response).await?;
    }
    Ok(response)
}

/// Outcome of stale-while-revalidate
pub struct Revalidation {
    /// Response to hand back now
    pub response: Response,
    /// Background refresh, present only when a cached copy was served
    pub refresh: Option<JoinHandle<()>>,
}

/// Stale-while-revalidate: serve the cached copy and refresh it in the background
pub async fn stale_while_revalidate(
    request: &Request,
    network: Arc<dyn Network>,
    cache: CacheStorage,
) -> Result<Revalidation, SharedError> {
    if let Some((_, cached)) = cache.match_any(&request.url).await? {
        let request = request.clone();
        let refresh = tokio::spawn(async move {
            match network.fetch(&request).await {
                Ok(fresh) if fresh.ok() => {
                    if let Err(e) = cache.put(Partition::Dynamic, &request.url, &fresh).await {
                        tracing::warn!("[Strategy] Revalidation store failed for {}: {}", request.url, e);
                    }
                }
                Ok(fresh) => {
                    tracing::debug!("[Strategy] Revalidation of {} returned {}", request.url, fresh.status);
                }
                Err(e) => {
                    tracing::debug!("[Strategy] Revalidation of {} failed: {}", request.url, e);
                }
            }
        });
        return Ok(Revalidation {
            response: cached,
            refresh: Some(refresh),
        });
    }

    let response = network.fetch(request).await?;
    if response.ok() {
        cache.put(Partition::Dynamic, &request.url, &response).await?;
    }
    Ok(Revalidation {
        response,
        refresh: None,
    })
}
