//! HTTP transport for reaching metrics endpoints through the backend proxy
//!
//! The fetch engine only needs "GET a URL, give me status and body". That
//! capability sits behind [`Transport`] so the browser implementation
//! (gloo-net) can be swapped for a stub in tests.

use std::fmt;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{select, Either};
use gloo_net::http::Request;
use gloo_timers::future::TimeoutFuture;
use tracing::debug;

use crate::config::ClusterDescriptor;
use crate::error::{FetchError, FetchResult};

/// A GET request against a proxied cluster
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyRequest {
    /// Fully built request URL
    pub url: String,
    /// Value for the `Accept` header
    pub accept: &'static str,
    bearer: Option<String>,
}

impl ProxyRequest {
    pub fn new(url: impl Into<String>, accept: &'static str) -> Self {
        Self {
            url: url.into(),
            accept,
            bearer: None,
        }
    }

    /// Attach the cluster's bearer token, if any
    pub fn for_cluster(mut self, cluster: &ClusterDescriptor) -> Self {
        self.bearer = cluster.bearer_token().map(str::to_string);
        self
    }

    /// `Authorization` header value
    pub fn authorization(&self) -> Option<String> {
        self.bearer.as_ref().map(|t| format!("Bearer {t}"))
    }
}

impl fmt::Debug for ProxyRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyRequest")
            .field("url", &self.url)
            .field("accept", &self.accept)
            .field("bearer", &self.bearer.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Status and body of a completed request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Body of a 2xx response, or a network error carrying the status
    pub fn into_success_body(self) -> FetchResult<String> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(FetchError::http_status(self.status))
        }
    }
}

/// "Fetch a URL" capability
#[async_trait(?Send)]
pub trait Transport {
    async fn get(&self, request: &ProxyRequest) -> FetchResult<RawResponse>;
}

#[async_trait(?Send)]
impl<T: Transport + ?Sized> Transport for Rc<T> {
    async fn get(&self, request: &ProxyRequest) -> FetchResult<RawResponse> {
        (**self).get(request).await
    }
}

/// Browser transport using gloo-net, bounded by a timeout
#[derive(Debug, Clone)]
pub struct GlooTransport {
    timeout: Duration,
}

impl GlooTransport {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn send(request: &ProxyRequest) -> FetchResult<RawResponse> {
        let mut builder = Request::get(&request.url).header("Accept", request.accept);
        if let Some(auth) = request.authorization() {
            builder = builder.header("Authorization", &auth);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        Ok(RawResponse { status, body })
    }
}

#[async_trait(?Send)]
impl Transport for GlooTransport {
    async fn get(&self, request: &ProxyRequest) -> FetchResult<RawResponse> {
        debug!(url = %request.url, "sending metrics request");

        let millis = u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX);
        with_timeout(Self::send(request), TimeoutFuture::new(millis), self.timeout).await
    }
}

/// Race `request` against `timer`; expiry becomes a network error
pub(crate) async fn with_timeout<F, T>(
    request: F,
    timer: T,
    limit: Duration,
) -> FetchResult<RawResponse>
where
    F: Future<Output = FetchResult<RawResponse>>,
    T: Future<Output = ()>,
{
    match select(Box::pin(request), Box::pin(timer)).await {
        Either::Left((result, _)) => result,
        Either::Right(((), _)) => Err(FetchError::timeout(limit)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::{pending, ready};

    #[test]
    fn test_authorization_from_cluster_token() {
        let cluster = ClusterDescriptor::new("prod", "prom").with_token("abc");
        let request = ProxyRequest::new("http://x", "application/json").for_cluster(&cluster);
        assert_eq!(request.authorization().as_deref(), Some("Bearer abc"));
    }

    #[test]
    fn test_no_authorization_without_token() {
        let cluster = ClusterDescriptor::new("prod", "prom");
        let request = ProxyRequest::new("http://x", "application/json").for_cluster(&cluster);
        assert!(request.authorization().is_none());
    }

    #[test]
    fn test_debug_redacts_token() {
        let cluster = ClusterDescriptor::new("prod", "prom").with_token("abc");
        let request = ProxyRequest::new("http://x", "text/plain").for_cluster(&cluster);
        assert!(!format!("{:?}", request).contains("abc"));
    }

    #[test]
    fn test_non_success_status_is_network_error() {
        let resp = RawResponse {
            status: 503,
            body: "unavailable".into(),
        };
        assert_eq!(resp.into_success_body(), Err(FetchError::http_status(503)));
        assert_eq!(RawResponse::ok("x").into_success_body(), Ok("x".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_expiry_is_network_error() {
        let limit = Duration::from_millis(250);
        let err = with_timeout(pending::<FetchResult<RawResponse>>(), ready(()), limit)
            .await
            .unwrap_err();
        assert!(err.is_network());
        assert_eq!(err, FetchError::timeout(limit));
    }

    #[tokio::test]
    async fn test_response_before_timeout_wins() {
        let resp = with_timeout(
            ready(Ok::<_, FetchError>(RawResponse::ok("body"))),
            pending::<()>(),
            Duration::from_secs(10),
        )
        .await;
        assert_eq!(resp, Ok(RawResponse::ok("body")));
    }

    #[tokio::test]
    async fn test_transport_error_passes_through_timeout() {
        let resp = with_timeout(
            ready(Err::<RawResponse, _>(FetchError::Parse("bad body".into()))),
            pending::<()>(),
            Duration::from_secs(10),
        )
        .await;
        assert!(resp.unwrap_err().is_parse());
    }
}
