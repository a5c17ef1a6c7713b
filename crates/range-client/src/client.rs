//! Ranged retrieval operations: size discovery and byte-range fetch.

use bytes::Bytes;
use http::{HeaderMap, HeaderValue, Method, StatusCode, header};

use crate::error::RangeError;
use crate::http_client::{HttpClient, HttpRequest, HttpResponse};
use crate::source::RangeSource;

/// A client for range-addressable remote objects, generic over the HTTP
/// backend.
#[derive(Debug, Clone)]
pub struct RangeClient<C: HttpClient> {
    client: C,
}

/// [`RangeClient`] over the default reqwest backend.
#[cfg(feature = "reqwest-client")]
pub type HttpRangeClient = RangeClient<crate::backends::ReqwestClient>;

#[cfg(feature = "reqwest-client")]
impl HttpRangeClient {
    /// Create a reqwest-backed client with the given request timeout.
    #[must_use]
    pub fn with_timeout(timeout: std::time::Duration) -> Self {
        Self::new(crate::backends::ReqwestClient::new(timeout))
    }
}

impl<C: HttpClient> RangeClient<C> {
    /// Create a new `RangeClient` over the given backend.
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Issue a ranged GET and insist on a partial-content answer.
    async fn ranged_get(&self, url: &str, range: &str) -> Result<HttpResponse, RangeError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::RANGE,
            HeaderValue::from_str(range)
                .map_err(|e| RangeError::Transport(e.to_string()))?,
        );

        let response = self
            .client
            .send(HttpRequest {
                method: Method::GET,
                url: url.to_owned(),
                headers,
            })
            .await?;

        if response.status != StatusCode::PARTIAL_CONTENT {
            return Err(RangeError::UnexpectedStatus(response.status.as_u16()));
        }
        Ok(response)
    }

    /// Resolve the total size of the object at `url`.
    ///
    /// Requests the first byte only and reads the total length out of the
    /// `Content-Range` answer. Fails if the server does not honor range
    /// requests or the header is absent or unparsable.
    pub async fn discover_size(&self, url: &str) -> Result<u64, RangeError> {
        let response = self.ranged_get(url, "bytes=0-0").await?;

        let raw = response
            .headers
            .get(header::CONTENT_RANGE)
            .ok_or(RangeError::MissingContentRange)?
            .to_str()
            .map_err(|_| {
                RangeError::MalformedContentRange("header value is not ASCII".to_owned())
            })?;

        parse_content_range_total(raw)
    }

    /// Fetch `len` bytes starting at `offset`.
    ///
    /// Returns the body as received: a remote that closes the stream early
    /// at its true end-of-file yields a short buffer, not an error.
    pub async fn fetch_range(&self, url: &str, offset: u64, len: u64) -> Result<Bytes, RangeError> {
        if len == 0 {
            return Ok(Bytes::new());
        }
        let range = format!("bytes={}-{}", offset, offset + len - 1);
        let response = self.ranged_get(url, &range).await?;
        Ok(response.body)
    }
}

impl<C: HttpClient + Clone + Send + Sync + 'static> RangeSource for RangeClient<C> {
    async fn discover_size(&self, url: &str) -> Result<u64, RangeError> {
        RangeClient::discover_size(self, url).await
    }

    async fn fetch_range(&self, url: &str, offset: u64, len: u64) -> Result<Bytes, RangeError> {
        RangeClient::fetch_range(self, url, offset, len).await
    }
}

/// Parse the total length out of a `Content-Range` header value such as
/// `bytes 0-0/123456789`.
fn parse_content_range_total(raw: &str) -> Result<u64, RangeError> {
    let malformed = || RangeError::MalformedContentRange(raw.to_owned());

    let rest = raw.strip_prefix("bytes ").ok_or_else(malformed)?;
    let (span, total) = rest.split_once('/').ok_or_else(malformed)?;

    // Validate the first-last span so that garbage before the slash is
    // rejected rather than silently ignored.
    let (first, last) = span.split_once('-').ok_or_else(malformed)?;
    first.parse::<u64>().map_err(|_| malformed())?;
    last.parse::<u64>().map_err(|_| malformed())?;

    total.parse::<u64>().map_err(|_| malformed())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::error::HttpClientError;

    /// An [`HttpClient`] that replays canned responses and records the
    /// requests it was handed.
    struct ScriptedClient {
        responses: Mutex<VecDeque<Result<HttpResponse, HttpClientError>>>,
        requests: Mutex<Vec<HttpRequest>>,
    }

    impl ScriptedClient {
        fn replying(responses: Vec<Result<HttpResponse, HttpClientError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_range_header(&self, idx: usize) -> String {
            let requests = self.requests.lock().unwrap();
            requests[idx]
                .headers
                .get(header::RANGE)
                .unwrap()
                .to_str()
                .unwrap()
                .to_owned()
        }
    }

    impl HttpClient for ScriptedClient {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpClientError> {
            self.requests.lock().unwrap().push(request);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("no scripted response left")
        }
    }

    fn partial(body: &'static [u8], content_range: Option<&str>) -> HttpResponse {
        let mut headers = HeaderMap::new();
        if let Some(cr) = content_range {
            headers.insert(header::CONTENT_RANGE, HeaderValue::from_str(cr).unwrap());
        }
        HttpResponse {
            status: StatusCode::PARTIAL_CONTENT,
            headers,
            body: Bytes::from_static(body),
        }
    }

    fn full_body(body: &'static [u8]) -> HttpResponse {
        HttpResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from_static(body),
        }
    }

    #[tokio::test]
    async fn discover_size_parses_content_range_total() {
        let scripted =
            ScriptedClient::replying(vec![Ok(partial(b"x", Some("bytes 0-0/123456789")))]);
        let client = RangeClient::new(scripted);

        let size = client.discover_size("https://example.com/a").await.unwrap();
        assert_eq!(size, 123_456_789);
        assert_eq!(client.client.request_range_header(0), "bytes=0-0");
    }

    #[tokio::test]
    async fn discover_size_rejects_non_partial_status() {
        let scripted = ScriptedClient::replying(vec![Ok(full_body(b"whole object"))]);
        let client = RangeClient::new(scripted);

        let err = client
            .discover_size("https://example.com/a")
            .await
            .unwrap_err();
        assert_eq!(err, RangeError::UnexpectedStatus(200));
    }

    #[tokio::test]
    async fn discover_size_requires_content_range_header() {
        let scripted = ScriptedClient::replying(vec![Ok(partial(b"x", None))]);
        let client = RangeClient::new(scripted);

        let err = client
            .discover_size("https://example.com/a")
            .await
            .unwrap_err();
        assert_eq!(err, RangeError::MissingContentRange);
    }

    #[tokio::test]
    async fn fetch_range_sets_exact_range_header() {
        let scripted = ScriptedClient::replying(vec![Ok(partial(b"abcd", None))]);
        let client = RangeClient::new(scripted);

        let body = client
            .fetch_range("https://example.com/a", 2048, 1024)
            .await
            .unwrap();
        assert_eq!(&body[..], b"abcd");
        assert_eq!(client.client.request_range_header(0), "bytes=2048-3071");
    }

    #[tokio::test]
    async fn fetch_range_tolerates_short_tail_body() {
        // Request crosses end-of-file; the server returns what exists.
        let scripted = ScriptedClient::replying(vec![Ok(partial(b"tail", None))]);
        let client = RangeClient::new(scripted);

        let body = client
            .fetch_range("https://example.com/a", 0, 4096)
            .await
            .unwrap();
        assert_eq!(body.len(), 4);
    }

    #[tokio::test]
    async fn fetch_range_rejects_non_partial_status() {
        let scripted = ScriptedClient::replying(vec![Ok(full_body(b"nope"))]);
        let client = RangeClient::new(scripted);

        let err = client
            .fetch_range("https://example.com/a", 0, 16)
            .await
            .unwrap_err();
        assert_eq!(err, RangeError::UnexpectedStatus(200));
    }

    #[test]
    fn content_range_parsing() {
        assert_eq!(
            parse_content_range_total("bytes 0-0/123456789").unwrap(),
            123_456_789
        );
        assert_eq!(
            parse_content_range_total("bytes 100-199/200").unwrap(),
            200
        );

        for bad in [
            "bytes 0-0/abc",
            "0-0/10",
            "bytes 0-0",
            "bytes x-0/10",
            "bytes 0-y/10",
            "",
        ] {
            assert!(
                matches!(
                    parse_content_range_total(bad),
                    Err(RangeError::MalformedContentRange(_))
                ),
                "{bad:?} should be rejected"
            );
        }
    }
}
