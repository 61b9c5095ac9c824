//! The HTTP capability the client and selector are built on.

use crate::error::Error;
use http::StatusCode;
use serde_json::Value;
use std::future::Future;

/// Default `User-Agent` sent by [`ReqwestTransport`].
pub const DEFAULT_USER_AGENT: &str = concat!("invidious-api-client/", env!("CARGO_PKG_VERSION"));

/// Local Tor SOCKS endpoint used for `onion` instances.
pub const TOR_SOCKS_PROXY: &str = "socks5h://localhost:9050";

/// Status and undecoded body of a GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Performs the two kinds of request the API layer needs.
///
/// Implementations only report transport-level failures as errors; a non-2xx status is a
/// successful GET/HEAD as far as the transport is concerned. Caching, proxies and timeouts
/// all live behind this trait.
pub trait Transport: Send + Sync {
    /// `GET url?query`.
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send;

    /// `HEAD url`, returning only the status.
    fn head(&self, url: &str) -> impl Future<Output = Result<StatusCode, Error>> + Send;
}

/// Turns a [`RawResponse`] into JSON, or into [`Error::Http`] for non-2xx statuses.
pub(crate) fn decode_json(url: &str, response: RawResponse) -> Result<Value, Error> {
    if !response.status.is_success() {
        return Err(Error::Http {
            status: response.status,
            url: url.to_string(),
            body: response.body,
        });
    }
    Ok(serde_json::from_str(&response.body)?)
}

/// [`Transport`] backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps an already configured client.
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder().user_agent(user_agent).build()?;
        Ok(Self::new(client))
    }

    /// A client that routes every request through the local Tor proxy
    /// ([`TOR_SOCKS_PROXY`]), for instances of type `onion`.
    pub fn onion(user_agent: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .proxy(reqwest::Proxy::all(TOR_SOCKS_PROXY)?)
            .build()?;
        Ok(Self::new(client))
    }
}

impl Transport for ReqwestTransport {
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<RawResponse, Error> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok(RawResponse { status, body })
    }

    async fn head(&self, url: &str) -> Result<StatusCode, Error> {
        Ok(self.client.head(url).send().await?.status())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_body_is_decoded() {
        let response = RawResponse {
            status: StatusCode::OK,
            body: r#"{"videoId":"x"}"#.to_string(),
        };
        assert_eq!(
            decode_json("https://i.example/api/v1/videos/x", response).unwrap(),
            json!({ "videoId": "x" })
        );
    }

    #[test]
    fn error_status_is_passed_through() {
        let response = RawResponse {
            status: StatusCode::URI_TOO_LONG,
            body: "too long".to_string(),
        };
        let err = decode_json("https://i.example/api/v1/comments/x", response).unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::URI_TOO_LONG));
        assert!(err.to_string().contains("too long"));
    }

    #[test]
    fn non_json_body_is_a_decode_error() {
        let response = RawResponse {
            status: StatusCode::OK,
            body: "<html>".to_string(),
        };
        assert!(matches!(
            decode_json("https://i.example/", response),
            Err(Error::Decode(_))
        ));
    }
}
