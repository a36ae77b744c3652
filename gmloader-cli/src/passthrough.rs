//! Forwarding of requests the engine does not claim.

use axum::body::Body;
use axum::response::{IntoResponse, Response};
use http::header::{
    ALLOW, CONNECTION, HOST, HeaderName, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER,
    TRANSFER_ENCODING, UPGRADE,
};
use http::{HeaderMap, Method, Request, StatusCode, Uri};
use reqwest::Client;
use tracing::{debug, warn};
use url::Url;

use crate::error::Result;

/// Hop-by-hop headers that must not be copied between connections
const HOP_HEADERS: [HeaderName; 9] = [
    CONNECTION,
    HeaderName::from_static("keep-alive"),
    HOST,
    PROXY_AUTHENTICATE,
    PROXY_AUTHORIZATION,
    TE,
    TRAILER,
    TRANSFER_ENCODING,
    UPGRADE,
];

/// Sends unclaimed requests on to an upstream origin
#[derive(Debug, Clone)]
pub struct Passthrough {
    client: Client,
    origin: Url,
}

impl Passthrough {
    pub fn new(origin: Url) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self { client, origin })
    }

    /// Forward a GET or HEAD `request` to the origin and relay its response.
    ///
    /// Other methods get `405 Method Not Allowed`; upstream failures become
    /// `502 Bad Gateway`.
    pub async fn forward(&self, request: Request<()>) -> Response {
        let (parts, ()) = request.into_parts();
        if parts.method != Method::GET && parts.method != Method::HEAD {
            return (
                StatusCode::METHOD_NOT_ALLOWED,
                [(ALLOW, "GET, HEAD")],
                "method not forwarded",
            )
                .into_response();
        }

        let url = self.target_url(&parts.uri);
        debug!(method = %parts.method, %url, "Forwarding unclaimed request");

        let upstream = self
            .client
            .request(parts.method.clone(), url.clone())
            .headers(strip_hop_headers(parts.headers))
            .send()
            .await;

        match upstream {
            Ok(upstream) => {
                let status = upstream.status();
                let headers = strip_hop_headers(upstream.headers().clone());
                let mut response = Response::new(Body::from_stream(upstream.bytes_stream()));
                *response.status_mut() = status;
                *response.headers_mut() = headers;
                response
            }
            Err(e) => {
                warn!(%url, error = %e, "Upstream request failed");
                (StatusCode::BAD_GATEWAY, format!("upstream error: {e}")).into_response()
            }
        }
    }

    /// The origin with the request's path appended and its query attached.
    ///
    /// The path is set verbatim, so a `//host/...` path cannot move the
    /// request to another authority.
    fn target_url(&self, uri: &Uri) -> Url {
        let mut url = self.origin.clone();
        let base = self.origin.path().trim_end_matches('/');
        url.set_path(&format!("{base}{}", uri.path()));
        url.set_query(uri.query());
        url
    }
}

fn strip_hop_headers(mut headers: HeaderMap) -> HeaderMap {
    // Headers listed in `Connection` are hop-by-hop as well
    let listed: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in HOP_HEADERS.into_iter().chain(listed) {
        headers.remove(name);
    }
    headers
}
