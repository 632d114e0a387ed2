use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use http::header::{self, HeaderMap, HeaderName};
use http::{StatusCode, Uri};
use reject_countries_types::RejectCountriesResult;
use reject_countries_types::errors::RejectCountriesError;
use reqwest::{Client, Url};
use tracing::{debug, warn};

static HOP_BY_HOP_HEADERS: [HeaderName; 9] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HOST,
];

#[derive(Debug)]
enum ProxyError {
    Upstream(reqwest::Error),
    Response(http::Error),
}

impl Display for ProxyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ProxyError::Upstream(e) => write!(f, "upstream request failed: {e}"),
            ProxyError::Response(e) => write!(f, "could not build response: {e}"),
        }
    }
}

/// Where allowed requests end up. Cheap to clone, the reqwest client is
/// reference counted.
#[derive(Debug, Clone)]
pub struct Upstream {
    base_url: Url,
    client: Client,
}

impl Upstream {
    pub fn new(upstream_url: &str, request_timeout: Duration) -> RejectCountriesResult<Self> {
        let base_url = Url::parse(upstream_url).map_err(|e| {
            RejectCountriesError::InvalidUpstreamUrl(format!("{upstream_url}: {e}"))
        })?;
        let client = Client::builder()
            .timeout(request_timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| {
                RejectCountriesError::UpstreamClientBuild(format!("Failed to build client {e:?}"))
            })?;
        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Joins the incoming path and query onto the upstream base url.
    fn target(&self, uri: &Uri) -> Url {
        let mut url = self.base_url.clone();
        let path = format!("{}{}", url.path().trim_end_matches('/'), uri.path());
        url.set_path(&path);
        url.set_query(uri.query());
        url
    }

    async fn send(&self, req: Request) -> Result<Response, ProxyError> {
        let (parts, body) = req.into_parts();
        let url = self.target(&parts.uri);
        debug!("Forwarding {} {} to {url}", parts.method, parts.uri);

        let upstream_response = self
            .client
            .request(parts.method, url)
            .headers(end_to_end_headers(&parts.headers))
            .body(reqwest::Body::wrap_stream(body.into_data_stream()))
            .send()
            .await
            .map_err(ProxyError::Upstream)?;

        let mut builder = Response::builder().status(upstream_response.status());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(end_to_end_headers(upstream_response.headers()));
        }
        builder
            .body(Body::from_stream(upstream_response.bytes_stream()))
            .map_err(ProxyError::Response)
    }
}

fn end_to_end_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in HOP_BY_HOP_HEADERS.iter() {
        forwarded.remove(name);
    }
    forwarded
}

pub async fn forward(State(upstream): State<Upstream>, req: Request) -> Response {
    match upstream.send(req).await {
        Ok(response) => response,
        Err(e) => {
            warn!("Failed to forward request to {}: {e}", upstream.base_url);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}
