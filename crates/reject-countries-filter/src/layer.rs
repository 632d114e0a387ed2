use std::future::{Ready, ready};
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::Body;
use futures::future::Either;
use http::{Request, Response};
use tower::{Layer, Service};

use crate::engine::{RejectCountries, Verdict};

#[derive(Debug, Clone)]
pub struct RejectCountriesLayer {
    filter: Arc<RejectCountries>,
}

impl RejectCountriesLayer {
    pub fn new(filter: Arc<RejectCountries>) -> Self {
        Self { filter }
    }
}

impl<S> Layer<S> for RejectCountriesLayer {
    type Service = RejectCountriesService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RejectCountriesService {
            inner,
            filter: self.filter.clone(),
        }
    }
}

/// Answers rejected requests with the static response and forwards
/// everything else to `inner` untouched.
#[derive(Debug, Clone)]
pub struct RejectCountriesService<S> {
    inner: S,
    filter: Arc<RejectCountries>,
}

impl<S, ReqBody> Service<Request<ReqBody>> for RejectCountriesService<S>
where
    S: Service<Request<ReqBody>, Response = Response<Body>>,
{
    type Response = Response<Body>;
    type Error = S::Error;
    type Future = Either<Ready<Result<Self::Response, Self::Error>>, S::Future>;

    #[inline]
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        match self.filter.decide_request(&req) {
            Verdict::Reject { .. } => Either::Left(ready(Ok(self.filter.static_response().render()))),
            Verdict::Allow(_) => Either::Right(self.inner.call(req)),
        }
    }
}
