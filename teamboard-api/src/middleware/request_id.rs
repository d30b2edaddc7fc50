/// Request ID middleware
///
/// Gives every request an ID, runs the rest of the stack inside a tracing
/// span carrying it, and echoes it back in the `x-request-id` response
/// header. A well-formed ID sent by the client (or a proxy in front of us)
/// is kept; otherwise a UUID v4 is generated.
///
/// # Example
///
/// ```no_run
/// use axum::{routing::get, Router};
/// use teamboard_api::middleware::request_id::RequestIdLayer;
///
/// let app: Router = Router::new()
///     .route("/", get(|| async { "ok" }))
///     .layer(RequestIdLayer);
/// ```

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    response::Response,
};
use std::task::{Context, Poll};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the request ID
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Longest client-supplied ID we accept
const MAX_ID_LEN: usize = 128;

/// Request ID stored in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

/// Request ID middleware layer
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestIdLayer;

impl<S> Layer<S> for RequestIdLayer {
    type Service = RequestIdMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestIdMiddleware { inner }
    }
}

/// Request ID middleware service
#[derive(Debug, Clone)]
pub struct RequestIdMiddleware<S> {
    inner: S,
}

/// Keeps a client ID if it is short printable ASCII without spaces
fn incoming_id(request: &Request) -> Option<String> {
    let value = request.headers().get(&REQUEST_ID_HEADER)?.to_str().ok()?;

    let valid = !value.is_empty()
        && value.len() <= MAX_ID_LEN
        && value.bytes().all(|b| b.is_ascii_graphic());

    valid.then(|| value.to_string())
}

impl<S> Service<Request> for RequestIdMiddleware<S>
where
    S: Service<Request, Response = Response> + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut request: Request) -> Self::Future {
        let id = incoming_id(&request).unwrap_or_else(|| Uuid::new_v4().to_string());

        // Only graphic ASCII reaches here, so the value is always valid.
        let header_value = HeaderValue::from_str(&id).ok();
        if let Some(value) = &header_value {
            request.headers_mut().insert(REQUEST_ID_HEADER.clone(), value.clone());
        }
        request.extensions_mut().insert(RequestId(id.clone()));

        let span = tracing::info_span!("request", request_id = %id);
        let future = self.inner.call(request);

        Box::pin(
            async move {
                let mut response = future.await?;

                if let Some(value) = header_value {
                    response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}
