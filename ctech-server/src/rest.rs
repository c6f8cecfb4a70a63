// ctech-server/src/rest.rs
//! Dispatch of `/wp-json/communitytech/v1/*` requests onto unit routes.

use axum::{
    body::Bytes,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, HeaderValue, Method as HttpMethod, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use ctech_common::{ApiError, Method, RouteMatch, RouteRequest, REST_NAMESPACE};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, info_span, warn, Instrument, Span};
use uuid::Uuid;

use crate::AppState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// WordPress-style error envelope with the matching status code.
pub fn error_response(err: &ApiError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(err.body())).into_response()
}

fn no_route() -> ApiError {
    ApiError::not_found("rest_no_route", "No route was found matching the URL and request method.")
}

/// Namespace index: every route the active units expose.
pub async fn index(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let routes = state.bridge.routes();
    Json(json!({
        "namespace": REST_NAMESPACE,
        "routes": routes.infos(),
    }))
}

pub async fn dispatch(
    State(state): State<Arc<AppState>>,
    method: HttpMethod,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.request_count.fetch_add(1, Ordering::SeqCst);

    let request_id = Uuid::new_v4();
    let span = info_span!("rest", %request_id, %method, path = %path);

    let mut response = handle(state, method, path, query, headers, body)
        .instrument(span)
        .await
        .unwrap_or_else(|err| error_response(&err));

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn handle(
    state: Arc<AppState>,
    method: HttpMethod,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let Some(method) = Method::parse(method.as_str()) else {
        return Err(ApiError::MethodNotAllowed {
            code: "rest_no_route".into(),
            message: format!("Method {} is not supported.", method),
        });
    };

    let routes = state.bridge.routes();
    let (route, params) = match routes.find(method, &path) {
        RouteMatch::Found { route, params } => (route.clone(), params),
        RouteMatch::MethodNotAllowed => {
            return Err(ApiError::MethodNotAllowed {
                code: "rest_no_route".into(),
                message: format!("Route /{} does not accept {}.", path.trim_matches('/'), method),
            })
        }
        RouteMatch::NotFound => return Err(no_route()),
    };

    let actor = state.actors.authorize(&headers, route.capability)?;
    debug!("Authorized {} for {} {}", actor.name, route.method, route.pattern);

    let request = RouteRequest {
        params,
        query: parse_query(query.as_deref()),
        body: parse_body(&body)?,
    };

    // Unit handlers do synchronous storage I/O.
    let host = state.bridge.host().clone();
    let span = Span::current();
    let outcome = tokio::task::spawn_blocking(move || {
        let _entered = span.enter();
        route.invoke(&host, &request)
    })
    .await
    .map_err(|e| {
        error!("Route handler panicked or was cancelled: {}", e);
        ApiError::internal("The route handler failed unexpectedly.")
    })?;

    match outcome {
        Ok(value) => Ok(Json(value).into_response()),
        Err(err) => {
            if err.status() >= 500 {
                error!("{} failed: {}", err.code(), err);
            } else {
                warn!("Request rejected: {} ({})", err.code(), err);
            }
            Err(err)
        }
    }
}

fn parse_query(raw: Option<&str>) -> BTreeMap<String, String> {
    raw.map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default()
}

/// Empty bodies read as `null`; anything else must be JSON.
fn parse_body(body: &Bytes) -> Result<Value, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| {
        ApiError::invalid("rest_invalid_json", format!("Invalid JSON body passed: {}", e))
    })
}
