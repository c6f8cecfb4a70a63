// ctech-client/src/api.rs
use ctech_common::{ErrorBody, REST_PREFIX};
use reqwest::{Client as ReqwestClient, RequestBuilder, StatusCode};
use serde_json::Value;
use std::error::Error;
use std::fmt;
use tracing::debug;
use url::Url;

pub type BoxedError = Box<dyn Error + Send + Sync>;

/// How requests authenticate against the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    None,
    Bearer(String),
    /// User name plus application password.
    Basic { user: String, password: String },
}

impl Auth {
    /// Basic when a user is given, Bearer when only a token is.
    pub fn from_parts(user: Option<String>, token: Option<String>) -> Self {
        match (user, token) {
            (Some(user), Some(password)) => Auth::Basic { user, password },
            (None, Some(token)) => Auth::Bearer(token),
            _ => Auth::None,
        }
    }
}

/// Error envelope returned by the server.
#[derive(Debug)]
pub struct ApiFailure {
    pub status: StatusCode,
    pub body: Option<ErrorBody>,
}

impl fmt::Display for ApiFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Some(body) => write!(f, "{} ({}): {}", body.code, self.status, body.message),
            None => write!(f, "request failed with {}", self.status),
        }
    }
}

impl Error for ApiFailure {}

pub struct ApiClient {
    http: ReqwestClient,
    base: Url,
    auth: Auth,
}

impl ApiClient {
    pub fn new(base_url: &str, auth: Auth) -> Result<Self, BoxedError> {
        let base = Url::parse(base_url).map_err(|e| format!("Invalid base URL '{}': {}", base_url, e))?;
        Ok(ApiClient {
            http: ReqwestClient::new(),
            base,
            auth,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// URL of a route under the REST namespace, e.g. `seo/audit`.
    pub fn route_url(&self, route: &str) -> Result<Url, BoxedError> {
        let path = format!("{}/{}", REST_PREFIX, route.trim_start_matches('/'));
        Ok(self.base.join(&path)?)
    }

    pub fn admin_url(&self, path: &str) -> Result<Url, BoxedError> {
        Ok(self.base.join(&format!("/api/admin/{}", path.trim_start_matches('/')))?)
    }

    pub async fn get(&self, url: Url) -> Result<Value, BoxedError> {
        debug!("GET {}", url);
        self.send(self.http.get(url)).await
    }

    pub async fn post(&self, url: Url, body: Option<&Value>) -> Result<Value, BoxedError> {
        debug!("POST {}", url);
        let request = self.http.post(url);
        let request = match body {
            Some(body) => request.json(body),
            None => request,
        };
        self.send(request).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, BoxedError> {
        let request = match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::Basic { user, password } => request.basic_auth(user, Some(password)),
        };

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let body = serde_json::from_slice::<ErrorBody>(&bytes).ok();
            return Err(Box::new(ApiFailure { status, body }));
        }
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}
