// ctech-server/src/auth.rs
use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose, Engine as _};
use ctech_common::{Actor, ApiError, Capability};
use tracing::warn;

use crate::config::ActorConfig;

/// Known API callers and their capabilities.
#[derive(Debug, Clone, Default)]
pub struct ActorDirectory {
    actors: Vec<ActorConfig>,
}

impl ActorDirectory {
    pub fn new(actors: Vec<ActorConfig>) -> Self {
        ActorDirectory { actors }
    }

    pub fn len(&self) -> usize {
        self.actors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Resolve the caller from `Authorization: Bearer <token>` or
    /// `Authorization: Basic base64(<name>:<token>)`.
    pub fn resolve(&self, headers: &HeaderMap) -> Option<Actor> {
        let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();

        let found = if let Some(token) = value.strip_prefix("Bearer ") {
            self.actors.iter().find(|a| a.token == token.trim())
        } else if let Some(encoded) = value.strip_prefix("Basic ") {
            let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
            let decoded = String::from_utf8(decoded).ok()?;
            let (name, token) = decoded.split_once(':')?;
            // Application passwords are often displayed with spaces.
            let token = token.replace(' ', "");
            self.actors.iter().find(|a| a.name == name && a.token == token)
        } else {
            None
        };

        if found.is_none() {
            warn!("Rejected credentials in Authorization header");
        }
        found.map(|a| Actor::new(&a.name, a.capabilities.iter().copied()))
    }

    /// The caller, who must hold `capability`.
    pub fn authorize(&self, headers: &HeaderMap, capability: Capability) -> Result<Actor, ApiError> {
        let actor = self
            .resolve(headers)
            .ok_or_else(|| ApiError::unauthorized("Sorry, you are not allowed to do that."))?;
        if !actor.can(capability) {
            return Err(ApiError::forbidden(format!(
                "Sorry, you are not allowed to do that (requires {}).",
                capability.as_str()
            )));
        }
        Ok(actor)
    }
}
