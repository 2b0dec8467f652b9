//! Request id, bearer auth, and rate limiting for the HTTP API.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::api::ApiError;

const API_KEYS_VAR: &str = "STYLEPROF_API_KEYS";
const REQUEST_ID_HEADER: &str = "x-request-id";
const MAX_REQUEST_ID_LEN: usize = 128;

/// The id echoed in `x-request-id` and every response envelope.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Accepted bearer tokens. Disabled only in development with no keys set.
#[derive(Clone)]
pub struct AuthState {
    keys: Arc<[Vec<u8>]>,
    pub enabled: bool,
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("keys", &self.keys.len())
            .field("enabled", &self.enabled)
            .finish()
    }
}

impl AuthState {
    /// Read comma-separated tokens from `STYLEPROF_API_KEYS`.
    ///
    /// # Errors
    ///
    /// Fails outside development when no key is configured.
    pub fn from_env(is_development: bool) -> anyhow::Result<Self> {
        let raw = std::env::var(API_KEYS_VAR).unwrap_or_default();
        Self::from_keys(&raw, is_development)
    }

    /// # Errors
    ///
    /// Fails outside development when `raw` holds no key.
    pub fn from_keys(raw: &str, is_development: bool) -> anyhow::Result<Self> {
        let mut keys: Vec<Vec<u8>> = raw
            .split(',')
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| k.as_bytes().to_vec())
            .collect();
        keys.sort();
        keys.dedup();

        match (keys.is_empty(), is_development) {
            (false, _) => Ok(Self {
                keys: keys.into(),
                enabled: true,
            }),
            (true, true) => {
                tracing::warn!("{API_KEYS_VAR} is empty; API auth disabled for development");
                Ok(Self {
                    keys: Arc::from(Vec::new()),
                    enabled: false,
                })
            }
            (true, false) => anyhow::bail!("{API_KEYS_VAR} must list at least one bearer token"),
        }
    }

    /// Checks every key so the time taken does not depend on which matched.
    fn allows(&self, token: &str) -> bool {
        self.keys
            .iter()
            .map(|key| key.as_slice().ct_eq(token.as_bytes()))
            .fold(subtle::Choice::from(0), |acc, eq| acc | eq)
            .into()
    }
}

#[derive(Debug)]
struct Window {
    opened: Instant,
    used: usize,
}

/// A single fixed window shared by all protected routes.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    limit: usize,
    period: Duration,
    window: Arc<Mutex<Window>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(limit: usize, period: Duration) -> Self {
        Self {
            limit,
            period,
            window: Arc::new(Mutex::new(Window {
                opened: Instant::now(),
                used: 0,
            })),
        }
    }

    /// Count one request, or return how long until the window reopens.
    async fn admit(&self) -> Result<(), Duration> {
        let mut window = self.window.lock().await;
        let age = window.opened.elapsed();
        if age >= self.period {
            *window = Window {
                opened: Instant::now(),
                used: 0,
            };
        } else if window.used >= self.limit {
            return Err(self.period - age);
        }
        window.used += 1;
        Ok(())
    }
}

/// Take `x-request-id` from the request or mint one, and echo it back.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = incoming_request_id(req.headers()).unwrap_or_else(|| Uuid::new_v4().to_string());
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

pub async fn require_bearer_auth(
    State(auth): State<AuthState>,
    req: Request,
    next: Next,
) -> Response {
    let authorized = !auth.enabled
        || bearer_token(req.headers()).is_some_and(|token| auth.allows(token));

    if authorized {
        next.run(req).await
    } else {
        reject(
            &req,
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing or invalid bearer token",
        )
    }
}

pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    match rate_limit.admit().await {
        Ok(()) => next.run(req).await,
        Err(retry_after) => {
            let mut response = reject(
                &req,
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "rate limit exceeded",
            );
            // Round up so clients never retry early.
            let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            response
        }
    }
}

fn reject(req: &Request, status: StatusCode, code: &str, message: &str) -> Response {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    (status, Json(ApiError::new(request_id, code, message))).into_response()
}

fn incoming_request_id(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?.trim();
    (!value.is_empty() && value.len() <= MAX_REQUEST_ID_LEN).then(|| value.to_owned())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ")?.trim();
    (!token.is_empty()).then_some(token)
}
