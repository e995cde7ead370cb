use axum::{
    Router,
    extract::Request,
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Error as AxumError, Header},
};

use std::sync::Arc;

use crate::{expenses, payments, queries};
use engine::{Actor, Engine, Role};

static USER_ID_HEADER: axum::http::HeaderName = axum::http::HeaderName::from_static("x-user-id");
static USER_ROLE_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-user-role");
static COMMUNITY_ID_HEADER: axum::http::HeaderName =
    axum::http::HeaderName::from_static("x-community-id");

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
}

fn decode_string<'i, I>(values: &mut I) -> Result<String, AxumError>
where
    I: Iterator<Item = &'i axum::http::HeaderValue>,
{
    let value = values.next().ok_or_else(AxumError::invalid)?;
    let Ok(value) = value.to_str() else {
        return Err(AxumError::invalid());
    };
    if value.is_empty() {
        return Err(AxumError::invalid());
    }
    Ok(value.to_string())
}

fn encode_string<E: Extend<axum::http::HeaderValue>>(value: &str, values: &mut E) {
    match axum::http::HeaderValue::from_str(value) {
        Ok(value) => values.extend(std::iter::once(value)),
        Err(_) => tracing::error!("failed to encode identity header"),
    }
}

/// `TypedHeader` for the caller's user id.
///
/// Requests must carry an "x-user-id" entry in the header, set by the
/// upstream auth layer.
#[derive(Debug)]
struct UserIdHeader(String);

impl Header for UserIdHeader {
    fn name() -> &'static axum::http::HeaderName {
        &USER_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        Ok(UserIdHeader(decode_string(values)?))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        encode_string(&self.0, values);
    }
}

/// `TypedHeader` for the caller's role ("admin" or "resident").
#[derive(Debug)]
struct UserRoleHeader(Role);

impl Header for UserRoleHeader {
    fn name() -> &'static axum::http::HeaderName {
        &USER_ROLE_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        let value = decode_string(values)?;
        let Ok(role) = Role::try_from(value.as_str()) else {
            return Err(AxumError::invalid());
        };
        Ok(UserRoleHeader(role))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        encode_string(self.0.as_str(), values);
    }
}

/// `TypedHeader` for the caller's community.
#[derive(Debug)]
struct CommunityIdHeader(String);

impl Header for CommunityIdHeader {
    fn name() -> &'static axum::http::HeaderName {
        &COMMUNITY_ID_HEADER
    }

    fn decode<'i, I>(values: &mut I) -> Result<Self, AxumError>
    where
        Self: Sized,
        I: Iterator<Item = &'i axum::http::HeaderValue>,
    {
        Ok(CommunityIdHeader(decode_string(values)?))
    }

    fn encode<E: Extend<axum::http::HeaderValue>>(&self, values: &mut E) {
        encode_string(&self.0, values);
    }
}

/// Builds the verified identity triple from the three headers and stashes
/// it as a request extension. The headers are set by the upstream auth
/// proxy; requests without a complete triple never reach a handler.
async fn identity(
    user_header: TypedHeader<UserIdHeader>,
    role_header: TypedHeader<UserRoleHeader>,
    community_header: TypedHeader<CommunityIdHeader>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let actor = Actor {
        user_id: user_header.0.0,
        role: role_header.0.0,
        community_id: community_header.0.0,
    };

    request.extensions_mut().insert(actor);
    Ok(next.run(request).await)
}

fn router(state: ServerState) -> Router {
    Router::new()
        .route("/expenses", post(expenses::create))
        .route("/expenses/{id}", patch(expenses::edit))
        .route("/expenses/{id}/distribution", get(queries::distribution))
        .route("/payments", post(payments::pay))
        .route("/payments/pay-all", post(payments::pay_all))
        .route("/payments/refresh-late", post(payments::refresh_late))
        .route("/payments/pending", get(queries::pending))
        .route("/payments/completed", get(queries::completed))
        .route_layer(middleware::from_fn(identity))
        .with_state(state)
}

pub async fn run(engine: Engine) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}
