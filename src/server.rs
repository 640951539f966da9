//! HTTP surface: OAuth connect/callback, catalog, mapping editor and the
//! submission intake.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::OAuthSession;
use crate::catalog::FormCatalog;
use crate::client::{RemoteForm, SubscriptionType};
use crate::error::{ErrorCategory, RelayError};
use crate::mapping::{FieldMappingConfig, MappingEditor, MappingForm};
use crate::relay::{RelayOutcome, RequestContext, SubmissionEvent, SubmissionRelay};

/// Name of the HubSpot tracking cookie.
pub const HUTK_COOKIE: &str = "hubspotutk";

/// Shared handles of the running service.
#[derive(Clone)]
pub struct AppState {
    pub session: Arc<OAuthSession>,
    pub catalog: Arc<FormCatalog>,
    pub editor: Arc<MappingEditor>,
    pub relay: Arc<SubmissionRelay>,
    /// Take the client IP from `X-Forwarded-For` / `X-Real-IP` instead of the
    /// peer address. Only safe behind a proxy that sets those headers.
    pub trust_proxy: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn api_error(err: RelayError) -> (StatusCode, Json<ApiError>) {
    let status = match (&err, err.category()) {
        (RelayError::NotConfigured, _) => StatusCode::PRECONDITION_FAILED,
        (_, ErrorCategory::Authorization) => StatusCode::UNAUTHORIZED,
        (_, ErrorCategory::Remote) => StatusCode::BAD_GATEWAY,
        (_, ErrorCategory::Input) => StatusCode::BAD_REQUEST,
        (_, ErrorCategory::Storage | ErrorCategory::Notification) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    if status.is_server_error() {
        warn!(error = %err, "request failed");
    }
    (
        status,
        Json(ApiError {
            hint: Some(err.admin_hint().to_string()),
            error: err.to_string(),
        }),
    )
}

fn bad_request(message: impl Into<String>) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::BAD_REQUEST,
        Json(ApiError {
            error: message.into(),
            hint: None,
        }),
    )
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/oauth/connect", get(connect))
        .route("/oauth/callback", get(oauth_callback))
        .route("/forms", get(list_forms))
        .route("/subscriptions", get(list_subscriptions))
        .route("/mappings/{form_id}", get(show_mapping).put(save_mapping))
        .route("/submissions", post(submit))
        .with_state(state)
}

/// Bind `addr` and serve until the process stops.
pub async fn serve(addr: &str, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        addr = %listener.local_addr()?,
        trust_proxy = state.trust_proxy,
        "hubspot relay listening"
    );
    axum::serve(
        listener,
        router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

async fn connect(State(state): State<AppState>) -> ApiResult<Redirect> {
    let url = state
        .session
        .authorization_url()
        .map_err(|err| api_error(err.into()))?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
struct OAuthCallbackQuery {
    code: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Serialize)]
struct ConnectionResponse {
    connected: bool,
    expires_at: DateTime<Utc>,
}

async fn oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> ApiResult<Json<ConnectionResponse>> {
    if let Some(error) = query.error {
        return Err(bad_request(format!(
            "oauth provider returned error: {}",
            query.error_description.unwrap_or(error)
        )));
    }
    let code = query
        .code
        .filter(|code| !code.trim().is_empty())
        .ok_or_else(|| bad_request("authorization code missing"))?;
    let token = state
        .session
        .complete_authorization(&code)
        .await
        .map_err(|err| api_error(err.into()))?;
    Ok(Json(ConnectionResponse {
        connected: true,
        expires_at: token.expires_at,
    }))
}

async fn list_forms(State(state): State<AppState>) -> ApiResult<Json<Vec<RemoteForm>>> {
    let forms = state.catalog.list_remote_forms().await.map_err(api_error)?;
    Ok(Json(forms.to_vec()))
}

async fn list_subscriptions(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<SubscriptionType>>> {
    let types = state
        .catalog
        .list_subscription_types()
        .await
        .map_err(api_error)?;
    Ok(Json(types.to_vec()))
}

async fn show_mapping(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
) -> ApiResult<Json<FieldMappingConfig>> {
    match state.editor.load(&form_id).map_err(api_error)? {
        Some(config) => Ok(Json(config)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(ApiError {
                error: format!("no mapping for form `{form_id}`"),
                hint: None,
            }),
        )),
    }
}

async fn save_mapping(
    State(state): State<AppState>,
    Path(form_id): Path<String>,
    Json(form): Json<MappingForm>,
) -> ApiResult<Json<FieldMappingConfig>> {
    let config = state.editor.save(&form_id, form).map_err(api_error)?;
    Ok(Json(config))
}

/// Always `202 Accepted`: delivery problems are reported in the outcome,
/// never as a failed submission.
async fn submit(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(mut event): Json<SubmissionEvent>,
) -> Response {
    event.request = request_context(&headers, peer.ip(), state.trust_proxy);
    let outcome: RelayOutcome = state.relay.relay(&event).await;
    (StatusCode::ACCEPTED, Json(outcome)).into_response()
}

/// Client IP, referer and tracking cookie of the incoming request.
///
/// The client IP is the peer address unless `trust_proxy` is set and the
/// request carries a parseable forwarded address.
pub fn request_context(headers: &HeaderMap, peer: IpAddr, trust_proxy: bool) -> RequestContext {
    let client_ip = trust_proxy
        .then(|| forwarded_ip(headers))
        .flatten()
        .unwrap_or(peer)
        .to_string();
    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let hutk = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == HUTK_COOKIE)
        .map(|(_, value)| value.to_string());
    RequestContext {
        client_ip: Some(client_ip),
        referer,
        hutk,
    }
}

fn forwarded_ip(headers: &HeaderMap) -> Option<IpAddr> {
    header_str(headers, "x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .or_else(|| header_str(headers, "x-real-ip"))
        .and_then(|value| value.parse().ok())
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
