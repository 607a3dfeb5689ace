//! HTTP API for Muster.
//!
//! Reads are public. Mutations must be signed (see [`crate::auth`]) and act
//! as the signing principal. A signed request is accepted at most once.

use crate::auth::{self, Caller};
use crate::error::Error;
use crate::node::NodeState;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use muster_ledger::{
    Gathering, GatheringId, GatheringParams, LedgerError, LedgerStats, MeritAccount,
    PartnerNetwork, Principal, ProofId, ProofRecord, Roster,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

type AppState = Arc<NodeState>;

type ApiResult<T> = std::result::Result<T, ApiError>;

/// Build the API router.
pub fn build_router(state: AppState) -> Router {
    // CORS layer for browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health))
        .route("/ready", get(ready))
        // Partners
        .route("/api/v1/partners", post(register_partner))
        .route("/api/v1/partners/:tag", get(get_partner))
        // Gatherings
        .route("/api/v1/gatherings", get(list_gatherings).post(create_gathering))
        .route("/api/v1/gatherings/:id", get(get_gathering))
        .route("/api/v1/gatherings/:id/roster", get(get_roster))
        .route("/api/v1/gatherings/:id/join", post(join_gathering))
        // Merits and proofs
        .route("/api/v1/merits/claim", post(claim_merits))
        .route("/api/v1/merits/:principal", get(get_merits))
        .route("/api/v1/proofs/:principal", get(get_proofs))
        .route("/api/v1/tokens/:id", get(get_token))
        .route("/api/v1/stats", get(get_stats))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

// --- Errors ---

/// Error body: `{ "code", "error", "message" }`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: u32,
    pub error: String,
    pub message: String,
}

/// An error on its way to becoming an HTTP response.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn new(status: StatusCode, code: u32, error: &str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                error: error.to_string(),
                message: message.into(),
            },
        }
    }

    fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, 400, "BadRequest", message)
    }

    fn not_found(what: String) -> Self {
        Error::Ledger(LedgerError::NotFound(what)).into()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &ErrorBody {
        &self.body
    }
}

/// HTTP status for a ledger error.
pub fn ledger_status(e: &LedgerError) -> StatusCode {
    match e {
        LedgerError::NotFound(_) | LedgerError::NetworkNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::Unauthorized => StatusCode::FORBIDDEN,
        LedgerError::InvalidGatheringParams(_) | LedgerError::InvalidNetworkTag(_) => {
            StatusCode::BAD_REQUEST
        }
        LedgerError::CapacityReached(_)
        | LedgerError::DuplicateRegistration(_)
        | LedgerError::InsufficientMerits { .. }
        | LedgerError::CollectionFull(_) => StatusCode::CONFLICT,
        LedgerError::MeritAwardFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::Ledger(e) => {
                let status = ledger_status(&e);
                Self::new(status, e.code(), e.symbol(), e.to_string())
            }
            Error::Auth(message) => {
                Self::new(StatusCode::UNAUTHORIZED, 401, "Unauthenticated", message)
            }
            other => {
                tracing::error!("Request failed: {}", other);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    500,
                    "Internal",
                    other.to_string(),
                )
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

/// Authenticate the request, then parse its JSON body.
fn signed<T: DeserializeOwned>(
    headers: &HeaderMap,
    method: &Method,
    uri: &Uri,
    body: &Bytes,
) -> ApiResult<(Caller, T)> {
    let caller = auth::authenticate(headers, method, uri.path(), body)?;
    let request = serde_json::from_slice(body)
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))?;
    Ok((caller, request))
}

// --- Health endpoints ---

async fn health() -> &'static str {
    "OK"
}

async fn ready() -> &'static str {
    "OK"
}

// --- Partner endpoints ---

#[derive(Debug, Deserialize)]
struct RegisterPartnerRequest {
    tag: String,
    multiplier: u32,
}

#[derive(Debug, Serialize)]
struct PartnerRegistered {
    tag: String,
}

async fn register_partner(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<PartnerRegistered>)> {
    let (caller, req): (_, RegisterPartnerRequest) = signed(&headers, &method, &uri, &body)?;
    let tag = state
        .service
        .register_partner(&caller, &req.tag, req.multiplier)
        .await?;
    Ok((StatusCode::CREATED, Json(PartnerRegistered { tag })))
}

async fn get_partner(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> ApiResult<Json<PartnerNetwork>> {
    match state.service.partner(&tag).await {
        Some(partner) => Ok(Json(partner)),
        None => Err(ApiError::not_found(format!("partner {}", tag))),
    }
}

// --- Gathering endpoints ---

#[derive(Debug, Serialize)]
struct GatheringCreated {
    id: GatheringId,
}

async fn create_gathering(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<GatheringCreated>)> {
    let (caller, params): (_, GatheringParams) = signed(&headers, &method, &uri, &body)?;
    let id = state.service.create_gathering(&caller, params).await?;
    Ok((StatusCode::CREATED, Json(GatheringCreated { id })))
}

async fn list_gatherings(State(state): State<AppState>) -> Json<Vec<Gathering>> {
    Json(state.service.gatherings().await)
}

async fn get_gathering(
    State(state): State<AppState>,
    Path(id): Path<GatheringId>,
) -> ApiResult<Json<Gathering>> {
    match state.service.gathering(id).await {
        Some(gathering) => Ok(Json(gathering)),
        None => Err(ApiError::not_found(format!("gathering {}", id))),
    }
}

async fn get_roster(
    State(state): State<AppState>,
    Path(id): Path<GatheringId>,
) -> ApiResult<Json<Roster>> {
    if state.service.gathering(id).await.is_none() {
        return Err(ApiError::not_found(format!("gathering {}", id)));
    }
    // A gathering nobody has joined yet has an empty roster.
    let roster = state.service.roster(id).await.unwrap_or(Roster {
        gathering_id: id,
        attendees: Default::default(),
    });
    Ok(Json(roster))
}

#[derive(Debug, Serialize)]
struct Joined {
    gathering_id: GatheringId,
    proof_id: ProofId,
    bonus: u64,
    credited_points: u64,
}

async fn join_gathering(
    State(state): State<AppState>,
    Path(id): Path<GatheringId>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Joined>)> {
    // The body is signed but carries nothing.
    let caller = auth::authenticate(&headers, &method, uri.path(), &body)?;
    let admission = state.service.join_gathering(&caller, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(Joined {
            gathering_id: admission.gathering_id,
            proof_id: admission.proof_id,
            bonus: admission.bonus,
            credited_points: admission.credited_points,
        }),
    ))
}

// --- Merit endpoints ---

#[derive(Debug, Deserialize)]
struct ClaimRequest {
    points: u64,
}

#[derive(Debug, Serialize)]
struct Claimed {
    claimed: u64,
}

async fn claim_merits(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Claimed>> {
    let (caller, req): (_, ClaimRequest) = signed(&headers, &method, &uri, &body)?;
    let claimed = state.service.claim_merits(&caller, req.points).await?;
    Ok(Json(Claimed { claimed }))
}

#[derive(Debug, Serialize)]
struct MeritStatus {
    #[serde(flatten)]
    account: MeritAccount,
    available: u64,
}

async fn get_merits(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> ApiResult<Json<MeritStatus>> {
    let owner = Principal::new(principal);
    match state.service.merits(&owner).await {
        Some(account) => Ok(Json(MeritStatus {
            available: account.available(),
            account,
        })),
        None => Err(ApiError::not_found(format!("merit account {}", owner))),
    }
}

async fn get_proofs(
    State(state): State<AppState>,
    Path(principal): Path<String>,
) -> ApiResult<Json<ProofRecord>> {
    let owner = Principal::new(principal);
    match state.service.proofs(&owner).await {
        Some(record) => Ok(Json(record)),
        None => Err(ApiError::not_found(format!("proof record {}", owner))),
    }
}

#[derive(Debug, Serialize)]
struct TokenStatus {
    id: ProofId,
    owner: Principal,
}

async fn get_token(
    State(state): State<AppState>,
    Path(id): Path<ProofId>,
) -> ApiResult<Json<TokenStatus>> {
    match state.service.token_owner(id).await {
        Some(owner) => Ok(Json(TokenStatus { id, owner })),
        None => Err(ApiError::not_found(format!("proof token {}", id))),
    }
}

async fn get_stats(State(state): State<AppState>) -> Json<LedgerStats> {
    Json(state.service.stats().await)
}
