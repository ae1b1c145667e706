//! JSON routes for the document hooks and callable operations under `/api/v1`.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tally_core::domain::boq::{Boq, BoqTotals};
use tally_core::domain::costing_note::CostingNote;
use tally_core::domain::item::{GroupBounds, Item};
use tally_core::domain::opportunity::{Opportunity, Quotation};
use tally_core::domain::stock::StockEntry;
use tally_core::errors::{ApplicationError, InterfaceError};
use tally_core::naming::NamingRequest;
use tracing::{error, warn};
use uuid::Uuid;

use crate::services::{
    BoqLink, DocumentServices, SubmitReport, UpdateCostsReport, UpdateCostsRequest,
};

#[derive(Clone)]
pub struct RpcState {
    services: Arc<DocumentServices>,
    api_token: Option<SecretString>,
}

impl RpcState {
    pub fn new(services: Arc<DocumentServices>, api_token: Option<SecretString>) -> Self {
        Self { services, api_token }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    pub correlation_id: String,
}

#[derive(Debug)]
pub struct ApiError(InterfaceError);

impl From<ApplicationError> for ApiError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = Uuid::new_v4().to_string();
        match &value {
            ApplicationError::Domain(domain) => warn!(
                event_name = "rpc.request.rejected",
                correlation_id = %correlation_id,
                error = %domain,
                "request rejected"
            ),
            other => error!(
                event_name = "rpc.request.failed",
                correlation_id = %correlation_id,
                error = %other,
                "request failed"
            ),
        }
        Self(value.into_interface(correlation_id))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = match &self.0 {
            InterfaceError::BadRequest { .. } => (StatusCode::BAD_REQUEST, "bad_request"),
            InterfaceError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            InterfaceError::ServiceUnavailable { .. } => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
            }
            InterfaceError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        // Infrastructure detail stays in the logs.
        let message = match &self.0 {
            InterfaceError::BadRequest { message, .. } | InterfaceError::NotFound { message, .. } => {
                message.clone()
            }
            other => other.user_message().to_string(),
        };
        let body = ErrorBody {
            error: kind.to_string(),
            message,
            correlation_id: self.0.correlation_id().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

pub fn router(state: RpcState) -> Router {
    let api = Router::new()
        .route("/items", post(insert_item))
        .route("/items/next-code", post(next_item_code))
        .route("/items/{code}", get(get_item))
        .route("/items/{code}/default-warehouse", get(default_warehouse))
        .route("/item-groups/{name}/bounds", get(item_group_bounds))
        .route("/pick-lists/{name}/stock-entry", post(stock_entry_from_pick_list))
        .route("/opportunities", put(save_opportunity))
        .route("/opportunities/{name}", get(get_opportunity))
        .route("/opportunities/{name}/submit", post(submit_opportunity))
        .route("/opportunities/{name}/costing-note", post(costing_note_for_opportunity))
        .route("/opportunities/{name}/quotation", post(quotation_for_opportunity))
        .route("/costing-notes", put(save_costing_note))
        .route("/costing-notes/{name}", get(get_costing_note))
        .route("/costing-notes/{name}/submit", post(submit_costing_note))
        .route("/costing-notes/{name}/rows/{row_id}/boq", post(boq_for_costing_note_row))
        .route("/boqs", put(save_boq))
        .route("/boqs/{name}", get(get_boq))
        .route("/boqs/{name}/submit", post(submit_boq))
        .route("/boqs/{name}/totals", post(recompute_boq_totals))
        .route("/boqs/{name}/update-costs", post(update_boq_costs))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state);

    Router::new().nest("/api/v1", api)
}

async fn require_token(State(state): State<RpcState>, request: Request, next: Next) -> Response {
    let Some(expected) = state.api_token.as_ref() else {
        return next.run(request).await;
    };

    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if presented == Some(expected.expose_secret()) {
        return next.run(request).await;
    }

    let correlation_id = Uuid::new_v4().to_string();
    warn!(
        event_name = "rpc.auth.rejected",
        correlation_id = %correlation_id,
        path = %request.uri().path(),
        "missing or invalid bearer token"
    );
    let body = ErrorBody {
        error: "unauthorized".to_string(),
        message: "A valid bearer token is required.".to_string(),
        correlation_id,
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

#[derive(Debug, Serialize)]
struct ItemCodeResponse {
    item_code: String,
}

async fn next_item_code(
    State(state): State<RpcState>,
    Json(request): Json<NamingRequest>,
) -> ApiResult<ItemCodeResponse> {
    let item_code = state.services.next_item_code(&request).await?;
    Ok(Json(ItemCodeResponse { item_code }))
}

async fn insert_item(
    State(state): State<RpcState>,
    Json(item): Json<Item>,
) -> Result<(StatusCode, Json<Item>), ApiError> {
    let item = state.services.insert_item(item).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

async fn get_item(State(state): State<RpcState>, Path(code): Path<String>) -> ApiResult<Item> {
    Ok(Json(state.services.get_item(&code).await?))
}

#[derive(Debug, Default, Deserialize)]
struct CompanyQuery {
    company: Option<String>,
}

#[derive(Debug, Serialize)]
struct DefaultWarehouseResponse {
    item_code: String,
    default_warehouse: Option<String>,
}

async fn default_warehouse(
    State(state): State<RpcState>,
    Path(code): Path<String>,
    Query(query): Query<CompanyQuery>,
) -> ApiResult<DefaultWarehouseResponse> {
    let default_warehouse =
        state.services.default_warehouse(&code, query.company.as_deref()).await?;
    Ok(Json(DefaultWarehouseResponse { item_code: code, default_warehouse }))
}

async fn item_group_bounds(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<GroupBounds> {
    Ok(Json(state.services.item_group_bounds(&name).await?))
}

async fn stock_entry_from_pick_list(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> Result<(StatusCode, Json<StockEntry>), ApiError> {
    let entry = state.services.stock_entry_from_pick_list(&name).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

async fn save_opportunity(
    State(state): State<RpcState>,
    Json(opportunity): Json<Opportunity>,
) -> ApiResult<Opportunity> {
    Ok(Json(state.services.save_opportunity(opportunity).await?))
}

async fn get_opportunity(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<Opportunity> {
    Ok(Json(state.services.get_opportunity(&name).await?))
}

async fn submit_opportunity(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<Opportunity> {
    Ok(Json(state.services.submit_opportunity(&name).await?))
}

async fn costing_note_for_opportunity(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<CostingNote> {
    Ok(Json(state.services.costing_note_for_opportunity(&name).await?))
}

async fn quotation_for_opportunity(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<Quotation> {
    Ok(Json(state.services.quotation_for_opportunity(&name).await?))
}

async fn save_costing_note(
    State(state): State<RpcState>,
    Json(note): Json<CostingNote>,
) -> ApiResult<CostingNote> {
    Ok(Json(state.services.save_costing_note(note).await?))
}

async fn get_costing_note(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<CostingNote> {
    Ok(Json(state.services.get_costing_note(&name).await?))
}

async fn submit_costing_note(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<SubmitReport<CostingNote>> {
    Ok(Json(state.services.submit_costing_note(&name).await?))
}

async fn boq_for_costing_note_row(
    State(state): State<RpcState>,
    Path((name, row_id)): Path<(String, String)>,
) -> ApiResult<BoqLink> {
    Ok(Json(state.services.boq_for_costing_note_row(&name, &row_id).await?))
}

async fn save_boq(State(state): State<RpcState>, Json(boq): Json<Boq>) -> ApiResult<Boq> {
    Ok(Json(state.services.save_boq(boq).await?))
}

async fn get_boq(State(state): State<RpcState>, Path(name): Path<String>) -> ApiResult<Boq> {
    Ok(Json(state.services.get_boq(&name).await?))
}

async fn submit_boq(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<SubmitReport<Boq>> {
    Ok(Json(state.services.submit_boq(&name).await?))
}

async fn recompute_boq_totals(
    State(state): State<RpcState>,
    Path(name): Path<String>,
) -> ApiResult<BoqTotals> {
    Ok(Json(state.services.recompute_boq_totals(&name).await?))
}

async fn update_boq_costs(
    State(state): State<RpcState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateCostsRequest>,
) -> ApiResult<UpdateCostsReport> {
    Ok(Json(state.services.update_boq_costs(&name, request).await?))
}
