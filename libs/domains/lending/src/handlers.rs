use axum::{
    Json, Router,
    extract::{FromRequestParts, State},
    http::{StatusCode, request::Parts},
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use axum_helpers::{
    ApiResponse, ErrorEnvelope, UuidPath, ValidatedJson,
    errors::responses::{
        BadRequestResponse, ConflictResponse, InternalServerErrorResponse, NotFoundResponse,
        ServiceUnavailableResponse,
    },
    idempotency::{IdempotencyLayer, idempotency_guard},
};
use std::convert::Infallible;
use std::sync::Arc;
use utoipa::OpenApi;

use crate::cache::Cache;
use crate::error::LendingResult;
use crate::events::EventSink;
use crate::models::{AddItem, AddedItem, ItemStatus, ItemSummary};
use crate::repository::ItemRepository;
use crate::service::LendingService;

pub const BORROWER_HEADER: &str = "x-borrower";
pub const DEFAULT_BORROWER: &str = "anonymous";

/// OpenAPI documentation for the lending endpoints
#[derive(OpenApi)]
#[openapi(
    paths(list_items, add_item, check_out_item, return_item),
    components(
        schemas(AddItem, AddedItem, ItemSummary, ItemStatus, ErrorEnvelope),
        responses(
            BadRequestResponse,
            NotFoundResponse,
            ConflictResponse,
            ServiceUnavailableResponse,
            InternalServerErrorResponse
        )
    ),
    tags(
        (name = "Items", description = "Lending catalog. Mutating endpoints require an Idempotency-Key header")
    )
)]
pub struct ApiDoc;

/// Create the items router. Mutating routes sit behind the idempotency guard.
pub fn router<R, C, E>(service: LendingService<R, C, E>, idempotency: IdempotencyLayer) -> Router
where
    R: ItemRepository + 'static,
    C: Cache + 'static,
    E: EventSink + 'static,
{
    let shared_service = Arc::new(service);

    Router::new()
        .route("/", get(list_items).post(add_item))
        .route("/{id}/checkout", post(check_out_item))
        .route("/{id}/return", post(return_item))
        .with_state(shared_service)
        .layer(middleware::from_fn_with_state(idempotency, idempotency_guard))
}

/// Borrower named by the `x-borrower` header, `anonymous` when absent or blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Borrower(pub String);

impl<S> FromRequestParts<S> for Borrower
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let borrower = parts
            .headers
            .get(BORROWER_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_BORROWER);

        Ok(Borrower(borrower.to_string()))
    }
}

/// List all items
#[utoipa::path(
    get,
    path = "",
    tag = "Items",
    responses(
        (status = 200, description = "Items retrieved successfully", body = ApiResponse<Vec<ItemSummary>>),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn list_items<R, C, E>(
    State(service): State<Arc<LendingService<R, C, E>>>,
) -> LendingResult<Json<ApiResponse<Vec<ItemSummary>>>>
where
    R: ItemRepository,
    C: Cache,
    E: EventSink,
{
    let items = service.list_items().await?;
    Ok(Json(ApiResponse::ok("Items retrieved successfully", items)))
}

/// Add an item to the catalog
#[utoipa::path(
    post,
    path = "",
    tag = "Items",
    params(
        ("Idempotency-Key" = String, Header, description = "Client-chosen key; retries with the same key replay the first response")
    ),
    request_body = AddItem,
    responses(
        (status = 201, description = "New item added successfully", body = ApiResponse<AddedItem>),
        (status = 400, response = BadRequestResponse),
        (status = 409, response = ConflictResponse),
        (status = 503, response = ServiceUnavailableResponse),
        (status = 500, response = InternalServerErrorResponse)
    )
)]
async fn add_item<R, C, E>(
    State(service): State<Arc<LendingService<R, C, E>>>,
    ValidatedJson(input): ValidatedJson<AddItem>,
) -> LendingResult<impl IntoResponse>
where
    R: ItemRepository,
    C: Cache,
    E: EventSink,
{
    let added = service.add_item(input).await?;
    Ok(ApiResponse::ok("New item added successfully", added).with_status(StatusCode::CREATED))
}

/// Check out an available item
#[utoipa::path(
    post,
    path = "/{id}/checkout",
    tag = "Items",
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen key; retries with the same key replay the first response"),
        ("x-borrower" = Option<String>, Header, description = "Who is borrowing the item, defaults to `anonymous`")
    ),
    responses(
        (status = 200, description = "Item checked out successfully", body = ApiResponse<ItemSummary>),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn check_out_item<R, C, E>(
    State(service): State<Arc<LendingService<R, C, E>>>,
    UuidPath(id): UuidPath,
    Borrower(borrower): Borrower,
) -> LendingResult<Json<ApiResponse<ItemSummary>>>
where
    R: ItemRepository,
    C: Cache,
    E: EventSink,
{
    let item = service.check_out_item(id, &borrower).await?;
    Ok(Json(ApiResponse::ok("Item checked out successfully", item)))
}

/// Return a checked-out item
#[utoipa::path(
    post,
    path = "/{id}/return",
    tag = "Items",
    params(
        ("id" = Uuid, Path, description = "Item ID"),
        ("Idempotency-Key" = String, Header, description = "Client-chosen key; retries with the same key replay the first response")
    ),
    responses(
        (status = 200, description = "Item returned successfully", body = ApiResponse<ItemSummary>),
        (status = 400, response = BadRequestResponse),
        (status = 404, response = NotFoundResponse),
        (status = 409, response = ConflictResponse),
        (status = 503, response = ServiceUnavailableResponse)
    )
)]
async fn return_item<R, C, E>(
    State(service): State<Arc<LendingService<R, C, E>>>,
    UuidPath(id): UuidPath,
) -> LendingResult<Json<ApiResponse<ItemSummary>>>
where
    R: ItemRepository,
    C: Cache,
    E: EventSink,
{
    let item = service.return_item(id).await?;
    Ok(Json(ApiResponse::ok("Item returned successfully", item)))
}
