//! REST API for the loading service.
//!
//! Exposes box recommendation, bundling, pricing, single-container packing
//! (plain and as a live event stream) and fleet runs over HTTP.
//! Uses Axum as the web framework and supports CORS.

use std::sync::{Arc, OnceLock};

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{
    Router,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::cors::{Any, CorsLayer};
use utoipa::{OpenApi, ToSchema};

use crate::assignment::{ClientAssignments, FleetReport, run_fleet};
use crate::bundle::{BundleConfig, BundleError, BundleOutcome, replace_with_bundle};
use crate::cache::PackingCache;
use crate::catalog::{default_boxes, default_containers};
use crate::config::{ApiConfig, AppConfig};
use crate::ids::RandomIds;
use crate::intake::{
    AttributeOracle, OfflineOracle, OracleError, TextEstimate, draft_item_from_text, resolve_text,
};
use crate::model::{
    BoxType, ClientId, Container, Item, ItemId, Package, ValidationError, expand_item,
};
use crate::packer::{
    PackEvent, PackingConfig, PackingResult, UnpackedEntry, pack_container_with_progress,
};
use crate::pricing::{ClientSummary, PricingCalculator, PricingError};
use crate::recommender::{BoxRecommendation, recommend_box};

/// Shared handler state.
#[derive(Clone)]
pub struct ApiState {
    pricing: PricingCalculator,
    bundle: BundleConfig,
    packing: PackingConfig,
    cache: Arc<PackingCache>,
    oracle: Arc<dyn AttributeOracle + Send + Sync>,
}

impl ApiState {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            pricing: PricingCalculator::new(config.pricing.clone()),
            bundle: config.bundle,
            packing: config.packing,
            cache: Arc::new(PackingCache::new(config.cache_capacity)),
            oracle: Arc::new(OfflineOracle),
        }
    }

    /// Replaces the estimation service used by `/draft`.
    pub fn with_oracle(mut self, oracle: Arc<dyn AttributeOracle + Send + Sync>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Packs on the blocking pool through the shared cache.
    async fn pack(
        &self,
        packages: Vec<Package>,
        container: Container,
    ) -> Result<PackingResult, tokio::task::JoinError> {
        let cache = Arc::clone(&self.cache);
        let config = self.packing;
        tokio::task::spawn_blocking(move || cache.get_or_pack(packages, &container, &config)).await
    }
}

static OPENAPI_DOC: OnceLock<utoipa::openapi::OpenApi> = OnceLock::new();

// SRI hashes verified against https://unpkg.com/swagger-ui-dist@5.17.14/ on 2025-10-29.
const SWAGGER_UI_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
    <head>
        <meta charset="utf-8" />
        <title>load-it-now API Docs</title>
        <link
            rel="stylesheet"
            href="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui.css"
            integrity="sha384-wxLW6kwyHktdDGr6Pv1zgm/VGJh99lfUbzSn6HNHBENZlCN7W602k9VkGdxuFvPn"
            crossorigin="anonymous"
        />
    </head>
    <body>
        <div id="swagger-ui"></div>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-bundle.js"
            integrity="sha384-wmyclcVGX/WhUkdkATwhaK1X1JtiNrr2EoYJ+diV3vj4v6OC5yCeSu+yW13SYJep"
            crossorigin="anonymous"
        ></script>
        <script
            src="https://unpkg.com/swagger-ui-dist@5.17.14/swagger-ui-standalone-preset.js"
            integrity="sha384-2YH8WDRaj7V2OqU/trsmzSagmk/E2SutiCsGkdgoQwC9pNUJV1u/141DHB6jgs8t"
            crossorigin="anonymous"
        ></script>
        <script>
            window.onload = function () {
                const ui = SwaggerUIBundle({
                    url: "/docs/openapi.json",
                    dom_id: "#swagger-ui",
                    presets: [SwaggerUIBundle.presets.apis, SwaggerUIStandalonePreset],
                    layout: "StandaloneLayout",
                });
                window.ui = ui;
            };
        </script>
    </body>
    </html>"##;

fn openapi_doc() -> &'static utoipa::openapi::OpenApi {
    OPENAPI_DOC.get_or_init(ApiDoc::openapi)
}

/// Request for a box recommendation.
///
/// Without `catalog` the default box catalog is used.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "item": {
            "id": "lamp",
            "name": "Desk lamp",
            "weight_kg": 4.0,
            "dimensions": {"length": 40.0, "width": 30.0, "height": 20.0},
            "client_id": "#4821"
        }
    })
)]
pub struct RecommendRequest {
    pub item: Item,
    #[serde(default)]
    #[schema(nullable = true)]
    pub catalog: Option<Vec<BoxType>>,
}

#[derive(Serialize, ToSchema)]
pub struct RecommendResponse {
    /// `null` when no catalog box fits; the item then needs a custom box.
    pub recommendation: Option<BoxRecommendation>,
}

/// Working set plus the ids to merge into one bundle.
#[derive(Deserialize, ToSchema)]
pub struct BundleRequest {
    pub items: Vec<Item>,
    pub selected: Vec<ItemId>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub catalog: Option<Vec<BoxType>>,
}

#[derive(Serialize, ToSchema)]
pub struct BundleResponse {
    /// Working set with the selected items replaced by the bundle.
    pub items: Vec<Item>,
    pub outcome: BundleOutcome,
}

#[derive(Deserialize, ToSchema)]
pub struct QuoteRequest {
    pub items: Vec<Item>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub catalog: Option<Vec<BoxType>>,
}

/// One container and the items to load into it.
#[derive(Deserialize, ToSchema)]
#[schema(
    example = json!({
        "container": {
            "id": "c1",
            "name": "Standard Van (Small)",
            "dimensions": {"length": 240.0, "width": 140.0, "height": 140.0},
            "max_weight_kg": 800.0,
            "is_active": true
        },
        "items": [{
            "id": "crate",
            "name": "Crate",
            "weight_kg": 10.0,
            "dimensions": {"length": 90.0, "width": 90.0, "height": 90.0},
            "box_choice": {"kind": "custom", "dimensions": {"length": 100.0, "width": 100.0, "height": 100.0}},
            "quantity": 3,
            "client_id": "#1000"
        }]
    })
)]
pub struct PackRequest {
    pub container: Container,
    pub items: Vec<Item>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub catalog: Option<Vec<BoxType>>,
}

#[derive(Serialize, ToSchema)]
pub struct PackResponse {
    pub result: PackingResult,
    pub is_complete: bool,
}

/// Whole shipment against a fleet.
///
/// Without `fleet` the default fleet is used. `assignments` carries the
/// routing from the previous run; clients without a route are filled in.
#[derive(Deserialize, ToSchema)]
pub struct FleetRequest {
    pub items: Vec<Item>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub fleet: Option<Vec<Container>>,
    #[serde(default)]
    #[schema(nullable = true)]
    pub catalog: Option<Vec<BoxType>>,
    #[serde(default)]
    pub assignments: ClientAssignments,
}

/// Product description to turn into a draft item.
#[derive(Deserialize, ToSchema)]
pub struct DraftRequest {
    pub query: String,
    pub client_id: ClientId,
    #[serde(default)]
    #[schema(nullable = true)]
    pub catalog: Option<Vec<BoxType>>,
}

#[derive(Serialize, ToSchema)]
pub struct DraftResponse {
    pub item: Item,
    pub estimate: TextEstimate,
}

#[derive(Serialize, ToSchema)]
struct ErrorResponse {
    error: String,
    details: String,
}

impl ErrorResponse {
    fn new(error: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            details: details.into(),
        }
    }
}

fn error_response(
    status: StatusCode,
    error: impl Into<String>,
    details: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse::new(error, details))).into_response()
}

fn json_deserialize_error(err: JsonRejection) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid JSON data",
        err.to_string(),
    )
}

fn worker_error(err: tokio::task::JoinError) -> Response {
    tracing::error!(error = %err, "packing task failed");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "Packing failed",
        err.to_string(),
    )
}

fn validation_error(details: impl Into<String>) -> Response {
    error_response(
        StatusCode::UNPROCESSABLE_ENTITY,
        "Invalid input data",
        details,
    )
}

/// Reasons a request body is refused after parsing.
#[derive(Debug)]
enum RequestError {
    InvalidCatalog(ValidationError),
    InvalidContainer(ValidationError),
    InvalidItem(ValidationError),
    Bundle(BundleError),
    Pricing(PricingError),
    Oracle(OracleError),
}

impl RequestError {
    fn into_response(self) -> Response {
        let (error, details) = match self {
            RequestError::InvalidCatalog(err) => ("Invalid box catalog", err.to_string()),
            RequestError::InvalidContainer(err) => {
                ("Invalid container configuration", err.to_string())
            }
            RequestError::InvalidItem(err) => ("Invalid input data", err.to_string()),
            RequestError::Bundle(err) => ("Bundle not possible", err.to_string()),
            RequestError::Pricing(err) => ("Pricing not possible", err.to_string()),
            RequestError::Oracle(err) => ("Draft not possible", err.to_string()),
        };
        error_response(StatusCode::UNPROCESSABLE_ENTITY, error, details)
    }
}

fn parse_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    match payload {
        Ok(Json(payload)) => Ok(payload),
        Err(err) => Err(json_deserialize_error(err)),
    }
}

fn checked_catalog(catalog: Option<Vec<BoxType>>) -> Result<Vec<BoxType>, RequestError> {
    let catalog = catalog.unwrap_or_else(default_boxes);
    for entry in &catalog {
        entry.validate().map_err(RequestError::InvalidCatalog)?;
    }
    Ok(catalog)
}

fn check_items(items: &[Item]) -> Result<(), RequestError> {
    items
        .iter()
        .try_for_each(Item::validate)
        .map_err(RequestError::InvalidItem)
}

/// Expands items into packages; unresolvable items become unpacked entries.
fn expand_all(items: &[Item], catalog: &[BoxType]) -> (Vec<Package>, Vec<UnpackedEntry>) {
    let mut packages = Vec::new();
    let mut unresolved = Vec::new();
    for item in items {
        match expand_item(item, catalog) {
            Ok(expanded) => packages.extend(expanded),
            Err(err) => unresolved.push(UnpackedEntry::from_unresolved(item, &err)),
        }
    }
    (packages, unresolved)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handle_recommend,
        handle_bundle,
        handle_quote,
        handle_pack,
        handle_pack_stream,
        handle_fleet,
        handle_draft
    ),
    components(
        schemas(
            RecommendRequest,
            RecommendResponse,
            BundleRequest,
            BundleResponse,
            QuoteRequest,
            ClientSummary,
            PackRequest,
            PackResponse,
            FleetRequest,
            FleetReport,
            DraftRequest,
            DraftResponse,
            ErrorResponse,
            Item,
            BoxType,
            Container,
            PackingResult
        )
    ),
    tags(
        (name = "packaging", description = "Box recommendation, bundling and pricing"),
        (name = "loading", description = "Container and fleet loading")
    )
)]
struct ApiDoc;

/// Builds the router with all endpoints.
pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/recommend", post(handle_recommend))
        .route("/bundle", post(handle_bundle))
        .route("/quote", post(handle_quote))
        .route("/pack", post(handle_pack))
        .route("/pack_stream", post(handle_pack_stream))
        .route("/fleet", post(handle_fleet))
        .route("/draft", post(handle_draft))
        // API documentation
        .route("/docs/openapi.json", get(serve_openapi_json))
        .route("/docs", get(serve_openapi_ui))
        .layer(cors)
        .with_state(state)
}

/// Starts the API server and blocks until it terminates.
pub async fn start_api_server(config: &ApiConfig, state: ApiState) -> std::io::Result<()> {
    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        "Server running on http://{}:{}",
        config.display_host(),
        config.port()
    );
    if config.binds_to_all_interfaces() {
        tracing::info!("Local access: http://localhost:{}", config.port());
    }
    tracing::info!(
        "Endpoints: POST /recommend /bundle /quote /pack /pack_stream /fleet /draft, GET /docs"
    );

    axum::serve(listener, router(state)).await
}

/// Handler for POST /recommend.
#[utoipa::path(
    post,
    path = "/recommend",
    request_body = RecommendRequest,
    responses(
        (status = 200, description = "Smallest fitting box, if any", body = RecommendResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid item or catalog", body = ErrorResponse)
    ),
    tag = "packaging"
)]
async fn handle_recommend(
    State(state): State<ApiState>,
    payload: Result<Json<RecommendRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let catalog = match checked_catalog(request.catalog) {
        Ok(catalog) => catalog,
        Err(err) => return err.into_response(),
    };
    if let Err(err) = request.item.validate() {
        return validation_error(err.to_string());
    }

    let recommendation = recommend_box(&request.item, &catalog, &state.pricing);
    tracing::info!(
        item = %request.item.id,
        box_id = recommendation.as_ref().map(|r| r.box_type.id.as_str()).unwrap_or("custom"),
        "recommend request"
    );
    (StatusCode::OK, Json(RecommendResponse { recommendation })).into_response()
}

/// Handler for POST /bundle.
#[utoipa::path(
    post,
    path = "/bundle",
    request_body = BundleRequest,
    responses(
        (status = 200, description = "Updated working set and the bundle", body = BundleResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid selection", body = ErrorResponse)
    ),
    tag = "packaging"
)]
async fn handle_bundle(
    State(state): State<ApiState>,
    payload: Result<Json<BundleRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let result = checked_catalog(request.catalog).and_then(|catalog| {
        check_items(&request.items)?;
        let mut items = request.items;
        let mut ids = RandomIds::new(StdRng::from_entropy());
        let outcome = replace_with_bundle(
            &mut items,
            &request.selected,
            &catalog,
            &state.bundle,
            &state.pricing,
            &mut ids,
        )
        .map_err(RequestError::Bundle)?;
        Ok(BundleResponse { items, outcome })
    });

    match result {
        Ok(response) => {
            tracing::info!(
                bundle = %response.outcome.bundle.id,
                merged = request.selected.len(),
                "bundle request"
            );
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

/// Handler for POST /quote.
#[utoipa::path(
    post,
    path = "/quote",
    request_body = QuoteRequest,
    responses(
        (status = 200, description = "Per-item quotes and totals", body = ClientSummary),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid items or unknown boxes", body = ErrorResponse)
    ),
    tag = "packaging"
)]
async fn handle_quote(
    State(state): State<ApiState>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let result = checked_catalog(request.catalog).and_then(|catalog| {
        check_items(&request.items)?;
        state
            .pricing
            .client_summary(&request.items, &catalog)
            .map_err(RequestError::Pricing)
    });

    match result {
        Ok(summary) => {
            tracing::info!(
                items = request.items.len(),
                total = summary.total_cost,
                "quote request"
            );
            (StatusCode::OK, Json(summary)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

struct ValidatedPackRequest {
    container: Container,
    packages: Vec<Package>,
    unresolved: Vec<UnpackedEntry>,
    item_count: usize,
}

fn parse_pack_request(
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Result<ValidatedPackRequest, Response> {
    let request = parse_json(payload)?;
    let checked = checked_catalog(request.catalog).and_then(|catalog| {
        request
            .container
            .validate()
            .map_err(RequestError::InvalidContainer)?;
        check_items(&request.items)?;
        Ok(catalog)
    });
    let catalog = checked.map_err(RequestError::into_response)?;

    let (packages, unresolved) = expand_all(&request.items, &catalog);
    Ok(ValidatedPackRequest {
        container: request.container,
        packages,
        unresolved,
        item_count: request.items.len(),
    })
}

/// Handler for POST /pack.
///
/// Loads the items into one container. Items whose box cannot be resolved
/// are listed as unpacked.
#[utoipa::path(
    post,
    path = "/pack",
    request_body = PackRequest,
    responses(
        (status = 200, description = "Placements and overflow", body = PackResponse),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "loading"
)]
async fn handle_pack(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    tracing::info!(
        container = %request.container.id,
        items = request.item_count,
        packages = request.packages.len(),
        "pack request"
    );
    let mut result = match state.pack(request.packages, request.container).await {
        Ok(result) => result,
        Err(err) => return worker_error(err),
    };
    result.unpacked.extend(request.unresolved);
    tracing::info!(
        placed = result.packed.len(),
        unpacked = result.unpacked.len(),
        "pack result"
    );

    let response = PackResponse {
        is_complete: result.is_complete(),
        result,
    };
    (StatusCode::OK, Json(response)).into_response()
}

/// Handler for POST /pack_stream endpoint (SSE).
///
/// Streams pack events in real-time as Server-Sent Events (text/event-stream).
/// Items without a resolvable box are reported as rejected right after
/// `PackingStarted` and counted in the final `unpacked` figure.
#[utoipa::path(
    post,
    path = "/pack_stream",
    request_body = PackRequest,
    responses(
        (
            status = 200,
            description = "Streams pack events in real-time",
            content_type = "text/event-stream",
            body = String
        ),
        (
            status = UNPROCESSABLE_ENTITY,
            description = "Invalid request or container configuration",
            body = ErrorResponse
        )
    ),
    tag = "loading"
)]
async fn handle_pack_stream(
    State(state): State<ApiState>,
    payload: Result<Json<PackRequest>, JsonRejection>,
) -> Response {
    let request = match parse_pack_request(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    tracing::info!(
        container = %request.container.id,
        items = request.item_count,
        packages = request.packages.len(),
        unresolved = request.unresolved.len(),
        "pack stream request"
    );

    let (tx, rx) = mpsc::channel::<String>(32);
    let config = state.packing;
    let ValidatedPackRequest {
        container,
        packages,
        unresolved,
        ..
    } = request;

    tokio::task::spawn_blocking(move || {
        let mut open = true;
        let mut send = |evt: &PackEvent| {
            if !open {
                return;
            }
            if let Ok(json) = serde_json::to_string(evt) {
                // Receiver has closed the stream; remaining events are discarded.
                open = tx.blocking_send(json).is_ok();
            }
        };

        pack_container_with_progress(packages, &container, &config, |evt| match evt {
            PackEvent::PackingStarted { .. } => {
                send(evt);
                for entry in &unresolved {
                    send(&PackEvent::rejected(entry));
                }
            }
            PackEvent::Finished { placed, unpacked } => send(&PackEvent::Finished {
                placed: *placed,
                unpacked: unpacked + unresolved.len(),
            }),
            _ => send(evt),
        });
    });

    let stream = ReceiverStream::new(rx)
        .map(|msg| Ok::<_, std::convert::Infallible>(Event::default().data(msg)));
    Sse::new(stream)
        .keep_alive(
            KeepAlive::new()
                .interval(std::time::Duration::from_secs(10))
                .text("keep-alive"),
        )
        .into_response()
}

/// Handler for POST /fleet.
#[utoipa::path(
    post,
    path = "/fleet",
    request_body = FleetRequest,
    responses(
        (status = 200, description = "Per-container runs and fleet totals", body = FleetReport),
        (status = UNPROCESSABLE_ENTITY, description = "Invalid items, fleet or catalog", body = ErrorResponse)
    ),
    tag = "loading"
)]
async fn handle_fleet(
    State(state): State<ApiState>,
    payload: Result<Json<FleetRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let fleet = request.fleet.unwrap_or_else(default_containers);
    let checked = checked_catalog(request.catalog).and_then(|catalog| {
        fleet
            .iter()
            .try_for_each(Container::validate)
            .map_err(RequestError::InvalidContainer)?;
        check_items(&request.items)?;
        Ok(catalog)
    });
    let catalog = match checked {
        Ok(catalog) => catalog,
        Err(err) => return err.into_response(),
    };

    let items = request.items;
    let mut assignments = request.assignments;
    let cache = Arc::clone(&state.cache);
    let config = state.packing;
    let item_count = items.len();
    let run = tokio::task::spawn_blocking(move || {
        run_fleet(
            &items,
            &catalog,
            &fleet,
            &mut assignments,
            &config,
            Some(cache.as_ref()),
        )
    })
    .await;
    let report = match run {
        Ok(report) => report,
        Err(err) => return worker_error(err),
    };
    tracing::info!(
        items = item_count,
        containers = report.fleet.active_containers,
        packed = report.fleet.total_packed,
        unpacked = report.fleet.total_unpacked,
        "fleet request"
    );

    (StatusCode::OK, Json(report)).into_response()
}

/// Handler for POST /draft.
///
/// Asks the estimation service about a product description and returns a
/// draft item with the best catalog box. Falls back to a canonical estimate
/// when the service is unavailable.
#[utoipa::path(
    post,
    path = "/draft",
    request_body = DraftRequest,
    responses(
        (status = 200, description = "Draft item and the estimate behind it", body = DraftResponse),
        (status = UNPROCESSABLE_ENTITY, description = "Empty query or invalid catalog", body = ErrorResponse)
    ),
    tag = "packaging"
)]
async fn handle_draft(
    State(state): State<ApiState>,
    payload: Result<Json<DraftRequest>, JsonRejection>,
) -> Response {
    let request = match parse_json(payload) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let result = checked_catalog(request.catalog).and_then(|catalog| {
        if request.query.trim().is_empty() {
            return Err(RequestError::Oracle(OracleError::EmptyQuery));
        }
        let estimate = resolve_text(state.oracle.as_ref(), &request.query);
        let mut ids = RandomIds::new(StdRng::from_entropy());
        let item = draft_item_from_text(
            &request.query,
            &estimate,
            &request.client_id,
            &catalog,
            &state.pricing,
            &mut ids,
        )
        .map_err(RequestError::Oracle)?;
        Ok(DraftResponse { item, estimate })
    });

    match result {
        Ok(response) => {
            tracing::info!(item = %response.item.id, "draft request");
            (StatusCode::OK, Json(response)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn serve_openapi_json() -> impl IntoResponse {
    Json(openapi_doc())
}

async fn serve_openapi_ui() -> impl IntoResponse {
    Html(SWAGGER_UI_HTML)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use serde_json::Value;
    use tower::ServiceExt;

    fn app() -> Router {
        router(ApiState::from_config(&AppConfig::default()))
    }

    async fn post_raw(app: Router, path: &str, body: Value) -> (StatusCode, String) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(path)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    async fn post_json(path: &str, body: Value) -> (StatusCode, Value) {
        post_json_to(app(), path, body).await
    }

    async fn post_json_to(app: Router, path: &str, body: Value) -> (StatusCode, Value) {
        let (status, text) = post_raw(app, path, body).await;
        (status, serde_json::from_str(&text).unwrap_or(Value::Null))
    }

    fn van() -> Value {
        json!({
            "id": "c1",
            "name": "Van",
            "dimensions": {"length": 240.0, "width": 140.0, "height": 140.0},
            "max_weight_kg": 800.0,
            "is_active": true
        })
    }

    fn lamp() -> Value {
        json!({
            "id": "lamp",
            "name": "Desk lamp",
            "weight_kg": 4.0,
            "dimensions": {"length": 40.0, "width": 30.0, "height": 20.0},
            "client_id": "#1"
        })
    }

    #[test]
    fn openapi_doc_lists_expected_paths() {
        let doc = openapi_doc();
        let paths = &doc.paths.paths;
        for path in [
            "/recommend",
            "/bundle",
            "/quote",
            "/pack",
            "/pack_stream",
            "/fleet",
            "/draft",
        ] {
            assert!(
                paths.contains_key(path),
                "OpenAPI documentation is missing the {} path",
                path
            );
        }
    }

    #[test]
    fn openapi_doc_contains_key_schemas() {
        let doc = openapi_doc();
        let components = doc
            .components
            .as_ref()
            .expect("OpenAPI documentation contains no components");
        let schemas = &components.schemas;
        for name in ["PackRequest", "PackResponse", "FleetReport", "ErrorResponse", "Item"] {
            assert!(
                schemas.contains_key(name),
                "Expected schema '{}' is missing from the OpenAPI document",
                name
            );
        }
    }

    #[test]
    fn pack_request_uses_default_catalog_when_absent() {
        let json = json!({
            "container": {
                "id": "c1",
                "name": "Van",
                "dimensions": {"length": 240.0, "width": 140.0, "height": 140.0},
                "max_weight_kg": 800.0
            },
            "items": [lamp()]
        });
        let request: PackRequest = serde_json::from_value(json).expect("Should parse valid JSON");
        assert!(request.catalog.is_none());
        assert!(!request.container.is_active);
        assert_eq!(request.items[0].quantity, 1);
    }

    #[test]
    fn custom_box_without_dimensions_is_rejected_by_parser() {
        let mut item = lamp();
        item["box_choice"] = json!({"kind": "custom"});
        let json = json!({"item": item});
        assert!(serde_json::from_value::<RecommendRequest>(json).is_err());
    }

    #[tokio::test]
    async fn recommend_selects_medium_box() {
        let (status, body) = post_json("/recommend", json!({"item": lamp()})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["recommendation"]["box"]["id"], "b2");
    }

    #[tokio::test]
    async fn recommend_reports_no_fit_as_null() {
        let mut item = lamp();
        item["dimensions"] = json!({"length": 300.0, "width": 10.0, "height": 10.0});
        let (status, body) = post_json("/recommend", json!({"item": item})).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["recommendation"].is_null());
    }

    #[tokio::test]
    async fn invalid_item_is_unprocessable() {
        let mut item = lamp();
        item["dimensions"]["height"] = json!(0.0);
        let (status, body) = post_json("/recommend", json!({"item": item})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid input data");
    }

    #[tokio::test]
    async fn malformed_json_is_unprocessable() {
        let (status, body) = post_json("/pack", json!({"items": []})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Invalid JSON data");
    }

    #[tokio::test]
    async fn pack_reports_overflow_and_unresolved_items() {
        let crate_item = json!({
            "id": "crate",
            "name": "Crate",
            "weight_kg": 10.0,
            "dimensions": {"length": 90.0, "width": 90.0, "height": 90.0},
            "box_choice": {"kind": "custom", "dimensions": {"length": 100.0, "width": 100.0, "height": 100.0}},
            "quantity": 3,
            "client_id": "#1"
        });
        let (status, body) = post_json(
            "/pack",
            json!({
                "container": {
                    "id": "c1",
                    "name": "Van",
                    "dimensions": {"length": 240.0, "width": 140.0, "height": 140.0},
                    "max_weight_kg": 800.0,
                    "is_active": true
                },
                "items": [crate_item, lamp()]
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["is_complete"], false);
        assert_eq!(body["result"]["packed"].as_array().unwrap().len(), 2);
        let unpacked = body["result"]["unpacked"].as_array().unwrap();
        assert_eq!(unpacked.len(), 2);
        assert_eq!(unpacked[0]["reason"], "height_exhausted");
        assert_eq!(unpacked[1]["reason"], "no_box_assigned");
    }

    #[tokio::test]
    async fn bundle_replaces_selection() {
        let mut other = lamp();
        other["id"] = json!("mug");
        let (status, body) = post_json(
            "/bundle",
            json!({"items": [lamp(), other], "selected": ["lamp", "mug"]}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let items = body["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], body["outcome"]["bundle"]["id"]);
    }

    #[tokio::test]
    async fn bundle_of_one_is_unprocessable() {
        let (status, body) =
            post_json("/bundle", json!({"items": [lamp()], "selected": ["lamp"]})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Bundle not possible");
    }

    #[tokio::test]
    async fn quote_rejects_unknown_box() {
        let mut item = lamp();
        item["box_choice"] = json!({"kind": "catalog", "id": "nope"});
        let (status, body) = post_json("/quote", json!({"items": [item]})).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"], "Pricing not possible");
    }

    #[tokio::test]
    async fn fleet_routes_new_clients_to_first_container() {
        let mut item = lamp();
        item["box_choice"] = json!({"kind": "catalog", "id": "b2"});
        let (status, body) = post_json("/fleet", json!({"items": [item]})).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["assignments"]["#1"], "c1");
        assert_eq!(body["fleet"]["active_containers"], 2);
        assert_eq!(body["fleet"]["total_packed"], 1);
    }

    #[tokio::test]
    async fn draft_falls_back_without_oracle() {
        let (status, body) = post_json(
            "/draft",
            json!({"query": "Bookshelf", "client_id": "#7"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["item"]["name"], "Bookshelf");
        assert_eq!(body["estimate"]["weight_kg"], 5.5);
        assert_eq!(body["item"]["box_choice"]["id"], "b2");
    }

    #[tokio::test]
    async fn pack_stream_reports_items_without_box() {
        let mut boxed = lamp();
        boxed["id"] = json!("boxed");
        boxed["dimensions"] = json!({"length": 20.0, "width": 20.0, "height": 20.0});
        boxed["box_choice"] = json!({"kind": "catalog", "id": "b1"});
        let body = json!({"container": van(), "items": [boxed, lamp()]});

        let (status, text) = post_raw(app(), "/pack_stream", body.clone()).await;
        assert_eq!(status, StatusCode::OK);
        let events: Vec<Value> = text
            .lines()
            .filter_map(|line| line.strip_prefix("data:"))
            .filter_map(|data| serde_json::from_str(data.trim()).ok())
            .collect();

        assert_eq!(events[0]["type"], "PackingStarted");
        let rejected: Vec<_> = events
            .iter()
            .filter(|e| e["type"] == "PackageRejected")
            .collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0]["package_id"], "lamp");
        assert_eq!(rejected[0]["reason_code"], "no_box_assigned");

        let last = events.last().unwrap();
        assert_eq!(last["type"], "Finished");
        assert_eq!(last["placed"], 1);
        assert_eq!(last["unpacked"], 1);

        // Same answer as the plain endpoint.
        let (_, plain) = post_json("/pack", body).await;
        assert_eq!(plain["result"]["packed"].as_array().unwrap().len(), 1);
        assert_eq!(plain["result"]["unpacked"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn repeated_pack_requests_share_the_cache() {
        let state = ApiState::from_config(&AppConfig::default());
        let mut item = lamp();
        item["box_choice"] = json!({"kind": "catalog", "id": "b2"});
        let body = json!({"container": van(), "items": [item]});

        for _ in 0..2 {
            let (status, body) = post_json_to(router(state.clone()), "/pack", body.clone()).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["is_complete"], true);
        }
        assert_eq!(state.cache.stats(), (1, 1));
    }

    struct CatalogOracle;

    impl AttributeOracle for CatalogOracle {
        fn analyze_image(
            &self,
            _image: &[u8],
        ) -> Result<crate::intake::ImageEstimate, OracleError> {
            Err(OracleError::Unavailable("text only".to_string()))
        }

        fn analyze_text(&self, _query: &str) -> Result<TextEstimate, OracleError> {
            Ok(TextEstimate {
                dimensions: crate::types::Dimensions::cube(20.0),
                weight_kg: 2.0,
                shape: crate::model::ItemShape::Cylinder,
                confidence: 0.9,
            })
        }
    }

    #[tokio::test]
    async fn draft_uses_configured_oracle() {
        let state =
            ApiState::from_config(&AppConfig::default()).with_oracle(Arc::new(CatalogOracle));
        let (status, body) = post_json_to(
            router(state),
            "/draft",
            json!({"query": "Vase", "client_id": "#3"}),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["estimate"]["confidence"], 0.9);
        assert_eq!(body["item"]["weight_kg"], 2.0);
        assert_eq!(body["item"]["box_choice"]["id"], "b1");
    }
}
