// 🌐 REST API with Axum
//
// /admin      commission split + distributor registry
// /simulator  scheme CRUD, tenure lookup, commission calculation
//
// Every failure leaves as `{"error": "..."}` with the status taken from the
// error variant.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use rusqlite::Connection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::calculator::{calculate, CalculationRequest};
use crate::entities::distributor::{list_distributors, upsert_distributor, DistributorInput, UpsertOutcome};
use crate::entities::scheme::{
    create_scheme, find_scheme_by_name, list_schemes, update_scheme, NewScheme, SchemeUpdate,
};
use crate::entities::split::{add_or_replace_split, current_split, SplitInput};
use crate::error::SimulatorError;
use crate::tenures::tenures_for_scheme;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    db: Arc<Mutex<Connection>>,
}

impl AppState {
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
        }
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, ApiError> {
        self.db.lock().map_err(|_| {
            error!("database mutex poisoned");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Database unavailable")
        })
    }

    /// Run `op` on the locked connection, mapping domain errors to responses.
    /// `internal_message` replaces the details of store failures.
    fn run<T>(
        &self,
        internal_message: &str,
        op: impl FnOnce(&Connection) -> crate::error::Result<T>,
    ) -> Result<T, ApiError> {
        let conn = self.connection()?;
        op(&conn).map_err(|e| ApiError::from_domain(e, internal_message))
    }
}

/// Success envelope
#[derive(Serialize)]
pub struct ApiResponse<T> {
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
    data: T,
}

impl<T> ApiResponse<T> {
    fn ok(data: T) -> Self {
        Self {
            message: None,
            data,
        }
    }

    fn with_message(message: &'static str, data: T) -> Self {
        Self {
            message: Some(message),
            data,
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    fn from_domain(err: SimulatorError, internal_message: &str) -> Self {
        let status = match &err {
            SimulatorError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            SimulatorError::Conflict(_) => StatusCode::CONFLICT,
            SimulatorError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if err.is_internal() {
            error!(error = %err, "{}", internal_message);
            return Self::new(status, internal_message);
        }

        Self::new(status, err.to_string())
    }

    /// Map a body rejection. Well-formed JSON with wrong field types gets the
    /// handler's own validation message; malformed JSON is 400; anything else
    /// (missing content type, unreadable body) keeps axum's status.
    fn rejected(rejection: JsonRejection, data_message: &str) -> Self {
        match rejection {
            JsonRejection::JsonDataError(_) => Self::new(StatusCode::BAD_REQUEST, data_message),
            JsonRejection::JsonSyntaxError(_) => {
                Self::new(StatusCode::BAD_REQUEST, "Malformed JSON in request body")
            }
            other => Self::new(other.status(), other.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================================
// Admin handlers
// ============================================================================

/// POST /admin/add-commission - Replace the commission split
async fn add_commission(
    State(state): State<AppState>,
    payload: Result<Json<SplitInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) =
        payload.map_err(|r| ApiError::rejected(r, "Total percentage must equal 100%"))?;
    let split = state.run("Failed to add commission data", |conn| {
        add_or_replace_split(conn, &input)
    })?;

    Ok(Json(ApiResponse::with_message(
        "Commission data added successfully",
        split,
    )))
}

/// GET /admin/commission - Split currently in force
async fn get_commission(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let split = state.run("Failed to fetch commission data", current_split)?;
    Ok(Json(ApiResponse::ok(split)))
}

/// POST /admin/add-or-update-mfd - Create or update a distributor
async fn add_or_update_mfd(
    State(state): State<AppState>,
    payload: Result<Json<DistributorInput>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(input) = payload.map_err(|r| {
        ApiError::rejected(r, "Name, uniqueId, and commissionShare are required")
    })?;
    let (distributor, outcome) = state.run("Failed to add/update MFD", |conn| {
        upsert_distributor(conn, &input)
    })?;

    let (status, message) = match outcome {
        UpsertOutcome::Created => (StatusCode::CREATED, "MFD added successfully"),
        UpsertOutcome::Updated => (StatusCode::OK, "MFD updated successfully"),
    };

    Ok((status, Json(ApiResponse::with_message(message, distributor))))
}

/// GET /admin/all-mfds - List distributors
async fn get_mfds(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let distributors = state.run("Failed to fetch MFD data", list_distributors)?;
    Ok(Json(ApiResponse::ok(distributors)))
}

async fn admin_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found in /admin")
}

// ============================================================================
// Simulator handlers
// ============================================================================

/// POST /simulator/add - Register a scheme
async fn add_brokerage_data(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = payload.map_err(|r| ApiError::rejected(r, "Invalid request body"))?;
    let new_scheme = NewScheme::from_json(&body)
        .map_err(|e| ApiError::from_domain(e, "Failed to add brokerage data"))?;

    let scheme = state.run("Failed to add brokerage data", |conn| {
        create_scheme(conn, new_scheme)
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "Brokerage data added successfully",
            scheme,
        )),
    ))
}

/// POST /simulator/calculate - Commission for scheme + tenure + amount
async fn calculate_commission(
    State(state): State<AppState>,
    payload: Result<Json<CalculationRequest>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(request) = payload
        .map_err(|r| ApiError::rejected(r, "Scheme, tenureKey, and amount are required"))?;
    let breakdown = state.run("Failed to calculate commission", |conn| {
        calculate(conn, &request)
    })?;

    Ok(Json(breakdown))
}

/// GET /simulator/all - List schemes
async fn get_brokerage_data(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let schemes = state.run("Failed to fetch brokerage data", list_schemes)?;
    info!(count = schemes.len(), "fetched all brokerage data");
    Ok(Json(ApiResponse::ok(schemes)))
}

/// GET /simulator/tenures/:scheme - Merged tenures for one scheme
async fn get_tenures_by_scheme(
    State(state): State<AppState>,
    Path(scheme): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let tenures = state.run("Failed to fetch scheme data", |conn| {
        tenures_for_scheme(conn, &scheme)
    })?;

    Ok(Json(tenures))
}

/// GET /simulator/:scheme - One scheme
async fn get_brokerage_by_scheme(
    State(state): State<AppState>,
    Path(scheme): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let record = state.run("Failed to fetch scheme", |conn| {
        find_scheme_by_name(conn, &scheme)
    })?;

    Ok(Json(ApiResponse::ok(record)))
}

/// PUT /simulator/:scheme - Partial update
async fn update_brokerage_data(
    State(state): State<AppState>,
    Path(scheme): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<impl IntoResponse> {
    let Json(body) = payload.map_err(|r| ApiError::rejected(r, "Invalid request body"))?;
    let update = SchemeUpdate::from_json(&body)
        .map_err(|e| ApiError::from_domain(e, "Failed to update brokerage data"))?;

    let record = state.run("Failed to update brokerage data", |conn| {
        update_scheme(conn, &scheme, update)
    })?;

    Ok(Json(ApiResponse::with_message(
        "Brokerage data updated successfully",
        record,
    )))
}

async fn simulator_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found in /simulator")
}

// ============================================================================
// Router
// ============================================================================

/// GET /health - Health check
async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok", "version": crate::VERSION }))
}

async fn route_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "Route not found")
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/add-commission",
            post(add_commission).fallback(admin_not_found),
        )
        .route("/commission", get(get_commission).fallback(admin_not_found))
        .route(
            "/add-or-update-mfd",
            post(add_or_update_mfd).fallback(admin_not_found),
        )
        .route("/all-mfds", get(get_mfds).fallback(admin_not_found))
        .fallback(admin_not_found)
}

fn simulator_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(add_brokerage_data).fallback(simulator_not_found))
        .route(
            "/calculate",
            post(calculate_commission).fallback(simulator_not_found),
        )
        .route("/all", get(get_brokerage_data).fallback(simulator_not_found))
        .route(
            "/tenures/:scheme",
            get(get_tenures_by_scheme).fallback(simulator_not_found),
        )
        .route(
            "/:scheme",
            get(get_brokerage_by_scheme)
                .put(update_brokerage_data)
                .fallback(simulator_not_found),
        )
        .fallback(simulator_not_found)
}

/// Full application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/admin", admin_routes())
        .nest("/simulator", simulator_routes())
        .fallback(route_not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::bootstrap;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> Router {
        let conn = Connection::open_in_memory().unwrap();
        bootstrap(&conn, None).unwrap();
        router(AppState::new(conn))
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, json)
    }

    async fn add_scheme_a(app: &Router) {
        let (status, _) = send(
            app,
            "POST",
            "/simulator/add",
            Some(json!({
                "scheme": "SchemeA",
                "gst": "exclusive",
                "payout": "monthly",
                "tenures": {"12M": 5},
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_health() {
        let app = test_app();
        let (status, body) = send(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_add_scheme_and_fetch() {
        let app = test_app();
        add_scheme_a(&app).await;

        let (status, body) = send(&app, "GET", "/simulator/SchemeA", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["scheme"], "SchemeA");
        assert_eq!(body["data"]["gst"], "exclusive");
        assert_eq!(body["data"]["tenures"]["12M"], 5.0);
        assert!(body["data"]["createdAt"].is_string());
    }

    #[tokio::test]
    async fn test_add_scheme_errors() {
        let app = test_app();
        add_scheme_a(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/simulator/add",
            Some(json!({"scheme": "SchemeA", "gst": "inclusive"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Scheme 'SchemeA' already exists");

        let (status, body) = send(
            &app,
            "POST",
            "/simulator/add",
            Some(json!({"scheme": "SchemeB"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Scheme and GST are required");

        let (status, body) = send(
            &app,
            "POST",
            "/simulator/add",
            Some(json!({"scheme": "SchemeB", "gst": "inclusive", "tenures": 5})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid data for field: tenures");
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/simulator/calculate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "Malformed JSON in request body");
    }

    #[tokio::test]
    async fn test_wrong_field_types_get_domain_messages() {
        let app = test_app();
        add_scheme_a(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/simulator/calculate",
            Some(json!({"scheme": "SchemeA", "tenureKey": "12M", "amount": "1000"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Scheme, tenureKey, and amount are required");

        let (status, body) = send(
            &app,
            "POST",
            "/admin/add-or-update-mfd",
            Some(json!({"name": "Acme", "uniqueId": "MFD-1", "commissionShare": "forty"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Name, uniqueId, and commissionShare are required");

        let (status, body) = send(
            &app,
            "POST",
            "/admin/add-commission",
            Some(json!({"redVision": "20", "fixerra": 20, "mfd": 60})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Total percentage must equal 100%");
    }

    #[tokio::test]
    async fn test_missing_content_type_is_unsupported_media_type() {
        let app = test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/simulator/calculate")
            .body(Body::from(r#"{"scheme":"SchemeA","tenureKey":"12M","amount":10}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_calculate() {
        let app = test_app();
        add_scheme_a(&app).await;

        let (status, body) = send(
            &app,
            "POST",
            "/simulator/calculate",
            Some(json!({"scheme": "SchemeA", "tenureKey": "12M", "amount": 100000})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rate"], 5.0);
        assert_eq!(body["totalEarnings"], 5000.0);
        assert_eq!(body["operatorEarnings"], 1000.0);
        assert_eq!(body["subDistributorEarnings"], 1000.0);
        assert_eq!(body["distributorEarnings"], 3000.0);
    }

    #[tokio::test]
    async fn test_calculate_errors() {
        let app = test_app();
        add_scheme_a(&app).await;

        let (status, _) = send(
            &app,
            "POST",
            "/simulator/calculate",
            Some(json!({"scheme": "SchemeA", "tenureKey": "12M"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "POST",
            "/simulator/calculate",
            Some(json!({"scheme": "Ghost", "tenureKey": "12M", "amount": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Scheme 'Ghost' not found");

        let (status, body) = send(
            &app,
            "POST",
            "/simulator/calculate",
            Some(json!({"scheme": "SchemeA", "tenureKey": "99M", "amount": 10})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "No matching tenure found for scheme 'SchemeA'");
    }

    #[tokio::test]
    async fn test_commission_split_endpoints() {
        let app = test_app();

        let (status, body) = send(
            &app,
            "POST",
            "/admin/add-commission",
            Some(json!({"redVision": 10, "fixerra": 30, "mfd": 50})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Total percentage must equal 100%");

        let (status, body) = send(
            &app,
            "POST",
            "/admin/add-commission",
            Some(json!({"redVision": 10, "fixerra": 30, "mfd": 60})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Commission data added successfully");
        assert_eq!(body["data"]["fixerra"], 30.0);

        let (status, body) = send(&app, "GET", "/admin/commission", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["redVision"], 10.0);
        assert_eq!(body["data"]["mfd"], 60.0);
    }

    #[tokio::test]
    async fn test_mfd_upsert_and_list() {
        let app = test_app();
        let mfd = |share: f64| Some(json!({"name": "Acme", "uniqueId": "MFD-1", "commissionShare": share}));

        let (status, body) = send(&app, "POST", "/admin/add-or-update-mfd", mfd(40.0)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "MFD added successfully");

        let (status, body) = send(&app, "POST", "/admin/add-or-update-mfd", mfd(45.0)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "MFD updated successfully");
        assert_eq!(body["data"]["commissionShare"], 45.0);

        let (status, body) = send(&app, "GET", "/admin/all-mfds", None).await;
        assert_eq!(status, StatusCode::OK);
        let list = body["data"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0]["uniqueId"], "MFD-1");

        let (status, body) = send(
            &app,
            "POST",
            "/admin/add-or-update-mfd",
            Some(json!({"name": "Acme", "uniqueId": "MFD-2"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Name, uniqueId, and commissionShare are required");
    }

    #[tokio::test]
    async fn test_tenures_endpoint() {
        let app = test_app();
        send(
            &app,
            "POST",
            "/simulator/add",
            Some(json!({"scheme": "Shriram Finance", "gst": "inclusive", "monthly_aum_tenures": {"Q1": 3}})),
        )
        .await;

        let (status, body) = send(&app, "GET", "/simulator/tenures/Shriram%20Finance", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["tenures"], json!({"Q1": 3.0}));
        assert_eq!(body["gst"], "inclusive");

        let (status, _) = send(&app, "GET", "/simulator/tenures/Ghost", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_partial_update() {
        let app = test_app();
        add_scheme_a(&app).await;

        let (status, body) = send(
            &app,
            "PUT",
            "/simulator/SchemeA",
            Some(json!({"quarterly_aum_tenures": {"Q2": 1.5}})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["tenures"]["12M"], 5.0);
        assert_eq!(body["data"]["quarterly_aum_tenures"]["Q2"], 1.5);

        let (status, _) = send(
            &app,
            "PUT",
            "/simulator/SchemeA",
            Some(json!({"tenures": {"12M": "five"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(
            &app,
            "PUT",
            "/simulator/Ghost",
            Some(json!({"gst": "inclusive"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Scheme 'Ghost' not found");
    }

    #[tokio::test]
    async fn test_list_schemes() {
        let app = test_app();
        add_scheme_a(&app).await;

        let (status, body) = send(&app, "GET", "/simulator/all", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_module_fallbacks() {
        let app = test_app();

        let (status, body) = send(&app, "GET", "/simulator/unknown-path/x/y", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found in /simulator");

        let (status, body) = send(&app, "GET", "/admin/nothing-here", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found in /admin");

        let (status, body) = send(&app, "DELETE", "/simulator/SchemeA", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found in /simulator");

        let (status, body) = send(&app, "GET", "/elsewhere", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Route not found");
    }
}
