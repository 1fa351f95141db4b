/**
 * API REST VIGIE - Serveur HTTP principal
 *
 * RÔLE :
 * Ce module expose l'API REST du dashboard de supervision réseau.
 * Interface principale entre le frontend web et le store.
 *
 * FONCTIONNEMENT :
 * - Serveur Axum avec middleware auth API key
 * - Routes organisées : /health, /api/nodes, /api/alerts, /api/metrics,
 *   /api/ai, /api/topology, plus /ws pour le push temps réel
 * - Sérialisation JSON automatique des réponses
 * - Gestion erreurs HTTP standardisée (400, 404, 409, 500...)
 *
 * SÉCURITÉ :
 * - Header x-api-key obligatoire sur toutes routes sauf /health et /ws
 *   (les clients WebSocket navigateur ne peuvent pas poser de header)
 * - Validation côté middleware avant traitement métier
 */

use crate::diagnosis::{DiagnosisClient, DiagnosticQuery};
use crate::health::{HealthTracker, ServerHealth};
use crate::models::*;
use crate::store::{Storage, StoreError};
use axum::extract::{Path, Query, Request, State};
use axum::http::StatusCode;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Storage>,
    pub health: HealthTracker,
    pub ai: Option<Arc<DiagnosisClient>>,
}

type ApiError = (StatusCode, Json<Value>);

async fn require_api_key(req: Request, next: Next) -> Result<Response, StatusCode> {
    let path = req.uri().path();

    // Health check et upgrade WebSocket toujours accessibles
    if path.starts_with("/health") || path == "/ws" {
        return Ok(next.run(req).await);
    }

    let expected = std::env::var("VIGIE_API_KEY").unwrap_or_default();
    if expected.is_empty() {
        eprintln!("SECURITY: VIGIE_API_KEY not set - API access denied");
        return Err(StatusCode::UNAUTHORIZED);
    }

    let ok = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);

    if !ok {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(next.run(req).await)
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/api/system/health", get(get_system_health))
        .route("/api/dashboard/stats", get(get_dashboard_stats))
        .route("/api/nodes", get(list_nodes).post(create_node))
        .route("/api/nodes/{id}", get(get_node).put(update_node).delete(delete_node))
        .route("/api/groups", get(list_groups).post(create_group))
        .route("/api/connections", get(list_connections).post(create_connection))
        .route("/api/metrics/performance", get(list_metrics).post(record_metric))
        .route("/api/alerts", get(list_alerts).post(create_alert))
        .route("/api/alerts/{id}/acknowledge", patch(acknowledge_alert))
        .route("/api/ai/diagnose", post(ai_diagnose))
        .route("/api/ai/chat", post(ai_chat))
        .route("/api/ai/insights", post(ai_insights))
        .route("/api/ai/sessions", get(list_ai_sessions))
        .route("/api/topology/snapshot", get(get_topology))
        .route("/api/topology/snapshots", get(list_snapshots).post(create_snapshot))
        .route("/ws", get(crate::ws::ws_handler))
        .with_state(app_state)
        .layer(middleware::from_fn(require_api_key))
}

fn bad_request(msg: impl Into<String>) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "message": msg.into() })))
}

fn store_error(e: StoreError) -> ApiError {
    match e {
        StoreError::NotFound => (StatusCode::NOT_FOUND, Json(json!({ "message": "not found" }))),
        StoreError::Conflict(detail) => {
            (StatusCode::CONFLICT, Json(json!({ "message": detail })))
        }
        other => {
            eprintln!("[http] store error: {other}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "message": "internal error" })),
            )
        }
    }
}

/// Décode un body JSON brut vers le type attendu (payload invalide → 400)
fn decode<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| bad_request(format!("invalid payload: {e}")))
}

// GET /api/system/health (état du serveur)
async fn get_system_health(State(app): State<AppState>) -> Json<ServerHealth> {
    Json(app.health.snapshot(&app.store))
}

// GET /api/dashboard/stats (compteurs agrégés)
async fn get_dashboard_stats(
    State(app): State<AppState>,
) -> Result<Json<DashboardStats>, ApiError> {
    app.store.dashboard_stats().map(Json).map_err(store_error)
}

// ---- Nodes ----

async fn list_nodes(State(app): State<AppState>) -> Result<Json<Vec<NetworkNode>>, ApiError> {
    app.store.list_nodes().map(Json).map_err(store_error)
}

async fn get_node(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<NetworkNode>, ApiError> {
    app.store.get_node(&id).map(Json).map_err(store_error)
}

async fn create_node(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<NetworkNode>), ApiError> {
    let input: NewNode = decode(body)?;
    input.validate().map_err(bad_request)?;
    let node = app.store.create_node(&input).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(node)))
}

async fn update_node(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<NetworkNode>, ApiError> {
    let input: NewNode = decode(body)?;
    input.validate().map_err(bad_request)?;
    app.store.update_node(&id, &input).map(Json).map_err(store_error)
}

async fn delete_node(
    State(app): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    app.store.delete_node(&id).map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}

// ---- Groups ----

async fn list_groups(State(app): State<AppState>) -> Result<Json<Vec<NetworkGroup>>, ApiError> {
    app.store.list_groups().map(Json).map_err(store_error)
}

async fn create_group(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<NetworkGroup>), ApiError> {
    let input: NewGroup = decode(body)?;
    input.validate().map_err(bad_request)?;
    let group = app.store.create_group(&input).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(group)))
}

// ---- Connections ----

async fn list_connections(
    State(app): State<AppState>,
) -> Result<Json<Vec<NetworkConnection>>, ApiError> {
    app.store.list_connections().map(Json).map_err(store_error)
}

async fn create_connection(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<NetworkConnection>), ApiError> {
    let input: NewConnection = decode(body)?;
    let connection = app.store.create_connection(&input).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(connection)))
}

// ---- Performance metrics ----

// GET /api/metrics/performance?node_id=...&time_range=1h|24h|7d
async fn list_metrics(
    State(app): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<PerformanceMetric>>, ApiError> {
    let node_id = params.get("node_id").map(String::as_str);
    let range = params
        .get("time_range")
        .map(|s| TimeRange::parse(s))
        .unwrap_or(TimeRange::OneHour);
    app.store.metrics(node_id, range).map(Json).map_err(store_error)
}

async fn record_metric(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<PerformanceMetric>), ApiError> {
    let input: NewMetric = decode(body)?;
    let metric = app.store.record_metric(&input).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(metric)))
}

// ---- Alerts ----

async fn list_alerts(State(app): State<AppState>) -> Result<Json<Vec<Alert>>, ApiError> {
    app.store.list_alerts().map(Json).map_err(store_error)
}

async fn create_alert(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<Alert>), ApiError> {
    let input: NewAlert = decode(body)?;
    input.validate().map_err(bad_request)?;
    let alert = app.store.create_alert(&input).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(alert)))
}

// PATCH /api/alerts/{id}/acknowledge { "acknowledged_by": "..." }
async fn acknowledge_alert(
    State(app): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<Value>,
) -> Result<Json<Alert>, ApiError> {
    let operator = body["acknowledged_by"].as_str().unwrap_or("").trim().to_string();
    if operator.is_empty() {
        return Err(bad_request("acknowledged_by must not be empty"));
    }
    app.store
        .acknowledge_alert(&id, &operator)
        .map(Json)
        .map_err(store_error)
}

// ---- AI diagnosis ----

fn ai_client(app: &AppState) -> Result<Arc<DiagnosisClient>, ApiError> {
    app.ai.clone().ok_or((
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "message": "AI diagnostics not configured" })),
    ))
}

fn ai_error(e: crate::diagnosis::AiError) -> ApiError {
    eprintln!("[ai] request failed: {e}");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": "AI request failed" })),
    )
}

#[derive(serde::Deserialize)]
struct DiagnoseBody {
    query: String,
    node_id: Option<String>,
    context: Option<Value>,
    operator: Option<String>,
}

// POST /api/ai/diagnose
async fn ai_diagnose(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<crate::diagnosis::DiagnosticVerdict>, ApiError> {
    let body: DiagnoseBody = decode(body)?;
    if body.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let client = ai_client(&app)?;

    let query = DiagnosticQuery {
        query: body.query.clone(),
        node_id: body.node_id.clone(),
        context: body.context.clone(),
    };
    let verdict = client.analyze_problem(&query).await.map_err(ai_error)?;

    let response = serde_json::to_string(&verdict)
        .map_err(|e| store_error(StoreError::Serialization(e)))?;
    app.store
        .create_session(&NewDiagnosticSession {
            operator: body.operator.unwrap_or_else(|| "unknown".to_string()),
            node_id: body.node_id,
            query: body.query,
            response: Some(response),
            context: body.context,
        })
        .map_err(store_error)?;

    Ok(Json(verdict))
}

#[derive(serde::Deserialize)]
struct ChatBody {
    message: String,
    context: Option<Value>,
    operator: Option<String>,
}

// POST /api/ai/chat
async fn ai_chat(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let body: ChatBody = decode(body)?;
    if body.message.trim().is_empty() {
        return Err(bad_request("message must not be empty"));
    }
    let client = ai_client(&app)?;

    let response = client
        .chat(&body.message, body.context.as_ref())
        .await
        .map_err(ai_error)?;

    app.store
        .create_session(&NewDiagnosticSession {
            operator: body.operator.unwrap_or_else(|| "unknown".to_string()),
            node_id: None,
            query: body.message,
            response: Some(response.clone()),
            context: body.context,
        })
        .map_err(store_error)?;

    Ok(Json(json!({ "response": response })))
}

// POST /api/ai/insights — métriques de la dernière heure vers le modèle
async fn ai_insights(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    let client = ai_client(&app)?;
    let metrics = app
        .store
        .metrics(None, TimeRange::OneHour)
        .map_err(store_error)?;
    let data = serde_json::to_value(&metrics)
        .map_err(|e| store_error(StoreError::Serialization(e)))?;
    let insights = client.generate_insights(&data).await.map_err(ai_error)?;
    Ok(Json(json!({ "insights": insights })))
}

// GET /api/ai/sessions?operator=...
async fn list_ai_sessions(
    State(app): State<AppState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<Vec<DiagnosticSession>>, ApiError> {
    let operator = params.get("operator").map(String::as_str);
    app.store.list_sessions(operator).map(Json).map_err(store_error)
}

// ---- Topology ----

// GET /api/topology/snapshot (vue live nodes + connexions)
async fn get_topology(State(app): State<AppState>) -> Result<Json<Value>, ApiError> {
    let nodes = app.store.list_nodes().map_err(store_error)?;
    let connections = app.store.list_connections().map_err(store_error)?;
    Ok(Json(json!({ "nodes": nodes, "connections": connections })))
}

async fn list_snapshots(
    State(app): State<AppState>,
) -> Result<Json<Vec<TopologySnapshot>>, ApiError> {
    app.store.list_snapshots().map(Json).map_err(store_error)
}

async fn create_snapshot(
    State(app): State<AppState>,
    Json(body): Json<Value>,
) -> Result<(StatusCode, Json<TopologySnapshot>), ApiError> {
    let input: NewSnapshot = decode(body)?;
    if input.name.trim().is_empty() {
        return Err(bad_request("name must not be empty"));
    }
    let snapshot = app.store.create_snapshot(&input).map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(snapshot)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_router() -> Router {
        build_router(AppState {
            store: Arc::new(Storage::open(":memory:").unwrap()),
            health: HealthTracker::new(),
            ai: None,
        })
    }

    async fn request_status(uri: &str, api_key: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri(uri);
        if let Some(key) = api_key {
            builder = builder.header("x-api-key", key);
        }
        let response = test_router()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_api_key_guard() {
        // clé serveur absente : tout /api est refusé, même avec un header
        std::env::remove_var("VIGIE_API_KEY");
        assert_eq!(request_status("/api/nodes", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            request_status("/api/nodes", Some("sesame")).await,
            StatusCode::UNAUTHORIZED
        );

        std::env::set_var("VIGIE_API_KEY", "sesame");

        // /health reste ouvert sans clé
        assert_eq!(request_status("/health", None).await, StatusCode::OK);

        // mauvaise clé ou header manquant → 401
        assert_eq!(request_status("/api/nodes", None).await, StatusCode::UNAUTHORIZED);
        assert_eq!(
            request_status("/api/nodes", Some("wrong")).await,
            StatusCode::UNAUTHORIZED
        );

        // bonne clé → la route répond
        assert_eq!(request_status("/api/nodes", Some("sesame")).await, StatusCode::OK);

        std::env::remove_var("VIGIE_API_KEY");
    }

    #[test]
    fn test_decode_rejects_bad_payload() {
        let err = decode::<NewNode>(json!({ "name": "x" })).unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);

        let ok: NewNode = decode(json!({
            "name": "x",
            "type": "server",
            "ip_address": "10.0.0.1"
        }))
        .unwrap();
        assert_eq!(ok.node_type, NodeType::Server);
    }

    #[test]
    fn test_store_error_mapping() {
        assert_eq!(store_error(StoreError::NotFound).0, StatusCode::NOT_FOUND);
        assert_eq!(
            store_error(StoreError::Conflict("dup".into())).0,
            StatusCode::CONFLICT
        );
        assert_eq!(
            store_error(StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows)).0,
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
