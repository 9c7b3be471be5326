use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chainhook_relay_core::chainhook::{invoice_definition, ChainhookDefinition, Network};
use chainhook_relay_core::parsing::{compute_sha256_hex, secrets_match};
use chainhook_relay_core::payload::WebhookBatch;
use chainhook_relay_core::validation::{self, CreateInvoiceRequest};
use chainhook_relay_core::{InvoiceRecord, RelayError};
use reconciler::Reconciler;
use serde::{Deserialize, Serialize};
use store::audit::{AuditEvent, AuditLog};
use store::InvoiceStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InvoiceStore>,
    pub reconciler: Arc<Reconciler>,
    pub audit: AuditLog,
    /// Bearer token chainhook deliveries must carry, when set.
    pub webhook_secret: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/invoices", post(create_invoice).get(list_invoices))
        .route("/invoices/:name", get(get_invoice))
        .route("/webhook", post(receive_webhook))
        .route("/chainhooks/definition", get(chainhook_definition))
        .with_state(state)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookAck {
    pub message: String,
    pub digest: String,
}

async fn root() -> &'static str {
    "Chainhook relay is running!"
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn create_invoice(
    State(state): State<AppState>,
    body: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<MessageResponse>), ApiError> {
    let Json(req) = body.map_err(|e| ApiError::bad_request(&e.body_text()))?;
    let invoice = validation::validate(&req)?;

    state.store.put(&invoice.name, &invoice.tx_id).await?;
    tracing::info!(name=%invoice.name, tx_id=%invoice.tx_id, "invoice pending");
    state.audit.record(AuditEvent::for_invoice(
        "invoice_created",
        &invoice.name,
        &invoice.tx_id,
    ));

    Ok((
        StatusCode::CREATED,
        Json(MessageResponse {
            message: "Invoice stored".to_string(),
        }),
    ))
}

async fn list_invoices(
    State(state): State<AppState>,
) -> Result<Json<Vec<InvoiceRecord>>, ApiError> {
    Ok(Json(state.store.list().await?))
}

async fn get_invoice(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<InvoiceRecord>, ApiError> {
    state
        .store
        .get_by_name(&name)
        .await?
        .map(Json)
        .ok_or_else(|| RelayError::NotFound(name).into())
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Acknowledges every well-formed delivery; reconciliation outcomes are logged
/// and audited, not returned.
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    if let Some(secret) = state.webhook_secret.as_deref() {
        let authorized = bearer_token(&headers).is_some_and(|token| secrets_match(token, secret));
        if !authorized {
            tracing::warn!("rejected webhook delivery with missing or wrong token");
            return Err(ApiError::unauthorized("invalid webhook token"));
        }
    }

    let digest = compute_sha256_hex(&body);
    let batch: WebhookBatch = serde_json::from_slice(&body).map_err(|e| {
        tracing::warn!(digest=%digest, error=%e, "undecodable webhook body");
        ApiError::bad_request(&format!("invalid webhook payload: {e}"))
    })?;

    tracing::info!(
        digest=%digest,
        blocks = batch.apply.len(),
        transactions = batch.transaction_count(),
        "Received chainhook event"
    );
    state
        .audit
        .record(AuditEvent::new("webhook_received").with_digest(&digest));

    state.reconciler.reconcile(&batch).await;

    Ok(Json(WebhookAck {
        message: "Event received".to_string(),
        digest,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DefinitionQuery {
    contract_id: String,
    webhook_url: String,
    #[serde(default)]
    network: Network,
}

async fn chainhook_definition(
    query: Result<Query<DefinitionQuery>, axum::extract::rejection::QueryRejection>,
) -> Result<Json<ChainhookDefinition>, ApiError> {
    let Query(q) = query.map_err(|e| ApiError::bad_request(&e.body_text()))?;
    if q.contract_id.trim().is_empty() || q.webhook_url.trim().is_empty() {
        return Err(ApiError::bad_request("contractId and webhookUrl are required"));
    }
    Ok(Json(invoice_definition(
        q.contract_id.trim(),
        q.webhook_url.trim(),
        q.network,
    )))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

/// API error response wrapper
pub struct ApiError {
    status: StatusCode,
    body: Json<ErrorBody>,
}

impl ApiError {
    fn new(status: StatusCode, error: &str, message: &str) -> Self {
        Self {
            status,
            body: Json(ErrorBody {
                error: error.to_string(),
                message: message.to_string(),
            }),
        }
    }

    fn bad_request(message: &str) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "bad_request", message)
    }

    fn unauthorized(message: &str) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "unauthorized", message)
    }

    fn not_found(message: &str) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    fn internal(message: &str) -> Self {
        tracing::error!("Internal error: {}", message);
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", message)
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match &err {
            RelayError::Validation(_) => Self::bad_request(&err.to_string()),
            RelayError::NotFound(_) => Self::not_found("Invoice not found"),
            _ if err.is_server_error() => Self::internal(&err.to_string()),
            _ => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "unprocessable",
                &err.to_string(),
            ),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use chainhook_relay_core::InvoiceStatus;
    use serde_json::{json, Value};
    use store::MemoryInvoiceStore;
    use tower::ServiceExt;

    fn state(secret: Option<&str>) -> AppState {
        let store: Arc<dyn InvoiceStore> = Arc::new(MemoryInvoiceStore::new());
        AppState {
            reconciler: Arc::new(Reconciler::new(Arc::clone(&store))),
            store,
            audit: AuditLog::disabled(),
            webhook_secret: secret.map(str::to_string),
        }
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn scenario_a_batch() -> Value {
        json!({
            "apply": [{
                "block_identifier": { "index": 1, "hash": "0x01" },
                "transactions": [{
                    "transaction_identifier": { "hash": "0xabc" },
                    "payload": { "type": "data", "result": "(ok (tuple (id u42)))" }
                }]
            }]
        })
    }

    #[tokio::test]
    async fn create_then_confirm_through_webhook() {
        let app = router(state(None));

        let (status, body) = send(
            &app,
            json_request("POST", "/invoices", json!({ "name": "inv-1", "txId": "0xabc" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["message"], "Invoice stored");

        let (status, body) = send(&app, json_request("POST", "/webhook", scenario_a_batch())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Event received");
        assert_eq!(body["digest"].as_str().unwrap().len(), 64);

        let req = Request::get("/invoices/inv-1").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "confirmed");
        assert_eq!(body["invoiceId"], "42");
        assert_eq!(body["txId"], "0xabc");
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let app = router(state(None));
        let (status, body) =
            send(&app, json_request("POST", "/invoices", json!({ "name": "inv-1" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "bad_request");
        assert!(body["message"].as_str().unwrap().contains("txId is required"));
    }

    #[tokio::test]
    async fn create_rejects_non_json_body() {
        let app = router(state(None));
        let req = Request::post("/invoices")
            .header("content-type", "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_invoice_is_404() {
        let app = router(state(None));
        let req = Request::get("/invoices/nope").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn webhook_acknowledges_unmatched_batches() {
        let state = state(None);
        let store = Arc::clone(&state.store);
        let app = router(state);

        let (status, _) = send(&app, json_request("POST", "/webhook", scenario_a_batch())).await;
        assert_eq!(status, StatusCode::OK);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn webhook_requires_configured_token() {
        let state = state(Some("s3cret"));
        let store = Arc::clone(&state.store);
        store.put("inv-1", "0xabc").await.unwrap();
        let app = router(state);

        let (status, body) = send(&app, json_request("POST", "/webhook", scenario_a_batch())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
        let rec = store.get_by_name("inv-1").await.unwrap().unwrap();
        assert_eq!(rec.status, InvoiceStatus::Pending);

        let mut req = json_request("POST", "/webhook", scenario_a_batch());
        req.headers_mut()
            .insert(AUTHORIZATION, "Bearer s3cre".parse().unwrap());
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let mut req = json_request("POST", "/webhook", scenario_a_batch());
        req.headers_mut()
            .insert(AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        let rec = store.get_by_name("inv-1").await.unwrap().unwrap();
        assert_eq!(rec.status, InvoiceStatus::Confirmed);
    }

    #[tokio::test]
    async fn lists_invoices() {
        let app = router(state(None));
        for (name, tx) in [("a", "0x0a"), ("b", "0x0b")] {
            send(&app, json_request("POST", "/invoices", json!({ "name": name, "txId": tx }))).await;
        }
        let req = Request::get("/invoices").body(Body::empty()).unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn serves_chainhook_definition() {
        let app = router(state(None));
        let req = Request::get(
            "/chainhooks/definition?contractId=SP000.invoices&webhookUrl=https://relay.example.com/webhook&network=testnet",
        )
        .body(Body::empty())
        .unwrap();
        let (status, body) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["network"], "testnet");
        assert_eq!(body["filters"]["contract_id"], "SP000.invoices");
        assert_eq!(body["action"]["url"], "https://relay.example.com/webhook");

        let req = Request::get("/chainhooks/definition?contractId=SP000.invoices")
            .body(Body::empty())
            .unwrap();
        let (status, _) = send(&app, req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn store_failures_map_to_500() {
        let err: ApiError = RelayError::StoreUnavailable("disk gone".into()).into();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body.0.error, "internal_error");
    }
}
