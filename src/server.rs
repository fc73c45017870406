//! HTTP admin surface.
//!
//! Reads are open. Every route that writes, or that spends model tokens,
//! requires the `X-Admin-Key` header; the author recorded in the changelog
//! comes from `X-Admin-User`.

use crate::coverage::{CoverageReport, KeyLookup};
use crate::error::CatalogError;
use crate::exchange::{ExportFilter, ExportFormat, ImportFormat, ImportOutcome};
use crate::ledger::{ChangelogEntry, ChangelogFilter, ChangelogPage};
use crate::lifecycle::{AddedLocale, ArchivedLocale, NewLocale};
use crate::mutation::{BulkItem, BulkOutcome};
use crate::quality::{QualityFilter, QualityReport};
use crate::rollback::{RollbackOutcome, RollbackPreview};
use crate::security::is_authorized;
use crate::settings::LocaleConfig;
use crate::snapshot::SnapshotInfo;
use crate::translation::{
    KeyTranslation, MetricsReport, ProposedTranslation, TranslationMetrics, TranslationRun,
};
use crate::workspace::Workspace;
use axum::async_trait;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

pub const ADMIN_KEY_HEADER: &str = "x-admin-key";
pub const ADMIN_USER_HEADER: &str = "x-admin-user";
const DEFAULT_AUTHOR: &str = "admin";

#[derive(Clone)]
pub struct AppState {
    pub workspace: Arc<Workspace>,
    pub admin_api_key: Option<Arc<str>>,
}

impl AppState {
    pub fn new(workspace: Workspace, admin_api_key: Option<String>) -> Self {
        Self {
            workspace: Arc::new(workspace),
            admin_api_key: admin_api_key.map(Arc::from),
        }
    }
}

// ==================== Errors ====================

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("a valid X-Admin-Key header is required")]
    Unauthorized,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("background task failed: {0}")]
    Task(String),
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Catalog(e) => match e {
                CatalogError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
                CatalogError::Conflict(_) => StatusCode::CONFLICT,
                CatalogError::Unsupported(_) => StatusCode::UNPROCESSABLE_ENTITY,
                CatalogError::ExternalService(_) => StatusCode::BAD_GATEWAY,
                CatalogError::Io { .. } | CatalogError::Serialization { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ApiError::Unauthorized => "unauthorized",
            ApiError::Task(_) => "internal",
            ApiError::Catalog(e) => e.kind(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else {
            warn!("Request rejected ({}): {}", status.as_u16(), self);
        }
        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Run file-backed workspace work on the blocking pool. Catalog writes hold
/// per-locale locks across whole-file reads and writes.
async fn blocking<T, F>(state: &AppState, work: F) -> ApiResult<T>
where
    F: FnOnce(&Workspace) -> Result<T, CatalogError> + Send + 'static,
    T: Send + 'static,
{
    let workspace = Arc::clone(&state.workspace);
    let result = tokio::task::spawn_blocking(move || work(&workspace))
        .await
        .map_err(|e| ApiError::Task(e.to_string()))?;
    Ok(result?)
}

// ==================== Auth ====================

/// An authorized caller, identified for the changelog.
pub struct Admin {
    pub author: String,
}

#[async_trait]
impl FromRequestParts<AppState> for Admin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = header_str(&parts.headers, ADMIN_KEY_HEADER);
        if !is_authorized(state.admin_api_key.as_deref(), presented) {
            return Err(ApiError::Unauthorized);
        }
        let author = header_str(&parts.headers, ADMIN_USER_HEADER)
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_AUTHOR)
            .to_string();
        Ok(Admin { author })
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// ==================== Router ====================

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/coverage", get(coverage))
        .route("/api/lookup", get(lookup))
        .route("/api/quality", get(quality))
        .route("/api/keys", post(add_key).put(update_key).delete(delete_key))
        .route("/api/keys/bulk", post(bulk_update))
        .route("/api/export", get(export))
        .route("/api/import", post(import))
        .route("/api/snapshots", get(list_snapshots).post(create_snapshot))
        .route("/api/rollback/:file", get(preview_rollback).post(apply_rollback))
        .route("/api/translate/key", post(translate_key))
        .route("/api/translate/missing", post(translate_missing))
        .route("/api/translate/namespace", post(translate_namespace))
        .route("/api/translate/commit", post(commit_translations))
        .route("/api/translate/metrics", get(translation_metrics))
        .route("/api/locales", get(list_locales).post(add_locale))
        .route("/api/locales/:code", axum::routing::delete(remove_locale))
        .route("/api/locales/:code/default", put(set_default_locale))
        .route("/api/locales/:code/enabled", put(set_locale_enabled))
        .route("/api/archive", get(list_archived))
        .route("/api/archive/:file/restore", post(restore_locale))
        .route("/api/changelog", get(changelog))
        .route("/api/changelog/:id/undo", post(undo_change))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ==================== Reads ====================

async fn health() -> &'static str {
    "OK"
}

async fn coverage(State(state): State<AppState>) -> ApiResult<Json<CoverageReport>> {
    Ok(Json(blocking(&state, |ws| ws.coverage_report()).await?))
}

#[derive(Debug, Deserialize)]
struct LookupQuery {
    namespace: String,
    key: Option<String>,
}

async fn lookup(
    State(state): State<AppState>,
    Query(query): Query<LookupQuery>,
) -> ApiResult<Json<KeyLookup>> {
    Ok(Json(
        blocking(&state, move |ws| ws.lookup_key(&query.namespace, query.key.as_deref())).await?,
    ))
}

async fn quality(
    State(state): State<AppState>,
    Query(filter): Query<QualityFilter>,
) -> ApiResult<Json<QualityReport>> {
    Ok(Json(blocking(&state, move |ws| ws.quality_scan(&filter)).await?))
}

#[derive(Debug, Deserialize)]
struct ExportQuery {
    format: Option<String>,
    namespace: Option<String>,
    locale: Option<String>,
    missing_only: Option<bool>,
}

async fn export(State(state): State<AppState>, Query(query): Query<ExportQuery>) -> ApiResult<Response> {
    let format = match query.format.as_deref() {
        Some(value) => ExportFormat::parse(value)?,
        None => ExportFormat::Json,
    };
    let filter = ExportFilter {
        namespace: query.namespace,
        locale: query.locale,
        missing_only: query.missing_only.unwrap_or(false),
    };
    let exported = blocking(&state, move |ws| ws.export_catalog(format, &filter)).await?;

    let disposition = format!("attachment; filename=\"messages.{}\"", format.extension());
    let mut response = exported.content.into_response();
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(format.content_type()));
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

#[derive(Debug, Deserialize)]
struct LocaleQuery {
    locale: Option<String>,
}

async fn list_snapshots(
    State(state): State<AppState>,
    Query(query): Query<LocaleQuery>,
) -> ApiResult<Json<Vec<SnapshotInfo>>> {
    Ok(Json(
        blocking(&state, move |ws| ws.list_snapshots(query.locale.as_deref())).await?,
    ))
}

async fn preview_rollback(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> ApiResult<Json<RollbackPreview>> {
    Ok(Json(blocking(&state, move |ws| ws.preview_rollback(&file)).await?))
}

async fn translation_metrics() -> Json<MetricsReport> {
    Json(TranslationMetrics::global().report())
}

async fn list_locales(State(state): State<AppState>) -> ApiResult<Json<Vec<LocaleConfig>>> {
    Ok(Json(blocking(&state, |ws| ws.list_locales()).await?))
}

async fn list_archived(State(state): State<AppState>) -> ApiResult<Json<Vec<ArchivedLocale>>> {
    Ok(Json(blocking(&state, |ws| ws.list_archived()).await?))
}

async fn changelog(
    State(state): State<AppState>,
    Query(filter): Query<ChangelogFilter>,
) -> ApiResult<Json<ChangelogPage>> {
    Ok(Json(blocking(&state, move |ws| ws.ledger().query(&filter)).await?))
}

// ==================== Key mutations ====================

#[derive(Debug, Deserialize)]
struct AddKeyRequest {
    namespace: String,
    key: String,
    values: BTreeMap<String, String>,
}

async fn add_key(
    State(state): State<AppState>,
    admin: Admin,
    Json(request): Json<AddKeyRequest>,
) -> ApiResult<(StatusCode, Json<ChangelogEntry>)> {
    let entry = blocking(&state, move |ws| {
        ws.add_key(&request.namespace, &request.key, &request.values, &admin.author)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

#[derive(Debug, Deserialize)]
struct UpdateKeyRequest {
    locale: String,
    namespace: String,
    key: String,
    value: String,
}

async fn update_key(
    State(state): State<AppState>,
    admin: Admin,
    Json(request): Json<UpdateKeyRequest>,
) -> ApiResult<Json<ChangelogEntry>> {
    let entry = blocking(&state, move |ws| {
        ws.update_key(
            &request.locale,
            &request.namespace,
            &request.key,
            &request.value,
            &admin.author,
        )
    })
    .await?;
    Ok(Json(entry))
}

#[derive(Debug, Deserialize)]
struct KeyRef {
    namespace: String,
    key: String,
}

async fn delete_key(
    State(state): State<AppState>,
    admin: Admin,
    Query(target): Query<KeyRef>,
) -> ApiResult<Json<ChangelogEntry>> {
    Ok(Json(
        blocking(&state, move |ws| ws.delete_key(&target.namespace, &target.key, &admin.author))
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct BulkRequest {
    locale: String,
    updates: Vec<BulkItem>,
}

async fn bulk_update(
    State(state): State<AppState>,
    admin: Admin,
    Json(request): Json<BulkRequest>,
) -> ApiResult<Json<BulkOutcome>> {
    Ok(Json(
        blocking(&state, move |ws| {
            ws.bulk_update(&request.locale, &request.updates, &admin.author)
        })
        .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct ImportRequest {
    format: String,
    content: String,
    #[serde(default)]
    preview: bool,
}

async fn import(
    State(state): State<AppState>,
    admin: Admin,
    Json(request): Json<ImportRequest>,
) -> ApiResult<Json<ImportOutcome>> {
    let format = ImportFormat::parse(&request.format)?;
    Ok(Json(
        blocking(&state, move |ws| {
            ws.import_catalog(format, &request.content, request.preview, &admin.author)
        })
        .await?,
    ))
}

// ==================== Versions ====================

#[derive(Debug, Default, Deserialize)]
struct SnapshotRequest {
    locale: Option<String>,
}

async fn create_snapshot(
    State(state): State<AppState>,
    _admin: Admin,
    request: Option<Json<SnapshotRequest>>,
) -> ApiResult<(StatusCode, Json<Vec<SnapshotInfo>>)> {
    let locale = request.and_then(|Json(r)| r.locale);
    let created = blocking(&state, move |ws| ws.create_snapshot(locale.as_deref())).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

async fn apply_rollback(
    State(state): State<AppState>,
    admin: Admin,
    Path(file): Path<String>,
) -> ApiResult<Json<RollbackOutcome>> {
    Ok(Json(
        blocking(&state, move |ws| ws.apply_rollback(&file, &admin.author)).await?,
    ))
}

async fn undo_change(
    State(state): State<AppState>,
    admin: Admin,
    Path(id): Path<String>,
) -> ApiResult<Json<ChangelogEntry>> {
    Ok(Json(blocking(&state, move |ws| ws.undo_change(&id, &admin.author)).await?))
}

// ==================== Translation ====================

#[derive(Debug, Deserialize)]
struct TranslateKeyRequest {
    namespace: String,
    key: String,
    locale: String,
}

async fn translate_key(
    State(state): State<AppState>,
    _admin: Admin,
    Json(request): Json<TranslateKeyRequest>,
) -> ApiResult<Json<KeyTranslation>> {
    Ok(Json(
        state
            .workspace
            .translate_key(&request.namespace, &request.key, &request.locale)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct TranslateMissingRequest {
    locale: String,
    namespaces: Option<Vec<String>>,
}

async fn translate_missing(
    State(state): State<AppState>,
    _admin: Admin,
    Json(request): Json<TranslateMissingRequest>,
) -> ApiResult<Json<TranslationRun>> {
    Ok(Json(
        state
            .workspace
            .translate_missing(&request.locale, request.namespaces.as_deref())
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct TranslateNamespaceRequest {
    namespace: String,
    locales: Vec<String>,
}

async fn translate_namespace(
    State(state): State<AppState>,
    _admin: Admin,
    Json(request): Json<TranslateNamespaceRequest>,
) -> ApiResult<Json<Vec<TranslationRun>>> {
    Ok(Json(
        state
            .workspace
            .translate_namespace(&request.namespace, &request.locales)
            .await?,
    ))
}

#[derive(Debug, Deserialize)]
struct CommitRequest {
    locale: String,
    proposals: Vec<ProposedTranslation>,
}

async fn commit_translations(
    State(state): State<AppState>,
    admin: Admin,
    Json(request): Json<CommitRequest>,
) -> ApiResult<Json<BulkOutcome>> {
    Ok(Json(
        blocking(&state, move |ws| {
            ws.commit_translations(&request.locale, &request.proposals, &admin.author)
        })
        .await?,
    ))
}

// ==================== Locales ====================

async fn add_locale(
    State(state): State<AppState>,
    admin: Admin,
    Json(request): Json<NewLocale>,
) -> ApiResult<(StatusCode, Json<AddedLocale>)> {
    let added = state.workspace.add_locale(&request, &admin.author).await?;
    Ok((StatusCode::CREATED, Json(added)))
}

#[derive(Debug, Deserialize)]
struct RemoveQuery {
    confirm: Option<String>,
}

async fn remove_locale(
    State(state): State<AppState>,
    admin: Admin,
    Path(code): Path<String>,
    Query(query): Query<RemoveQuery>,
) -> ApiResult<Json<ArchivedLocale>> {
    Ok(Json(
        blocking(&state, move |ws| {
            ws.remove_locale(&code, query.confirm.as_deref(), &admin.author)
        })
        .await?,
    ))
}

async fn set_default_locale(
    State(state): State<AppState>,
    admin: Admin,
    Path(code): Path<String>,
) -> ApiResult<Json<LocaleConfig>> {
    Ok(Json(
        blocking(&state, move |ws| ws.set_default_locale(&code, &admin.author)).await?,
    ))
}

#[derive(Debug, Deserialize)]
struct EnabledRequest {
    enabled: bool,
}

async fn set_locale_enabled(
    State(state): State<AppState>,
    admin: Admin,
    Path(code): Path<String>,
    Json(request): Json<EnabledRequest>,
) -> ApiResult<Json<LocaleConfig>> {
    Ok(Json(
        blocking(&state, move |ws| {
            ws.set_locale_enabled(&code, request.enabled, &admin.author)
        })
        .await?,
    ))
}

async fn restore_locale(
    State(state): State<AppState>,
    admin: Admin,
    Path(file): Path<String>,
) -> ApiResult<Json<LocaleConfig>> {
    Ok(Json(
        blocking(&state, move |ws| ws.restore_locale(&file, &admin.author)).await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::fs;
    use tempfile::TempDir;

    const KEY: &str = "test-admin-key";

    /// Serve the router on an ephemeral port and return its base URL.
    async fn spawn_app() -> (String, TempDir) {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("messages");
        fs::create_dir_all(&content).unwrap();
        fs::write(
            content.join("en.json"),
            r#"{"Greeting": {"hello": "Hello, {name}!"}}"#,
        )
        .unwrap();
        fs::write(content.join("es.json"), r#"{"Greeting": {"hello": "Hola!"}}"#).unwrap();
        let workspace = Workspace::open(&content, dir.path().join("data"), "en").unwrap();
        let app = router(AppState::new(workspace, Some(KEY.to_string())));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), dir)
    }

    #[tokio::test]
    async fn test_health_and_open_reads() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{}/health", base)).send().await.unwrap();
        assert_eq!(health.status(), 200);

        let quality: Value = client
            .get(format!("{}/api/quality?locale=es&severity=error", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(quality["issues"][0]["check"], "missing_variables");
    }

    #[tokio::test]
    async fn test_mutations_require_admin_key() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();
        let body = json!({"locale": "es", "namespace": "Greeting", "key": "hello", "value": "Hola, {name}!"});

        let denied = client
            .put(format!("{}/api/keys", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(denied.status(), 401);
        let error: ErrorBody = denied.json().await.unwrap();
        assert_eq!(error.error, "unauthorized");

        let accepted = client
            .put(format!("{}/api/keys", base))
            .header(ADMIN_KEY_HEADER, KEY)
            .header(ADMIN_USER_HEADER, "ana")
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(accepted.status(), 200);
        let entry: Value = accepted.json().await.unwrap();
        assert_eq!(entry["author"], "ana");
    }

    #[tokio::test]
    async fn test_errors_map_to_status_codes() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();
        let add = json!({"namespace": "Greeting", "key": "hello", "values": {"en": "Hi"}});

        let conflict = client
            .post(format!("{}/api/keys", base))
            .header(ADMIN_KEY_HEADER, KEY)
            .json(&add)
            .send()
            .await
            .unwrap();
        assert_eq!(conflict.status(), 409);

        let baseline = client
            .put(format!("{}/api/keys", base))
            .header(ADMIN_KEY_HEADER, KEY)
            .json(&json!({"locale": "en", "namespace": "Greeting", "key": "hello", "value": "Hi"}))
            .send()
            .await
            .unwrap();
        assert_eq!(baseline.status(), 400);

        let missing = client
            .get(format!("{}/api/lookup?namespace=Nope", base))
            .send()
            .await
            .unwrap();
        assert_eq!(missing.status(), 404);

        let not_configured = client
            .post(format!("{}/api/translate/missing", base))
            .header(ADMIN_KEY_HEADER, KEY)
            .json(&json!({"locale": "es"}))
            .send()
            .await
            .unwrap();
        assert_eq!(not_configured.status(), 400);
    }

    #[tokio::test]
    async fn test_path_like_locale_is_bad_request() {
        let (base, dir) = spawn_app().await;
        let client = reqwest::Client::new();

        let response = client
            .put(format!("{}/api/keys", base))
            .header(ADMIN_KEY_HEADER, KEY)
            .json(&json!({"locale": "../es", "namespace": "Greeting", "key": "hello", "value": "x"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 400);
        let error: ErrorBody = response.json().await.unwrap();
        assert_eq!(error.error, "invalid_argument");

        let es = fs::read_to_string(dir.path().join("messages/es.json")).unwrap();
        assert!(es.contains("Hola!"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_writes_are_all_kept() {
        let (base, dir) = spawn_app().await;
        let client = reqwest::Client::new();

        let requests = (0..8).map(|i| {
            client
                .post(format!("{}/api/keys/bulk", base))
                .header(ADMIN_KEY_HEADER, KEY)
                .json(&json!({
                    "locale": "es",
                    "updates": [{"namespace": "Greeting", "key": format!("k{}", i), "value": "v"}]
                }))
                .send()
        });
        for response in futures::future::join_all(requests).await {
            assert_eq!(response.unwrap().status(), 200);
        }

        let changelog: Value = client
            .get(format!("{}/api/changelog", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(changelog["entries"].as_array().unwrap().len(), 8);

        let es: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("messages/es.json")).unwrap())
                .unwrap();
        for i in 0..8 {
            assert_eq!(es["Greeting"][format!("k{}", i)], "v");
        }
    }

    #[tokio::test]
    async fn test_export_sets_content_type() {
        let (base, _dir) = spawn_app().await;
        let response = reqwest::get(format!("{}/api/export?format=csv", base))
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE.as_str()],
            "text/csv; charset=utf-8"
        );
        let body = response.text().await.unwrap();
        assert!(body.starts_with("Namespace,Key,EN,ES"));
    }

    #[tokio::test]
    async fn test_remove_locale_needs_confirmation() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();

        let refused = client
            .delete(format!("{}/api/locales/es", base))
            .header(ADMIN_KEY_HEADER, KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(refused.status(), 400);

        let archived = client
            .delete(format!("{}/api/locales/es?confirm=es", base))
            .header(ADMIN_KEY_HEADER, KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(archived.status(), 200);

        let listed: Value = client
            .get(format!("{}/api/archive", base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(listed[0]["locale"], "es");
    }

    #[tokio::test]
    async fn test_snapshot_without_body_covers_all_locales() {
        let (base, _dir) = spawn_app().await;
        let client = reqwest::Client::new();
        let created = client
            .post(format!("{}/api/snapshots", base))
            .header(ADMIN_KEY_HEADER, KEY)
            .send()
            .await
            .unwrap();
        assert_eq!(created.status(), 201);
        let snapshots: Vec<Value> = created.json().await.unwrap();
        assert_eq!(snapshots.len(), 2);
    }
}
