//! 代理服务器

use std::any::Any;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::RwLock;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use cr_core::{load_credentials, ConvoRelayError, Result};
use cr_llm::provider::{OpenAIConfig, OpenAIProvider, ProviderOutput};
use cr_llm::{classify_error, CredentialPool, SharedCredentialPool};

use crate::error::ApiError;
use crate::messages::parse_chat_request;

/// 代理配置
#[derive(Debug, Clone)]
pub struct ProxyConfig {
    /// 监听地址
    pub addr: SocketAddr,
    /// 凭证文件；为空时只接受请求自带的 Bearer 凭证
    pub credentials_path: Option<PathBuf>,
    pub upstream: OpenAIConfig,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            credentials_path: Some(PathBuf::from("api-key.json")),
            upstream: OpenAIConfig::default(),
        }
    }
}

/// 请求所用凭证的来源
enum Selected {
    Request(String),
    Pool {
        pool: SharedCredentialPool,
        index: usize,
        key: String,
    },
}

impl Selected {
    fn key(&self) -> &str {
        match self {
            Selected::Request(key) | Selected::Pool { key, .. } => key,
        }
    }
}

/// 路由共享状态
pub struct ProxyState {
    upstream: OpenAIProvider,
    pool: RwLock<Option<SharedCredentialPool>>,
    credentials_path: Option<PathBuf>,
}

impl ProxyState {
    pub fn new(
        upstream: OpenAIProvider,
        pool: Option<CredentialPool>,
        credentials_path: Option<PathBuf>,
    ) -> Self {
        Self {
            upstream,
            pool: RwLock::new(pool.map(CredentialPool::into_shared)),
            credentials_path,
        }
    }

    async fn pool(&self) -> Option<SharedCredentialPool> {
        if let Some(pool) = self.pool.read().await.as_ref() {
            return Some(Arc::clone(pool));
        }

        let path = self.credentials_path.as_ref()?;
        let mut slot = self.pool.write().await;
        if slot.is_none() {
            match load_credentials(path).and_then(CredentialPool::new) {
                Ok(pool) => *slot = Some(pool.into_shared()),
                Err(e) => tracing::error!(error = %e, "credential reload failed"),
            }
        }
        slot.clone()
    }

    async fn select_credential(&self, headers: &HeaderMap) -> Result<Selected> {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|v| !v.is_empty());
        if let Some(key) = bearer {
            return Ok(Selected::Request(key.to_string()));
        }

        let pool = self.pool().await.ok_or_else(|| {
            ConvoRelayError::Configuration("no credential available".to_string())
        })?;
        let (index, key) = {
            let guard = pool.lock().await;
            (guard.cursor(), guard.current().value().to_string())
        };
        Ok(Selected::Pool { pool, index, key })
    }

    /// 上游调用结束后推进服务端凭证池：成功或限流都前进一步
    async fn settle(selected: &Selected, outcome: &Result<ProviderOutput>) {
        let Selected::Pool { pool, index, .. } = selected else {
            return;
        };
        let mut guard = pool.lock().await;
        match outcome {
            Ok(_) => {
                guard.advance();
                guard.record_use(*index);
            }
            Err(err) if classify_error(err).is_rate_limited() => {
                tracing::warn!(error = %err, "upstream rate limited, rotating credential");
                guard.advance();
            }
            Err(_) => {}
        }
    }
}

async fn chat(
    State(state): State<Arc<ProxyState>>,
    headers: HeaderMap,
    body: Bytes,
) -> std::result::Result<Response, ApiError> {
    let ast = parse_chat_request(&body)?;
    let selected = state.select_credential(&headers).await?;
    let messages = ast.to_openai_messages();

    let result = state.upstream.run(selected.key(), &messages).await;
    ProxyState::settle(&selected, &result).await;

    let output = result.map_err(|e| {
        tracing::error!(error = %e, "upstream call failed");
        ApiError::from(e)
    })?;

    if let Some(usage) = output.usage {
        tracing::info!(
            input_tokens = usage.prompt_tokens,
            output_tokens = usage.output_tokens,
            total_tokens = usage.total_tokens,
            "upstream token usage"
        );
    }
    Ok(Json(serde_json::json!({ "output": output.output })).into_response())
}

async fn health(State(state): State<Arc<ProxyState>>) -> Json<serde_json::Value> {
    let credentials = match state.pool.read().await.as_ref() {
        Some(pool) => pool.lock().await.len(),
        None => 0,
    };
    Json(serde_json::json!({ "status": "ok", "credentials": credentials }))
}

fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> Response {
    tracing::error!("handler panicked");
    ApiError::internal().into_response()
}

/// 构建 Axum 路由
pub fn build_router(state: Arc<ProxyState>) -> Router {
    Router::new()
        .route("/chat", post(chat))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// 代理服务器
pub struct ProxyServer {
    config: ProxyConfig,
    state: Arc<ProxyState>,
}

impl ProxyServer {
    /// `pool` 为启动时已加载的凭证；为空时首个请求会按 `credentials_path` 重新加载
    pub fn new(config: ProxyConfig, pool: Option<CredentialPool>) -> Self {
        let state = Arc::new(ProxyState::new(
            OpenAIProvider::new(config.upstream.clone()),
            pool,
            config.credentials_path.clone(),
        ));
        Self { config, state }
    }

    /// 启动服务器
    pub async fn start(&self) -> Result<()> {
        let app = build_router(Arc::clone(&self.state));
        let listener = tokio::net::TcpListener::bind(&self.config.addr).await?;
        tracing::info!(addr = %self.config.addr, "proxy listening");

        axum::serve(listener, app).await?;
        Ok(())
    }

    /// 获取配置
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}
