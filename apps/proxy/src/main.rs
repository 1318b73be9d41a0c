//! ConvoRelay Proxy - 持有凭证的单路由转发服务

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cr_llm::provider::OpenAIConfig;
use cr_llm::CredentialPool;
use cr_proxy::{ProxyConfig, ProxyServer};

#[derive(Debug, Parser)]
#[command(name = "convorelay-proxy", version, about = "Relay chat requests to the model provider")]
struct Args {
    /// 监听地址
    #[arg(long, env = "CONVORELAY_ADDR", default_value = "0.0.0.0:3000")]
    addr: SocketAddr,

    /// 凭证文件
    #[arg(long, env = "CONVORELAY_KEYS", default_value = "api-key.json")]
    keys: PathBuf,

    /// 上游模型
    #[arg(long, env = "CONVORELAY_MODEL")]
    model: Option<String>,

    /// 上游 API 基础地址
    #[arg(long)]
    base_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "convorelay_proxy=info,cr_proxy=info,cr_llm=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    tracing::info!("ConvoRelay Proxy starting...");

    let keys = cr_core::load_credentials(&args.keys)
        .with_context(|| format!("loading credentials from {}", args.keys.display()))?;
    tracing::info!("Credential source holds {} key(s)", keys.len());
    let pool = CredentialPool::new(keys)?;

    let mut upstream = OpenAIConfig::default();
    if let Some(model) = args.model {
        upstream.model = model;
    }
    if let Some(base_url) = args.base_url {
        upstream.base_url = base_url;
    }

    let config = ProxyConfig {
        addr: args.addr,
        credentials_path: Some(args.keys),
        upstream,
    };
    let server = ProxyServer::new(config, Some(pool));
    tracing::info!("Upstream model: {}", server.config().upstream.model);

    tokio::select! {
        res = server.start() => res?,
        _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
    }

    Ok(())
}
