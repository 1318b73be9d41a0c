//! ConvoRelay CLI - 命令行交互接口

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cr_llm::provider::{
    GeminiConfig, GeminiSessionFactory, OpenAIConfig, OpenAISessionFactory, RelaySessionFactory,
};
use cr_llm::{
    ContextWindow, CredentialPool, ExchangeConfig, RetryPolicy, Role, SessionContext,
    SessionFactory,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Provider {
    Gemini,
    Openai,
}

#[derive(Debug, Parser)]
#[command(name = "cr", version, about = "Chat with a model over a rotating credential pool")]
struct Args {
    /// 凭证文件
    #[arg(long, env = "CONVORELAY_KEYS", default_value = "api-key.json")]
    keys: PathBuf,

    /// 系统指令文件
    #[arg(long, env = "CONVORELAY_INSTRUCTIONS", default_value = "instructions.txt")]
    instructions: PathBuf,

    #[arg(long, value_enum, default_value_t = Provider::Gemini)]
    provider: Provider,

    #[arg(long, env = "CONVORELAY_MODEL")]
    model: Option<String>,

    /// 经由代理转发（设置后忽略 --provider）
    #[arg(long, env = "CONVORELAY_PROXY_URL")]
    proxy_url: Option<String>,

    #[arg(long, env = "CONVORELAY_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,

    /// 只回放最近 N 轮；缺省回放全部
    #[arg(long, env = "CONVORELAY_CONTEXT_TURNS")]
    context_turns: Option<usize>,

    /// 限流时直接提示，不自动换凭证重试
    #[arg(long)]
    no_retry: bool,
}

impl Args {
    fn factory(&self) -> Arc<dyn SessionFactory> {
        if let Some(url) = &self.proxy_url {
            return Arc::new(RelaySessionFactory::new(url.clone()));
        }
        match self.provider {
            Provider::Gemini => {
                let mut config = GeminiConfig::default();
                if let Some(model) = &self.model {
                    config.model = model.clone();
                }
                Arc::new(GeminiSessionFactory::new(config))
            }
            Provider::Openai => {
                let mut config = OpenAIConfig::default();
                if let Some(model) = &self.model {
                    config.model = model.clone();
                }
                Arc::new(OpenAISessionFactory::new(config))
            }
        }
    }

    fn exchange_config(&self) -> ExchangeConfig {
        ExchangeConfig {
            retry: if self.no_retry {
                RetryPolicy::surface_notice()
            } else {
                RetryPolicy::default()
            },
            timeout: Duration::from_secs(self.timeout_secs),
            window: self
                .context_turns
                .map_or(ContextWindow::Full, ContextWindow::MostRecent),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cr=warn,cr_llm=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = Args::parse();

    let keys = cr_core::load_credentials(&args.keys)
        .with_context(|| format!("loading credentials from {}", args.keys.display()))?;
    let instructions = cr_core::load_instructions(&args.instructions)
        .with_context(|| format!("loading instructions from {}", args.instructions.display()))?;

    let pool = CredentialPool::new(keys)?.into_shared();
    let ctx = SessionContext::new(pool, args.factory(), instructions, args.exchange_config());

    println!("ConvoRelay CLI v{}", env!("CARGO_PKG_VERSION"));
    println!("Type '/help' for available commands, '/quit' to exit.");
    println!();

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("you> ");
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }
        let input = input.trim();

        match input {
            "" => continue,
            "/help" => {
                println!("Available commands:");
                println!("  /help         - Show this help message");
                println!("  /history      - Show the conversation so far");
                println!("  /usage        - Show credential usage and token totals");
                println!("  /clear        - Clear the screen");
                println!("  /quit /exit   - Exit the CLI");
                println!("Anything else is sent to the model.");
            }
            "/history" => {
                for (role, text) in ctx.transcript().await {
                    let who = match role {
                        Role::User => "you",
                        Role::Assistant => "bot",
                    };
                    println!("{who}> {text}");
                }
            }
            "/usage" => {
                let pool = ctx.pool().lock().await;
                println!("Credentials (active #{}):", pool.cursor());
                for (masked, uses) in pool.usage() {
                    println!("  {masked:<16} {uses} successful call(s)");
                }
                println!("Tokens this session: {}", ctx.total_tokens());
            }
            "/clear" => {
                print!("\x1B[2J\x1B[1;1H");
            }
            "/quit" | "/exit" => {
                println!("Goodbye!");
                break;
            }
            prompt => {
                let Some(result) = ctx.submit(prompt).await else {
                    continue;
                };
                if let Some(text) = result.display_text() {
                    println!("bot> {text}");
                }
            }
        }
    }

    Ok(())
}
