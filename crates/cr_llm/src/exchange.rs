//! 交换编排层
//!
//! 状态机：`Idle -> Sending -> {成功, 限流, 失败} -> Idle`。
//!
//! - 空输入直接忽略，不记日志、不发请求
//! - 用户轮次先入日志，再以（按窗口截取的）完整上下文调用当前凭证的会话
//! - 成功：清洗回复并入日志，凭证池前进一步并记录使用次数
//! - 限流：立即轮转凭证并在新凭证上重建会话，按 [`RetryPolicy`] 至多重试一次
//! - 其他失败：不轮转，不写助手轮次，返回通用提示
//!
//! 同一会话同时只允许一个请求在途，并发提交返回 [`ExchangeResult::Busy`]。

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::Mutex;

use crate::classify::classify_error;
use crate::conversation::{ContextWindow, ConversationLog};
use crate::credential_pool::SharedCredentialPool;
use crate::retry::RetryPolicy;
use crate::sanitize::sanitize;
use crate::session::{RawResponse, SessionFactory, SessionHandle};
use crate::{ConvoRelayError, Result, Role, Turn};

pub const RATE_LIMIT_NOTICE: &str = "Too many requests. Please try again after some time.";
pub const FAILURE_NOTICE: &str = "Something went wrong. Please try again later.";
pub const EMPTY_REPLY_TEXT: &str = "Sorry, I couldn't understand.";

/// 编排参数
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub retry: RetryPolicy,
    /// 单次模型调用的超时
    pub timeout: Duration,
    pub window: ContextWindow,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(60),
            window: ContextWindow::Full,
        }
    }
}

/// 一次提交的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangeResult {
    /// 清洗后的回复
    Success(String),
    /// 限流提示
    RateLimited(String),
    /// 通用失败提示
    OtherFailure(String),
    /// 已有请求在途，本次未处理
    Busy,
}

impl ExchangeResult {
    /// 交给展示层的文本
    pub fn display_text(&self) -> Option<&str> {
        match self {
            ExchangeResult::Success(t)
            | ExchangeResult::RateLimited(t)
            | ExchangeResult::OtherFailure(t) => Some(t.as_str()),
            ExchangeResult::Busy => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeState {
    Idle,
    Sending,
}

/// 与凭证池游标绑定的会话句柄
type BoundSession = (usize, Arc<dyn SessionHandle>);

struct SendingGuard<'a>(&'a AtomicBool);

impl<'a> SendingGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SendingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// 单个对话的会话上下文：凭证池（可与其他对话共享）+ 独占的对话日志 + 当前句柄
pub struct SessionContext {
    pool: SharedCredentialPool,
    factory: Arc<dyn SessionFactory>,
    system_instruction: String,
    config: ExchangeConfig,
    log: Mutex<ConversationLog>,
    active: Mutex<Option<BoundSession>>,
    sending: AtomicBool,
    total_tokens: AtomicU64,
}

impl SessionContext {
    pub fn new(
        pool: SharedCredentialPool,
        factory: Arc<dyn SessionFactory>,
        system_instruction: impl Into<String>,
        config: ExchangeConfig,
    ) -> Self {
        Self {
            pool,
            factory,
            system_instruction: system_instruction.into(),
            config,
            log: Mutex::new(ConversationLog::new()),
            active: Mutex::new(None),
            sending: AtomicBool::new(false),
            total_tokens: AtomicU64::new(0),
        }
    }

    /// 处理一次用户输入；空输入返回 `None`
    pub async fn submit(&self, input: &str) -> Option<ExchangeResult> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }

        let Some(_guard) = SendingGuard::acquire(&self.sending) else {
            tracing::warn!("exchange already in flight, rejecting concurrent send");
            return Some(ExchangeResult::Busy);
        };

        let history = {
            let mut log = self.log.lock().await;
            log.append(Turn::user(text));
            log.window(self.config.window)
                .split_last()
                .map(|(_, rest)| rest.to_vec())
                .unwrap_or_default()
        };
        tracing::debug!(history = history.len(), "sending exchange");

        Some(self.run_exchange(&history, text).await)
    }

    async fn run_exchange(&self, history: &[Turn], prompt: &str) -> ExchangeResult {
        let mut bound = match self.bind_session().await {
            Ok(bound) => bound,
            Err(err) => {
                tracing::error!(error = %err, "cannot create model session");
                return ExchangeResult::OtherFailure(FAILURE_NOTICE.to_string());
            }
        };

        let mut attempt = 1;
        loop {
            let (index, handle) = (bound.0, Arc::clone(&bound.1));
            let err = match self.send_once(handle.as_ref(), history, prompt).await {
                Ok(raw) => return self.complete(index, raw).await,
                Err(err) => err,
            };

            let failure = classify_error(&err);
            if !failure.is_rate_limited() {
                tracing::error!(attempt, error = %err, "model call failed");
                return ExchangeResult::OtherFailure(FAILURE_NOTICE.to_string());
            }

            tracing::warn!(attempt, error = %err, "rate limit detected, rotating credential");
            self.rotate().await;
            let retry = self.config.retry.should_retry(attempt, &failure);

            // 轮转后必须换新句柄，旧句柄不得跨越轮转边界
            match self.bind_session().await {
                Ok(fresh) => bound = fresh,
                Err(err) => {
                    tracing::error!(error = %err, "cannot bind rotated credential");
                    return ExchangeResult::RateLimited(RATE_LIMIT_NOTICE.to_string());
                }
            }

            if !retry {
                return ExchangeResult::RateLimited(RATE_LIMIT_NOTICE.to_string());
            }
            attempt += 1;
        }
    }

    /// 一次网络调用，带超时与 panic 隔离
    async fn send_once(
        &self,
        handle: &dyn SessionHandle,
        history: &[Turn],
        prompt: &str,
    ) -> Result<RawResponse> {
        let call = AssertUnwindSafe(handle.send(history, prompt)).catch_unwind();
        match tokio::time::timeout(self.config.timeout, call).await {
            Err(_) => Err(ConvoRelayError::Provider(format!(
                "request timed out after {:?}",
                self.config.timeout
            ))),
            Ok(Err(_)) => Err(ConvoRelayError::Provider(
                "session handle panicked".to_string(),
            )),
            Ok(Ok(result)) => result,
        }
    }

    async fn complete(&self, index: usize, raw: RawResponse) -> ExchangeResult {
        let mut display = sanitize(&raw.text);
        if display.is_empty() {
            display = EMPTY_REPLY_TEXT.to_string();
        }

        self.log.lock().await.append(Turn::assistant(display.clone()));
        {
            let mut pool = self.pool.lock().await;
            pool.advance();
            pool.record_use(index);
        }
        *self.active.lock().await = None;

        if let Some(usage) = raw.usage {
            let running =
                self.total_tokens.fetch_add(usage.total_tokens, Ordering::Relaxed) + usage.total_tokens;
            tracing::info!(
                input_tokens = usage.prompt_tokens,
                output_tokens = usage.output_tokens,
                total_tokens = usage.total_tokens,
                running_total = running,
                "token usage"
            );
        }

        ExchangeResult::Success(display)
    }

    /// 游标前进并丢弃旧句柄
    async fn rotate(&self) {
        self.pool.lock().await.advance();
        *self.active.lock().await = None;
    }

    /// 取当前游标的句柄，游标变化后重建
    async fn bind_session(&self) -> Result<BoundSession> {
        let (cursor, credential) = {
            let pool = self.pool.lock().await;
            (pool.cursor(), pool.current().clone())
        };

        let mut active = self.active.lock().await;
        if let Some((index, handle)) = active.as_ref() {
            if *index == cursor {
                return Ok((*index, Arc::clone(handle)));
            }
        }

        let created = std::panic::catch_unwind(AssertUnwindSafe(|| {
            self.factory.create_session(&credential, &self.system_instruction)
        }))
        .map_err(|_| ConvoRelayError::Provider("session factory panicked".to_string()))??;
        let handle: Arc<dyn SessionHandle> = Arc::from(created);
        tracing::debug!(cursor, credential = %credential.masked(), "session bound");
        *active = Some((cursor, Arc::clone(&handle)));
        Ok((cursor, handle))
    }

    pub fn state(&self) -> ExchangeState {
        if self.sending.load(Ordering::Acquire) {
            ExchangeState::Sending
        } else {
            ExchangeState::Idle
        }
    }

    pub async fn log_len(&self) -> usize {
        self.log.lock().await.len()
    }

    /// `(角色, 展示文本)` 序列，供展示层使用
    pub async fn transcript(&self) -> Vec<(Role, String)> {
        self.log
            .lock()
            .await
            .as_context()
            .iter()
            .map(|t| (t.role(), t.text().to_string()))
            .collect()
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens.load(Ordering::Relaxed)
    }

    pub fn pool(&self) -> &SharedCredentialPool {
        &self.pool
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential_pool::{Credential, CredentialPool};
    use crate::session::TokenUsage;
    use async_trait::async_trait;
    use std::collections::VecDeque;

    #[derive(Debug, Clone)]
    enum Step {
        Reply(&'static str),
        Usage(&'static str, u64),
        Fail(&'static str),
        Delay(u64, &'static str),
        Panic,
        Hang,
    }

    #[derive(Debug, Clone)]
    struct Call {
        credential: String,
        system: String,
        history: Vec<Turn>,
        prompt: String,
    }

    #[derive(Default)]
    struct Script {
        steps: std::sync::Mutex<VecDeque<Step>>,
        calls: std::sync::Mutex<Vec<Call>>,
        created: std::sync::Mutex<Vec<String>>,
    }

    impl Script {
        fn with(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: std::sync::Mutex::new(steps.into()),
                ..Default::default()
            })
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.lock().unwrap().clone()
        }

        fn credentials_called(&self) -> Vec<String> {
            self.calls().into_iter().map(|c| c.credential).collect()
        }

        fn created(&self) -> Vec<String> {
            self.created.lock().unwrap().clone()
        }
    }

    struct ScriptedFactory {
        script: Arc<Script>,
        reject: Option<&'static str>,
        panic_on: Option<&'static str>,
    }

    impl SessionFactory for ScriptedFactory {
        fn create_session(
            &self,
            credential: &Credential,
            system_instruction: &str,
        ) -> Result<Box<dyn SessionHandle>> {
            if self.reject == Some(credential.value()) {
                return Err(ConvoRelayError::Configuration("rejected".into()));
            }
            if self.panic_on == Some(credential.value()) {
                panic!("factory blew up");
            }
            self.script
                .created
                .lock()
                .unwrap()
                .push(credential.value().to_string());
            Ok(Box::new(ScriptedSession {
                credential: credential.value().to_string(),
                system: system_instruction.to_string(),
                script: Arc::clone(&self.script),
            }))
        }
    }

    struct ScriptedSession {
        credential: String,
        system: String,
        script: Arc<Script>,
    }

    #[async_trait]
    impl SessionHandle for ScriptedSession {
        async fn send(&self, history: &[Turn], prompt: &str) -> Result<RawResponse> {
            self.script.calls.lock().unwrap().push(Call {
                credential: self.credential.clone(),
                system: self.system.clone(),
                history: history.to_vec(),
                prompt: prompt.to_string(),
            });
            let step = self
                .script
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Step::Reply("default"));

            match step {
                Step::Reply(text) => Ok(RawResponse::text(text)),
                Step::Usage(text, total) => Ok(RawResponse {
                    text: text.to_string(),
                    usage: Some(TokenUsage {
                        prompt_tokens: total - 1,
                        output_tokens: 1,
                        total_tokens: total,
                    }),
                }),
                Step::Fail(message) => Err(ConvoRelayError::Provider(message.to_string())),
                Step::Delay(ms, text) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    Ok(RawResponse::text(text))
                }
                Step::Panic => panic!("scripted panic"),
                Step::Hang => {
                    tokio::time::sleep(Duration::from_secs(30)).await;
                    Ok(RawResponse::text("late"))
                }
            }
        }
    }

    fn context_with(
        keys: &[&str],
        cursor: usize,
        script: &Arc<Script>,
        config: ExchangeConfig,
        reject: Option<&'static str>,
    ) -> SessionContext {
        let keys = keys.iter().map(|k| k.to_string()).collect();
        let pool = CredentialPool::with_cursor(keys, cursor).unwrap().into_shared();
        let factory = Arc::new(ScriptedFactory {
            script: Arc::clone(script),
            reject,
            panic_on: None,
        });
        SessionContext::new(pool, factory, "instr", config)
    }

    fn abc(cursor: usize, script: &Arc<Script>, retry: RetryPolicy) -> SessionContext {
        let config = ExchangeConfig {
            retry,
            timeout: Duration::from_secs(5),
            window: ContextWindow::Full,
        };
        context_with(&["A", "B", "C"], cursor, script, config, None)
    }

    async fn cursor(ctx: &SessionContext) -> usize {
        ctx.pool().lock().await.cursor()
    }

    #[tokio::test]
    async fn test_rate_limit_rotates_and_surfaces_notice() {
        let script = Script::with(vec![
            Step::Reply("first answer"),
            Step::Fail("429 Too Many Requests"),
        ]);
        let ctx = abc(1, &script, RetryPolicy::surface_notice());

        assert_eq!(
            ctx.submit("q1").await,
            Some(ExchangeResult::Success("first answer".into()))
        );
        assert_eq!(cursor(&ctx).await, 2);

        assert_eq!(
            ctx.submit("q2").await,
            Some(ExchangeResult::RateLimited(RATE_LIMIT_NOTICE.into()))
        );
        assert_eq!(cursor(&ctx).await, 0);

        let transcript = ctx.transcript().await;
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript[2], (Role::User, "q2".to_string()));
        assert_eq!(script.credentials_called(), vec!["B", "C"]);
        // 限流后立即在新凭证上重建会话
        assert_eq!(script.created(), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_rate_limit_then_provider_failure_on_retry() {
        let script = Script::with(vec![
            Step::Reply("ok"),
            Step::Fail("429 Too Many Requests"),
            Step::Fail("upstream exploded"),
        ]);
        let ctx = abc(1, &script, RetryPolicy::default());

        ctx.submit("q1").await;
        assert_eq!(
            ctx.submit("q2").await,
            Some(ExchangeResult::OtherFailure(FAILURE_NOTICE.into()))
        );
        assert_eq!(cursor(&ctx).await, 0);
        assert_eq!(ctx.log_len().await, 3);
        assert_eq!(script.credentials_called(), vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_once_on_next_credential() {
        let script = Script::with(vec![
            Step::Fail("quota rate exceeded"),
            Step::Reply("recovered"),
        ]);
        let ctx = abc(0, &script, RetryPolicy::default());

        assert_eq!(
            ctx.submit("hello").await,
            Some(ExchangeResult::Success("recovered".into()))
        );
        assert_eq!(script.credentials_called(), vec!["A", "B"]);
        assert_eq!(cursor(&ctx).await, 2);
        assert_eq!(ctx.log_len().await, 2);

        let usage = ctx.pool().lock().await.usage();
        assert_eq!(usage.iter().map(|(_, n)| *n).collect::<Vec<_>>(), vec![0, 1, 0]);
    }

    #[tokio::test]
    async fn test_retry_never_reuses_rate_limited_session() {
        let script = Script::with(vec![Step::Fail("429"), Step::Reply("ok")]);
        let ctx = abc(0, &script, RetryPolicy::new(2));

        assert_eq!(
            ctx.submit("hi").await,
            Some(ExchangeResult::Success("ok".into()))
        );
        assert_eq!(script.created(), vec!["A", "B"]);
        assert_eq!(script.credentials_called(), vec!["A", "B"]);
        assert_eq!(cursor(&ctx).await, 2);

        let usage = ctx.pool().lock().await.usage();
        assert_eq!(usage.iter().map(|(_, n)| *n).collect::<Vec<_>>(), vec![0, 1, 0]);
    }

    #[tokio::test]
    async fn test_at_most_one_retry_per_turn() {
        let script = Script::with(vec![
            Step::Fail("HTTP 429"),
            Step::Fail("Too Many Requests"),
            Step::Reply("never reached"),
        ]);
        let ctx = abc(0, &script, RetryPolicy::default());

        assert_eq!(
            ctx.submit("hello").await,
            Some(ExchangeResult::RateLimited(RATE_LIMIT_NOTICE.into()))
        );
        assert_eq!(script.calls().len(), 2);
        assert_eq!(cursor(&ctx).await, 2);
        assert_eq!(ctx.log_len().await, 1);
    }

    #[tokio::test]
    async fn test_other_failure_keeps_cursor_and_user_turn() {
        let script = Script::with(vec![Step::Fail("connection reset")]);
        let ctx = abc(2, &script, RetryPolicy::default());

        assert_eq!(
            ctx.submit("hello").await,
            Some(ExchangeResult::OtherFailure(FAILURE_NOTICE.into()))
        );
        assert_eq!(cursor(&ctx).await, 2);
        assert_eq!(ctx.log_len().await, 1);
        assert_eq!(script.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_input_is_noop() {
        let script = Script::with(vec![]);
        let ctx = abc(0, &script, RetryPolicy::default());

        assert_eq!(ctx.submit("").await, None);
        assert_eq!(ctx.submit(" \n\t ").await, None);
        assert_eq!(ctx.log_len().await, 0);
        assert!(script.calls().is_empty());
        assert!(script.created().is_empty());
        assert_eq!(cursor(&ctx).await, 0);
    }

    #[tokio::test]
    async fn test_history_excludes_prompt_and_reply_is_sanitized() {
        let script = Script::with(vec![
            Step::Reply("a1"),
            Step::Reply("**a2** see [x](http://y.test)"),
        ]);
        let ctx = abc(0, &script, RetryPolicy::default());

        ctx.submit("  q1 ").await;
        let second = ctx.submit("q2").await.unwrap();
        let text = second.display_text().unwrap();
        assert!(!text.contains("**"));
        assert!(text.contains("http://y.test"));

        let calls = script.calls();
        assert_eq!(calls[0].prompt, "q1");
        assert!(calls[0].history.is_empty());
        assert_eq!(calls[1].system, "instr");
        assert_eq!(calls[1].history, vec![Turn::user("q1"), Turn::assistant("a1")]);
        assert_eq!(calls[1].prompt, "q2");

        let roles: Vec<Role> = ctx.transcript().await.into_iter().map(|(r, _)| r).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User, Role::Assistant]);
    }

    #[tokio::test]
    async fn test_most_recent_window_limits_history() {
        let script = Script::with(vec![Step::Reply("a1"), Step::Reply("a2")]);
        let config = ExchangeConfig {
            window: ContextWindow::MostRecent(2),
            ..Default::default()
        };
        let ctx = context_with(&["A"], 0, &script, config, None);

        ctx.submit("q1").await;
        ctx.submit("q2").await;
        let calls = script.calls();
        assert_eq!(calls[1].history, vec![Turn::assistant("a1")]);
        assert_eq!(ctx.log_len().await, 4);
    }

    #[tokio::test]
    async fn test_cursor_follows_successes_for_all_sizes() {
        let names = ["k0", "k1", "k2", "k3"];
        for n in 1..=names.len() {
            for c0 in 0..n {
                let script = Script::with(vec![]);
                let ctx = context_with(&names[..n], c0, &script, ExchangeConfig::default(), None);
                for k in 1..=5 {
                    ctx.submit("q").await;
                    assert_eq!(cursor(&ctx).await, (c0 + k) % n);
                    assert_eq!(ctx.log_len().await, 2 * k);
                }
            }
        }
    }

    #[tokio::test]
    async fn test_timeout_is_other_failure() {
        let script = Script::with(vec![Step::Hang]);
        let config = ExchangeConfig {
            timeout: Duration::from_millis(50),
            ..Default::default()
        };
        let ctx = context_with(&["A", "B"], 0, &script, config, None);

        assert_eq!(
            ctx.submit("hello").await,
            Some(ExchangeResult::OtherFailure(FAILURE_NOTICE.into()))
        );
        assert_eq!(cursor(&ctx).await, 0);
        assert_eq!(ctx.state(), ExchangeState::Idle);
    }

    #[tokio::test]
    async fn test_panic_is_contained() {
        let script = Script::with(vec![Step::Panic, Step::Reply("fine")]);
        let ctx = abc(0, &script, RetryPolicy::default());

        assert_eq!(
            ctx.submit("one").await,
            Some(ExchangeResult::OtherFailure(FAILURE_NOTICE.into()))
        );
        assert_eq!(
            ctx.submit("two").await,
            Some(ExchangeResult::Success("fine".into()))
        );
    }

    #[tokio::test]
    async fn test_concurrent_send_is_rejected() {
        let script = Script::with(vec![Step::Delay(200, "slow")]);
        let ctx = abc(0, &script, RetryPolicy::default());

        let (first, second) = tokio::join!(ctx.submit("one"), ctx.submit("two"));
        assert_eq!(first, Some(ExchangeResult::Success("slow".into())));
        assert_eq!(second, Some(ExchangeResult::Busy));
        assert_eq!(ctx.log_len().await, 2);
        assert_eq!(script.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_factory_panic_is_contained() {
        let script = Script::with(vec![Step::Reply("from B")]);
        let pool = CredentialPool::with_cursor(vec!["A".into(), "B".into()], 0)
            .unwrap()
            .into_shared();
        let factory = Arc::new(ScriptedFactory {
            script: Arc::clone(&script),
            reject: None,
            panic_on: Some("A"),
        });
        let ctx = Arc::new(SessionContext::new(pool, factory, "instr", ExchangeConfig::default()));

        let joined = tokio::spawn({
            let ctx = Arc::clone(&ctx);
            async move { ctx.submit("hi").await }
        })
        .await;

        assert_eq!(
            joined.unwrap(),
            Some(ExchangeResult::OtherFailure(FAILURE_NOTICE.into()))
        );
        assert_eq!(ctx.state(), ExchangeState::Idle);
        assert_eq!(cursor(&ctx).await, 0);
        assert!(script.calls().is_empty());
    }

    #[tokio::test]
    async fn test_session_creation_failure_is_reported() {
        let script = Script::with(vec![]);
        let ctx = context_with(&["A", "B"], 1, &script, ExchangeConfig::default(), Some("B"));

        assert_eq!(
            ctx.submit("hello").await,
            Some(ExchangeResult::OtherFailure(FAILURE_NOTICE.into()))
        );
        assert_eq!(cursor(&ctx).await, 1);
        assert_eq!(ctx.log_len().await, 1);
        assert!(script.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_reply_uses_fallback_text() {
        let script = Script::with(vec![Step::Reply("  ** ")]);
        let ctx = abc(0, &script, RetryPolicy::default());

        assert_eq!(
            ctx.submit("hello").await,
            Some(ExchangeResult::Success(EMPTY_REPLY_TEXT.into()))
        );
    }

    #[tokio::test]
    async fn test_token_usage_accumulates() {
        let script = Script::with(vec![Step::Usage("x", 10), Step::Usage("y", 5)]);
        let ctx = abc(0, &script, RetryPolicy::default());

        ctx.submit("a").await;
        ctx.submit("b").await;
        assert_eq!(ctx.total_tokens(), 15);
    }
}
