//! # cr_core - ConvoRelay Core Primitives
//!
//! 核心原语层，定义错误分类、对话轮次以及凭证/指令来源的加载。
//! 此 crate 是整个项目的基础依赖，不依赖其他业务 crate。

pub mod error;
pub mod source;
pub mod turn;

pub use error::{ConvoRelayError, ErrorKind, Result};
pub use source::{load_credentials, load_instructions, CredentialSource};
pub use turn::{Role, Turn};
