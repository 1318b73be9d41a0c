//! 模型回复清洗
//!
//! 纯函数，无状态：
//! 1. Markdown 链接与裸 URL 替换为固定的可点击标记
//! 2. 去掉加粗标记与项目符号
//! 3. 去掉残留的 `[` 与末尾残留的 `]`
//! 4. 去掉符号后拼出的 URL 再包装一次
//! 5. 去首尾空白
//!
//! 标记本身不含方括号、星号，其中的 URL 紧跟 `href="`，再次清洗时原样保留，
//! 因此 `sanitize(sanitize(x)) == sanitize(x)`。

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[.*?\]\((.*?)\)|https?://[^\s)]+").expect("link pattern is valid")
});

static OPEN_BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*\[|\[\s*").expect("bracket pattern is valid"));

static TRAILING_BRACKET_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s*\])+\s*$").expect("bracket pattern is valid"));

const HREF_PREFIX: &str = "<a href=\"";

fn link_marker(url: &str) -> String {
    format!("{HREF_PREFIX}{url}\" target=\"_blank\">Click here</a>")
}

/// 将原始模型文本清洗为可展示文本
pub fn sanitize(text: &str) -> String {
    let linked = link_urls(text);

    let stripped: String = linked.chars().filter(|c| *c != '*' && *c != '•').collect();
    let stripped = OPEN_BRACKET_RE.replace_all(&stripped, "");
    let stripped = TRAILING_BRACKET_RE.replace(&stripped, "");

    // 去掉符号后可能拼出新的 URL，已包装的不会重复包装
    link_urls(&stripped).trim().to_string()
}

fn link_urls(text: &str) -> String {
    LINK_RE
        .replace_all(text, |caps: &Captures<'_>| {
            let whole = &caps[0];
            let start = caps.get(0).map_or(0, |m| m.start());
            if text[..start].ends_with(HREF_PREFIX) {
                return whole.to_string();
            }
            let url = caps
                .get(1)
                .map(|m| m.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(whole);
            link_marker(url)
        })
        .into_owned()
}
