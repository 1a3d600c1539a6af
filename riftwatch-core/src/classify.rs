//! Status message classification
//!
//! The backend reports everything it does as free-form status text. This
//! module sorts that text into two buckets: messages about the connection to
//! the game client, and operational notices about features the user started.
//! Each message also gets a severity.
//!
//! The whole policy is the keyword tables below. Matching is a plain
//! substring test against the message with ASCII letters lowercased; there is
//! no other context.

/// What a status message is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Client detection, credentials, ports, server reachability
    Connection,
    /// Anything else (feature toggles, progress notices)
    Operational,
}

/// How good or bad a status message is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Positive,
    Negative,
    Neutral,
}

/// Result of classifying one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub severity: Severity,
}

/// Keywords marking a message as connection-related.
pub const CONNECTION_KEYWORDS: &[&str] = &[
    "lcu",
    "客户端",
    "服务器",
    "凭证",
    "端口",
    "连接",
    "自动检测",
    "进程",
    "client",
    "server",
    "credential",
    "port",
    "detect",
];

/// Keywords marking a message as a success.
pub const POSITIVE_KEYWORDS: &[&str] = &["成功", "已开启", "success", "enabled"];

/// Keywords marking a message as a failure. These win over positive ones.
pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "失败",
    "未运行",
    "未找到",
    "找不到",
    "无法连接",
    "错误",
    "fail",
    "not found",
    "not running",
    "cannot connect",
    "unable to connect",
    "error",
];

/// Classify a raw status message.
///
/// Empty input is `Operational` / `Neutral`.
pub fn classify(raw: &str) -> Classification {
    let text = raw.to_ascii_lowercase();

    let category = if contains_any(&text, CONNECTION_KEYWORDS) {
        Category::Connection
    } else {
        Category::Operational
    };

    let severity = if contains_any(&text, NEGATIVE_KEYWORDS) {
        Severity::Negative
    } else if contains_any(&text, POSITIVE_KEYWORDS) {
        Severity::Positive
    } else {
        Severity::Neutral
    };

    Classification { category, severity }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    !text.is_empty() && keywords.iter().any(|k| text.contains(k))
}
