//! Tolerant extraction of expected values from loosely-shaped server payloads.
//!
//! The backend has shipped several response dialects over time: the expected
//! field at the top level, a legacy `success` envelope with a differently
//! named field, and occasionally the bare value itself. Each call site
//! declares its field names as a shape constant and the probes here are tried
//! in a fixed order, first match wins. When nothing matches, a generic
//! heuristic salvages whatever content the payload carries; that salvage is
//! treated as best-effort success and never records an error.

use serde_json::Value;
use tracing::debug;

/// Substring the server embeds in success messages that lack a boolean flag.
pub const SUCCESS_MARKER: &str = "成功";

/// Ordered field probes for a text-valued endpoint. `direct` fields are
/// accepted as-is; `legacy` fields only count inside a truthy `success`
/// envelope.
pub struct TextShape {
    pub direct: &'static [&'static str],
    pub legacy: &'static [&'static str],
}

pub const INTRODUCTION: TextShape = TextShape {
    direct: &["content"],
    legacy: &["introduction"],
};

pub const ANALYSIS: TextShape = TextShape {
    direct: &["analysis"],
    legacy: &[],
};

pub const SUGGESTIONS: TextShape = TextShape {
    direct: &["suggestions"],
    legacy: &[],
};

pub const CHAT_REPLY: TextShape = TextShape {
    direct: &["response"],
    legacy: &[],
};

pub const FINAL_SUMMARY: TextShape = TextShape {
    direct: &["summary"],
    legacy: &[],
};

/// Fields whose presence identifies a payload as an exam record.
pub const EXAM_MARKERS: &[&str] = &["exam_id", "content", "questions"];

/// Truthiness in the sense the historical frontend applied to these payloads.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn success_flag(value: &Value) -> bool {
    value.get("success").is_some_and(is_truthy)
}

fn non_empty_str<'a>(value: &'a Value, field: &str) -> Option<&'a str> {
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
}

/// Extracts the expected text value for a call site, probing dialects in
/// order: direct field, legacy envelope field, raw string payload, generic
/// heuristic.
pub fn text(value: &Value, shape: &TextShape) -> Option<String> {
    if value.is_object() {
        for field in shape.direct {
            if let Some(found) = non_empty_str(value, field) {
                return Some(found.to_string());
            }
        }
        if success_flag(value) {
            for field in shape.legacy {
                if let Some(found) = non_empty_str(value, field) {
                    return Some(found.to_string());
                }
            }
        }
    }

    if let Some(raw) = value.as_str() {
        return Some(raw.to_string());
    }

    generic_text(value)
}

/// Last-resort content salvage for unrecognized object payloads: well-known
/// carrier fields first, then a full serialization so the view always has
/// something to render. Returns `None` for payloads that are not containers.
pub fn generic_text(value: &Value) -> Option<String> {
    if !value.is_object() && !value.is_array() {
        return None;
    }

    for field in ["text", "data", "message"] {
        if let Some(found) = non_empty_str(value, field) {
            debug!(field, "extracted content from unrecognized payload shape");
            return Some(found.to_string());
        }
    }

    serde_json::to_string(value).ok()
}

/// Extracts a list-shaped value: bare array payload, an `items` field, or the
/// first array-valued key of an unrecognized object.
pub fn items(value: &Value) -> Option<Vec<Value>> {
    if let Some(list) = value.as_array() {
        return Some(list.clone());
    }

    let obj = value.as_object()?;
    if let Some(list) = obj.get("items").and_then(Value::as_array) {
        return Some(list.clone());
    }

    for (key, candidate) in obj {
        if let Some(list) = candidate.as_array() {
            debug!(key = %key, "extracted list from unrecognized payload shape");
            return Some(list.clone());
        }
    }

    None
}

/// Accepts a payload as a record when any marker field is present and truthy;
/// the whole payload is the record.
pub fn record(value: &Value, markers: &[&str]) -> Option<Value> {
    let obj = value.as_object()?;
    markers
        .iter()
        .any(|marker| obj.get(*marker).is_some_and(is_truthy))
        .then(|| value.clone())
}

/// Extracts a user profile: a `user` field (with or without the `success`
/// envelope), else any object not carrying an `error` field is taken to be
/// the profile itself.
pub fn user_record(value: &Value) -> Option<Value> {
    let obj = value.as_object()?;
    if let Some(user) = obj.get("user").filter(|user| is_truthy(user)) {
        return Some(user.clone());
    }
    if !obj.contains_key("error") {
        return Some(value.clone());
    }
    None
}

/// Result of interpreting a write-endpoint response. The server never settled
/// on one success signal, so the probe is explicit about what it saw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(String),
    Ambiguous,
}

impl SubmitOutcome {
    /// Store policy: a response that neither confirms nor denies counts as
    /// success. Only an explicit rejection fails the operation.
    pub fn is_success(&self) -> bool {
        !matches!(self, SubmitOutcome::Rejected(_))
    }
}

/// Tri-state success probe: an explicit `success` boolean wins, then a
/// message containing the success marker, then an `error` field; anything
/// else is `Ambiguous`.
pub fn submit_outcome(value: &Value) -> SubmitOutcome {
    let Some(obj) = value.as_object() else {
        return SubmitOutcome::Ambiguous;
    };

    match obj.get("success").and_then(Value::as_bool) {
        Some(true) => return SubmitOutcome::Accepted,
        Some(false) => return SubmitOutcome::Rejected(rejection_reason(value)),
        None => {}
    }

    if value
        .get("message")
        .and_then(Value::as_str)
        .is_some_and(|message| message.contains(SUCCESS_MARKER))
    {
        return SubmitOutcome::Accepted;
    }

    if obj.get("error").is_some_and(is_truthy) {
        return SubmitOutcome::Rejected(rejection_reason(value));
    }

    SubmitOutcome::Ambiguous
}

fn rejection_reason(value: &Value) -> String {
    non_empty_str(value, "error")
        .or_else(|| non_empty_str(value, "message"))
        .map(str::to_string)
        .unwrap_or_default()
}

/// Generic reading-strategy guide substituted when the suggestion endpoint
/// yields nothing, so the suggestions view never renders empty.
pub const FALLBACK_STRATEGY_GUIDE: &str = r#"# 阅读策略建议

由于系统暂时无法提供个性化的阅读策略建议，以下是一些通用的阅读策略，希望能对您有所帮助：

## 一、扫读技巧 (Skimming)

**目的**：快速获取文章的主要内容和结构。

**方法**：
1. 阅读标题和副标题
2. 阅读每段的第一句和最后一句
3. 注意加粗、斜体等强调内容
4. 阅读图表和总结段落

## 二、细读技巧 (Intensive Reading)

**目的**：深入理解文章的细节和论点。

**方法**：
1. 阅读每一个句子
2. 标记关键词和重要信息
3. 注意过渡词和逻辑连接词
4. 思考作者的意图和态度

## 三、SQ3R 方法

1. **Survey**：快速浏览全文
2. **Question**：提出问题
3. **Read**：阅读文章
4. **Recite**：复述内容
5. **Review**：回顾全文

希望这些通用策略对您有所帮助。如需获取更个性化的建议，请稍后再试。
"#;

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
