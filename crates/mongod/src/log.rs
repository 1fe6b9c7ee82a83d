use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, error, info, warn};

/// Pre-4.4 text format: `<timestamp> <severity> <component> [<context>] <message>`
static LEGACY_LOG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\S+\s+([FEWID]\d?)\s+(\S+)\s+\[[^\]]*\]\s?(.*)$")
        .expect("Invalid regex pattern")
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Severity {
    Debug,
    Error,
    Info,
    Warning,
}

impl Severity {
    fn from_code(code: &str) -> Option<Self> {
        match code.chars().next()? {
            'F' | 'E' => Some(Self::Error),
            'W' => Some(Self::Warning),
            'I' => Some(Self::Info),
            'D' => Some(Self::Debug),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct LogLine {
    pub component: String,
    pub message: String,
    pub severity: Severity,
}

#[derive(Deserialize)]
struct StructuredLine {
    s: String,
    c: String,
    msg: String,
    attr: Option<Value>,
}

/// Parses a structured (4.4+) or legacy engine log line.
pub(crate) fn parse_log_line(line: &str) -> Option<LogLine> {
    if line.starts_with('{') {
        let structured: StructuredLine = serde_json::from_str(line).ok()?;

        let message = match structured.attr {
            Some(attr) if !attr.is_null() => format!("{} {}", structured.msg, attr),
            _ => structured.msg,
        };

        return Some(LogLine {
            component: structured.c.trim().to_string(),
            message,
            severity: Severity::from_code(&structured.s)?,
        });
    }

    let caps = LEGACY_LOG_REGEX.captures(line)?;

    Some(LogLine {
        component: caps.get(2)?.as_str().to_string(),
        message: caps.get(3)?.as_str().to_string(),
        severity: Severity::from_code(caps.get(1)?.as_str())?,
    })
}

/// Re-emits an engine log line at the matching level.
pub(crate) fn emit(line: &str) {
    let Some(parsed) = parse_log_line(line) else {
        info!(target: "mongod", "{}", line);
        return;
    };

    let LogLine {
        component,
        message,
        severity,
    } = parsed;

    match severity {
        Severity::Debug => debug!(target: "mongod", "[{}] {}", component, message),
        Severity::Error => error!(target: "mongod", "[{}] {}", component, message),
        Severity::Info => info!(target: "mongod", "[{}] {}", component, message),
        Severity::Warning => warn!(target: "mongod", "[{}] {}", component, message),
    }
}
