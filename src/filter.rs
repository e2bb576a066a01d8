use crate::config::CaptureConfig;
use std::fmt;

/// tcpdump filter built once per run. Empty means capture everything.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterExpression(String);

impl FilterExpression {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FilterExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn build_filter(config: &CaptureConfig) -> FilterExpression {
    // 自定义表达式优先，其余结构化选项全部忽略。
    if let Some(custom) = config.custom_filter.as_deref().filter(|c| !c.is_empty()) {
        return FilterExpression(custom.to_string());
    }

    let mut clauses = Vec::new();

    if !config.ports.is_empty() {
        let ports: Vec<String> = config.ports.iter().map(|p| format!("port {p}")).collect();
        clauses.push(format!("({})", ports.join(" or ")));
    }

    if let Some(host) = config.host.as_deref().filter(|h| !h.is_empty()) {
        clauses.push(format!("host {host}"));
    }

    if let Some(protocol) = config.protocol {
        clauses.push(protocol.to_string());
    }

    FilterExpression(clauses.join(" and "))
}
