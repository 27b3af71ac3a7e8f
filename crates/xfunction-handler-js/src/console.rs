use serde::Deserialize;

/// One captured `console.*` call: `[level, text]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub(crate) struct ConsoleLine(pub String, pub String);

/// Re-emit captured console output through tracing.
pub(crate) fn emit(lines: &[ConsoleLine]) {
    for ConsoleLine(level, text) in lines {
        match level.as_str() {
            "error" => tracing::error!(target: "xfunction::handler", "{}", text),
            "warn" => tracing::warn!(target: "xfunction::handler", "{}", text),
            "debug" => tracing::debug!(target: "xfunction::handler", "{}", text),
            _ => tracing::info!(target: "xfunction::handler", "{}", text),
        }
    }
}
