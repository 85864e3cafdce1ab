//! JSON emission for push reports

use anyhow::Context;
use serde::Serialize;

use crate::report::PushReport;

/// Serialize a value as canonical JSON (RFC 8785).
pub fn emit_jcs<T: Serialize>(value: &T) -> anyhow::Result<String> {
    let value = serde_json::to_value(value).context("Failed to serialize to JSON value")?;
    let bytes = serde_json_canonicalizer::to_vec(&value).context("Failed to canonicalize JSON")?;
    String::from_utf8(bytes).context("Canonical JSON is not valid UTF-8")
}

/// Emit a push report as canonical JSON so repeated runs produce stable diffs.
pub fn emit_push_json(report: &PushReport) -> anyhow::Result<String> {
    emit_jcs(report).context("Failed to emit push report JSON")
}
