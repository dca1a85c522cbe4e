//! admin-ajax envelope decoding.
//!
//! Every answer is `{"success": bool, "data": ...}`. PHP is loose about
//! types, so counts may arrive as numbers, numeric strings or `null`.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::{
    FailureKind, JobProgress, JobServerError, KnowledgeEntry, KnowledgeSource, KnowledgeStatus,
    StartAck, UpdatedChunks,
};

/// `action` values understood by the plugin.
pub mod actions {
    pub const START_REBUILD: &str = "aicb_start_embedding_rebuild";
    pub const PROCESS_BATCH: &str = "aicb_process_embedding_batch";
    pub const GET_PROGRESS: &str = "aicb_get_embedding_progress";
    pub const CANCEL_REBUILD: &str = "aicb_cancel_embedding_rebuild";
    pub const REBUILD_UPDATED: &str = "aicb_rebuild_updated_chunks";
    pub const GET_STATUS: &str = "aicb_get_embedding_status";
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default, deserialize_with = "lenient_bool")]
    success: bool,
    #[serde(default)]
    data: Option<Value>,
}

/// Splits the envelope: `Ok(data)` on success, an application error carrying
/// the server's message otherwise.
pub(crate) fn open_envelope(body: &[u8]) -> Result<Value, JobServerError> {
    let envelope: Envelope = serde_json::from_slice(body)
        .map_err(|err| JobServerError::new(FailureKind::Decode, err.to_string()))?;
    let data = envelope.data.unwrap_or(Value::Null);
    if envelope.success {
        Ok(data)
    } else {
        Err(JobServerError::application(message_of(&data)))
    }
}

fn message_of(data: &Value) -> Option<String> {
    let text = match data {
        Value::String(text) => text.as_str(),
        Value::Object(map) => map.get("message").and_then(Value::as_str)?,
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

#[derive(Debug, Default, Deserialize)]
struct ProgressData {
    #[serde(default, deserialize_with = "lenient_count")]
    processed: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    total: u64,
    #[serde(default, deserialize_with = "lenient_bool")]
    done: bool,
}

#[derive(Debug, Default, Deserialize)]
struct UpdatedData {
    #[serde(default, deserialize_with = "lenient_count")]
    processed: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    remaining: u64,
}

#[derive(Debug, Default, Deserialize)]
struct StatusData {
    #[serde(default)]
    snapshot_id: Option<Value>,
    #[serde(default)]
    generated_at_human: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    chunk_count: u64,
    #[serde(default)]
    entry_count: Option<Value>,
    #[serde(default, deserialize_with = "lenient_count")]
    knowledge_entries: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    files_count: u64,
    #[serde(default)]
    sources: Vec<SourceData>,
    #[serde(default)]
    latest_entries: Vec<EntryData>,
}

#[derive(Debug, Default, Deserialize)]
struct EntryData {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    source_url: Option<String>,
    #[serde(default)]
    public_url: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    updated_human: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SourceData {
    #[serde(default)]
    label: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    count: u64,
}

fn decode<T: DeserializeOwned + Default>(data: Value) -> Result<T, JobServerError> {
    // `data` is routinely omitted or null when there is nothing to report.
    if data.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(data)
        .map_err(|err| JobServerError::new(FailureKind::Decode, err.to_string()))
}

pub(crate) fn decode_start(data: Value) -> StartAck {
    StartAck {
        message: message_of(&data),
    }
}

pub(crate) fn decode_progress(data: Value) -> Result<JobProgress, JobServerError> {
    let raw: ProgressData = decode(data)?;
    Ok(JobProgress {
        processed: raw.processed,
        total: raw.total,
        done: raw.done,
    })
}

pub(crate) fn decode_updated(data: Value) -> Result<UpdatedChunks, JobServerError> {
    let raw: UpdatedData = decode(data)?;
    Ok(UpdatedChunks {
        processed: raw.processed,
        remaining: raw.remaining,
    })
}

pub(crate) fn decode_status(data: Value) -> Result<KnowledgeStatus, JobServerError> {
    let status = match data {
        Value::Object(mut map) if map.contains_key("status") => {
            map.remove("status").unwrap_or(Value::Null)
        }
        other => other,
    };
    let raw: StatusData = decode(status)?;
    let entry_count = match raw.entry_count.as_ref() {
        Some(value) if !value.is_null() => count_of(value),
        _ => raw.knowledge_entries,
    };
    Ok(KnowledgeStatus {
        snapshot_id: raw
            .snapshot_id
            .as_ref()
            .and_then(scalar_text)
            .filter(|id| !id.is_empty()),
        generated_at: raw.generated_at_human.filter(|text| !text.is_empty()),
        chunk_count: raw.chunk_count,
        entry_count,
        files_count: raw.files_count,
        sources: raw
            .sources
            .into_iter()
            .map(|source| KnowledgeSource {
                label: source
                    .label
                    .filter(|label| !label.is_empty())
                    .unwrap_or_else(|| "-".to_string()),
                count: source.count,
            })
            .collect(),
        latest_entries: raw
            .latest_entries
            .into_iter()
            .map(|entry| KnowledgeEntry {
                title: non_empty(entry.title),
                link: non_empty(entry.source_url).or_else(|| non_empty(entry.public_url)),
                source: non_empty(entry.source),
                category: non_empty(entry.category),
                updated: non_empty(entry.updated_human),
            })
            .collect(),
    })
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|text| !text.trim().is_empty())
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

/// Non-negative count from whatever PHP produced; garbage reads as zero.
fn count_of(value: &Value) -> u64 {
    match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().map(float_count))
            .unwrap_or(0),
        Value::String(text) => {
            let text = text.trim();
            text.parse::<u64>()
                .ok()
                .or_else(|| text.parse::<f64>().ok().map(float_count))
                .unwrap_or(0)
        }
        _ => 0,
    }
}

fn float_count(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.trunc() as u64
    } else {
        0
    }
}

fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().map_or(0, count_of))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Bool(flag)) => flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|n| n != 0.0),
        Some(Value::String(text)) => matches!(text.trim(), "1" | "true"),
        _ => false,
    })
}
