//! Cloud Firestore history store
//!
//! Talks to the Firestore REST API. Reads use `runQuery` ordered by
//! `createdAt`; writes use `createDocument` with an explicit timestamp.
//! Credentials come from `GOOGLE_OAUTH_ACCESS_TOKEN` or, failing that,
//! `gcloud auth print-access-token`. The emulator needs no credentials.

use std::process::Output;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::Client;
use serde_json::{json, Map, Value};
use tokio::sync::Mutex;
use url::Url;

use super::{sort_by_creation, HistoryMessage, HistoryStore};
use crate::core::config::HistoryConfig;
use crate::core::{CofounderError, Result};

/// Access tokens from gcloud live for an hour; refresh well before that.
const TOKEN_TTL: Duration = Duration::from_secs(45 * 60);

/// Firestore-backed history store
pub struct FirestoreHistoryStore {
    client: Client,
    /// `.../projects/{project}/databases/{db}/documents`
    documents_url: Url,
    emulator: bool,
    token: Mutex<Option<(String, Instant)>>,
}

impl FirestoreHistoryStore {
    /// Create a store for the given project
    pub fn from_config(project_id: &str, config: &HistoryConfig) -> Result<Self> {
        let (base, emulator) = match config.emulator_host.as_deref() {
            Some(host) => (format!("http://{}/v1/", host), true),
            None => ("https://firestore.googleapis.com/v1/".to_string(), false),
        };

        let mut documents_url = Url::parse(&base)
            .map_err(|e| CofounderError::config(format!("Invalid Firestore URL: {}", e)))?;
        documents_url
            .path_segments_mut()
            .map_err(|_| CofounderError::config("Firestore URL cannot be a base"))?
            .pop_if_empty()
            .extend([
                "projects",
                project_id,
                "databases",
                config.database.as_str(),
                "documents",
            ]);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            documents_url,
            emulator,
            token: Mutex::new(None),
        })
    }

    /// URL of a path below the documents root, each segment percent-encoded
    fn url_for(&self, segments: &[&str]) -> Url {
        let mut url = self.documents_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.extend(segments);
        }
        url
    }

    async fn bearer_token(&self) -> Result<String> {
        if self.emulator {
            return Ok("owner".to_string());
        }

        if let Ok(token) = std::env::var("GOOGLE_OAUTH_ACCESS_TOKEN") {
            if !token.trim().is_empty() {
                return Ok(token.trim().to_string());
            }
        }

        let mut cached = self.token.lock().await;
        if let Some((token, fetched_at)) = cached.as_ref() {
            if fetched_at.elapsed() < TOKEN_TTL {
                return Ok(token.clone());
            }
        }

        let output = command_output("gcloud", &["auth", "print-access-token"]).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CofounderError::history(format!(
                "gcloud auth failed: {}",
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        *cached = Some((token.clone(), Instant::now()));
        Ok(token)
    }

    async fn post_json(&self, url: Url, body: &Value) -> Result<Value> {
        let token = self.bearer_token().await?;
        let response = self
            .client
            .post(url)
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(CofounderError::history(format!(
                "Firestore returned {}: {}",
                status, text
            )));
        }

        Ok(response.json().await?)
    }
}

/// Run a credential helper. The child is killed if the future is dropped,
/// so a store timeout does not leave it running.
async fn command_output(program: &str, args: &[&str]) -> Result<Output> {
    tokio::process::Command::new(program)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CofounderError::history(format!("Failed to execute {}: {}", program, e)))
}

#[async_trait]
impl HistoryStore for FirestoreHistoryStore {
    async fn messages(&self, session_id: &str) -> Result<Vec<HistoryMessage>> {
        let target = format!("{}:runQuery", session_id);
        let url = self.url_for(&["sessions", target.as_str()]);
        let query = json!({
            "structuredQuery": {
                "from": [{ "collectionId": "messages" }],
                "orderBy": [{
                    "field": { "fieldPath": "createdAt" },
                    "direction": "ASCENDING"
                }]
            }
        });

        let rows = self.post_json(url, &query).await?;
        let mut messages = parse_query_rows(&rows)?;
        sort_by_creation(&mut messages);
        Ok(messages)
    }

    async fn append(&self, session_id: &str, message: HistoryMessage) -> Result<()> {
        let url = self.url_for(&["sessions", session_id, "messages"]);
        self.post_json(url, &encode_document(&message)).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        "firestore"
    }
}

/// Turn a `runQuery` response into messages. Rows without a document
/// (the trailing read-time marker of an empty result) are skipped.
fn parse_query_rows(rows: &Value) -> Result<Vec<HistoryMessage>> {
    let rows = rows
        .as_array()
        .ok_or_else(|| CofounderError::history("Unexpected runQuery response"))?;

    let mut messages = Vec::new();
    for row in rows {
        let Some(fields) = row
            .get("document")
            .and_then(|d| d.get("fields"))
            .and_then(|f| f.as_object())
        else {
            continue;
        };

        let mut plain: Map<String, Value> = fields
            .iter()
            .map(|(k, v)| (k.clone(), decode_value(v)))
            .collect();

        // A createdAt that is not a real timestamp (pending server value) becomes null
        let created_at = fields
            .get("createdAt")
            .and_then(|v| v.get("timestampValue"))
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        plain.remove("createdAt");

        let role = take_string(&mut plain, "role");
        let content = take_string(&mut plain, "content");

        messages.push(HistoryMessage {
            role,
            content,
            created_at,
            extra: plain,
        });
    }

    Ok(messages)
}

fn take_string(map: &mut Map<String, Value>, key: &str) -> String {
    match map.remove(key) {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// Convert a Firestore typed value into plain JSON
fn decode_value(value: &Value) -> Value {
    let Some((kind, inner)) = value.as_object().and_then(|o| o.iter().next()) else {
        return Value::Null;
    };

    match kind.as_str() {
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "integerValue" => inner
            .as_str()
            .and_then(|s| s.parse::<i64>().ok())
            .map(Value::from)
            .unwrap_or_else(|| inner.clone()),
        "doubleValue" | "booleanValue" | "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(|v| v.as_array())
                .map(|vals| vals.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(|f| f.as_object())
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), decode_value(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        _ => Value::Null,
    }
}

fn encode_document(message: &HistoryMessage) -> Value {
    let created_at = message
        .created_at
        .unwrap_or_else(Utc::now)
        .to_rfc3339_opts(SecondsFormat::Micros, true);

    json!({
        "fields": {
            "role": { "stringValue": message.role },
            "content": { "stringValue": message.content },
            "createdAt": { "timestampValue": created_at }
        }
    })
}
