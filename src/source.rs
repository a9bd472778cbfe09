//! Retrieval boundary: every implementation performs one full-table read.

use crate::config::SourceConfig;
use crate::errors::RetrievalError;
use crate::models::Record;
use async_trait::async_trait;
use serde_json::{Map, Number, Value, json};
use std::{collections::HashSet, path::PathBuf, sync::Arc, time::Duration};
use tokio::fs;
use tracing::debug;

const SCAN_TARGET: &str = "DynamoDB_20120810.Scan";
const SCAN_CONTENT_TYPE: &str = "application/x-amz-json-1.0";

#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human readable origin, used in logs.
    fn describe(&self) -> String;

    /// Return every record in the table.
    async fn scan(&self) -> Result<Vec<Record>, RetrievalError>;
}

pub fn from_config(config: &SourceConfig) -> Result<Arc<dyn RecordSource>, RetrievalError> {
    let source: Arc<dyn RecordSource> = match config {
        SourceConfig::File { path } => Arc::new(FileSource::new(path.clone())),
        SourceConfig::Http {
            endpoint,
            table,
            token,
            timeout,
        } => Arc::new(HttpSource::new(
            endpoint.clone(),
            table.clone(),
            token.clone(),
            *timeout,
        )?),
    };
    Ok(source)
}

/// Reads a JSON array of records, or a saved `{"Items": [...]}` scan dump.
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl RecordSource for FileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    async fn scan(&self) -> Result<Vec<Record>, RetrievalError> {
        let bytes = fs::read(&self.path).await.map_err(|source| RetrievalError::Io {
            path: self.path.display().to_string(),
            source,
        })?;
        let payload: Value = serde_json::from_slice(&bytes)?;
        match payload {
            Value::Array(items) => decode_items(items),
            Value::Object(mut body) => match body.remove("Items") {
                Some(Value::Array(items)) => decode_items(items),
                _ => Err(RetrievalError::Malformed(
                    "expected an array of records or an object with an Items array".to_string(),
                )),
            },
            _ => Err(RetrievalError::Malformed(
                "expected an array of records or an object with an Items array".to_string(),
            )),
        }
    }
}

/// Pages through a DynamoDB style Scan endpoint until `LastEvaluatedKey` is absent.
pub struct HttpSource {
    client: reqwest::Client,
    endpoint: String,
    table: String,
    token: Option<String>,
}

impl HttpSource {
    pub fn new(
        endpoint: impl Into<String>,
        table: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, RetrievalError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            table: table.into(),
            token,
        })
    }

    async fn scan_page(&self, start_key: Option<&Value>) -> Result<Map<String, Value>, RetrievalError> {
        let mut body = json!({ "TableName": self.table });
        if let Some(key) = start_key {
            body["ExclusiveStartKey"] = key.clone();
        }

        let mut request = self
            .client
            .post(&self.endpoint)
            .header("x-amz-target", SCAN_TARGET)
            .header(reqwest::header::CONTENT_TYPE, SCAN_CONTENT_TYPE)
            .body(body.to_string());
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(RetrievalError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        match serde_json::from_str::<Value>(&text)? {
            Value::Object(page) => Ok(page),
            _ => Err(RetrievalError::Malformed("scan response is not an object".to_string())),
        }
    }
}

#[async_trait]
impl RecordSource for HttpSource {
    fn describe(&self) -> String {
        format!("table {} at {}", self.table, self.endpoint)
    }

    async fn scan(&self) -> Result<Vec<Record>, RetrievalError> {
        let mut records = Vec::new();
        let mut start_key: Option<Value> = None;
        let mut seen_keys: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            let mut page = self.scan_page(start_key.as_ref()).await?;
            pages += 1;
            match page.remove("Items") {
                Some(Value::Array(items)) => records.extend(decode_items(items)?),
                Some(_) => {
                    return Err(RetrievalError::Malformed("Items is not an array".to_string()));
                }
                None => {}
            }

            match page.remove("LastEvaluatedKey") {
                Some(Value::Null) | None => break,
                Some(key) => {
                    if !seen_keys.insert(key.to_string()) {
                        return Err(RetrievalError::Malformed(format!(
                            "scan revisited LastEvaluatedKey {key} after {pages} pages"
                        )));
                    }
                    start_key = Some(key);
                }
            }
        }

        debug!(pages, records = records.len(), "scan finished");
        Ok(records)
    }
}

/// Fixed records held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    records: Vec<Record>,
}

impl MemorySource {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl RecordSource for MemorySource {
    fn describe(&self) -> String {
        format!("{} in-memory records", self.records.len())
    }

    async fn scan(&self) -> Result<Vec<Record>, RetrievalError> {
        Ok(self.records.clone())
    }
}

fn decode_items(items: Vec<Value>) -> Result<Vec<Record>, RetrievalError> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(decode_item(fields)),
            _ => Err(RetrievalError::Malformed(format!("item {index} is not an object"))),
        })
        .collect()
}

/// Flattens attribute-value encoded items (`{"S": "..."}`) into plain JSON.
/// Items that are already plain pass through untouched.
pub fn decode_item(fields: Record) -> Record {
    if fields.is_empty() || !fields.values().all(is_attribute_value) {
        return fields;
    }
    fields
        .into_iter()
        .map(|(name, value)| (name, decode_attribute(value)))
        .collect()
}

fn is_attribute_value(value: &Value) -> bool {
    match value {
        Value::Object(map) if map.len() == 1 => map.keys().all(|tag| {
            matches!(
                tag.as_str(),
                "S" | "N" | "B" | "BOOL" | "NULL" | "L" | "M" | "SS" | "NS" | "BS"
            )
        }),
        _ => false,
    }
}

fn decode_attribute(value: Value) -> Value {
    let Value::Object(map) = value else {
        return value;
    };
    let Some((tag, inner)) = map.into_iter().next() else {
        return Value::Null;
    };
    match (tag.as_str(), inner) {
        ("N", Value::String(text)) => decode_number(text),
        ("NULL", _) => Value::Null,
        ("L", Value::Array(values)) => Value::Array(values.into_iter().map(decode_attribute).collect()),
        ("M", Value::Object(fields)) => Value::Object(
            fields
                .into_iter()
                .map(|(name, value)| (name, decode_attribute(value)))
                .collect(),
        ),
        ("NS", Value::Array(values)) => Value::Array(
            values
                .into_iter()
                .map(|value| match value {
                    Value::String(text) => decode_number(text),
                    other => other,
                })
                .collect(),
        ),
        (_, inner) => inner,
    }
}

fn decode_number(text: String) -> Value {
    if let Ok(value) = text.parse::<i64>() {
        return Value::Number(value.into());
    }
    if let Ok(value) = text.parse::<u64>() {
        return Value::Number(value.into());
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
        .unwrap_or(Value::String(text))
}
