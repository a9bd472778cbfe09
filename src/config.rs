use crate::errors::ConfigError;
use std::{env, path::PathBuf, time::Duration};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_TABLE: &str = "DetectedItems";
pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_DATA_PATH: &str = "data/records.json";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Field names the pipeline reads from each record.
///
/// Date and count fields are ordered candidates: the first one present in a
/// record is used, so tables written as `Date` or `Timestamp` both work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub item_field: String,
    pub date_fields: Vec<String>,
    pub count_fields: Vec<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            item_field: "ItemName".to_string(),
            date_fields: vec!["Date".to_string(), "Timestamp".to_string()],
            count_fields: vec!["NoOfManufactured".to_string(), "Quantity".to_string()],
        }
    }
}

impl Schema {
    pub fn is_schema_field(&self, name: &str) -> bool {
        name == self.item_field
            || self.date_fields.iter().any(|field| field == name)
            || self.count_fields.iter().any(|field| field == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    File {
        path: PathBuf,
    },
    Http {
        endpoint: String,
        table: String,
        token: Option<String>,
        timeout: Duration,
    },
}

impl SourceConfig {
    /// AWS hosted endpoints reject bearer auth and only accept SigV4 signed
    /// requests, which `HttpSource` does not produce.
    pub fn requires_request_signing(&self) -> bool {
        match self {
            SourceConfig::Http { endpoint, .. } => endpoint
                .split("://")
                .nth(1)
                .unwrap_or(endpoint.as_str())
                .split(['/', ':'])
                .next()
                .is_some_and(|host| host.ends_with(".amazonaws.com")),
            SourceConfig::File { .. } => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub port: u16,
    pub source: SourceConfig,
    pub schema: Schema,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match get("PORT") {
            Some(value) => value.trim().parse::<u16>().map_err(|_| ConfigError::Invalid {
                key: "PORT",
                expected: "a port number",
                value,
            })?,
            None => DEFAULT_PORT,
        };

        let endpoint = get("DASHBOARD_ENDPOINT");
        let implied = if endpoint.is_some() { "http" } else { "file" };
        let kind = get("DASHBOARD_SOURCE").unwrap_or_else(|| implied.to_string());

        let source = match kind.trim() {
            "file" => SourceConfig::File {
                path: PathBuf::from(
                    get("DASHBOARD_DATA_PATH").unwrap_or_else(|| DEFAULT_DATA_PATH.to_string()),
                ),
            },
            "http" => {
                let timeout = match get("DASHBOARD_TIMEOUT_SECS") {
                    Some(value) => value.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                        key: "DASHBOARD_TIMEOUT_SECS",
                        expected: "a whole number of seconds",
                        value,
                    })?,
                    None => DEFAULT_TIMEOUT_SECS,
                };
                let endpoint = endpoint.unwrap_or_else(|| {
                    let region = get("AWS_REGION").unwrap_or_else(|| DEFAULT_REGION.to_string());
                    format!("https://dynamodb.{region}.amazonaws.com")
                });
                SourceConfig::Http {
                    endpoint,
                    table: get("DASHBOARD_TABLE").unwrap_or_else(|| DEFAULT_TABLE.to_string()),
                    token: get("DASHBOARD_API_TOKEN"),
                    timeout: Duration::from_secs(timeout),
                }
            }
            _ => {
                return Err(ConfigError::Invalid {
                    key: "DASHBOARD_SOURCE",
                    expected: "'file' or 'http'",
                    value: kind,
                });
            }
        };

        let defaults = Schema::default();
        let schema = Schema {
            item_field: get("DASHBOARD_ITEM_FIELD")
                .map(|value| value.trim().to_string())
                .unwrap_or(defaults.item_field),
            date_fields: match get("DASHBOARD_DATE_FIELDS") {
                Some(value) => field_list("DASHBOARD_DATE_FIELDS", &value)?,
                None => defaults.date_fields,
            },
            count_fields: match get("DASHBOARD_COUNT_FIELDS") {
                Some(value) => field_list("DASHBOARD_COUNT_FIELDS", &value)?,
                None => defaults.count_fields,
            },
        };

        Ok(Self {
            port,
            source,
            schema,
        })
    }
}

fn field_list(key: &'static str, value: &str) -> Result<Vec<String>, ConfigError> {
    let fields: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|field| !field.is_empty())
        .map(str::to_string)
        .collect();
    if fields.is_empty() {
        return Err(ConfigError::EmptyFieldList(key));
    }
    Ok(fields)
}
