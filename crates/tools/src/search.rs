//! Search-index tools over an Azure-Search-style REST API.
//!
//! The HTTP client is shared by the three tools; request bodies are built by
//! pure functions so the wire shapes are testable without a network.

use std::sync::Arc;

use async_trait::async_trait;
use pilot_core::{Tool, ToolInput, ToolOutput};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

const API_VERSION: &str = "2023-11-01";
const DEFAULT_TOP: u64 = 10;

const ENDPOINT_VAR: &str = "PILOT_SEARCH_ENDPOINT";
const API_KEY_VAR: &str = "PILOT_SEARCH_API_KEY";

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Search API returned status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Missing search configuration: {0}")]
    MissingConfig(&'static str),
}

#[derive(Debug, Clone)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
}

impl SearchConfig {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Read configuration from `PILOT_SEARCH_*` environment variables.
    pub fn from_env() -> Result<Self, SearchError> {
        let endpoint =
            std::env::var(ENDPOINT_VAR).map_err(|_| SearchError::MissingConfig(ENDPOINT_VAR))?;
        let api_key =
            std::env::var(API_KEY_VAR).map_err(|_| SearchError::MissingConfig(API_KEY_VAR))?;
        Ok(Self::new(endpoint, api_key))
    }
}

/// Thin client for the index management and document endpoints.
pub struct SearchApi {
    client: reqwest::Client,
    config: SearchConfig,
}

impl SearchApi {
    pub fn new(config: SearchConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    pub fn from_env() -> Result<Self, SearchError> {
        Ok(Self::new(SearchConfig::from_env()?))
    }

    async fn create_index(&self, index_name: &str, body: &Value) -> Result<Value, SearchError> {
        let url = format!(
            "{}/indexes/{}?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            index_name,
            API_VERSION
        );
        self.send(self.client.put(url), body).await
    }

    async fn upload(&self, index_name: &str, body: &Value) -> Result<Value, SearchError> {
        let url = format!(
            "{}/indexes/{}/docs/index?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            index_name,
            API_VERSION
        );
        self.send(self.client.post(url), body).await
    }

    async fn query(&self, index_name: &str, body: &Value) -> Result<Value, SearchError> {
        let url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            index_name,
            API_VERSION
        );
        self.send(self.client.post(url), body).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        body: &Value,
    ) -> Result<Value, SearchError> {
        let response = request
            .header("api-key", &self.config.api_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Api {
                status: status.as_u16(),
                body,
            });
        }
        if status == reqwest::StatusCode::NO_CONTENT {
            return Ok(Value::Null);
        }
        Ok(response.json().await?)
    }
}

/// Map a field type label to its wire type. Unknown labels fall back to
/// plain strings.
fn wire_field_type(label: &str) -> &'static str {
    match label.to_lowercase().as_str() {
        "int" | "integer" => "Edm.Int32",
        "long" => "Edm.Int64",
        "double" => "Edm.Double",
        "boolean" => "Edm.Boolean",
        "date" | "datetime" => "Edm.DateTimeOffset",
        "collection" => "Collection(Edm.String)",
        _ => "Edm.String",
    }
}

/// Build an index definition. The first field is the key; `string`/`text`
/// fields are searchable.
fn index_definition(
    index_name: &str,
    fields: &[String],
    field_types: &[String],
) -> Result<Value, String> {
    if fields.len() != field_types.len() {
        return Err("The number of fields must match the number of field types".to_string());
    }
    if fields.is_empty() {
        return Err("At least one field is required".to_string());
    }

    let rendered: Vec<Value> = fields
        .iter()
        .zip(field_types)
        .enumerate()
        .map(|(i, (field, field_type))| {
            let searchable = i != 0 && matches!(field_type.to_lowercase().as_str(), "string" | "text");
            json!({
                "name": field,
                "type": if i == 0 { "Edm.String" } else { wire_field_type(field_type) },
                "key": i == 0,
                "searchable": searchable,
            })
        })
        .collect();

    Ok(json!({ "name": index_name, "fields": rendered }))
}

/// Wrap documents in an upload batch.
fn upload_batch(documents: &[Value]) -> Value {
    let actions: Vec<Value> = documents
        .iter()
        .map(|document| {
            let mut action = document
                .as_object()
                .cloned()
                .unwrap_or_default();
            action.insert(
                "@search.action".to_string(),
                Value::String("upload".to_string()),
            );
            Value::Object(action)
        })
        .collect();
    json!({ "value": actions })
}

fn query_body(query: &str, top: u64) -> Value {
    json!({ "search": query, "top": top, "count": true })
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|v| v.as_str().map(str::to_string))
        .collect()
}

/// Create (or replace) a search index from field names and type labels.
pub struct CreateSearchIndex {
    api: Arc<SearchApi>,
}

impl CreateSearchIndex {
    pub fn new(api: Arc<SearchApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for CreateSearchIndex {
    fn name(&self) -> &str {
        "create_search_index"
    }

    fn description(&self) -> &str {
        "Create a search index. Input: {\"index_name\": \"<name>\", \"fields\": [..], \"field_types\": [..]}"
    }

    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        let Some(index_name) = input.get("index_name").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: index_name");
        };
        let Some(fields) = string_list(input.get("fields")) else {
            return ToolOutput::failure("Missing required parameter: fields");
        };
        let Some(field_types) = string_list(input.get("field_types")) else {
            return ToolOutput::failure("Missing required parameter: field_types");
        };

        let definition = match index_definition(index_name, &fields, &field_types) {
            Ok(definition) => definition,
            Err(e) => return ToolOutput::failure(e),
        };

        debug!(index_name, fields = fields.len(), "Creating search index");
        match self.api.create_index(index_name, &definition).await {
            Ok(_) => {
                let mut data = ToolInput::new();
                data.insert(
                    "message".to_string(),
                    Value::String(format!("Index '{}' created successfully", index_name)),
                );
                data.insert(
                    "index_name".to_string(),
                    Value::String(index_name.to_string()),
                );
                ToolOutput::ok(data)
            }
            Err(e) => ToolOutput::failure(e.to_string()),
        }
    }
}

/// Upload documents to a search index, inline or from a json/csv file.
pub struct UploadToSearchIndex {
    api: Arc<SearchApi>,
}

impl UploadToSearchIndex {
    pub fn new(api: Arc<SearchApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for UploadToSearchIndex {
    fn name(&self) -> &str {
        "upload_to_search_index"
    }

    fn description(&self) -> &str {
        "Upload documents to a search index. Input: {\"index_name\": \"<name>\", \"documents\": [..]} or {\"index_name\": \"<name>\", \"path\": \"<json/csv file>\"}"
    }

    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        let Some(index_name) = input.get("index_name").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: index_name");
        };

        let documents = if let Some(documents) = input.get("documents").and_then(Value::as_array) {
            documents.clone()
        } else if let Some(path) = input.get("path").and_then(Value::as_str) {
            match crate::files::load_records(path).await {
                Ok(records) => records,
                Err(e) => return ToolOutput::failure(e),
            }
        } else {
            return ToolOutput::failure("Missing required parameter: documents or path");
        };

        if documents.is_empty() {
            return ToolOutput::failure("No documents to upload");
        }

        debug!(index_name, documents = documents.len(), "Uploading documents");
        match self.api.upload(index_name, &upload_batch(&documents)).await {
            Ok(_) => {
                let mut data = ToolInput::new();
                data.insert(
                    "message".to_string(),
                    Value::String(format!(
                        "Successfully uploaded {} documents to index '{}'",
                        documents.len(),
                        index_name
                    )),
                );
                data.insert("total_documents".to_string(), Value::from(documents.len()));
                ToolOutput::ok(data)
            }
            Err(e) => ToolOutput::failure(e.to_string()),
        }
    }
}

/// Query a search index for matching documents.
pub struct QuerySearchIndex {
    api: Arc<SearchApi>,
}

impl QuerySearchIndex {
    pub fn new(api: Arc<SearchApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Tool for QuerySearchIndex {
    fn name(&self) -> &str {
        "query_search_index"
    }

    fn description(&self) -> &str {
        "Search an index. Input: {\"index_name\": \"<name>\", \"query\": \"<text>\", \"top\": 10}"
    }

    async fn invoke(&self, input: &ToolInput) -> ToolOutput {
        let Some(index_name) = input.get("index_name").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: index_name");
        };
        let Some(query) = input.get("query").and_then(Value::as_str) else {
            return ToolOutput::failure("Missing required parameter: query");
        };
        let top = input
            .get("top")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_TOP);

        debug!(index_name, query, top, "Querying search index");
        match self.api.query(index_name, &query_body(query, top)).await {
            Ok(response) => {
                let results = response
                    .get("value")
                    .and_then(Value::as_array)
                    .cloned()
                    .unwrap_or_default();
                let total_count = response.get("@odata.count").and_then(Value::as_u64);

                let mut data = ToolInput::new();
                data.insert("count".to_string(), Value::from(results.len()));
                if let Some(total_count) = total_count {
                    data.insert("total_count".to_string(), Value::from(total_count));
                }
                data.insert("results".to_string(), Value::Array(results));
                ToolOutput::ok(data)
            }
            Err(e) => ToolOutput::failure(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_index_definition_first_field_is_key() {
        let definition = index_definition(
            "products",
            &strings(&["id", "title", "price"]),
            &strings(&["string", "text", "double"]),
        )
        .unwrap();

        assert_eq!(definition["name"], "products");
        let fields = definition["fields"].as_array().unwrap();
        assert_eq!(fields[0]["key"], true);
        assert_eq!(fields[0]["searchable"], false);
        assert_eq!(fields[1]["type"], "Edm.String");
        assert_eq!(fields[1]["searchable"], true);
        assert_eq!(fields[2]["type"], "Edm.Double");
        assert_eq!(fields[2]["searchable"], false);
    }

    #[test]
    fn test_index_definition_length_mismatch() {
        let err = index_definition("x", &strings(&["a", "b"]), &strings(&["string"])).unwrap_err();
        assert!(err.contains("must match"));
    }

    #[test]
    fn test_wire_field_types() {
        assert_eq!(wire_field_type("int"), "Edm.Int32");
        assert_eq!(wire_field_type("DateTime"), "Edm.DateTimeOffset");
        assert_eq!(wire_field_type("collection"), "Collection(Edm.String)");
        assert_eq!(wire_field_type("mystery"), "Edm.String");
    }

    #[test]
    fn test_upload_batch_adds_action() {
        let batch = upload_batch(&[json!({"id": "1"}), json!({"id": "2"})]);
        let actions = batch["value"].as_array().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0]["@search.action"], "upload");
        assert_eq!(actions[1]["id"], "2");
    }

    #[test]
    fn test_query_body_shape() {
        let body = query_body("blue bicycles", 5);
        assert_eq!(body["search"], "blue bicycles");
        assert_eq!(body["top"], 5);
        assert_eq!(body["count"], true);
    }
}
