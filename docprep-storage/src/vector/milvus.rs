//! HTTP client for a Milvus-style vector database.

use docprep_core::{strip_page_markers, IngestError, PipelineRow};
use serde_json::json;

use super::{CollectionSchema, VectorHit, VectorStore};

/// Connection details for the vector store. `token` is `Some("{user}:{password}")`
/// when authentication is configured.
#[derive(Debug, Clone)]
pub struct MilvusConfig {
    pub host: String,
    pub port: u16,
    pub token: Option<String>,
    pub db_name: String,
    pub schema: CollectionSchema,
}

impl MilvusConfig {
    #[must_use]
    pub fn uri(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}

/// `VectorStore` implementation over Milvus's REST API (`/v2/vectordb/...`).
pub struct MilvusClient {
    config: MilvusConfig,
    http: reqwest::Client,
}

impl MilvusClient {
    #[must_use]
    pub fn new(config: MilvusConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.uri())
    }

    fn request(&self, path: &str, body: serde_json::Value) -> reqwest::RequestBuilder {
        let mut req = self.http.post(self.url(path)).json(&body);
        if let Some(token) = &self.config.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn post_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, IngestError> {
        let resp = self
            .request(path, body)
            .send()
            .await
            .map_err(|e| IngestError::VectorStore(e.to_string()))?;
        let status = resp.status();
        let value: serde_json::Value = resp
            .json()
            .await
            .map_err(|e| IngestError::VectorStore(e.to_string()))?;
        if !status.is_success() {
            return Err(IngestError::VectorStore(format!(
                "{status}: {value}"
            )));
        }
        Ok(value)
    }

    /// Whether `value` represents an "already exists" style error response,
    /// which is downgraded to success by the idempotent create operations.
    fn is_already_exists(value: &serde_json::Value) -> bool {
        value
            .get("message")
            .and_then(|m| m.as_str())
            .is_some_and(|m| m.to_lowercase().contains("already exist"))
    }
}

#[async_trait::async_trait]
impl VectorStore for MilvusClient {
    async fn ensure_collection(&self, collection: &str) -> Result<(), IngestError> {
        let has = self
            .post_json(
                "/v2/vectordb/collections/has",
                json!({ "dbName": self.config.db_name, "collectionName": collection }),
            )
            .await?;
        if has.get("data").and_then(|d| d.get("has")).and_then(|h| h.as_bool()) == Some(true) {
            return Ok(());
        }

        let schema = &self.config.schema;
        let body = json!({
            "dbName": self.config.db_name,
            "collectionName": collection,
            "schema": {
                "fields": [
                    { "fieldName": "id", "dataType": "Int64", "isPrimary": true, "autoID": true },
                    { "fieldName": "embedding", "dataType": "FloatVector", "elementTypeParams": { "dim": schema.dim } },
                    { "fieldName": "chunk", "dataType": "VarChar", "elementTypeParams": { "max_length": 6144 } },
                    { "fieldName": "metadata", "dataType": "JSON" },
                    { "fieldName": "page", "dataType": "Int64" },
                ]
            },
            "indexParams": [{
                "fieldName": "embedding",
                "indexName": "embedding_index",
                "indexType": "HNSW",
                "metricType": "COSINE",
                "params": { "nlist": schema.nlist },
            }],
        });

        match self.post_json("/v2/vectordb/collections/create", body).await {
            Ok(_) => Ok(()),
            Err(IngestError::VectorStore(msg)) if msg.to_lowercase().contains("already exist") => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn ensure_partition(&self, collection: &str, partition: &str) -> Result<(), IngestError> {
        let has = self
            .post_json(
                "/v2/vectordb/partitions/has",
                json!({
                    "dbName": self.config.db_name,
                    "collectionName": collection,
                    "partitionName": partition,
                }),
            )
            .await?;
        if has.get("data").and_then(|d| d.get("has")).and_then(|h| h.as_bool()) == Some(true) {
            return Ok(());
        }

        let body = json!({
            "dbName": self.config.db_name,
            "collectionName": collection,
            "partitionName": partition,
        });
        match self.post_json("/v2/vectordb/partitions/create", body).await {
            Ok(v) if !Self::is_already_exists(&v) => Ok(()),
            Ok(_) => Ok(()),
            Err(IngestError::VectorStore(msg)) if msg.to_lowercase().contains("already exist") => {
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn insert(
        &self,
        collection: &str,
        partition: &str,
        rows: Vec<PipelineRow>,
    ) -> Result<(), IngestError> {
        let data: Vec<serde_json::Value> = rows
            .into_iter()
            .map(|row| {
                let (chunk, page) = strip_page_markers(&row.chunk);
                json!({
                    "embedding": row.embedding,
                    "chunk": chunk,
                    "metadata": row.metadata,
                    "page": page,
                })
            })
            .collect();

        let body = json!({
            "dbName": self.config.db_name,
            "collectionName": collection,
            "partitionName": partition,
            "data": data,
        });
        self.post_json("/v2/vectordb/entities/insert", body).await?;
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        collection: &str,
        partition: &str,
    ) -> Result<Vec<VectorHit>, IngestError> {
        let body = json!({
            "dbName": self.config.db_name,
            "collectionName": collection,
            "partitionNames": [partition],
            "data": [query],
            "limit": top_k,
            "searchParams": { "metricType": "COSINE" },
            "outputFields": ["chunk", "metadata", "page"],
        });
        let value = self.post_json("/v2/vectordb/entities/search", body).await?;
        let hits = value
            .get("data")
            .and_then(|d| d.as_array())
            .cloned()
            .unwrap_or_default();

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            results.push(VectorHit {
                id: hit.get("id").and_then(serde_json::Value::as_i64).unwrap_or_default(),
                chunk: hit
                    .get("chunk")
                    .and_then(|v| v.as_str())
                    .unwrap_or_default()
                    .to_string(),
                metadata: hit.get("metadata").cloned().unwrap_or(serde_json::Value::Null),
                page: hit.get("page").and_then(serde_json::Value::as_i64).unwrap_or(1),
                score: hit.get("distance").and_then(serde_json::Value::as_f64).unwrap_or(0.0) as f32,
            });
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_formats_host_and_port() {
        let cfg = MilvusConfig {
            host: "127.0.0.1".into(),
            port: 19530,
            token: None,
            db_name: "default".into(),
            schema: CollectionSchema::default(),
        };
        assert_eq!(cfg.uri(), "http://127.0.0.1:19530");
    }

    #[test]
    fn detects_already_exists_messages() {
        let v = json!({ "message": "collection already exists" });
        assert!(MilvusClient::is_already_exists(&v));
        let v = json!({ "message": "not found" });
        assert!(!MilvusClient::is_already_exists(&v));
    }
}
