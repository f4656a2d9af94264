//! HTTP client for the cloud document store.

use super::{CloudError, CloudQuery, CloudResult, CloudStore};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    documents: Vec<Value>,
}

/// reqwest-backed [`CloudStore`], scoped to one company partition.
pub struct HttpCloudStore {
    client: Client,
    base_url: String,
    company_id: String,
}

impl HttpCloudStore {
    /// `base_url` is the cloud service root (e.g. "https://cloud.example.com");
    /// `api_token` authenticates this terminal as a device of `company_id`.
    pub fn new(
        base_url: impl Into<String>,
        company_id: impl Into<String>,
        api_token: &str,
    ) -> CloudResult<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        let mut auth = reqwest::header::HeaderValue::from_str(&format!("Bearer {api_token}"))
            .map_err(|e| CloudError::Request(format!("invalid api token: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, auth);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CloudError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            company_id: company_id.into(),
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/v1/companies/{}/{collection}",
            self.base_url, self.company_id
        )
    }

    async fn check(response: reqwest::Response) -> CloudResult<reqwest::Response> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        Err(CloudError::Status { status, body })
    }
}

#[async_trait]
impl CloudStore for HttpCloudStore {
    async fn set_merge(&self, collection: &str, id: &str, data: Value) -> CloudResult<()> {
        let url = format!("{}/{id}?merge=true", self.collection_url(collection));
        let response = self.client.patch(&url).json(&data).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn set_merge_batch(
        &self,
        collection: &str,
        docs: &[(String, Value)],
    ) -> CloudResult<()> {
        let url = format!("{}:batchMerge", self.collection_url(collection));
        let body = json!({
            "documents": docs
                .iter()
                .map(|(id, data)| json!({"id": id, "data": data}))
                .collect::<Vec<_>>(),
        });
        let response = self.client.post(&url).json(&body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_all(&self, collection: &str) -> CloudResult<Vec<Value>> {
        let response = self.client.get(self.collection_url(collection)).send().await?;
        let response = Self::check(response).await?;
        let parsed: DocumentsResponse = response.json().await?;
        Ok(parsed.documents)
    }

    async fn query(&self, collection: &str, query: CloudQuery) -> CloudResult<Vec<Value>> {
        let url = format!("{}:query", self.collection_url(collection));
        let response = self.client.post(&url).json(&query).send().await?;
        let response = Self::check(response).await?;
        let parsed: DocumentsResponse = response.json().await?;
        Ok(parsed.documents)
    }
}
