use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::error;

/// HTTP client for the headless-CMS document store (query + mutation
/// endpoints, token auth).
///
/// The store is the system of record for students and enrollment records;
/// everything the service knows about either goes through here. Calls run
/// inside the webhook request cycle, so the client carries a bounded
/// timeout: a hung store call would otherwise stall the provider's delivery
/// attempt and invite a retry storm.
pub struct SanityClient {
    http: reqwest::Client,
    project_id: String,
    dataset: String,
    token: String,
    api_version: String,
}

#[derive(Debug, Deserialize)]
struct QueryEnvelope {
    result: Value,
}

#[derive(Debug, Deserialize)]
pub struct MutateResponse {
    #[serde(rename = "transactionId")]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
pub struct MutateResult {
    pub id: String,
    pub operation: Option<String>,
}

impl MutateResponse {
    /// Whether the mutation actually created the given document. A
    /// create-if-not-exists against an existing id reports no `create`
    /// operation for it, which is how callers detect a duplicate write.
    pub fn created(&self, id: &str) -> bool {
        self.results
            .iter()
            .any(|r| r.id == id && r.operation.as_deref() == Some("create"))
    }
}

impl SanityClient {
    pub fn new(
        project_id: String,
        dataset: String,
        token: String,
        timeout: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            project_id,
            dataset,
            token,
            api_version: "v2024-01-01".to_string(),
        })
    }

    fn base_url(&self) -> String {
        format!(
            "https://{}.api.sanity.io/{}",
            self.project_id, self.api_version
        )
    }

    /// Runs a GROQ query with `$name` parameters and returns the raw
    /// `result` value.
    pub async fn query(&self, groq: &str, params: &[(&str, &str)]) -> Result<Value> {
        let mut pairs: Vec<(String, String)> = vec![("query".to_string(), groq.to_string())];
        for (name, value) in params {
            // Parameters are JSON-encoded on the wire.
            pairs.push((format!("${name}"), Value::String((*value).to_string()).to_string()));
        }

        let resp = self
            .http
            .get(format!("{}/data/query/{}", self.base_url(), self.dataset))
            .query(&pairs)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, response_body = %body, "sanity query failed");
            anyhow::bail!("Sanity query failed (status {})", status);
        }

        let envelope: QueryEnvelope = resp.json().await?;
        Ok(envelope.result)
    }

    /// Applies a batch of mutations. `return_ids` makes the response list
    /// the affected document ids so callers can tell creates from no-ops.
    pub async fn mutate(&self, mutations: Vec<Value>, return_ids: bool) -> Result<MutateResponse> {
        let resp = self
            .http
            .post(format!("{}/data/mutate/{}", self.base_url(), self.dataset))
            .query(&[("returnIds", return_ids.to_string())])
            .bearer_auth(&self.token)
            .json(&json!({ "mutations": mutations }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            error!(status = %status, response_body = %body, "sanity mutation failed");
            anyhow::bail!("Sanity mutation failed (status {})", status);
        }

        Ok(resp.json().await?)
    }
}
