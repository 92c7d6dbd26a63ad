use anyhow::{anyhow, Context};
use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(data_value) = data {
                response["data"] = data_value;
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Minimal client for the protected School API routes
pub struct ApiClient {
    base_url: url::Url,
    token: Option<String>,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> anyhow::Result<Self> {
        let base_url = url::Url::parse(base_url).with_context(|| format!("invalid server URL '{}'", base_url))?;
        Ok(Self {
            base_url,
            token,
            http: reqwest::Client::new(),
        })
    }

    pub async fn get(&self, path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
        let request = self.http.get(self.url(path)?).query(query);
        self.send(request).await
    }

    pub async fn post(&self, path: &str, body: Value) -> anyhow::Result<Value> {
        let request = self.http.post(self.url(path)?).json(&body);
        self.send(request).await
    }

    fn url(&self, path: &str) -> anyhow::Result<url::Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("cannot build URL for '{}'", path))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> anyhow::Result<Value> {
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| anyhow!("no token; pass --token or set SCHOOL_API_TOKEN"))?;

        let response = request.bearer_auth(token).send().await.context("request failed")?;
        let status = response.status();
        let body: Value = response.json().await.context("server returned a non-JSON body")?;

        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("request failed");
            return Err(anyhow!("{} ({})", message, status));
        }
        Ok(body)
    }
}
