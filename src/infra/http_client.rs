use crate::app::ports::{FetchFailure, HttpClientPort};
use crate::config::ResolverConfig;
use crate::error::Result;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use std::time::Duration;

/// `HttpClientPort` backed by a shared reqwest client
pub struct ReqwestHttp {
    client: reqwest::Client,
}

impl ReqwestHttp {
    pub fn new(config: &ResolverConfig) -> Result<Self> {
        let client = client_builder(config).build()?;
        Ok(Self { client })
    }
}

fn client_builder(config: &ResolverConfig) -> reqwest::ClientBuilder {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds))
        .redirect(Policy::limited(config.max_redirects))
        .user_agent(config.user_agent.clone())
}

fn classify(err: reqwest::Error) -> FetchFailure {
    if err.is_timeout() {
        FetchFailure::Timeout
    } else if err.is_builder() {
        FetchFailure::InvalidUrl(err.to_string())
    } else if err.is_connect() {
        FetchFailure::Connect(err.to_string())
    } else if let Some(status) = err.status() {
        FetchFailure::Status(status.as_u16())
    } else {
        FetchFailure::Other(err.to_string())
    }
}

#[async_trait]
impl HttpClientPort for ReqwestHttp {
    async fn final_url(&self, url: &str) -> std::result::Result<String, FetchFailure> {
        let parsed = reqwest::Url::parse(url).map_err(|e| FetchFailure::InvalidUrl(e.to_string()))?;
        let resp = self.client.get(parsed).send().await.map_err(classify)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchFailure::Status(status.as_u16()));
        }
        // Only the landing URL matters; the body is never read.
        Ok(resp.url().to_string())
    }
}
