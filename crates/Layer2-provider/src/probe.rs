//! HTTP probe transport
//!
//! Cookie store를 가진 reqwest client 하나로, agent의 모든 probe가
//! 같은 세션을 사용합니다.

use crate::error::ProviderError;
use async_trait::async_trait;
use redwhisper_foundation::{
    Error, ProbeMethod, ProbeRequest, ProbeResponse, ProbeSettings, ProbeTransport, Result,
};
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;

pub struct HttpProbe {
    client: Client,
}

impl HttpProbe {
    pub fn new(settings: &ProbeSettings) -> Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .danger_accept_invalid_certs(settings.accept_invalid_certs)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("Failed to create probe client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (e.g. one already logged in to the target)
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProbeTransport for HttpProbe {
    async fn send(&self, request: &ProbeRequest) -> Result<ProbeResponse> {
        let builder = match request.method {
            ProbeMethod::Get => self.client.get(&request.url).query(&request.fields),
            ProbeMethod::Post => self.client.post(&request.url).form(&request.fields),
        };

        let started = Instant::now();
        let response = builder
            .send()
            .await
            .map_err(|e| Error::from(ProviderError::from_reqwest(&e)))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| Error::from(ProviderError::from_reqwest(&e)))?;
        let elapsed = started.elapsed();

        debug!(
            method = ?request.method,
            url = %request.url,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Probe sent"
        );
        Ok(ProbeResponse::new(status, body).with_elapsed(elapsed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_from_settings() {
        assert!(HttpProbe::new(&ProbeSettings::default()).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_target_is_an_error() {
        let probe = HttpProbe::new(&ProbeSettings {
            timeout_secs: 2,
            accept_invalid_certs: true,
        })
        .unwrap();

        // port 9 (discard) on localhost is not expected to speak HTTP
        let result = probe
            .send(&ProbeRequest::get("http://127.0.0.1:9/").field("id", "1"))
            .await;
        assert!(result.is_err());
    }
}
