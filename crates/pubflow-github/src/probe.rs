//! HTTP implementation of the [`Probe`] port.

use std::time::Duration;

use async_trait::async_trait;
use pubflow_core::ports::Probe;
use tracing::debug;

use crate::error::Result;

/// Plain GET prober. Redirects are followed; the final status is reported.
#[derive(Clone)]
pub struct HttpProbe {
    http: reqwest::Client,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pubflow/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn status(&self, url: &str) -> Option<u16> {
        match self.http.get(url).send().await {
            Ok(response) => Some(response.status().as_u16()),
            Err(e) => {
                debug!(url, error = %e, "probe request failed");
                None
            }
        }
    }
}
