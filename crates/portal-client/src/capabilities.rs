//! Layer discovery through WMS GetCapabilities.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use wms_common::{LayerDescriptor, WmsError, WmsResult};
use wms_protocol::{capabilities_url, legend_url, parse_capabilities, CapabilitiesOptions};

use crate::config::PortalConfig;
use crate::http::HttpFetch;

/// Fetches the workspace's layer list from the map server.
#[derive(Clone)]
pub struct CapabilitiesClient {
    http: Arc<dyn HttpFetch>,
    options: CapabilitiesOptions,
}

impl fmt::Debug for CapabilitiesClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapabilitiesClient")
            .field("options", &self.options)
            .finish()
    }
}

impl CapabilitiesClient {
    pub fn new(http: Arc<dyn HttpFetch>, options: CapabilitiesOptions) -> Self {
        Self { http, options }
    }

    pub fn from_config(http: Arc<dyn HttpFetch>, config: &PortalConfig) -> Self {
        Self::new(http, config.capabilities_options())
    }

    /// GetCapabilities URL for the configured workspace.
    pub fn url(&self) -> String {
        capabilities_url(&self.options.base_url, &self.options.workspace)
    }

    /// Legend image URL for a fully-qualified layer name.
    pub fn legend_url(&self, layer_name: &str) -> String {
        legend_url(&self.options.base_url, layer_name)
    }

    /// Fetch and parse the capabilities document.
    #[instrument(skip(self), fields(workspace = %self.options.workspace))]
    pub async fn try_fetch_layers(&self) -> WmsResult<Vec<LayerDescriptor>> {
        let url = self.url();
        debug!(url = %url, "Fetching WMS capabilities");

        let response = self.http.get(&url).await?.error_for_status()?;
        let layers = parse_capabilities(&response.body, &self.options)?;

        info!(count = layers.len(), "Fetched WMS capabilities");
        Ok(layers)
    }

    /// Like [`try_fetch_layers`](Self::try_fetch_layers), but any failure is
    /// logged and reported as an empty list.
    pub async fn fetch_layers(&self) -> Vec<LayerDescriptor> {
        match self.try_fetch_layers().await {
            Ok(layers) => layers,
            Err(e) => {
                log_failure(&e);
                Vec::new()
            }
        }
    }
}

fn log_failure(e: &WmsError) {
    match e {
        WmsError::HttpStatus { status, .. } => {
            warn!(status = *status, error = %e, "Capabilities request rejected")
        }
        _ => warn!(error = %e, "Failed to fetch WMS capabilities"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct RecordingFetch {
        response: fn() -> WmsResult<HttpResponse>,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl HttpFetch for RecordingFetch {
        async fn get(&self, url: &str) -> WmsResult<HttpResponse> {
            self.urls.lock().unwrap().push(url.to_string());
            (self.response)()
        }
    }

    fn make_client(response: fn() -> WmsResult<HttpResponse>) -> (CapabilitiesClient, Arc<RecordingFetch>) {
        let http = Arc::new(RecordingFetch {
            response,
            urls: Mutex::new(Vec::new()),
        });
        let options = CapabilitiesOptions::new(test_utils::BASE_URL, test_utils::WORKSPACE);
        (CapabilitiesClient::new(http.clone(), options), http)
    }

    #[tokio::test]
    async fn test_fetch_layers() {
        let (client, http) = make_client(|| Ok(HttpResponse::new(200, test_utils::CAPABILITIES_1_1_1)));

        let layers = client.fetch_layers().await;

        let names: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["sembrando:territorios_28", "sembrando:rios", "sembrando:unidades_riego"]
        );
        assert_eq!(
            http.urls.lock().unwrap().as_slice(),
            ["http://localhost:8082/geoserver/sembrando/wms?service=WMS&version=1.1.1&request=GetCapabilities"]
        );
    }

    #[tokio::test]
    async fn test_failures_become_empty_list() {
        let (client, _) = make_client(|| Ok(HttpResponse::new(500, "boom")));
        assert!(client.fetch_layers().await.is_empty());
        assert!(matches!(
            client.try_fetch_layers().await,
            Err(WmsError::HttpStatus { status: 500, .. })
        ));

        let (client, _) = make_client(|| Err(WmsError::Transport("connection refused".into())));
        assert!(client.fetch_layers().await.is_empty());

        let (client, _) = make_client(|| Ok(HttpResponse::new(200, "<WMT_MS_Capabilities><Capability><Layer>")));
        assert!(client.fetch_layers().await.is_empty());

        let (client, _) = make_client(|| Ok(HttpResponse::new(200, test_utils::SERVICE_EXCEPTION)));
        assert!(matches!(
            client.try_fetch_layers().await,
            Err(WmsError::ServiceException { .. })
        ));
    }

    #[test]
    fn test_legend_url() {
        let (client, _) = make_client(|| Ok(HttpResponse::new(200, "")));
        assert_eq!(
            client.legend_url("sembrando:rios"),
            "http://localhost:8082/geoserver/wms?REQUEST=GetLegendGraphic&VERSION=1.0.0&FORMAT=image/png&WIDTH=20&HEIGHT=20&LAYER=sembrando:rios"
        );
    }
}
