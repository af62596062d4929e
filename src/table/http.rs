use std::sync::Arc;

use async_trait::async_trait;
use http::{StatusCode, header};
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::context::PageStore;
use super::transport::{ReloadError, ReloadRequest, ReloadTransport, ServerPage};

/// Comma-separated props a partial reload asks for.
pub const PARTIAL_DATA_HEADER: &str = "x-partial-data";
pub const PRESERVE_STATE_HEADER: &str = "x-preserve-state";

/// Partial reloads over HTTP against a single view endpoint. Landed pages are
/// merged into the shared [`PageStore`].
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
    store: Arc<PageStore>,
}

impl HttpTransport {
    pub fn new(endpoint: Url, store: Arc<PageStore>) -> Self {
        Self::with_client(Client::new(), endpoint, store)
    }

    pub fn with_client(client: Client, endpoint: Url, store: Arc<PageStore>) -> Self {
        Self {
            client,
            endpoint,
            store,
        }
    }

    /// Loads the full page behind the endpoint, query string included, and
    /// makes it the current page.
    pub async fn visit(&self) -> Result<ServerPage, ReloadError> {
        debug!(url = %self.endpoint, "visit");
        let response = self
            .client
            .get(self.endpoint.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;
        let page = read_page(response).await?;
        self.store.visit(page.clone());
        Ok(page)
    }
}

async fn read_page(response: reqwest::Response) -> Result<ServerPage, ReloadError> {
    let status = response.status();
    if status == StatusCode::UNPROCESSABLE_ENTITY {
        let mut body: Value = response.json().await?;
        let errors = body
            .get_mut("errors")
            .map(Value::take)
            .unwrap_or(body);
        return Err(ReloadError::Rejected(errors));
    }
    if !status.is_success() {
        return Err(ReloadError::Status(status));
    }
    Ok(response.json().await?)
}

#[async_trait]
impl ReloadTransport for HttpTransport {
    async fn reload(&self, request: ReloadRequest) -> Result<ServerPage, ReloadError> {
        let mut url = self.endpoint.clone();
        url.set_query(None);
        url.query_pairs_mut()
            .extend_pairs(request.data.to_query_pairs());
        debug!(%url, sequence = request.sequence, "reload");
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .header(PARTIAL_DATA_HEADER, request.only.join(","))
            .header(PRESERVE_STATE_HEADER, request.preserve_state.to_string())
            .send()
            .await?;
        let page = read_page(response).await?;
        self.store.apply(request.sequence, page.clone());
        Ok(page)
    }
}
