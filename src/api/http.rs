use super::types::{
    AlarmList, ContactsEnvelope, ExportQuery, IntegrationItem, IntegrationKind, ItemsEnvelope,
    PhotoPage, ProductsEnvelope, ProjectNoCheck, Site, SiteEnvelope, SiteId, SitesEnvelope,
    WorkItem, WorkStatus,
};
use super::{ApiError, SiteApi};
use crate::fields::FieldMap;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// [`SiteApi`] over the backend's JSON REST interface.
#[derive(Debug, Clone)]
pub struct HttpSiteApi {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSiteApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            token: None,
        }
    }

    /// Client with a per-request timeout.
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Send `Authorization: Bearer <token>` on every request.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stream the `/export` archive into `dest`. Returns the bytes written.
    ///
    /// The archive is never parsed.
    pub async fn download_export(&self, query: &ExportQuery, dest: &Path) -> Result<u64, ApiError> {
        let path = format!("/export?{}", query.to_query_string());
        let mut resp = check_status(self.request(Method::GET, &path).send().await?).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut written = 0u64;
        while let Some(chunk) = resp.chunk().await? {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        debug!("Downloaded export ({} bytes) to {}", written, dest.display());
        Ok(written)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match self.token {
            Some(ref token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.request(Method::GET, path).send().await?;
        decode(check_status(resp).await?).await
    }

    async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let resp = self.request(method, path).json(body).send().await?;
        decode(check_status(resp).await?).await
    }

    /// Send and only check the status; the body is ignored.
    async fn send_unit<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError> {
        let mut builder = self.request(method, path);
        if let Some(body) = body {
            builder = builder.json(body);
        }
        check_status(builder.send().await?).await?;
        Ok(())
    }
}

/// Turn a non-success response into [`ApiError::Status`] with the server's message.
async fn check_status(resp: Response) -> Result<Response, ApiError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(ApiError::Status {
        status: status.as_u16(),
        message: server_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16())),
    })
}

/// `error`, then `message`, from a JSON error body.
fn server_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    ["error", "message"]
        .iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|m| !m.trim().is_empty())
        .map(str::to_string)
}

async fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

#[async_trait]
impl SiteApi for HttpSiteApi {
    async fn list_sites(&self) -> Result<Vec<Site>, ApiError> {
        let envelope: SitesEnvelope = self.get_json("/sites").await?;
        Ok(envelope.sites)
    }

    async fn get_site(&self, site: SiteId) -> Result<Site, ApiError> {
        let envelope: SiteEnvelope = self.get_json(&format!("/sites/{}", site)).await?;
        envelope
            .site
            .ok_or_else(|| ApiError::Decode(format!("site {} missing from response", site)))
    }

    async fn create_site(&self, body: &FieldMap) -> Result<Site, ApiError> {
        let envelope: SiteEnvelope = self.send_json(Method::POST, "/sites", body).await?;
        envelope
            .site
            .ok_or_else(|| ApiError::Decode("created site missing from response".to_string()))
    }

    async fn patch_site(&self, site: SiteId, body: &FieldMap) -> Result<(), ApiError> {
        self.send_unit(Method::PATCH, &format!("/sites/{}", site), Some(body))
            .await
    }

    async fn check_project_no(&self, project_no: &str) -> Result<ProjectNoCheck, ApiError> {
        self.send_json(
            Method::POST,
            "/check-project-no",
            &json!({ "project_no": project_no }),
        )
        .await
    }

    async fn get_contacts(&self, site: SiteId) -> Result<Option<FieldMap>, ApiError> {
        let envelope: ContactsEnvelope =
            self.get_json(&format!("/sites/{}/contacts", site)).await?;
        Ok(envelope.contacts)
    }

    async fn save_contacts(&self, site: SiteId, body: &FieldMap) -> Result<(), ApiError> {
        self.send_unit(Method::POST, &format!("/sites/{}/contacts", site), Some(body))
            .await
    }

    async fn get_products(&self, site: SiteId) -> Result<Option<FieldMap>, ApiError> {
        let envelope: ProductsEnvelope =
            self.get_json(&format!("/sites/{}/products", site)).await?;
        Ok(envelope.products.and_then(|p| p.into_first()))
    }

    async fn save_products(&self, site: SiteId, body: &FieldMap) -> Result<(), ApiError> {
        self.send_unit(Method::POST, &format!("/sites/{}/products", site), Some(body))
            .await
    }

    async fn get_integrations(
        &self,
        site: SiteId,
        kind: IntegrationKind,
    ) -> Result<Vec<IntegrationItem>, ApiError> {
        let path = format!("/sites/{}/integrations/{}", site, kind.path_segment());
        let envelope: ItemsEnvelope<IntegrationItem> = self.get_json(&path).await?;
        Ok(envelope.items)
    }

    async fn save_integrations(
        &self,
        site: SiteId,
        kind: IntegrationKind,
        items: &[IntegrationItem],
    ) -> Result<(), ApiError> {
        let path = format!("/sites/{}/integrations/{}", site, kind.path_segment());
        self.send_unit(Method::POST, &path, Some(&json!({ "items": items })))
            .await
    }

    async fn list_work_items(
        &self,
        site: SiteId,
        status: WorkStatus,
    ) -> Result<Vec<WorkItem>, ApiError> {
        let path = format!("/sites/{}/work-items?status={}", site, status.as_str());
        let envelope: ItemsEnvelope<WorkItem> = self.get_json(&path).await?;
        Ok(envelope.items)
    }

    async fn save_work_items(&self, site: SiteId, items: &[WorkItem]) -> Result<(), ApiError> {
        let path = format!("/sites/{}/work-items", site);
        self.send_unit(Method::POST, &path, Some(&json!({ "items": items })))
            .await
    }

    async fn list_alarms(&self, site: SiteId, today: &str) -> Result<AlarmList, ApiError> {
        let path = format!(
            "/sites/{}/alarms?scope=mine&today={}",
            site,
            urlencoding::encode(today)
        );
        self.get_json(&path).await
    }

    async fn confirm_alarms(&self, site: SiteId, ids: &[i64]) -> Result<(), ApiError> {
        let path = format!("/sites/{}/alarms/confirm", site);
        self.send_unit(Method::POST, &path, Some(&json!({ "ids": ids })))
            .await
    }

    async fn list_photos(
        &self,
        site: SiteId,
        page: u32,
        page_size: u32,
    ) -> Result<PhotoPage, ApiError> {
        let path = format!(
            "/sites/{}/photos?page={}&page_size={}",
            site, page, page_size
        );
        self.get_json(&path).await
    }

    async fn delete_photo(&self, site: SiteId, photo: i64) -> Result<(), ApiError> {
        let path = format!("/sites/{}/photos/{}", site, photo);
        self.send_unit::<Value>(Method::DELETE, &path, None).await
    }
}
