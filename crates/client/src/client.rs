//! REST client for the backup service.
//!
//! Every call is scoped to a tenant: `/v1alpha1/tenants/{tenant}/...`.

use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use crate::error::{ApiError, Result};
use crate::types::*;

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_LOG_BODY_CHARS: usize = 512;
const API_PREFIX: &str = "v1alpha1";

/// Client for the backup service API.
#[derive(Debug, Clone)]
pub struct JibuClient {
    client: reqwest::Client,
    base_url: String,
}

impl JibuClient {
    /// Create a client with the default request timeout.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The API endpoint (e.g., "http://localhost:31800")
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(ApiError::invalid_request("API endpoint must not be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(Self::headers())
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers
    }

    fn log_response(status: reqwest::StatusCode, body: &str) {
        if status.is_success() {
            debug!("API response status: {}", status);
            return;
        }

        let mut preview = body.chars().take(MAX_LOG_BODY_CHARS).collect::<String>();
        if body.chars().count() > MAX_LOG_BODY_CHARS {
            preview.push_str("...");
        }
        debug!("API response error ({}): {}", status, preview);
    }

    /// Build `{base}/v1alpha1/tenants/{tenant}/{segments...}` with each segment encoded.
    fn url(&self, tenant: &str, segments: &[&str]) -> Result<String> {
        if tenant.is_empty() {
            return Err(ApiError::invalid_request("tenant must not be empty"));
        }
        let mut url = format!(
            "{}/{}/tenants/{}",
            self.base_url,
            API_PREFIX,
            urlencoding::encode(tenant)
        );
        for segment in segments {
            if segment.is_empty() {
                return Err(ApiError::invalid_request("resource name must not be empty"));
            }
            url.push('/');
            url.push_str(&urlencoding::encode(segment));
        }
        Ok(url)
    }

    /// Turn a non-success response into an [`ApiError`].
    fn error_from_body(status: reqwest::StatusCode, body: &str) -> ApiError {
        if let Ok(error) = serde_json::from_str::<ApiErrorResponse>(body) {
            let message = if error.code.is_empty() {
                error.message
            } else {
                format!("{}: {}", error.code, error.message)
            };
            return ApiError::api(status.as_u16(), message);
        }
        ApiError::api(status.as_u16(), format!("Request failed: {}", body))
    }

    /// Parse a JSON response body.
    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| {
            log::error!(
                "Failed to deserialize response. Body: {}, Error: {}",
                body,
                e
            );
            ApiError::Json(e)
        })
    }

    /// Accept any success status and ignore the body.
    async fn parse_empty_response(response: reqwest::Response) -> Result<()> {
        let status = response.status();
        let body = response.text().await?;
        Self::log_response(status, &body);

        if !status.is_success() {
            return Err(Self::error_from_body(status, &body));
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().await?;
        Self::parse_response(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        debug!("POST {}", url);
        let response = self.client.post(url).json(body).send().await?;
        Self::parse_response(response).await
    }

    async fn delete(&self, url: &str) -> Result<()> {
        debug!("DELETE {}", url);
        let response = self.client.delete(url).send().await?;
        Self::parse_empty_response(response).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Clusters and namespaces
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /v1alpha1/tenants/{tenant}/clusters
    pub async fn list_clusters(&self, tenant: &str) -> Result<Vec<Cluster>> {
        let url = self.url(tenant, &["clusters"])?;
        let list: List<Cluster> = self.get_json(&url).await?;
        Ok(list.items)
    }

    /// GET /v1alpha1/tenants/{tenant}/clusters/{name}
    pub async fn get_cluster(&self, tenant: &str, name: &str) -> Result<Cluster> {
        let url = self.url(tenant, &["clusters", name])?;
        self.get_json(&url).await
    }

    /// GET /v1alpha1/tenants/{tenant}/clusters/{name}/namespaces
    pub async fn list_namespaces(&self, tenant: &str, cluster: &str) -> Result<Vec<Namespace>> {
        let url = self.url(tenant, &["clusters", cluster, "namespaces"])?;
        let list: List<Namespace> = self.get_json(&url).await?;
        Ok(list.items)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Storages
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /v1alpha1/tenants/{tenant}/storages
    pub async fn list_storages(&self, tenant: &str) -> Result<Vec<Storage>> {
        let url = self.url(tenant, &["storages"])?;
        let list: List<Storage> = self.get_json(&url).await?;
        Ok(list.items)
    }

    /// GET /v1alpha1/tenants/{tenant}/storages/{name}
    pub async fn get_storage(&self, tenant: &str, name: &str) -> Result<Storage> {
        let url = self.url(tenant, &["storages", name])?;
        self.get_json(&url).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Backup plans
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /v1alpha1/tenants/{tenant}/backupplans
    pub async fn list_backup_plans(&self, tenant: &str) -> Result<Vec<BackupPlan>> {
        let url = self.url(tenant, &["backupplans"])?;
        let list: List<BackupPlan> = self.get_json(&url).await?;
        Ok(list.items)
    }

    /// GET /v1alpha1/tenants/{tenant}/backupplans/{name}
    pub async fn get_backup_plan(&self, tenant: &str, name: &str) -> Result<BackupPlan> {
        let url = self.url(tenant, &["backupplans", name])?;
        self.get_json(&url).await
    }

    /// POST /v1alpha1/tenants/{tenant}/backupplans
    pub async fn create_backup_plan(&self, tenant: &str, plan: &BackupPlan) -> Result<BackupPlan> {
        let url = self.url(tenant, &["backupplans"])?;
        self.post_json(&url, plan).await
    }

    /// DELETE /v1alpha1/tenants/{tenant}/backupplans/{name}
    pub async fn delete_backup_plan(&self, tenant: &str, name: &str) -> Result<()> {
        let url = self.url(tenant, &["backupplans", name])?;
        self.delete(&url).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Backup jobs
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /v1alpha1/tenants/{tenant}/backupjobs?planName=&sortBy=&ascending=
    pub async fn list_backup_jobs(
        &self,
        tenant: &str,
        options: &JobListOptions,
    ) -> Result<Vec<BackupJob>> {
        let url = format!(
            "{}{}",
            self.url(tenant, &["backupjobs"])?,
            options.query_string()
        );
        let list: List<BackupJob> = self.get_json(&url).await?;
        Ok(list.items)
    }

    /// GET /v1alpha1/tenants/{tenant}/backupjobs/{name}
    pub async fn get_backup_job(&self, tenant: &str, name: &str) -> Result<BackupJob> {
        let url = self.url(tenant, &["backupjobs", name])?;
        self.get_json(&url).await
    }

    /// POST /v1alpha1/tenants/{tenant}/backupjobs
    pub async fn create_backup_job(&self, tenant: &str, job: &BackupJob) -> Result<BackupJob> {
        let url = self.url(tenant, &["backupjobs"])?;
        self.post_json(&url, job).await
    }

    /// DELETE /v1alpha1/tenants/{tenant}/backupjobs/{name}
    pub async fn delete_backup_job(&self, tenant: &str, name: &str) -> Result<()> {
        let url = self.url(tenant, &["backupjobs", name])?;
        self.delete(&url).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Restore plans
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /v1alpha1/tenants/{tenant}/restoreplans
    pub async fn list_restore_plans(&self, tenant: &str) -> Result<Vec<RestorePlan>> {
        let url = self.url(tenant, &["restoreplans"])?;
        let list: List<RestorePlan> = self.get_json(&url).await?;
        Ok(list.items)
    }

    /// GET /v1alpha1/tenants/{tenant}/restoreplans/{name}
    pub async fn get_restore_plan(&self, tenant: &str, name: &str) -> Result<RestorePlan> {
        let url = self.url(tenant, &["restoreplans", name])?;
        self.get_json(&url).await
    }

    /// POST /v1alpha1/tenants/{tenant}/restoreplans
    pub async fn create_restore_plan(
        &self,
        tenant: &str,
        plan: &RestorePlan,
    ) -> Result<RestorePlan> {
        let url = self.url(tenant, &["restoreplans"])?;
        self.post_json(&url, plan).await
    }

    /// DELETE /v1alpha1/tenants/{tenant}/restoreplans/{name}
    pub async fn delete_restore_plan(&self, tenant: &str, name: &str) -> Result<()> {
        let url = self.url(tenant, &["restoreplans", name])?;
        self.delete(&url).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Restore jobs
    // ─────────────────────────────────────────────────────────────────────────

    /// GET /v1alpha1/tenants/{tenant}/restorejobs
    pub async fn list_restore_jobs(&self, tenant: &str) -> Result<Vec<RestoreJob>> {
        let url = self.url(tenant, &["restorejobs"])?;
        let list: List<RestoreJob> = self.get_json(&url).await?;
        Ok(list.items)
    }

    /// GET /v1alpha1/tenants/{tenant}/restorejobs/{name}
    pub async fn get_restore_job(&self, tenant: &str, name: &str) -> Result<RestoreJob> {
        let url = self.url(tenant, &["restorejobs", name])?;
        self.get_json(&url).await
    }

    /// POST /v1alpha1/tenants/{tenant}/restorejobs
    pub async fn create_restore_job(&self, tenant: &str, job: &RestoreJob) -> Result<RestoreJob> {
        let url = self.url(tenant, &["restorejobs"])?;
        self.post_json(&url, job).await
    }

    /// DELETE /v1alpha1/tenants/{tenant}/restorejobs/{name}
    pub async fn delete_restore_job(&self, tenant: &str, name: &str) -> Result<()> {
        let url = self.url(tenant, &["restorejobs", name])?;
        self.delete(&url).await
    }
}
