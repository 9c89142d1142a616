//! Candidate sources backed by the backup service listings.

use async_trait::async_trait;
use jibutest_client::{ApiError, Cluster, JibuClient, Namespace, Resource, Storage};
use jibutest_core::CandidateSource;

fn found<T>(result: Result<T, ApiError>) -> Result<Option<T>, ApiError> {
    match result {
        Ok(item) => Ok(Some(item)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Clusters registered for a tenant.
pub struct ClusterSource<'a> {
    pub client: &'a JibuClient,
    pub tenant: &'a str,
}

#[async_trait]
impl CandidateSource for ClusterSource<'_> {
    type Item = Cluster;
    type Error = ApiError;

    async fn fetch(&self, id: &str) -> Result<Option<Cluster>, ApiError> {
        found(self.client.get_cluster(self.tenant, id).await)
    }

    async fn list(&self) -> Result<Vec<Cluster>, ApiError> {
        self.client.list_clusters(self.tenant).await
    }
}

/// Storages registered for a tenant.
pub struct StorageSource<'a> {
    pub client: &'a JibuClient,
    pub tenant: &'a str,
}

#[async_trait]
impl CandidateSource for StorageSource<'_> {
    type Item = Storage;
    type Error = ApiError;

    async fn fetch(&self, id: &str) -> Result<Option<Storage>, ApiError> {
        found(self.client.get_storage(self.tenant, id).await)
    }

    async fn list(&self) -> Result<Vec<Storage>, ApiError> {
        self.client.list_storages(self.tenant).await
    }
}

/// Namespaces of one cluster. There is no single-namespace endpoint, so an
/// explicit name is looked up in the listing.
pub struct NamespaceSource<'a> {
    pub client: &'a JibuClient,
    pub tenant: &'a str,
    pub cluster: &'a str,
}

#[async_trait]
impl CandidateSource for NamespaceSource<'_> {
    type Item = Namespace;
    type Error = ApiError;

    async fn fetch(&self, id: &str) -> Result<Option<Namespace>, ApiError> {
        let namespaces = self.list().await?;
        Ok(namespaces.into_iter().find(|ns| ns.name() == id))
    }

    async fn list(&self) -> Result<Vec<Namespace>, ApiError> {
        self.client.list_namespaces(self.tenant, self.cluster).await
    }
}
