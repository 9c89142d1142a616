//! Deleting restored namespaces directly on the target cluster.

use k8s_openapi::api::core::v1::Namespace;
use kube::api::{DeleteParams, PropagationPolicy};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Api, Client, Config};
use tracing::debug;

use crate::error::Result;

/// Build a client from a cluster's kubeconfig document, using its current context.
pub async fn cluster_client(kubeconfig_yaml: &str) -> Result<Client> {
    let kubeconfig = Kubeconfig::from_yaml(kubeconfig_yaml)?;
    let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
    Ok(Client::try_from(config)?)
}

pub fn is_not_found(error: &kube::Error) -> bool {
    matches!(error, kube::Error::Api(response) if response.code == 404)
}

/// Start deleting a namespace without waiting for it to go away.
///
/// A namespace that is already gone counts as deleted.
pub async fn delete_namespace(client: Client, name: &str) -> Result<()> {
    let namespaces: Api<Namespace> = Api::all(client);
    let params = DeleteParams {
        propagation_policy: Some(PropagationPolicy::Background),
        ..Default::default()
    };

    match namespaces.delete(name, &params).await {
        Ok(_) => {
            debug!("Namespace {} deletion initiated", name);
            Ok(())
        }
        Err(e) if is_not_found(&e) => {
            debug!("Namespace {} already deleted", name);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
