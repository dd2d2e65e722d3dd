//! Access to the cluster-management API.
//!
//! The upgrade flow only talks to the API server through [`ClusterApi`], so
//! tests can swap in a mock while the binary uses [`KubeClusterApi`].

use std::path::Path;

use async_trait::async_trait;
use kube::{
    api::{ListParams, PostParams},
    config::{KubeConfigOptions, Kubeconfig},
    Api, Client, Config,
};
use kube_core::ResourceExt;
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::{
    api::{cluster::Cluster, machines::Machine},
    Error, Result,
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_clusters(&self) -> Result<Vec<Cluster>>;

    async fn list_machines(&self) -> Result<Vec<Machine>>;

    /// Replace the stored machine with `machine`, returning the server's copy.
    async fn update_machine(&self, machine: &Machine) -> Result<Machine>;

    async fn get_machine(&self, name: &str) -> Result<Machine>;
}

/// [`ClusterApi`] backed by a kube client, addressing the cluster-scoped resources.
#[derive(Clone)]
pub struct KubeClusterApi {
    clusters: Api<Cluster>,
    machines: Api<Machine>,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self {
            clusters: Api::all(client.clone()),
            machines: Api::all(client),
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_clusters(&self) -> Result<Vec<Cluster>> {
        let list = self.clusters.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn list_machines(&self) -> Result<Vec<Machine>> {
        let list = self.machines.list(&ListParams::default()).await?;
        debug!(count = list.items.len(), "Listed machines");
        Ok(list.items)
    }

    async fn update_machine(&self, machine: &Machine) -> Result<Machine> {
        let name = machine.name_any();
        let updated = self
            .machines
            .replace(&name, &PostParams::default(), machine)
            .await?;
        debug!(machine = %name, resource_version = ?updated.resource_version(), "Machine updated");
        Ok(updated)
    }

    async fn get_machine(&self, name: &str) -> Result<Machine> {
        Ok(self.machines.get(name).await?)
    }
}

/// Build a client from an explicit kubeconfig, or fall back to the default
/// inference chain (`KUBECONFIG`, `~/.kube/config`, in-cluster) when none is given.
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client> {
    match kubeconfig {
        Some(path) => {
            info!(kubeconfig = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(Error::KubeconfigError)?;
            let config = Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(Error::KubeconfigError)?;
            Ok(Client::try_from(config)?)
        }
        None => Ok(Client::try_default().await?),
    }
}
