use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kube Error: {0}")]
    KubeError(#[source] kube::Error),

    #[error("Kubeconfig Error: {0}")]
    KubeconfigError(#[source] kube::config::KubeconfigError),

    #[error("You need to specify the kubernetes version being upgraded to")]
    MissingVersion,

    #[error("Expected exactly one cluster, found {0}")]
    ClusterCount(usize),

    #[error("Timed out after {timeout:?} waiting for {description}")]
    PollTimeout {
        description: String,
        timeout: Duration,
    },

    #[error("Failed to upgrade machine {name}: {source}")]
    MachineUpgrade {
        name: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Upgrade task failed: {0}")]
    TaskError(#[source] tokio::task::JoinError),
}
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        Error::KubeError(e)
    }
}

pub mod api;
pub mod cli;
pub mod client;
/// Expose the upgrade orchestration used by main
pub mod controller;
pub mod controllers;
pub use crate::controller::*;
