use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;

use crate::{
    client::{create_client, KubeClusterApi},
    controller::{upgrade_cluster, Context, UpgradeOptions, UpgradeReport},
    controllers::{machine::validate_version, util::Readiness},
    Result,
};

// One week.
const MAX_TIMEOUT_SECS: u64 = 7 * 24 * 60 * 60;

/// Upgrade every Machine of a cluster to a new Kubernetes version
#[derive(Parser, Debug)]
#[command(name = "cluster-upgrader", about, long_about = None)]
pub struct Cli {
    /// Path to kubeconfig file; the default client chain is used when omitted
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// The kubernetes version to be upgraded to
    #[arg(long = "version", value_name = "VERSION")]
    pub kube_version: String,

    /// Seconds between checks on an updated machine
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_interval: u64,

    /// Seconds to wait for each machine before giving up
    #[arg(long, default_value_t = 600, value_parser = clap::value_parser!(u64).range(1..=MAX_TIMEOUT_SECS))]
    pub timeout: u64,

    /// Wait until machine status reports the new versions instead of only re-reading it
    #[arg(long)]
    pub wait_for_versions: bool,

    /// Upgrade Master machines first and workers only once they are done
    #[arg(long)]
    pub control_plane_first: bool,

    /// Fail unless exactly one Cluster object exists
    #[arg(long)]
    pub single_cluster: bool,
}

impl Cli {
    pub fn options(&self) -> Result<UpgradeOptions> {
        let mut options = UpgradeOptions::new(validate_version(&self.kube_version)?);
        options.poll_interval = Duration::from_secs(self.poll_interval);
        options.timeout = Duration::from_secs(self.timeout);
        options.readiness = if self.wait_for_versions {
            Readiness::VersionsReported
        } else {
            Readiness::Observed
        };
        options.control_plane_first = self.control_plane_first;
        options.require_single_cluster = self.single_cluster;
        Ok(options)
    }

    pub async fn run(self) -> Result<UpgradeReport> {
        let options = self.options()?;
        let client = create_client(self.kubeconfig.as_deref()).await?;
        let ctx = Context::new(Arc::new(KubeClusterApi::new(client)), options);
        upgrade_cluster(ctx).await
    }
}
