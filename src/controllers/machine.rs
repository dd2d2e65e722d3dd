use kube_core::ResourceExt;
use tracing::debug;

use crate::{
    api::{common::MachineRole, machines::Machine},
    Error, Result,
};

/// Reject an empty target version before anything touches the cluster.
pub fn validate_version(version: &str) -> Result<&str> {
    let version = version.trim();
    if version.is_empty() {
        return Err(Error::MissingVersion);
    }
    Ok(version)
}

impl Machine {
    pub fn is_control_plane(&self) -> bool {
        self.spec.roles.iter().any(MachineRole::is_master)
    }

    /// Point the machine at `version`. The kubelet is always bumped; the
    /// control plane only on machines carrying the Master role.
    pub fn set_desired_version(&mut self, version: &str) {
        self.spec.versions.kubelet = version.to_string();
        if self.is_control_plane() {
            self.spec.versions.control_plane = version.to_string();
        }
        debug!(
            machine = %self.name_any(),
            kubelet = %self.spec.versions.kubelet,
            control_plane = %self.spec.versions.control_plane,
            "Patched desired versions"
        );
    }

    /// Whether the actuator reports this machine running `version`.
    pub fn has_observed_version(&self, version: &str) -> bool {
        match self.status.as_ref().and_then(|s| s.versions.as_ref()) {
            Some(observed) => {
                observed.kubelet == version
                    && (!self.is_control_plane() || observed.control_plane == version)
            }
            None => false,
        }
    }
}
