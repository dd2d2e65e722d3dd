use k8s_openapi::api::core::v1::{NodeConfigSource, ObjectReference, Taint};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, Time};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::{MachineRole, MachineStatusError};

/// MachineSpec defines the desired state of Machine
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "cluster.k8s.io",
    version = "v1alpha1",
    kind = "Machine",
    plural = "machines",
    status = "MachineStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name":"Kubelet","type":"string","jsonPath":".spec.versions.kubelet"}"#,
    printcolumn = r#"{"name":"ControlPlane","type":"string","jsonPath":".spec.versions.controlPlane"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    /// This ObjectMeta will autopopulate the Node created. Use this to
    /// indicate what labels, annotations, name prefix, etc., should be used
    /// when creating the Node.
    #[serde(default)]
    pub metadata: ObjectMeta,
    /// Taints are the full, authoritative list of taints to apply to the corresponding Node.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub taints: Vec<Taint>,
    /// Provider-specific serialized configuration to use during node creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<String>,
    /// A list of roles for this Machine to use.
    #[serde(default)]
    pub roles: Vec<MachineRole>,
    /// Versions of key software to use.
    #[serde(default)]
    pub versions: MachineVersionInfo,
    /// To populate in the associated Node for dynamic kubelet config.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_source: Option<NodeConfigSource>,
}

/// Software versions running (or desired) on a Machine.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineVersionInfo {
    /// Semantic version of kubelet to run
    #[serde(default)]
    pub kubelet: String,
    /// Semantic version of the Kubernetes control plane to run. Only
    /// meaningful for machines with the Master role.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub control_plane: String,
    /// Name/version of container runtime
    #[serde(default)]
    pub container_runtime: ContainerRuntimeInfo,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct ContainerRuntimeInfo {
    /// docker, rkt, containerd, ...
    #[serde(default)]
    pub name: String,
    /// Semantic version of the container runtime to use
    #[serde(default)]
    pub version: String,
}

/// MachineStatus defines the observed state of Machine
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    /// Node this Machine has been associated with, once it exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_ref: Option<ObjectReference>,
    /// When this status was last observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<Time>,
    /// Versions the Machine is currently running, as reported by its actuator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<MachineVersionInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<MachineStatusError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Provider-specific serialized status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<String>,
}
