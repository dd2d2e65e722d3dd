use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::MachineSetStatusError;
use super::machines::MachineSpec;

/// MachineSetSpec defines the desired state of MachineSet
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "cluster.k8s.io",
    version = "v1alpha1",
    kind = "MachineSet",
    plural = "machinesets",
    status = "MachineSetStatus",
    derive = "PartialEq",
    scale = r#"{"specReplicasPath":".spec.replicas", "statusReplicasPath":".status.replicas"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetSpec {
    /// Number of desired replicas. Defaults to 1 when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,
    /// Minimum number of seconds for which a newly created machine should be
    /// ready without any of its containers crashing to be considered available.
    #[serde(default)]
    pub min_ready_seconds: i32,
    /// Label query over machines that should match the replica count.
    #[serde(default)]
    pub selector: LabelSelector,
    /// Object that describes the machine that will be created if
    /// insufficient replicas are detected.
    #[serde(default)]
    pub template: MachineTemplateSpec,
}

/// MachineTemplateSpec describes the data needed to create a Machine from a template
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct MachineTemplateSpec {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: MachineSpec,
}

/// MachineSetStatus defines the observed state of MachineSet
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineSetStatus {
    /// Most recently observed number of replicas.
    #[serde(default)]
    pub replicas: i32,
    /// Number of replicas that have labels matching the labels of the machine template.
    #[serde(default)]
    pub fully_labeled_replicas: i32,
    /// Number of ready replicas for this MachineSet.
    #[serde(default)]
    pub ready_replicas: i32,
    /// Number of available replicas (ready for at least minReadySeconds).
    #[serde(default)]
    pub available_replicas: i32,
    /// The generation observed by the MachineSet controller.
    #[serde(default)]
    pub observed_generation: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<MachineSetStatusError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}
