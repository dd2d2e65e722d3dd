use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::common::ClusterStatusError;

/// ClusterSpec defines the desired state of Cluster
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[kube(
    group = "cluster.k8s.io",
    version = "v1alpha1",
    kind = "Cluster",
    plural = "clusters",
    status = "ClusterStatus",
    derive = "PartialEq"
)]
#[serde(rename_all = "camelCase")]
pub struct ClusterSpec {
    /// Cluster network configuration
    #[serde(default)]
    pub cluster_network: ClusterNetworkingConfig,
    /// Provider-specific serialized configuration to use during cluster creation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config: Option<String>,
}

/// ClusterNetworkingConfig specifies the different networking parameters for a cluster.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterNetworkingConfig {
    /// The network ranges from which service VIPs are allocated.
    #[serde(default)]
    pub services: NetworkRanges,
    /// The network ranges from which POD networks are allocated.
    #[serde(default)]
    pub pods: NetworkRanges,
    /// Domain name for services.
    #[serde(default)]
    pub service_domain: String,
}

/// NetworkRanges represents ranges of network addresses.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
pub struct NetworkRanges {
    #[serde(default, rename = "cidrBlocks")]
    pub cidr_blocks: Vec<String>,
}

/// ClusterStatus defines the observed state of Cluster
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterStatus {
    /// APIEndpoint represents the endpoint to communicate with the IP.
    #[serde(default)]
    pub api_endpoints: Vec<ApiEndpoint>,
    /// Set when there is a problem reconciling the Cluster that requires intervention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<ClusterStatusError>,
    /// Human-readable description of `error_reason`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Provider-specific serialized status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_status: Option<String>,
}

/// APIEndpoint represents a reachable Kubernetes API endpoint.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq, JsonSchema)]
pub struct ApiEndpoint {
    /// The hostname on which the API server is serving.
    pub host: String,
    /// The port on which the API server is serving.
    pub port: i32,
}

impl Cluster {
    /// First advertised API endpoint as `host:port`, if any.
    pub fn api_endpoint(&self) -> Option<String> {
        self.status
            .as_ref()
            .and_then(|status| status.api_endpoints.first())
            .map(|endpoint| format!("{}:{}", endpoint.host, endpoint.port))
    }
}
