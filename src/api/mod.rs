//! Resources of the `cluster.k8s.io/v1alpha1` cluster-management API.

pub mod cluster;
pub mod common;
pub mod machines;
pub mod machinesets;
