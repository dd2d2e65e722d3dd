use std::{sync::Arc, time::Duration};

use kube::runtime::wait::Condition;
use kube_core::ResourceExt;
use tokio::task::JoinSet;
use tracing::{info, instrument};

use crate::{
    api::{cluster::Cluster, machines::Machine},
    client::ClusterApi,
    controllers::{
        machine::validate_version,
        util::{is_machine_upgraded, poll, Readiness, DEFAULT_POLL_INTERVAL, DEFAULT_POLL_TIMEOUT},
    },
    Error, Result,
};

/// How an upgrade run behaves.
#[derive(Clone, Debug)]
pub struct UpgradeOptions {
    /// Kubernetes version every machine is moved to.
    pub version: String,
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub readiness: Readiness,
    /// Upgrade Master machines as a first wave, workers only once it succeeded.
    pub control_plane_first: bool,
    /// Refuse to run unless exactly one Cluster object exists.
    pub require_single_cluster: bool,
}

impl UpgradeOptions {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_POLL_TIMEOUT,
            readiness: Readiness::default(),
            control_plane_first: false,
            require_single_cluster: false,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UpgradeReport {
    pub version: String,
    /// Machine names, in the order their upgrade completed.
    pub upgraded: Vec<String>,
}

// Context shared by every machine upgrade task
pub struct Context {
    pub api: Arc<dyn ClusterApi>,
    pub options: UpgradeOptions,
}

impl Context {
    pub fn new(api: Arc<dyn ClusterApi>, options: UpgradeOptions) -> Arc<Self> {
        Arc::new(Self { api, options })
    }
}

/// Move every machine of the cluster to the requested version.
#[instrument(skip(ctx), fields(version = %ctx.options.version))]
pub async fn upgrade_cluster(ctx: Arc<Context>) -> Result<UpgradeReport> {
    let version = validate_version(&ctx.options.version)?.to_string();
    let ctx = if version == ctx.options.version {
        ctx
    } else {
        let mut options = ctx.options.clone();
        options.version = version.clone();
        Context::new(ctx.api.clone(), options)
    };

    if ctx.options.require_single_cluster {
        let cluster = single_cluster(ctx.api.as_ref()).await?;
        info!(
            cluster = %cluster.name_any(),
            endpoint = ?cluster.api_endpoint(),
            "Upgrading cluster"
        );
    }

    let machines = ctx.api.list_machines().await?;
    let mut report = UpgradeReport {
        version,
        upgraded: Vec::with_capacity(machines.len()),
    };

    if ctx.options.control_plane_first {
        let (masters, workers): (Vec<_>, Vec<_>) =
            machines.into_iter().partition(Machine::is_control_plane);
        if !masters.is_empty() {
            let count = masters.len();
            report
                .upgraded
                .extend(upgrade_machines(ctx.clone(), masters).await?);
            info!(machines = count, "Successfully upgraded control plane");
        }
        report.upgraded.extend(upgrade_machines(ctx, workers).await?);
    } else {
        report.upgraded = upgrade_machines(ctx, machines).await?;
    }

    info!(
        version = %report.version,
        machines = report.upgraded.len(),
        "Successfully upgraded the cluster"
    );
    Ok(report)
}

async fn single_cluster(api: &dyn ClusterApi) -> Result<Cluster> {
    let mut clusters = api.list_clusters().await?;
    if clusters.len() != 1 {
        return Err(Error::ClusterCount(clusters.len()));
    }
    Ok(clusters.remove(0))
}

/// Upgrade `machines` concurrently, one task each. Returns on the first
/// failure; tasks still running are aborted when the set is dropped.
async fn upgrade_machines(ctx: Arc<Context>, machines: Vec<Machine>) -> Result<Vec<String>> {
    let mut tasks = JoinSet::new();
    for machine in machines {
        tasks.spawn(upgrade_machine(ctx.clone(), machine));
    }

    let mut upgraded = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        upgraded.push(joined.map_err(Error::TaskError)??);
    }
    Ok(upgraded)
}

#[instrument(skip(ctx, machine), fields(machine = %machine.name_any()))]
async fn upgrade_machine(ctx: Arc<Context>, mut machine: Machine) -> Result<String> {
    let name = machine.name_any();
    machine.set_desired_version(&ctx.options.version);
    info!("Updating machine");

    match submit_and_wait(&ctx, &machine).await {
        Ok(()) => {
            info!("Machine upgraded");
            Ok(name)
        }
        Err(e) => Err(Error::MachineUpgrade {
            name,
            source: Box::new(e),
        }),
    }
}

async fn submit_and_wait(ctx: &Context, machine: &Machine) -> Result<()> {
    let updated = ctx.api.update_machine(machine).await?;
    let target = updated.name_any();
    let condition = is_machine_upgraded(ctx.options.readiness, ctx.options.version.clone());

    let api = &ctx.api;
    let target = &target;
    let condition = &condition;
    poll(
        ctx.options.poll_interval,
        ctx.options.timeout,
        &format!("machine {target}"),
        move || async move {
            let current = api.get_machine(target).await?;
            Ok::<_, Error>(condition.matches_object(Some(&current)))
        },
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Mutex,
    };

    use kube_core::ErrorResponse;

    use super::*;
    use crate::{
        api::{
            common::MachineRole,
            machines::{MachineSpec, MachineStatus, MachineVersionInfo},
        },
        client::MockClusterApi,
    };

    fn machine(name: &str, role: MachineRole) -> Machine {
        Machine::new(
            name,
            MachineSpec {
                roles: vec![role],
                versions: MachineVersionInfo {
                    kubelet: "1.8.3".into(),
                    control_plane: "1.8.3".into(),
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    }

    fn api_error(code: u16) -> Error {
        Error::KubeError(kube::Error::Api(ErrorResponse {
            status: "Failure".into(),
            message: "rejected".into(),
            reason: "Conflict".into(),
            code,
        }))
    }

    fn context(mock: MockClusterApi, options: UpgradeOptions) -> Arc<Context> {
        Context::new(Arc::new(mock), options)
    }

    fn fixture() -> Vec<Machine> {
        vec![
            machine("master-0", MachineRole::Master),
            machine("node-0", MachineRole::Node),
            machine("node-1", MachineRole::Node),
        ]
    }

    #[tokio::test(start_paused = true)]
    async fn upgrades_every_machine_by_role() {
        let submitted = Arc::new(Mutex::new(Vec::new()));
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines()
            .times(1)
            .returning(|| Ok(fixture()));
        let sink = submitted.clone();
        mock.expect_update_machine().times(3).returning(move |m| {
            sink.lock().unwrap().push(m.clone());
            Ok(m.clone())
        });
        mock.expect_get_machine()
            .times(3)
            .returning(|name| Ok(machine(name, MachineRole::Node)));
        mock.expect_list_clusters().never();

        let report = upgrade_cluster(context(mock, UpgradeOptions::new("1.9.0")))
            .await
            .unwrap();

        assert_eq!(report.version, "1.9.0");
        let mut upgraded = report.upgraded.clone();
        upgraded.sort();
        assert_eq!(upgraded, vec!["master-0", "node-0", "node-1"]);

        let submitted = submitted.lock().unwrap();
        for m in submitted.iter() {
            assert_eq!(m.spec.versions.kubelet, "1.9.0");
            let expected_cp = if m.is_control_plane() { "1.9.0" } else { "1.8.3" };
            assert_eq!(m.spec.versions.control_plane, expected_cp, "{}", m.name_any());
        }
    }

    #[tokio::test]
    async fn no_machines_is_success() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines().returning(|| Ok(vec![]));
        mock.expect_update_machine().never();

        let report = upgrade_cluster(context(mock, UpgradeOptions::new("1.9.0")))
            .await
            .unwrap();
        assert!(report.upgraded.is_empty());
    }

    #[tokio::test]
    async fn empty_version_is_rejected_before_any_call() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines().never();
        mock.expect_list_clusters().never();

        let err = upgrade_cluster(context(mock, UpgradeOptions::new(" ")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingVersion));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_update_is_reported_with_machine_name() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines()
            .returning(|| Ok(vec![machine("node-0", MachineRole::Node)]));
        mock.expect_update_machine()
            .returning(|_| Err(api_error(409)));
        mock.expect_get_machine().never();

        let err = upgrade_cluster(context(mock, UpgradeOptions::new("1.9.0")))
            .await
            .unwrap_err();
        match err {
            Error::MachineUpgrade { name, source } => {
                assert_eq!(name, "node-0");
                assert!(matches!(*source, Error::KubeError(kube::Error::Api(ref e)) if e.code == 409));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_get_stops_polling() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines()
            .returning(|| Ok(vec![machine("node-0", MachineRole::Node)]));
        mock.expect_update_machine().returning(|m| Ok(m.clone()));
        mock.expect_get_machine()
            .times(1)
            .returning(|_| Err(api_error(404)));

        let err = upgrade_cluster(context(mock, UpgradeOptions::new("1.9.0")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MachineUpgrade { ref name, .. } if name == "node-0"));
    }

    #[tokio::test(start_paused = true)]
    async fn versions_reported_waits_for_status() {
        let gets = Arc::new(AtomicU32::new(0));
        let counter = gets.clone();
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines()
            .returning(|| Ok(vec![machine("node-0", MachineRole::Node)]));
        mock.expect_update_machine().returning(|m| Ok(m.clone()));
        mock.expect_get_machine().returning(move |name| {
            let mut m = machine(name, MachineRole::Node);
            if counter.fetch_add(1, Ordering::SeqCst) >= 2 {
                m.status = Some(MachineStatus {
                    versions: Some(MachineVersionInfo {
                        kubelet: "1.9.0".into(),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            }
            Ok(m)
        });

        let mut options = UpgradeOptions::new("1.9.0");
        options.readiness = Readiness::VersionsReported;
        let report = upgrade_cluster(context(mock, options)).await.unwrap();

        assert_eq!(report.upgraded, vec!["node-0"]);
        assert_eq!(gets.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn versions_never_reported_times_out() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines()
            .returning(|| Ok(vec![machine("node-0", MachineRole::Node)]));
        mock.expect_update_machine().returning(|m| Ok(m.clone()));
        mock.expect_get_machine()
            .returning(|name| Ok(machine(name, MachineRole::Node)));

        let mut options = UpgradeOptions::new("1.9.0");
        options.readiness = Readiness::VersionsReported;
        options.timeout = Duration::from_secs(30);
        let err = upgrade_cluster(context(mock, options)).await.unwrap_err();

        match err {
            Error::MachineUpgrade { source, .. } => {
                assert!(matches!(*source, Error::PollTimeout { .. }))
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_failure_aborts_remaining_machines() {
        let gets = Arc::new(AtomicU32::new(0));
        let counter = gets.clone();
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines().returning(|| {
            Ok(vec![
                machine("node-0", MachineRole::Node),
                machine("node-1", MachineRole::Node),
            ])
        });
        mock.expect_update_machine()
            .times(2)
            .returning(|m| match m.name_any().as_str() {
                "node-1" => Err(api_error(409)),
                _ => Ok(m.clone()),
            });
        mock.expect_get_machine().returning(move |name| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(machine(name, MachineRole::Node))
        });

        let err = upgrade_cluster(context(mock, UpgradeOptions::new("1.9.0")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MachineUpgrade { ref name, .. } if name == "node-1"));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn report_lists_machines_in_completion_order() {
        let slow_gets = Arc::new(AtomicU32::new(0));
        let counter = slow_gets.clone();
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines().returning(|| {
            Ok(vec![
                machine("slow", MachineRole::Node),
                machine("fast", MachineRole::Node),
            ])
        });
        mock.expect_update_machine().returning(|m| Ok(m.clone()));
        mock.expect_get_machine().returning(move |name| {
            let mut m = machine(name, MachineRole::Node);
            let reported = name == "fast" || counter.fetch_add(1, Ordering::SeqCst) >= 2;
            if reported {
                m.status = Some(MachineStatus {
                    versions: Some(MachineVersionInfo {
                        kubelet: "1.9.0".into(),
                        ..Default::default()
                    }),
                    ..Default::default()
                });
            }
            Ok(m)
        });

        let mut options = UpgradeOptions::new("1.9.0");
        options.readiness = Readiness::VersionsReported;
        let report = upgrade_cluster(context(mock, options)).await.unwrap();
        assert_eq!(report.upgraded, vec!["fast", "slow"]);
    }

    #[tokio::test(start_paused = true)]
    async fn control_plane_first_without_masters_upgrades_workers() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines()
            .returning(|| Ok(vec![machine("node-0", MachineRole::Node)]));
        mock.expect_update_machine().times(1).returning(|m| Ok(m.clone()));
        mock.expect_get_machine()
            .returning(|name| Ok(machine(name, MachineRole::Node)));

        let mut options = UpgradeOptions::new("1.9.0");
        options.control_plane_first = true;
        let report = upgrade_cluster(context(mock, options)).await.unwrap();
        assert_eq!(report.upgraded, vec!["node-0"]);
    }

    #[tokio::test(start_paused = true)]
    async fn control_plane_wave_finishes_before_workers_start() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines().returning(|| Ok(fixture()));
        let updates = order.clone();
        mock.expect_update_machine().returning(move |m| {
            updates.lock().unwrap().push(format!("update {}", m.name_any()));
            Ok(m.clone())
        });
        let gets = order.clone();
        mock.expect_get_machine().returning(move |name| {
            gets.lock().unwrap().push(format!("get {name}"));
            Ok(machine(name, MachineRole::Node))
        });

        let mut options = UpgradeOptions::new("1.9.0");
        options.control_plane_first = true;
        let report = upgrade_cluster(context(mock, options)).await.unwrap();

        assert_eq!(report.upgraded[0], "master-0");
        let order = order.lock().unwrap();
        assert_eq!(&order[..2], &["update master-0", "get master-0"]);
        assert_eq!(order.len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_control_plane_wave_skips_workers() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_machines().returning(|| Ok(fixture()));
        mock.expect_update_machine()
            .times(1)
            .returning(|_| Err(api_error(500)));

        let mut options = UpgradeOptions::new("1.9.0");
        options.control_plane_first = true;
        let err = upgrade_cluster(context(mock, options)).await.unwrap_err();
        assert!(matches!(err, Error::MachineUpgrade { ref name, .. } if name == "master-0"));
    }

    #[tokio::test]
    async fn single_cluster_check_rejects_multiple_clusters() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_clusters().returning(|| {
            Ok(vec![
                Cluster::new("a", Default::default()),
                Cluster::new("b", Default::default()),
            ])
        });
        mock.expect_list_machines().never();

        let mut options = UpgradeOptions::new("1.9.0");
        options.require_single_cluster = true;
        let err = upgrade_cluster(context(mock, options)).await.unwrap_err();
        assert!(matches!(err, Error::ClusterCount(2)));
    }

    #[tokio::test(start_paused = true)]
    async fn single_cluster_check_passes_and_upgrades() {
        let mut mock = MockClusterApi::new();
        mock.expect_list_clusters()
            .times(1)
            .returning(|| Ok(vec![Cluster::new("test1", Default::default())]));
        mock.expect_list_machines()
            .returning(|| Ok(vec![machine("node-0", MachineRole::Node)]));
        mock.expect_update_machine().returning(|m| Ok(m.clone()));
        mock.expect_get_machine()
            .returning(|name| Ok(machine(name, MachineRole::Node)));

        let mut options = UpgradeOptions::new(" 1.9.0 ");
        options.require_single_cluster = true;
        let report = upgrade_cluster(context(mock, options)).await.unwrap();
        assert_eq!(report.version, "1.9.0");
        assert_eq!(report.upgraded, vec!["node-0"]);
    }
}
