use serde_derive::Serialize;
use tracing::{info, warn};

use crate::config::Config;
use crate::probe::{ProbeMethod, ProbeOutcome, ProbeRunner};
use crate::topology::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CheckCategory {
    PodPod,
    PodService,
    ExternalIcmp,
    ExternalConnect,
}

impl CheckCategory {
    fn label(&self) -> &'static str {
        match self {
            CheckCategory::PodPod => "Pod-Pod",
            CheckCategory::PodService => "Pod-Service",
            CheckCategory::ExternalIcmp => "Pod-External ICMP",
            CheckCategory::ExternalConnect => "Pod-External Connection",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Pod { ip: String, pods: Vec<String> },
    Service { name: String, ip: String, port: i32 },
    External { ip: String, port: Option<i32> },
}

/// One probe pair's outcome, self-describing so the report stays meaningful
/// regardless of enumeration order.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub category: CheckCategory,
    pub src_ip: String,
    pub src_pods: Vec<String>,
    pub target: Target,
    pub outcome: ProbeOutcome,
}

impl Observation {
    fn log(&self) {
        let label = self.category.label();
        match (&self.target, &self.outcome) {
            (Target::Pod { ip, pods }, ProbeOutcome::Ok { latency_ms, .. }) => {
                info!(src_pods = ?self.src_pods, src_ip = %self.src_ip,
                    dst_pods = ?pods, dst_ip = %ip, latency_ms, "{} Ok", label);
            }
            (Target::Pod { ip, pods }, ProbeOutcome::Failed { cause }) => {
                warn!(src_pods = ?self.src_pods, src_ip = %self.src_ip,
                    dst_pods = ?pods, dst_ip = %ip, %cause, "{} Error", label);
            }
            (Target::Service { name, ip, port }, ProbeOutcome::Ok { latency_ms, .. }) => {
                info!(src_pods = ?self.src_pods, src_ip = %self.src_ip,
                    dst_service_name = %name, dst_service_ip = %ip, dst_service_port = port,
                    latency_ms, "{} Ok", label);
            }
            (Target::Service { name, ip, port }, ProbeOutcome::Failed { cause }) => {
                warn!(src_pods = ?self.src_pods, src_ip = %self.src_ip,
                    dst_service_name = %name, dst_service_ip = %ip, dst_service_port = port,
                    %cause, "{} Error", label);
            }
            (Target::External { ip, port }, ProbeOutcome::Ok { latency_ms, .. }) => {
                info!(src_pods = ?self.src_pods, src_ip = %self.src_ip,
                    ex_ip = %ip, ex_port = ?port, latency_ms, "{} Ok", label);
            }
            (Target::External { ip, port }, ProbeOutcome::Failed { cause }) => {
                warn!(src_pods = ?self.src_pods, src_ip = %self.src_ip,
                    ex_ip = %ip, ex_port = ?port, %cause, "{} Error", label);
            }
        }
    }
}

/// Evaluate every enabled check category as a full cross product over the
/// snapshot. Each pair is attempted exactly once; a pair's failure becomes a
/// `Failed` observation and never stops enumeration of the rest.
pub async fn run_checks<R: ProbeRunner>(
    snapshot: &Snapshot,
    config: &Config,
    runner: &R,
) -> Vec<Observation> {
    let mut observations = Vec::new();

    if config.check_pod_pod {
        for (src_ip, source) in &snapshot.sources {
            for (dst_ip, dst_pods) in &snapshot.destinations {
                let outcome = ProbeOutcome::from_result(
                    runner.icmp_probe(&source.container, dst_ip).await,
                    ProbeMethod::Icmp,
                );
                observations.push(observe(
                    CheckCategory::PodPod,
                    src_ip,
                    source.members.clone(),
                    Target::Pod {
                        ip: dst_ip.clone(),
                        pods: dst_pods.clone(),
                    },
                    outcome,
                ));
            }
        }
    }

    if config.check_pod_service {
        for (src_ip, source) in &snapshot.sources {
            for service in &snapshot.services {
                for port in &service.ports {
                    let outcome = ProbeOutcome::from_result(
                        runner
                            .connect_probe(&source.container, &service.cluster_ip, *port)
                            .await,
                        ProbeMethod::Connect,
                    );
                    observations.push(observe(
                        CheckCategory::PodService,
                        src_ip,
                        source.members.clone(),
                        Target::Service {
                            name: service.name.clone(),
                            ip: service.cluster_ip.clone(),
                            port: *port,
                        },
                        outcome,
                    ));
                }
            }
        }
    }

    for (src_ip, source) in &snapshot.sources {
        for icmp_ip in &config.external_icmp {
            let outcome = ProbeOutcome::from_result(
                runner.icmp_probe(&source.container, icmp_ip).await,
                ProbeMethod::Icmp,
            );
            observations.push(observe(
                CheckCategory::ExternalIcmp,
                src_ip,
                source.members.clone(),
                Target::External {
                    ip: icmp_ip.clone(),
                    port: None,
                },
                outcome,
            ));
        }
    }

    for (src_ip, source) in &snapshot.sources {
        for target in &config.external_conn {
            let outcome = ProbeOutcome::from_result(
                runner
                    .connect_probe(&source.container, &target.ip, target.port)
                    .await,
                ProbeMethod::Connect,
            );
            observations.push(observe(
                CheckCategory::ExternalConnect,
                src_ip,
                source.members.clone(),
                Target::External {
                    ip: target.ip.clone(),
                    port: Some(target.port),
                },
                outcome,
            ));
        }
    }

    observations
}

fn observe(
    category: CheckCategory,
    src_ip: &str,
    src_pods: Vec<String>,
    target: Target,
    outcome: ProbeOutcome,
) -> Observation {
    let observation = Observation {
        category,
        src_ip: src_ip.to_string(),
        src_pods,
        target,
        outcome,
    };
    observation.log();
    observation
}
