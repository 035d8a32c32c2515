use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Pod, Service};
use kube::{
    api::{Api, ListParams, ResourceExt},
    Client,
};
use serde_derive::Serialize;
use tracing::{debug, warn};

use crate::probe::ContainerRef;
use crate::{Error, Result};

/// A node-local container usable as a probe origin. All pods sharing the IP
/// (host network) are listed in `members`; the container identity comes from
/// the first of them that resolved, any of them works for namespace entry.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeSource {
    pub container: ContainerRef,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceEndpoint {
    pub name: String,
    pub cluster_ip: String,
    pub ports: Vec<i32>,
}

/// Point-in-time view of probe sources, cluster-wide pod destinations and
/// services. Rebuilt from scratch every cycle, never cached.
#[derive(Debug, Default, Serialize)]
pub struct Snapshot {
    pub sources: BTreeMap<String, ProbeSource>,
    pub destinations: BTreeMap<String, Vec<String>>,
    pub services: Vec<ServiceEndpoint>,
}

impl Snapshot {
    /// Read the three inventories and assemble the snapshot. Any list
    /// failure propagates and takes the cycle down with it.
    pub async fn build(client: Client, node_name: &str) -> Result<Snapshot> {
        let pods: Api<Pod> = Api::all(client.clone());
        let node_pods = pods
            .list(&ListParams::default().fields(&format!("spec.nodeName={node_name}")))
            .await?;
        let all_pods = pods.list(&ListParams::default()).await?;
        let services: Api<Service> = Api::all(client);
        let all_services = services.list(&ListParams::default()).await?;

        Ok(Snapshot {
            sources: collect_sources(&node_pods.items),
            destinations: collect_destinations(&all_pods.items),
            services: collect_services(&all_services.items),
        })
    }
}

/// Group node-local pods by IP. Pods sharing a host network namespace
/// collapse into one source so each IP is probed once per target.
pub fn collect_sources(pods: &[Pod]) -> BTreeMap<String, ProbeSource> {
    let mut sources: BTreeMap<String, ProbeSource> = BTreeMap::new();
    for pod in pods {
        let name = pod.name_any();
        let Some(ip) = pod_ip(pod) else {
            debug!("pod {} has no IP yet, skipped as probe source", name);
            continue;
        };
        match resolve_container(pod) {
            Ok(container) => {
                sources
                    .entry(ip)
                    .and_modify(|s| s.members.push(name.clone()))
                    .or_insert_with(|| ProbeSource {
                        container,
                        members: vec![name.clone()],
                    });
            }
            Err(e) => warn!("failed to resolve container for pod {}: {}", name, e),
        }
    }
    sources
}

/// Group cluster-wide pods by IP. Destinations only need names for the
/// report, no container identity.
pub fn collect_destinations(pods: &[Pod]) -> BTreeMap<String, Vec<String>> {
    let mut destinations: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for pod in pods {
        let name = pod.name_any();
        let Some(ip) = pod_ip(pod) else {
            debug!("pod {} has no IP yet, skipped as destination", name);
            continue;
        };
        destinations.entry(ip).or_default().push(name);
    }
    destinations
}

pub fn collect_services(services: &[Service]) -> Vec<ServiceEndpoint> {
    let mut endpoints = Vec::new();
    for service in services {
        let name = service.name_any();
        let cluster_ip = service
            .spec
            .as_ref()
            .and_then(|s| s.cluster_ip.clone())
            .filter(|ip| !ip.is_empty() && ip != "None");
        let Some(cluster_ip) = cluster_ip else {
            debug!("service {} has no cluster IP, skipped", name);
            continue;
        };
        let ports = service
            .spec
            .as_ref()
            .and_then(|s| s.ports.as_ref())
            .map(|ports| ports.iter().map(|p| p.port).collect())
            .unwrap_or_default();
        endpoints.push(ServiceEndpoint {
            name,
            cluster_ip,
            ports,
        });
    }
    endpoints
}

fn pod_ip(pod: &Pod) -> Option<String> {
    pod.status
        .as_ref()
        .and_then(|s| s.pod_ip.clone())
        .filter(|ip| !ip.is_empty())
}

/// All containers in a pod share its network namespace, so the first one
/// with an identifier is enough for cnsenter.
fn resolve_container(pod: &Pod) -> Result<ContainerRef> {
    let statuses = pod
        .status
        .as_ref()
        .and_then(|s| s.container_statuses.as_ref())
        .filter(|statuses| !statuses.is_empty())
        .ok_or_else(|| Error::ContainerResolveError("no container status".to_string()))?;
    let container_id = statuses
        .iter()
        .find_map(|c| c.container_id.clone())
        .ok_or_else(|| Error::ContainerResolveError("no container id".to_string()))?;
    ContainerRef::parse(&container_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k8s_openapi::api::core::v1::{
        ContainerStatus, PodStatus, ServicePort, ServiceSpec,
    };
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

    fn pod(name: &str, ip: Option<&str>, container_id: Option<&str>) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            status: Some(PodStatus {
                pod_ip: ip.map(str::to_string),
                container_statuses: container_id.map(|id| {
                    vec![ContainerStatus {
                        container_id: Some(id.to_string()),
                        ..Default::default()
                    }]
                }),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn service(name: &str, cluster_ip: Option<&str>, ports: &[i32]) -> Service {
        Service {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                ..Default::default()
            },
            spec: Some(ServiceSpec {
                cluster_ip: cluster_ip.map(str::to_string),
                ports: Some(
                    ports
                        .iter()
                        .map(|p| ServicePort {
                            port: *p,
                            ..Default::default()
                        })
                        .collect(),
                ),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn host_network_pods_collapse_into_one_source() {
        let pods = vec![
            pod("kube-proxy", Some("192.168.0.10"), Some("containerd://aaa")),
            pod("node-exporter", Some("192.168.0.10"), Some("containerd://bbb")),
            pod("app", Some("10.1.1.1"), Some("docker://abc")),
        ];
        let sources = collect_sources(&pods);
        assert_eq!(sources.len(), 2);

        let shared = &sources["192.168.0.10"];
        assert_eq!(shared.members, vec!["kube-proxy", "node-exporter"]);
        // first pod in list order supplies the container identity
        assert_eq!(shared.container.id, "aaa");

        assert_eq!(sources["10.1.1.1"].container.runtime, "docker");
    }

    #[test]
    fn unresolvable_pods_are_skipped_without_aborting() {
        let pods = vec![
            pod("no-status", Some("10.1.1.1"), None),
            pod("bad-id", Some("10.1.1.2"), Some("not-a-container-id")),
            pod("ok", Some("10.1.1.3"), Some("docker://abc")),
            pod("no-ip", None, Some("docker://def")),
        ];
        let sources = collect_sources(&pods);
        assert_eq!(sources.len(), 1);
        assert!(sources.contains_key("10.1.1.3"));
    }

    #[test]
    fn destinations_group_by_ip_without_container_identity() {
        let pods = vec![
            pod("a", Some("10.1.1.1"), Some("docker://abc")),
            pod("b", Some("10.1.1.2"), None),
            pod("c", Some("10.1.1.2"), None),
            pod("pending", None, None),
        ];
        let destinations = collect_destinations(&pods);
        assert_eq!(destinations.len(), 2);
        assert_eq!(destinations["10.1.1.2"], vec!["b", "c"]);
    }

    #[test]
    fn services_keep_all_ports_and_skip_headless() {
        let services = vec![
            service("web", Some("10.96.0.1"), &[80, 443]),
            service("headless", Some("None"), &[5432]),
            service("pending", None, &[]),
        ];
        let endpoints = collect_services(&services);
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints[0].name, "web");
        assert_eq!(endpoints[0].ports, vec![80, 443]);
    }
}
