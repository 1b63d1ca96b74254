//! Pod metric families
//!
//! Every family is one entry in the table returned by [`pod_generators`].
//! Enumerations (phases, condition states, container reasons) are constant
//! tables iterated by the generators, so the emitted value space is padded
//! and fixed regardless of the pod's actual state.


use crate::family::{bool_value, FamilyDesc, Sample};
use crate::generator::{FamilyGenerator, GeneratorSet};
use crate::labels::{object_label_name, optional_bool, sanitize_label_key, NONE_VALUE};
use crate::options::{CollectorOptions, OwnerSelection};
use crate::quantity::{quantity_to_bytes, quantity_to_cores, QuantityError, ResourceUnit};
use k8s_openapi::api::core::v1::{Container, ContainerStatus, Pod, PodCondition, ResourceRequirements};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{OwnerReference, Time};
use std::collections::BTreeMap;
use tracing::debug;

pub const POD_CREATED: FamilyDesc = FamilyDesc::gauge("kube_pod_created", "Unix creation timestamp");
pub const POD_START_TIME: FamilyDesc =
    FamilyDesc::gauge("kube_pod_start_time", "Start time in unix timestamp for a pod.");
pub const POD_COMPLETION_TIME: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_completion_time",
    "Completion time in unix timestamp for a pod.",
);
pub const POD_INFO: FamilyDesc = FamilyDesc::gauge("kube_pod_info", "Information about pod.");
pub const POD_OWNER: FamilyDesc = FamilyDesc::gauge("kube_pod_owner", "Information about the Pod's owner.");
pub const POD_LABELS: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_labels",
    "Kubernetes labels converted to Prometheus labels.",
);
pub const POD_STATUS_PHASE: FamilyDesc =
    FamilyDesc::gauge("kube_pod_status_phase", "The pods current phase.");
pub const POD_STATUS_READY: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_status_ready",
    "Describes whether the pod is ready to serve requests.",
);
pub const POD_STATUS_SCHEDULED: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_status_scheduled",
    "Describes the status of the scheduling process for the pod.",
);
pub const POD_STATUS_SCHEDULED_TIME: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_status_scheduled_time",
    "Unix timestamp when pod moved into scheduled status",
);
pub const CONTAINER_INFO: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_info",
    "Information about a container in a pod.",
);
pub const CONTAINER_STATUS_READY: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_status_ready",
    "Describes whether the containers readiness check succeeded.",
);
pub const CONTAINER_STATUS_RESTARTS: FamilyDesc = FamilyDesc::counter(
    "kube_pod_container_status_restarts_total",
    "The number of container restarts per container.",
);
pub const CONTAINER_STATUS_RUNNING: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_status_running",
    "Describes whether the container is currently in running state.",
);
pub const CONTAINER_STATUS_WAITING: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_status_waiting",
    "Describes whether the container is currently in waiting state.",
);
pub const CONTAINER_STATUS_WAITING_REASON: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_status_waiting_reason",
    "Describes the reason the container is currently in waiting state.",
);
pub const CONTAINER_STATUS_TERMINATED: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_status_terminated",
    "Describes whether the container is currently in terminated state.",
);
pub const CONTAINER_STATUS_TERMINATED_REASON: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_status_terminated_reason",
    "Describes the reason the container is currently in terminated state.",
);
pub const CONTAINER_REQUESTS_CPU_CORES: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_resource_requests_cpu_cores",
    "The number of requested cpu cores by a container.",
);
pub const CONTAINER_REQUESTS_MEMORY_BYTES: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_resource_requests_memory_bytes",
    "The number of requested memory bytes by a container.",
);
pub const CONTAINER_LIMITS_CPU_CORES: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_resource_limits_cpu_cores",
    "The limit on cpu cores to be used by a container.",
);
pub const CONTAINER_LIMITS_MEMORY_BYTES: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_resource_limits_memory_bytes",
    "The limit on memory to be used by a container in bytes.",
);
pub const CONTAINER_RESOURCE_REQUESTS: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_resource_requests",
    "The number of requested request resource by a container.",
);
pub const CONTAINER_RESOURCE_LIMITS: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_container_resource_limits",
    "The number of requested limit resource by a container.",
);
pub const PVC_INFO: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_spec_volumes_persistentvolumeclaims_info",
    "Information about persistentvolumeclaim volumes in a pod.",
);
pub const PVC_READONLY: FamilyDesc = FamilyDesc::gauge(
    "kube_pod_spec_volumes_persistentvolumeclaims_readonly",
    "Describes whether a persistentvolumeclaim is mounted read only.",
);

/// Pod phases, in emission order
pub const POD_PHASES: &[&str] = &["Pending", "Running", "Succeeded", "Failed", "Unknown"];

/// Phase reported for pods with a phase outside [`POD_PHASES`] or on an unreachable node
pub const UNKNOWN_PHASE: &str = "Unknown";

/// Status reason set by the node lifecycle controller when a node stops responding
pub const NODE_UNREACHABLE_REASON: &str = "NodeLost";

/// Condition status strings and the `condition` label value they map to
pub const CONDITION_STATES: &[(&str, &str)] =
    &[("True", "true"), ("False", "false"), ("Unknown", "unknown")];

/// Bucket for condition statuses outside [`CONDITION_STATES`]
pub const UNKNOWN_CONDITION: &str = "unknown";

pub const POD_READY_CONDITION: &str = "Ready";
pub const POD_SCHEDULED_CONDITION: &str = "PodScheduled";

pub const WAITING_REASONS: &[&str] = &[
    "ContainerCreating",
    "CrashLoopBackOff",
    "ImagePullBackOff",
    "ErrImagePull",
];

pub const TERMINATED_REASONS: &[&str] = &["OOMKilled", "Completed", "Error", "ContainerCannotRun"];

/// Build the pod generator table, restricted to the enabled families
pub fn pod_generators(options: &CollectorOptions) -> GeneratorSet<Pod> {
    let owner_selection = options.owner_selection;

    GeneratorSet::new(
        "pod",
        vec![
            FamilyGenerator::new(POD_CREATED, |p: &Pod| {
                timestamp_sample(p, p.metadata.creation_timestamp.as_ref())
            }),
            FamilyGenerator::new(POD_INFO, move |p: &Pod| info_samples(p, owner_selection)),
            FamilyGenerator::new(POD_OWNER, move |p: &Pod| owner_samples(p, owner_selection)),
            FamilyGenerator::new(POD_LABELS, label_samples),
            FamilyGenerator::new(POD_START_TIME, |p: &Pod| {
                timestamp_sample(p, p.status.as_ref().and_then(|s| s.start_time.as_ref()))
            }),
            FamilyGenerator::new(POD_COMPLETION_TIME, completion_time_samples),
            FamilyGenerator::new(POD_STATUS_PHASE, phase_samples),
            FamilyGenerator::new(POD_STATUS_READY, |p: &Pod| {
                condition_samples(p, POD_READY_CONDITION)
            }),
            FamilyGenerator::new(POD_STATUS_SCHEDULED, |p: &Pod| {
                condition_samples(p, POD_SCHEDULED_CONDITION)
            }),
            FamilyGenerator::new(POD_STATUS_SCHEDULED_TIME, scheduled_time_samples),
            FamilyGenerator::new(CONTAINER_INFO, container_info_samples),
            FamilyGenerator::new(CONTAINER_STATUS_READY, |p: &Pod| {
                per_container_status(p, |cs| bool_value(cs.ready))
            }),
            FamilyGenerator::new(CONTAINER_STATUS_RESTARTS, |p: &Pod| {
                per_container_status(p, |cs| f64::from(cs.restart_count))
            }),
            FamilyGenerator::new(CONTAINER_STATUS_RUNNING, |p: &Pod| {
                per_container_status(p, |cs| {
                    bool_value(matches!(ContainerPhase::of(cs), ContainerPhase::Running))
                })
            }),
            FamilyGenerator::new(CONTAINER_STATUS_WAITING, |p: &Pod| {
                per_container_status(p, |cs| {
                    bool_value(matches!(ContainerPhase::of(cs), ContainerPhase::Waiting(_)))
                })
            }),
            FamilyGenerator::new(CONTAINER_STATUS_WAITING_REASON, |p: &Pod| {
                reason_samples(p, WAITING_REASONS, |phase| match phase {
                    ContainerPhase::Waiting(reason) => reason,
                    _ => None,
                })
            }),
            FamilyGenerator::new(CONTAINER_STATUS_TERMINATED, |p: &Pod| {
                per_container_status(p, |cs| {
                    bool_value(matches!(ContainerPhase::of(cs), ContainerPhase::Terminated(_)))
                })
            }),
            FamilyGenerator::new(CONTAINER_STATUS_TERMINATED_REASON, |p: &Pod| {
                reason_samples(p, TERMINATED_REASONS, |phase| match phase {
                    ContainerPhase::Terminated(reason) => reason,
                    _ => None,
                })
            }),
            FamilyGenerator::new(CONTAINER_REQUESTS_CPU_CORES, |p: &Pod| {
                dedicated_resource_samples(p, ResourceList::Requests, "cpu", quantity_to_cores)
            }),
            FamilyGenerator::new(CONTAINER_REQUESTS_MEMORY_BYTES, |p: &Pod| {
                dedicated_resource_samples(p, ResourceList::Requests, "memory", quantity_to_bytes)
            }),
            FamilyGenerator::new(CONTAINER_LIMITS_CPU_CORES, |p: &Pod| {
                dedicated_resource_samples(p, ResourceList::Limits, "cpu", quantity_to_cores)
            }),
            FamilyGenerator::new(CONTAINER_LIMITS_MEMORY_BYTES, |p: &Pod| {
                dedicated_resource_samples(p, ResourceList::Limits, "memory", quantity_to_bytes)
            }),
            FamilyGenerator::new(CONTAINER_RESOURCE_REQUESTS, |p: &Pod| {
                resource_samples(p, ResourceList::Requests)
            }),
            FamilyGenerator::new(CONTAINER_RESOURCE_LIMITS, |p: &Pod| {
                resource_samples(p, ResourceList::Limits)
            }),
            FamilyGenerator::new(PVC_INFO, |p: &Pod| pvc_samples(p, |_| 1.0)),
            FamilyGenerator::new(PVC_READONLY, |p: &Pod| {
                pvc_samples(p, bool_value)
            }),
        ],
    )
    .filtered(&options.family_filter)
}

fn namespace(pod: &Pod) -> &str {
    pod.metadata.namespace.as_deref().unwrap_or("")
}

fn name(pod: &Pod) -> &str {
    pod.metadata.name.as_deref().unwrap_or("")
}

fn node_name(pod: &Pod) -> &str {
    pod.spec
        .as_ref()
        .and_then(|s| s.node_name.as_deref())
        .unwrap_or("")
}

/// Sample carrying the pod identity plus `extra` labels
fn pod_sample(pod: &Pod, extra: &[(&str, &str)], value: f64) -> Sample {
    let mut labels = Vec::with_capacity(extra.len() + 2);
    labels.push(("namespace", namespace(pod)));
    labels.push(("pod", name(pod)));
    labels.extend_from_slice(extra);
    Sample::new(&labels, value)
}

fn unix_seconds(time: &Time) -> f64 {
    time.0.timestamp() as f64
}

fn timestamp_sample(pod: &Pod, time: Option<&Time>) -> Vec<Sample> {
    time.map(|t| vec![pod_sample(pod, &[], unix_seconds(t))])
        .unwrap_or_default()
}

fn containers(pod: &Pod) -> &[Container] {
    pod.spec
        .as_ref()
        .map(|s| s.containers.as_slice())
        .unwrap_or(&[])
}

fn container_statuses(pod: &Pod) -> &[ContainerStatus] {
    pod.status
        .as_ref()
        .and_then(|s| s.container_statuses.as_deref())
        .unwrap_or(&[])
}

fn select_owner(pod: &Pod, selection: OwnerSelection) -> Option<&OwnerReference> {
    let owners = pod.metadata.owner_references.as_deref().unwrap_or(&[]);
    match selection {
        OwnerSelection::First => owners.first(),
        OwnerSelection::Controller => owners
            .iter()
            .find(|o| o.controller == Some(true))
            .or_else(|| owners.first()),
    }
}

fn info_samples(pod: &Pod, selection: OwnerSelection) -> Vec<Sample> {
    let status = pod.status.as_ref();
    let host_ip = status.and_then(|s| s.host_ip.as_deref()).unwrap_or("");
    let pod_ip = status.and_then(|s| s.pod_ip.as_deref()).unwrap_or("");
    let (kind, owner) = select_owner(pod, selection)
        .map(|o| (o.kind.as_str(), o.name.as_str()))
        .unwrap_or((NONE_VALUE, NONE_VALUE));

    vec![pod_sample(
        pod,
        &[
            ("host_ip", host_ip),
            ("pod_ip", pod_ip),
            ("node", node_name(pod)),
            ("created_by_kind", kind),
            ("created_by_name", owner),
        ],
        1.0,
    )]
}

fn owner_samples(pod: &Pod, selection: OwnerSelection) -> Vec<Sample> {
    let (kind, owner, is_controller) = match select_owner(pod, selection) {
        Some(o) => (o.kind.as_str(), o.name.as_str(), optional_bool(o.controller)),
        None => (NONE_VALUE, NONE_VALUE, NONE_VALUE),
    };

    vec![pod_sample(
        pod,
        &[
            ("owner_kind", kind),
            ("owner_name", owner),
            ("owner_is_controller", is_controller),
        ],
        1.0,
    )]
}

/// Keys that sanitize to the same label name keep the first key in sorted order
fn label_samples(pod: &Pod) -> Vec<Sample> {
    match pod.metadata.labels.as_ref() {
        Some(labels) if !labels.is_empty() => {
            let mut sample = pod_sample(pod, &[], 1.0);
            for (key, value) in labels {
                let label = object_label_name(key);
                if sample.labels.contains_key(&label) {
                    debug!(
                        namespace = %namespace(pod),
                        pod = %name(pod),
                        key = %key,
                        label = %label,
                        "Skipping pod label colliding after sanitization"
                    );
                    continue;
                }
                sample = sample.with_label(label, value.as_str());
            }
            vec![sample]
        }
        _ => Vec::new(),
    }
}

/// Latest `finishedAt` across terminated containers
fn completion_time_samples(pod: &Pod) -> Vec<Sample> {
    container_statuses(pod)
        .iter()
        .filter_map(|cs| cs.state.as_ref()?.terminated.as_ref()?.finished_at.as_ref())
        .map(unix_seconds)
        .reduce(f64::max)
        .map(|latest| vec![pod_sample(pod, &[], latest)])
        .unwrap_or_default()
}

/// Phase used for the phase family, `None` when the pod reports no phase
fn effective_phase(pod: &Pod) -> Option<&str> {
    let status = pod.status.as_ref()?;
    if pod.metadata.deletion_timestamp.is_some()
        && status.reason.as_deref() == Some(NODE_UNREACHABLE_REASON)
    {
        return Some(UNKNOWN_PHASE);
    }

    let phase = status.phase.as_deref().filter(|p| !p.is_empty())?;
    Some(if POD_PHASES.contains(&phase) {
        phase
    } else {
        UNKNOWN_PHASE
    })
}

fn phase_samples(pod: &Pod) -> Vec<Sample> {
    let Some(actual) = effective_phase(pod) else {
        return Vec::new();
    };

    POD_PHASES
        .iter()
        .map(|phase| pod_sample(pod, &[("phase", *phase)], bool_value(*phase == actual)))
        .collect()
}

fn find_condition<'a>(pod: &'a Pod, condition_type: &str) -> Option<&'a PodCondition> {
    pod.status
        .as_ref()?
        .conditions
        .as_deref()?
        .iter()
        .find(|c| c.type_ == condition_type)
}

fn condition_bucket(status: &str) -> &'static str {
    CONDITION_STATES
        .iter()
        .find(|(s, _)| *s == status)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(UNKNOWN_CONDITION)
}

fn condition_samples(pod: &Pod, condition_type: &str) -> Vec<Sample> {
    let Some(condition) = find_condition(pod, condition_type) else {
        return Vec::new();
    };
    let actual = condition_bucket(&condition.status);

    CONDITION_STATES
        .iter()
        .map(|(_, bucket)| {
            pod_sample(pod, &[("condition", *bucket)], bool_value(*bucket == actual))
        })
        .collect()
}

fn scheduled_time_samples(pod: &Pod) -> Vec<Sample> {
    match find_condition(pod, POD_SCHEDULED_CONDITION) {
        Some(c) if condition_bucket(&c.status) == "true" => {
            timestamp_sample(pod, c.last_transition_time.as_ref())
        }
        _ => Vec::new(),
    }
}

/// Current state of a container, at most one variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ContainerPhase<'a> {
    Running,
    Waiting(Option<&'a str>),
    Terminated(Option<&'a str>),
    Unreported,
}

impl<'a> ContainerPhase<'a> {
    fn of(cs: &'a ContainerStatus) -> Self {
        let Some(state) = cs.state.as_ref() else {
            return ContainerPhase::Unreported;
        };
        if state.running.is_some() {
            ContainerPhase::Running
        } else if let Some(t) = state.terminated.as_ref() {
            ContainerPhase::Terminated(t.reason.as_deref())
        } else if let Some(w) = state.waiting.as_ref() {
            ContainerPhase::Waiting(w.reason.as_deref())
        } else {
            ContainerPhase::Unreported
        }
    }
}

fn per_container_status(pod: &Pod, value: impl Fn(&ContainerStatus) -> f64) -> Vec<Sample> {
    container_statuses(pod)
        .iter()
        .map(|cs| pod_sample(pod, &[("container", cs.name.as_str())], value(cs)))
        .collect()
}

fn container_info_samples(pod: &Pod) -> Vec<Sample> {
    container_statuses(pod)
        .iter()
        .map(|cs| {
            pod_sample(
                pod,
                &[
                    ("container", cs.name.as_str()),
                    ("image", cs.image.as_str()),
                    ("image_id", cs.image_id.as_str()),
                    ("container_id", cs.container_id.as_deref().unwrap_or("")),
                ],
                1.0,
            )
        })
        .collect()
}

/// One sample per (container, reason) pair; 1 only for the container's actual reason
fn reason_samples<'p>(
    pod: &'p Pod,
    reasons: &[&str],
    reason_of: impl Fn(ContainerPhase<'p>) -> Option<&'p str>,
) -> Vec<Sample> {
    container_statuses(pod)
        .iter()
        .flat_map(|cs| {
            let actual = reason_of(ContainerPhase::of(cs));
            reasons.iter().map(move |reason| {
                pod_sample(
                    pod,
                    &[("container", cs.name.as_str()), ("reason", *reason)],
                    bool_value(actual == Some(*reason)),
                )
            })
        })
        .collect()
}

/// Which resource mapping of a container to read
#[derive(Debug, Clone, Copy)]
enum ResourceList {
    Requests,
    Limits,
}

impl ResourceList {
    fn of<'a>(&self, resources: &'a ResourceRequirements) -> Option<&'a BTreeMap<String, Quantity>> {
        match self {
            ResourceList::Requests => resources.requests.as_ref(),
            ResourceList::Limits => resources.limits.as_ref(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            ResourceList::Requests => "requests",
            ResourceList::Limits => "limits",
        }
    }
}

fn resource_list(container: &Container, list: ResourceList) -> Option<&BTreeMap<String, Quantity>> {
    container.resources.as_ref().and_then(|r| list.of(r))
}

fn log_malformed(pod: &Pod, container: &str, list: ResourceList, resource: &str, err: &QuantityError) {
    debug!(
        namespace = %namespace(pod),
        pod = %name(pod),
        container = %container,
        list = list.as_str(),
        resource = %resource,
        error = %err,
        "Skipping malformed resource quantity"
    );
}

/// Dedicated single-resource view (cpu cores, memory bytes)
fn dedicated_resource_samples(
    pod: &Pod,
    list: ResourceList,
    resource: &str,
    convert: fn(&Quantity) -> Result<f64, QuantityError>,
) -> Vec<Sample> {
    let node = node_name(pod);
    containers(pod)
        .iter()
        .filter_map(|c| {
            let quantity = resource_list(c, list)?.get(resource)?;
            match convert(quantity) {
                Ok(value) => Some(pod_sample(pod, &[("container", c.name.as_str()), ("node", node)], value)),
                Err(e) => {
                    log_malformed(pod, &c.name, list, resource, &e);
                    None
                }
            }
        })
        .collect()
}

/// Generic view over every resource a container specifies
fn resource_samples(pod: &Pod, list: ResourceList) -> Vec<Sample> {
    let node = node_name(pod);
    containers(pod)
        .iter()
        .filter_map(|c| resource_list(c, list).map(|resources| (c, resources)))
        .flat_map(|(c, resources)| {
            resources.iter().filter_map(move |(resource, quantity)| {
                let unit = ResourceUnit::classify(resource);
                match unit.convert(quantity) {
                    Ok(value) => Some(pod_sample(
                        pod,
                        &[
                            ("container", c.name.as_str()),
                            ("node", node),
                            ("resource", sanitize_label_key(resource).as_str()),
                            ("unit", unit.as_str()),
                        ],
                        value,
                    )),
                    Err(e) => {
                        log_malformed(pod, &c.name, list, resource, &e);
                        None
                    }
                }
            })
        })
        .collect()
}

fn pvc_samples(pod: &Pod, value: impl Fn(bool) -> f64) -> Vec<Sample> {
    pod.spec
        .as_ref()
        .and_then(|s| s.volumes.as_deref())
        .unwrap_or(&[])
        .iter()
        .filter_map(|v| {
            let claim = v.persistent_volume_claim.as_ref()?;
            Some(pod_sample(
                pod,
                &[
                    ("volume", v.name.as_str()),
                    ("persistentvolumeclaim", claim.claim_name.as_str()),
                ],
                value(claim.read_only.unwrap_or(false)),
            ))
        })
        .collect()
}
