//! Process-wide identity attached to outbound calls.
//!
//! Built once at startup and read-only afterwards. In Kubernetes the
//! namespace is read from the serviceaccount mount and the service name can
//! be derived from the pod name when not set explicitly.

use std::env;
use std::fs;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const NAMESPACE_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/namespace";

/// Namespace of the running pod, empty outside Kubernetes. Read once.
static K8S_NAMESPACE: Lazy<String> = Lazy::new(|| {
    if env::var_os("KUBERNETES_SERVICE_HOST").is_none() {
        return String::new();
    }
    fs::read_to_string(NAMESPACE_FILE)
        .map(|s| s.trim().to_string())
        .unwrap_or_default()
});

/// Read-only descriptor of the running process, used by outbound-call paths
/// to self-identify to the remote service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub service_name: String,
    pub service_instance: String,
    pub namespace: String,
}

impl ServerInfo {
    /// Build an identity from explicit values, picking up the Kubernetes
    /// namespace when running in a cluster.
    pub fn new(service_name: impl Into<String>, service_instance: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_instance: service_instance.into(),
            namespace: K8S_NAMESPACE.clone(),
        }
    }

    /// Discover the identity from the pod environment.
    ///
    /// The instance is the pod name (`MY_POD_NAME` via the Downward API,
    /// falling back to `HOSTNAME`). The service name comes from
    /// `MY_SERVICE_NAME` or, when unset, is guessed from the pod name.
    pub fn from_k8s_env() -> Self {
        let pod_name = env::var("MY_POD_NAME")
            .or_else(|_| env::var("HOSTNAME"))
            .unwrap_or_else(|_| "unknown".to_string());

        let service_name = match env::var("MY_SERVICE_NAME") {
            Ok(name) if !name.is_empty() => name,
            _ => guess_service_name(&pod_name),
        };

        Self {
            service_name,
            service_instance: pod_name,
            namespace: K8S_NAMESPACE.clone(),
        }
    }
}

/// Derive a service name from a pod name.
///
/// StatefulSet pods end in an ordinal (`web-0` → `web`); Deployment and Job
/// pods carry a replicaset hash plus a pod suffix (`api-7d9f8b6c5-x2x4z` →
/// `api`). Anything else is returned unchanged.
pub fn guess_service_name(pod_name: &str) -> String {
    if pod_name == "unknown" {
        return pod_name.to_string();
    }
    let segments: Vec<&str> = pod_name.split('-').collect();
    let Some(last) = segments.last() else {
        return pod_name.to_string();
    };

    if let Ok(ordinal) = last.parse::<i32>() {
        if (0..99).contains(&ordinal) {
            if let Some(idx) = pod_name.rfind('-') {
                return pod_name[..idx].to_string();
            }
        }
    }

    if segments.len() > 2 {
        // Strip the pod suffix, then the replicaset hash.
        let without_pod = &pod_name[..pod_name.rfind('-').unwrap_or(pod_name.len())];
        if let Some(idx) = without_pod.rfind('-') {
            return without_pod[..idx].to_string();
        }
    }

    pod_name.to_string()
}
