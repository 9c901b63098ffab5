//! Pod listing shapes returned by the Linkerd web API.

use serde::Deserialize;
use serde_json::Value;

/// Body of `/api/pods`. Empty lists may be omitted entirely by the upstream.
#[derive(Debug, Default, Deserialize)]
pub struct PodList {
    #[serde(default)]
    pods: Option<Vec<Value>>,
}

impl PodList {
    pub fn into_pods(self) -> Vec<Value> {
        self.pods.unwrap_or_default()
    }
}

/// Relative path listing the pods of one namespace.
pub fn pods_path(namespace: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(namespace.as_bytes()).collect();
    format!("/api/pods?namespace={}", encoded)
}

/// Filter key matching a pod's `deployment` field.
pub fn deployment_key(namespace: &str, deployment: &str) -> String {
    format!("{}/{}", namespace, deployment)
}

/// Keep pods whose `deployment` equals `key`, preserving upstream order.
pub fn filter_by_deployment(pods: Vec<Value>, key: &str) -> Vec<Value> {
    pods.into_iter()
        .filter(|pod| pod.get("deployment").and_then(Value::as_str) == Some(key))
        .collect()
}
