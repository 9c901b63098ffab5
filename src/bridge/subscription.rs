//! Client subscription message and the upstream tap request it becomes.

use serde::{Deserialize, Serialize};

use crate::bridge::BridgeError;

/// Request id expected by the Linkerd web tap endpoint.
pub const TAP_REQUEST_ID: &str = "top-web";

/// First message a client sends: which deployment to tap.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSubscription {
    pub resource: String,
    pub namespace: String,
}

impl ClientSubscription {
    /// Decode a client frame. Text and binary frames are both accepted.
    pub fn parse(payload: &[u8]) -> Result<Self, BridgeError> {
        let subscription: ClientSubscription = serde_json::from_slice(payload)
            .map_err(|e| BridgeError::MalformedSubscription(e.to_string()))?;

        if subscription.resource.trim().is_empty() {
            return Err(BridgeError::MalformedSubscription(
                "`resource` is empty".to_string(),
            ));
        }
        if subscription.namespace.trim().is_empty() {
            return Err(BridgeError::MalformedSubscription(
                "`namespace` is empty".to_string(),
            ));
        }
        Ok(subscription)
    }
}

/// Subscription frame sent upstream once per session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TapRequest {
    pub id: String,
    pub resource: String,
    pub namespace: String,
    pub max_rps: u32,
}

impl From<&ClientSubscription> for TapRequest {
    fn from(subscription: &ClientSubscription) -> Self {
        Self {
            id: TAP_REQUEST_ID.to_string(),
            resource: format!("deployment/{}", subscription.resource),
            namespace: subscription.namespace.clone(),
            max_rps: 0,
        }
    }
}

impl TapRequest {
    pub fn to_json(&self) -> Result<String, BridgeError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translates_subscription() {
        let subscription = ClientSubscription::parse(br#"{"resource":"foo","namespace":"bar"}"#).unwrap();
        let frame = TapRequest::from(&subscription).to_json().unwrap();
        assert_eq!(
            frame,
            r#"{"id":"top-web","resource":"deployment/foo","namespace":"bar","maxRps":0}"#
        );
    }

    #[test]
    fn test_extra_fields_ignored() {
        let subscription =
            ClientSubscription::parse(br#"{"resource":"foo","namespace":"bar","extra":1}"#).unwrap();
        assert_eq!(subscription.resource, "foo");
    }

    #[test]
    fn test_malformed_messages() {
        for payload in [
            &b"not json"[..],
            br#"{"resource":"foo"}"#,
            br#"{"namespace":"bar"}"#,
            br#"{"resource":1,"namespace":"bar"}"#,
            br#"{"resource":"","namespace":"bar"}"#,
            br#"[]"#,
        ] {
            let err = ClientSubscription::parse(payload).unwrap_err();
            assert!(
                matches!(err, BridgeError::MalformedSubscription(_)),
                "payload {:?} should be malformed",
                String::from_utf8_lossy(payload)
            );
        }
    }
}
