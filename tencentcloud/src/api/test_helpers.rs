//! Test helpers for the TencentCloud API

#[cfg(test)]
pub fn create_test_client(url: &str) -> super::Client {
    use super::{Client, ClientConfig, Credential, RetryConfig};

    let credential = Credential {
        secret_id: "AKIDtest".to_string(),
        secret_key: "secret".to_string(),
        token: None,
    };
    let retry = RetryConfig {
        max_retries: 1,
        initial_backoff_ms: 1,
        max_backoff_ms: 10,
        timeout_seconds: 5,
    };
    Client::with_config(
        ClientConfig::new(credential, "ap-guangzhou").with_endpoint(url),
        retry,
    )
    .unwrap()
}

/// Body of a successful `{"Response": ...}` envelope
#[cfg(test)]
pub fn envelope(response: serde_json::Value) -> String {
    let mut response = response;
    if let Some(object) = response.as_object_mut() {
        object
            .entry("RequestId")
            .or_insert_with(|| serde_json::Value::String("req-test".to_string()));
    }
    serde_json::json!({ "Response": response }).to_string()
}

/// Provider data the way `configure` hands it to resources
#[cfg(test)]
pub fn create_test_provider_data(
    url: &str,
) -> std::sync::Arc<dyn std::any::Any + Send + Sync> {
    std::sync::Arc::new(crate::TencentCloudProviderData::new(create_test_client(url)))
}

/// Object value built from `(name, value)` pairs
#[cfg(test)]
pub fn dynamic_object(fields: Vec<(&str, tfplug::Dynamic)>) -> tfplug::DynamicValue {
    tfplug::DynamicValue::new(tfplug::Dynamic::Map(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    ))
}
