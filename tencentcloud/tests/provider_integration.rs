use mockito::{Matcher, Server};
use serde_json::json;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tencentcloud::TencentCloudProvider;
use tfplug::data_source::{ConfigureDataSourceRequest, ReadDataSourceRequest};
use tfplug::provider::ConfigureProviderRequest;
use tfplug::resource::{ConfigureResourceRequest, CreateResourceRequest, DeleteResourceRequest};
use tfplug::types::ClientCapabilities;
use tfplug::{
    AttributePath, Context, DataSource, DataSourceWithConfigure, Dynamic, DynamicValue, Provider,
    Resource, ResourceWithConfigure,
};

fn envelope(response: serde_json::Value) -> String {
    let mut response = response;
    if let Some(object) = response.as_object_mut() {
        object.insert("RequestId".to_string(), json!("req-integration"));
    }
    json!({ "Response": response }).to_string()
}

fn object(fields: Vec<(&str, Dynamic)>) -> DynamicValue {
    DynamicValue::new(Dynamic::Map(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    ))
}

fn address(status: &str) -> serde_json::Value {
    json!({
        "AddressId": "eip-9",
        "AddressName": "edge",
        "AddressStatus": status,
        "AddressIp": "9.9.9.9",
        "AddressType": "EIP",
        "InternetChargeType": "TRAFFIC_POSTPAID_BY_HOUR",
        "Bandwidth": 1
    })
}

async fn configure_provider(
    provider: &mut TencentCloudProvider,
    url: &str,
) -> Arc<dyn Any + Send + Sync> {
    let response = provider
        .configure(
            Context::new(),
            ConfigureProviderRequest {
                terraform_version: "1.9.0".to_string(),
                config: object(vec![
                    ("secret_id", Dynamic::from("AKIDintegration")),
                    ("secret_key", Dynamic::from("integration-secret")),
                    ("region", Dynamic::from("ap-guangzhou")),
                    ("endpoint", Dynamic::from(url)),
                ]),
                client_capabilities: ClientCapabilities {
                    deferral_allowed: false,
                    write_only_attributes_allowed: false,
                },
            },
        )
        .await;
    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    response.provider_data.expect("provider data")
}

#[tokio::test(flavor = "multi_thread")]
async fn eip_lifecycle_through_provider_factories() {
    let mut server = Server::new_async().await;
    let allocate = server
        .mock("POST", "/")
        .match_header("x-tc-action", "AllocateAddresses")
        .match_header("x-tc-region", "ap-guangzhou")
        .match_header(
            "authorization",
            Matcher::Regex(r"^TC3-HMAC-SHA256 Credential=AKIDintegration/".to_string()),
        )
        .with_status(200)
        .with_body(envelope(json!({"AddressSet": ["eip-9"]})))
        .expect(1)
        .create_async()
        .await;
    let describe = server
        .mock("POST", "/")
        .match_header("x-tc-action", "DescribeAddresses")
        .with_status(200)
        .with_body(envelope(json!({"TotalCount": 1, "AddressSet": [address("UNBIND")]})))
        .create_async()
        .await;

    let mut provider = TencentCloudProvider::new();
    let provider_data = configure_provider(&mut provider, &server.url()).await;

    let resources = provider.resources();
    let mut eip = resources["tencentcloud_eip"]();
    let configured = eip
        .configure(
            Context::new(),
            ConfigureResourceRequest {
                provider_data: Some(provider_data),
            },
        )
        .await;
    assert!(configured.diagnostics.is_empty());

    let config = object(vec![("name", Dynamic::from("edge"))]);
    let created = eip
        .create(
            Context::new(),
            CreateResourceRequest {
                type_name: "tencentcloud_eip".to_string(),
                planned_state: config.clone(),
                config,
            },
        )
        .await;
    assert!(created.diagnostics.is_empty(), "{:?}", created.diagnostics);
    allocate.assert_async().await;
    assert_eq!(
        created.new_state.get_string(&AttributePath::new("id")).unwrap(),
        "eip-9"
    );
    assert_eq!(
        created.new_state.get_string(&AttributePath::new("public_ip")).unwrap(),
        "9.9.9.9"
    );

    describe.remove_async().await;
    let _gone = server
        .mock("POST", "/")
        .match_header("x-tc-action", "DescribeAddresses")
        .with_status(200)
        .with_body(envelope(json!({"TotalCount": 0, "AddressSet": []})))
        .create_async()
        .await;
    let release = server
        .mock("POST", "/")
        .match_header("x-tc-action", "ReleaseAddresses")
        .match_body(Matcher::Json(json!({"AddressIds": ["eip-9"]})))
        .with_status(200)
        .with_body(envelope(json!({"TaskId": "1"})))
        .expect(1)
        .create_async()
        .await;

    let deleted = eip
        .delete(
            Context::new(),
            DeleteResourceRequest {
                type_name: "tencentcloud_eip".to_string(),
                prior_state: created.new_state,
            },
        )
        .await;
    assert!(deleted.diagnostics.is_empty(), "{:?}", deleted.diagnostics);
    release.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn eips_data_source_through_provider_factories() {
    let mut server = Server::new_async().await;
    let _describe = server
        .mock("POST", "/")
        .match_header("x-tc-action", "DescribeAddresses")
        .with_status(200)
        .with_body(envelope(json!({"TotalCount": 1, "AddressSet": [address("BIND")]})))
        .create_async()
        .await;

    let mut provider = TencentCloudProvider::new();
    let provider_data = configure_provider(&mut provider, &server.url()).await;

    let data_sources = provider.data_sources();
    let mut eips = data_sources["tencentcloud_eips"]();
    eips.configure(
        Context::new(),
        ConfigureDataSourceRequest {
            provider_data: Some(provider_data),
        },
    )
    .await;

    let response = eips
        .read(
            Context::new(),
            ReadDataSourceRequest {
                type_name: "tencentcloud_eips".to_string(),
                config: object(vec![]),
            },
        )
        .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let list = response
        .state
        .get_object_list(&AttributePath::new("eip_list"))
        .unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].get_string(&AttributePath::new("status")).unwrap(), "BIND");
    assert_eq!(
        response.state.get_string(&AttributePath::new("id")).unwrap().len(),
        16
    );
}
