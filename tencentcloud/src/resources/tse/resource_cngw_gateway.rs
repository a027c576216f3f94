//! TSE cloud native API gateway resource

use async_trait::async_trait;
use std::collections::HashMap;
use tfplug::context::Context;
use tfplug::converge;
use tfplug::import::import_state_passthrough_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    UpdateResourceRequest, UpdateResourceResponse, ValidateResourceConfigRequest,
    ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, OneOfValidator};

use super::{extract_node_config, node_config_block, node_config_value};
use crate::api::tse::{self, CreateGatewayRequest, Gateway, ModifyGatewayRequest, VpcConfig};
use crate::api::Operation;
use crate::logging::LogElapsed;
use crate::resources::common::{
    api_error, extract_provider_data, has_change, immutable_changes, not_configured,
    optional_bool, optional_i64, optional_string, required_string, set_opt_bool, set_opt_i64,
    set_opt_string, single_block, state_id, string_map,
};

const IMMUTABLE_ARGS: &[&str] = &[
    "type",
    "gateway_version",
    "node_config",
    "vpc_config",
    "feature_version",
    "internet_max_bandwidth_out",
    "engine_region",
    "ingress_class_name",
    "trade_type",
];

#[derive(Default)]
pub struct TseCngwGatewayResource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

impl TseCngwGatewayResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provides a TSE cloud native API gateway")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Gateway id")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Gateway name, at most 60 characters")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Gateway type, only kong is supported")
                    .required()
                    .validator(Box::new(OneOfValidator::new(&["kong"])))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("gateway_version", AttributeType::String)
                    .description("Gateway version: 2.4.1 or 2.5.1")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Gateway description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enable_cls", AttributeType::Bool)
                    .description("Whether to ship logs to CLS")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("feature_version", AttributeType::String)
                    .description("Product edition: TRIAL or STANDARD")
                    .optional()
                    .computed()
                    .validator(Box::new(OneOfValidator::new(&["TRIAL", "STANDARD"])))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("internet_max_bandwidth_out", AttributeType::Number)
                    .description("Public network outbound bandwidth")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_region", AttributeType::String)
                    .description("Region the gateway is deployed in")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("ingress_class_name", AttributeType::String)
                    .description("Ingress class name")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("trade_type", AttributeType::Number)
                    .description("Billing mode: 0 postpaid, 1 prepaid")
                    .optional()
                    .computed()
                    .validator(Box::new(NumberRangeValidator::between(0.0, 1.0)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Tags of the gateway")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Gateway status")
                    .computed()
                    .build(),
            )
            .block(node_config_block())
            .block(
                NestedBlockBuilder::new("vpc_config", NestingMode::List)
                    .description("Network the gateway is deployed in")
                    .min_items(1)
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("vpc_id", AttributeType::String)
                            .description("VPC id")
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("subnet_id", AttributeType::String)
                            .description("Subnet id")
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    fn extract_create_request(config: &DynamicValue) -> Result<CreateGatewayRequest, Diagnostic> {
        let vpc = config
            .get_first_object(&AttributePath::new("vpc_config"))
            .ok()
            .flatten()
            .ok_or_else(|| {
                Diagnostic::error("Missing vpc_config", "A vpc_config block is required")
                    .with_attribute(AttributePath::new("vpc_config"))
            })?;

        Ok(CreateGatewayRequest {
            name: required_string(config, "name")?,
            gateway_type: required_string(config, "type")?,
            gateway_version: required_string(config, "gateway_version")?,
            node_config: extract_node_config(config)?,
            vpc_config: VpcConfig {
                vpc_id: required_string(&vpc, "vpc_id")?,
                subnet_id: required_string(&vpc, "subnet_id")?,
            },
            description: optional_string(config, "description"),
            enable_cls: optional_bool(config, "enable_cls"),
            feature_version: optional_string(config, "feature_version"),
            internet_max_bandwidth_out: optional_i64(config, "internet_max_bandwidth_out")
                .map(|v| v.max(0) as u64),
            engine_region: optional_string(config, "engine_region"),
            ingress_class_name: optional_string(config, "ingress_class_name"),
            trade_type: optional_i64(config, "trade_type"),
        })
    }

    fn apply_gateway(state: &mut DynamicValue, gateway: Gateway, tags: HashMap<String, String>) {
        let _ = state.set_string(&AttributePath::new("id"), gateway.gateway_id);
        set_opt_string(state, "name", gateway.name);
        set_opt_string(state, "type", gateway.gateway_type);
        set_opt_string(state, "gateway_version", gateway.gateway_version);
        set_opt_string(state, "description", gateway.description);
        set_opt_bool(state, "enable_cls", gateway.enable_cls);
        set_opt_string(state, "feature_version", gateway.feature_version);
        set_opt_i64(
            state,
            "internet_max_bandwidth_out",
            gateway.internet_max_bandwidth_out.map(|v| v as i64),
        );
        set_opt_string(state, "engine_region", gateway.engine_region);
        set_opt_string(state, "ingress_class_name", gateway.ingress_class_name);
        set_opt_i64(state, "trade_type", gateway.trade_type);
        set_opt_string(state, "status", gateway.status);
        if let Some(node_config) = gateway.node_config {
            let _ = state.set_list(&AttributePath::new("node_config"), node_config_value(&node_config));
        }
        if let Some(vpc) = gateway.vpc_config {
            let _ = state.set_list(
                &AttributePath::new("vpc_config"),
                single_block(vec![
                    ("vpc_id", Dynamic::from(vpc.vpc_id)),
                    ("subnet_id", Dynamic::from(vpc.subnet_id)),
                ]),
            );
        }
        if !tags.is_empty() || state.get(&AttributePath::new("tags")).is_some() {
            let _ = state.set_string_map(&AttributePath::new("tags"), &tags);
        }
    }

    async fn read_gateway(
        provider_data: &crate::TencentCloudProviderData,
        gateway_id: &str,
        mut state: DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let gateway = provider_data
            .client
            .tse()
            .describe_gateway(gateway_id)
            .await
            .map_err(|e| api_error("Failed to read TSE gateway", e))?;
        let Some(gateway) = gateway else {
            return Ok(None);
        };

        let tags = provider_data
            .client
            .tag()
            .describe_tags(tse::SERVICE, tse::GATEWAY_RESOURCE_TYPE, gateway_id)
            .await
            .map_err(|e| api_error("Failed to read TSE gateway tags", e))?;

        Self::apply_gateway(&mut state, gateway, tags);
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for TseCngwGatewayResource {
    fn type_name(&self) -> &str {
        "tencentcloud_tse_cngw_gateway"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ResourceMetadataRequest,
    ) -> ResourceMetadataResponse {
        ResourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ResourceSchemaRequest,
    ) -> ResourceSchemaResponse {
        ResourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateResourceConfigRequest,
    ) -> ValidateResourceConfigResponse {
        let mut diagnostics = Self::schema_static().validate(&request.config);

        if let Some(name) = optional_string(&request.config, "name") {
            if name.chars().count() > 60 {
                diagnostics.push(
                    Diagnostic::error("Invalid name", "name must be at most 60 characters")
                        .with_attribute(AttributePath::new("name")),
                );
            }
        }

        if let Ok(Some(node_config)) = request
            .config
            .get_first_object(&AttributePath::new("node_config"))
        {
            if matches!(optional_i64(&node_config, "number"), Some(n) if n < 2) {
                diagnostics.push(
                    Diagnostic::error("Invalid node_config", "node_config.number must be at least 2")
                        .with_attribute(AttributePath::new("node_config")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_cngw_gateway.create");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let create_request = match Self::extract_create_request(&request.config) {
            Ok(r) => r,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let api = provider_data.client.tse();
        let gateway_id = match api.create_gateway(&create_request).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "create tse cngw gateway failed: {}", e);
                diagnostics.push(api_error("Failed to create TSE gateway", e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), gateway_id.clone());

        if let Err(e) = converge(
            &ctx,
            &gateway_id,
            &tse::gateway_spec(Operation::Create),
            move |id| async move { api.gateway_status(&id).await },
        )
        .await
        {
            diagnostics.push(Diagnostic::error("TSE gateway did not become ready", e.to_string()));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        let tags = string_map(&request.config, "tags");
        if let Err(e) = provider_data
            .client
            .tag()
            .modify_tags(tse::SERVICE, tse::GATEWAY_RESOURCE_TYPE, &gateway_id, &HashMap::new(), &tags)
            .await
        {
            diagnostics.push(api_error("Failed to tag TSE gateway", e));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        match Self::read_gateway(provider_data, &gateway_id, new_state.clone()).await {
            Ok(Some(state)) => new_state = state,
            Ok(None) => diagnostics.push(Diagnostic::error(
                "TSE gateway disappeared",
                format!("Gateway {} was not found right after creation", gateway_id),
            )),
            Err(diag) => diagnostics.push(diag),
        }

        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_cngw_gateway.read");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let gateway_id = match state_id(&request.current_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match Self::read_gateway(provider_data, &gateway_id, request.current_state.clone()).await {
            Ok(Some(state)) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
            },
            Ok(None) => {
                tracing::warn!(
                    log_id = ctx.log_id(),
                    "resource `TseCngwGateway` [{}] not found, please check if it has been deleted",
                    gateway_id
                );
                ReadResourceResponse {
                    new_state: None,
                    diagnostics,
                }
            }
            Err(diag) => {
                diagnostics.push(diag);
                ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, ctx: Context, request: UpdateResourceRequest) -> UpdateResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_cngw_gateway.update");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        diagnostics.extend(immutable_changes(
            &request.prior_state,
            &request.planned_state,
            IMMUTABLE_ARGS,
        ));
        if !diagnostics.is_empty() {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        }

        let gateway_id = match state_id(&request.prior_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let prior = &request.prior_state;
        let planned = &request.planned_state;
        let mut modify = ModifyGatewayRequest {
            gateway_id: gateway_id.clone(),
            ..Default::default()
        };
        if has_change(prior, planned, "name") {
            modify.name = optional_string(planned, "name");
        }
        if has_change(prior, planned, "description") {
            modify.description = optional_string(planned, "description");
        }
        if has_change(prior, planned, "enable_cls") {
            modify.enable_cls = optional_bool(planned, "enable_cls");
        }

        let api = provider_data.client.tse();
        if modify.name.is_some() || modify.description.is_some() || modify.enable_cls.is_some() {
            if let Err(e) = api.modify_gateway(&modify).await {
                tracing::error!(log_id = ctx.log_id(), "update tse cngw gateway failed: {}", e);
                diagnostics.push(api_error("Failed to update TSE gateway", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }

            if let Err(e) = converge(
                &ctx,
                &gateway_id,
                &tse::gateway_spec(Operation::Update),
                move |id| async move { api.gateway_status(&id).await },
            )
            .await
            {
                diagnostics.push(Diagnostic::error("TSE gateway did not become ready", e.to_string()));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        if has_change(prior, planned, "tags") {
            let old = string_map(prior, "tags");
            let new = string_map(planned, "tags");
            if let Err(e) = provider_data
                .client
                .tag()
                .modify_tags(tse::SERVICE, tse::GATEWAY_RESOURCE_TYPE, &gateway_id, &old, &new)
                .await
            {
                diagnostics.push(api_error("Failed to update TSE gateway tags", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let new_state =
            match Self::read_gateway(provider_data, &gateway_id, request.planned_state.clone()).await {
                Ok(Some(state)) => state,
                Ok(None) => request.planned_state,
                Err(diag) => {
                    diagnostics.push(diag);
                    request.planned_state
                }
            };

        UpdateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn delete(&self, ctx: Context, request: DeleteResourceRequest) -> DeleteResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_cngw_gateway.delete");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Ok(gateway_id) = state_id(&request.prior_state) else {
            return DeleteResourceResponse { diagnostics };
        };

        let api = provider_data.client.tse();
        if let Err(e) = api.delete_gateway(&gateway_id).await {
            tracing::error!(log_id = ctx.log_id(), "delete tse cngw gateway failed: {}", e);
            diagnostics.push(api_error("Failed to delete TSE gateway", e));
            return DeleteResourceResponse { diagnostics };
        }

        if let Err(e) = converge(
            &ctx,
            &gateway_id,
            &tse::gateway_spec(Operation::Delete),
            move |id| async move { api.gateway_status(&id).await },
        )
        .await
        {
            diagnostics.push(Diagnostic::error("TSE gateway was not deleted", e.to_string()));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for TseCngwGatewayResource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureResourceRequest,
    ) -> ConfigureResourceResponse {
        let mut diagnostics = vec![];
        self.provider_data = extract_provider_data(request.provider_data, "resource", &mut diagnostics);
        ConfigureResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithImportState for TseCngwGatewayResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_id(&ctx, AttributePath::new("id"), &request, &mut response);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_provider_data, dynamic_object, envelope};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn gateway_config() -> DynamicValue {
        dynamic_object(vec![
            ("name", Dynamic::from("test")),
            ("type", Dynamic::from("kong")),
            ("gateway_version", Dynamic::from("2.5.1")),
            ("description", Dynamic::from("for terraform test")),
            ("enable_cls", Dynamic::from(true)),
            ("feature_version", Dynamic::from("STANDARD")),
            ("engine_region", Dynamic::from("ap-guangzhou")),
            (
                "node_config",
                Dynamic::List(single_block(vec![
                    ("specification", Dynamic::from("1c2g")),
                    ("number", Dynamic::from(2i64)),
                ])),
            ),
            (
                "vpc_config",
                Dynamic::List(single_block(vec![
                    ("vpc_id", Dynamic::from("vpc-1")),
                    ("subnet_id", Dynamic::from("subnet-1")),
                ])),
            ),
        ])
    }

    fn running_gateway(name: &str) -> String {
        envelope(json!({"Result": {
            "GatewayId": "gateway-1",
            "Status": "Running",
            "Name": name,
            "Type": "kong",
            "GatewayVersion": "2.5.1",
            "NodeConfig": {"Specification": "1c2g", "Number": 2},
            "VpcConfig": {"VpcId": "vpc-1", "SubnetId": "subnet-1"},
            "Description": "for terraform test",
            "EnableCls": true,
            "FeatureVersion": "STANDARD",
            "EngineRegion": "ap-guangzhou",
            "TradeType": 0
        }}))
    }

    async fn configured(url: &str) -> TseCngwGatewayResource {
        let mut resource = TseCngwGatewayResource::new();
        resource
            .configure(
                Context::new(),
                ConfigureResourceRequest {
                    provider_data: Some(create_test_provider_data(url)),
                },
            )
            .await;
        resource
    }

    #[tokio::test]
    async fn schema_requires_node_and_vpc_config() {
        let resource = TseCngwGatewayResource::new();
        let response = resource.schema(Context::new(), ResourceSchemaRequest).await;

        let blocks = &response.schema.block.block_types;
        assert!(blocks
            .iter()
            .all(|b| b.min_items == 1 && b.max_items == 1));
        assert!(blocks.iter().any(|b| b.type_name == "node_config"));
        assert!(blocks.iter().any(|b| b.type_name == "vpc_config"));
    }

    #[tokio::test]
    async fn validate_rejects_single_node() {
        let resource = TseCngwGatewayResource::new();
        let mut config = gateway_config();
        config
            .set_list(
                &AttributePath::new("node_config"),
                single_block(vec![
                    ("specification", Dynamic::from("1c2g")),
                    ("number", Dynamic::from(1i64)),
                ]),
            )
            .unwrap();

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "tencentcloud_tse_cngw_gateway".to_string(),
                    config,
                },
            )
            .await;
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid node_config");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_converges_and_reads_nested_blocks() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/")
            .match_header("x-tc-action", "CreateCloudNativeAPIGateway")
            .match_body(Matcher::PartialJson(json!({
                "Name": "test",
                "Type": "kong",
                "NodeConfig": {"Specification": "1c2g", "Number": 2},
                "VpcConfig": {"VpcId": "vpc-1", "SubnetId": "subnet-1"}
            })))
            .with_status(200)
            .with_body(envelope(json!({"Result": {"GatewayId": "gateway-1"}})))
            .create_async()
            .await;
        let _describe = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeCloudNativeAPIGateway")
            .with_status(200)
            .with_body(running_gateway("test"))
            .create_async()
            .await;
        let _tags = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeResourceTagsByResourceIds")
            .with_status(200)
            .with_body(envelope(json!({"Tags": []})))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "tencentcloud_tse_cngw_gateway".to_string(),
                    planned_state: gateway_config(),
                    config: gateway_config(),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        create.assert_async().await;
        let state = response.new_state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "gateway-1");
        assert_eq!(state.get_string(&AttributePath::new("status")).unwrap(), "Running");
        let node = state
            .get_first_object(&AttributePath::new("node_config"))
            .unwrap()
            .unwrap();
        assert_eq!(node.get_i64(&AttributePath::new("number")).unwrap(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_sends_only_changed_fields() {
        let mut server = Server::new_async().await;
        let modify = server
            .mock("POST", "/")
            .match_header("x-tc-action", "ModifyCloudNativeAPIGateway")
            .match_body(Matcher::Json(json!({"GatewayId": "gateway-1", "Name": "renamed"})))
            .with_status(200)
            .with_body(envelope(json!({})))
            .create_async()
            .await;
        let _describe = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeCloudNativeAPIGateway")
            .with_status(200)
            .with_body(running_gateway("renamed"))
            .create_async()
            .await;
        let _tags = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeResourceTagsByResourceIds")
            .with_status(200)
            .with_body(envelope(json!({"Tags": []})))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let mut prior = gateway_config();
        prior
            .set_string(&AttributePath::new("id"), "gateway-1".to_string())
            .unwrap();
        let mut planned = prior.clone();
        planned
            .set_string(&AttributePath::new("name"), "renamed".to_string())
            .unwrap();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "tencentcloud_tse_cngw_gateway".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        modify.assert_async().await;
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("name")).unwrap(),
            "renamed"
        );
    }

    #[tokio::test]
    async fn update_rejects_node_config_change() {
        let mut resource = TseCngwGatewayResource::new();
        resource.provider_data = Some(crate::TencentCloudProviderData::new(
            crate::api::test_helpers::create_test_client("http://127.0.0.1:1"),
        ));
        let prior = gateway_config();
        let mut planned = prior.clone();
        planned
            .set_list(
                &AttributePath::new("node_config"),
                single_block(vec![
                    ("specification", Dynamic::from("2c4g")),
                    ("number", Dynamic::from(2i64)),
                ]),
            )
            .unwrap();

        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "tencentcloud_tse_cngw_gateway".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert_eq!(
            response.diagnostics[0].summary,
            "argument `node_config` cannot be changed"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_treats_missing_gateway_as_done() {
        let mut server = Server::new_async().await;
        let _delete = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DeleteCloudNativeAPIGateway")
            .with_status(200)
            .with_body(envelope(json!({
                "Error": {"Code": "ResourceNotFound.InstanceNotFound", "Message": "gone"}
            })))
            .create_async()
            .await;
        let _describe = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeCloudNativeAPIGateway")
            .with_status(200)
            .with_body(envelope(json!({
                "Error": {"Code": "ResourceNotFound.InstanceNotFound", "Message": "gone"}
            })))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "tencentcloud_tse_cngw_gateway".to_string(),
                    prior_state: dynamic_object(vec![("id", Dynamic::from("gateway-1"))]),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    }
}
