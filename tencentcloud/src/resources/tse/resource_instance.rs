//! TSE registry engine instance resource

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
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, OneOfValidator};

use crate::api::tse::{self, CreateEngineRequest, EngineAdmin, InstanceTagInfo, SreInstance};
use crate::api::Operation;
use crate::logging::LogElapsed;
use crate::resources::common::{
    api_error, extract_provider_data, has_change, immutable_changes, not_configured,
    optional_i64, optional_string, required_i64, required_string, set_opt_bool, set_opt_i64,
    set_opt_string, state_id, string_map,
};

pub const ENGINE_TYPES: &[&str] = &["zookeeper", "nacos", "consul", "apollo", "eureka", "polaris"];

/// Arguments that only take effect at creation time
const IMMUTABLE_ARGS: &[&str] = &[
    "engine_type",
    "engine_version",
    "engine_product_version",
    "engine_region",
    "engine_name",
    "trade_type",
    "engine_resource_spec",
    "engine_node_num",
    "vpc_id",
    "subnet_id",
    "engine_admin",
    "prepaid_period",
    "prepaid_renew_flag",
];

#[derive(Default)]
pub struct TseInstanceResource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

impl TseInstanceResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provides a TSE registry engine instance")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Instance id")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_type", AttributeType::String)
                    .description("Engine type: zookeeper, nacos, consul, apollo, eureka or polaris")
                    .required()
                    .force_new()
                    .validator(Box::new(OneOfValidator::new(ENGINE_TYPES)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_version", AttributeType::String)
                    .description("Engine version, e.g. 3.5.9.4 for zookeeper")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_product_version", AttributeType::String)
                    .description("Product edition: STANDARD or PROFESSIONAL")
                    .required()
                    .validator(Box::new(OneOfValidator::new(&["STANDARD", "PROFESSIONAL"])))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_region", AttributeType::String)
                    .description("Deployment region of the engine")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_name", AttributeType::String)
                    .description("Engine name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("trade_type", AttributeType::Number)
                    .description("Billing mode: 0 postpaid, 1 prepaid")
                    .required()
                    .validator(Box::new(NumberRangeValidator::between(0.0, 1.0)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_resource_spec", AttributeType::String)
                    .description("Node specification id")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("engine_node_num", AttributeType::Number)
                    .description("Number of engine nodes")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("vpc_id", AttributeType::String)
                    .description("VPC the engine is deployed in")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("subnet_id", AttributeType::String)
                    .description("Subnet the engine is deployed in")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("prepaid_period", AttributeType::Number)
                    .description("Prepaid duration in months")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("prepaid_renew_flag", AttributeType::Number)
                    .description("Auto renewal: 0 off, 1 on")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("enable_client_internet_access", AttributeType::Bool)
                    .description("Whether clients may reach the engine over the internet")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Tags of the instance")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Instance status")
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("engine_admin", NestingMode::List)
                    .description("Initial administrator of the engine")
                    .max_items(1)
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .description("Administrator name")
                            .optional()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("password", AttributeType::String)
                            .description("Administrator password")
                            .optional()
                            .sensitive()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("token", AttributeType::String)
                            .description("Administrator token")
                            .optional()
                            .sensitive()
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    fn extract_create_request(config: &DynamicValue) -> Result<CreateEngineRequest, Diagnostic> {
        let engine_admin = config
            .get_first_object(&AttributePath::new("engine_admin"))
            .ok()
            .flatten()
            .map(|admin| EngineAdmin {
                name: optional_string(&admin, "name"),
                password: optional_string(&admin, "password"),
                token: optional_string(&admin, "token"),
            });

        let mut engine_tags: Vec<InstanceTagInfo> = string_map(config, "tags")
            .into_iter()
            .map(|(tag_key, tag_value)| InstanceTagInfo { tag_key, tag_value })
            .collect();
        engine_tags.sort_by(|a, b| a.tag_key.cmp(&b.tag_key));

        Ok(CreateEngineRequest {
            engine_type: required_string(config, "engine_type")?,
            engine_version: required_string(config, "engine_version")?,
            engine_product_version: required_string(config, "engine_product_version")?,
            engine_region: required_string(config, "engine_region")?,
            engine_name: required_string(config, "engine_name")?,
            trade_type: required_i64(config, "trade_type")?,
            engine_resource_spec: optional_string(config, "engine_resource_spec"),
            engine_node_num: optional_i64(config, "engine_node_num"),
            vpc_id: optional_string(config, "vpc_id"),
            subnet_id: optional_string(config, "subnet_id"),
            engine_admin,
            prepaid_period: optional_i64(config, "prepaid_period"),
            prepaid_renew_flag: optional_i64(config, "prepaid_renew_flag"),
            engine_tags,
        })
    }

    /// Copy what the API reports onto `state`
    fn apply_instance(state: &mut DynamicValue, instance: SreInstance, tags: HashMap<String, String>) {
        let _ = state.set_string(&AttributePath::new("id"), instance.instance_id);
        set_opt_string(state, "engine_type", instance.engine_type);
        set_opt_string(state, "engine_version", instance.version);
        set_opt_string(state, "engine_product_version", instance.edition);
        set_opt_string(state, "engine_region", instance.engine_region);
        set_opt_string(state, "engine_name", instance.name);
        set_opt_i64(state, "trade_type", instance.trade_type);
        set_opt_string(state, "engine_resource_spec", instance.spec_id);
        set_opt_i64(state, "engine_node_num", instance.replica);
        set_opt_string(state, "vpc_id", instance.vpc_id);
        set_opt_string(state, "subnet_id", instance.subnet_ids.into_iter().next());
        set_opt_bool(state, "enable_client_internet_access", instance.enable_internet);
        set_opt_string(state, "status", instance.status);
        if !tags.is_empty() || state.get(&AttributePath::new("tags")).is_some() {
            let _ = state.set_string_map(&AttributePath::new("tags"), &tags);
        }
    }

    /// Describe the instance and its tags; `Ok(None)` when it is gone
    async fn read_instance(
        provider_data: &crate::TencentCloudProviderData,
        instance_id: &str,
        mut state: DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let instance = provider_data
            .client
            .tse()
            .describe_instance(instance_id)
            .await
            .map_err(|e| api_error("Failed to read TSE instance", e))?;
        let Some(instance) = instance else {
            return Ok(None);
        };

        let tags = provider_data
            .client
            .tag()
            .describe_tags(tse::SERVICE, tse::INSTANCE_RESOURCE_TYPE, instance_id)
            .await
            .map_err(|e| api_error("Failed to read TSE instance tags", e))?;

        Self::apply_instance(&mut state, instance, tags);
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for TseInstanceResource {
    fn type_name(&self) -> &str {
        "tencentcloud_tse_instance"
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

        // prepaid arguments are meaningless on a postpaid engine
        let trade_type = request.config.get_i64(&AttributePath::new("trade_type")).ok();
        if trade_type == Some(0) && optional_i64(&request.config, "prepaid_period").is_some() {
            diagnostics.push(
                Diagnostic::error(
                    "Invalid prepaid_period",
                    "prepaid_period can only be set when trade_type is 1 (prepaid)",
                )
                .with_attribute(AttributePath::new("prepaid_period")),
            );
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_instance.create");
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
        let instance_id = match api.create_engine(&create_request).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "create tse instance failed: {}", e);
                diagnostics.push(api_error("Failed to create TSE instance", e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), instance_id.clone());

        if let Err(e) = converge(
            &ctx,
            &instance_id,
            &tse::instance_spec(Operation::Create),
            move |id| async move { api.instance_status(&id).await },
        )
        .await
        {
            diagnostics.push(Diagnostic::error(
                "TSE instance did not become ready",
                e.to_string(),
            ));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        match Self::read_instance(provider_data, &instance_id, new_state.clone()).await {
            Ok(Some(state)) => new_state = state,
            Ok(None) => diagnostics.push(Diagnostic::error(
                "TSE instance disappeared",
                format!("Instance {} was not found right after creation", instance_id),
            )),
            Err(diag) => diagnostics.push(diag),
        }

        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_instance.read");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let instance_id = match state_id(&request.current_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match Self::read_instance(provider_data, &instance_id, request.current_state.clone()).await
        {
            Ok(Some(state)) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
            },
            Ok(None) => {
                tracing::warn!(
                    log_id = ctx.log_id(),
                    "resource `TseInstance` [{}] not found, please check if it has been deleted",
                    instance_id
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_instance.update");
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

        let instance_id = match state_id(&request.prior_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        let api = provider_data.client.tse();

        if has_change(
            &request.prior_state,
            &request.planned_state,
            "enable_client_internet_access",
        ) {
            let engine_type = optional_string(&request.planned_state, "engine_type").unwrap_or_default();
            let enable = request
                .planned_state
                .get_bool(&AttributePath::new("enable_client_internet_access"))
                .unwrap_or(false);

            if let Err(e) = api
                .update_engine_internet_access(&instance_id, &engine_type, enable)
                .await
            {
                tracing::error!(log_id = ctx.log_id(), "update tse instance failed: {}", e);
                diagnostics.push(api_error("Failed to update TSE instance", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }

            if let Err(e) = converge(
                &ctx,
                &instance_id,
                &tse::instance_spec(Operation::Update),
                move |id| async move { api.instance_status(&id).await },
            )
            .await
            {
                diagnostics.push(Diagnostic::error(
                    "TSE instance did not become ready",
                    e.to_string(),
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        if has_change(&request.prior_state, &request.planned_state, "tags") {
            let old = string_map(&request.prior_state, "tags");
            let new = string_map(&request.planned_state, "tags");
            if let Err(e) = provider_data
                .client
                .tag()
                .modify_tags(tse::SERVICE, tse::INSTANCE_RESOURCE_TYPE, &instance_id, &old, &new)
                .await
            {
                diagnostics.push(api_error("Failed to update TSE instance tags", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let new_state =
            match Self::read_instance(provider_data, &instance_id, request.planned_state.clone()).await
            {
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_instance.delete");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Ok(instance_id) = state_id(&request.prior_state) else {
            return DeleteResourceResponse { diagnostics };
        };

        let api = provider_data.client.tse();
        match api.delete_engine(&instance_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                tracing::warn!(log_id = ctx.log_id(), "tse instance {} already deleted", instance_id);
                return DeleteResourceResponse { diagnostics };
            }
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "delete tse instance failed: {}", e);
                diagnostics.push(api_error("Failed to delete TSE instance", e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        if let Err(e) = converge(
            &ctx,
            &instance_id,
            &tse::instance_spec(Operation::Delete),
            move |id| async move { api.instance_status(&id).await },
        )
        .await
        {
            diagnostics.push(Diagnostic::error(
                "TSE instance was not deleted",
                e.to_string(),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for TseInstanceResource {
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
impl ResourceWithImportState for TseInstanceResource {
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
#[path = "./resource_instance_test.rs"]
mod resource_instance_test;
