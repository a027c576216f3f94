//! TSE gateway group resource, addressed as `gatewayId#groupId`

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::converge;
use tfplug::import::import_state_composite_id;
use tfplug::resource::{
    ConfigureResourceRequest, ConfigureResourceResponse, CreateResourceRequest,
    CreateResourceResponse, DeleteResourceRequest, DeleteResourceResponse,
    ImportResourceStateRequest, ImportResourceStateResponse, ReadResourceRequest,
    ReadResourceResponse, Resource, ResourceMetadataRequest, ResourceMetadataResponse,
    ResourceSchemaRequest, ResourceSchemaResponse, ResourceWithConfigure, ResourceWithImportState,
    UpdateResourceRequest, UpdateResourceResponse, ValidateResourceConfigRequest,
    ValidateResourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::ResourceHandle;

use super::{extract_node_config, node_config_block, node_config_value};
use crate::api::tse::{self, CreateGroupRequest, GatewayGroup, ModifyGroupRequest};
use crate::api::Operation;
use crate::logging::LogElapsed;
use crate::resources::common::{
    api_error, extract_provider_data, has_change, immutable_changes, not_configured,
    optional_i64, optional_string, required_string, set_opt_i64, set_opt_string, state_id,
};

const IMMUTABLE_ARGS: &[&str] = &[
    "gateway_id",
    "node_config",
    "subnet_id",
    "internet_max_bandwidth_out",
];

#[derive(Default)]
pub struct TseCngwGroupResource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

impl TseCngwGroupResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provides a node group of a TSE cloud native API gateway")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Composite id, gatewayId#groupId")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("gateway_id", AttributeType::String)
                    .description("Gateway the group belongs to")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Group name")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Group description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("subnet_id", AttributeType::String)
                    .description("Subnet the group nodes live in")
                    .optional()
                    .computed()
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
                AttributeBuilder::new("group_id", AttributeType::String)
                    .description("Group id")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Group status")
                    .computed()
                    .build(),
            )
            .block(node_config_block())
            .build()
    }

    /// Parses the state id into (handle, gateway_id, group_id)
    fn handle(state: &DynamicValue) -> Result<(String, String, String), Diagnostic> {
        let id = state_id(state)?;
        let handle = ResourceHandle::parse(&id, 2)
            .map_err(|e| Diagnostic::error("Invalid resource id", e.to_string()))?;
        match handle.parts() {
            [gateway_id, group_id] => {
                Ok((handle.to_string(), gateway_id.clone(), group_id.clone()))
            }
            _ => Err(Diagnostic::error("Invalid resource id", id)),
        }
    }

    /// `gatewayId#groupId`
    fn group_handle(gateway_id: &str, group_id: &str) -> Result<String, Diagnostic> {
        ResourceHandle::composite([gateway_id, group_id])
            .map(|handle| handle.to_string())
            .map_err(|e| Diagnostic::error("Invalid resource id", e.to_string()))
    }

    fn apply_group(state: &mut DynamicValue, gateway_id: &str, group: GatewayGroup) {
        if let Ok(id) = Self::group_handle(gateway_id, &group.group_id) {
            let _ = state.set_string(&AttributePath::new("id"), id);
        }
        let _ = state.set_string(&AttributePath::new("gateway_id"), gateway_id.to_string());
        let _ = state.set_string(&AttributePath::new("group_id"), group.group_id);
        set_opt_string(state, "name", group.name);
        set_opt_string(state, "description", group.description);
        set_opt_string(state, "status", group.status);
        set_opt_string(state, "subnet_id", group.subnet_ids);
        set_opt_i64(
            state,
            "internet_max_bandwidth_out",
            group.internet_max_bandwidth_out.map(|v| v as i64),
        );
        if let Some(node_config) = group.node_config {
            let _ = state.set_list(&AttributePath::new("node_config"), node_config_value(&node_config));
        }
    }

    async fn read_group(
        provider_data: &crate::TencentCloudProviderData,
        gateway_id: &str,
        group_id: &str,
        mut state: DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let group = provider_data
            .client
            .tse()
            .describe_group(gateway_id, group_id)
            .await
            .map_err(|e| api_error("Failed to read TSE gateway group", e))?;

        Ok(group.map(|group| {
            Self::apply_group(&mut state, gateway_id, group);
            state
        }))
    }
}

#[async_trait]
impl Resource for TseCngwGroupResource {
    fn type_name(&self) -> &str {
        "tencentcloud_tse_cngw_group"
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
        ValidateResourceConfigResponse {
            diagnostics: Self::schema_static().validate(&request.config),
        }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_cngw_group.create");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let config = &request.config;
        let create_request = match (|| -> Result<CreateGroupRequest, Diagnostic> {
            Ok(CreateGroupRequest {
                gateway_id: required_string(config, "gateway_id")?,
                name: required_string(config, "name")?,
                node_config: extract_node_config(config)?,
                subnet_id: optional_string(config, "subnet_id"),
                description: optional_string(config, "description"),
                internet_max_bandwidth_out: optional_i64(config, "internet_max_bandwidth_out")
                    .map(|v| v.max(0) as u64),
            })
        })() {
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
        let group_id = match api.create_group(&create_request).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "create tse cngw group failed: {}", e);
                diagnostics.push(api_error("Failed to create TSE gateway group", e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let gateway_id = create_request.gateway_id;
        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("group_id"), group_id.clone());
        let id = match Self::group_handle(&gateway_id, &group_id) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state,
                    diagnostics,
                };
            }
        };
        let _ = new_state.set_string(&AttributePath::new("id"), id.clone());

        if let Err(e) = converge(
            &ctx,
            &id,
            &tse::group_spec(Operation::Create),
            move |handle| async move { api.group_status(&handle).await },
        )
        .await
        {
            diagnostics.push(Diagnostic::error(
                "TSE gateway group did not become ready",
                e.to_string(),
            ));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        match Self::read_group(provider_data, &gateway_id, &group_id, new_state.clone()).await {
            Ok(Some(state)) => new_state = state,
            Ok(None) => diagnostics.push(Diagnostic::error(
                "TSE gateway group disappeared",
                format!("Group {} was not found right after creation", id),
            )),
            Err(diag) => diagnostics.push(diag),
        }

        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_cngw_group.read");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let (_, gateway_id, group_id) = match Self::handle(&request.current_state) {
            Ok(ids) => ids,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match Self::read_group(
            provider_data,
            &gateway_id,
            &group_id,
            request.current_state.clone(),
        )
        .await
        {
            Ok(Some(state)) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
            },
            Ok(None) => {
                tracing::warn!(
                    log_id = ctx.log_id(),
                    "resource `TseCngwGroup` [{}#{}] not found, please check if it has been deleted",
                    gateway_id,
                    group_id
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_cngw_group.update");
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
        let ids = match Self::handle(&request.prior_state) {
            Ok(ids) => Some(ids),
            Err(diag) => {
                diagnostics.push(diag);
                None
            }
        };
        let Some((id, gateway_id, group_id)) = ids.filter(|_| diagnostics.is_empty()) else {
            return UpdateResourceResponse {
                new_state: request.prior_state,
                diagnostics,
            };
        };

        let prior = &request.prior_state;
        let planned = &request.planned_state;
        if has_change(prior, planned, "name") || has_change(prior, planned, "description") {
            let modify = ModifyGroupRequest {
                gateway_id: gateway_id.clone(),
                group_id: group_id.clone(),
                name: optional_string(planned, "name"),
                description: optional_string(planned, "description"),
            };

            let api = provider_data.client.tse();
            if let Err(e) = api.modify_group(&modify).await {
                tracing::error!(log_id = ctx.log_id(), "update tse cngw group failed: {}", e);
                diagnostics.push(api_error("Failed to update TSE gateway group", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }

            if let Err(e) = converge(
                &ctx,
                &id,
                &tse::group_spec(Operation::Update),
                move |handle| async move { api.group_status(&handle).await },
            )
            .await
            {
                diagnostics.push(Diagnostic::error(
                    "TSE gateway group did not become ready",
                    e.to_string(),
                ));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let new_state = match Self::read_group(
            provider_data,
            &gateway_id,
            &group_id,
            request.planned_state.clone(),
        )
        .await
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tse_cngw_group.delete");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let (id, gateway_id, group_id) = match Self::handle(&request.prior_state) {
            Ok(ids) => ids,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let api = provider_data.client.tse();
        match api.delete_group(&gateway_id, &group_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "delete tse cngw group failed: {}", e);
                diagnostics.push(api_error("Failed to delete TSE gateway group", e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        if let Err(e) = converge(
            &ctx,
            &id,
            &tse::group_spec(Operation::Delete),
            move |handle| async move { api.group_status(&handle).await },
        )
        .await
        {
            diagnostics.push(Diagnostic::error(
                "TSE gateway group was not deleted",
                e.to_string(),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for TseCngwGroupResource {
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
impl ResourceWithImportState for TseCngwGroupResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse::default();
        import_state_composite_id(&ctx, &["gateway_id", "group_id"], &request, &mut response);
        response
    }
}
