//! Elastic IP resource
//!
//! The address itself is allocated once; `instance_id` models its
//! association and is the only argument besides `name` and `tags` that can
//! change in place. Re-association always detaches first and waits for the
//! disassociation task before binding the new instance.

use async_trait::async_trait;
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
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::{NumberRangeValidator, OneOfValidator};

use crate::api::common::{map_to_tags, tags_to_map};
use crate::api::vpc::{self, Address, AllocateAddressRequest, VpcApi};
use crate::api::Operation;
use crate::logging::LogElapsed;
use crate::resources::common::{
    api_error, extract_provider_data, has_change, immutable_changes, not_configured,
    optional_i64, optional_string, set_opt_i64, set_opt_string, state_id, string_map,
};

const ADDRESS_TYPES: &[&str] = &["EIP", "AnycastEIP", "HighQualityEIP", "AntiDDoSEIP"];

const CHARGE_TYPES: &[&str] = &[
    "BANDWIDTH_PACKAGE",
    "BANDWIDTH_POSTPAID_BY_HOUR",
    "BANDWIDTH_PREPAID_BY_MONTH",
    "TRAFFIC_POSTPAID_BY_HOUR",
];

const IMMUTABLE_ARGS: &[&str] = &["type", "internet_charge_type", "internet_max_bandwidth_out"];

#[derive(Default)]
pub struct EipResource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

impl EipResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provides an elastic IP and its association")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Address id")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Address name")
                    .optional()
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("type", AttributeType::String)
                    .description("Address type, defaults to EIP")
                    .optional()
                    .computed()
                    .validator(Box::new(OneOfValidator::new(ADDRESS_TYPES)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("internet_charge_type", AttributeType::String)
                    .description("Network billing mode")
                    .optional()
                    .computed()
                    .validator(Box::new(OneOfValidator::new(CHARGE_TYPES)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("internet_max_bandwidth_out", AttributeType::Number)
                    .description("Outbound bandwidth cap in Mbps")
                    .optional()
                    .computed()
                    .validator(Box::new(NumberRangeValidator::between(1.0, 10000.0)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("instance_id", AttributeType::String)
                    .description("Instance the address is bound to")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Tags of the address")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("public_ip", AttributeType::String)
                    .description("Public IP of the address")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("status", AttributeType::String)
                    .description("Address status")
                    .computed()
                    .build(),
            )
            .build()
    }

    fn apply_address(state: &mut DynamicValue, address: Address) {
        let _ = state.set_string(&AttributePath::new("id"), address.address_id);
        set_opt_string(state, "name", address.address_name);
        set_opt_string(state, "type", address.address_type);
        set_opt_string(state, "internet_charge_type", address.internet_charge_type);
        set_opt_i64(
            state,
            "internet_max_bandwidth_out",
            address.bandwidth.map(|v| v as i64),
        );
        set_opt_string(state, "public_ip", address.address_ip);
        set_opt_string(state, "status", address.address_status);

        // An unbound address reports an empty instance id
        match address.instance_id.filter(|id| !id.is_empty()) {
            Some(instance_id) => {
                let _ = state.set_string(&AttributePath::new("instance_id"), instance_id);
            }
            None => {
                if state.get(&AttributePath::new("instance_id")).is_some() {
                    let _ = state.set_string(&AttributePath::new("instance_id"), String::new());
                }
            }
        }

        let tags = tags_to_map(&address.tag_set);
        if !tags.is_empty() || state.get(&AttributePath::new("tags")).is_some() {
            let _ = state.set_string_map(&AttributePath::new("tags"), &tags);
        }
    }

    async fn read_address(
        provider_data: &crate::TencentCloudProviderData,
        address_id: &str,
        mut state: DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let address = provider_data
            .client
            .vpc()
            .describe_address(address_id)
            .await
            .map_err(|e| api_error("Failed to read EIP", e))?;

        Ok(address.map(|address| {
            Self::apply_address(&mut state, address);
            state
        }))
    }

    /// AssociateAddress, wait for its task, then wait for BIND
    async fn associate(
        ctx: &Context,
        api: VpcApi<'_>,
        address_id: &str,
        instance_id: &str,
    ) -> Result<(), Diagnostic> {
        let task_id = api
            .associate_address(address_id, instance_id)
            .await
            .map_err(|e| api_error("Failed to associate EIP", e))?;

        if let Some(task_id) = task_id {
            api.wait_task(ctx, task_id)
                .await
                .map_err(|e| Diagnostic::error("EIP association task failed", e.to_string()))?;
        }

        converge(
            ctx,
            address_id,
            &vpc::address_spec(Operation::Update),
            move |id| async move { api.address_status(&id).await },
        )
        .await
        .map_err(|e| Diagnostic::error("EIP was not bound", e.to_string()))
    }
}

#[async_trait]
impl Resource for EipResource {
    fn type_name(&self) -> &str {
        "tencentcloud_eip"
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_eip.create");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let config = &request.config;
        let allocate = AllocateAddressRequest {
            address_count: 1,
            address_name: optional_string(config, "name"),
            address_type: optional_string(config, "type"),
            internet_charge_type: optional_string(config, "internet_charge_type"),
            internet_max_bandwidth_out: optional_i64(config, "internet_max_bandwidth_out")
                .map(|v| v.max(0) as u64),
            tags: map_to_tags(&string_map(config, "tags")),
        };

        let api = provider_data.client.vpc();
        let address_id = match api.allocate_address(&allocate).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "create eip failed: {}", e);
                diagnostics.push(api_error("Failed to create EIP", e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), address_id.clone());

        if let Err(e) = converge(
            &ctx,
            &address_id,
            &vpc::address_spec(Operation::Create),
            move |id| async move { api.address_status(&id).await },
        )
        .await
        {
            diagnostics.push(Diagnostic::error("EIP did not become ready", e.to_string()));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        if let Some(instance_id) = optional_string(config, "instance_id").filter(|s| !s.is_empty()) {
            if let Err(diag) = Self::associate(&ctx, api, &address_id, &instance_id).await {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state,
                    diagnostics,
                };
            }
        }

        match Self::read_address(provider_data, &address_id, new_state.clone()).await {
            Ok(Some(state)) => new_state = state,
            Ok(None) => diagnostics.push(Diagnostic::error(
                "EIP disappeared",
                format!("Address {} was not found right after creation", address_id),
            )),
            Err(diag) => diagnostics.push(diag),
        }

        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_eip.read");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let address_id = match state_id(&request.current_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match Self::read_address(provider_data, &address_id, request.current_state.clone()).await {
            Ok(Some(state)) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
            },
            Ok(None) => {
                tracing::warn!(
                    log_id = ctx.log_id(),
                    "resource `Eip` [{}] not found, please check if it has been deleted",
                    address_id
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_eip.update");
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

        let address_id = match state_id(&request.prior_state) {
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
        let api = provider_data.client.vpc();

        if has_change(prior, planned, "name") {
            let name = optional_string(planned, "name").unwrap_or_default();
            if let Err(e) = api.modify_address_name(&address_id, &name).await {
                tracing::error!(log_id = ctx.log_id(), "rename eip failed: {}", e);
                diagnostics.push(api_error("Failed to update EIP name", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        if has_change(prior, planned, "instance_id") {
            let old_instance = optional_string(prior, "instance_id").unwrap_or_default();
            let new_instance = optional_string(planned, "instance_id").unwrap_or_default();

            if !old_instance.is_empty() {
                if let Err(e) = api.unattach(&ctx, &address_id).await {
                    diagnostics.push(Diagnostic::error("Failed to disassociate EIP", e.to_string()));
                    return UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics,
                    };
                }
            }
            if !new_instance.is_empty() {
                if let Err(diag) = Self::associate(&ctx, api, &address_id, &new_instance).await {
                    diagnostics.push(diag);
                    return UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics,
                    };
                }
            }
        }

        if has_change(prior, planned, "tags") {
            let old = string_map(prior, "tags");
            let new = string_map(planned, "tags");
            if let Err(e) = provider_data
                .client
                .tag()
                .modify_tags(vpc::SERVICE, vpc::EIP_RESOURCE_TYPE, &address_id, &old, &new)
                .await
            {
                diagnostics.push(api_error("Failed to update EIP tags", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let new_state =
            match Self::read_address(provider_data, &address_id, request.planned_state.clone()).await {
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_eip.delete");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Ok(address_id) = state_id(&request.prior_state) else {
            return DeleteResourceResponse { diagnostics };
        };

        let api = provider_data.client.vpc();
        if let Err(e) = api.unattach(&ctx, &address_id).await {
            diagnostics.push(Diagnostic::error("Failed to disassociate EIP", e.to_string()));
            return DeleteResourceResponse { diagnostics };
        }

        match api.release_address(&address_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "release eip failed: {}", e);
                diagnostics.push(api_error("Failed to delete EIP", e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        if let Err(e) = converge(
            &ctx,
            &address_id,
            &vpc::address_spec(Operation::Delete),
            move |id| async move { api.address_status(&id).await },
        )
        .await
        {
            diagnostics.push(Diagnostic::error("EIP was not released", e.to_string()));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for EipResource {
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
impl ResourceWithImportState for EipResource {
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
