//! CAM service-linked role resource
//!
//! Deletion is asynchronous: DeleteServiceLinkedRole hands back a task id
//! which is polled until the task succeeds.

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
use tfplug::validator::ListLengthValidator;

use crate::api::cam::{self, CreateServiceLinkedRoleRequest, RoleInfo};
use crate::api::common::{map_to_tags, tags_to_map};
use crate::logging::LogElapsed;
use crate::resources::common::{
    api_error, extract_provider_data, has_change, immutable_changes, not_configured,
    optional_string, set_opt_string, state_id, string_map,
};

const IMMUTABLE_ARGS: &[&str] = &["qcs_service_name", "custom_suffix", "tags"];

#[derive(Default)]
pub struct CamServiceLinkedRoleResource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

impl CamServiceLinkedRoleResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provides a CAM service-linked role")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Role id")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("qcs_service_name", AttributeType::List(Box::new(AttributeType::String)))
                    .description("Services the role is authorized to, e.g. tke.qcloud.com")
                    .required()
                    .force_new()
                    .validator(Box::new(ListLengthValidator {
                        min: Some(1),
                        max: None,
                    }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("custom_suffix", AttributeType::String)
                    .description("Suffix appended to the role name")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Role description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("tags", AttributeType::Map(Box::new(AttributeType::String)))
                    .description("Tags of the role")
                    .optional()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("role_name", AttributeType::String)
                    .description("Name the service gave the role")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("create_time", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("update_time", AttributeType::String)
                    .computed()
                    .build(),
            )
            .build()
    }

    fn apply_role(state: &mut DynamicValue, role_id: &str, role: RoleInfo) {
        let _ = state.set_string(&AttributePath::new("id"), role_id.to_string());
        set_opt_string(state, "role_name", role.role_name);
        set_opt_string(state, "description", role.description);
        set_opt_string(state, "create_time", role.add_time);
        set_opt_string(state, "update_time", role.update_time);

        let tags = tags_to_map(&role.tags);
        if !tags.is_empty() || state.get(&AttributePath::new("tags")).is_some() {
            let _ = state.set_string_map(&AttributePath::new("tags"), &tags);
        }
    }

    async fn read_role(
        provider_data: &crate::TencentCloudProviderData,
        role_id: &str,
        mut state: DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let role = provider_data
            .client
            .cam()
            .get_role(role_id)
            .await
            .map_err(|e| api_error("Failed to read CAM service-linked role", e))?;

        Ok(role.map(|role| {
            Self::apply_role(&mut state, role_id, role);
            state
        }))
    }
}

#[async_trait]
impl Resource for CamServiceLinkedRoleResource {
    fn type_name(&self) -> &str {
        "tencentcloud_cam_service_linked_role"
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_cam_service_linked_role.create");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let config = &request.config;
        let create_request = CreateServiceLinkedRoleRequest {
            qcs_service_name: config
                .get_string_list(&AttributePath::new("qcs_service_name"))
                .unwrap_or_default(),
            custom_suffix: optional_string(config, "custom_suffix"),
            description: optional_string(config, "description"),
            tags: map_to_tags(&string_map(config, "tags")),
        };
        if create_request.qcs_service_name.is_empty() {
            diagnostics.push(
                Diagnostic::error(
                    "Missing qcs_service_name",
                    "At least one service name is required",
                )
                .with_attribute(AttributePath::new("qcs_service_name")),
            );
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        }

        let api = provider_data.client.cam();
        let role_id = match api.create_service_linked_role(&create_request).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    log_id = ctx.log_id(),
                    "create cam service linked role failed: {}",
                    e
                );
                diagnostics.push(api_error("Failed to create CAM service-linked role", e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let mut new_state = request.planned_state;
        let _ = new_state.set_string(&AttributePath::new("id"), role_id.clone());

        if let Err(e) = converge(&ctx, &role_id, &cam::role_visible_spec(), move |id| async move {
            api.role_visibility(&id).await
        })
        .await
        {
            diagnostics.push(Diagnostic::error(
                "CAM service-linked role did not become visible",
                e.to_string(),
            ));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        match Self::read_role(provider_data, &role_id, new_state.clone()).await {
            Ok(Some(state)) => new_state = state,
            Ok(None) => diagnostics.push(Diagnostic::error(
                "CAM service-linked role disappeared",
                format!("Role {} was not found right after creation", role_id),
            )),
            Err(diag) => diagnostics.push(diag),
        }

        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_cam_service_linked_role.read");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let role_id = match state_id(&request.current_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match Self::read_role(provider_data, &role_id, request.current_state.clone()).await {
            Ok(Some(state)) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
            },
            Ok(None) => {
                tracing::warn!(
                    log_id = ctx.log_id(),
                    "resource `CamServiceLinkedRole` [{}] not found, please check if it has been deleted",
                    role_id
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_cam_service_linked_role.update");
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

        let role_id = match state_id(&request.prior_state) {
            Ok(id) => id,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        if has_change(&request.prior_state, &request.planned_state, "description") {
            let description = optional_string(&request.planned_state, "description").unwrap_or_default();
            if let Err(e) = provider_data
                .client
                .cam()
                .update_role_description(&role_id, &description)
                .await
            {
                diagnostics.push(api_error("Failed to update CAM service-linked role", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let new_state =
            match Self::read_role(provider_data, &role_id, request.planned_state.clone()).await {
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_cam_service_linked_role.delete");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let api = provider_data.client.cam();
        let role_name = match optional_string(&request.prior_state, "role_name") {
            Some(name) if !name.is_empty() => name,
            _ => {
                // Older states may lack the name; look it up by id
                let Ok(role_id) = state_id(&request.prior_state) else {
                    return DeleteResourceResponse { diagnostics };
                };
                match api.get_role(&role_id).await {
                    Ok(Some(RoleInfo {
                        role_name: Some(name),
                        ..
                    })) => name,
                    Ok(_) => return DeleteResourceResponse { diagnostics },
                    Err(e) => {
                        diagnostics.push(api_error("Failed to read CAM service-linked role", e));
                        return DeleteResourceResponse { diagnostics };
                    }
                }
            }
        };

        let task_id = match api.delete_service_linked_role(&role_name).await {
            Ok(task_id) => task_id,
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                tracing::error!(
                    log_id = ctx.log_id(),
                    "delete cam service linked role failed: {}",
                    e
                );
                diagnostics.push(api_error("Failed to delete CAM service-linked role", e));
                return DeleteResourceResponse { diagnostics };
            }
        };

        if let Err(e) = converge(&ctx, &task_id, &cam::deletion_task_spec(), move |id| async move {
            api.deletion_status(&id).await
        })
        .await
        {
            diagnostics.push(Diagnostic::error(
                "CAM service-linked role was not deleted",
                e.to_string(),
            ));
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for CamServiceLinkedRoleResource {
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
impl ResourceWithImportState for CamServiceLinkedRoleResource {
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
