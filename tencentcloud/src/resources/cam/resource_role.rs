//! CAM role resource

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
use tfplug::validator::StringLengthValidator;

use crate::api::cam::{self, CreateRoleRequest, RoleInfo};
use crate::logging::LogElapsed;
use crate::resources::common::{
    api_error, extract_provider_data, has_change, immutable_changes, not_configured,
    optional_bool, optional_string, required_string, set_opt_bool, set_opt_string, state_id,
};

const IMMUTABLE_ARGS: &[&str] = &["name", "console_login"];

#[derive(Default)]
pub struct CamRoleResource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

/// Policy documents compare as JSON; the API reformats them on the way back
fn same_document(a: &str, b: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(a),
        serde_json::from_str::<serde_json::Value>(b),
    ) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

impl CamRoleResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provides a CAM role")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Role id")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("name", AttributeType::String)
                    .description("Role name")
                    .required()
                    .force_new()
                    .validator(Box::new(StringLengthValidator::between(1, 128)))
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("document", AttributeType::String)
                    .description("Trust policy document in JSON")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("description", AttributeType::String)
                    .description("Role description")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("console_login", AttributeType::Bool)
                    .description("Whether the role may log in to the console")
                    .optional()
                    .computed()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("create_time", AttributeType::String)
                    .description("Creation time")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("update_time", AttributeType::String)
                    .description("Last update time")
                    .computed()
                    .build(),
            )
            .build()
    }

    fn apply_role(state: &mut DynamicValue, role_id: &str, role: RoleInfo) {
        let _ = state.set_string(&AttributePath::new("id"), role_id.to_string());
        set_opt_string(state, "name", role.role_name);
        set_opt_string(state, "description", role.description);
        set_opt_bool(state, "console_login", role.console_login);
        set_opt_string(state, "create_time", role.add_time);
        set_opt_string(state, "update_time", role.update_time);

        if let Some(document) = role.policy_document {
            let keep = optional_string(state, "document")
                .map(|current| same_document(&current, &document))
                .unwrap_or(false);
            if !keep {
                let _ = state.set_string(&AttributePath::new("document"), document);
            }
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
            .map_err(|e| api_error("Failed to read CAM role", e))?;

        Ok(role.map(|role| {
            Self::apply_role(&mut state, role_id, role);
            state
        }))
    }
}

#[async_trait]
impl Resource for CamRoleResource {
    fn type_name(&self) -> &str {
        "tencentcloud_cam_role"
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

        if let Some(document) = optional_string(&request.config, "document") {
            if let Err(e) = serde_json::from_str::<serde_json::Value>(&document) {
                diagnostics.push(
                    Diagnostic::error("Invalid document", format!("document is not valid JSON: {}", e))
                        .with_attribute(AttributePath::new("document")),
                );
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_cam_role.create");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let config = &request.config;
        let create_request = match (required_string(config, "name"), required_string(config, "document")) {
            (Ok(role_name), Ok(policy_document)) => CreateRoleRequest {
                role_name,
                policy_document,
                description: optional_string(config, "description"),
                console_login: optional_bool(config, "console_login").map(u64::from),
                tags: vec![],
            },
            (Err(diag), _) | (_, Err(diag)) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let api = provider_data.client.cam();
        let role_id = match api.create_role(&create_request).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "create cam role failed: {}", e);
                diagnostics.push(api_error("Failed to create CAM role", e));
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
            diagnostics.push(Diagnostic::error("CAM role did not become visible", e.to_string()));
            return CreateResourceResponse {
                new_state,
                diagnostics,
            };
        }

        match Self::read_role(provider_data, &role_id, new_state.clone()).await {
            Ok(Some(state)) => new_state = state,
            Ok(None) => diagnostics.push(Diagnostic::error(
                "CAM role disappeared",
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_cam_role.read");
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
                    "resource `CamRole` [{}] not found, please check if it has been deleted",
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_cam_role.update");
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

        let prior = &request.prior_state;
        let planned = &request.planned_state;
        let api = provider_data.client.cam();

        if has_change(prior, planned, "description") {
            let description = optional_string(planned, "description").unwrap_or_default();
            if let Err(e) = api.update_role_description(&role_id, &description).await {
                tracing::error!(log_id = ctx.log_id(), "update cam role description failed: {}", e);
                diagnostics.push(api_error("Failed to update CAM role description", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let old_document = optional_string(prior, "document").unwrap_or_default();
        let new_document = optional_string(planned, "document").unwrap_or_default();
        if !same_document(&old_document, &new_document) {
            if let Err(e) = api.update_assume_role_policy(&role_id, &new_document).await {
                tracing::error!(log_id = ctx.log_id(), "update cam role document failed: {}", e);
                diagnostics.push(api_error("Failed to update CAM role document", e));
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_cam_role.delete");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let Ok(role_id) = state_id(&request.prior_state) else {
            return DeleteResourceResponse { diagnostics };
        };

        match provider_data.client.cam().delete_role(&role_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "delete cam role failed: {}", e);
                diagnostics.push(api_error("Failed to delete CAM role", e));
            }
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for CamRoleResource {
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
impl ResourceWithImportState for CamRoleResource {
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
