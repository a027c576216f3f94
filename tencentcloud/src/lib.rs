pub mod api;
pub mod data_sources;
pub mod logging;
pub mod provider_data;
pub mod resources;

pub use provider_data::TencentCloudProviderData;

use async_trait::async_trait;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use tfplug::context::Context;
use tfplug::data_source::DataSourceWithConfigure;
use tfplug::provider::{
    ConfigureProviderRequest, ConfigureProviderResponse, DataSourceFactory, Provider,
    ProviderMetadataRequest, ProviderMetadataResponse, ProviderSchemaRequest,
    ProviderSchemaResponse, ResourceFactory, ValidateProviderConfigRequest,
    ValidateProviderConfigResponse,
};
use tfplug::resource::ResourceWithConfigure;
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Diagnostic, DynamicValue};
use tfplug::validator::OneOfValidator;

use api::client::{DEFAULT_DOMAIN, DEFAULT_PROTOCOL};

const ENV_SECRET_ID: &str = "TENCENTCLOUD_SECRET_ID";
const ENV_SECRET_KEY: &str = "TENCENTCLOUD_SECRET_KEY";
const ENV_SECURITY_TOKEN: &str = "TENCENTCLOUD_SECURITY_TOKEN";
const ENV_REGION: &str = "TENCENTCLOUD_REGION";
const ENV_PROTOCOL: &str = "TENCENTCLOUD_PROTOCOL";
const ENV_DOMAIN: &str = "TENCENTCLOUD_DOMAIN";
const ENV_ENDPOINT: &str = "TENCENTCLOUD_ENDPOINT";

pub struct TencentCloudProvider {
    provider_data: Option<Arc<TencentCloudProviderData>>,
}

impl Default for TencentCloudProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Attribute value when set and non-empty, otherwise the environment variable
fn setting(config: &DynamicValue, name: &str, env: &str) -> Option<String> {
    config
        .get_string(&AttributePath::new(name))
        .ok()
        .filter(|v| !v.is_empty())
        .or_else(|| std::env::var(env).ok().filter(|v| !v.is_empty()))
}

fn missing(name: &str, env: &str) -> Diagnostic {
    Diagnostic::error(
        format!("{} is required", name),
        format!("Set '{}' in the provider block or the {} env var", name, env),
    )
    .with_attribute(AttributePath::new(name))
}

impl TencentCloudProvider {
    pub fn new() -> Self {
        Self {
            provider_data: None,
        }
    }

    /// Set once `configure` succeeded
    pub fn provider_data(&self) -> Option<&TencentCloudProviderData> {
        self.provider_data.as_deref()
    }

    pub fn schema_static() -> Schema {
        let optional_string = |name: &str, description: &str| {
            AttributeBuilder::new(name, AttributeType::String)
                .description(description)
                .optional()
        };

        SchemaBuilder::new()
            .version(0)
            .description("TencentCloud provider")
            .attribute(
                optional_string("secret_id", "API secret id, or TENCENTCLOUD_SECRET_ID").build(),
            )
            .attribute(
                optional_string("secret_key", "API secret key, or TENCENTCLOUD_SECRET_KEY")
                    .sensitive()
                    .build(),
            )
            .attribute(
                optional_string(
                    "security_token",
                    "Temporary credential token, or TENCENTCLOUD_SECURITY_TOKEN",
                )
                .sensitive()
                .build(),
            )
            .attribute(optional_string("region", "Region, or TENCENTCLOUD_REGION").build())
            .attribute(
                optional_string("protocol", "HTTPS (default) or HTTP, or TENCENTCLOUD_PROTOCOL")
                    .validator(Box::new(OneOfValidator::new(&["HTTPS", "HTTP"])))
                    .build(),
            )
            .attribute(
                optional_string("domain", "Root API domain, or TENCENTCLOUD_DOMAIN").build(),
            )
            .attribute(
                optional_string(
                    "endpoint",
                    "Single URL used for every service instead of the per-service host",
                )
                .build(),
            )
            .build()
    }

    fn client_config(
        config: &DynamicValue,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Option<api::ClientConfig> {
        let secret_id = setting(config, "secret_id", ENV_SECRET_ID);
        let secret_key = setting(config, "secret_key", ENV_SECRET_KEY);
        let region = setting(config, "region", ENV_REGION);

        if secret_id.is_none() {
            diagnostics.push(missing("secret_id", ENV_SECRET_ID));
        }
        if secret_key.is_none() {
            diagnostics.push(missing("secret_key", ENV_SECRET_KEY));
        }
        if region.is_none() {
            diagnostics.push(missing("region", ENV_REGION));
        }

        let (Some(secret_id), Some(secret_key), Some(region)) = (secret_id, secret_key, region)
        else {
            return None;
        };

        let credential = api::Credential {
            secret_id,
            secret_key,
            token: setting(config, "security_token", ENV_SECURITY_TOKEN),
        };
        let mut client_config = api::ClientConfig::new(credential, region);
        client_config.protocol = setting(config, "protocol", ENV_PROTOCOL)
            .unwrap_or_else(|| DEFAULT_PROTOCOL.to_string());
        client_config.domain =
            setting(config, "domain", ENV_DOMAIN).unwrap_or_else(|| DEFAULT_DOMAIN.to_string());
        client_config.endpoint = setting(config, "endpoint", ENV_ENDPOINT);

        Some(client_config)
    }
}

#[async_trait]
impl Provider for TencentCloudProvider {
    fn type_name(&self) -> &str {
        "tencentcloud"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: ProviderMetadataRequest,
    ) -> ProviderMetadataResponse {
        ProviderMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: ProviderSchemaRequest,
    ) -> ProviderSchemaResponse {
        ProviderSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateProviderConfigRequest,
    ) -> ValidateProviderConfigResponse {
        ValidateProviderConfigResponse {
            diagnostics: Self::schema_static().validate(&request.config),
        }
    }

    async fn configure(
        &mut self,
        ctx: Context,
        request: ConfigureProviderRequest,
    ) -> ConfigureProviderResponse {
        logging::init();
        let _elapsed = logging::LogElapsed::new(&ctx, "provider.configure");
        let mut diagnostics = vec![];

        let Some(client_config) = Self::client_config(&request.config, &mut diagnostics) else {
            return ConfigureProviderResponse {
                diagnostics,
                provider_data: None,
            };
        };

        match api::Client::new(client_config) {
            Ok(client) => {
                tracing::info!(
                    log_id = ctx.log_id(),
                    region = client.region(),
                    terraform_version = %request.terraform_version,
                    "provider configured"
                );
                let provider_data = Arc::new(TencentCloudProviderData::new(client));
                self.provider_data = Some(provider_data.clone());
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: Some(provider_data as Arc<dyn Any + Send + Sync>),
                }
            }
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "client setup failed: {}", e);
                diagnostics.push(Diagnostic::error(
                    "Failed to create API client",
                    e.to_string(),
                ));
                ConfigureProviderResponse {
                    diagnostics,
                    provider_data: None,
                }
            }
        }
    }

    fn resources(&self) -> HashMap<String, ResourceFactory> {
        let mut factories: HashMap<String, ResourceFactory> = HashMap::new();
        factories.insert(
            "tencentcloud_tse_instance".to_string(),
            Box::new(|| {
                Box::new(resources::TseInstanceResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "tencentcloud_tse_cngw_gateway".to_string(),
            Box::new(|| {
                Box::new(resources::TseCngwGatewayResource::new())
                    as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "tencentcloud_tse_cngw_group".to_string(),
            Box::new(|| {
                Box::new(resources::TseCngwGroupResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "tencentcloud_eip".to_string(),
            Box::new(|| Box::new(resources::EipResource::new()) as Box<dyn ResourceWithConfigure>),
        );
        factories.insert(
            "tencentcloud_cam_role".to_string(),
            Box::new(|| {
                Box::new(resources::CamRoleResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "tencentcloud_cam_service_linked_role".to_string(),
            Box::new(|| {
                Box::new(resources::CamServiceLinkedRoleResource::new())
                    as Box<dyn ResourceWithConfigure>
            }),
        );
        factories.insert(
            "tencentcloud_tem_scale_rule".to_string(),
            Box::new(|| {
                Box::new(resources::TemScaleRuleResource::new()) as Box<dyn ResourceWithConfigure>
            }),
        );
        factories
    }

    fn data_sources(&self) -> HashMap<String, DataSourceFactory> {
        let mut factories: HashMap<String, DataSourceFactory> = HashMap::new();
        factories.insert(
            "tencentcloud_tse_groups".to_string(),
            Box::new(|| {
                Box::new(data_sources::TseGroupsDataSource::new())
                    as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories.insert(
            "tencentcloud_eips".to_string(),
            Box::new(|| {
                Box::new(data_sources::EipsDataSource::new()) as Box<dyn DataSourceWithConfigure>
            }),
        );
        factories
    }
}
