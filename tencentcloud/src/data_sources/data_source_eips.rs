//! Elastic IPs matching optional id, name and public IP filters

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};

use super::ids_hash;
use crate::api::common::Filter;
use crate::api::vpc::Address;
use crate::logging::LogElapsed;
use crate::resources::common::{
    api_error, extract_provider_data, not_configured, object, optional_string,
};

#[derive(Default)]
pub struct EipsDataSource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

fn eip_value(address: &Address) -> Dynamic {
    let text = |v: &Option<String>| Dynamic::from(v.clone().unwrap_or_default());
    object(vec![
        ("eip_id", Dynamic::from(address.address_id.as_str())),
        ("eip_name", text(&address.address_name)),
        ("public_ip", text(&address.address_ip)),
        ("status", text(&address.address_status)),
        ("instance_id", text(&address.instance_id)),
        ("create_time", text(&address.created_time)),
    ])
}

impl EipsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        let eip_type = AttributeType::Object(HashMap::from([
            ("eip_id".to_string(), AttributeType::String),
            ("eip_name".to_string(), AttributeType::String),
            ("public_ip".to_string(), AttributeType::String),
            ("status".to_string(), AttributeType::String),
            ("instance_id".to_string(), AttributeType::String),
            ("create_time".to_string(), AttributeType::String),
        ]));

        SchemaBuilder::new()
            .version(0)
            .description("Lists elastic IPs")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("eip_id", AttributeType::String)
                    .description("Only the address with this id")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("eip_name", AttributeType::String)
                    .description("Only addresses with this name")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("public_ip", AttributeType::String)
                    .description("Only the address with this public IP")
                    .optional()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("eip_list", AttributeType::List(Box::new(eip_type)))
                    .description("Matching addresses")
                    .computed()
                    .build(),
            )
            .build()
    }

    fn filters(config: &DynamicValue) -> Vec<Filter> {
        [
            ("address-id", "eip_id"),
            ("address-name", "eip_name"),
            ("address-ip", "public_ip"),
        ]
        .into_iter()
        .filter_map(|(filter, attribute)| {
            optional_string(config, attribute)
                .filter(|v| !v.is_empty())
                .map(|v| Filter::single(filter, v))
        })
        .collect()
    }
}

#[async_trait]
impl DataSource for EipsDataSource {
    fn type_name(&self) -> &str {
        "tencentcloud_eips"
    }

    async fn metadata(
        &self,
        _ctx: Context,
        _request: DataSourceMetadataRequest,
    ) -> DataSourceMetadataResponse {
        DataSourceMetadataResponse {
            type_name: self.type_name().to_string(),
        }
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        DataSourceSchemaResponse {
            schema: Self::schema_static(),
            diagnostics: vec![],
        }
    }

    async fn validate(
        &self,
        _ctx: Context,
        request: ValidateDataSourceConfigRequest,
    ) -> ValidateDataSourceConfigResponse {
        ValidateDataSourceConfigResponse {
            diagnostics: Self::schema_static().validate(&request.config),
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "data_source.tencentcloud_eips.read");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics,
            };
        };

        let filters = Self::filters(&request.config);
        let addresses = match provider_data.client.vpc().describe_addresses(filters).await {
            Ok(addresses) => addresses,
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "describe eips failed: {}", e);
                diagnostics.push(api_error("Failed to read EIPs", e));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let ids: Vec<String> = addresses.iter().map(|a| a.address_id.clone()).collect();
        let mut state = request.config;
        if state.is_null() {
            state = DynamicValue::object();
        }
        let _ = state.set_string(&AttributePath::new("id"), ids_hash(&ids));
        let _ = state.set_list(
            &AttributePath::new("eip_list"),
            addresses.iter().map(eip_value).collect(),
        );

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for EipsDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let mut diagnostics = vec![];
        self.provider_data =
            extract_provider_data(request.provider_data, "data source", &mut diagnostics);
        ConfigureDataSourceResponse { diagnostics }
    }
}
