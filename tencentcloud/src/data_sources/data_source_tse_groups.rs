//! Gateway groups of a TSE cloud native gateway

use std::collections::HashMap;

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceMetadataRequest,
    DataSourceMetadataResponse, DataSourceSchemaRequest, DataSourceSchemaResponse,
    DataSourceWithConfigure, ReadDataSourceRequest, ReadDataSourceResponse,
    ValidateDataSourceConfigRequest, ValidateDataSourceConfigResponse,
};
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlockBuilder, NestingMode, Schema, SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use super::ids_hash;
use crate::api::common::Filter;
use crate::api::tse::{GatewayGroup, GatewayGroupList};
use crate::logging::LogElapsed;
use crate::resources::common::{api_error, extract_provider_data, not_configured, object};

#[derive(Default)]
pub struct TseGroupsDataSource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

fn group_object_type() -> AttributeType {
    let node_config = AttributeType::Object(HashMap::from([
        ("specification".to_string(), AttributeType::String),
        ("number".to_string(), AttributeType::Number),
    ]));
    AttributeType::Object(HashMap::from([
        ("group_id".to_string(), AttributeType::String),
        ("name".to_string(), AttributeType::String),
        ("description".to_string(), AttributeType::String),
        ("status".to_string(), AttributeType::String),
        ("create_time".to_string(), AttributeType::String),
        ("is_first_group".to_string(), AttributeType::Bool),
        ("node_config".to_string(), AttributeType::List(Box::new(node_config))),
    ]))
}

fn group_value(group: &GatewayGroup) -> Dynamic {
    let node_config = match &group.node_config {
        Some(nc) => vec![object(vec![
            ("specification", Dynamic::from(nc.specification.as_str())),
            ("number", Dynamic::from(nc.number)),
        ])],
        None => vec![],
    };
    let text = |v: &Option<String>| Dynamic::from(v.clone().unwrap_or_default());

    object(vec![
        ("group_id", Dynamic::from(group.group_id.as_str())),
        ("name", text(&group.name)),
        ("description", text(&group.description)),
        ("status", text(&group.status)),
        ("create_time", text(&group.create_time)),
        ("is_first_group", Dynamic::from(group.is_first_group.unwrap_or(false))),
        ("node_config", Dynamic::List(node_config)),
    ])
}

fn result_value(list: &GatewayGroupList) -> Vec<Dynamic> {
    vec![object(vec![
        ("total_count", Dynamic::from(list.total_count as i64)),
        (
            "gateway_group_list",
            Dynamic::List(list.gateway_group_list.iter().map(group_value).collect()),
        ),
    ])]
}

impl TseGroupsDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        let result_type = AttributeType::Object(HashMap::from([
            ("total_count".to_string(), AttributeType::Number),
            (
                "gateway_group_list".to_string(),
                AttributeType::List(Box::new(group_object_type())),
            ),
        ]));

        SchemaBuilder::new()
            .version(0)
            .description("Lists the node groups of a TSE cloud native gateway")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("gateway_id", AttributeType::String)
                    .description("Gateway to list groups of")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("result", AttributeType::List(Box::new(result_type)))
                    .description("Matching groups")
                    .computed()
                    .build(),
            )
            .block(
                NestedBlockBuilder::new("filters", NestingMode::List)
                    .description("Server-side filters, e.g. GroupId or Name")
                    .attribute(
                        AttributeBuilder::new("name", AttributeType::String)
                            .required()
                            .build(),
                    )
                    .attribute(
                        AttributeBuilder::new("values", AttributeType::List(Box::new(AttributeType::String)))
                            .required()
                            .build(),
                    )
                    .build(),
            )
            .build()
    }

    fn filters(config: &DynamicValue) -> Vec<Filter> {
        config
            .get_object_list(&AttributePath::new("filters"))
            .unwrap_or_default()
            .iter()
            .filter_map(|f| {
                let name = f.get_string(&AttributePath::new("name")).ok()?;
                let values = f
                    .get_string_list(&AttributePath::new("values"))
                    .unwrap_or_default();
                Some(Filter::new(name, values))
            })
            .collect()
    }
}

#[async_trait]
impl DataSource for TseGroupsDataSource {
    fn type_name(&self) -> &str {
        "tencentcloud_tse_groups"
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
        let _elapsed = LogElapsed::new(&ctx, "data_source.tencentcloud_tse_groups.read");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadDataSourceResponse {
                state: DynamicValue::null(),
                diagnostics,
            };
        };

        let gateway_id = match request.config.get_string(&AttributePath::new("gateway_id")) {
            Ok(id) => id,
            Err(_) => {
                diagnostics.push(
                    Diagnostic::error("Missing gateway_id", "The 'gateway_id' attribute is required")
                        .with_attribute(AttributePath::new("gateway_id")),
                );
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let filters = Self::filters(&request.config);
        let groups = match provider_data
            .client
            .tse()
            .describe_groups(&gateway_id, &filters)
            .await
        {
            Ok(groups) => groups,
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "describe tse groups failed: {}", e);
                diagnostics.push(api_error("Failed to read TSE gateway groups", e));
                return ReadDataSourceResponse {
                    state: DynamicValue::null(),
                    diagnostics,
                };
            }
        };

        let ids: Vec<String> = groups
            .gateway_group_list
            .iter()
            .map(|g| g.group_id.clone())
            .collect();

        let mut state = request.config;
        let _ = state.set_string(&AttributePath::new("id"), ids_hash(&ids));
        let _ = state.set_list(&AttributePath::new("result"), result_value(&groups));

        ReadDataSourceResponse { state, diagnostics }
    }
}

#[async_trait]
impl DataSourceWithConfigure for TseGroupsDataSource {
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
