//! TEM application scale rule, addressed as `environmentId#applicationId#autoscalerId`

use async_trait::async_trait;
use tfplug::context::Context;
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
use tfplug::schema::{
    AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode, Schema,
    SchemaBuilder,
};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
use tfplug::validator::OneOfValidator;
use tfplug::ResourceHandle;

use crate::api::tem::{
    Autoscaler, CronHorizontalAutoscaler, CronHorizontalAutoscalerSchedule, HorizontalAutoscaler,
};
use crate::logging::LogElapsed;
use crate::resources::common::{
    api_error, extract_provider_data, has_change, immutable_changes, not_configured, object,
    optional_bool, optional_string, required_i64, required_string, state_id,
};

const IMMUTABLE_ARGS: &[&str] = &["environment_id", "application_id"];

const METRICS: &[&str] = &["CPU", "MEMORY", "CPU_UTILIZATION", "MEMORY_UTILIZATION"];

/// (environment_id, application_id, autoscaler_id)
type ScaleRuleIds = (String, String, String);

/// `environmentId#applicationId#autoscalerId`
fn rule_id(ids: &ScaleRuleIds) -> Result<String, Diagnostic> {
    ResourceHandle::composite([ids.0.as_str(), ids.1.as_str(), ids.2.as_str()])
        .map(|handle| handle.to_string())
        .map_err(|e| Diagnostic::error("Invalid resource id", e.to_string()))
}

#[derive(Default)]
pub struct TemScaleRuleResource {
    provider_data: Option<crate::TencentCloudProviderData>,
}

fn horizontal_autoscaler_block() -> NestedBlock {
    NestedBlockBuilder::new("horizontal_autoscaler", NestingMode::List)
        .description("Metric-driven scaling policies")
        .attribute(
            AttributeBuilder::new("metrics", AttributeType::String)
                .description("Metric to scale on")
                .required()
                .validator(Box::new(OneOfValidator::new(METRICS)))
                .build(),
        )
        .attribute(
            AttributeBuilder::new("enabled", AttributeType::Bool)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("max_replicas", AttributeType::Number)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("min_replicas", AttributeType::Number)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("threshold", AttributeType::Number)
                .description("Metric value that triggers scaling")
                .required()
                .build(),
        )
        .build()
}

fn cron_horizontal_autoscaler_block() -> NestedBlock {
    let schedules = NestedBlockBuilder::new("schedules", NestingMode::List)
        .min_items(1)
        .attribute(
            AttributeBuilder::new("start_at", AttributeType::String)
                .description("Window start, HH:MM")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("target_replicas", AttributeType::Number)
                .required()
                .build(),
        )
        .build();

    NestedBlockBuilder::new("cron_horizontal_autoscaler", NestingMode::List)
        .description("Scheduled scaling policies")
        .attribute(
            AttributeBuilder::new("name", AttributeType::String)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("period", AttributeType::String)
                .description("Crontab expression selecting the days the policy runs")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("priority", AttributeType::Number)
                .description("Higher value wins when policies overlap")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("enabled", AttributeType::Bool)
                .required()
                .build(),
        )
        .block(schedules)
        .build()
}

fn autoscaler_block() -> NestedBlock {
    NestedBlockBuilder::new("autoscaler", NestingMode::List)
        .description("Scale rule definition")
        .min_items(1)
        .max_items(1)
        .attribute(
            AttributeBuilder::new("autoscaler_name", AttributeType::String)
                .description("Rule name")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("description", AttributeType::String)
                .optional()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("enabled", AttributeType::Bool)
                .description("Whether the rule is active")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("min_replicas", AttributeType::Number)
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("max_replicas", AttributeType::Number)
                .required()
                .build(),
        )
        .block(horizontal_autoscaler_block())
        .block(cron_horizontal_autoscaler_block())
        .build()
}

fn extract_autoscaler(config: &DynamicValue) -> Result<Autoscaler, Diagnostic> {
    let block = config
        .get_first_object(&AttributePath::new("autoscaler"))
        .ok()
        .flatten()
        .ok_or_else(|| {
            Diagnostic::error("Missing autoscaler", "An autoscaler block is required")
                .with_attribute(AttributePath::new("autoscaler"))
        })?;

    let horizontal_autoscaler = block
        .get_object_list(&AttributePath::new("horizontal_autoscaler"))
        .unwrap_or_default()
        .iter()
        .map(|policy| {
            Ok(HorizontalAutoscaler {
                metrics: required_string(policy, "metrics")?,
                enabled: optional_bool(policy, "enabled").unwrap_or(false),
                max_replicas: required_i64(policy, "max_replicas")?,
                min_replicas: required_i64(policy, "min_replicas")?,
                threshold: required_i64(policy, "threshold")?,
            })
        })
        .collect::<Result<Vec<_>, Diagnostic>>()?;

    let cron_horizontal_autoscaler = block
        .get_object_list(&AttributePath::new("cron_horizontal_autoscaler"))
        .unwrap_or_default()
        .iter()
        .map(|policy| {
            let schedules = policy
                .get_object_list(&AttributePath::new("schedules"))
                .unwrap_or_default()
                .iter()
                .map(|schedule| {
                    Ok(CronHorizontalAutoscalerSchedule {
                        start_at: required_string(schedule, "start_at")?,
                        target_replicas: required_i64(schedule, "target_replicas")?,
                    })
                })
                .collect::<Result<Vec<_>, Diagnostic>>()?;
            Ok(CronHorizontalAutoscaler {
                name: required_string(policy, "name")?,
                period: required_string(policy, "period")?,
                priority: required_i64(policy, "priority")?,
                enabled: optional_bool(policy, "enabled").unwrap_or(false),
                schedules,
            })
        })
        .collect::<Result<Vec<_>, Diagnostic>>()?;

    Ok(Autoscaler {
        autoscaler_id: None,
        autoscaler_name: required_string(&block, "autoscaler_name")?,
        description: optional_string(&block, "description"),
        enabled: optional_bool(&block, "enabled").unwrap_or(false),
        min_replicas: required_i64(&block, "min_replicas")?,
        max_replicas: required_i64(&block, "max_replicas")?,
        horizontal_autoscaler,
        cron_horizontal_autoscaler,
    })
}

fn autoscaler_value(autoscaler: &Autoscaler) -> Vec<Dynamic> {
    let policies = autoscaler
        .horizontal_autoscaler
        .iter()
        .map(|p| {
            object(vec![
                ("metrics", Dynamic::from(p.metrics.as_str())),
                ("enabled", Dynamic::from(p.enabled)),
                ("max_replicas", Dynamic::from(p.max_replicas)),
                ("min_replicas", Dynamic::from(p.min_replicas)),
                ("threshold", Dynamic::from(p.threshold)),
            ])
        })
        .collect();

    let cron_policies = autoscaler
        .cron_horizontal_autoscaler
        .iter()
        .map(|p| {
            let schedules = p
                .schedules
                .iter()
                .map(|s| {
                    object(vec![
                        ("start_at", Dynamic::from(s.start_at.as_str())),
                        ("target_replicas", Dynamic::from(s.target_replicas)),
                    ])
                })
                .collect();
            object(vec![
                ("name", Dynamic::from(p.name.as_str())),
                ("period", Dynamic::from(p.period.as_str())),
                ("priority", Dynamic::from(p.priority)),
                ("enabled", Dynamic::from(p.enabled)),
                ("schedules", Dynamic::List(schedules)),
            ])
        })
        .collect();

    let mut fields = vec![
        ("autoscaler_name", Dynamic::from(autoscaler.autoscaler_name.as_str())),
        ("enabled", Dynamic::from(autoscaler.enabled)),
        ("min_replicas", Dynamic::from(autoscaler.min_replicas)),
        ("max_replicas", Dynamic::from(autoscaler.max_replicas)),
        ("horizontal_autoscaler", Dynamic::List(policies)),
        ("cron_horizontal_autoscaler", Dynamic::List(cron_policies)),
    ];
    if let Some(description) = &autoscaler.description {
        fields.push(("description", Dynamic::from(description.as_str())));
    }
    vec![object(fields)]
}

impl TemScaleRuleResource {
    pub fn new() -> Self {
        Self::default()
    }

    fn schema_static() -> Schema {
        SchemaBuilder::new()
            .version(0)
            .description("Provides a TEM application scale rule")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Composite id, environmentId#applicationId#autoscalerId")
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("environment_id", AttributeType::String)
                    .description("Environment id")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("application_id", AttributeType::String)
                    .description("Application id")
                    .required()
                    .force_new()
                    .build(),
            )
            .attribute(
                AttributeBuilder::new("autoscaler_id", AttributeType::String)
                    .description("Autoscaler id")
                    .computed()
                    .build(),
            )
            .block(autoscaler_block())
            .build()
    }

    fn ids(state: &DynamicValue) -> Result<ScaleRuleIds, Diagnostic> {
        let id = state_id(state)?;
        let handle = ResourceHandle::parse(&id, 3)
            .map_err(|e| Diagnostic::error("Invalid resource id", e.to_string()))?;
        match handle.parts() {
            [environment_id, application_id, autoscaler_id] => Ok((
                environment_id.clone(),
                application_id.clone(),
                autoscaler_id.clone(),
            )),
            _ => Err(Diagnostic::error("Invalid resource id", id)),
        }
    }

    async fn read_rule(
        provider_data: &crate::TencentCloudProviderData,
        ids: &ScaleRuleIds,
        mut state: DynamicValue,
    ) -> Result<Option<DynamicValue>, Diagnostic> {
        let id = rule_id(ids)?;
        let (environment_id, application_id, autoscaler_id) = ids;
        let autoscaler = provider_data
            .client
            .tem()
            .describe_autoscaler(environment_id, application_id, autoscaler_id)
            .await
            .map_err(|e| api_error("Failed to read TEM scale rule", e))?;
        let Some(autoscaler) = autoscaler else {
            return Ok(None);
        };

        let _ = state.set_string(&AttributePath::new("id"), id);
        let _ = state.set_string(&AttributePath::new("environment_id"), environment_id.clone());
        let _ = state.set_string(&AttributePath::new("application_id"), application_id.clone());
        let _ = state.set_string(&AttributePath::new("autoscaler_id"), autoscaler_id.clone());
        let _ = state.set_list(&AttributePath::new("autoscaler"), autoscaler_value(&autoscaler));
        Ok(Some(state))
    }
}

#[async_trait]
impl Resource for TemScaleRuleResource {
    fn type_name(&self) -> &str {
        "tencentcloud_tem_scale_rule"
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

        if diagnostics.is_empty() {
            if let Ok(autoscaler) = extract_autoscaler(&request.config) {
                if autoscaler.min_replicas > autoscaler.max_replicas {
                    diagnostics.push(
                        Diagnostic::error(
                            "Invalid autoscaler",
                            "min_replicas must not exceed max_replicas",
                        )
                        .with_attribute(AttributePath::new("autoscaler")),
                    );
                }
            }
        }

        ValidateResourceConfigResponse { diagnostics }
    }

    async fn create(&self, ctx: Context, request: CreateResourceRequest) -> CreateResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tem_scale_rule.create");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return CreateResourceResponse {
                new_state: request.planned_state,
                diagnostics,
            };
        };

        let config = &request.config;
        let parsed = required_string(config, "environment_id").and_then(|environment_id| {
            let application_id = required_string(config, "application_id")?;
            Ok((environment_id, application_id, extract_autoscaler(config)?))
        });
        let (environment_id, application_id, autoscaler) = match parsed {
            Ok(parsed) => parsed,
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let autoscaler_id = match provider_data
            .client
            .tem()
            .create_autoscaler(&environment_id, &application_id, &autoscaler)
            .await
        {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "create tem scale rule failed: {}", e);
                diagnostics.push(api_error("Failed to create TEM scale rule", e));
                return CreateResourceResponse {
                    new_state: request.planned_state,
                    diagnostics,
                };
            }
        };

        let ids = (environment_id, application_id, autoscaler_id);
        let mut new_state = request.planned_state;
        match rule_id(&ids) {
            Ok(id) => {
                let _ = new_state.set_string(&AttributePath::new("id"), id);
            }
            Err(diag) => {
                diagnostics.push(diag);
                return CreateResourceResponse {
                    new_state,
                    diagnostics,
                };
            }
        }
        let _ = new_state.set_string(&AttributePath::new("autoscaler_id"), ids.2.clone());

        match Self::read_rule(provider_data, &ids, new_state.clone()).await {
            Ok(Some(state)) => new_state = state,
            Ok(None) => diagnostics.push(Diagnostic::error(
                "TEM scale rule disappeared",
                format!("Autoscaler {} was not found right after creation", ids.2),
            )),
            Err(diag) => diagnostics.push(diag),
        }

        CreateResourceResponse {
            new_state,
            diagnostics,
        }
    }

    async fn read(&self, ctx: Context, request: ReadResourceRequest) -> ReadResourceResponse {
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tem_scale_rule.read");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return ReadResourceResponse {
                new_state: Some(request.current_state),
                diagnostics,
            };
        };

        let ids = match Self::ids(&request.current_state) {
            Ok(ids) => ids,
            Err(diag) => {
                diagnostics.push(diag);
                return ReadResourceResponse {
                    new_state: Some(request.current_state),
                    diagnostics,
                };
            }
        };

        match Self::read_rule(provider_data, &ids, request.current_state.clone()).await {
            Ok(Some(state)) => ReadResourceResponse {
                new_state: Some(state),
                diagnostics,
            },
            Ok(None) => {
                tracing::warn!(
                    log_id = ctx.log_id(),
                    "resource `TemScaleRule` [{}#{}#{}] not found, please check if it has been deleted",
                    ids.0,
                    ids.1,
                    ids.2
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tem_scale_rule.update");
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

        let ids = match Self::ids(&request.prior_state) {
            Ok(ids) => ids,
            Err(diag) => {
                diagnostics.push(diag);
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        };

        if has_change(&request.prior_state, &request.planned_state, "autoscaler") {
            let autoscaler = match extract_autoscaler(&request.planned_state) {
                Ok(autoscaler) => autoscaler,
                Err(diag) => {
                    diagnostics.push(diag);
                    return UpdateResourceResponse {
                        new_state: request.prior_state,
                        diagnostics,
                    };
                }
            };

            let (environment_id, application_id, autoscaler_id) = &ids;
            if let Err(e) = provider_data
                .client
                .tem()
                .modify_autoscaler(environment_id, application_id, autoscaler_id, &autoscaler)
                .await
            {
                tracing::error!(log_id = ctx.log_id(), "update tem scale rule failed: {}", e);
                diagnostics.push(api_error("Failed to update TEM scale rule", e));
                return UpdateResourceResponse {
                    new_state: request.prior_state,
                    diagnostics,
                };
            }
        }

        let new_state = match Self::read_rule(provider_data, &ids, request.planned_state.clone()).await {
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
        let _elapsed = LogElapsed::new(&ctx, "resource.tencentcloud_tem_scale_rule.delete");
        let mut diagnostics = vec![];

        let Some(provider_data) = &self.provider_data else {
            diagnostics.push(not_configured());
            return DeleteResourceResponse { diagnostics };
        };

        let (environment_id, application_id, autoscaler_id) = match Self::ids(&request.prior_state) {
            Ok(ids) => ids,
            Err(diag) => {
                diagnostics.push(diag);
                return DeleteResourceResponse { diagnostics };
            }
        };

        let api = provider_data.client.tem();
        match api
            .disable_autoscaler(&environment_id, &application_id, &autoscaler_id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return DeleteResourceResponse { diagnostics },
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "disable tem scale rule failed: {}", e);
                diagnostics.push(api_error("Failed to disable TEM scale rule", e));
                return DeleteResourceResponse { diagnostics };
            }
        }

        match api
            .delete_autoscaler(&environment_id, &application_id, &autoscaler_id)
            .await
        {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                tracing::error!(log_id = ctx.log_id(), "delete tem scale rule failed: {}", e);
                diagnostics.push(api_error("Failed to delete TEM scale rule", e));
            }
        }

        DeleteResourceResponse { diagnostics }
    }
}

#[async_trait]
impl ResourceWithConfigure for TemScaleRuleResource {
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
impl ResourceWithImportState for TemScaleRuleResource {
    async fn import_state(
        &self,
        ctx: Context,
        request: ImportResourceStateRequest,
    ) -> ImportResourceStateResponse {
        let mut response = ImportResourceStateResponse::default();
        import_state_composite_id(
            &ctx,
            &["environment_id", "application_id", "autoscaler_id"],
            &request,
            &mut response,
        );
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_provider_data, dynamic_object, envelope};
    use crate::resources::common::single_block;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn rule_config(max_replicas: i64) -> DynamicValue {
        dynamic_object(vec![
            ("environment_id", Dynamic::from("en-1")),
            ("application_id", Dynamic::from("app-1")),
            (
                "autoscaler",
                Dynamic::List(single_block(vec![
                    ("autoscaler_name", Dynamic::from("cpu-rule")),
                    ("enabled", Dynamic::from(true)),
                    ("min_replicas", Dynamic::from(1i64)),
                    ("max_replicas", Dynamic::from(max_replicas)),
                    (
                        "horizontal_autoscaler",
                        Dynamic::List(vec![object(vec![
                            ("metrics", Dynamic::from("CPU")),
                            ("enabled", Dynamic::from(true)),
                            ("min_replicas", Dynamic::from(1i64)),
                            ("max_replicas", Dynamic::from(max_replicas)),
                            ("threshold", Dynamic::from(60i64)),
                        ])]),
                    ),
                ])),
            ),
        ])
    }

    fn list_body(max_replicas: i64) -> String {
        envelope(json!({"Result": [{
            "AutoscalerId": "as-1",
            "AutoscalerName": "cpu-rule",
            "Enabled": true,
            "MinReplicas": 1,
            "MaxReplicas": max_replicas,
            "HorizontalAutoscaler": [{
                "Metrics": "CPU", "Enabled": true, "MinReplicas": 1,
                "MaxReplicas": max_replicas, "Threshold": 60
            }]
        }]}))
    }

    async fn configured(url: &str) -> TemScaleRuleResource {
        let mut resource = TemScaleRuleResource::new();
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

    #[test]
    fn extract_autoscaler_reads_nested_policies() {
        let autoscaler = extract_autoscaler(&rule_config(4)).unwrap();
        assert_eq!(autoscaler.autoscaler_name, "cpu-rule");
        assert_eq!(autoscaler.horizontal_autoscaler.len(), 1);
        assert_eq!(autoscaler.horizontal_autoscaler[0].threshold, 60);
    }

    #[tokio::test]
    async fn validate_rejects_inverted_replica_bounds() {
        let resource = TemScaleRuleResource::new();
        let mut config = rule_config(4);
        let mut block = config
            .get_first_object(&AttributePath::new("autoscaler"))
            .unwrap()
            .unwrap();
        block.set_i64(&AttributePath::new("min_replicas"), 9).unwrap();
        config
            .set_list(&AttributePath::new("autoscaler"), vec![block.value])
            .unwrap();

        let response = resource
            .validate(
                Context::new(),
                ValidateResourceConfigRequest {
                    type_name: "tencentcloud_tem_scale_rule".to_string(),
                    config,
                },
            )
            .await;

        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid autoscaler");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_builds_three_part_id() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/")
            .match_header("x-tc-action", "CreateApplicationAutoscaler")
            .match_body(Matcher::PartialJson(json!({
                "EnvironmentId": "en-1",
                "ApplicationId": "app-1",
                "Autoscaler": {"AutoscalerName": "cpu-rule", "MaxReplicas": 4}
            })))
            .with_status(200)
            .with_body(envelope(json!({"Result": "as-1"})))
            .create_async()
            .await;
        let _list = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeApplicationAutoscalerList")
            .with_status(200)
            .with_body(list_body(4))
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "tencentcloud_tem_scale_rule".to_string(),
                    planned_state: rule_config(4),
                    config: rule_config(4),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        create.assert_async().await;
        assert_eq!(
            response.new_state.get_string(&AttributePath::new("id")).unwrap(),
            "en-1#app-1#as-1"
        );
    }

    fn with_cron_policy(mut config: DynamicValue) -> DynamicValue {
        let mut block = config
            .get_first_object(&AttributePath::new("autoscaler"))
            .unwrap()
            .unwrap();
        block
            .set_list(
                &AttributePath::new("cron_horizontal_autoscaler"),
                vec![object(vec![
                    ("name", Dynamic::from("night")),
                    ("period", Dynamic::from("* * *")),
                    ("priority", Dynamic::from(1i64)),
                    ("enabled", Dynamic::from(true)),
                    (
                        "schedules",
                        Dynamic::List(vec![object(vec![
                            ("start_at", Dynamic::from("00:00")),
                            ("target_replicas", Dynamic::from(2i64)),
                        ])]),
                    ),
                ])],
            )
            .unwrap();
        config
            .set_list(&AttributePath::new("autoscaler"), vec![block.value])
            .unwrap();
        config
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cron_policy_is_sent_and_read_back() {
        let mut server = Server::new_async().await;
        let create = server
            .mock("POST", "/")
            .match_header("x-tc-action", "CreateApplicationAutoscaler")
            .match_body(Matcher::PartialJson(json!({
                "Autoscaler": {"CronHorizontalAutoscaler": [{
                    "Name": "night", "Period": "* * *", "Priority": 1, "Enabled": true,
                    "Schedules": [{"StartAt": "00:00", "TargetReplicas": 2}]
                }]}
            })))
            .with_status(200)
            .with_body(envelope(json!({"Result": "as-1"})))
            .expect(1)
            .create_async()
            .await;
        let _list = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeApplicationAutoscalerList")
            .with_status(200)
            .with_body(envelope(json!({"Result": [{
                "AutoscalerId": "as-1",
                "AutoscalerName": "cpu-rule",
                "Enabled": true,
                "MinReplicas": 1,
                "MaxReplicas": 4,
                "CronHorizontalAutoscaler": [{
                    "Name": "night", "Period": "* * *", "Priority": 1, "Enabled": true,
                    "Schedules": [{"StartAt": "00:00", "TargetReplicas": 3}]
                }]
            }]})))
            .create_async()
            .await;

        let config = with_cron_policy(rule_config(4));
        let resource = configured(&server.url()).await;
        let response = resource
            .create(
                Context::new(),
                CreateResourceRequest {
                    type_name: "tencentcloud_tem_scale_rule".to_string(),
                    planned_state: config.clone(),
                    config,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        create.assert_async().await;
        let block = response
            .new_state
            .get_first_object(&AttributePath::new("autoscaler"))
            .unwrap()
            .unwrap();
        let policies = block
            .get_object_list(&AttributePath::new("cron_horizontal_autoscaler"))
            .unwrap();
        assert_eq!(policies.len(), 1);
        assert_eq!(policies[0].get_string(&AttributePath::new("name")).unwrap(), "night");
        let schedules = policies[0]
            .get_object_list(&AttributePath::new("schedules"))
            .unwrap();
        assert_eq!(schedules[0].get_i64(&AttributePath::new("target_replicas")).unwrap(), 3);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn update_modifies_whole_autoscaler() {
        let mut server = Server::new_async().await;
        let modify = server
            .mock("POST", "/")
            .match_header("x-tc-action", "ModifyApplicationAutoscaler")
            .match_body(Matcher::PartialJson(json!({
                "AutoscalerId": "as-1",
                "Autoscaler": {"MaxReplicas": 8}
            })))
            .with_status(200)
            .with_body(envelope(json!({"Result": true})))
            .expect(1)
            .create_async()
            .await;
        let _list = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeApplicationAutoscalerList")
            .with_status(200)
            .with_body(list_body(8))
            .create_async()
            .await;

        let mut prior = rule_config(4);
        prior
            .set_string(&AttributePath::new("id"), "en-1#app-1#as-1".to_string())
            .unwrap();
        let mut planned = rule_config(8);
        planned
            .set_string(&AttributePath::new("id"), "en-1#app-1#as-1".to_string())
            .unwrap();

        let resource = configured(&server.url()).await;
        let response = resource
            .update(
                Context::new(),
                UpdateResourceRequest {
                    type_name: "tencentcloud_tem_scale_rule".to_string(),
                    prior_state: prior,
                    planned_state: planned.clone(),
                    config: planned,
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        modify.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn delete_disables_before_deleting() {
        let mut server = Server::new_async().await;
        let disable = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DisableApplicationAutoscaler")
            .match_body(Matcher::Json(json!({
                "EnvironmentId": "en-1", "ApplicationId": "app-1", "AutoscalerId": "as-1"
            })))
            .with_status(200)
            .with_body(envelope(json!({"Result": true})))
            .expect(1)
            .create_async()
            .await;
        let delete = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DeleteApplicationAutoscaler")
            .with_status(200)
            .with_body(envelope(json!({"Result": true})))
            .expect(1)
            .create_async()
            .await;

        let resource = configured(&server.url()).await;
        let response = resource
            .delete(
                Context::new(),
                DeleteResourceRequest {
                    type_name: "tencentcloud_tem_scale_rule".to_string(),
                    prior_state: dynamic_object(vec![("id", Dynamic::from("en-1#app-1#as-1"))]),
                },
            )
            .await;

        assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
        disable.assert_async().await;
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn import_requires_three_parts() {
        let resource = TemScaleRuleResource::new();
        let ok = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "tencentcloud_tem_scale_rule".to_string(),
                    id: "en-1#app-1#as-1".to_string(),
                },
            )
            .await;
        let state = &ok.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("autoscaler_id")).unwrap(), "as-1");

        let bad = resource
            .import_state(
                Context::new(),
                ImportResourceStateRequest {
                    type_name: "tencentcloud_tem_scale_rule".to_string(),
                    id: "en-1#as-1".to_string(),
                },
            )
            .await;
        assert!(bad.imported_resources.is_empty());
        assert_eq!(bad.diagnostics.len(), 1);
    }
}
