//! TEM API: application autoscalers (scale rules)

use serde::{Deserialize, Serialize};

use super::{ApiError, Client};

pub const SERVICE: &str = "tem";
pub const VERSION: &str = "2021-07-01";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct HorizontalAutoscaler {
    pub metrics: String,
    pub enabled: bool,
    pub max_replicas: i64,
    pub min_replicas: i64,
    pub threshold: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CronHorizontalAutoscalerSchedule {
    /// `HH:MM` start of the window
    pub start_at: String,
    pub target_replicas: i64,
}

/// Time-driven scaling policy; `period` is a crontab expression.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct CronHorizontalAutoscaler {
    pub name: String,
    pub period: String,
    pub priority: i64,
    pub enabled: bool,
    pub schedules: Vec<CronHorizontalAutoscalerSchedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Autoscaler {
    #[serde(skip_serializing)]
    pub autoscaler_id: Option<String>,
    pub autoscaler_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub enabled: bool,
    pub min_replicas: i64,
    pub max_replicas: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub horizontal_autoscaler: Vec<HorizontalAutoscaler>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cron_horizontal_autoscaler: Vec<CronHorizontalAutoscaler>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CreateAutoscalerRequest<'a> {
    environment_id: &'a str,
    application_id: &'a str,
    autoscaler: &'a Autoscaler,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModifyAutoscalerRequest<'a> {
    environment_id: &'a str,
    application_id: &'a str,
    autoscaler_id: &'a str,
    autoscaler: &'a Autoscaler,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AutoscalerKey<'a> {
    environment_id: &'a str,
    application_id: &'a str,
    autoscaler_id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct CreateAutoscalerResponse {
    result: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeAutoscalerListResponse {
    result: Vec<Autoscaler>,
}

#[derive(Debug, Deserialize)]
struct Ack {}

#[derive(Clone, Copy)]
pub struct TemApi<'a> {
    client: &'a Client,
}

impl<'a> TemApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    async fn call<B, T>(&self, action: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: serde::de::DeserializeOwned,
    {
        self.client.call(SERVICE, VERSION, action, body).await
    }

    /// CreateApplicationAutoscaler, returning the autoscaler id
    pub async fn create_autoscaler(
        &self,
        environment_id: &str,
        application_id: &str,
        autoscaler: &Autoscaler,
    ) -> Result<String, ApiError> {
        let request = CreateAutoscalerRequest {
            environment_id,
            application_id,
            autoscaler,
        };
        let response: CreateAutoscalerResponse =
            self.call("CreateApplicationAutoscaler", &request).await?;
        response.result.ok_or_else(|| {
            ApiError::ParseError("CreateApplicationAutoscaler returned no id".to_string())
        })
    }

    /// DescribeApplicationAutoscalerList filtered to one autoscaler
    pub async fn describe_autoscaler(
        &self,
        environment_id: &str,
        application_id: &str,
        autoscaler_id: &str,
    ) -> Result<Option<Autoscaler>, ApiError> {
        let body = serde_json::json!({
            "EnvironmentId": environment_id,
            "ApplicationId": application_id,
        });
        let response: DescribeAutoscalerListResponse =
            match self.call("DescribeApplicationAutoscalerList", &body).await {
                Ok(response) => response,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            };
        Ok(response
            .result
            .into_iter()
            .find(|a| a.autoscaler_id.as_deref() == Some(autoscaler_id)))
    }

    pub async fn modify_autoscaler(
        &self,
        environment_id: &str,
        application_id: &str,
        autoscaler_id: &str,
        autoscaler: &Autoscaler,
    ) -> Result<(), ApiError> {
        let request = ModifyAutoscalerRequest {
            environment_id,
            application_id,
            autoscaler_id,
            autoscaler,
        };
        let _: Ack = self.call("ModifyApplicationAutoscaler", &request).await?;
        Ok(())
    }

    /// An autoscaler must be disabled before it can be deleted
    pub async fn disable_autoscaler(
        &self,
        environment_id: &str,
        application_id: &str,
        autoscaler_id: &str,
    ) -> Result<(), ApiError> {
        let key = AutoscalerKey {
            environment_id,
            application_id,
            autoscaler_id,
        };
        let _: Ack = self.call("DisableApplicationAutoscaler", &key).await?;
        Ok(())
    }

    pub async fn delete_autoscaler(
        &self,
        environment_id: &str,
        application_id: &str,
        autoscaler_id: &str,
    ) -> Result<(), ApiError> {
        let key = AutoscalerKey {
            environment_id,
            application_id,
            autoscaler_id,
        };
        let _: Ack = self.call("DeleteApplicationAutoscaler", &key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, envelope};
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn autoscaler() -> Autoscaler {
        Autoscaler {
            autoscaler_id: None,
            autoscaler_name: "cpu-rule".to_string(),
            description: None,
            enabled: true,
            min_replicas: 1,
            max_replicas: 4,
            horizontal_autoscaler: vec![HorizontalAutoscaler {
                metrics: "CPU".to_string(),
                enabled: true,
                max_replicas: 4,
                min_replicas: 1,
                threshold: 60,
            }],
            cron_horizontal_autoscaler: Vec::new(),
        }
    }

    #[test]
    fn autoscaler_id_is_never_sent() {
        let mut rule = autoscaler();
        rule.autoscaler_id = Some("as-1".to_string());
        let value = serde_json::to_value(&rule).unwrap();
        assert!(value.get("AutoscalerId").is_none());
        assert_eq!(value["HorizontalAutoscaler"][0]["Threshold"], 60);
        assert!(value.get("CronHorizontalAutoscaler").is_none());
    }

    #[test]
    fn cron_policy_serializes_schedules() {
        let mut rule = autoscaler();
        rule.cron_horizontal_autoscaler = vec![CronHorizontalAutoscaler {
            name: "night".to_string(),
            period: "* * *".to_string(),
            priority: 1,
            enabled: true,
            schedules: vec![CronHorizontalAutoscalerSchedule {
                start_at: "00:00".to_string(),
                target_replicas: 2,
            }],
        }];
        let value = serde_json::to_value(&rule).unwrap();
        assert_eq!(
            value["CronHorizontalAutoscaler"][0]["Schedules"][0],
            json!({"StartAt": "00:00", "TargetReplicas": 2})
        );
        assert_eq!(value["CronHorizontalAutoscaler"][0]["Priority"], 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_autoscaler_returns_result_id() {
        let mut server = Server::new_async().await;
        let mock = server
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

        let client = create_test_client(&server.url());
        let id = client
            .tem()
            .create_autoscaler("en-1", "app-1", &autoscaler())
            .await
            .unwrap();

        assert_eq!(id, "as-1");
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn describe_autoscaler_picks_matching_id() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeApplicationAutoscalerList")
            .with_status(200)
            .with_body(envelope(json!({"Result": [
                {"AutoscalerId": "as-0", "AutoscalerName": "other"},
                {"AutoscalerId": "as-1", "AutoscalerName": "cpu-rule", "Enabled": true, "MinReplicas": 1, "MaxReplicas": 4}
            ]})))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let found = client
            .tem()
            .describe_autoscaler("en-1", "app-1", "as-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.autoscaler_name, "cpu-rule");
        assert_eq!(found.max_replicas, 4);

        let missing = client
            .tem()
            .describe_autoscaler("en-1", "app-1", "as-9")
            .await
            .unwrap();
        assert!(missing.is_none());
    }
}
