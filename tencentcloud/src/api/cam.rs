//! CAM API: roles and service-linked roles

use serde::{Deserialize, Serialize};
use tfplug::{Observation, PollSpec};

use super::common::{deserialize_int_bool_option, string_or_number, Tag};
use super::{ApiError, Client, READ_RETRY_TIMEOUT};

pub const SERVICE: &str = "cam";
pub const VERSION: &str = "2019-01-16";

pub const ROLE_VISIBLE: &str = "VISIBLE";
pub const ROLE_NOT_VISIBLE: &str = "NOT_VISIBLE";

pub const DELETION_IN_PROGRESS: &str = "IN_PROGRESS";
pub const DELETION_NOT_STARTED: &str = "NOT_STARTED";
pub const DELETION_SUCCEEDED: &str = "SUCCEEDED";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRoleRequest {
    pub role_name: String,
    pub policy_document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub console_login: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct RoleIdResponse {
    #[serde(with = "string_or_number")]
    role_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct RoleInfo {
    #[serde(with = "string_or_number")]
    pub role_id: Option<String>,
    pub role_name: Option<String>,
    pub policy_document: Option<String>,
    pub description: Option<String>,
    pub add_time: Option<String>,
    pub update_time: Option<String>,
    #[serde(deserialize_with = "deserialize_int_bool_option")]
    pub console_login: Option<bool>,
    pub role_type: Option<String>,
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct GetRoleResponse {
    role_info: Option<RoleInfo>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateServiceLinkedRoleRequest {
    #[serde(rename = "QCSServiceName")]
    pub qcs_service_name: Vec<String>,
    #[serde(rename = "CustomSuffix", skip_serializing_if = "Option::is_none")]
    pub custom_suffix: Option<String>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "Tags", skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DeleteServiceLinkedRoleResponse {
    deletion_task_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DeletionStatusResponse {
    status: Option<String>,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ack {}

/// Wait for a freshly created role to become readable
pub fn role_visible_spec() -> PollSpec {
    PollSpec::for_create(&[ROLE_NOT_VISIBLE], &[ROLE_VISIBLE], READ_RETRY_TIMEOUT)
}

/// Wait for a service-linked role deletion task to finish
pub fn deletion_task_spec() -> PollSpec {
    PollSpec::for_update(
        &[DELETION_IN_PROGRESS, DELETION_NOT_STARTED],
        &[DELETION_SUCCEEDED],
        READ_RETRY_TIMEOUT,
    )
}

#[derive(Clone, Copy)]
pub struct CamApi<'a> {
    client: &'a Client,
}

impl<'a> CamApi<'a> {
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

    /// CreateRole, returning the role id
    pub async fn create_role(&self, request: &CreateRoleRequest) -> Result<String, ApiError> {
        let response: RoleIdResponse = self.call("CreateRole", request).await?;
        response
            .role_id
            .ok_or_else(|| ApiError::ParseError("CreateRole returned no RoleId".to_string()))
    }

    /// GetRole; a role that does not exist maps to `None`
    pub async fn get_role(&self, role_id: &str) -> Result<Option<RoleInfo>, ApiError> {
        let body = serde_json::json!({ "RoleId": role_id });
        match self.call::<_, GetRoleResponse>("GetRole", &body).await {
            Ok(response) => Ok(response.role_info),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn update_role_description(&self, role_id: &str, description: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "RoleId": role_id, "Description": description });
        let _: Ack = self.call("UpdateRoleDescription", &body).await?;
        Ok(())
    }

    pub async fn update_assume_role_policy(&self, role_id: &str, document: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "RoleId": role_id, "PolicyDocument": document });
        let _: Ack = self.call("UpdateAssumeRolePolicy", &body).await?;
        Ok(())
    }

    pub async fn delete_role(&self, role_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "RoleId": role_id });
        let _: Ack = self.call("DeleteRole", &body).await?;
        Ok(())
    }

    /// Describer used right after CreateRole while reads may still miss
    pub async fn role_visibility(&self, role_id: &str) -> Result<Observation, ApiError> {
        Ok(match self.get_role(role_id).await? {
            Some(_) => Observation::status(ROLE_VISIBLE),
            None => Observation::status(ROLE_NOT_VISIBLE),
        })
    }

    /// CreateServiceLinkedRole, returning the role id
    pub async fn create_service_linked_role(
        &self,
        request: &CreateServiceLinkedRoleRequest,
    ) -> Result<String, ApiError> {
        let response: RoleIdResponse = self.call("CreateServiceLinkedRole", request).await?;
        response.role_id.ok_or_else(|| {
            ApiError::ParseError("CreateServiceLinkedRole returned no RoleId".to_string())
        })
    }

    /// DeleteServiceLinkedRole, returning the deletion task id
    pub async fn delete_service_linked_role(&self, role_name: &str) -> Result<String, ApiError> {
        let body = serde_json::json!({ "RoleName": role_name });
        let response: DeleteServiceLinkedRoleResponse =
            self.call("DeleteServiceLinkedRole", &body).await?;
        response.deletion_task_id.ok_or_else(|| {
            ApiError::ParseError("DeleteServiceLinkedRole returned no DeletionTaskId".to_string())
        })
    }

    pub async fn deletion_status(&self, task_id: &str) -> Result<Observation, ApiError> {
        let body = serde_json::json!({ "DeletionTaskId": task_id });
        let response: DeletionStatusResponse =
            self.call("GetServiceLinkedRoleDeletionStatus", &body).await?;
        if let Some(reason) = response.reason.as_deref().filter(|r| !r.is_empty()) {
            tracing::debug!("deletion task {} reason: {}", task_id, reason);
        }
        Ok(response.status.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, envelope};
    use mockito::{Matcher, Server};
    use serde_json::json;
    use tfplug::{converge, ConvergeError, Context};

    #[test]
    fn service_linked_role_request_uses_qcs_field_name() {
        let request = CreateServiceLinkedRoleRequest {
            qcs_service_name: vec!["tke.qcloud.com".to_string()],
            custom_suffix: Some("x".to_string()),
            ..Default::default()
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["QCSServiceName"], json!(["tke.qcloud.com"]));
        assert_eq!(value["CustomSuffix"], "x");
        assert!(value.get("Tags").is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn create_role_accepts_numeric_role_id() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("x-tc-action", "CreateRole")
            .match_body(Matcher::PartialJson(json!({"RoleName": "ops", "ConsoleLogin": 1})))
            .with_status(200)
            .with_body(envelope(json!({"RoleId": 4611686018427397919u64})))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let id = client
            .cam()
            .create_role(&CreateRoleRequest {
                role_name: "ops".to_string(),
                policy_document: "{}".to_string(),
                console_login: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(id, "4611686018427397919");
        mock.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_role_maps_missing_role_to_none() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_header("x-tc-action", "GetRole")
            .with_status(200)
            .with_body(envelope(json!({
                "Error": {"Code": "InvalidParameter.RoleNotExist", "Message": "role not exist"}
            })))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        assert!(client.cam().get_role("123").await.unwrap().is_none());
        assert_eq!(
            client.cam().role_visibility("123").await.unwrap(),
            Observation::status(ROLE_NOT_VISIBLE)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn get_role_decodes_console_login_flag() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(envelope(json!({
                "RoleInfo": {
                    "RoleId": "123",
                    "RoleName": "ops",
                    "PolicyDocument": "{}",
                    "ConsoleLogin": 0,
                    "AddTime": "2024-01-01 00:00:00"
                }
            })))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let role = client.cam().get_role("123").await.unwrap().unwrap();
        assert_eq!(role.role_name.as_deref(), Some("ops"));
        assert_eq!(role.console_login, Some(false));
        assert_eq!(role.add_time.as_deref(), Some("2024-01-01 00:00:00"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deletion_task_converges_on_succeeded() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_header("x-tc-action", "GetServiceLinkedRoleDeletionStatus")
            .match_body(Matcher::Json(json!({"DeletionTaskId": "task-1"})))
            .with_status(200)
            .with_body(envelope(json!({"Status": "SUCCEEDED"})))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let api = client.cam();
        converge(&Context::new(), "task-1", &deletion_task_spec(), move |h| async move {
            api.deletion_status(&h).await
        })
        .await
        .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_deletion_task_is_unexpected() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(envelope(json!({"Status": "FAILED", "Reason": "in use"})))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let api = client.cam();
        let result = converge(&Context::new(), "task-1", &deletion_task_spec(), move |h| async move {
            api.deletion_status(&h).await
        })
        .await;

        assert!(matches!(result, Err(ConvergeError::UnexpectedState { .. })));
    }
}
