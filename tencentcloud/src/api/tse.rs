//! TSE (microservice engine) API: registry instances, cloud native gateways
//! and gateway groups

use serde::{Deserialize, Serialize};
use tfplug::{Observation, PollSpec, ResourceHandle};

use super::common::{Filter, Paging};
use super::{ApiError, Client, Operation, READ_RETRY_TIMEOUT};

pub const SERVICE: &str = "tse";
pub const VERSION: &str = "2020-12-07";

/// Tag service resource types
pub const INSTANCE_RESOURCE_TYPE: &str = "instance";
pub const GATEWAY_RESOURCE_TYPE: &str = "gateway";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct EngineAdmin {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InstanceTagInfo {
    pub tag_key: String,
    pub tag_value: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateEngineRequest {
    pub engine_type: String,
    pub engine_version: String,
    pub engine_product_version: String,
    pub engine_region: String,
    pub engine_name: String,
    pub trade_type: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_resource_spec: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_node_num: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_admin: Option<EngineAdmin>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepaid_period: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prepaid_renew_flag: Option<i64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub engine_tags: Vec<InstanceTagInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateEngineResponse {
    instance_id: String,
}

/// One registry engine as reported by DescribeSREInstances
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct SreInstance {
    pub instance_id: String,
    pub name: Option<String>,
    pub edition: Option<String>,
    pub status: Option<String>,
    pub spec_id: Option<String>,
    pub replica: Option<i64>,
    #[serde(rename = "Type")]
    pub engine_type: Option<String>,
    pub version: Option<String>,
    pub feature_version: Option<String>,
    pub vpc_id: Option<String>,
    pub subnet_ids: Vec<String>,
    pub engine_region: Option<String>,
    pub trade_type: Option<i64>,
    pub enable_internet: Option<bool>,
    pub create_time: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeSreInstancesRequest {
    filters: Vec<Filter>,
    limit: u64,
    offset: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeSreInstancesResponse {
    content: Vec<SreInstance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct NodeConfig {
    pub specification: String,
    pub number: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct VpcConfig {
    pub vpc_id: String,
    pub subnet_id: String,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGatewayRequest {
    pub name: String,
    #[serde(rename = "Type")]
    pub gateway_type: String,
    pub gateway_version: String,
    pub node_config: NodeConfig,
    pub vpc_config: VpcConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_cls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_max_bandwidth_out: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_class_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_type: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct GatewayIdResult {
    gateway_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateGatewayResponse {
    result: GatewayIdResult,
}

/// Cloud native API gateway as reported by DescribeCloudNativeAPIGateway(s)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Gateway {
    pub gateway_id: String,
    pub status: Option<String>,
    pub name: Option<String>,
    #[serde(rename = "Type")]
    pub gateway_type: Option<String>,
    pub gateway_version: Option<String>,
    pub node_config: Option<NodeConfig>,
    pub vpc_config: Option<VpcConfig>,
    pub description: Option<String>,
    pub create_time: Option<String>,
    pub enable_cls: Option<bool>,
    pub feature_version: Option<String>,
    pub internet_max_bandwidth_out: Option<u64>,
    pub engine_region: Option<String>,
    pub ingress_class_name: Option<String>,
    pub trade_type: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeGatewayResponse {
    result: Option<Gateway>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayList {
    pub total_count: u64,
    pub gateway_list: Vec<Gateway>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeGatewaysResponse {
    result: Option<GatewayList>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyGatewayRequest {
    pub gateway_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_cls: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateGroupRequest {
    pub gateway_id: String,
    pub name: String,
    pub node_config: NodeConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_max_bandwidth_out: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct GroupIdResult {
    group_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CreateGroupResponse {
    result: GroupIdResult,
}

/// Gateway node group
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayGroup {
    pub group_id: String,
    pub gateway_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub node_config: Option<NodeConfig>,
    pub status: Option<String>,
    pub create_time: Option<String>,
    pub modify_time: Option<String>,
    pub is_first_group: Option<bool>,
    pub internet_max_bandwidth_out: Option<u64>,
    pub subnet_ids: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct GatewayGroupList {
    pub total_count: u64,
    pub gateway_group_list: Vec<GatewayGroup>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeGroupsRequest<'a> {
    gateway_id: &'a str,
    #[serde(skip_serializing_if = "<[Filter]>::is_empty")]
    filters: &'a [Filter],
    #[serde(flatten)]
    paging: Paging,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeGroupsResponse {
    result: Option<GatewayGroupList>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ModifyGroupRequest {
    pub gateway_id: String,
    pub group_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Response bodies we only need to acknowledge
#[derive(Debug, Deserialize)]
struct Ack {}

/// TSE wait window: registry engines take far longer than other objects
pub fn wait_timeout() -> std::time::Duration {
    7 * READ_RETRY_TIMEOUT
}

pub fn instance_spec(op: Operation) -> PollSpec {
    match op {
        Operation::Create => {
            PollSpec::for_create(&["creating", "restarting"], &["running"], wait_timeout())
        }
        Operation::Update => {
            PollSpec::for_update(&["updating", "restarting"], &["running"], wait_timeout())
        }
        Operation::Delete => PollSpec::for_delete(&["destroying"], wait_timeout()),
    }
}

pub fn gateway_spec(op: Operation) -> PollSpec {
    match op {
        Operation::Create => PollSpec::for_create(&["Creating"], &["Running"], wait_timeout()),
        Operation::Update => PollSpec::for_update(&["Modifying"], &["Running"], wait_timeout()),
        Operation::Delete => PollSpec::for_delete(&["Deleting"], wait_timeout()),
    }
}

pub fn group_spec(op: Operation) -> PollSpec {
    gateway_spec(op)
}

/// TSE API for engines, gateways and gateway groups
#[derive(Clone, Copy)]
pub struct TseApi<'a> {
    client: &'a Client,
}

impl<'a> TseApi<'a> {
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

    /// CreateEngine, returning the new instance id
    pub async fn create_engine(&self, request: &CreateEngineRequest) -> Result<String, ApiError> {
        let response: CreateEngineResponse = self.call("CreateEngine", request).await?;
        Ok(response.instance_id)
    }

    /// DescribeSREInstances filtered by InstanceId
    pub async fn describe_instance(&self, instance_id: &str) -> Result<Option<SreInstance>, ApiError> {
        let request = DescribeSreInstancesRequest {
            filters: vec![Filter::single("InstanceId", instance_id)],
            limit: 1,
            offset: 0,
        };
        let response: DescribeSreInstancesResponse =
            match self.call("DescribeSREInstances", &request).await {
                Ok(response) => response,
                Err(e) if e.is_not_found() => return Ok(None),
                Err(e) => return Err(e),
            };
        Ok(response.content.into_iter().next())
    }

    pub async fn update_engine_internet_access(
        &self,
        instance_id: &str,
        engine_type: &str,
        enable: bool,
    ) -> Result<(), ApiError> {
        let body = serde_json::json!({
            "InstanceId": instance_id,
            "EngineType": engine_type,
            "EnableClientInternetAccess": enable,
        });
        let _: Ack = self.call("UpdateEngineInternetAccess", &body).await?;
        Ok(())
    }

    pub async fn delete_engine(&self, instance_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "InstanceId": instance_id });
        let _: Ack = self.call("DeleteEngine", &body).await?;
        Ok(())
    }

    pub async fn instance_status(&self, instance_id: &str) -> Result<Observation, ApiError> {
        Ok(match self.describe_instance(instance_id).await? {
            Some(instance) => Observation::Status(instance.status.unwrap_or_default()),
            None => Observation::NotFound,
        })
    }

    /// CreateCloudNativeAPIGateway, returning the new gateway id
    pub async fn create_gateway(&self, request: &CreateGatewayRequest) -> Result<String, ApiError> {
        let response: CreateGatewayResponse =
            self.call("CreateCloudNativeAPIGateway", request).await?;
        Ok(response.result.gateway_id)
    }

    /// DescribeCloudNativeAPIGateway; `ResourceNotFound.*` maps to `None`
    pub async fn describe_gateway(&self, gateway_id: &str) -> Result<Option<Gateway>, ApiError> {
        let body = serde_json::json!({ "GatewayId": gateway_id });
        match self
            .call::<_, DescribeGatewayResponse>("DescribeCloudNativeAPIGateway", &body)
            .await
        {
            Ok(response) => Ok(response.result),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// DescribeCloudNativeAPIGateways, following pages until a short one
    pub async fn describe_gateways(&self, filters: &[Filter]) -> Result<GatewayList, ApiError> {
        let mut paging = Paging::default();
        let mut gateways = GatewayList::default();

        loop {
            let mut body = serde_json::json!({
                "Offset": paging.offset,
                "Limit": paging.limit,
            });
            if !filters.is_empty() {
                body["Filters"] = serde_json::to_value(filters)
                    .map_err(|e| ApiError::ParseError(e.to_string()))?;
            }

            let response: DescribeGatewaysResponse =
                self.call("DescribeCloudNativeAPIGateways", &body).await?;
            let Some(page) = response.result else {
                break;
            };
            gateways.total_count = page.total_count;
            let received = page.gateway_list.len();
            gateways.gateway_list.extend(page.gateway_list);

            if paging.is_last(received) {
                break;
            }
            paging = paging.next();
        }

        Ok(gateways)
    }

    pub async fn modify_gateway(&self, request: &ModifyGatewayRequest) -> Result<(), ApiError> {
        let _: Ack = self.call("ModifyCloudNativeAPIGateway", request).await?;
        Ok(())
    }

    /// DeleteCloudNativeAPIGateway; an already missing gateway is not an error
    pub async fn delete_gateway(&self, gateway_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "GatewayId": gateway_id });
        match self.call::<_, Ack>("DeleteCloudNativeAPIGateway", &body).await {
            Ok(_) => Ok(()),
            Err(e) if e.is_not_found() => {
                tracing::warn!("gateway {} already deleted: {}", gateway_id, e);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn gateway_status(&self, gateway_id: &str) -> Result<Observation, ApiError> {
        Ok(match self.describe_gateway(gateway_id).await? {
            Some(gateway) => Observation::Status(gateway.status.unwrap_or_default()),
            None => Observation::NotFound,
        })
    }

    /// CreateNativeGatewayServerGroup, returning the new group id
    pub async fn create_group(&self, request: &CreateGroupRequest) -> Result<String, ApiError> {
        let response: CreateGroupResponse =
            self.call("CreateNativeGatewayServerGroup", request).await?;
        Ok(response.result.group_id)
    }

    /// One page of DescribeNativeGatewayServerGroups
    async fn describe_groups_page(
        &self,
        gateway_id: &str,
        filters: &[Filter],
        paging: Paging,
    ) -> Result<Option<GatewayGroupList>, ApiError> {
        let request = DescribeGroupsRequest {
            gateway_id,
            filters,
            paging,
        };
        let response: DescribeGroupsResponse =
            self.call("DescribeNativeGatewayServerGroups", &request).await?;
        Ok(response.result)
    }

    pub async fn describe_group(
        &self,
        gateway_id: &str,
        group_id: &str,
    ) -> Result<Option<GatewayGroup>, ApiError> {
        let filters = [Filter::single("GroupId", group_id)];
        match self
            .describe_groups_page(gateway_id, &filters, Paging::default())
            .await
        {
            Ok(page) => Ok(page.and_then(|p| {
                p.gateway_group_list
                    .into_iter()
                    .find(|g| g.group_id == group_id)
            })),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All groups of a gateway matching `filters`, 20 per page
    pub async fn describe_groups(
        &self,
        gateway_id: &str,
        filters: &[Filter],
    ) -> Result<GatewayGroupList, ApiError> {
        let mut paging = Paging::default();
        let mut groups = GatewayGroupList::default();

        loop {
            let Some(page) = self.describe_groups_page(gateway_id, filters, paging).await? else {
                break;
            };
            if page.gateway_group_list.is_empty() {
                break;
            }
            groups.total_count = page.total_count;
            let received = page.gateway_group_list.len();
            groups.gateway_group_list.extend(page.gateway_group_list);

            if paging.is_last(received) {
                break;
            }
            paging = paging.next();
        }

        Ok(groups)
    }

    pub async fn modify_group(&self, request: &ModifyGroupRequest) -> Result<(), ApiError> {
        let _: Ack = self.call("ModifyNativeGatewayServerGroup", request).await?;
        Ok(())
    }

    pub async fn delete_group(&self, gateway_id: &str, group_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "GatewayId": gateway_id, "GroupId": group_id });
        let _: Ack = self.call("DeleteNativeGatewayServerGroup", &body).await?;
        Ok(())
    }

    /// Status of the group behind a `gatewayId#groupId` handle
    pub async fn group_status(&self, handle: &str) -> Result<Observation, ApiError> {
        let handle = ResourceHandle::parse(handle, 2)
            .map_err(|e| ApiError::ParseError(e.to_string()))?;
        let [gateway_id, group_id] = handle.parts() else {
            return Err(ApiError::ParseError(format!("invalid group handle {}", handle)));
        };
        Ok(match self.describe_group(gateway_id, group_id).await? {
            Some(group) => Observation::Status(group.status.unwrap_or_default()),
            None => Observation::NotFound,
        })
    }
}
