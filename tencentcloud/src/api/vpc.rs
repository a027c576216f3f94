//! VPC API: elastic IPs and async task results

use serde::{Deserialize, Serialize};
use tfplug::{converge, ConvergeError, Context, Observation, PollSpec};

use super::common::{string_or_u64, Filter, Paging, Tag};
use super::{ApiError, Client, Operation, READ_RETRY_TIMEOUT, WRITE_RETRY_TIMEOUT};

pub const SERVICE: &str = "vpc";
pub const VERSION: &str = "2017-03-12";

pub const EIP_RESOURCE_TYPE: &str = "eip";

pub const EIP_STATUS_CREATING: &str = "CREATING";
pub const EIP_STATUS_BINDING: &str = "BINDING";
pub const EIP_STATUS_BIND: &str = "BIND";
pub const EIP_STATUS_UNBINDING: &str = "UNBINDING";
pub const EIP_STATUS_UNBIND: &str = "UNBIND";
pub const EIP_STATUS_OFFLINING: &str = "OFFLINING";

pub const TASK_STATUS_RUNNING: &str = "RUNNING";
pub const TASK_STATUS_SUCCESS: &str = "SUCCESS";

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct AllocateAddressRequest {
    pub address_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_charge_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internet_max_bandwidth_out: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct AllocateAddressResponse {
    address_set: Vec<String>,
}

/// Elastic IP as reported by DescribeAddresses
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Address {
    pub address_id: String,
    pub address_name: Option<String>,
    pub address_status: Option<String>,
    pub address_ip: Option<String>,
    pub address_type: Option<String>,
    pub instance_id: Option<String>,
    pub network_interface_id: Option<String>,
    pub created_time: Option<String>,
    pub internet_charge_type: Option<String>,
    pub bandwidth: Option<u64>,
    pub tag_set: Vec<Tag>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeAddressesRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    address_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    filters: Vec<Filter>,
    #[serde(flatten)]
    paging: Paging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeAddressesResponse {
    address_set: Vec<Address>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TaskResponse {
    #[serde(with = "string_or_u64")]
    task_id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct TaskResultResponse {
    result: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Ack {}

pub fn address_spec(op: Operation) -> PollSpec {
    match op {
        Operation::Create => PollSpec::for_create(
            &[EIP_STATUS_CREATING],
            &[EIP_STATUS_UNBIND, EIP_STATUS_BIND],
            READ_RETRY_TIMEOUT,
        ),
        // AssociateAddress returns before the address leaves UNBIND
        Operation::Update => PollSpec::for_update(
            &[EIP_STATUS_BINDING, EIP_STATUS_UNBIND],
            &[EIP_STATUS_BIND],
            READ_RETRY_TIMEOUT,
        ),
        // A released address can still report UNBIND for a few polls before it vanishes
        Operation::Delete => PollSpec::for_delete(
            &[EIP_STATUS_OFFLINING, EIP_STATUS_UNBINDING, EIP_STATUS_UNBIND],
            WRITE_RETRY_TIMEOUT,
        ),
    }
}

pub fn task_spec() -> PollSpec {
    PollSpec::for_update(&[TASK_STATUS_RUNNING], &[TASK_STATUS_SUCCESS], READ_RETRY_TIMEOUT)
}

#[derive(Clone, Copy)]
pub struct VpcApi<'a> {
    client: &'a Client,
}

impl<'a> VpcApi<'a> {
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

    /// AllocateAddresses for a single address, returning its id
    pub async fn allocate_address(&self, request: &AllocateAddressRequest) -> Result<String, ApiError> {
        let response: AllocateAddressResponse = self.call("AllocateAddresses", request).await?;
        response
            .address_set
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::ParseError("AllocateAddresses returned no address".to_string()))
    }

    pub async fn describe_address(&self, address_id: &str) -> Result<Option<Address>, ApiError> {
        let request = DescribeAddressesRequest {
            address_ids: vec![address_id.to_string()],
            ..Default::default()
        };
        match self
            .call::<_, DescribeAddressesResponse>("DescribeAddresses", &request)
            .await
        {
            Ok(response) => Ok(response.address_set.into_iter().next()),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// DescribeAddresses by filter, e.g. `address-name` or `address-ip`
    pub async fn describe_addresses(&self, filters: Vec<Filter>) -> Result<Vec<Address>, ApiError> {
        let mut paging = Paging::default();
        let mut addresses = Vec::new();

        loop {
            let request = DescribeAddressesRequest {
                address_ids: Vec::new(),
                filters: filters.clone(),
                paging,
            };
            let response: DescribeAddressesResponse =
                self.call("DescribeAddresses", &request).await?;
            let received = response.address_set.len();
            addresses.extend(response.address_set);

            if paging.is_last(received) {
                break;
            }
            paging = paging.next();
        }

        Ok(addresses)
    }

    pub async fn modify_address_name(&self, address_id: &str, name: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "AddressId": address_id, "AddressName": name });
        let _: Ack = self.call("ModifyAddressAttribute", &body).await?;
        Ok(())
    }

    /// AssociateAddress, returning the async task id when one was issued
    pub async fn associate_address(
        &self,
        address_id: &str,
        instance_id: &str,
    ) -> Result<Option<u64>, ApiError> {
        let body = serde_json::json!({ "AddressId": address_id, "InstanceId": instance_id });
        let response: TaskResponse = self.call("AssociateAddress", &body).await?;
        Ok(response.task_id)
    }

    /// DisassociateAddress, returning the async task id when one was issued
    pub async fn disassociate_address(&self, address_id: &str) -> Result<Option<u64>, ApiError> {
        let body = serde_json::json!({ "AddressId": address_id });
        let response: TaskResponse = self.call("DisassociateAddress", &body).await?;
        Ok(response.task_id)
    }

    pub async fn release_address(&self, address_id: &str) -> Result<(), ApiError> {
        let body = serde_json::json!({ "AddressIds": [address_id] });
        let _: TaskResponse = self.call("ReleaseAddresses", &body).await?;
        Ok(())
    }

    pub async fn address_status(&self, address_id: &str) -> Result<Observation, ApiError> {
        Ok(match self.describe_address(address_id).await? {
            Some(address) => Observation::Status(address.address_status.unwrap_or_default()),
            None => Observation::NotFound,
        })
    }

    /// DescribeTaskResult keyed by the task id handle; a task with no result
    /// has nothing left to run and counts as finished
    pub async fn task_status(&self, task_id: &str) -> Result<Observation, ApiError> {
        let task_id: u64 = task_id
            .parse()
            .map_err(|_| ApiError::ParseError(format!("invalid task id {}", task_id)))?;
        let body = serde_json::json!({ "TaskId": task_id });
        let response: TaskResultResponse = self.call("DescribeTaskResult", &body).await?;
        Ok(Observation::Status(
            response
                .result
                .unwrap_or_else(|| TASK_STATUS_SUCCESS.to_string()),
        ))
    }

    /// Wait for an async VPC task to leave RUNNING
    pub async fn wait_task(&self, ctx: &Context, task_id: u64) -> Result<(), ConvergeError<ApiError>> {
        let api = *self;
        converge(ctx, &task_id.to_string(), &task_spec(), move |id| async move {
            api.task_status(&id).await
        })
        .await
    }

    /// Detach the address from whatever it is bound to and wait for the
    /// disassociation task; unbound or missing addresses are left alone
    pub async fn unattach(
        &self,
        ctx: &Context,
        address_id: &str,
    ) -> Result<(), ConvergeError<ApiError>> {
        let address = self
            .describe_address(address_id)
            .await
            .map_err(ConvergeError::Transport)?;
        let Some(address) = address else {
            return Ok(());
        };
        if address.address_status.as_deref() == Some(EIP_STATUS_UNBIND) {
            return Ok(());
        }

        let task_id = self
            .disassociate_address(address_id)
            .await
            .map_err(ConvergeError::Transport)?;
        let Some(task_id) = task_id else {
            return Ok(());
        };

        self.wait_task(ctx, task_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_helpers::{create_test_client, envelope};
    use mockito::{Matcher, Server};
    use serde_json::json;

    #[test]
    fn address_specs_are_valid() {
        for op in [Operation::Create, Operation::Update, Operation::Delete] {
            assert!(address_spec(op).validate().is_ok(), "{op}");
        }
        assert!(task_spec().validate().is_ok());
        assert!(address_spec(Operation::Create).target.contains(EIP_STATUS_BIND));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn describe_address_maps_fields() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeAddresses")
            .match_body(Matcher::PartialJson(json!({"AddressIds": ["eip-1"]})))
            .with_status(200)
            .with_body(envelope(json!({
                "TotalCount": 1,
                "AddressSet": [{
                    "AddressId": "eip-1",
                    "AddressName": "web",
                    "AddressStatus": "BIND",
                    "AddressIp": "1.2.3.4",
                    "InstanceId": "ins-1",
                    "TagSet": [{"Key": "env", "Value": "prod"}]
                }]
            })))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let address = client.vpc().describe_address("eip-1").await.unwrap().unwrap();

        assert_eq!(address.address_name.as_deref(), Some("web"));
        assert_eq!(address.address_ip.as_deref(), Some("1.2.3.4"));
        assert_eq!(address.instance_id.as_deref(), Some("ins-1"));
        assert_eq!(address.tag_set.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn invalid_address_id_is_not_found() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(envelope(json!({
                "Error": {"Code": "InvalidAddressId.NotFound", "Message": "no such eip"}
            })))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        assert_eq!(
            client.vpc().address_status("eip-gone").await.unwrap(),
            Observation::NotFound
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unattach_skips_unbound_address() {
        let mut server = Server::new_async().await;
        let describe = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeAddresses")
            .with_status(200)
            .with_body(envelope(json!({
                "AddressSet": [{"AddressId": "eip-1", "AddressStatus": "UNBIND"}]
            })))
            .expect(1)
            .create_async()
            .await;
        let disassociate = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DisassociateAddress")
            .expect(0)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.vpc().unattach(&Context::new(), "eip-1").await.unwrap();

        describe.assert_async().await;
        disassociate.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unattach_waits_for_task() {
        let mut server = Server::new_async().await;
        let _describe = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeAddresses")
            .with_status(200)
            .with_body(envelope(json!({
                "AddressSet": [{"AddressId": "eip-1", "AddressStatus": "BIND"}]
            })))
            .create_async()
            .await;
        let disassociate = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DisassociateAddress")
            .with_status(200)
            .with_body(envelope(json!({"TaskId": "12345"})))
            .expect(1)
            .create_async()
            .await;
        let task = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeTaskResult")
            .match_body(Matcher::Json(json!({"TaskId": 12345})))
            .with_status(200)
            .with_body(envelope(json!({"TaskId": 12345, "Result": "SUCCESS"})))
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.vpc().unattach(&Context::new(), "eip-1").await.unwrap();

        disassociate.assert_async().await;
        task.assert_async().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_task_is_unexpected_state() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeTaskResult")
            .with_status(200)
            .with_body(envelope(json!({"Result": "FAILED"})))
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let api = client.vpc();
        let result = converge(&Context::new(), "7", &task_spec(), move |id| async move {
            api.task_status(&id).await
        })
        .await;

        assert!(matches!(
            result,
            Err(ConvergeError::UnexpectedState { status, .. }) if status == "FAILED"
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn task_without_result_is_finished() {
        let mut server = Server::new_async().await;
        let task = server
            .mock("POST", "/")
            .match_header("x-tc-action", "DescribeTaskResult")
            .match_body(Matcher::Json(json!({"TaskId": 42})))
            .with_status(200)
            .with_body(envelope(json!({"TaskId": 42})))
            .expect(1)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        client.vpc().wait_task(&Context::new(), 42).await.unwrap();

        task.assert_async().await;
    }

    #[tokio::test]
    async fn malformed_task_handle_is_a_parse_error() {
        let client = create_test_client("http://127.0.0.1:1");
        assert!(matches!(
            client.vpc().task_status("task-x").await,
            Err(ApiError::ParseError(_))
        ));
    }

    #[test]
    fn bind_wait_treats_unbind_as_pending() {
        let spec = address_spec(Operation::Update);
        assert!(spec.pending.contains(EIP_STATUS_UNBIND));
        assert!(spec.pending.contains(EIP_STATUS_BINDING));
        assert!(spec.target.contains(EIP_STATUS_BIND));
    }
}
