//! Tag API: tags on resources whose own API does not manage them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::common::{diff_tags, resource_name, Paging};
use super::{ApiError, Client};

pub const SERVICE: &str = "tag";
pub const VERSION: &str = "2018-08-13";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TagPair {
    tag_key: String,
    tag_value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct TagKeyOnly {
    tag_key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct ModifyResourceTagsRequest {
    resource: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    replace_tags: Vec<TagPair>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    delete_tags: Vec<TagKeyOnly>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DescribeResourceTagsRequest<'a> {
    service_type: &'a str,
    resource_prefix: &'a str,
    resource_region: &'a str,
    resource_ids: Vec<&'a str>,
    #[serde(flatten)]
    paging: Paging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct ResourceTag {
    resource_id: String,
    tag_key: String,
    tag_value: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct DescribeResourceTagsResponse {
    tags: Vec<ResourceTag>,
}

#[derive(Debug, Deserialize)]
struct Ack {}

#[derive(Clone, Copy)]
pub struct TagApi<'a> {
    client: &'a Client,
}

impl<'a> TagApi<'a> {
    pub fn new(client: &'a Client) -> Self {
        Self { client }
    }

    /// Move the tags of `qcs::{service}:{region}:uin/:{resource_type}/{id}` from
    /// `old` to `new`; a no-op when nothing changed
    pub async fn modify_tags(
        &self,
        service: &str,
        resource_type: &str,
        id: &str,
        old: &HashMap<String, String>,
        new: &HashMap<String, String>,
    ) -> Result<(), ApiError> {
        let (replace, delete) = diff_tags(old, new);
        if replace.is_empty() && delete.is_empty() {
            return Ok(());
        }

        let request = ModifyResourceTagsRequest {
            resource: resource_name(service, self.client.region(), resource_type, id),
            replace_tags: replace
                .into_iter()
                .map(|t| TagPair {
                    tag_key: t.key,
                    tag_value: t.value,
                })
                .collect(),
            delete_tags: delete
                .into_iter()
                .map(|tag_key| TagKeyOnly { tag_key })
                .collect(),
        };
        let _: Ack = self
            .client
            .call(SERVICE, VERSION, "ModifyResourceTags", &request)
            .await?;
        Ok(())
    }

    /// Current tags of one resource
    pub async fn describe_tags(
        &self,
        service: &str,
        resource_type: &str,
        id: &str,
    ) -> Result<HashMap<String, String>, ApiError> {
        let region = self.client.region().to_string();
        let mut paging = Paging::default();
        let mut tags = HashMap::new();

        loop {
            let request = DescribeResourceTagsRequest {
                service_type: service,
                resource_prefix: resource_type,
                resource_region: &region,
                resource_ids: vec![id],
                paging,
            };
            let response: DescribeResourceTagsResponse = self
                .client
                .call(SERVICE, VERSION, "DescribeResourceTagsByResourceIds", &request)
                .await?;

            let received = response.tags.len();
            tags.extend(
                response
                    .tags
                    .into_iter()
                    .filter(|t| t.resource_id == id)
                    .map(|t| (t.tag_key, t.tag_value)),
            );

            if paging.is_last(received) {
                break;
            }
            paging = paging.next();
        }

        Ok(tags)
    }
}
