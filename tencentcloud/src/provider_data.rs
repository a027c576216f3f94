//! Provider data structure passed to resources and data sources

use crate::api::Client;

#[derive(Clone)]
pub struct TencentCloudProviderData {
    pub client: Client,
    pub region: String,
}

impl TencentCloudProviderData {
    pub fn new(client: Client) -> Self {
        let region = client.region().to_string();
        Self { client, region }
    }
}
