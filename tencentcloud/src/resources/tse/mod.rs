//! TSE resources: registry engines, cloud native gateways and gateway groups

pub mod resource_cngw_gateway;
pub mod resource_cngw_group;
pub mod resource_instance;

pub use resource_cngw_gateway::TseCngwGatewayResource;
pub use resource_cngw_group::TseCngwGroupResource;
pub use resource_instance::TseInstanceResource;

use tfplug::schema::{AttributeBuilder, AttributeType, NestedBlock, NestedBlockBuilder, NestingMode};
use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::api::tse::NodeConfig;
use crate::resources::common::{required_i64, required_string, single_block};

/// `node_config { specification, number }`, exactly one block
pub(crate) fn node_config_block() -> NestedBlock {
    NestedBlockBuilder::new("node_config", NestingMode::List)
        .description("Gateway node configuration")
        .min_items(1)
        .max_items(1)
        .attribute(
            AttributeBuilder::new("specification", AttributeType::String)
                .description("Node specification, e.g. 1c2g, 2c4g, 4c8g")
                .required()
                .build(),
        )
        .attribute(
            AttributeBuilder::new("number", AttributeType::Number)
                .description("Node count, at least 2")
                .required()
                .build(),
        )
        .build()
}

pub(crate) fn extract_node_config(config: &DynamicValue) -> Result<NodeConfig, Diagnostic> {
    let block = config
        .get_first_object(&AttributePath::new("node_config"))
        .ok()
        .flatten()
        .ok_or_else(|| {
            Diagnostic::error("Missing node_config", "A node_config block is required")
                .with_attribute(AttributePath::new("node_config"))
        })?;

    Ok(NodeConfig {
        specification: required_string(&block, "specification")?,
        number: required_i64(&block, "number")?,
    })
}

pub(crate) fn node_config_value(node_config: &NodeConfig) -> Vec<Dynamic> {
    single_block(vec![
        ("specification", Dynamic::from(node_config.specification.as_str())),
        ("number", Dynamic::from(node_config.number)),
    ])
}
