//! Resource implementations

pub mod cam;
pub(crate) mod common;
pub mod tem;
pub mod tse;
pub mod vpc;

pub use cam::{CamRoleResource, CamServiceLinkedRoleResource};
pub use tem::TemScaleRuleResource;
pub use tse::{TseCngwGatewayResource, TseCngwGroupResource, TseInstanceResource};
pub use vpc::EipResource;
