//! CAM resources: roles and service-linked roles

pub mod resource_role;
pub mod resource_service_linked_role;

pub use resource_role::CamRoleResource;
pub use resource_service_linked_role::CamServiceLinkedRoleResource;
