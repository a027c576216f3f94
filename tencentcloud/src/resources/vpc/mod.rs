//! VPC resources

pub mod resource_eip;

pub use resource_eip::EipResource;
