//! TEM resources

pub mod resource_scale_rule;

pub use resource_scale_rule::TemScaleRuleResource;
