//! Helpers shared by every resource and data source

use std::any::Any;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::Arc;

use tfplug::types::{AttributePath, Diagnostic, Dynamic, DynamicValue};

use crate::TencentCloudProviderData;

pub(crate) fn not_configured() -> Diagnostic {
    Diagnostic::error(
        "Provider not configured",
        "Provider data was not properly configured",
    )
}

pub(crate) fn api_error(summary: impl Into<String>, e: impl Display) -> Diagnostic {
    Diagnostic::error(summary, format!("API error: {}", e))
}

/// Downcast the provider data handed to `configure`
pub(crate) fn extract_provider_data(
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
    kind: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<TencentCloudProviderData> {
    match provider_data {
        Some(data) => match data.downcast_ref::<TencentCloudProviderData>() {
            Some(provider_data) => Some(provider_data.clone()),
            None => {
                tracing::error!("provider data handed to {} has the wrong type", kind);
                diagnostics.push(Diagnostic::error(
                    "Invalid provider data",
                    "Failed to extract TencentCloudProviderData from provider data",
                ));
                None
            }
        },
        None => {
            diagnostics.push(Diagnostic::error(
                "No provider data",
                format!("No provider data was provided to the {}", kind),
            ));
            None
        }
    }
}

/// Whether `name` differs between two states; null and absent compare equal
pub(crate) fn has_change(prior: &DynamicValue, planned: &DynamicValue, name: &str) -> bool {
    let path = AttributePath::new(name);
    prior.get(&path) != planned.get(&path)
}

/// One diagnostic per argument in `names` that changed
pub(crate) fn immutable_changes(
    prior: &DynamicValue,
    planned: &DynamicValue,
    names: &[&str],
) -> Vec<Diagnostic> {
    names
        .iter()
        .filter(|name| has_change(prior, planned, name))
        .map(|name| {
            Diagnostic::error(
                format!("argument `{}` cannot be changed", name),
                format!("Changing `{}` requires replacing the resource", name),
            )
            .with_attribute(AttributePath::new(name))
        })
        .collect()
}

pub(crate) fn required_string(
    value: &DynamicValue,
    name: &str,
) -> Result<String, Diagnostic> {
    value.get_string(&AttributePath::new(name)).map_err(|_| {
        Diagnostic::error(
            format!("Missing {}", name),
            format!("The '{}' attribute is required", name),
        )
        .with_attribute(AttributePath::new(name))
    })
}

pub(crate) fn required_i64(value: &DynamicValue, name: &str) -> Result<i64, Diagnostic> {
    value.get_i64(&AttributePath::new(name)).map_err(|_| {
        Diagnostic::error(
            format!("Missing {}", name),
            format!("The '{}' attribute is required", name),
        )
        .with_attribute(AttributePath::new(name))
    })
}

pub(crate) fn optional_string(value: &DynamicValue, name: &str) -> Option<String> {
    value
        .get_optional_string(&AttributePath::new(name))
        .ok()
        .flatten()
}

pub(crate) fn optional_i64(value: &DynamicValue, name: &str) -> Option<i64> {
    value.get_optional_i64(&AttributePath::new(name)).ok().flatten()
}

pub(crate) fn optional_bool(value: &DynamicValue, name: &str) -> Option<bool> {
    value.get_optional_bool(&AttributePath::new(name)).ok().flatten()
}

pub(crate) fn string_map(value: &DynamicValue, name: &str) -> HashMap<String, String> {
    value
        .get_string_map(&AttributePath::new(name))
        .unwrap_or_default()
}

/// Set `name` when the remote side returned a value, otherwise leave state alone
pub(crate) fn set_opt_string(state: &mut DynamicValue, name: &str, value: Option<String>) {
    if let Some(v) = value {
        let _ = state.set_string(&AttributePath::new(name), v);
    }
}

pub(crate) fn set_opt_i64(state: &mut DynamicValue, name: &str, value: Option<i64>) {
    if let Some(v) = value {
        let _ = state.set_i64(&AttributePath::new(name), v);
    }
}

pub(crate) fn set_opt_bool(state: &mut DynamicValue, name: &str, value: Option<bool>) {
    if let Some(v) = value {
        let _ = state.set_bool(&AttributePath::new(name), v);
    }
}

/// A one-element nested block built from string/number/bool fields
pub(crate) fn single_block(fields: Vec<(&str, Dynamic)>) -> Vec<Dynamic> {
    vec![object(fields)]
}

pub(crate) fn object(fields: Vec<(&str, Dynamic)>) -> Dynamic {
    Dynamic::Map(
        fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect(),
    )
}

/// Id of the object a lifecycle call works on
pub(crate) fn state_id(state: &DynamicValue) -> Result<String, Diagnostic> {
    match state.get_string(&AttributePath::new("id")) {
        Ok(id) if !id.is_empty() => Ok(id),
        _ => Err(Diagnostic::error(
            "Missing resource id",
            "The resource state carries no id",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(fields: Vec<(&str, Dynamic)>) -> DynamicValue {
        DynamicValue::new(object(fields))
    }

    #[test]
    fn null_and_absent_are_not_a_change() {
        let prior = state(vec![("name", Dynamic::Null)]);
        let planned = state(vec![]);
        assert!(!has_change(&prior, &planned, "name"));
    }

    #[test]
    fn immutable_changes_name_each_changed_argument() {
        let prior = state(vec![
            ("engine_type", Dynamic::from("zookeeper")),
            ("engine_name", Dynamic::from("a")),
            ("tags", Dynamic::Null),
        ]);
        let planned = state(vec![
            ("engine_type", Dynamic::from("nacos")),
            ("engine_name", Dynamic::from("a")),
            ("tags", Dynamic::Map(HashMap::new())),
        ]);

        let diags = immutable_changes(&prior, &planned, &["engine_type", "engine_name"]);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].summary, "argument `engine_type` cannot be changed");
    }

    #[test]
    fn state_id_rejects_empty_ids() {
        assert!(state_id(&state(vec![("id", Dynamic::from(""))])).is_err());
        assert!(state_id(&DynamicValue::null()).is_err());
        assert_eq!(
            state_id(&state(vec![("id", Dynamic::from("ins-1"))])).unwrap(),
            "ins-1"
        );
    }

    #[test]
    fn wrong_provider_data_type_is_reported() {
        let mut diagnostics = vec![];
        let data: Arc<dyn Any + Send + Sync> = Arc::new(42u32);
        assert!(extract_provider_data(Some(data), "resource", &mut diagnostics).is_none());
        assert_eq!(diagnostics[0].summary, "Invalid provider data");

        let mut diagnostics = vec![];
        assert!(extract_provider_data(None, "data source", &mut diagnostics).is_none());
        assert_eq!(diagnostics[0].summary, "No provider data");
    }
}
