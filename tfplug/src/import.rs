//! Import helpers for simplifying resource import implementations

use crate::context::Context;
use crate::handle::ResourceHandle;
use crate::resource::{ImportResourceStateRequest, ImportResourceStateResponse, ImportedResource};
use crate::types::{AttributePath, Diagnostic, DynamicValue};

/// Sets the import ID to a specific attribute in state
///
/// This is useful for simple resources where the import ID maps directly to
/// a single attribute in the resource state.
///
/// Example: ID "ins-123" -> state.id = "ins-123"
pub fn import_state_passthrough_id(
    _ctx: &Context,
    attr_path: AttributePath,
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    if request.id.is_empty() {
        response.diagnostics.push(
            Diagnostic::error("Invalid import ID", "The import ID must not be empty")
                .with_attribute(attr_path),
        );
        return;
    }

    let mut state = DynamicValue::object();
    if let Err(e) = state.set_string(&attr_path, request.id.clone()) {
        response.diagnostics.push(
            Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}' to value '{}'", attr_path, request.id),
            )
            .with_attribute(attr_path),
        );
        return;
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

/// Imports a composite ID such as "gatewayId#groupId"
///
/// The full ID lands in `id` and each part in the attribute named at the
/// same position, so ("gateway-1#group-2", ["gateway_id", "group_id"]) sets
/// id, gateway_id and group_id.
pub fn import_state_composite_id(
    _ctx: &Context,
    attributes: &[&str],
    request: &ImportResourceStateRequest,
    response: &mut ImportResourceStateResponse,
) {
    let handle = match ResourceHandle::parse(&request.id, attributes.len()) {
        Ok(handle) => handle,
        Err(e) => {
            response.diagnostics.push(Diagnostic::error(
                "Invalid import ID",
                format!("{}. Expected format: {}", e, attributes.join("#")),
            ));
            return;
        }
    };

    let mut state = DynamicValue::object();
    let mut assignments = vec![("id", request.id.clone())];
    assignments.extend(
        attributes
            .iter()
            .copied()
            .zip(handle.parts().iter().cloned()),
    );

    for (name, value) in assignments {
        if let Err(e) = state.set_string(&AttributePath::new(name), value) {
            response.diagnostics.push(Diagnostic::error(
                format!("Failed to set import ID: {}", e),
                format!("Could not set attribute '{}'", name),
            ));
            return;
        }
    }

    response.imported_resources.push(ImportedResource {
        type_name: request.type_name.clone(),
        state,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(id: &str) -> ImportResourceStateRequest {
        ImportResourceStateRequest {
            type_name: "tencentcloud_tse_cngw_group".to_string(),
            id: id.to_string(),
        }
    }

    #[test]
    fn passthrough_sets_single_attribute() {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request("eip-abc"),
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        assert_eq!(response.imported_resources.len(), 1);
        let state = &response.imported_resources[0].state;
        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "eip-abc");
    }

    #[test]
    fn passthrough_rejects_empty_id() {
        let mut response = ImportResourceStateResponse::default();
        import_state_passthrough_id(
            &Context::new(),
            AttributePath::new("id"),
            &request(""),
            &mut response,
        );

        assert_eq!(response.diagnostics.len(), 1);
        assert!(response.imported_resources.is_empty());
    }

    #[test]
    fn composite_id_populates_each_part() {
        let mut response = ImportResourceStateResponse::default();
        import_state_composite_id(
            &Context::new(),
            &["gateway_id", "group_id"],
            &request("gateway-1#group-2"),
            &mut response,
        );

        assert!(response.diagnostics.is_empty());
        let state = &response.imported_resources[0].state;
        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "gateway-1#group-2"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("gateway_id")).unwrap(),
            "gateway-1"
        );
        assert_eq!(
            state.get_string(&AttributePath::new("group_id")).unwrap(),
            "group-2"
        );
    }

    #[test]
    fn composite_id_with_wrong_part_count_is_rejected() {
        let mut response = ImportResourceStateResponse::default();
        import_state_composite_id(
            &Context::new(),
            &["gateway_id", "group_id"],
            &request("gateway-1"),
            &mut response,
        );

        assert!(response.imported_resources.is_empty());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Invalid import ID");
        assert!(response.diagnostics[0]
            .detail
            .contains("gateway_id#group_id"));
    }
}
