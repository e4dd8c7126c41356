//! Terminal failure classification

use crate::models::status::StatusSnapshot;

/// Marker substring identifying a validation-rule conflict. The remote
/// system embeds it in test and component failure text when a validation
/// rule blocked the deployment's test DML.
pub const CONFLICT_MARKER: &str = "FIELD_CUSTOM_VALIDATION_EXCEPTION";

/// Scan a terminal payload for the known conflict marker.
///
/// Pure any-match predicate over test messages and component errors.
pub fn has_conflict_marker(snapshot: &StatusSnapshot) -> bool {
    let in_tests = snapshot
        .test_results
        .iter()
        .filter_map(|t| t.message.as_deref())
        .any(|m| m.contains(CONFLICT_MARKER));

    in_tests
        || snapshot
            .component_errors
            .iter()
            .any(|e| e.contains(CONFLICT_MARKER))
}
