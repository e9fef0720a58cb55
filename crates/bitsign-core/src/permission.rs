//! Permission Gate.

use crate::policy::FamilyPolicy;

/// Whether a chain granting `granted` may sign `content_type` in this family.
///
/// Typeless families accept any chain. For typed families at least one of
/// the type's required bits must be granted; an absent or unknown type is
/// never permitted.
pub fn is_permitted(policy: &FamilyPolicy, content_type: Option<&str>, granted: u32) -> bool {
    if !policy.is_typed() {
        return true;
    }
    content_type
        .and_then(|name| policy.required_permission(name))
        .is_some_and(|required| granted & required != 0)
}
