//! DID document version validation.
//!
//! Registry updates are compare-and-replace: a proposed document is only
//! accepted as the direct successor of the currently stored one.

use std::collections::BTreeSet;

use crate::document::DidDocument;
use crate::error::DocumentError;

/// Validate that `proposed` may replace `current`.
///
/// This checks, in order:
/// - versionId is exactly one higher
/// - `updated` is strictly later
/// - `@context` (as a set), `id`, `controller`, `created` and `deactivated`
///   are unchanged
pub fn validate_document_update(
    current: &DidDocument,
    proposed: &DidDocument,
) -> Result<(), DocumentError> {
    // 1. Version chain
    let current_version = current.version()?;
    let proposed_version = proposed.version()?;
    if current_version.checked_add(1) != Some(proposed_version) {
        return Err(DocumentError::InvalidVersion {
            current: current.version_id.clone(),
            proposed: proposed.version_id.clone(),
        });
    }

    // 2. Monotonic update time
    if proposed.updated_at()? <= current.updated_at()? {
        return Err(DocumentError::InvalidUpdated {
            current: current.updated.clone(),
            proposed: proposed.updated.clone(),
        });
    }

    // 3. Immutable fields
    let current_context: BTreeSet<&str> = current.context.iter().map(String::as_str).collect();
    let proposed_context: BTreeSet<&str> = proposed.context.iter().map(String::as_str).collect();
    if current_context != proposed_context {
        return Err(DocumentError::ContextMismatch);
    }

    if current.id != proposed.id {
        return Err(DocumentError::IdMismatch {
            current: current.id.clone(),
            proposed: proposed.id.clone(),
        });
    }

    if current.controller != proposed.controller {
        return Err(DocumentError::ControllerMismatch {
            current: current.controller.clone(),
            proposed: proposed.controller.clone(),
        });
    }

    if current.created_at()? != proposed.created_at()? {
        return Err(DocumentError::CreatedMismatch);
    }

    if current.deactivated != proposed.deactivated {
        return Err(DocumentError::DeactivatedMismatch);
    }

    Ok(())
}

/// Validate a document that is registered for the first time.
pub fn validate_new_document(doc: &DidDocument) -> Result<(), DocumentError> {
    doc.did()
        .map_err(|e| DocumentError::StructuralError(e.to_string()))?;

    if doc.version()? != 1 {
        return Err(DocumentError::InvalidVersion {
            current: "0".into(),
            proposed: doc.version_id.clone(),
        });
    }

    if doc.deactivated {
        return Err(DocumentError::StructuralError(
            "a new document cannot be deactivated".into(),
        ));
    }

    if doc.updated_at()? < doc.created_at()? {
        return Err(DocumentError::InvalidUpdated {
            current: doc.created.clone(),
            proposed: doc.updated.clone(),
        });
    }

    for key_id in doc
        .assertion_method
        .iter()
        .chain(&doc.authentication)
        .chain(&doc.key_agreement)
        .chain(&doc.capability_invocation)
    {
        if doc.verification_method(key_id).is_none() {
            return Err(DocumentError::StructuralError(format!(
                "relation references unknown key {}",
                key_id
            )));
        }
    }

    Ok(())
}
