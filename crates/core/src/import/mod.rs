//! Bulk import reconciliation.
//!
//! Free-text game names are matched against the local library and then the
//! provider catalog. A confident match is imported; anything else is handed
//! back for human review together with the candidates that were found.

mod matcher;
mod reconciler;
mod types;

pub use matcher::{select_match, MatchDecision};
pub use reconciler::ImportReconciler;
pub use types::*;
