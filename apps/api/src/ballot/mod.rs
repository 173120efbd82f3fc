//! Canonical ballot lifecycle: curator uploads, merge of model output, and
//! the factual-refresh validator used by the sync cycle.

pub mod handlers;
pub mod merge;
pub mod validation;
