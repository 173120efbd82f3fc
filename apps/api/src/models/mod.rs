// Shared data model. Canonical entities (ballot) are curator-owned; envelope
// shapes are untrusted model output; audit/manifest records are pipeline
// bookkeeping.

pub mod audit;
pub mod ballot;
pub mod envelope;
pub mod manifest;
pub mod profile;
