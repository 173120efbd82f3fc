#![allow(dead_code)]

// Shared prompt fragments. Each module that calls models defines its own
// prompts.rs alongside it; these are the cross-cutting pieces.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that pins model output to the supplied ballot data.
pub const CLOSED_SET_INSTRUCTION: &str = "\
    CRITICAL: Recommend ONLY candidates and propositions present in the supplied ballot data. \
    Copy candidate names EXACTLY as written, character for character. \
    Do NOT invent, merge, rename, add, or remove candidates or propositions. \
    If the supplied data cannot support a recommendation for a race, omit that race entirely \
    rather than guessing.";
