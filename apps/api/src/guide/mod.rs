//! Personalized guide generation.

pub mod generator;
pub mod handlers;
pub mod prompts;
