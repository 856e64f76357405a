//! reangle - multi-source content ingestion and rewriting
//!
//! Turns YouTube videos (through their caption tracks), web pages, local
//! files and plain text into clean source text, and rewrites it with an LLM
//! provider. The YouTube path is a staged pipeline: URL validation, metadata
//! probe, transcript fetch with fallbacks, normalization and a length policy.

pub mod cli;
pub mod config;
pub mod error;
pub mod ingest;
pub mod rewrite;
pub mod sources;
pub mod subtitle;
pub mod text;
pub mod workflow;
pub mod youtube;
