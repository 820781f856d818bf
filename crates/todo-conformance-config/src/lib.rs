// crates/todo-conformance-config/src/lib.rs
// ============================================================================
// Module: Todo Conformance Config Library
// Description: Canonical config model and validation for conformance runs.
// Purpose: Single source of truth for todo-conformance.toml semantics.
// Dependencies: todo-conformance-core, serde, toml, url
// ============================================================================

//! ## Overview
//! `todo-conformance-config` defines the configuration model for conformance
//! runs: the target, credentials, resource limits, run shape, and output. It
//! loads TOML with strict input guards, applies environment overrides, and
//! validates the result before any request is sent.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
