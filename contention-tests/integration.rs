//! Integration tests for the contention simulator
//!
//! These tests drive complete simulations through the public API of
//! `contention-sim` and check end-to-end behavior: worked scenarios,
//! reproducibility, property-based invariants and workspace style rules.

#[path = "style.rs"]
mod style;

#[path = "integration/scenarios.rs"]
mod scenarios;

#[path = "integration/determinism.rs"]
mod determinism;

#[path = "integration/properties.rs"]
mod properties;
