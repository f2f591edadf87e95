//! Workspace anchor crate.
//!
//! Carries workspace-wide tooling (git hooks via `cargo-husky`); all
//! functionality lives in the member crates under `crates/`.
