#![forbid(unsafe_code)]
//! quarry-core: shared kernel for the quarry engine.
//!
//! This crate contains only *pure* types and small helpers that the other
//! crates build on. There is **no I/O** and **no execution policy** here.
//!
//! Crates that use this:
//! - quarry-operators: plan nodes (scan/select/join) evaluate `Expr`s from the
//!   `ExprArena` against `Batch`es and expose their schema as a `Projection`.
//! - quarry-planner: rewrites node projections during projection pushdown.
//! - quarry-exec: drives a plan to completion and emits a `RunManifest`
//!   fingerprinted with `hash::hash_serde`.

pub mod config;
pub mod error;
pub mod expr;
pub mod hash;
pub mod projection;
pub mod types;
