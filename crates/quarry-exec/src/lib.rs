#![forbid(unsafe_code)]
//! quarry-exec: drive plans to completion.
//!
//! `Engine::run` optionally optimizes a plan, pulls it until end-of-stream
//! (or the configured batch cap) and returns the batches together with a
//! `RunManifest` describing the run.

pub mod manifest;
pub mod runtime;

pub use manifest::RunManifest;
pub use runtime::{collect, Engine, ExecError, RunOutput};
