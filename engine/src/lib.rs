//! Background workers for the STCA simulator.
//!
//! Long-running drivers each own one dedicated blocking thread controlled through an
//! acknowledged `Resume | Pause | Stop` channel (see [`worker`]). The [`Simulator`] fires
//! rules at random interior cells with a delay between attempts; the [`VerifierDriver`]
//! runs a [`stca_core::PathVerifier`] at full speed and publishes [`VerifierReport`]s.
//! Both keep their grid behind a mutex held for one attempt at a time, so snapshots never
//! observe a half-written neighbourhood.

#![allow(clippy::missing_errors_doc)]

mod simulator;
mod verifier;
pub mod worker;

pub use simulator::{Simulator, SimulatorConfig, SimulatorSnapshot};
pub use verifier::{VerifierDriver, VerifierReport};
pub use worker::{
    Control, Job, JobStep, WorkerError, WorkerHandle, WorkerState, WorkerStatus, spawn_worker,
};
