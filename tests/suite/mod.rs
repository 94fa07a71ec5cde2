mod cli;
mod determinism;
mod persist;
mod verifier;
mod workers;
