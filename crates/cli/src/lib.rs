//! Operator tooling for a Palaver data directory: inspect configuration,
//! sessions, assembled context and durable memory without calling a model.

pub mod cli;
