//! synarbor CLI crate
//!
//! A harness around `synarbor-core`: it reads a TOML network description
//! (layers plus connection types), drives generation for every
//! (cell, connection type) pair, writes ECLREC record files, inspects them,
//! and checks that Generate, Regenerate and Fetch agree.
//!
//! Commands (see [commands]):
//! - init: write a commented sample network description.
//! - generate: produce every arbor in a chosen mode and export the synapses.
//! - inspect: summarize or dump an ECLREC file as text or JSON.
//! - verify: compare the three operating modes arbor by arbor.
//!
//! The binary (src/main.rs) wires up logging and argument parsing and calls
//! [`SynarborCli::execute`]; the library surface exists so commands can be
//! driven from tests without spawning a process.

pub mod commands;
pub mod config;
pub mod error;
pub mod network;

pub use commands::SynarborCli;
