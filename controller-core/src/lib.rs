#![no_std]

// Shared logic for the two-button fan speed controller.
//
// This crate stays portable across MCU firmware and host tooling by avoiding the
// Rust standard library. Hardware is reached only through the traits in
// `duty`, `edge`, `debounce`, `power`, and `speed`, so the state machine can be
// exercised on the host against the doubles in `sim`.

pub mod controller;
pub mod debounce;
pub mod duty;
pub mod edge;
pub mod power;
pub mod repl;
pub mod sim;
pub mod speed;
pub mod state;
pub mod telemetry;
