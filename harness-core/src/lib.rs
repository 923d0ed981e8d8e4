#![no_std]

// Control logic for the BLE power-consumption harness.
//
// The crate avoids the Rust standard library so the same coordinator can run
// on a radio MCU and inside host tooling, with the radio stack and console
// supplied through the traits exposed here.

pub mod config;
pub mod console;
pub mod coordinator;
pub mod radio;
pub mod scheduler;
pub mod telemetry;
