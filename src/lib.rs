//! LCC controller core.
//!
//! Real-time control loop for a dual-boiler espresso machine: exchanges
//! fixed-size packets with the control board every 100 ms, runs the
//! lifecycle / heat-up state machine, shares heater power across a
//! 25-slot super-cycle and supervises the water path.
//!
//! Everything except the adapters is target-independent.  ESP-IDF code
//! is guarded by `#[cfg(target_os = "espidf")]` inside [`adapters`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod channels;
pub mod config;
pub mod control;
pub mod error;
pub mod filters;
pub mod fsm;
pub mod protocol;
pub mod safety;
pub mod scheduler;
