//! Application core — the control loop and its data, zero I/O.
//!
//! [`controller::SystemController`] drives one tick at a time.  Every
//! interaction with hardware, storage or the companion core happens
//! through the **port traits** in [`ports`], so the whole loop runs on
//! the host against mocks.

pub mod commands;
pub mod controller;
pub mod events;
pub mod ports;
pub mod settings;
