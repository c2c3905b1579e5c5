//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below drives whole control ticks through a
//! [`SystemController`](lcc_controller::app::controller::SystemController)
//! against the scripted control board in `mock_hw`.  All tests run on the
//! host with no real hardware required.

mod feed_forward_tests;
mod heatup_tests;
mod mock_hw;
