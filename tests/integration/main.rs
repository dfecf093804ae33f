//! Integration test driver for `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a subsystem against mock
//! ports.  All tests run on the host (x86_64) with no hardware or broker.

// Host time driver behind the bounded channel waits.
use embassy_time as _;

mod alert_tests;
mod gateway_tests;
mod mock_hw;
mod scenario_tests;
