//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against the simulated adapters. All tests run on the host (x86_64) with
//! no real hardware required.

#![cfg(not(target_os = "espidf"))]

mod mock_hw;
mod record_store_tests;
mod reporting_tests;
mod sampling_tests;
