//! Utilities for testing transfers.
//!
//! - [`reporter`] records every status event so tests can assert on what the workers observed.
//! - [`destination`] provides destinations with scripted failures.
//! - [`transfer`] runs a transfer under a deadline so a deadlock fails the test instead of hanging.
pub mod destination;
pub mod reporter;
pub mod transfer;
