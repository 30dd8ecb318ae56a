#![forbid(unsafe_code)]
#![deny(unused_imports, unreachable_pub, clippy::all, missing_docs)]

//! Shared test helpers used across integration suites.
//! Layout: mocks.rs (scripted persistence double), fixtures.rs (time and snapshot helpers).

pub mod fixtures;
pub mod mocks;
