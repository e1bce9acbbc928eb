//! Shared test utilities for geoload integration tests.
//!
//! - `stubs`: scripted adapters that count their calls
//! - `builders`: canonical requests and fast settings
//! - `harness`: an orchestrator wired to the stubs, plus wait helpers

pub mod builders;
pub mod harness;
pub mod stubs;

#[allow(unused_imports)]
pub use builders::*;
#[allow(unused_imports)]
pub use harness::*;
#[allow(unused_imports)]
pub use stubs::*;
