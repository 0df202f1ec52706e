pub mod adapters;
pub mod dedup;
pub mod monitor;
pub mod orchestrator;
pub mod processor;
pub mod quality;
pub mod rate_limit;
pub mod registry;
pub mod report;
pub mod retry;
pub mod session;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;
