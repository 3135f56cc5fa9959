pub mod config;
pub mod error;
pub mod http;
pub mod ips;
pub mod output;
pub mod poll;
pub mod reference_set;
pub mod search;
pub mod task;
pub mod tracing;
pub mod workflows;

#[cfg(test)]
mod testing;
