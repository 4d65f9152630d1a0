//! # Execution
//!
//! Handler pools that spread webhook traffic across interchangeable handlers.

pub mod load_balancer;

pub use load_balancer::{LoadBalancer, LoadBalancerConfig, LoadBalancerError, LoadBalancingStrategy};
