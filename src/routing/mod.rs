//! # Routing
//!
//! Route registration and scored resolution of inbound webhook requests.

pub mod route;
pub mod route_table;

pub use route::{PayloadMatcher, Route, RouteMatch, RouteType};
pub use route_table::{extract_params, pattern_matches, RouteTable, RouterConfig};
