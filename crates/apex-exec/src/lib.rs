//! Execution side of the stack: simulated venues, the order router, and
//! the execution worker loop.

pub mod engine;
pub mod router;
pub mod venue;

pub use engine::ExecutionEngine;
pub use router::{OrderRouter, RoutingStrategy};
pub use venue::{VenueConfig, VenueSimulator};
