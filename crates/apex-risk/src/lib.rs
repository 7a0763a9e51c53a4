//! Pre-trade risk validation.
//!
//! Every outgoing intent passes through [`RiskGate::check_order`] before it
//! may reach the execution queue. All checks are flat-array lookups and
//! comparisons; the reject paths are `#[cold]` so codegen biases the
//! approved path.

pub mod gate;
pub mod position;

pub use gate::{RiskCheck, RiskGate, RiskLimits};
pub use position::PositionLedger;
