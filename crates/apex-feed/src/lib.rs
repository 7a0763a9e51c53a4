//! Market-data edge: frame parsing, normalization/dispatch, and the
//! synthetic feed that drives the simulator.

pub mod dispatch;
pub mod fix;
pub mod sim;

pub use dispatch::MarketDataDispatch;
pub use fix::{FixMessage, FrameError, DEFAULT_DELIMITER, SOH};
pub use sim::{FeedSimulator, ReplayError};
