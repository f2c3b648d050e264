pub mod breaker;
pub mod sizer;

pub use breaker::CircuitBreaker;
pub use sizer::{ExposureCheck, LotSizer, SizerConfig};
