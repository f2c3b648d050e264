pub mod context;
pub mod error;
pub mod ports;
pub mod symbols;
pub mod types;

pub use context::*;
pub use error::*;
pub use ports::*;
pub use symbols::*;
pub use types::*;
