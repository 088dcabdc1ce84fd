pub mod reading;
pub mod tariff;
pub mod types;

pub use reading::*;
pub use tariff::*;
pub use types::*;
