pub mod factory;
mod paper;
mod traits;

pub use factory::build_gateway;
pub use paper::PaperExchange;
pub use traits::{ExchangeGateway, PlacementOutcome, PlacementRequest};
