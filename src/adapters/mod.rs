pub mod exchange_rest;
pub mod postgres;

pub use exchange_rest::RestExchangeGateway;
pub use postgres::PostgresStore;
