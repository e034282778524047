pub mod cache;
pub mod rate_limit;
pub mod read_through;
pub mod transport;
