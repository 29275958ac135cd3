pub mod bus;
pub mod fetcher;
pub mod store;
