pub mod builder;
pub mod channel;
pub mod config;
pub mod envelope;
pub mod error;
pub mod flow;
pub mod sdk;
pub mod store;
