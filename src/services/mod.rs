pub mod config;
pub mod config_store;
pub mod credentials;
pub mod dispatcher;
pub mod logger;
pub mod pipeline;
pub mod platform;
pub mod region;
pub mod registry;
pub mod request;
pub mod token;
pub mod transport;
pub mod validation;
