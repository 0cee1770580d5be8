pub mod config;
pub mod logger;
pub mod octopus;
pub mod validation;
