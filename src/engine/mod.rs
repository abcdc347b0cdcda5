pub mod aggregate;
pub mod compare;
pub mod definition;
pub mod generate;
pub mod http;
pub mod recorder;
pub mod runner;
pub mod scope;
