// Library crate for integration tests and the binary.

pub mod config;
pub mod driver;
pub mod error;
pub mod gateway;
pub mod history;
pub mod log_capture;
pub mod proctor;
pub mod report;
pub mod routes;
pub mod server;
pub mod session;
pub mod state;
pub mod timer;
pub mod track;
pub mod transcript;
