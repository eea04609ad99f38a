pub mod runner;

pub use runner::{ClientOptions, ServerOptions, init_logging, run_client, run_server};
