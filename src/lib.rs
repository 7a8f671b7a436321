//! Minimal JSON echo HTTP server.
//!
//! Two routes on the exact root target: `GET /` answers a fixed greeting,
//! `POST /` buffers the body and echoes back anything that parses as
//! JSON. Every other method/target combination is a 404. Built on
//! tokio + hyper with awaitable start/stop and in-flight drain on
//! shutdown.
//!
//! ```rust,no_run
//! use json_echo_server::{Config, HttpServer};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> std::io::Result<()> {
//!     let mut server = HttpServer::new(Config::default());
//!     server.start().await?;
//!     // ... serve until told otherwise ...
//!     server.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;

pub use config::Config;
pub use server::HttpServer;
