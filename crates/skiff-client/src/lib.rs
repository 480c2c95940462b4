//! Asynchronous client for the Skiff platform management API.
//!
//! Most calls are single request/response mappings (apps, collaborators,
//! domains, keys, config vars, add-ons, processes, logs, releases). Remote
//! command execution is different: [`Client::start_service`] returns a
//! [`StreamingSession`] that long-polls the command's output chunk by chunk,
//! following the continuation location the platform hands out with each
//! chunk, until a chunk arrives without one.
//!
//! ```rust,ignore
//! use skiff_client::{Client, ClientConfig, Credentials};
//!
//! let config = ClientConfig::from_env(skiff_client::DEFAULT_HOST)?
//!     .with_credentials(Some(Credentials::new("ops@example.com", api_key)));
//! let client = Client::new(config)?;
//! client.on_warning(|warning| eprintln!(" !    {warning}"));
//!
//! let mut session = client.start_service("demo", "rake db:migrate", true).await?;
//! session.for_each(|chunk| print!("{chunk}")).await?;
//! ```

pub mod api;
mod client;
mod config;
mod console;
mod error;
mod service;
mod transport;
mod warnings;

#[cfg(test)]
mod mock;

pub use client::Client;
pub use config::{ClientConfig, Credentials, API_VERSION, DEFAULT_HOST, HOST_ENV};
pub use console::{prefix_last_line, ScopedConsole, CONSOLE_PROMPT};
pub use error::{ClientError, ClientResult};
pub use service::{
    classify_chunk, Action, ChunkOutcome, OutputChunk, ProcessHandle, RemoteCommand,
    StreamingSession, EMPTY_CHUNK_BACKOFF,
};
pub use transport::{
    Payload, ReqwestTransport, Request, Response, Target, Transport, API_VERSION_HEADER,
    UPID_HEADER, WARNING_HEADER,
};
pub use warnings::WarningHandler;
