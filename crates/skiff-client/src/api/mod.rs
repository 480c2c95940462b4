//! One-call wrappers over the platform's management endpoints.

mod addons;
mod apps;
mod collaborators;
mod config_vars;
mod domains;
mod keys;
mod logs;
mod processes;
mod releases;

pub use addons::{Addon, AddonChange};
pub use apps::{App, NewApp};
pub use collaborators::Collaborator;
pub use domains::{Domain, SslCertificate};
pub use keys::SshKey;
pub use logs::LogOptions;
pub use processes::{ProcessInfo, ProcessSelector};
pub use releases::Release;
