use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Kubernetes reported error: {source}")]
    KubeError {
        #[from]
        source: kube::Error,
    },

    #[error("IO Error: {source}")]
    IOError {
        #[from]
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("Container resolve error: {0}")]
    ContainerResolveError(String),

    #[error("Probe command failed: {0}")]
    ProbeExecError(String),

    #[error("Unparseable probe output: {0}")]
    ProbeParseError(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Log setup
pub mod telemetry;

pub mod config;
pub use crate::config::Config;

pub mod ip;

pub mod probe;
pub use crate::probe::{Cnsenter, ContainerRef, ProbeRunner};

pub mod topology;
pub use crate::topology::Snapshot;

pub mod checker;
pub use crate::checker::run_checks;

pub mod scheduler;
