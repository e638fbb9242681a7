//! Main Crate Error

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
/// Kadlookup crate error enum.
pub enum Error {
    /// Id was created from a byte slice of the wrong length.
    #[error("Invalid Id size, expected 20, got {0}")]
    InvalidIdSize(usize),

    /// Id string form is not 40 hex characters.
    #[error("Invalid Id encoding: {0}")]
    InvalidIdHex(String),

    /// A [crate::Config] value the lookup engines can't run with.
    #[error("Invalid config: {0}")]
    InvalidConfig(&'static str),
}

/// Alias for `Result<T, Error>`.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(feature = "async")]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("The worker thread running this operation is gone")]
/// The thread running an [crate::async_kademlia::AsyncKademlia] operation
/// exited without returning a result.
pub struct KademliaWasShutdown;
