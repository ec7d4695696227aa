use thiserror::Error;

/// Everything that can go wrong in the register, from a bad request to a failed commit.
#[derive(Debug, Error)]
pub enum Error {
    /// A slot index outside the current catalog.
    #[error("Product index {index} is out of range (catalog holds {len} products)")]
    IndexOutOfRange {
        /// Index as sent by the caller
        index: i64,
        /// Catalog length at the time
        len: usize,
    },

    /// An append into a full catalog.
    #[error("Catalog is full ({capacity} products)")]
    CapacityExceeded {
        /// Maximum number of products
        capacity: usize,
    },

    /// An add amount that is zero or negative.
    #[error("Invalid quantity {quantity}: must be a positive whole number")]
    InvalidQuantity {
        /// Amount as sent by the caller
        quantity: i64,
    },

    /// Price text that is not a usable amount.
    #[error("Invalid price '{input}'")]
    InvalidPrice {
        /// Rejected input
        input: String,
    },

    /// A name that is empty after trimming or contains control characters.
    #[error("Product name must be non-empty and free of control characters")]
    InvalidName,

    /// A required query parameter was not sent.
    #[error("Missing request parameter '{name}'")]
    MissingParameter {
        /// Parameter name
        name: &'static str,
    },

    /// A record read or write past the end of the persistent region.
    #[error("Store access of {len} bytes at offset {offset} exceeds capacity {capacity}")]
    StoreOutOfBounds {
        /// First byte accessed
        offset: usize,
        /// Bytes accessed
        len: usize,
        /// Size of the region
        capacity: usize,
    },

    /// Malformed environment value or products file.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong, naming the offending key or product
        message: String,
    },

    /// Reading or committing the store image failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An environment variable could not be read.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// The state owner has stopped, usually for a restart.
    #[error("Register is restarting, try again shortly")]
    Unavailable,
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
