//! Error taxonomy for the progression engine.

use crate::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Malformed weighted set. Fatal when raised while loading configuration.
    #[error("Invalid catalog: {0}")]
    InvalidCatalog(String),

    #[error("Unknown affinity class: {0}")]
    UnknownAffinityClass(String),

    #[error("Luck value {0} is outside 0..=100")]
    InvalidLuckValue(i64),

    #[error("Invalid rate for {context}: {value}")]
    InvalidRate { context: &'static str, value: f64 },

    #[error("Unknown attribute kind: {0}")]
    UnknownAttributeKind(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Character not found: {0}")]
    CharacterNotFound(Uuid),

    #[error("Cannot attempt realm {target} from realm {current}")]
    InvalidTargetRealm { current: u32, target: u32 },

    #[error("Realm {0} is the highest realm")]
    RealmCapReached(u32),

    #[error("Breakthrough to realm {realm} requires {required} experience, have {available}")]
    InsufficientExperience {
        realm: u32,
        required: u64,
        available: u64,
    },

    /// The state no longer matches the one the attempt was rolled against.
    #[error("Breakthrough attempt for {0} is stale or already applied")]
    StaleAttempt(Uuid),

    #[error("Randomness source failed: {0}")]
    Entropy(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
