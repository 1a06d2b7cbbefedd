use thiserror::Error;

/// Failures of the compact ("bits") target codec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompactError {
    #[error("compact exponent {0} is below 3")]
    ExponentTooSmall(u32),

    #[error("target is zero")]
    ZeroTarget,

    #[error("target needs {0} bytes, more than a compact exponent can hold")]
    TargetTooLarge(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetargetError {
    /// Desired timespan of zero; a configuration error, not a runtime one.
    #[error("desired timespan must be greater than zero")]
    ZeroTimespan,

    #[error("desired timespan is too large")]
    TimespanOverflow,

    #[error("unparseable block time {0:?}")]
    InvalidTime(String),

    #[error(transparent)]
    Compact(#[from] CompactError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    #[error("mining cancelled after {attempts} attempts")]
    Cancelled { attempts: u64 },

    #[error("target for bits {bits:#010x} cannot be reached")]
    TargetUnreachable { bits: u32 },

    #[error("chain tip moved while mining block #{index}")]
    StaleTip { index: u64 },

    #[error("block #{index} is not a valid sealed block")]
    InvalidBlock { index: u64 },

    #[error(transparent)]
    Compact(#[from] CompactError),

    #[error(transparent)]
    Retarget(#[from] RetargetError),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroTimespan(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("invalid hex")]
    InvalidHex,

    #[error("invalid public key bytes")]
    InvalidPublicKey,

    #[error("invalid secret key bytes")]
    InvalidSecretKey,
}
