use std::net::Ipv4Addr;
use thiserror::Error;

/// Infrastructure-specific errors for stratus-utils
#[derive(Error, Debug)]
pub enum UtilsError {
    #[error("CIDR error: {0}")]
    Cidr(#[from] CidrError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Poll policy error: {0}")]
    Policy(#[from] PolicyError),

    #[error("Address pool error: {0}")]
    Pool(#[from] PoolError),
}

#[derive(Error, Debug, PartialEq)]
pub enum CidrError {
    #[error("Missing prefix length in '{0}'")]
    MissingPrefix(String),

    #[error("Invalid address in '{0}'")]
    InvalidAddress(String),

    #[error("Invalid prefix length in '{0}'")]
    InvalidPrefix(String),

    #[error("Range start {first} is after its end {last}")]
    InvertedRange { first: Ipv4Addr, last: Ipv4Addr },
}

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("Failed to parse: {0}")]
    InvalidFormat(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum PolicyError {
    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    #[error("Total timeout {timeout:?} is shorter than the interval {interval:?}")]
    TimeoutShorterThanInterval {
        timeout: std::time::Duration,
        interval: std::time::Duration,
    },
}

#[derive(Error, Debug, PartialEq)]
pub enum PoolError {
    #[error("Address pool exhausted")]
    Exhausted,

    #[error("Address {0} is outside the pool range")]
    OutOfRange(Ipv4Addr),

    #[error("Address {0} is already allocated")]
    AlreadyAllocated(Ipv4Addr),

    #[error("Address {0} is not allocated")]
    NotAllocated(Ipv4Addr),
}

pub type Result<T> = std::result::Result<T, UtilsError>;
