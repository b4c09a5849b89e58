use crate::errors::{CidrError, ParseError, Result, UtilsError};
use crate::network::CidrBlock;
use regex::Regex;
use std::net::Ipv4Addr;
use std::time::Duration;

/// Trait for parsing operator and vendor-supplied strings
pub trait Parser {
    type Output;

    fn parse(&self, input: &str) -> Result<Self::Output>;
}

/// CIDR notation parser ("10.0.0.0/24")
pub struct CidrParser;

impl Parser for CidrParser {
    type Output = CidrBlock;

    /// Parse an IPv4 CIDR block. Host bits in the address are cleared.
    fn parse(&self, cidr: &str) -> Result<Self::Output> {
        let trimmed = cidr.trim();
        let (address, prefix) = trimmed
            .split_once('/')
            .ok_or_else(|| CidrError::MissingPrefix(trimmed.to_string()))?;

        let address: Ipv4Addr = address
            .parse()
            .map_err(|_| CidrError::InvalidAddress(trimmed.to_string()))?;

        let prefix_len = prefix
            .parse::<u8>()
            .ok()
            .filter(|p| *p <= 32 && prefix.chars().all(|c| c.is_ascii_digit()))
            .ok_or_else(|| CidrError::InvalidPrefix(trimmed.to_string()))?;

        Ok(CidrBlock::new(address, prefix_len))
    }
}

/// Size parser returning gigabytes ("16", "16G", "512MiB", "1.5T")
pub struct SizeParser;

impl Parser for SizeParser {
    type Output = f64;

    fn parse(&self, input: &str) -> Result<Self::Output> {
        let re = Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*([kmgtp])?(?:i?b)?\s*$")
            .map_err(|e| ParseError::InvalidFormat(e.to_string()))?;

        let caps = re.captures(input).ok_or_else(|| {
            ParseError::InvalidFormat(format!(
                "Invalid size '{}'. Use a number with an optional unit (e.g. 16G, 512M)",
                input
            ))
        })?;

        let value: f64 = caps[1]
            .parse()
            .map_err(|_| ParseError::InvalidValue(input.to_string()))?;

        let unit = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| "g".to_string());

        let gigabytes = match unit.as_str() {
            "k" => value / (1024.0 * 1024.0),
            "m" => value / 1024.0,
            "g" => value,
            "t" => value * 1024.0,
            "p" => value * 1024.0 * 1024.0,
            _ => return Err(UtilsError::Parse(ParseError::InvalidValue(input.to_string()))),
        };

        Ok(gigabytes)
    }
}

/// Duration parser ("500ms", "30s", "5m", "1h"; bare numbers are seconds)
pub struct DurationParser;

impl Parser for DurationParser {
    type Output = Duration;

    fn parse(&self, input: &str) -> Result<Self::Output> {
        let re = Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(ms|s|m|h)?\s*$")
            .map_err(|e| ParseError::InvalidFormat(e.to_string()))?;

        let caps = re.captures(input).ok_or_else(|| {
            ParseError::InvalidFormat(format!(
                "Invalid duration '{}'. Use e.g. 500ms, 30s, 5m, 1h",
                input
            ))
        })?;

        let value: f64 = caps[1]
            .parse()
            .map_err(|_| ParseError::InvalidValue(input.to_string()))?;

        let unit = caps
            .get(2)
            .map(|m| m.as_str().to_ascii_lowercase())
            .unwrap_or_else(|| "s".to_string());

        let seconds = match unit.as_str() {
            "ms" => value / 1000.0,
            "s" => value,
            "m" => value * 60.0,
            "h" => value * 3600.0,
            _ => return Err(UtilsError::Parse(ParseError::InvalidValue(input.to_string()))),
        };

        Duration::try_from_secs_f64(seconds)
            .map_err(|_| UtilsError::Parse(ParseError::InvalidValue(input.to_string())))
    }
}

// Convenience functions
pub fn parse_cidr(cidr: &str) -> Result<CidrBlock> {
    CidrParser.parse(cidr)
}

pub fn parse_size_gb(input: &str) -> Result<f64> {
    SizeParser.parse(input)
}

pub fn parse_duration(input: &str) -> Result<Duration> {
    DurationParser.parse(input)
}
