use crate::{display::display_host_ranges, Result};
use clap::Args;
use serde::Serialize;
use stratus_utils::{parse_cidr, AddressRange, CidrBlock};

/// Command-line arguments for the `range` command.
///
/// # Examples
/// ```bash
/// stratus range 192.168.0.0/24
/// stratus range 10.0.0.0/16 172.16.4.0/30 --json
/// ```
#[derive(Args, Debug)]
pub struct RangeArgs {
    /// CIDR blocks, e.g. 10.0.0.0/24
    #[arg(required = true, value_name = "CIDR")]
    pub cidrs: Vec<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

/// JSON view of one block's host range
#[derive(Debug, Serialize)]
struct RangeReport {
    cidr: String,
    netmask: String,
    broadcast: String,
    #[serde(flatten)]
    range: AddressRange,
    hosts: u64,
}

impl From<&CidrBlock> for RangeReport {
    fn from(block: &CidrBlock) -> Self {
        let range = block.host_range();
        Self {
            cidr: block.to_string(),
            netmask: block.netmask().to_string(),
            broadcast: block.broadcast().to_string(),
            range,
            hosts: range.len(),
        }
    }
}

/// Handles the `range` command. All blocks are parsed before anything is printed.
pub async fn handle(args: RangeArgs) -> Result<()> {
    let blocks = args
        .cidrs
        .iter()
        .map(|c| parse_cidr(c))
        .collect::<stratus_utils::Result<Vec<_>>>()?;

    if args.json {
        let reports: Vec<RangeReport> = blocks.iter().map(RangeReport::from).collect();
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        display_host_ranges(&blocks);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CliError;

    #[test]
    fn test_report_fields() {
        let block = parse_cidr("192.168.0.0/24").unwrap();
        let json = serde_json::to_value(RangeReport::from(&block)).unwrap();

        assert_eq!(json["cidr"], "192.168.0.0/24");
        assert_eq!(json["first"], "192.168.0.1");
        assert_eq!(json["last"], "192.168.0.254");
        assert_eq!(json["broadcast"], "192.168.0.255");
        assert_eq!(json["hosts"], 254);
    }

    #[tokio::test]
    async fn test_malformed_cidr_fails_whole_command() {
        let args = RangeArgs {
            cidrs: vec!["10.0.0.0/24".to_string(), "10.0.0.0".to_string()],
            json: true,
        };
        assert!(matches!(handle(args).await, Err(CliError::Utils(_))));
    }
}
