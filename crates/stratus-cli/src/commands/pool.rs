use crate::{display::print_success, display::Table, CliError, Result};
use clap::Args;
use log::debug;
use std::net::Ipv4Addr;
use stratus_utils::AddressPool;

/// Command-line arguments for the `pool` command.
///
/// Allocates the lowest free host addresses of a block after skipping any
/// addresses that are already in use.
///
/// # Examples
/// ```bash
/// stratus pool 203.0.113.0/28 --allocate 3
/// stratus pool 203.0.113.0/28 --reserve 203.0.113.1 --reserve 203.0.113.2 -n 2
/// ```
#[derive(Args, Debug)]
pub struct PoolArgs {
    /// CIDR block backing the pool
    #[arg(value_name = "CIDR")]
    pub cidr: String,

    /// Addresses already in use (repeatable)
    #[arg(long, value_name = "IP")]
    pub reserve: Vec<Ipv4Addr>,

    /// Number of addresses to allocate
    #[arg(short = 'n', long, default_value_t = 1)]
    pub allocate: usize,
}

/// Reserve, then allocate; returns the allocated addresses and the pool left over
pub fn allocate_from(args: &PoolArgs) -> Result<(Vec<Ipv4Addr>, AddressPool)> {
    let mut pool = AddressPool::from_cidr(&args.cidr)?;

    for addr in &args.reserve {
        pool.reserve(*addr)?;
    }

    if (args.allocate as u64) > pool.available() {
        return Err(CliError::InvalidInput(format!(
            "Requested {} addresses but only {} are free in {}",
            args.allocate,
            pool.available(),
            args.cidr
        )));
    }

    let allocated = (0..args.allocate)
        .map(|_| pool.allocate())
        .collect::<stratus_utils::Result<Vec<_>>>()?;

    debug!("allocated {:?} from {}", allocated, args.cidr);
    Ok((allocated, pool))
}

/// Handles the `pool` command
pub async fn handle(args: PoolArgs) -> Result<()> {
    let (allocated, pool) = allocate_from(&args)?;

    let mut table = Table::new(vec!["#".to_string(), "Address".to_string()]);
    for (i, addr) in allocated.iter().enumerate() {
        table.add_row(vec![(i + 1).to_string(), addr.to_string()]);
    }
    if !table.is_empty() {
        table.print();
    }

    let range = pool.range();
    print_success(&format!(
        "Allocated {} address(es); {} of {} free in {} - {}",
        allocated.len(),
        pool.available(),
        range.len(),
        range.first(),
        range.last()
    ));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cidr: &str, reserve: &[&str], allocate: usize) -> PoolArgs {
        PoolArgs {
            cidr: cidr.to_string(),
            reserve: reserve.iter().map(|a| a.parse().unwrap()).collect(),
            allocate,
        }
    }

    #[test]
    fn test_allocates_around_reservations() {
        let (allocated, pool) =
            allocate_from(&args("10.0.0.0/29", &["10.0.0.1", "10.0.0.3"], 2)).unwrap();

        assert_eq!(
            allocated,
            vec![
                "10.0.0.2".parse::<Ipv4Addr>().unwrap(),
                "10.0.0.4".parse::<Ipv4Addr>().unwrap()
            ]
        );
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn test_rejects_oversized_request() {
        let result = allocate_from(&args("10.0.0.0/30", &[], 3));
        assert!(matches!(result, Err(CliError::InvalidInput(_))));
    }

    #[test]
    fn test_rejects_reservation_outside_block() {
        let result = allocate_from(&args("10.0.0.0/30", &["10.0.1.1"], 1));
        assert!(matches!(result, Err(CliError::Utils(_))));
    }
}
