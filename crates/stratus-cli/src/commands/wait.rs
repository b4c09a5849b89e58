use crate::{
    config::Config,
    display::{display_poll_outcomes, print_success, print_warning},
    CliError, Result,
};
use clap::Args;
use futures::future::join_all;
use log::{debug, info};
use std::process::Stdio;
use std::time::Duration;
use stratus_utils::{format_elapsed, parse_duration, poll_async, CancelToken, PollPolicy};
use tokio::process::Command;

/// Command-line arguments for the `wait` command.
///
/// Each probe is a command that is run immediately and then once per
/// interval until it exits with status 0 or the timeout would be exceeded.
/// Multiple probes are polled concurrently; Ctrl-C cancels all of them.
#[derive(Args, Debug)]
pub struct WaitArgs {
    /// Overall time budget per probe (e.g. 90s, 5m); defaults to poll.timeout_secs
    #[arg(short, long, value_parser = parse_duration_arg)]
    pub timeout: Option<Duration>,

    /// Time between attempts (e.g. 500ms, 10s); defaults to poll.interval_secs
    #[arg(short, long, value_parser = parse_duration_arg)]
    pub interval: Option<Duration>,

    /// Shell command to poll (repeatable, run with `sh -c`)
    #[arg(short, long, value_name = "SHELL_COMMAND")]
    pub probe: Vec<String>,

    /// Command to poll, given after `--`
    #[arg(last = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

fn parse_duration_arg(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

/// A command polled for a zero exit status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeCommand {
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
}

impl ProbeCommand {
    /// Run through `sh -c`
    pub fn shell(command: &str) -> Self {
        Self {
            label: command.to_string(),
            program: "sh".to_string(),
            args: vec!["-c".to_string(), command.to_string()],
        }
    }

    /// Run a program directly; `None` for an empty argv
    pub fn direct(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self {
            label: argv.join(" "),
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    /// One attempt. `Err` carries the reason the command did not succeed.
    pub async fn run(&self) -> std::result::Result<(), String> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to start: {}", e))?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let detail = stderr.lines().last().unwrap_or("").trim().to_string();
        let status = match output.status.code() {
            Some(code) => format!("exit {}", code),
            None => "killed by signal".to_string(),
        };

        if detail.is_empty() {
            Err(status)
        } else {
            Err(format!("{}: {}", status, detail))
        }
    }
}

/// Probes named by the arguments: the trailing command first, then each `--probe`
pub fn collect_probes(args: &WaitArgs) -> Result<Vec<ProbeCommand>> {
    let probes: Vec<ProbeCommand> = ProbeCommand::direct(&args.command)
        .into_iter()
        .chain(args.probe.iter().map(|p| ProbeCommand::shell(p)))
        .collect();

    if probes.is_empty() {
        return Err(CliError::InvalidInput(
            "Nothing to wait for: give a command after `--` or at least one --probe".to_string(),
        ));
    }

    Ok(probes)
}

/// Flags override the `[poll]` config section field by field
pub fn resolve_policy(args: &WaitArgs, config: &Config) -> Result<PollPolicy> {
    let configured = config.poll_policy()?;
    Ok(PollPolicy::new(
        args.timeout.unwrap_or(configured.total_timeout),
        args.interval.unwrap_or(configured.interval),
    )?)
}

/// Handles the `wait` command
pub async fn handle(args: WaitArgs, config: &Config) -> Result<()> {
    let probes = collect_probes(&args)?;
    let policy = resolve_policy(&args, config)?;

    info!(
        "waiting on {} probe(s): timeout {:?}, interval {:?}",
        probes.len(),
        policy.total_timeout,
        policy.interval
    );

    let cancel = CancelToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                debug!("interrupt received, cancelling probes");
                cancel.cancel();
            }
        })
    };

    let polls = probes.iter().map(|probe| {
        let cancel = &cancel;
        let policy = &policy;
        async move {
            let outcome =
                poll_async(move || probe.run(), |r| r.is_ok(), policy, Some(cancel)).await;
            (probe.label.clone(), outcome)
        }
    });
    let outcomes = join_all(polls).await;
    ctrl_c.abort();

    display_poll_outcomes(&outcomes);

    let slowest = outcomes
        .iter()
        .map(|(_, o)| o.elapsed)
        .max()
        .unwrap_or_default();
    let failed = outcomes.iter().filter(|(_, o)| !o.converged()).count();

    if failed == 0 {
        print_success(&format!(
            "All {} probe(s) converged in {}",
            outcomes.len(),
            format_elapsed(slowest)
        ));
        Ok(())
    } else if cancel.is_cancelled() {
        print_warning("Interrupted");
        Err(CliError::OperationFailed(format!(
            "{} of {} probe(s) cancelled before converging",
            failed,
            outcomes.len()
        )))
    } else {
        Err(CliError::OperationFailed(format!(
            "{} of {} probe(s) did not converge within {}",
            failed,
            outcomes.len(),
            format_elapsed(policy.total_timeout)
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Cli, Commands};
    use clap::Parser;
    use tempfile::TempDir;

    fn parse(args: &[&str]) -> WaitArgs {
        let mut argv = vec!["stratus", "wait"];
        argv.extend_from_slice(args);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Wait(args) => args,
            _ => panic!("expected wait"),
        }
    }

    fn empty_config(dir: &TempDir) -> Config {
        Config::load_from(dir.path()).unwrap()
    }

    #[test]
    fn test_collects_trailing_command_and_probes() {
        let args = parse(&["--probe", "test -f /tmp/ready", "--", "curl", "-sf", "http://x"]);
        let probes = collect_probes(&args).unwrap();

        assert_eq!(probes.len(), 2);
        assert_eq!(probes[0].program, "curl");
        assert_eq!(probes[0].args, vec!["-sf", "http://x"]);
        assert_eq!(probes[0].label, "curl -sf http://x");
        assert_eq!(probes[1], ProbeCommand::shell("test -f /tmp/ready"));
    }

    #[test]
    fn test_requires_a_probe() {
        let args = parse(&["--timeout", "10s"]);
        assert!(matches!(
            collect_probes(&args),
            Err(CliError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_policy_flags_override_config() {
        let dir = TempDir::new().unwrap();
        let mut config = empty_config(&dir);
        config.set_value("poll.timeout_secs", "120").unwrap();
        config.set_value("poll.interval_secs", "20").unwrap();

        let policy = resolve_policy(&parse(&["-i", "500ms", "--", "true"]), &config).unwrap();
        assert_eq!(policy.total_timeout, Duration::from_secs(120));
        assert_eq!(policy.interval, Duration::from_millis(500));

        let invalid = parse(&["--timeout", "1s", "--interval", "5s", "--", "true"]);
        assert!(matches!(
            resolve_policy(&invalid, &config),
            Err(CliError::Utils(_))
        ));
    }

    #[tokio::test]
    async fn test_probe_reports_exit_status() {
        assert_eq!(ProbeCommand::shell("exit 0").run().await, Ok(()));

        let err = ProbeCommand::shell("echo not yet >&2; exit 3")
            .run()
            .await
            .unwrap_err();
        assert_eq!(err, "exit 3: not yet");

        let missing = ProbeCommand::direct(&["/nonexistent/stratus-probe".to_string()]).unwrap();
        assert!(missing.run().await.unwrap_err().starts_with("failed to start"));
    }

    #[tokio::test]
    async fn test_waits_for_file_to_appear() {
        let dir = TempDir::new().unwrap();
        let config = empty_config(&dir);
        let marker = dir.path().join("ready");

        let writer = {
            let marker = marker.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(150)).await;
                std::fs::write(marker, "ok").unwrap();
            })
        };

        let probe = format!("test -f '{}'", marker.display());
        let args = parse(&["--timeout", "5s", "--interval", "50ms", "--probe", &probe]);
        handle(args, &config).await.unwrap();
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_reports_timeout() {
        let dir = TempDir::new().unwrap();
        let config = empty_config(&dir);

        let args = parse(&["--timeout", "200ms", "--interval", "50ms", "--", "false"]);
        assert!(matches!(
            handle(args, &config).await,
            Err(CliError::OperationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_hung_command_is_stopped_at_timeout() {
        let dir = TempDir::new().unwrap();
        let config = empty_config(&dir);

        let args = parse(&["--timeout", "300ms", "--interval", "100ms", "--", "sleep", "30"]);
        let result = tokio::time::timeout(Duration::from_secs(5), handle(args, &config))
            .await
            .expect("wait outlived its timeout");
        assert!(matches!(result, Err(CliError::OperationFailed(_))));
    }
}
