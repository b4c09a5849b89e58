use crate::{
    config::Config,
    display::{display_exclusions, display_ranked_templates, print_info, print_warning},
    CliError, Result,
};
use clap::{Args, ValueEnum};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use stratus_core::{
    parse_catalog, qualifies, rank_templates, unmet_dimensions, Architecture, DrfScorer,
    PriceScorer, ResourceRequirement, ResourceSpec, Scorer, TemplateCandidate,
};
use stratus_utils::parse_size_gb;

/// Command-line arguments for the `select` command that ranks machine templates.
///
/// The catalog is a JSON array of templates already translated from a
/// provider's instance types. Only templates of the requested architecture
/// that meet every minimum are ranked; the rest can be listed with `--explain`.
///
/// # Examples
/// ```bash
/// # Tightest fit for 4 cores and 16 GB of memory
/// stratus select --catalog shapes.json --cpu-cores 4 --memory 16G
///
/// # Cheapest arm64 template on a 12 month commitment
/// stratus select --catalog shapes.json --arch arm64 --scorer price --commitment 12
///
/// # Top 3 GPU templates as JSON
/// stratus select --catalog shapes.json --gpu-count 1 --gpu-memory 24G --limit 3 --format json
/// ```
#[derive(Args, Debug)]
pub struct SelectArgs {
    /// Path to the template catalog (JSON array)
    #[arg(short, long, value_name = "FILE")]
    pub catalog: PathBuf,

    /// Required CPU architecture
    #[arg(long, default_value = "x86_64")]
    pub arch: String,

    /// Minimum CPU cores
    #[arg(long, default_value_t = 0)]
    pub cpu_cores: u32,

    /// Minimum CPU frequency in GHz
    #[arg(long, default_value_t = 0.0)]
    pub cpu_ghz: f64,

    /// Minimum memory (e.g. 16G, 512M; bare numbers are GB)
    #[arg(long, value_parser = parse_size_arg)]
    pub memory: Option<f64>,

    /// Minimum system disk size
    #[arg(long, value_parser = parse_size_arg)]
    pub system_disk: Option<f64>,

    /// Minimum ephemeral disk size
    #[arg(long, value_parser = parse_size_arg)]
    pub ephemeral_disk: Option<f64>,

    /// Minimum GPU count
    #[arg(long, default_value_t = 0)]
    pub gpu_count: u32,

    /// Minimum GPU cores
    #[arg(long, default_value_t = 0)]
    pub gpu_cores: u32,

    /// Minimum GPU memory
    #[arg(long, value_parser = parse_size_arg)]
    pub gpu_memory: Option<f64>,

    /// Minimum GPU frequency in GHz
    #[arg(long, default_value_t = 0.0)]
    pub gpu_ghz: f64,

    /// Ranking strategy
    #[arg(long, value_enum, default_value = "drf")]
    pub scorer: ScorerKind,

    /// Commitment length in months for price ranking (defaults to pricing.commitment_months)
    #[arg(long, value_name = "MONTHS")]
    pub commitment: Option<u32>,

    /// Show at most this many templates
    #[arg(short, long)]
    pub limit: Option<usize>,

    /// List excluded templates and the dimensions they fall short on
    #[arg(long)]
    pub explain: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScorerKind {
    /// Weighted overage across every dimension (tightest fit first)
    Drf,
    /// Effective price (cheapest first)
    Price,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

fn parse_size_arg(s: &str) -> std::result::Result<f64, String> {
    parse_size_gb(s).map_err(|e| e.to_string())
}

/// Build the requirement described by the flags
pub fn build_requirement(args: &SelectArgs) -> Result<ResourceRequirement> {
    let architecture: Architecture = args.arch.parse()?;
    let requirement = ResourceRequirement::new(
        architecture,
        ResourceSpec {
            cpu_cores: args.cpu_cores,
            cpu_frequency_ghz: args.cpu_ghz,
            memory_gb: args.memory.unwrap_or(0.0),
            system_disk_gb: args.system_disk.unwrap_or(0.0),
            ephemeral_disk_gb: args.ephemeral_disk.unwrap_or(0.0),
            gpu_count: args.gpu_count,
            gpu_cores: args.gpu_cores,
            gpu_memory_gb: args.gpu_memory.unwrap_or(0.0),
            gpu_frequency_ghz: args.gpu_ghz,
        },
    );
    requirement.validate()?;
    Ok(requirement)
}

/// Price view used for display and for price ranking
pub fn build_pricing(args: &SelectArgs, config: &Config) -> Result<PriceScorer> {
    let commitment_months = match args.commitment {
        Some(months) => Some(months),
        None => config.commitment_months()?,
    };
    Ok(PriceScorer {
        commitment_months,
        hours_per_month: config.hours_per_month()?,
    })
}

/// Scorer chosen by `--scorer`, configured from the config file
pub fn build_scorer(args: &SelectArgs, config: &Config) -> Result<Box<dyn Scorer>> {
    let scorer: Box<dyn Scorer> = match args.scorer {
        ScorerKind::Drf => Box::new(DrfScorer::new(config.score_weights()?)),
        ScorerKind::Price => Box::new(build_pricing(args, config)?),
    };
    Ok(scorer)
}

pub fn load_catalog(path: &Path) -> Result<Vec<TemplateCandidate>> {
    let content = fs::read_to_string(path).map_err(|e| {
        CliError::InvalidInput(format!("Cannot read catalog {}: {}", path.display(), e))
    })?;
    Ok(parse_catalog(&content)?)
}

/// Handles the `select` command
pub async fn handle(args: SelectArgs, config: &Config) -> Result<()> {
    let requirement = build_requirement(&args)?;
    let catalog = load_catalog(&args.catalog)?;
    let scorer = build_scorer(&args, config)?;

    debug!(
        "ranking {} templates with {:?} scorer",
        catalog.len(),
        args.scorer
    );

    let mut ranked = rank_templates(&catalog, &requirement, scorer.as_ref());
    let qualifying = ranked.len();
    if let Some(limit) = args.limit {
        ranked.truncate(limit);
    }

    let excluded: Vec<(&TemplateCandidate, _)> = if args.explain {
        catalog
            .iter()
            .filter(|c| !qualifies(c, &requirement))
            .map(|c| (c, unmet_dimensions(c, &requirement)))
            .collect()
    } else {
        Vec::new()
    };

    match args.format {
        OutputFormat::Json => {
            let report = serde_json::json!({
                "requirement": requirement,
                "ranked": ranked,
                "excluded": excluded
                    .iter()
                    .map(|(c, m)| serde_json::json!({ "id": c.id, "mismatches": m }))
                    .collect::<Vec<_>>(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            display_ranked_templates(&ranked, &build_pricing(&args, config)?);
            display_exclusions(&excluded);

            if qualifying == 0 {
                print_warning("Relax the requirement or add templates to the catalog");
            } else if qualifying > ranked.len() {
                print_info(&format!(
                    "Showing {} of {} qualifying templates",
                    ranked.len(),
                    qualifying
                ));
            }
        }
    }

    Ok(())
}
