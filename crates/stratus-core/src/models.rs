use crate::errors::{Result, StratusError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// CPU architecture of a machine shape.
///
/// Compared categorically: two values match only when they are equal. Vendor
/// spellings are folded onto the two well-known variants when parsed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Architecture {
    #[default]
    X86_64,
    Arm64,
    Other(String),
}

impl FromStr for Architecture {
    type Err = StratusError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "" => Err(StratusError::InvalidInput(
                "Architecture cannot be empty".to_string(),
            )),
            "x86_64" | "x86-64" | "x86" | "x64" | "amd64" => Ok(Architecture::X86_64),
            "arm64" | "aarch64" | "arm" => Ok(Architecture::Arm64),
            _ => Ok(Architecture::Other(normalized)),
        }
    }
}

impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Architecture::X86_64 => write!(f, "x86_64"),
            Architecture::Arm64 => write!(f, "arm64"),
            Architecture::Other(name) => write!(f, "{}", name),
        }
    }
}

impl From<Architecture> for String {
    fn from(arch: Architecture) -> Self {
        arch.to_string()
    }
}

impl TryFrom<String> for Architecture {
    type Error = StratusError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

/// Numeric resource dimensions shared by requirements and candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    CpuCores,
    CpuFrequency,
    Memory,
    SystemDisk,
    EphemeralDisk,
    GpuCount,
    GpuCores,
    GpuMemory,
    GpuFrequency,
}

impl Dimension {
    pub const ALL: [Dimension; 9] = [
        Dimension::CpuCores,
        Dimension::CpuFrequency,
        Dimension::Memory,
        Dimension::SystemDisk,
        Dimension::EphemeralDisk,
        Dimension::GpuCount,
        Dimension::GpuCores,
        Dimension::GpuMemory,
        Dimension::GpuFrequency,
    ];

    /// Stable snake_case key, used in config files and serialized models
    pub fn key(&self) -> &'static str {
        match self {
            Dimension::CpuCores => "cpu_cores",
            Dimension::CpuFrequency => "cpu_frequency_ghz",
            Dimension::Memory => "memory_gb",
            Dimension::SystemDisk => "system_disk_gb",
            Dimension::EphemeralDisk => "ephemeral_disk_gb",
            Dimension::GpuCount => "gpu_count",
            Dimension::GpuCores => "gpu_cores",
            Dimension::GpuMemory => "gpu_memory_gb",
            Dimension::GpuFrequency => "gpu_frequency_ghz",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Dimension {
    type Err = StratusError;

    fn from_str(s: &str) -> Result<Self> {
        let key = s.trim().to_lowercase();
        Dimension::ALL
            .iter()
            .copied()
            .find(|d| d.key() == key)
            .ok_or_else(|| StratusError::ParseError(format!("Unknown resource dimension: {}", s)))
    }
}

/// Quantities along every numeric dimension.
///
/// Frequencies are in GHz, memory and disk sizes in GB.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceSpec {
    pub cpu_cores: u32,
    pub cpu_frequency_ghz: f64,
    pub memory_gb: f64,
    pub system_disk_gb: f64,
    pub ephemeral_disk_gb: f64,
    pub gpu_count: u32,
    pub gpu_cores: u32,
    pub gpu_memory_gb: f64,
    pub gpu_frequency_ghz: f64,
}

impl ResourceSpec {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::CpuCores => self.cpu_cores as f64,
            Dimension::CpuFrequency => self.cpu_frequency_ghz,
            Dimension::Memory => self.memory_gb,
            Dimension::SystemDisk => self.system_disk_gb,
            Dimension::EphemeralDisk => self.ephemeral_disk_gb,
            Dimension::GpuCount => self.gpu_count as f64,
            Dimension::GpuCores => self.gpu_cores as f64,
            Dimension::GpuMemory => self.gpu_memory_gb,
            Dimension::GpuFrequency => self.gpu_frequency_ghz,
        }
    }

    /// Check that every dimension is a finite, non-negative number
    pub fn validate(&self) -> Result<()> {
        for dimension in Dimension::ALL {
            let value = self.get(dimension);
            if !value.is_finite() || value < 0.0 {
                return Err(StratusError::ValidationFailed(format!(
                    "{} must be a non-negative number, got {}",
                    dimension, value
                )));
            }
        }
        Ok(())
    }
}

/// Minimum resources a workload asks for.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResourceRequirement {
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(flatten)]
    pub resources: ResourceSpec,
}

impl ResourceRequirement {
    pub fn new(architecture: Architecture, resources: ResourceSpec) -> Self {
        Self {
            architecture,
            resources,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.resources.validate()
    }
}

/// A machine shape offered by a provider, translated into the unified form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateCandidate {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub architecture: Architecture,
    #[serde(flatten)]
    pub resources: ResourceSpec,
    #[serde(default)]
    pub hourly_price: Option<f64>,
    /// Commitment length in months -> discounted price per month
    #[serde(default)]
    pub monthly_prices: BTreeMap<u32, f64>,
}

impl TemplateCandidate {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        architecture: Architecture,
        resources: ResourceSpec,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            architecture,
            resources,
            hourly_price: None,
            monthly_prices: BTreeMap::new(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(StratusError::ValidationFailed(format!(
                "Template '{}' has an empty id",
                self.name
            )));
        }

        self.resources.validate().map_err(|e| {
            StratusError::ValidationFailed(format!("Template '{}': {}", self.id, e))
        })?;

        let prices = self
            .hourly_price
            .iter()
            .chain(self.monthly_prices.values());
        for price in prices {
            if !price.is_finite() || *price < 0.0 {
                return Err(StratusError::ValidationFailed(format!(
                    "Template '{}' has an invalid price: {}",
                    self.id, price
                )));
            }
        }

        Ok(())
    }
}

/// Parse and validate a JSON array of template candidates
pub fn parse_catalog(json: &str) -> Result<Vec<TemplateCandidate>> {
    let catalog: Vec<TemplateCandidate> = serde_json::from_str(json)?;
    for candidate in &catalog {
        candidate.validate()?;
    }
    Ok(catalog)
}

/// Per-dimension weights applied to overage when scoring candidates.
///
/// Defaults weigh core counts and frequencies above memory and disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreWeights {
    pub cpu_cores: f64,
    pub cpu_frequency_ghz: f64,
    pub memory_gb: f64,
    pub system_disk_gb: f64,
    pub ephemeral_disk_gb: f64,
    pub gpu_count: f64,
    pub gpu_cores: f64,
    pub gpu_memory_gb: f64,
    pub gpu_frequency_ghz: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            cpu_cores: 10.0,
            cpu_frequency_ghz: 10.0,
            memory_gb: 1.0,
            system_disk_gb: 0.1,
            ephemeral_disk_gb: 0.1,
            gpu_count: 10.0,
            // GPU core counts run into the thousands
            gpu_cores: 0.01,
            gpu_memory_gb: 1.0,
            gpu_frequency_ghz: 10.0,
        }
    }
}

impl ScoreWeights {
    pub fn get(&self, dimension: Dimension) -> f64 {
        match dimension {
            Dimension::CpuCores => self.cpu_cores,
            Dimension::CpuFrequency => self.cpu_frequency_ghz,
            Dimension::Memory => self.memory_gb,
            Dimension::SystemDisk => self.system_disk_gb,
            Dimension::EphemeralDisk => self.ephemeral_disk_gb,
            Dimension::GpuCount => self.gpu_count,
            Dimension::GpuCores => self.gpu_cores,
            Dimension::GpuMemory => self.gpu_memory_gb,
            Dimension::GpuFrequency => self.gpu_frequency_ghz,
        }
    }

    pub fn set(&mut self, dimension: Dimension, weight: f64) {
        let slot = match dimension {
            Dimension::CpuCores => &mut self.cpu_cores,
            Dimension::CpuFrequency => &mut self.cpu_frequency_ghz,
            Dimension::Memory => &mut self.memory_gb,
            Dimension::SystemDisk => &mut self.system_disk_gb,
            Dimension::EphemeralDisk => &mut self.ephemeral_disk_gb,
            Dimension::GpuCount => &mut self.gpu_count,
            Dimension::GpuCores => &mut self.gpu_cores,
            Dimension::GpuMemory => &mut self.gpu_memory_gb,
            Dimension::GpuFrequency => &mut self.gpu_frequency_ghz,
        };
        *slot = weight;
    }
}
