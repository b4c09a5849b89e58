use crate::models::{Architecture, Dimension, ResourceRequirement, ScoreWeights, TemplateCandidate};
use log::debug;
use serde::Serialize;
use std::fmt;

/// Hours in an average month (8760 / 12), used to turn hourly prices into monthly ones
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Trait for ranking qualifying candidates. Lower scores rank first.
pub trait Scorer {
    fn score(&self, candidate: &TemplateCandidate, requirement: &ResourceRequirement) -> f64;
}

impl<F> Scorer for F
where
    F: Fn(&TemplateCandidate, &ResourceRequirement) -> f64,
{
    fn score(&self, candidate: &TemplateCandidate, requirement: &ResourceRequirement) -> f64 {
        self(candidate, requirement)
    }
}

/// Dominant-resource style scorer: total weighted overage across all dimensions
#[derive(Debug, Clone, Default)]
pub struct DrfScorer {
    pub weights: ScoreWeights,
}

impl DrfScorer {
    pub fn new(weights: ScoreWeights) -> Self {
        Self { weights }
    }
}

impl Scorer for DrfScorer {
    fn score(&self, candidate: &TemplateCandidate, requirement: &ResourceRequirement) -> f64 {
        Dimension::ALL
            .iter()
            .map(|&d| {
                let overage = candidate.resources.get(d) - requirement.resources.get(d);
                self.weights.get(d) * overage
            })
            .sum()
    }
}

/// Scorer that ranks by price, hourly or for a monthly commitment
#[derive(Debug, Clone)]
pub struct PriceScorer {
    pub commitment_months: Option<u32>,
    pub hours_per_month: f64,
}

impl Default for PriceScorer {
    fn default() -> Self {
        Self::hourly()
    }
}

impl PriceScorer {
    /// Rank by pay-as-you-go hourly price
    pub fn hourly() -> Self {
        Self {
            commitment_months: None,
            hours_per_month: HOURS_PER_MONTH,
        }
    }

    /// Rank by the monthly price of a commitment of the given length
    pub fn monthly(commitment_months: u32) -> Self {
        Self {
            commitment_months: Some(commitment_months),
            hours_per_month: HOURS_PER_MONTH,
        }
    }

    /// Price used for ranking, `None` when the candidate carries no usable price.
    ///
    /// For a commitment: the exact commitment price, else the cheapest
    /// commitment offered, else the hourly price scaled to a month.
    pub fn effective_price(&self, candidate: &TemplateCandidate) -> Option<f64> {
        let Some(months) = self.commitment_months else {
            return candidate.hourly_price;
        };

        if let Some(price) = candidate.monthly_prices.get(&months) {
            return Some(*price);
        }

        let cheapest = candidate
            .monthly_prices
            .values()
            .copied()
            .min_by(|a, b| a.total_cmp(b));

        cheapest.or_else(|| candidate.hourly_price.map(|h| h * self.hours_per_month))
    }
}

impl Scorer for PriceScorer {
    fn score(&self, candidate: &TemplateCandidate, _requirement: &ResourceRequirement) -> f64 {
        self.effective_price(candidate).unwrap_or(f64::INFINITY)
    }
}

/// Why a candidate fails a requirement
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Mismatch {
    Architecture {
        wanted: Architecture,
        offered: Architecture,
    },
    Dimension {
        dimension: String,
        wanted: f64,
        offered: f64,
    },
}

impl fmt::Display for Mismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mismatch::Architecture { wanted, offered } => {
                write!(f, "architecture {} != {}", offered, wanted)
            }
            Mismatch::Dimension {
                dimension,
                wanted,
                offered,
            } => write!(f, "{} {} < {}", dimension, offered, wanted),
        }
    }
}

/// List every way the candidate falls short of the requirement
pub fn unmet_dimensions(
    candidate: &TemplateCandidate,
    requirement: &ResourceRequirement,
) -> Vec<Mismatch> {
    let mut mismatches = Vec::new();

    if candidate.architecture != requirement.architecture {
        mismatches.push(Mismatch::Architecture {
            wanted: requirement.architecture.clone(),
            offered: candidate.architecture.clone(),
        });
    }

    for dimension in Dimension::ALL {
        let wanted = requirement.resources.get(dimension);
        let offered = candidate.resources.get(dimension);
        if offered < wanted {
            mismatches.push(Mismatch::Dimension {
                dimension: dimension.key().to_string(),
                wanted,
                offered,
            });
        }
    }

    mismatches
}

/// A candidate qualifies when its architecture matches and no dimension falls short
pub fn qualifies(candidate: &TemplateCandidate, requirement: &ResourceRequirement) -> bool {
    candidate.architecture == requirement.architecture
        && Dimension::ALL
            .iter()
            .all(|&d| candidate.resources.get(d) >= requirement.resources.get(d))
}

/// A qualifying candidate and its score
#[derive(Debug, Clone, Serialize)]
pub struct RankedTemplate {
    pub candidate: TemplateCandidate,
    pub score: f64,
}

/// Filter the catalog and rank qualifying candidates by ascending score.
///
/// The sort is stable: candidates with equal scores keep their catalog order.
pub fn rank_templates<S>(
    catalog: &[TemplateCandidate],
    requirement: &ResourceRequirement,
    scorer: &S,
) -> Vec<RankedTemplate>
where
    S: Scorer + ?Sized,
{
    let mut ranked: Vec<RankedTemplate> = catalog
        .iter()
        .filter(|c| qualifies(c, requirement))
        .map(|c| RankedTemplate {
            score: scorer.score(c, requirement),
            candidate: c.clone(),
        })
        .collect();

    ranked.sort_by(|a, b| a.score.total_cmp(&b.score));

    debug!(
        "{} of {} templates qualify for {} requirement",
        ranked.len(),
        catalog.len(),
        requirement.architecture
    );

    ranked
}

/// Filter and rank, returning only the candidates
pub fn select_templates<S>(
    catalog: &[TemplateCandidate],
    requirement: &ResourceRequirement,
    scorer: &S,
) -> Vec<TemplateCandidate>
where
    S: Scorer + ?Sized,
{
    rank_templates(catalog, requirement, scorer)
        .into_iter()
        .map(|r| r.candidate)
        .collect()
}

/// Selector bound to one scoring strategy
pub struct TemplateSelector<S> {
    scorer: S,
}

impl<S: Scorer> TemplateSelector<S> {
    pub fn new(scorer: S) -> Self {
        Self { scorer }
    }

    pub fn rank(
        &self,
        catalog: &[TemplateCandidate],
        requirement: &ResourceRequirement,
    ) -> Vec<RankedTemplate> {
        rank_templates(catalog, requirement, &self.scorer)
    }

    pub fn select(
        &self,
        catalog: &[TemplateCandidate],
        requirement: &ResourceRequirement,
    ) -> Vec<TemplateCandidate> {
        select_templates(catalog, requirement, &self.scorer)
    }

    /// Tightest fit, if any candidate qualifies
    pub fn best(
        &self,
        catalog: &[TemplateCandidate],
        requirement: &ResourceRequirement,
    ) -> Option<TemplateCandidate> {
        self.select(catalog, requirement).into_iter().next()
    }
}

impl Default for TemplateSelector<DrfScorer> {
    fn default() -> Self {
        Self::new(DrfScorer::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ResourceSpec;

    fn requirement(cores: u32, memory_gb: f64) -> ResourceRequirement {
        ResourceRequirement::new(
            Architecture::X86_64,
            ResourceSpec {
                cpu_cores: cores,
                memory_gb,
                ..Default::default()
            },
        )
    }

    fn candidate(id: &str, cores: u32, memory_gb: f64) -> TemplateCandidate {
        TemplateCandidate::new(
            id,
            format!("template-{}", id),
            Architecture::X86_64,
            ResourceSpec {
                cpu_cores: cores,
                memory_gb,
                ..Default::default()
            },
        )
    }

    fn ids(templates: &[TemplateCandidate]) -> Vec<&str> {
        templates.iter().map(|t| t.id.as_str()).collect()
    }

    #[test]
    fn test_filters_and_ranks_by_overage() {
        let catalog = vec![
            candidate("B", 8, 32.0),
            candidate("C", 2, 8.0),
            candidate("A", 4, 16.0),
        ];

        let selected = select_templates(&catalog, &requirement(4, 16.0), &DrfScorer::default());
        assert_eq!(ids(&selected), vec!["A", "B"]);
    }

    #[test]
    fn test_architecture_mismatch_excludes() {
        let mut huge = candidate("arm", 128, 1024.0);
        huge.architecture = Architecture::Arm64;
        huge.resources.gpu_count = 8;

        let selected = select_templates(&[huge.clone()], &requirement(1, 1.0), &DrfScorer::default());
        assert!(selected.is_empty());

        let mismatches = unmet_dimensions(&huge, &requirement(1, 1.0));
        assert_eq!(mismatches.len(), 1);
        assert!(matches!(mismatches[0], Mismatch::Architecture { .. }));
    }

    #[test]
    fn test_no_substitution_across_dimensions() {
        // Plenty of memory never makes up for one missing core
        let catalog = vec![candidate("ram-heavy", 3, 512.0)];
        let selected = select_templates(&catalog, &requirement(4, 16.0), &DrfScorer::default());
        assert!(selected.is_empty());

        let mismatches = unmet_dimensions(&catalog[0], &requirement(4, 16.0));
        assert_eq!(
            mismatches,
            vec![Mismatch::Dimension {
                dimension: "cpu_cores".to_string(),
                wanted: 4.0,
                offered: 3.0,
            }]
        );
    }

    #[test]
    fn test_equal_scores_keep_catalog_order() {
        let catalog = vec![
            candidate("first", 8, 16.0),
            candidate("second", 8, 16.0),
            candidate("third", 8, 16.0),
        ];

        let selected = select_templates(&catalog, &requirement(4, 16.0), &DrfScorer::default());
        assert_eq!(ids(&selected), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_weights_shape_ranking() {
        // 2 spare cores vs 16 spare GB: defaults punish the cores harder
        let catalog = vec![candidate("cores", 6, 16.0), candidate("memory", 4, 32.0)];
        let ranked = rank_templates(&catalog, &requirement(4, 16.0), &DrfScorer::default());
        assert_eq!(ranked[0].candidate.id, "memory");
        assert_eq!(ranked[0].score, 16.0);
        assert_eq!(ranked[1].score, 20.0);

        let mut weights = ScoreWeights::default();
        weights.memory_gb = 10.0;
        let ranked = rank_templates(&catalog, &requirement(4, 16.0), &DrfScorer::new(weights));
        assert_eq!(ranked[0].candidate.id, "cores");
    }

    #[test]
    fn test_hourly_price_ranking() {
        let mut cheap = candidate("cheap", 8, 32.0);
        cheap.hourly_price = Some(0.10);
        let mut pricey = candidate("pricey", 4, 16.0);
        pricey.hourly_price = Some(0.40);
        let unpriced = candidate("unpriced", 4, 16.0);

        let catalog = vec![unpriced, pricey, cheap];
        let selected = select_templates(&catalog, &requirement(4, 16.0), &PriceScorer::hourly());
        assert_eq!(ids(&selected), vec!["cheap", "pricey", "unpriced"]);
    }

    #[test]
    fn test_monthly_price_fallbacks() {
        let scorer = PriceScorer::monthly(12);

        let mut exact = candidate("exact", 4, 16.0);
        exact.monthly_prices.insert(12, 50.0);
        exact.monthly_prices.insert(36, 30.0);
        assert_eq!(scorer.effective_price(&exact), Some(50.0));

        let mut other_terms = candidate("other", 4, 16.0);
        other_terms.monthly_prices.insert(1, 80.0);
        other_terms.monthly_prices.insert(6, 70.0);
        assert_eq!(scorer.effective_price(&other_terms), Some(70.0));

        let mut hourly_only = candidate("hourly", 4, 16.0);
        hourly_only.hourly_price = Some(0.1);
        let price = scorer.effective_price(&hourly_only).unwrap();
        assert!((price - 73.0).abs() < 1e-9);

        assert_eq!(scorer.effective_price(&candidate("none", 4, 16.0)), None);
    }

    #[test]
    fn test_closure_scorer() {
        let catalog = vec![candidate("small", 4, 16.0), candidate("big", 16, 64.0)];
        let most_cores = |c: &TemplateCandidate, _r: &ResourceRequirement| {
            -(c.resources.cpu_cores as f64)
        };

        let selected = select_templates(&catalog, &requirement(4, 16.0), &most_cores);
        assert_eq!(ids(&selected), vec!["big", "small"]);
    }

    #[test]
    fn test_selector_best_and_empty() {
        let selector = TemplateSelector::default();
        let catalog = vec![candidate("A", 4, 16.0), candidate("B", 8, 32.0)];

        assert_eq!(
            selector.best(&catalog, &requirement(4, 16.0)).map(|c| c.id),
            Some("A".to_string())
        );
        assert!(selector.select(&catalog, &requirement(64, 16.0)).is_empty());
        assert!(selector.best(&[], &requirement(1, 1.0)).is_none());
    }
}
