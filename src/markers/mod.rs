use anyhow::anyhow;
use std::collections::BTreeMap;
use std::fmt;

pub mod assign;
pub mod table;
pub mod threshold;

pub use assign::{assign_markers, assign_markers_with_report};
pub use table::CellTable;
pub use threshold::{Bandwidth, Threshold, ThresholdParams, ThresholdSource, estimate_threshold};

/// Label given to a cell by marker assignment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerLabel {
    /// The marker gene with the highest aligned score
    Gene(String),
    /// No gene scored above its aligned threshold
    Unassigned,
}

impl MarkerLabel {
    pub fn as_str(&self) -> &str {
        match self {
            MarkerLabel::Gene(name) => name,
            MarkerLabel::Unassigned => "Unassigned",
        }
    }

    pub fn is_assigned(&self) -> bool {
        matches!(self, MarkerLabel::Gene(_))
    }
}

impl fmt::Display for MarkerLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct MarkerConfig {
    /// Time points of the experiment, in order
    pub time_points: Vec<String>,
    /// Genes scored at every time point, in tie-breaking order
    pub base_genes: Vec<String>,
    /// Gene appended to the base genes unless excluded for a time point
    pub optional_gene: Option<String>,
    /// Time points at which the optional gene is left out
    pub optional_gene_excluded_at: Vec<String>,
    /// Score the optional gene at every time point, ignoring the exclusions
    pub include_all: bool,
    /// Log per-group diagnostics at INFO instead of DEBUG
    pub verbose: bool,
    pub threshold: ThresholdParams,
}

impl Default for MarkerConfig {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        MarkerConfig {
            time_points: strings(&["00hr", "04hr", "08hr", "12hr", "16hr", "20hr"]),
            base_genes: strings(&["act15GFP", "mCherry", "mCerulean"]),
            optional_gene: Some("mNeonG".to_string()),
            optional_gene_excluded_at: strings(&["00hr", "16hr"]),
            include_all: false,
            verbose: false,
            threshold: ThresholdParams::default(),
        }
    }
}

impl MarkerConfig {
    pub fn with_include_all(mut self, include_all: bool) -> Self {
        self.include_all = include_all;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_base_genes<S: Into<String>>(mut self, genes: impl IntoIterator<Item = S>) -> Self {
        self.base_genes = genes.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_optional_gene<S: Into<String>>(mut self, gene: Option<S>) -> Self {
        self.optional_gene = gene.map(Into::into);
        self
    }

    pub fn with_excluded_time_points<S: Into<String>>(
        mut self,
        time_points: impl IntoIterator<Item = S>,
    ) -> Self {
        self.optional_gene_excluded_at = time_points.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_threshold_params(mut self, params: ThresholdParams) -> Self {
        self.threshold = params;
        self
    }

    /// Genes scored at `time_point`: the base genes, followed by the optional gene unless it is
    /// excluded there and `include_all` is off.
    pub fn genes_for(&self, time_point: &str) -> Vec<String> {
        let mut genes = self.base_genes.clone();
        if let Some(gene) = &self.optional_gene {
            let excluded = self
                .optional_gene_excluded_at
                .iter()
                .any(|tp| tp == time_point);
            if self.include_all || !excluded {
                genes.push(gene.clone());
            }
        }
        genes
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.base_genes.is_empty() {
            return Err(anyhow!("At least one base marker gene is required"));
        }
        if self.threshold.grid_points == 0 {
            return Err(anyhow!("Threshold grid must have at least one point"));
        }
        if !(0.0..=100.0).contains(&self.threshold.fallback_percentile) {
            return Err(anyhow!(
                "Fallback percentile must be in [0, 100], got {}",
                self.threshold.fallback_percentile
            ));
        }
        Ok(())
    }
}

/// Diagnostics of marker assignment within one time point.
#[derive(Debug, Clone)]
pub struct GroupReport {
    pub time_point: String,
    pub n_cells: usize,
    /// Genes scored in this group, in tie-breaking order
    pub genes: Vec<String>,
    /// Cells with non-zero expression, per gene
    pub nonzero_counts: Vec<usize>,
    pub thresholds: Vec<Threshold>,
    /// Thresholds shifted so that the lowest one is zero
    pub adjusted_thresholds: Vec<f64>,
    pub label_counts: BTreeMap<MarkerLabel, usize>,
}

impl GroupReport {
    pub fn min_nonzero(&self) -> usize {
        self.nonzero_counts.iter().copied().min().unwrap_or(0)
    }

    fn position(&self, gene: &str) -> Option<usize> {
        self.genes.iter().position(|g| g == gene)
    }

    pub fn threshold_for(&self, gene: &str) -> Option<f64> {
        self.position(gene).map(|i| self.thresholds[i].value)
    }

    pub fn adjusted_threshold_for(&self, gene: &str) -> Option<f64> {
        self.position(gene).map(|i| self.adjusted_thresholds[i])
    }

    pub fn count(&self, label: &MarkerLabel) -> usize {
        self.label_counts.get(label).copied().unwrap_or(0)
    }
}
