//! Per-time-point marker assignment.
//!
//! Within each time point every scored gene gets a density-based threshold on its log1p
//! expression. Thresholds are aligned by subtracting the smallest one, each cell is scored as
//! `log1p(expression) - aligned threshold` per gene, and the best-scoring gene is assigned when
//! its score is positive. Groups are processed independently and their labels are written back
//! by row index, so the label column always follows the table's cell order.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::markers::table::CellTable;
use crate::markers::threshold::{Threshold, ThresholdParams, estimate_threshold};
use crate::markers::{GroupReport, MarkerConfig, MarkerLabel};

macro_rules! diagnostic {
    ($verbose:expr, $($arg:tt)*) => {{
        if $verbose {
            info!($($arg)*);
        } else {
            debug!($($arg)*);
        }
    }};
}

/// Assign a marker label to every cell of the requested time points.
///
/// Labels of cells outside `time_points` are cleared. On error the table is left unchanged.
pub fn assign_markers<S>(
    table: &mut CellTable,
    time_points: &[S],
    config: &MarkerConfig,
) -> anyhow::Result<()>
where
    S: AsRef<str>,
{
    assign_markers_with_report(table, time_points, config).map(|_| ())
}

/// Same as [`assign_markers`], additionally returning the diagnostics of every group in the
/// order the time points were given.
pub fn assign_markers_with_report<S>(
    table: &mut CellTable,
    time_points: &[S],
    config: &MarkerConfig,
) -> anyhow::Result<Vec<GroupReport>>
where
    S: AsRef<str>,
{
    config.validate()?;

    let mut labels: Vec<Option<MarkerLabel>> = vec![None; table.n_cells()];
    let mut reports = Vec::with_capacity(time_points.len());

    for time_point in time_points {
        let time_point = time_point.as_ref();
        let rows = table.cells_at(time_point);
        if rows.is_empty() {
            warn!(time_point, "no cells found for time point");
        }

        let genes = config.genes_for(time_point);
        let (report, group_labels) = assign_group(table, time_point, &rows, genes, &config.threshold)?;
        log_report(&report, config.verbose);

        for (&row, label) in rows.iter().zip(group_labels) {
            labels[row] = Some(label);
        }
        reports.push(report);
    }

    let unlabelled = labels.iter().filter(|l| l.is_none()).count();
    if unlabelled > 0 {
        debug!(unlabelled, "cells outside the requested time points");
    }

    table.set_markers(labels);
    Ok(reports)
}

fn assign_group(
    table: &CellTable,
    time_point: &str,
    rows: &[usize],
    genes: Vec<String>,
    params: &ThresholdParams,
) -> anyhow::Result<(GroupReport, Vec<MarkerLabel>)> {
    let log_expression = genes
        .iter()
        .map(|gene| {
            table
                .gene_values(gene, rows)
                .map(|values| values.into_iter().map(f64::ln_1p).collect::<Vec<_>>())
        })
        .collect::<anyhow::Result<Vec<_>>>()?;

    let nonzero_counts: Vec<usize> = log_expression
        .iter()
        .map(|column| column.iter().filter(|&&x| x > 0.0).count())
        .collect();

    let thresholds: Vec<Threshold> = log_expression
        .iter()
        .map(|column| estimate_threshold(column, params))
        .collect();

    let adjusted_thresholds = align_thresholds(&thresholds);

    let labels: Vec<MarkerLabel> = (0..rows.len())
        .map(|cell| {
            let scores = log_expression
                .iter()
                .zip(&adjusted_thresholds)
                .map(|(column, &adjusted)| column[cell] - adjusted);
            match best_score(scores) {
                Some((gene, score)) if score > 0.0 => MarkerLabel::Gene(genes[gene].clone()),
                _ => MarkerLabel::Unassigned,
            }
        })
        .collect();

    let mut label_counts = BTreeMap::new();
    for label in &labels {
        *label_counts.entry(label.clone()).or_insert(0) += 1;
    }

    let report = GroupReport {
        time_point: time_point.to_string(),
        n_cells: rows.len(),
        genes,
        nonzero_counts,
        thresholds,
        adjusted_thresholds,
        label_counts,
    };
    Ok((report, labels))
}

/// Shift thresholds so that the smallest becomes exactly zero.
pub(crate) fn align_thresholds(thresholds: &[Threshold]) -> Vec<f64> {
    let baseline = thresholds
        .iter()
        .map(|t| t.value)
        .fold(f64::INFINITY, f64::min);
    thresholds.iter().map(|t| t.value - baseline).collect()
}

/// Index and value of the maximum score; the first one wins on ties.
fn best_score(scores: impl Iterator<Item = f64>) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (i, score) in scores.enumerate() {
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((i, score));
        }
    }
    best
}

fn log_report(report: &GroupReport, verbose: bool) {
    diagnostic!(
        verbose,
        time_point = %report.time_point,
        cells = report.n_cells,
        min_nonzero = report.min_nonzero(),
        "marker group"
    );
    for (gene, threshold) in report.genes.iter().zip(&report.thresholds) {
        diagnostic!(
            verbose,
            gene = %gene,
            threshold = format_args!("{:.3}", threshold.value),
            source = ?threshold.source,
            "marker threshold"
        );
    }
    for (label, count) in &report.label_counts {
        diagnostic!(verbose, label = %label, count, "marker count");
    }
}
