use anyhow::anyhow;
use nalgebra_sparse::{CooMatrix, CsrMatrix};
use ndarray::ArrayView2;
use std::collections::{BTreeMap, HashMap};

use crate::markers::MarkerLabel;

/// Cells annotated with a time point and raw reporter expression.
///
/// Expression is a sparse cells × genes matrix of non-negative raw values. Marker labels are
/// attached by [`crate::markers::assign_markers`]; a cell without a label was not part of any
/// requested time point.
#[derive(Debug, Clone)]
pub struct CellTable {
    expression: CsrMatrix<f64>,
    gene_names: Vec<String>,
    gene_index: HashMap<String, usize>,
    time_points: Vec<String>,
    markers: Vec<Option<MarkerLabel>>,
}

impl CellTable {
    /// Build a table from a sparse cells × genes matrix.
    ///
    /// # Arguments
    ///
    /// * `expression` - Raw expression, one row per cell, one column per gene
    /// * `gene_names` - Column names, must be unique
    /// * `time_points` - Time-point label of every cell
    pub fn new(
        expression: CsrMatrix<f64>,
        gene_names: Vec<String>,
        time_points: Vec<String>,
    ) -> anyhow::Result<Self> {
        if expression.nrows() != time_points.len() {
            return Err(anyhow!(
                "Expression has {} cells but {} time-point labels were given",
                expression.nrows(),
                time_points.len()
            ));
        }
        if expression.ncols() != gene_names.len() {
            return Err(anyhow!(
                "Expression has {} genes but {} gene names were given",
                expression.ncols(),
                gene_names.len()
            ));
        }
        if let Some(value) = expression
            .values()
            .iter()
            .find(|v| !v.is_finite() || **v < 0.0)
        {
            return Err(anyhow!(
                "Expression values must be finite and non-negative, found {}",
                value
            ));
        }

        let mut gene_index = HashMap::with_capacity(gene_names.len());
        for (i, name) in gene_names.iter().enumerate() {
            if gene_index.insert(name.clone(), i).is_some() {
                return Err(anyhow!("Duplicate gene name '{}'", name));
            }
        }

        let n_cells = time_points.len();
        Ok(CellTable {
            expression,
            gene_names,
            gene_index,
            time_points,
            markers: vec![None; n_cells],
        })
    }

    /// Build a table from a dense cells × genes matrix, keeping only non-zero entries.
    pub fn from_dense(
        expression: ArrayView2<f64>,
        gene_names: Vec<String>,
        time_points: Vec<String>,
    ) -> anyhow::Result<Self> {
        let (n_cells, n_genes) = expression.dim();
        let mut coo = CooMatrix::new(n_cells, n_genes);
        for ((row, col), &value) in expression.indexed_iter() {
            if value != 0.0 {
                coo.push(row, col, value);
            }
        }
        CellTable::new(CsrMatrix::from(&coo), gene_names, time_points)
    }

    pub fn n_cells(&self) -> usize {
        self.time_points.len()
    }

    pub fn n_genes(&self) -> usize {
        self.gene_names.len()
    }

    pub fn gene_names(&self) -> &[String] {
        &self.gene_names
    }

    pub fn time_points(&self) -> &[String] {
        &self.time_points
    }

    pub fn expression(&self) -> &CsrMatrix<f64> {
        &self.expression
    }

    pub fn gene_position(&self, gene: &str) -> anyhow::Result<usize> {
        self.gene_index
            .get(gene)
            .copied()
            .ok_or_else(|| anyhow!("Gene '{}' not found in cell table", gene))
    }

    /// Row indices of the cells labelled with `time_point`, in table order.
    pub fn cells_at(&self, time_point: &str) -> Vec<usize> {
        self.time_points
            .iter()
            .enumerate()
            .filter_map(|(i, tp)| if tp == time_point { Some(i) } else { None })
            .collect()
    }

    /// Raw expression of `gene` for the given rows; absent entries read as zero.
    pub fn gene_values(&self, gene: &str, rows: &[usize]) -> anyhow::Result<Vec<f64>> {
        let col = self.gene_position(gene)?;
        rows.iter()
            .map(|&row| {
                if row >= self.n_cells() {
                    return Err(anyhow!("Cell index {} out of bounds", row));
                }
                Ok(self
                    .expression
                    .get_entry(row, col)
                    .map(|entry| entry.into_value())
                    .unwrap_or(0.0))
            })
            .collect()
    }

    pub fn markers(&self) -> &[Option<MarkerLabel>] {
        &self.markers
    }

    pub fn marker(&self, cell: usize) -> Option<&MarkerLabel> {
        self.markers.get(cell).and_then(Option::as_ref)
    }

    /// Number of cells per marker label; unlabelled cells are not counted.
    pub fn marker_counts(&self) -> BTreeMap<MarkerLabel, usize> {
        let mut counts = BTreeMap::new();
        for label in self.markers.iter().flatten() {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub(crate) fn set_markers(&mut self, markers: Vec<Option<MarkerLabel>>) {
        debug_assert_eq!(markers.len(), self.n_cells());
        self.markers = markers;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_dense_reads_back_values() {
        let x = array![[0.0, 5.0], [2.0, 0.0], [0.0, 0.0]];
        let table =
            CellTable::from_dense(x.view(), names(&["A", "B"]), names(&["t0", "t1", "t0"]))
                .unwrap();

        assert_eq!(table.n_cells(), 3);
        assert_eq!(table.n_genes(), 2);
        assert_eq!(table.expression().nnz(), 2);
        assert_eq!(table.gene_values("A", &[0, 1, 2]).unwrap(), vec![0.0, 2.0, 0.0]);
        assert_eq!(table.gene_values("B", &[2, 0]).unwrap(), vec![0.0, 5.0]);
        assert_eq!(table.cells_at("t0"), vec![0, 2]);
        assert!(table.cells_at("t9").is_empty());
        assert!(table.markers().iter().all(Option::is_none));
    }

    #[test]
    fn test_missing_gene_is_an_error() {
        let x = array![[1.0]];
        let table = CellTable::from_dense(x.view(), names(&["A"]), names(&["t0"])).unwrap();
        let err = table.gene_values("Z", &[0]).unwrap_err();
        assert_eq!(err.to_string(), "Gene 'Z' not found in cell table");
        assert!(table.gene_values("A", &[1]).is_err());
    }

    #[test]
    fn test_shape_validation() {
        let x = array![[1.0, 2.0]];
        assert!(CellTable::from_dense(x.view(), names(&["A"]), names(&["t0"])).is_err());
        assert!(CellTable::from_dense(x.view(), names(&["A", "B"]), names(&[])).is_err());
        assert!(CellTable::from_dense(x.view(), names(&["A", "A"]), names(&["t0"])).is_err());
    }

    #[test]
    fn test_negative_values_rejected() {
        let x = array![[1.0, -2.0]];
        assert!(CellTable::from_dense(x.view(), names(&["A", "B"]), names(&["t0"])).is_err());
    }
}
