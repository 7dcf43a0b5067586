use crate::engine::Counts;
use crate::processor::{ComputationError, dataset::Dataset};

const AGE_EDGES: [f64; 8] = [0.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 100.0];
const AGE_LABELS: [&str; 7] = ["<20", "20-30", "30-40", "40-50", "50-60", "60-70", "70+"];

/// Labelled, left-inclusive bins `[edges[i], edges[i + 1])`
#[derive(Debug, Clone, PartialEq)]
pub struct Bins {
    edges: Vec<f64>,
    labels: Vec<String>,
}

impl Bins {
    /// # Errors
    /// [`ComputationError::InvalidBins`] unless there are at least two finite,
    /// strictly ascending edges and exactly one label per bin.
    pub fn new(edges: Vec<f64>, labels: Vec<String>) -> Result<Self, ComputationError> {
        if edges.len() < 2 {
            return Err(ComputationError::InvalidBins(
                "at least two edges are required".into(),
            ));
        }
        if edges.iter().any(|e| !e.is_finite()) || !edges.windows(2).all(|w| w[0] < w[1]) {
            return Err(ComputationError::InvalidBins(
                "edges must be finite and strictly ascending".into(),
            ));
        }
        if labels.len() != edges.len() - 1 {
            return Err(ComputationError::InvalidBins(format!(
                "{} edges need {} labels, got {}",
                edges.len(),
                edges.len() - 1,
                labels.len()
            )));
        }
        Ok(Bins { edges, labels })
    }

    /// Dashboard age groups: `<20`, `20-30`, ..., `60-70`, `70+` (up to 100)
    pub fn age_groups() -> Self {
        Bins {
            edges: AGE_EDGES.to_vec(),
            labels: AGE_LABELS.iter().map(|l| l.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Index of the bin holding `x`, or `None` outside `[first edge, last edge)`
    pub fn locate(&self, x: f64) -> Option<usize> {
        let last = *self.edges.last()?;
        if !(self.edges[0] <= x && x < last) {
            return None;
        }
        Some(self.edges.partition_point(|&e| e <= x) - 1)
    }
}

/// Count of records per bin, every bin listed in ascending order
///
/// Values outside the outermost edges are not counted.
pub fn binned_histogram(
    dataset: &Dataset,
    column: &str,
    bins: &Bins,
) -> Result<Counts, ComputationError> {
    dataset.table().get_col(column)?;
    let mut counts = vec![0u64; bins.len()];

    if !dataset.is_empty() {
        let values = dataset.numeric(column)?;
        for &row in dataset.rows() {
            if let Some(idx) = values.get_f64(row).and_then(|x| bins.locate(x)) {
                counts[idx] += 1;
            }
        }
    }

    Ok(Counts::new(bins.labels.iter().cloned().zip(counts).collect()))
}
