//! Derived label sets and demand requests.

use crate::error::{LioError, LioResult};
use crate::labels::{LabelAxis, SectorLabel};
use serde::Serialize;
use std::collections::HashSet;

/// Ordered set of sector labels satisfying some predicate (inactive,
/// household, region member).
///
/// Labels rather than positions are stored so a set computed on the
/// coefficient matrix can be applied to a result matrix whose column axis is
/// a subset.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct SectorIndexSet {
    labels: Vec<SectorLabel>,
    #[serde(skip)]
    members: HashSet<SectorLabel>,
}

impl SectorIndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect labels, keeping the first occurrence of each.
    pub fn from_labels(labels: impl IntoIterator<Item = SectorLabel>) -> Self {
        let mut set = Self::new();
        for label in labels {
            set.insert(label);
        }
        set
    }

    /// Labels at `positions` on `axis`; out-of-range positions are skipped.
    pub fn from_positions(axis: &LabelAxis, positions: &[usize]) -> Self {
        Self::from_labels(positions.iter().filter_map(|&p| axis.get(p).cloned()))
    }

    fn insert(&mut self, label: SectorLabel) -> bool {
        if self.members.insert(label.clone()) {
            self.labels.push(label);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &SectorLabel) -> bool {
        self.members.contains(label)
    }

    pub fn labels(&self) -> &[SectorLabel] {
        &self.labels
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectorLabel> + '_ {
        self.labels.iter()
    }

    /// Labels of `self` followed by the labels of `other` not already present.
    pub fn union(&self, other: &SectorIndexSet) -> SectorIndexSet {
        let mut out = self.clone();
        for label in other.iter() {
            out.insert(label.clone());
        }
        out
    }

    /// Positions of the members present on `axis`, in axis order. Members
    /// missing from the axis are ignored.
    pub fn positions_in(&self, axis: &LabelAxis) -> Vec<usize> {
        let mut positions: Vec<usize> = self.iter().filter_map(|l| axis.position(l)).collect();
        positions.sort_unstable();
        positions
    }
}

impl PartialEq for SectorIndexSet {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for SectorIndexSet {}

impl FromIterator<SectorLabel> for SectorIndexSet {
    fn from_iter<T: IntoIterator<Item = SectorLabel>>(iter: T) -> Self {
        Self::from_labels(iter)
    }
}

/// Final-demand sector positions for which a unit-demand column is solved.
///
/// Duplicate positions are collapsed (first occurrence kept) because every
/// result column must carry a distinct label. An empty request is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DemandRequest {
    positions: Vec<usize>,
}

impl DemandRequest {
    pub fn new(positions: impl IntoIterator<Item = usize>) -> Self {
        let mut seen = HashSet::new();
        let positions = positions.into_iter().filter(|p| seen.insert(*p)).collect();
        Self { positions }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Every row position of `region` on `axis`, in axis order.
    pub fn for_region(axis: &LabelAxis, region: &str) -> Self {
        Self {
            positions: axis.positions_in_region(region),
        }
    }

    /// Positions of the given labels on `axis`; unknown labels are an error.
    pub fn for_labels<'a>(
        axis: &LabelAxis,
        labels: impl IntoIterator<Item = &'a SectorLabel>,
    ) -> LioResult<Self> {
        let mut positions = Vec::new();
        for label in labels {
            let pos = axis.position(label).ok_or_else(|| LioError::LabelAlignment {
                matrix: String::new(),
                detail: format!("requested sector {label} is not a row label"),
            })?;
            positions.push(pos);
        }
        Ok(Self::new(positions))
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Check every position against a matrix of `len` sectors.
    pub fn validate(&self, matrix: &str, len: usize) -> LioResult<()> {
        match self.positions.iter().find(|&&p| p >= len) {
            Some(&position) => Err(LioError::IndexOutOfRange {
                matrix: matrix.to_string(),
                position,
                len,
                requested: self.positions.clone(),
            }),
            None => Ok(()),
        }
    }
}
