//! Composite `(sector, region)` labels and ordered label axes.
//!
//! Multi-regional input-output tables identify every row and column by a
//! product sector in a region, e.g. `("Cultivation of wheat", "ES")`. A
//! [`LabelAxis`] is the ordered, duplicate-free sequence of those labels for
//! one axis of a matrix, with O(1) label → position lookup.

use crate::error::{LioError, LioResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// A `(sector, region)` pair identifying one row or column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SectorLabel {
    pub sector: String,
    pub region: String,
}

impl SectorLabel {
    pub fn new(sector: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            sector: sector.into(),
            region: region.into(),
        }
    }
}

impl fmt::Display for SectorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.region, self.sector)
    }
}

/// Order of the two label levels as they appear in source files.
///
/// EXIOBASE tables put the region code on the first level and the sector
/// name on the second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LabelOrder {
    #[default]
    RegionSector,
    SectorRegion,
}

impl LabelOrder {
    /// Build a label from the two levels in file order.
    pub fn label(self, first: &str, second: &str) -> SectorLabel {
        match self {
            LabelOrder::RegionSector => SectorLabel::new(second.trim(), first.trim()),
            LabelOrder::SectorRegion => SectorLabel::new(first.trim(), second.trim()),
        }
    }

    /// Split a label back into the two levels in file order.
    pub fn levels(self, label: &SectorLabel) -> (&str, &str) {
        match self {
            LabelOrder::RegionSector => (&label.region, &label.sector),
            LabelOrder::SectorRegion => (&label.sector, &label.region),
        }
    }
}

/// Ordered, duplicate-free label sequence for one matrix axis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(try_from = "Vec<SectorLabel>", into = "Vec<SectorLabel>")]
pub struct LabelAxis {
    labels: Vec<SectorLabel>,
    index: HashMap<SectorLabel, usize>,
}

impl LabelAxis {
    /// Build an axis, rejecting duplicate labels.
    pub fn new(labels: Vec<SectorLabel>) -> LioResult<Self> {
        let mut index = HashMap::with_capacity(labels.len());
        for (pos, label) in labels.iter().enumerate() {
            if let Some(first) = index.insert(label.clone(), pos) {
                return Err(LioError::LabelAlignment {
                    matrix: String::new(),
                    detail: format!("duplicate label {label} at positions {first} and {pos}"),
                });
            }
        }
        Ok(Self { labels, index })
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[SectorLabel] {
        &self.labels
    }

    pub fn get(&self, pos: usize) -> Option<&SectorLabel> {
        self.labels.get(pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectorLabel> + '_ {
        self.labels.iter()
    }

    /// Position of a label on this axis.
    pub fn position(&self, label: &SectorLabel) -> Option<usize> {
        self.index.get(label).copied()
    }

    pub fn contains(&self, label: &SectorLabel) -> bool {
        self.index.contains_key(label)
    }

    /// Positions whose region component equals `region`, in axis order.
    pub fn positions_in_region(&self, region: &str) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.region == region)
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Labels whose sector component contains `needle`, in axis order.
    pub fn sectors_containing(&self, needle: &str) -> Vec<SectorLabel> {
        self.labels
            .iter()
            .filter(|label| label.sector.contains(needle))
            .cloned()
            .collect()
    }

    /// Sub-axis made of the labels at `positions`, in the given order.
    pub fn select(&self, positions: &[usize]) -> LioResult<Self> {
        let mut labels = Vec::with_capacity(positions.len());
        for &pos in positions {
            let label = self.labels.get(pos).ok_or_else(|| LioError::IndexOutOfRange {
                matrix: String::new(),
                position: pos,
                len: self.len(),
                requested: positions.to_vec(),
            })?;
            labels.push(label.clone());
        }
        Self::new(labels)
    }

    /// First position at which two axes disagree, if any.
    pub fn first_divergence(&self, other: &LabelAxis) -> Option<usize> {
        if self.len() != other.len() {
            return Some(self.len().min(other.len()));
        }
        self.labels
            .iter()
            .zip(other.labels.iter())
            .position(|(a, b)| a != b)
    }
}

impl PartialEq for LabelAxis {
    fn eq(&self, other: &Self) -> bool {
        self.labels == other.labels
    }
}

impl Eq for LabelAxis {}

impl TryFrom<Vec<SectorLabel>> for LabelAxis {
    type Error = LioError;

    fn try_from(labels: Vec<SectorLabel>) -> LioResult<Self> {
        Self::new(labels)
    }
}

impl From<LabelAxis> for Vec<SectorLabel> {
    fn from(axis: LabelAxis) -> Self {
        axis.labels
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axis() -> LabelAxis {
        LabelAxis::new(vec![
            SectorLabel::new("Wheat", "ES"),
            SectorLabel::new("Private households", "ES"),
            SectorLabel::new("Wheat", "FR"),
            SectorLabel::new("Electricity", "ES"),
            SectorLabel::new("Private households", "FR"),
        ])
        .unwrap()
    }

    #[test]
    fn test_region_lookup_preserves_order() {
        assert_eq!(axis().positions_in_region("ES"), vec![0, 1, 3]);
        assert_eq!(axis().positions_in_region("FR"), vec![2, 4]);
        assert!(axis().positions_in_region("DE").is_empty());
    }

    #[test]
    fn test_sector_substring_lookup() {
        let found = axis().sectors_containing("households");
        assert_eq!(
            found,
            vec![
                SectorLabel::new("Private households", "ES"),
                SectorLabel::new("Private households", "FR"),
            ]
        );
    }

    #[test]
    fn test_duplicate_labels_rejected() {
        let err = LabelAxis::new(vec![
            SectorLabel::new("Wheat", "ES"),
            SectorLabel::new("Wheat", "ES"),
        ])
        .unwrap_err();
        assert!(matches!(err, LioError::LabelAlignment { .. }));
    }

    #[test]
    fn test_select_and_position() {
        let sub = axis().select(&[3, 0]).unwrap();
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.position(&SectorLabel::new("Wheat", "ES")), Some(1));
        assert!(axis().select(&[9]).is_err());
    }

    #[test]
    fn test_first_divergence() {
        let a = axis();
        let b = a.select(&[0, 1, 2, 4, 3]).unwrap();
        assert_eq!(a.first_divergence(&a.clone()), None);
        assert_eq!(a.first_divergence(&b), Some(3));
        assert_eq!(a.first_divergence(&a.select(&[0, 1]).unwrap()), Some(2));
    }

    #[test]
    fn test_label_order() {
        let label = LabelOrder::RegionSector.label("ES", " Wheat ");
        assert_eq!(label, SectorLabel::new("Wheat", "ES"));
        assert_eq!(LabelOrder::RegionSector.levels(&label), ("ES", "Wheat"));
        assert_eq!(
            LabelOrder::SectorRegion.label("Wheat", "ES"),
            SectorLabel::new("Wheat", "ES")
        );
    }

    #[test]
    fn test_axis_serde_roundtrip() {
        let json = serde_json::to_string(&axis()).unwrap();
        let back: LabelAxis = serde_json::from_str(&json).unwrap();
        assert_eq!(back, axis());

        let dup = r#"[{"sector":"A","region":"X"},{"sector":"A","region":"X"}]"#;
        assert!(serde_json::from_str::<LabelAxis>(dup).is_err());
    }
}
