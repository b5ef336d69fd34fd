//! Feature-set membership representations and index building.
//!
//! Feature sets arrive in one of two informationally equivalent forms:
//!
//! - a binary [`MembershipMatrix`] (feature sets × features, entries in {0,1})
//! - named lists, mapping a set name to its member feature identifiers
//!
//! The named form is converted to the binary form by taking the union of all
//! named identifiers as the feature axis. Downstream statistic computation
//! consumes neither form directly; [`build_index`] canonicalizes to per-set
//! member positions relative to a shared feature ordering, dropping sets
//! below a minimum size.

use std::collections::BTreeSet;

use velella_core::{Result, VelellaError};

// ── Binary membership matrix ───────────────────────────────────────────────

/// Binary feature-set membership matrix (sets × features).
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MembershipMatrix {
    values: Vec<u8>,
    set_names: Vec<String>,
    feature_names: Vec<String>,
}

impl MembershipMatrix {
    /// Create a membership matrix from row-major 0/1 data.
    ///
    /// Each inner `Vec` is one feature set's indicator row. Entries must be
    /// exactly 0.0 or 1.0.
    pub fn new(
        values: Vec<Vec<f64>>,
        set_names: Vec<String>,
        feature_names: Vec<String>,
    ) -> Result<Self> {
        if values.len() != set_names.len() {
            return Err(VelellaError::InvalidInput(format!(
                "membership: {} rows but {} set names",
                values.len(),
                set_names.len(),
            )));
        }

        let n_features = feature_names.len();
        let mut flat = Vec::with_capacity(values.len() * n_features);
        for (i, row) in values.iter().enumerate() {
            if row.len() != n_features {
                return Err(VelellaError::InvalidInput(format!(
                    "membership: set '{}' has {} entries, expected {n_features}",
                    set_names[i],
                    row.len(),
                )));
            }
            for &v in row {
                if v == 0.0 {
                    flat.push(0);
                } else if v == 1.0 {
                    flat.push(1);
                } else {
                    return Err(VelellaError::InvalidInput(format!(
                        "membership: set '{}' contains non-0/1 value {v}",
                        set_names[i],
                    )));
                }
            }
        }

        Ok(Self {
            values: flat,
            set_names,
            feature_names,
        })
    }

    /// Number of feature sets (rows).
    pub fn n_sets(&self) -> usize {
        self.set_names.len()
    }

    /// Number of features (columns).
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Whether `feature` (column index) belongs to `set` (row index).
    pub fn contains(&self, set: usize, feature: usize) -> bool {
        self.values[set * self.feature_names.len() + feature] == 1
    }

    /// Feature-set names in row order.
    pub fn set_names(&self) -> &[String] {
        &self.set_names
    }

    /// Feature identifiers in column order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Convert back to named-list form (set name → member identifiers).
    pub fn to_named(&self) -> Vec<(String, Vec<String>)> {
        self.set_names
            .iter()
            .enumerate()
            .map(|(s, name)| {
                let members = self
                    .feature_names
                    .iter()
                    .enumerate()
                    .filter(|(f, _)| self.contains(s, *f))
                    .map(|(_, id)| id.clone())
                    .collect();
                (name.clone(), members)
            })
            .collect()
    }
}

// ── Input forms ────────────────────────────────────────────────────────────

/// Feature-set membership input, in either supported form.
#[derive(Debug, Clone)]
pub enum FeatureSets {
    /// Explicit binary membership matrix.
    Matrix(MembershipMatrix),
    /// Named lists: set name → member feature identifiers.
    Named(Vec<(String, Vec<String>)>),
}

impl FeatureSets {
    /// Whether this input is already in binary-matrix form.
    ///
    /// The permutation test requires matrix form so that permuted feature
    /// assignments stay well-defined.
    pub fn is_matrix(&self) -> bool {
        matches!(self, FeatureSets::Matrix(_))
    }

    /// Canonicalize to the binary membership form.
    ///
    /// Named lists are converted by taking the union of all member
    /// identifiers (sorted) as the feature axis and building one 0/1
    /// indicator row per set.
    pub fn to_membership(&self) -> Result<MembershipMatrix> {
        match self {
            FeatureSets::Matrix(m) => Ok(m.clone()),
            FeatureSets::Named(sets) => {
                if sets.is_empty() {
                    return Err(VelellaError::InvalidInput(
                        "feature sets: named form must contain at least one set".into(),
                    ));
                }

                let universe: BTreeSet<&String> =
                    sets.iter().flat_map(|(_, members)| members.iter()).collect();
                let feature_names: Vec<String> = universe.into_iter().cloned().collect();

                let rows: Vec<Vec<f64>> = sets
                    .iter()
                    .map(|(_, members)| {
                        let member_set: BTreeSet<&String> = members.iter().collect();
                        feature_names
                            .iter()
                            .map(|f| if member_set.contains(f) { 1.0 } else { 0.0 })
                            .collect()
                    })
                    .collect();

                let set_names = sets.iter().map(|(name, _)| name.clone()).collect();
                MembershipMatrix::new(rows, set_names, feature_names)
            }
        }
    }
}

// ── Canonical index form ───────────────────────────────────────────────────

/// One feature set resolved to member positions within a shared feature
/// ordering.
#[derive(Debug, Clone)]
pub struct FeatureSetIndex {
    /// Name of the feature set.
    pub name: String,
    /// Member positions (ascending) relative to the shared ordering.
    pub members: Vec<usize>,
}

/// Resolve each feature set to member positions within `feature_order`.
///
/// Features in `feature_order` that the membership matrix does not know are
/// treated as non-members. Sets with fewer than `min_size` members after
/// resolution are silently dropped.
pub fn build_index(
    membership: &MembershipMatrix,
    feature_order: &[String],
    min_size: usize,
) -> Vec<FeatureSetIndex> {
    // Map shared ordering → membership column, once.
    let columns: Vec<Option<usize>> = feature_order
        .iter()
        .map(|f| membership.feature_names().iter().position(|n| n == f))
        .collect();

    let mut index = Vec::new();
    for (s, name) in membership.set_names().iter().enumerate() {
        let members: Vec<usize> = columns
            .iter()
            .enumerate()
            .filter(|(_, col)| col.map(|c| membership.contains(s, c)).unwrap_or(false))
            .map(|(pos, _)| pos)
            .collect();

        if members.len() >= min_size {
            index.push(FeatureSetIndex {
                name: name.clone(),
                members,
            });
        }
    }
    index
}

// ── Tests ──────────────────────────────────────────────────────────────────
