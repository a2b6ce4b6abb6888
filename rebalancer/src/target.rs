//! Target weight specifications: loading, validation, and padding
//! completion.

use std::path::Path;

use rust_decimal::Decimal;
use rustc_hash::FxHashMap;
use serde::Deserialize;

use rebalance_core::market::Asset;

use crate::error::{Error, Result};

/// One entry in a target weight specification.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetWeight {
    pub asset: String,
    pub weight: Decimal,
}

/// A target portfolio allocation, as loaded from JSON.
///
/// Weights need not sum to 1: any unallocated mass is assigned to
/// `padding_asset` (falling back to the caller-supplied default) by
/// `complete`.
#[derive(Debug, Clone, Deserialize)]
pub struct TargetSpec {
    pub weights: Vec<TargetWeight>,
    #[serde(default)]
    pub padding_asset: Option<String>,
}

impl TargetSpec {
    /// Load a target spec from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::TargetRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let spec = Self::from_json(&contents)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Parse a target spec from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Rejects duplicate assets and weights outside `(0, 1]`.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for entry in &self.weights {
            if !seen.insert(entry.asset.clone()) {
                return Err(Error::Target(format!("duplicate asset {}", entry.asset)));
            }
            if entry.weight <= Decimal::ZERO || entry.weight > Decimal::ONE {
                return Err(Error::Target(format!(
                    "weight for {} must be in (0, 1], got {}",
                    entry.asset, entry.weight
                )));
            }
        }
        let total: Decimal = self.weights.iter().map(|w| w.weight).sum();
        if total > Decimal::ONE {
            return Err(Error::Target(format!(
                "target weights sum to {total}, which exceeds 1"
            )));
        }
        Ok(())
    }

    /// Completes the spec into a full weight map, assigning the residual
    /// mass `1 - sum(explicit weights)` to the padding asset.
    ///
    /// `self.padding_asset` takes priority; `default_padding` is used when
    /// the spec leaves it unset. If the padding asset coincides with an
    /// already-explicit asset, the residual is added to its weight. A zero
    /// residual adds no entry.
    pub fn complete(&self, default_padding: &Asset) -> Result<FxHashMap<Asset, Decimal>> {
        self.validate()?;

        let mut out: FxHashMap<Asset, Decimal> = self
            .weights
            .iter()
            .map(|w| (Asset::new(w.asset.clone()), w.weight))
            .collect();

        let explicit_sum: Decimal = self.weights.iter().map(|w| w.weight).sum();
        let padding_weight = Decimal::ONE - explicit_sum;
        if padding_weight < Decimal::ZERO {
            return Err(Error::Target(format!(
                "target weights sum to {explicit_sum}, which exceeds 1"
            )));
        }

        if padding_weight > Decimal::ZERO {
            let padding_asset = self
                .padding_asset
                .as_ref()
                .map(|a| Asset::new(a.clone()))
                .unwrap_or_else(|| default_padding.clone());
            *out.entry(padding_asset).or_insert(Decimal::ZERO) += padding_weight;
        }

        Ok(out)
    }
}
