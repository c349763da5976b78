//! Holdings — the signed weight currently carried per symbol.

use super::Symbol;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Target or held weights keyed by symbol.
///
/// `BTreeMap` keeps iteration order deterministic, which keeps runs reproducible.
pub type Weights = BTreeMap<Symbol, f64>;

/// Current position per symbol as a signed fraction of portfolio cash.
///
/// A symbol whose weight is set to exactly zero is removed; no residual entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Holdings {
    weights: Weights,
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Weight held in `symbol`, 0.0 when flat.
    pub fn weight(&self, symbol: &str) -> f64 {
        self.weights.get(symbol).copied().unwrap_or(0.0)
    }

    pub fn is_held(&self, symbol: &str) -> bool {
        self.weights.contains_key(symbol)
    }

    /// Set the weight for a symbol, dropping it when the weight is exactly zero.
    pub fn set(&mut self, symbol: &str, weight: f64) {
        if weight == 0.0 {
            self.weights.remove(symbol);
        } else {
            self.weights.insert(symbol.to_string(), weight);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, f64)> {
        self.weights.iter().map(|(s, w)| (s, *w))
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.weights.keys()
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Sum of absolute weights.
    pub fn gross_exposure(&self) -> f64 {
        self.weights.values().map(|w| w.abs()).sum()
    }

    /// Sum of absolute weights of short positions only.
    pub fn short_exposure(&self) -> f64 {
        self.weights
            .values()
            .filter(|w| **w < 0.0)
            .map(|w| w.abs())
            .sum()
    }

    pub fn as_weights(&self) -> &Weights {
        &self.weights
    }
}

impl From<Weights> for Holdings {
    fn from(weights: Weights) -> Self {
        let mut holdings = Holdings::new();
        for (symbol, weight) in weights {
            holdings.set(&symbol, weight);
        }
        holdings
    }
}
