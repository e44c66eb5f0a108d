//! Product quality dashboard counts, folded over the loaded records

use serde::Serialize;
use std::collections::BTreeSet;

use crate::core::store::QualityStore;
use crate::entities::check::QualityState;

/// Quality figures for one product
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProductQualityStats {
    pub product: String,
    /// Active points that apply to the product
    pub control_point_qty: usize,
    pub pass_qty: usize,
    pub fail_qty: usize,
    /// Checks still waiting for a decision
    pub pending_qty: usize,
    /// Alerts on the product not yet in a done stage
    pub open_alerts: usize,
}

impl ProductQualityStats {
    /// Checks decided so far
    pub fn decided(&self) -> usize {
        self.pass_qty + self.fail_qty
    }

    /// Share of decided checks that passed, as a percentage
    pub fn pass_rate(&self) -> Option<f64> {
        match self.decided() {
            0 => None,
            n => Some(self.pass_qty as f64 / n as f64 * 100.0),
        }
    }
}

/// Counts for a single product
pub fn product_stats(store: &QualityStore, product: &str) -> ProductQualityStats {
    let control_point_qty = store
        .points()
        .filter(|p| p.active && p.product.as_deref().map_or(true, |pp| pp == product))
        .count();

    let (pass_qty, fail_qty, pending_qty) = store
        .checks()
        .filter(|c| c.product.as_deref() == Some(product))
        .fold((0, 0, 0), |(pass, fail, pending), c| match c.quality_state {
            QualityState::Pass => (pass + 1, fail, pending),
            QualityState::Fail => (pass, fail + 1, pending),
            QualityState::None => (pass, fail, pending + 1),
        });

    let open_alerts = store
        .alerts()
        .filter(|a| a.product.as_deref() == Some(product) && !a.is_closed(store.stages()))
        .count();

    ProductQualityStats {
        product: product.to_string(),
        control_point_qty,
        pass_qty,
        fail_qty,
        pending_qty,
        open_alerts,
    }
}

/// Every product named by a point, check or alert, sorted
pub fn known_products(store: &QualityStore) -> Vec<String> {
    let mut products = BTreeSet::new();
    products.extend(store.points().filter_map(|p| p.product.clone()));
    products.extend(store.checks().filter_map(|c| c.product.clone()));
    products.extend(store.alerts().filter_map(|a| a.product.clone()));
    products.into_iter().collect()
}

/// Counts for every known product
pub fn all_products(store: &QualityStore) -> Vec<ProductQualityStats> {
    known_products(store)
        .iter()
        .map(|p| product_stats(store, p))
        .collect()
}
