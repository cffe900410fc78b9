//! Merging several items into one synthetic package.
//!
//! The bundle envelope is a cube sized from the summed unit volumes plus an
//! air-gap allowance; the constituents are not actually arranged in 3D.

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::ids::IdGenerator;
use crate::model::{BoxChoice, BoxType, Item, ItemId, ItemShape};
use crate::pricing::PricingCalculator;
use crate::recommender::{BoxRecommendation, recommend_box};
use crate::types::Dimensions;

/// Bundling policy.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BundleConfig {
    /// Multiplier on the summed volume for irregular co-packing.
    pub air_gap_factor: f64,
}

impl BundleConfig {
    pub const DEFAULT_AIR_GAP_FACTOR: f64 = 1.3;

    pub fn builder() -> BundleConfigBuilder {
        BundleConfigBuilder::default()
    }
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            air_gap_factor: Self::DEFAULT_AIR_GAP_FACTOR,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct BundleConfigBuilder {
    config: BundleConfig,
}

impl BundleConfigBuilder {
    pub fn air_gap_factor(mut self, factor: f64) -> Self {
        self.config.air_gap_factor = factor;
        self
    }

    pub fn build(self) -> BundleConfig {
        self.config
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BundleError {
    #[error("A bundle needs at least two items, got {0}")]
    TooFewItems(usize),
    #[error("Item '{0}' is not in the working set")]
    UnknownItem(ItemId),
}

/// The synthetic item and the box chosen for it.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct BundleOutcome {
    pub bundle: Item,
    /// `None` when no catalog box holds the bundle; it then needs a custom envelope.
    pub recommendation: Option<BoxRecommendation>,
}

/// Builds one synthetic item out of `items`.
///
/// All items must belong to the same client; the bundle takes the client of
/// the first item without checking the others.
pub fn bundle_items(
    items: &[&Item],
    catalog: &[BoxType],
    config: &BundleConfig,
    pricing: &PricingCalculator,
    ids: &mut dyn IdGenerator,
) -> Result<BundleOutcome, BundleError> {
    let [first, ..] = items else {
        return Err(BundleError::TooFewItems(0));
    };
    if items.len() < 2 {
        return Err(BundleError::TooFewItems(items.len()));
    }

    let total_weight: f64 = items.iter().map(|i| i.total_weight_kg()).sum();
    let total_volume: f64 = items
        .iter()
        .map(|i| i.dimensions.volume() * f64::from(i.quantity.max(1)))
        .sum();
    let side = (total_volume * config.air_gap_factor).cbrt().round().max(1.0);

    let mut bundle = Item {
        id: ids.next_item_id("bundle"),
        name: format!("Bundle: {} Items", items.len()),
        weight_kg: total_weight,
        dimensions: Dimensions::cube(side),
        shape: ItemShape::Box,
        is_fragile: items.iter().any(|i| i.is_fragile),
        is_stackable: items.iter().all(|i| i.is_stackable),
        box_choice: None,
        quantity: 1,
        pack_together: false,
        client_id: first.client_id.clone(),
    };

    let recommendation = recommend_box(&bundle, catalog, pricing);
    if let Some(rec) = &recommendation {
        bundle.box_choice = Some(BoxChoice::catalog(rec.box_type.id.clone()));
    }

    tracing::debug!(
        bundle = %bundle.id,
        constituents = items.len(),
        side,
        boxed = recommendation.is_some(),
        "bundled items"
    );

    Ok(BundleOutcome {
        bundle,
        recommendation,
    })
}

/// Replaces the selected items of a working set with their bundle.
///
/// The remaining items keep their order and the bundle is appended. The
/// working set is left untouched on error.
pub fn replace_with_bundle(
    working_set: &mut Vec<Item>,
    selected: &[ItemId],
    catalog: &[BoxType],
    config: &BundleConfig,
    pricing: &PricingCalculator,
    ids: &mut dyn IdGenerator,
) -> Result<BundleOutcome, BundleError> {
    let wanted: BTreeSet<&ItemId> = selected.iter().collect();
    if let Some(missing) = wanted
        .iter()
        .find(|id| !working_set.iter().any(|item| &item.id == **id))
    {
        return Err(BundleError::UnknownItem((*missing).clone()));
    }

    let chosen: Vec<&Item> = working_set
        .iter()
        .filter(|item| wanted.contains(&item.id))
        .collect();
    let outcome = bundle_items(&chosen, catalog, config, pricing, ids)?;

    working_set.retain(|item| !wanted.contains(&item.id));
    working_set.push(outcome.bundle.clone());
    Ok(outcome)
}
