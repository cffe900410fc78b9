//! Box recommendation for a single unit.

use std::cmp::Ordering;

use serde::Serialize;
use utoipa::ToSchema;

use crate::geometry::{fits_axis_aligned, volume};
use crate::model::BoxType;
use crate::pricing::PricingCalculator;
use crate::types::{Dimensional, Weighted};

/// The smallest catalog box that holds an item.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct BoxRecommendation {
    #[serde(rename = "box")]
    pub box_type: BoxType,
    /// Item volume as a percentage of box volume.
    pub efficiency: f64,
    /// Packaging plus shipping for one unit in this box.
    pub price: f64,
}

/// Picks the smallest box that fits one unit.
///
/// Candidates must hold the item without rotation and carry its weight. The
/// smallest volume wins; on equal volume the earlier catalog entry wins.
/// `None` means no catalog box fits and the item needs a custom envelope.
///
/// # Examples
/// ```
/// use load_it_now::catalog::default_boxes;
/// use load_it_now::model::Item;
/// use load_it_now::pricing::PricingCalculator;
/// use load_it_now::recommender::recommend_box;
/// use load_it_now::types::Dimensions;
///
/// let item = Item::new("lamp", "Lamp", Dimensions::new(40.0, 30.0, 20.0), 4.0, "#1");
/// let rec = recommend_box(&item, &default_boxes(), &PricingCalculator::default()).unwrap();
/// assert_eq!(rec.box_type.name, "Medium Standard");
/// ```
pub fn recommend_box<T>(
    item: &T,
    catalog: &[BoxType],
    pricing: &PricingCalculator,
) -> Option<BoxRecommendation>
where
    T: Dimensional + Weighted,
{
    let dims = item.dimensions();
    let weight_kg = item.weight_kg();

    let best = catalog
        .iter()
        .filter(|b| fits_axis_aligned(&dims, &b.dimensions) && b.max_weight_kg >= weight_kg)
        // min_by returns the first of several equal minima
        .min_by(|a, b| {
            volume(&a.dimensions)
                .partial_cmp(&volume(&b.dimensions))
                .unwrap_or(Ordering::Equal)
        })?;

    tracing::debug!(box_id = %best.id, "recommended box");

    Some(BoxRecommendation {
        efficiency: volume(&dims) / volume(&best.dimensions) * 100.0,
        price: pricing.unit_price_in_box(best, weight_kg),
        box_type: best.clone(),
    })
}
