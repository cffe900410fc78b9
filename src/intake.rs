//! Boundary to the item-attribute oracle.
//!
//! The oracle estimates dimensions, shape and weight from a photo or a text
//! description. The core never waits on it: callers hand in an already
//! resolved answer, and any failure is replaced by a local fallback estimate
//! so recommendation and pricing always get numbers to work with.

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::ids::IdGenerator;
use crate::model::{BoxChoice, BoxType, ClientId, Item, ItemShape};
use crate::pricing::PricingCalculator;
use crate::recommender::recommend_box;
use crate::types::{Dimensions, validation};

/// Weight given to photo drafts until someone weighs the item.
pub const IMAGE_DRAFT_WEIGHT_KG: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),
    #[error("Oracle returned an unusable estimate: {0}")]
    Malformed(String),
    #[error("Search query is empty")]
    EmptyQuery,
}

/// Estimate derived from a photo.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImageEstimate {
    pub dimensions: Dimensions,
    pub shape: ItemShape,
    pub confidence: f64,
}

/// Estimate derived from a product description.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TextEstimate {
    pub dimensions: Dimensions,
    pub weight_kg: f64,
    pub shape: ItemShape,
    pub confidence: f64,
}

/// External estimation service.
pub trait AttributeOracle {
    fn analyze_image(&self, image: &[u8]) -> Result<ImageEstimate, OracleError>;

    fn analyze_text(&self, query: &str) -> Result<TextEstimate, OracleError>;
}

/// Oracle used when no estimation service is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineOracle;

impl AttributeOracle for OfflineOracle {
    fn analyze_image(&self, _image: &[u8]) -> Result<ImageEstimate, OracleError> {
        Err(OracleError::Unavailable("no estimation service configured".to_string()))
    }

    fn analyze_text(&self, _query: &str) -> Result<TextEstimate, OracleError> {
        Err(OracleError::Unavailable("no estimation service configured".to_string()))
    }
}

/// Random but bounded stand-in for a failed photo analysis.
///
/// Whole centimeters: length in [10, 40), width in [10, 30), height in [5, 25).
pub fn fallback_image_estimate<R: Rng>(rng: &mut R) -> ImageEstimate {
    let length = f64::from(rng.gen_range(10u32..40));
    let width = f64::from(rng.gen_range(10u32..30));
    let height = f64::from(rng.gen_range(5u32..25));
    let shape = if rng.gen_bool(0.5) {
        ItemShape::Box
    } else {
        ItemShape::Irregular
    };

    ImageEstimate {
        dimensions: Dimensions::new(length, width, height),
        shape,
        confidence: 0.85,
    }
}

/// Fixed stand-in for a failed text analysis.
pub fn fallback_text_estimate() -> TextEstimate {
    TextEstimate {
        dimensions: Dimensions::new(50.0, 40.0, 15.0),
        weight_kg: 5.5,
        shape: ItemShape::Box,
        confidence: 0.8,
    }
}

fn check_estimate(dimensions: &Dimensions, confidence: f64) -> Result<(), OracleError> {
    validation::validate_dimensions(dimensions, "Estimate").map_err(OracleError::Malformed)?;
    if !(0.0..=1.0).contains(&confidence) {
        return Err(OracleError::Malformed(format!(
            "Confidence {} is outside [0, 1]",
            confidence
        )));
    }
    Ok(())
}

/// Asks the oracle about a photo and falls back on any failure.
pub fn resolve_image<R: Rng>(
    oracle: &dyn AttributeOracle,
    image: &[u8],
    rng: &mut R,
) -> ImageEstimate {
    let answer = oracle
        .analyze_image(image)
        .and_then(|est| check_estimate(&est.dimensions, est.confidence).map(|_| est));

    match answer {
        Ok(estimate) => estimate,
        Err(err) => {
            tracing::warn!(error = %err, "image analysis failed, using fallback estimate");
            fallback_image_estimate(rng)
        }
    }
}

/// Asks the oracle about a description and falls back on any failure.
pub fn resolve_text(oracle: &dyn AttributeOracle, query: &str) -> TextEstimate {
    let answer = oracle.analyze_text(query).and_then(|est| {
        check_estimate(&est.dimensions, est.confidence)?;
        validation::validate_weight(est.weight_kg).map_err(OracleError::Malformed)?;
        Ok(est)
    });

    match answer {
        Ok(estimate) => estimate,
        Err(err) => {
            tracing::warn!(error = %err, "text analysis failed, using fallback estimate");
            fallback_text_estimate()
        }
    }
}

fn assign_best_box(mut item: Item, catalog: &[BoxType], pricing: &PricingCalculator) -> Item {
    if let Some(rec) = recommend_box(&item, catalog, pricing) {
        item.box_choice = Some(BoxChoice::catalog(rec.box_type.id));
    }
    item
}

/// Turns a photo estimate into a new single-unit item for `client`.
///
/// `ordinal` numbers the draft within the client's list for its display name.
pub fn draft_item_from_image(
    estimate: &ImageEstimate,
    client: &ClientId,
    ordinal: usize,
    catalog: &[BoxType],
    pricing: &PricingCalculator,
    ids: &mut dyn IdGenerator,
) -> Item {
    let mut item = Item::new(
        ids.next_item_id("item"),
        format!("Analyzed Item {}", ordinal),
        estimate.dimensions,
        IMAGE_DRAFT_WEIGHT_KG,
        client.clone(),
    );
    item.shape = estimate.shape;
    assign_best_box(item, catalog, pricing)
}

/// Turns a text estimate into a new single-unit item named after the query.
pub fn draft_item_from_text(
    query: &str,
    estimate: &TextEstimate,
    client: &ClientId,
    catalog: &[BoxType],
    pricing: &PricingCalculator,
    ids: &mut dyn IdGenerator,
) -> Result<Item, OracleError> {
    let name = query.trim();
    if name.is_empty() {
        return Err(OracleError::EmptyQuery);
    }

    let mut item = Item::new(
        ids.next_item_id("item"),
        name,
        estimate.dimensions,
        estimate.weight_kg,
        client.clone(),
    );
    item.shape = estimate.shape;
    Ok(assign_best_box(item, catalog, pricing))
}
