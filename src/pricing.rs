//! Packaging and shipping charges.
//!
//! Packaging is charged per package by envelope volume, calibrated so that a
//! reference cube costs a reference price; custom envelopes carry a surcharge.
//! Shipping is charged per physical unit by weight.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::{BoxType, ExpansionError, Item, ItemId, Package, expand_item};
use crate::types::CM3_PER_LITER;

/// One weight band of a slab rule: flat `price` for totals up to `max_kg`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Slab {
    pub max_kg: f64,
    pub price: f64,
}

/// How the shipping component is derived from weight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ShippingRule {
    /// `weight × rate_per_kg`.
    Flat { rate_per_kg: f64 },
    /// Flat price of the first slab whose `max_kg` covers the weight,
    /// `weight × base_rate_per_kg` above the last slab.
    Slab {
        base_rate_per_kg: f64,
        slabs: Vec<Slab>,
    },
}

impl ShippingRule {
    /// Shipping charge for a total weight.
    pub fn charge(&self, weight_kg: f64) -> f64 {
        match self {
            ShippingRule::Flat { rate_per_kg } => weight_kg * rate_per_kg,
            ShippingRule::Slab {
                base_rate_per_kg,
                slabs,
            } => slabs
                .iter()
                .find(|slab| weight_kg <= slab.max_kg)
                .map(|slab| slab.price)
                .unwrap_or(weight_kg * base_rate_per_kg),
        }
    }
}

/// Pricing parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct PricingConfig {
    /// Price of the reference cube.
    pub reference_price: f64,
    /// Edge of the reference cube in cm.
    pub reference_edge_cm: f64,
    /// Multiplier applied to custom envelopes.
    pub custom_surcharge: f64,
    pub shipping: ShippingRule,
}

impl PricingConfig {
    pub const DEFAULT_REFERENCE_PRICE: f64 = 5.0;
    pub const DEFAULT_REFERENCE_EDGE_CM: f64 = 30.0;
    pub const DEFAULT_RATE_PER_KG: f64 = 2.0;
    pub const DEFAULT_CUSTOM_SURCHARGE: f64 = 1.2;

    /// Creates a builder for a custom configuration.
    pub fn builder() -> PricingConfigBuilder {
        PricingConfigBuilder::default()
    }

    /// Packaging price per cm³ of envelope.
    pub fn price_per_cm3(&self) -> f64 {
        self.reference_price / self.reference_edge_cm.powi(3)
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            reference_price: Self::DEFAULT_REFERENCE_PRICE,
            reference_edge_cm: Self::DEFAULT_REFERENCE_EDGE_CM,
            custom_surcharge: Self::DEFAULT_CUSTOM_SURCHARGE,
            shipping: ShippingRule::Flat {
                rate_per_kg: Self::DEFAULT_RATE_PER_KG,
            },
        }
    }
}

/// Builder for PricingConfig.
#[derive(Clone, Debug, Default)]
pub struct PricingConfigBuilder {
    config: PricingConfig,
}

impl PricingConfigBuilder {
    pub fn reference_price(mut self, price: f64) -> Self {
        self.config.reference_price = price;
        self
    }

    pub fn reference_edge_cm(mut self, edge: f64) -> Self {
        self.config.reference_edge_cm = edge;
        self
    }

    pub fn custom_surcharge(mut self, factor: f64) -> Self {
        self.config.custom_surcharge = factor;
        self
    }

    pub fn shipping(mut self, rule: ShippingRule) -> Self {
        self.config.shipping = rule;
        self
    }

    pub fn build(self) -> PricingConfig {
        self.config
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PricingError {
    #[error("Cannot price item: {0}")]
    UnresolvedBox(#[from] ExpansionError),
}

/// Charges for one item.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ItemQuote {
    pub item_id: ItemId,
    pub package_count: usize,
    /// Summed envelope volume in cm³.
    pub packaging_volume_cm3: f64,
    pub packaging_charge: f64,
    pub shipping_charge: f64,
    pub total: f64,
}

/// Totals over all priced items of one client.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct ClientSummary {
    pub quotes: Vec<ItemQuote>,
    /// Items skipped because no box is assigned yet.
    pub unpriced: Vec<ItemId>,
    pub total_cost: f64,
    pub total_volume_liters: f64,
    pub total_packages: usize,
}

/// Derives packaging and shipping charges from the canonical package expansion.
#[derive(Clone, Debug, Default)]
pub struct PricingCalculator {
    config: PricingConfig,
}

impl PricingCalculator {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Packaging charge for a single envelope.
    pub fn package_charge(&self, package: &Package) -> f64 {
        let base = package.dimensions.volume() * self.config.price_per_cm3();
        if package.is_custom() {
            base * self.config.custom_surcharge
        } else {
            base
        }
    }

    /// Packaging charge summed over packages.
    pub fn packaging_charge(&self, packages: &[Package]) -> f64 {
        packages.iter().map(|p| self.package_charge(p)).sum()
    }

    /// Shipping charge for a total weight.
    pub fn shipping_charge(&self, weight_kg: f64) -> f64 {
        self.config.shipping.charge(weight_kg)
    }

    /// Total for a single unit of weight `weight_kg` shipped in `box_type`.
    pub fn unit_price_in_box(&self, box_type: &BoxType, weight_kg: f64) -> f64 {
        box_type.dimensions.volume() * self.config.price_per_cm3() + self.shipping_charge(weight_kg)
    }

    /// Quotes one item. `Ok(None)` when the item has no box assigned.
    ///
    /// # Examples
    /// ```
    /// use load_it_now::model::{BoxChoice, Item};
    /// use load_it_now::pricing::PricingCalculator;
    /// use load_it_now::types::Dimensions;
    ///
    /// let item = Item::new("vase", "Vase", Dimensions::cube(25.0), 0.0, "#7")
    ///     .with_box(BoxChoice::custom(Dimensions::cube(32.0)));
    /// let quote = PricingCalculator::default().quote_item(&item, &[]).unwrap().unwrap();
    /// assert!((quote.packaging_charge - 7.28).abs() < 0.01);
    /// ```
    pub fn quote_item(
        &self,
        item: &Item,
        catalog: &[BoxType],
    ) -> Result<Option<ItemQuote>, PricingError> {
        if item.box_choice.is_none() {
            return Ok(None);
        }
        let packages = expand_item(item, catalog)?;
        let packaging_volume_cm3 = packages.iter().map(|p| p.dimensions.volume()).sum();
        let packaging_charge = self.packaging_charge(&packages);
        let shipping_charge = self.shipping_charge(item.total_weight_kg());

        Ok(Some(ItemQuote {
            item_id: item.id.clone(),
            package_count: packages.len(),
            packaging_volume_cm3,
            packaging_charge,
            shipping_charge,
            total: packaging_charge + shipping_charge,
        }))
    }

    /// Sums quotes over a client's working set.
    pub fn client_summary(
        &self,
        items: &[Item],
        catalog: &[BoxType],
    ) -> Result<ClientSummary, PricingError> {
        let mut quotes = Vec::with_capacity(items.len());
        let mut unpriced = Vec::new();

        for item in items {
            match self.quote_item(item, catalog)? {
                Some(quote) => quotes.push(quote),
                None => unpriced.push(item.id.clone()),
            }
        }

        let total_cost = quotes.iter().map(|q| q.total).sum();
        let total_volume_liters = quotes
            .iter()
            .map(|q| q.packaging_volume_cm3 / CM3_PER_LITER)
            .sum();
        let total_packages = quotes.iter().map(|q| q.package_count).sum();

        Ok(ClientSummary {
            quotes,
            unpriced,
            total_cost,
            total_volume_liters,
            total_packages,
        })
    }
}
