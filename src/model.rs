//! Data models for item packaging and container loading.
//!
//! This module defines the fundamental data structures:
//! - `BoxType`: A catalog packaging box
//! - `Container`: A fleet vehicle/container with a weight limit
//! - `Item`: A physical thing to ship, with its box choice and quantity
//! - `Package`: The unit the packer places, derived from an `Item` by [`expand_item`]
//! - `PackedPackage`: A package with its centered position in the container

use std::fmt;

use serde::{Deserialize, Serialize};
#[allow(unused_imports)]
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::catalog::find_box;
use crate::types::{Dimensional, Dimensions, Point3, Weighted, validation};

/// Color used for envelopes that do not come from the catalog.
pub const CUSTOM_BOX_COLOR: &str = "#a78bfa";

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

string_id!(
    /// Identifier of a catalog box.
    BoxTypeId
);
string_id!(
    /// Identifier of a fleet container.
    ContainerId
);
string_id!(
    /// Identifier of a shipment item.
    ItemId
);
string_id!(
    /// Identifier of a client whose items travel together.
    ClientId
);
string_id!(
    /// Identifier of an expanded package (`<item>-<n>` or `<item>-consolidated`).
    PackageId
);

/// Validation error for data entering the core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Invalid dimension: {0}")]
    InvalidDimension(String),
    #[error("Invalid weight: {0}")]
    InvalidWeight(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(String),
}

fn check_dimensions(dims: &Dimensions, subject: &str) -> Result<(), ValidationError> {
    validation::validate_dimensions(dims, subject).map_err(ValidationError::InvalidDimension)
}

fn check_weight(value: f64) -> Result<(), ValidationError> {
    validation::validate_weight(value).map_err(ValidationError::InvalidWeight)
}

/// Catalog entry for a standard packaging box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "b2",
    "name": "Medium Standard",
    "dimensions": {"length": 50.0, "width": 40.0, "height": 40.0},
    "max_weight_kg": 20.0,
    "color": "#34d399"
}))]
pub struct BoxType {
    pub id: BoxTypeId,
    pub name: String,
    pub dimensions: Dimensions,
    pub max_weight_kg: f64,
    pub color: String,
}

impl BoxType {
    /// Creates a validated catalog box.
    ///
    /// # Examples
    /// ```
    /// use load_it_now::model::BoxType;
    /// use load_it_now::types::Dimensions;
    ///
    /// let ok = BoxType::new("b1", "Small Cube", Dimensions::cube(30.0), 10.0, "#60a5fa");
    /// assert!(ok.is_ok());
    ///
    /// let broken = BoxType::new("b0", "Flat", Dimensions::new(30.0, 30.0, 0.0), 10.0, "#000");
    /// assert!(broken.is_err());
    /// ```
    pub fn new(
        id: impl Into<BoxTypeId>,
        name: impl Into<String>,
        dimensions: Dimensions,
        max_weight_kg: f64,
        color: impl Into<String>,
    ) -> Result<Self, ValidationError> {
        let entry = Self {
            id: id.into(),
            name: name.into(),
            dimensions,
            max_weight_kg,
            color: color.into(),
        };
        entry.validate()?;
        Ok(entry)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_dimensions(&self.dimensions, "Box")?;
        check_weight(self.max_weight_kg)
    }
}

impl Dimensional for BoxType {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

/// Fleet entry. Only active containers take part in loading.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "c1",
    "name": "Standard Van (Small)",
    "dimensions": {"length": 240.0, "width": 140.0, "height": 140.0},
    "max_weight_kg": 800.0,
    "is_active": true
}))]
pub struct Container {
    pub id: ContainerId,
    pub name: String,
    pub dimensions: Dimensions,
    pub max_weight_kg: f64,
    #[serde(default)]
    pub is_active: bool,
}

impl Container {
    /// Creates a validated, active container.
    pub fn new(
        id: impl Into<ContainerId>,
        name: impl Into<String>,
        dimensions: Dimensions,
        max_weight_kg: f64,
    ) -> Result<Self, ValidationError> {
        let container = Self {
            id: id.into(),
            name: name.into(),
            dimensions,
            max_weight_kg,
            is_active: true,
        };
        container.validate()?;
        Ok(container)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        check_dimensions(&self.dimensions, "Container")?;
        check_weight(self.max_weight_kg)
    }

    /// Same container with the given activation flag.
    pub fn with_active(mut self, is_active: bool) -> Self {
        self.is_active = is_active;
        self
    }

    /// Returns the volume in cm³.
    pub fn volume(&self) -> f64 {
        self.dimensions.volume()
    }
}

impl Dimensional for Container {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

/// Shape class reported by intake.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ItemShape {
    #[default]
    Box,
    Cylinder,
    Irregular,
}

/// Which envelope an item ships in.
///
/// A custom box always carries its dimensions, so "custom without dimensions"
/// cannot be constructed.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BoxChoice {
    /// A box from the catalog, referenced by id.
    Catalog { id: BoxTypeId },
    /// A non-standard envelope with explicit dimensions.
    Custom { dimensions: Dimensions },
}

impl BoxChoice {
    pub fn catalog(id: impl Into<BoxTypeId>) -> Self {
        Self::Catalog { id: id.into() }
    }

    pub fn custom(dimensions: Dimensions) -> Self {
        Self::Custom { dimensions }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Self::Custom { .. })
    }
}

fn default_quantity() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// A physical thing to ship.
///
/// `weight_kg` and `dimensions` are per unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "id": "lamp",
    "name": "Desk lamp",
    "weight_kg": 4.0,
    "dimensions": {"length": 40.0, "width": 30.0, "height": 20.0},
    "shape": "irregular",
    "is_fragile": true,
    "is_stackable": false,
    "box_choice": {"kind": "catalog", "id": "b2"},
    "quantity": 2,
    "pack_together": false,
    "client_id": "#4821"
}))]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub weight_kg: f64,
    pub dimensions: Dimensions,
    #[serde(default)]
    pub shape: ItemShape,
    #[serde(default)]
    pub is_fragile: bool,
    #[serde(default = "default_true")]
    pub is_stackable: bool,
    #[serde(default)]
    pub box_choice: Option<BoxChoice>,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub pack_together: bool,
    pub client_id: ClientId,
}

impl Item {
    /// Creates a single-unit item without a box choice.
    pub fn new(
        id: impl Into<ItemId>,
        name: impl Into<String>,
        dimensions: Dimensions,
        weight_kg: f64,
        client_id: impl Into<ClientId>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            weight_kg,
            dimensions,
            shape: ItemShape::Box,
            is_fragile: false,
            is_stackable: true,
            box_choice: None,
            quantity: 1,
            pack_together: false,
            client_id: client_id.into(),
        }
    }

    pub fn with_box(mut self, choice: BoxChoice) -> Self {
        self.box_choice = Some(choice);
        self
    }

    /// Sets the quantity; the per-unit weight stays as it is.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    pub fn packed_together(mut self, pack_together: bool) -> Self {
        self.pack_together = pack_together;
        self
    }

    /// Edits the quantity in place. The unit weight is kept, so the total
    /// weight scales with the new count.
    pub fn set_quantity(&mut self, quantity: u32) -> Result<(), ValidationError> {
        if quantity == 0 {
            return Err(ValidationError::InvalidQuantity(format!(
                "Item '{}' must have a quantity of at least 1",
                self.id
            )));
        }
        self.quantity = quantity;
        Ok(())
    }

    /// Rejects geometry and counts the core cannot work with.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_dimensions(&self.dimensions, &format!("Item '{}'", self.id))?;
        check_weight(self.weight_kg)?;
        if self.quantity == 0 {
            return Err(ValidationError::InvalidQuantity(format!(
                "Item '{}' must have a quantity of at least 1",
                self.id
            )));
        }
        if let Some(BoxChoice::Custom { dimensions }) = &self.box_choice {
            check_dimensions(dimensions, &format!("Custom box of '{}'", self.id))?;
        }
        Ok(())
    }

    /// Number of packages this item turns into.
    pub fn effective_quantity(&self) -> u32 {
        if self.pack_together {
            1
        } else {
            self.quantity.max(1)
        }
    }

    /// Unit weight times the full quantity, independent of `pack_together`.
    pub fn total_weight_kg(&self) -> f64 {
        self.weight_kg * f64::from(self.quantity.max(1))
    }
}

impl Dimensional for Item {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

impl Weighted for Item {
    fn weight_kg(&self) -> f64 {
        self.weight_kg
    }
}

/// The unit the packer places: an envelope with a weight and an owner.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Package {
    pub id: PackageId,
    pub item_id: ItemId,
    pub client_id: ClientId,
    /// Catalog box of the envelope; `None` for a custom envelope.
    pub box_id: Option<BoxTypeId>,
    /// Outer dimensions of the envelope.
    pub dimensions: Dimensions,
    pub weight_kg: f64,
    pub color: String,
}

impl Package {
    pub fn is_custom(&self) -> bool {
        self.box_id.is_none()
    }
}

impl Dimensional for Package {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

impl Weighted for Package {
    fn weight_kg(&self) -> f64 {
        self.weight_kg
    }
}

/// Why an item could not be turned into packages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpansionError {
    #[error("Item '{0}' has no box assigned")]
    NoBoxAssigned(ItemId),
    #[error("Item '{item}' references unknown box '{box_id}'")]
    UnknownBox { item: ItemId, box_id: BoxTypeId },
}

impl ExpansionError {
    pub fn item_id(&self) -> &ItemId {
        match self {
            ExpansionError::NoBoxAssigned(item) => item,
            ExpansionError::UnknownBox { item, .. } => item,
        }
    }
}

/// Resolved envelope of an item's box choice.
#[derive(Clone, Debug, PartialEq)]
pub struct Envelope {
    pub box_id: Option<BoxTypeId>,
    pub dimensions: Dimensions,
    pub color: String,
}

/// Resolves the box an item is assigned to into concrete outer dimensions.
pub fn resolve_envelope(item: &Item, catalog: &[BoxType]) -> Result<Envelope, ExpansionError> {
    match &item.box_choice {
        None => Err(ExpansionError::NoBoxAssigned(item.id.clone())),
        Some(BoxChoice::Custom { dimensions }) => Ok(Envelope {
            box_id: None,
            dimensions: *dimensions,
            color: CUSTOM_BOX_COLOR.to_string(),
        }),
        Some(BoxChoice::Catalog { id }) => find_box(catalog, id)
            .map(|b| Envelope {
                box_id: Some(b.id.clone()),
                dimensions: b.dimensions,
                color: b.color.clone(),
            })
            .ok_or_else(|| ExpansionError::UnknownBox {
                item: item.id.clone(),
                box_id: id.clone(),
            }),
    }
}

/// Expands an item into the packages the packer places.
///
/// `quantity = N` without `pack_together` yields N packages of the assigned
/// envelope and unit weight; with `pack_together` it yields one envelope
/// carrying `N × weight_kg`. Pricing and packing both go through here.
///
/// # Examples
/// ```
/// use load_it_now::catalog::default_boxes;
/// use load_it_now::model::{expand_item, BoxChoice, Item};
/// use load_it_now::types::Dimensions;
///
/// let item = Item::new("mug", "Mug", Dimensions::cube(10.0), 0.5, "#1000")
///     .with_box(BoxChoice::catalog("b1"))
///     .with_quantity(3);
/// let packages = expand_item(&item, &default_boxes()).unwrap();
/// assert_eq!(packages.len(), 3);
/// assert_eq!(packages[2].id.as_str(), "mug-2");
/// ```
pub fn expand_item(item: &Item, catalog: &[BoxType]) -> Result<Vec<Package>, ExpansionError> {
    let envelope = resolve_envelope(item, catalog)?;
    let quantity = item.quantity.max(1);

    let make = |id: String, weight_kg: f64| Package {
        id: PackageId(id),
        item_id: item.id.clone(),
        client_id: item.client_id.clone(),
        box_id: envelope.box_id.clone(),
        dimensions: envelope.dimensions,
        weight_kg,
        color: envelope.color.clone(),
    };

    if item.pack_together && quantity > 1 {
        return Ok(vec![make(
            format!("{}-consolidated", item.id),
            item.total_weight_kg(),
        )]);
    }

    Ok((0..quantity)
        .map(|idx| make(format!("{}-{}", item.id, idx), item.weight_kg))
        .collect())
}

/// A package with its placement inside a container.
///
/// `position` is the geometric center of the envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PackedPackage {
    pub package_id: PackageId,
    pub item_id: ItemId,
    pub box_id: Option<BoxTypeId>,
    pub position: Point3,
    pub dimensions: Dimensions,
    pub weight_kg: f64,
    pub client_id: ClientId,
    pub color: String,
}

impl PackedPackage {
    /// Places a package with its envelope starting at `corner`.
    pub fn at_corner(package: Package, corner: Point3) -> Self {
        let half = package.dimensions.half();
        Self {
            position: Point3::new(
                corner.x + half.length,
                corner.y + half.height,
                corner.z + half.width,
            ),
            package_id: package.id,
            item_id: package.item_id,
            box_id: package.box_id,
            dimensions: package.dimensions,
            weight_kg: package.weight_kg,
            client_id: package.client_id,
            color: package.color,
        }
    }

    /// Corner with the smallest coordinates.
    pub fn min_corner(&self) -> Point3 {
        let half = self.dimensions.half();
        Point3::new(
            self.position.x - half.length,
            self.position.y - half.height,
            self.position.z - half.width,
        )
    }

    /// Corner with the largest coordinates.
    pub fn max_corner(&self) -> Point3 {
        let half = self.dimensions.half();
        Point3::new(
            self.position.x + half.length,
            self.position.y + half.height,
            self.position.z + half.width,
        )
    }
}

impl Dimensional for PackedPackage {
    fn dimensions(&self) -> Dimensions {
        self.dimensions
    }
}

impl Weighted for PackedPackage {
    fn weight_kg(&self) -> f64 {
        self.weight_kg
    }
}
