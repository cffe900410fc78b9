//! Box catalog and fleet snapshots.
//!
//! The core only reads these; editing catalogs is up to the caller.

use crate::model::{BoxType, BoxTypeId, Container, ContainerId};
use crate::types::Dimensions;

/// Standard boxes offered out of the box.
pub fn default_boxes() -> Vec<BoxType> {
    vec![
        standard_box("b1", "Small Cube", Dimensions::new(30.0, 30.0, 30.0), 10.0, "#60a5fa"),
        standard_box(
            "b2",
            "Medium Standard",
            Dimensions::new(50.0, 40.0, 40.0),
            20.0,
            "#34d399",
        ),
        standard_box("b3", "Large Mover", Dimensions::new(60.0, 60.0, 60.0), 30.0, "#f87171"),
        standard_box("b4", "Long Box", Dimensions::new(100.0, 30.0, 30.0), 15.0, "#a78bfa"),
    ]
}

/// Default fleet: a small van and a simulated 20ft container, both active.
pub fn default_containers() -> Vec<Container> {
    vec![
        Container {
            id: ContainerId::from("c1"),
            name: "Standard Van (Small)".to_string(),
            dimensions: Dimensions::new(240.0, 140.0, 140.0),
            max_weight_kg: 800.0,
            is_active: true,
        },
        Container {
            id: ContainerId::from("c2"),
            name: "20ft Container (Simulated)".to_string(),
            dimensions: Dimensions::new(590.0, 235.0, 239.0),
            max_weight_kg: 20_000.0,
            is_active: true,
        },
    ]
}

fn standard_box(id: &str, name: &str, dimensions: Dimensions, max_weight_kg: f64, color: &str) -> BoxType {
    BoxType {
        id: BoxTypeId::from(id),
        name: name.to_string(),
        dimensions,
        max_weight_kg,
        color: color.to_string(),
    }
}

/// Looks up a catalog box by id.
pub fn find_box<'a>(catalog: &'a [BoxType], id: &BoxTypeId) -> Option<&'a BoxType> {
    catalog.iter().find(|b| &b.id == id)
}

/// Containers that take part in loading, in fleet order.
pub fn active_containers(fleet: &[Container]) -> Vec<&Container> {
    fleet.iter().filter(|c| c.is_active).collect()
}
