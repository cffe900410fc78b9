//! Beladungslogik für einen einzelnen Container.
//!
//! Dieses Modul implementiert eine deterministische Regal-Heuristik (Shelf Packing):
//! - Pakete werden nach Höhe und Grundfläche absteigend sortiert
//! - Reihen füllen sich entlang der Länge (x), neue Reihen wandern in die Tiefe (z)
//! - Neue Lagen werden in der Höhe (y) gestapelt
//! - Kein Backtracking, keine Rotation
//!
//! Der Packer kennt keine Kunden; er erhält die bereits gefilterte Paketliste
//! eines Containers.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geometry::volume;
use crate::model::{
    ClientId, Container, ContainerId, ExpansionError, Item, ItemId, Package, PackageId,
    PackedPackage,
};
use crate::types::{CM3_PER_M3, Dimensions, EPSILON_GENERAL, Point3};

/// Konfiguration für die Beladung.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PackingConfig {
    /// Maximalgewicht des Containers als harte Platzierungsbedingung
    pub enforce_weight_limit: bool,
    /// Allgemeine numerische Toleranz
    pub general_epsilon: f64,
}

impl PackingConfig {
    pub const DEFAULT_ENFORCE_WEIGHT_LIMIT: bool = true;
    pub const DEFAULT_GENERAL_EPSILON: f64 = EPSILON_GENERAL;

    /// Erstellt einen Builder für benutzerdefinierte Konfiguration.
    pub fn builder() -> PackingConfigBuilder {
        PackingConfigBuilder::default()
    }
}

impl Default for PackingConfig {
    fn default() -> Self {
        Self {
            enforce_weight_limit: Self::DEFAULT_ENFORCE_WEIGHT_LIMIT,
            general_epsilon: Self::DEFAULT_GENERAL_EPSILON,
        }
    }
}

/// Builder-Pattern für PackingConfig.
#[derive(Clone, Debug, Default)]
pub struct PackingConfigBuilder {
    config: PackingConfig,
}

impl PackingConfigBuilder {
    /// Schaltet die Gewichtsgrenze als Platzierungsbedingung ein oder aus.
    pub fn enforce_weight_limit(mut self, enforce: bool) -> Self {
        self.config.enforce_weight_limit = enforce;
        self
    }

    /// Setzt die allgemeine Toleranz.
    pub fn general_epsilon(mut self, epsilon: f64) -> Self {
        self.config.general_epsilon = epsilon;
        self
    }

    /// Erstellt die finale Konfiguration.
    pub fn build(self) -> PackingConfig {
        self.config
    }
}

/// Gründe, warum ein Paket nicht verladen wurde.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum UnplacedReason {
    /// Kein Platz mehr in der Höhe (Überlauf der Regal-Heuristik).
    HeightExhausted,
    /// Das Paket ist in mindestens einer Achse größer als der Container.
    DimensionsExceedContainer,
    /// Das Paket würde das Maximalgewicht des Containers überschreiten.
    WeightLimitExceeded,
    /// Dem Artikel ist keine Verpackung zugeordnet.
    NoBoxAssigned,
    /// Die zugeordnete Katalogbox existiert nicht.
    UnknownBox,
}

impl UnplacedReason {
    pub fn code(&self) -> &'static str {
        match self {
            UnplacedReason::HeightExhausted => "height_exhausted",
            UnplacedReason::DimensionsExceedContainer => "dimensions_exceed_container",
            UnplacedReason::WeightLimitExceeded => "weight_limit_exceeded",
            UnplacedReason::NoBoxAssigned => "no_box_assigned",
            UnplacedReason::UnknownBox => "unknown_box",
        }
    }
}

impl std::fmt::Display for UnplacedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnplacedReason::HeightExhausted => {
                write!(f, "Keine freie Lage mehr in der Containerhöhe")
            }
            UnplacedReason::DimensionsExceedContainer => {
                write!(
                    f,
                    "Paket passt in mindestens einer Dimension nicht in den Container"
                )
            }
            UnplacedReason::WeightLimitExceeded => {
                write!(f, "Paket überschreitet das zulässige Gesamtgewicht")
            }
            UnplacedReason::NoBoxAssigned => {
                write!(f, "Artikel hat keine Verpackung zugeordnet")
            }
            UnplacedReason::UnknownBox => {
                write!(f, "Zugeordnete Verpackung ist nicht im Katalog")
            }
        }
    }
}

impl From<&ExpansionError> for UnplacedReason {
    fn from(err: &ExpansionError) -> Self {
        match err {
            ExpansionError::NoBoxAssigned(_) => UnplacedReason::NoBoxAssigned,
            ExpansionError::UnknownBox { .. } => UnplacedReason::UnknownBox,
        }
    }
}

/// Paket oder Artikel, der nicht verladen wurde.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct UnpackedEntry {
    pub item_id: ItemId,
    /// `None`, wenn der Artikel gar nicht erst zu Paketen aufgelöst werden konnte.
    pub package_id: Option<PackageId>,
    pub client_id: ClientId,
    pub dimensions: Option<Dimensions>,
    pub weight_kg: f64,
    pub reason: UnplacedReason,
}

impl UnpackedEntry {
    pub fn from_package(package: Package, reason: UnplacedReason) -> Self {
        Self {
            item_id: package.item_id,
            package_id: Some(package.id),
            client_id: package.client_id,
            dimensions: Some(package.dimensions),
            weight_kg: package.weight_kg,
            reason,
        }
    }

    /// Artikel, dessen Verpackung nicht aufgelöst werden konnte.
    pub fn from_unresolved(item: &Item, err: &ExpansionError) -> Self {
        Self {
            item_id: item.id.clone(),
            package_id: None,
            client_id: item.client_id.clone(),
            dimensions: None,
            weight_kg: item.total_weight_kg(),
            reason: UnplacedReason::from(err),
        }
    }
}

/// Kennzahlen einer Beladung.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackingMetrics {
    /// Verladenes Volumen in Prozent des Containervolumens
    pub volume_utilization_pct: f64,
    pub total_weight_kg: f64,
    pub package_count: usize,
    /// Freies Volumen in m³
    pub free_volume_m3: f64,
    /// Verladenes Gewicht liegt über dem Maximalgewicht (nur ohne harte Grenze möglich)
    pub over_weight_limit: bool,
}

/// Ergebnis der Beladung eines Containers.
#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct PackingResult {
    pub container_id: ContainerId,
    pub packed: Vec<PackedPackage>,
    pub unpacked: Vec<UnpackedEntry>,
    pub metrics: PackingMetrics,
}

impl PackingResult {
    /// Leeres Ergebnis für einen Container ohne Pakete.
    pub fn empty(container: &Container) -> Self {
        Self {
            container_id: container.id.clone(),
            packed: Vec::new(),
            unpacked: Vec::new(),
            metrics: compute_metrics(&[], container),
        }
    }

    /// Gibt an, ob alle Pakete verladen wurden.
    pub fn is_complete(&self) -> bool {
        self.unpacked.is_empty()
    }
}

/// Ereignisse während der Beladung, für Live-Visualisierung.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type")]
pub enum PackEvent {
    /// Die Beladung eines Containers beginnt.
    PackingStarted {
        container_id: ContainerId,
        dimensions: Dimensions,
        max_weight_kg: f64,
        packages: usize,
    },
    /// Ein Paket wurde platziert.
    PackagePlaced {
        package_id: PackageId,
        client_id: ClientId,
        position: Point3,
        dimensions: Dimensions,
        weight_kg: f64,
        total_weight_kg: f64,
    },
    /// Ein Paket konnte nicht platziert werden.
    PackageRejected {
        package_id: PackageId,
        reason_code: String,
        reason_text: String,
    },
    /// Beladung abgeschlossen.
    Finished { placed: usize, unpacked: usize },
}

impl PackEvent {
    /// Ablehnungsereignis für einen unverladenen Eintrag.
    ///
    /// Nicht aufgelöste Artikel haben keine Paket-ID; dann steht die Artikel-ID
    /// an ihrer Stelle.
    pub fn rejected(entry: &UnpackedEntry) -> Self {
        PackEvent::PackageRejected {
            package_id: entry
                .package_id
                .clone()
                .unwrap_or_else(|| PackageId::new(entry.item_id.as_str())),
            reason_code: entry.reason.code().to_string(),
            reason_text: entry.reason.to_string(),
        }
    }
}

/// Cursor-Zustand der Regal-Heuristik.
///
/// `x` läuft entlang der Länge, `z` entlang der Breite, `y` in die Höhe.
#[derive(Clone, Copy, Debug, Default)]
struct ShelfCursor {
    x: f64,
    y: f64,
    z: f64,
    max_shelf_depth: f64,
    max_row_height: f64,
}

impl ShelfCursor {
    /// Führt die Reihen- und Lagenumbrüche für ein Paket durch und liefert die
    /// Ecke, an der es liegen würde, oder `None`, wenn die Höhe nicht reicht.
    ///
    /// Umbrüche bleiben auch bei Ablehnung wirksam.
    fn slot_for(&mut self, dims: &Dimensions, container: &Dimensions) -> Option<Point3> {
        if self.x + dims.length > container.length {
            // Neue Reihe
            self.x = 0.0;
            self.z += self.max_shelf_depth;
            self.max_shelf_depth = 0.0;
        }

        if self.z + dims.width > container.width {
            // Neue Lage
            self.x = 0.0;
            self.z = 0.0;
            self.y += self.max_row_height;
            self.max_row_height = 0.0;
        }

        if self.y + dims.height > container.height {
            return None;
        }

        Some(Point3::new(self.x, self.y, self.z))
    }

    fn commit(&mut self, dims: &Dimensions) {
        self.x += dims.length;
        self.max_shelf_depth = self.max_shelf_depth.max(dims.width);
        self.max_row_height = self.max_row_height.max(dims.height);
    }
}

/// Sortiert Pakete absteigend nach Höhe, bei Gleichstand nach Grundfläche.
///
/// Die Sortierung ist stabil; gleichwertige Pakete behalten ihre Eingabereihenfolge.
fn sort_for_shelves(packages: &mut [Package]) {
    packages.sort_by(|a, b| {
        b.dimensions
            .height
            .partial_cmp(&a.dimensions.height)
            .unwrap_or(Ordering::Equal)
            .then_with(|| {
                b.dimensions
                    .base_area()
                    .partial_cmp(&a.dimensions.base_area())
                    .unwrap_or(Ordering::Equal)
            })
    });
}

/// Verbucht ein abgelehntes Paket.
fn reject(
    package: Package,
    reason: UnplacedReason,
    unpacked: &mut Vec<UnpackedEntry>,
    on_event: &mut impl FnMut(&PackEvent),
) {
    tracing::debug!(package = %package.id, reason = reason.code(), "package not placed");
    let entry = UnpackedEntry::from_package(package, reason);
    on_event(&PackEvent::rejected(&entry));
    unpacked.push(entry);
}

/// Berechnet die Kennzahlen aus den platzierten Paketen.
fn compute_metrics(packed: &[PackedPackage], container: &Container) -> PackingMetrics {
    let container_volume = volume(&container.dimensions);
    let used_volume: f64 = packed.iter().map(|p| volume(&p.dimensions)).sum();
    let total_weight_kg: f64 = packed.iter().map(|p| p.weight_kg).sum();

    let volume_utilization_pct = if container_volume > 0.0 {
        used_volume / container_volume * 100.0
    } else {
        0.0
    };

    PackingMetrics {
        volume_utilization_pct,
        total_weight_kg,
        package_count: packed.len(),
        free_volume_m3: (container_volume - used_volume) / CM3_PER_M3,
        over_weight_limit: total_weight_kg > container.max_weight_kg + EPSILON_GENERAL,
    }
}

/// Belädt einen Container mit Standardkonfiguration.
///
/// # Beispiel
/// ```
/// use load_it_now::model::{BoxChoice, Container, Item, expand_item};
/// use load_it_now::packer::pack_container;
/// use load_it_now::types::Dimensions;
///
/// let van = Container::new("van", "Van", Dimensions::new(240.0, 140.0, 140.0), 800.0).unwrap();
/// let crate_item = Item::new("crate", "Crate", Dimensions::cube(90.0), 10.0, "#1")
///     .with_box(BoxChoice::custom(Dimensions::cube(100.0)))
///     .with_quantity(3);
/// let packages = expand_item(&crate_item, &[]).unwrap();
///
/// let result = pack_container(packages, &van);
/// assert_eq!(result.packed.len(), 2);
/// assert_eq!(result.unpacked.len(), 1);
/// ```
pub fn pack_container(packages: Vec<Package>, container: &Container) -> PackingResult {
    pack_container_with_config(packages, container, &PackingConfig::default())
}

/// Beladung mit benutzerdefinierter Konfiguration.
pub fn pack_container_with_config(
    packages: Vec<Package>,
    container: &Container,
    config: &PackingConfig,
) -> PackingResult {
    pack_container_with_progress(packages, container, config, |_| {})
}

/// Beladung mit Live-Progress Callback.
///
/// Ablauf pro Paket (in sortierter Reihenfolge):
/// 1. Zu große Pakete und Pakete über dem Restgewicht werden abgelehnt, ohne
///    den Cursor zu bewegen.
/// 2. Passt die Länge nicht mehr, beginnt eine neue Reihe; passt danach die
///    Breite nicht, beginnt eine neue Lage.
/// 3. Reicht die Höhe nicht, landet das Paket in `unpacked` und wird nicht erneut
///    versucht.
pub fn pack_container_with_progress(
    packages: Vec<Package>,
    container: &Container,
    config: &PackingConfig,
    mut on_event: impl FnMut(&PackEvent),
) -> PackingResult {
    let bounds = container.dimensions;
    on_event(&PackEvent::PackingStarted {
        container_id: container.id.clone(),
        dimensions: bounds,
        max_weight_kg: container.max_weight_kg,
        packages: packages.len(),
    });

    let mut packages = packages;
    sort_for_shelves(&mut packages);

    let mut cursor = ShelfCursor::default();
    let mut packed: Vec<PackedPackage> = Vec::with_capacity(packages.len());
    let mut unpacked: Vec<UnpackedEntry> = Vec::new();
    let mut loaded_weight = 0.0;

    for package in packages {
        let dims = package.dimensions;

        if !dims.fits_within(&bounds, config.general_epsilon) {
            reject(
                package,
                UnplacedReason::DimensionsExceedContainer,
                &mut unpacked,
                &mut on_event,
            );
            continue;
        }

        if config.enforce_weight_limit
            && loaded_weight + package.weight_kg > container.max_weight_kg + config.general_epsilon
        {
            reject(
                package,
                UnplacedReason::WeightLimitExceeded,
                &mut unpacked,
                &mut on_event,
            );
            continue;
        }

        let Some(corner) = cursor.slot_for(&dims, &bounds) else {
            reject(
                package,
                UnplacedReason::HeightExhausted,
                &mut unpacked,
                &mut on_event,
            );
            continue;
        };

        cursor.commit(&dims);
        loaded_weight += package.weight_kg;
        let placed = PackedPackage::at_corner(package, corner);
        on_event(&PackEvent::PackagePlaced {
            package_id: placed.package_id.clone(),
            client_id: placed.client_id.clone(),
            position: placed.position,
            dimensions: placed.dimensions,
            weight_kg: placed.weight_kg,
            total_weight_kg: loaded_weight,
        });
        packed.push(placed);
    }

    on_event(&PackEvent::Finished {
        placed: packed.len(),
        unpacked: unpacked.len(),
    });

    PackingResult {
        container_id: container.id.clone(),
        metrics: compute_metrics(&packed, container),
        packed,
        unpacked,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{intersects, lies_within};
    use proptest::prelude::*;

    fn container(dims: (f64, f64, f64), max_weight: f64) -> Container {
        Container::new("c", "Test", Dimensions::new(dims.0, dims.1, dims.2), max_weight).unwrap()
    }

    fn package(id: &str, dims: (f64, f64, f64), weight: f64) -> Package {
        Package {
            id: PackageId::from(id),
            item_id: ItemId::from(id),
            client_id: ClientId::from("#1"),
            box_id: None,
            dimensions: Dimensions::new(dims.0, dims.1, dims.2),
            weight_kg: weight,
            color: "#fff".to_string(),
        }
    }

    fn assert_sound(result: &PackingResult, bounds: &Dimensions) {
        for (i, a) in result.packed.iter().enumerate() {
            assert!(
                lies_within(a, bounds),
                "Paket {} liegt außerhalb des Containers",
                a.package_id
            );
            for b in &result.packed[i + 1..] {
                assert!(
                    !intersects(a, b),
                    "Pakete {} und {} überschneiden sich",
                    a.package_id,
                    b.package_id
                );
            }
        }
    }

    #[test]
    fn third_cube_overflows_small_van() {
        let van = container((240.0, 140.0, 140.0), 800.0);
        let packages = vec![
            package("a", (100.0, 100.0, 100.0), 10.0),
            package("b", (100.0, 100.0, 100.0), 10.0),
            package("c", (100.0, 100.0, 100.0), 10.0),
        ];

        let result = pack_container(packages, &van);
        assert_eq!(result.packed.len(), 2);
        assert_eq!(result.unpacked.len(), 1);
        assert_eq!(result.unpacked[0].package_id, Some(PackageId::from("c")));
        assert_eq!(result.unpacked[0].reason, UnplacedReason::HeightExhausted);

        assert_eq!(result.packed[0].position, Point3::new(50.0, 50.0, 50.0));
        assert_eq!(result.packed[1].position, Point3::new(150.0, 50.0, 50.0));
        assert_sound(&result, &van.dimensions);
    }

    #[test]
    fn taller_packages_go_first_then_larger_base() {
        let cont = container((100.0, 100.0, 100.0), 1000.0);
        let packages = vec![
            package("flat", (10.0, 10.0, 5.0), 1.0),
            package("tall", (10.0, 10.0, 50.0), 1.0),
            package("wide", (30.0, 30.0, 5.0), 1.0),
        ];

        let result = pack_container(packages, &cont);
        let order: Vec<_> = result.packed.iter().map(|p| p.package_id.as_str()).collect();
        assert_eq!(order, vec!["tall", "wide", "flat"]);
    }

    #[test]
    fn rows_wrap_along_width_and_layers_along_height() {
        let cont = container((20.0, 20.0, 20.0), 1000.0);
        let packages: Vec<_> = (0..8)
            .map(|i| package(&format!("p{}", i), (10.0, 10.0, 10.0), 1.0))
            .collect();

        let result = pack_container(packages, &cont);
        assert!(result.is_complete());
        let corners: Vec<_> = result.packed.iter().map(|p| p.min_corner()).collect();
        assert_eq!(corners[0], Point3::new(0.0, 0.0, 0.0));
        assert_eq!(corners[1], Point3::new(10.0, 0.0, 0.0));
        assert_eq!(corners[2], Point3::new(0.0, 0.0, 10.0));
        assert_eq!(corners[3], Point3::new(10.0, 0.0, 10.0));
        assert_eq!(corners[4], Point3::new(0.0, 10.0, 0.0));
        assert_eq!(corners[7], Point3::new(10.0, 10.0, 10.0));
        assert!((result.metrics.volume_utilization_pct - 100.0).abs() < 1e-9);
        assert!(result.metrics.free_volume_m3.abs() < 1e-12);
        assert_sound(&result, &cont.dimensions);
    }

    #[test]
    fn oversized_packages_are_rejected_without_moving_cursor() {
        let cont = container((50.0, 50.0, 50.0), 1000.0);
        let packages = vec![
            package("long", (60.0, 10.0, 60.0), 1.0),
            package("ok", (20.0, 20.0, 20.0), 1.0),
        ];

        let result = pack_container(packages, &cont);
        assert_eq!(result.unpacked.len(), 1);
        assert_eq!(
            result.unpacked[0].reason,
            UnplacedReason::DimensionsExceedContainer
        );
        assert_eq!(result.packed[0].min_corner(), Point3::origin());
    }

    #[test]
    fn weight_limit_gates_placement_when_enforced() {
        let cont = container((100.0, 100.0, 100.0), 25.0);
        let packages = vec![
            package("a", (10.0, 10.0, 10.0), 10.0),
            package("b", (10.0, 10.0, 10.0), 10.0),
            package("c", (10.0, 10.0, 10.0), 10.0),
        ];

        let enforced = pack_container(packages.clone(), &cont);
        assert_eq!(enforced.packed.len(), 2);
        assert_eq!(
            enforced.unpacked[0].reason,
            UnplacedReason::WeightLimitExceeded
        );
        assert!(!enforced.metrics.over_weight_limit);
        // Abgelehntes Paket bewegt den Cursor nicht
        assert_eq!(enforced.packed[1].min_corner(), Point3::new(10.0, 0.0, 0.0));

        let advisory = PackingConfig::builder().enforce_weight_limit(false).build();
        let relaxed = pack_container_with_config(packages, &cont, &advisory);
        assert_eq!(relaxed.packed.len(), 3);
        assert!(relaxed.metrics.over_weight_limit);
        assert_eq!(relaxed.metrics.total_weight_kg, 30.0);
    }

    #[test]
    fn empty_input_yields_empty_metrics() {
        let cont = container((100.0, 100.0, 100.0), 100.0);
        let result = pack_container(Vec::new(), &cont);
        assert_eq!(result, PackingResult::empty(&cont));
        assert_eq!(result.metrics.package_count, 0);
        assert_eq!(result.metrics.volume_utilization_pct, 0.0);
        assert!((result.metrics.free_volume_m3 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn doubled_van_takes_all_three_cubes() {
        let small = container((240.0, 140.0, 140.0), 10_000.0);
        let large = container((480.0, 280.0, 280.0), 10_000.0);
        let packages = vec![
            package("a", (100.0, 100.0, 100.0), 1.0),
            package("b", (100.0, 100.0, 100.0), 1.0),
            package("c", (100.0, 100.0, 100.0), 1.0),
            package("d", (60.0, 40.0, 30.0), 1.0),
        ];

        let before = pack_container(packages.clone(), &small);
        let after = pack_container(packages, &large);
        assert_eq!(before.unpacked.len(), 1);
        assert!(after.is_complete());
    }

    #[test]
    fn larger_container_can_strand_a_package_that_fit_before() {
        // Die Heuristik ist nicht monoton: im größeren Container belegt `p0`
        // die zweite Lage, und `p2` findet keinen Platz mehr.
        let packages = vec![
            package("p0", (8.0, 4.0, 8.0), 1.0),
            package("p1", (8.0, 8.0, 12.0), 1.0),
            package("p2", (4.0, 8.0, 4.0), 1.0),
        ];

        let small = pack_container(packages.clone(), &container((8.0, 8.0, 16.0), 1000.0));
        let large = pack_container(packages, &container((10.0, 10.0, 20.0), 1000.0));

        let stranded = |r: &PackingResult| -> Vec<String> {
            r.unpacked
                .iter()
                .filter_map(|e| e.package_id.as_ref().map(|id| id.to_string()))
                .collect()
        };
        assert_eq!(stranded(&small), vec!["p0"]);
        assert_eq!(stranded(&large), vec!["p2"]);
        assert_eq!(
            small.unpacked[0].reason,
            UnplacedReason::HeightExhausted
        );
    }

    #[test]
    fn events_follow_placement_order() {
        let cont = container((240.0, 140.0, 140.0), 800.0);
        let packages = vec![
            package("a", (100.0, 100.0, 100.0), 5.0),
            package("b", (100.0, 100.0, 100.0), 7.0),
            package("c", (100.0, 100.0, 100.0), 1.0),
        ];

        let mut events = Vec::new();
        let result = pack_container_with_progress(packages, &cont, &PackingConfig::default(), |e| {
            events.push(e.clone())
        });

        assert_eq!(events.len(), 5);
        assert!(matches!(events[0], PackEvent::PackingStarted { packages: 3, .. }));
        assert!(matches!(
            events[2],
            PackEvent::PackagePlaced { total_weight_kg, .. } if total_weight_kg == 12.0
        ));
        assert!(matches!(events[3], PackEvent::PackageRejected { .. }));
        assert!(matches!(
            events[4],
            PackEvent::Finished { placed: 2, unpacked: 1 }
        ));
        assert_eq!(result.packed.len(), 2);
    }

    fn arb_package() -> impl Strategy<Value = (u8, u8, u8, u8)> {
        (1u8..80, 1u8..80, 1u8..80, 0u8..50)
    }

    proptest! {
        #[test]
        fn packing_is_sound_conserving_and_repeatable(
            specs in prop::collection::vec(arb_package(), 0..40),
            cl in 50u16..300,
            cw in 50u16..300,
            ch in 50u16..300,
            enforce in any::<bool>(),
        ) {
            let cont = container((f64::from(cl), f64::from(cw), f64::from(ch)), 500.0);
            let packages: Vec<_> = specs
                .iter()
                .enumerate()
                .map(|(i, (l, w, h, kg))| {
                    package(
                        &format!("p{}", i),
                        (f64::from(*l), f64::from(*w), f64::from(*h)),
                        f64::from(*kg),
                    )
                })
                .collect();
            let config = PackingConfig::builder().enforce_weight_limit(enforce).build();

            let first = pack_container_with_config(packages.clone(), &cont, &config);
            let second = pack_container_with_config(packages.clone(), &cont, &config);

            prop_assert_eq!(first.packed.len() + first.unpacked.len(), packages.len());
            prop_assert_eq!(&first, &second);
            assert_sound(&first, &cont.dimensions);
            if enforce {
                prop_assert!(first.metrics.total_weight_kg <= cont.max_weight_kg + 1e-9);
            }
        }
    }
}
