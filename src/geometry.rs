//! Geometrische Hilfsfunktionen für achsenparallele Hüllquader.
//!
//! Volumen, Passform ohne Rotation und Prüfungen für platzierte Pakete
//! (Lage im Container, Überschneidungen).

use crate::model::PackedPackage;
use crate::types::{Dimensions, EPSILON_GENERAL};

/// Volumen eines Hüllquaders in cm³.
#[inline]
pub fn volume(d: &Dimensions) -> f64 {
    d.volume()
}

/// Prüft, ob `item` achsengleich in `outer` passt.
///
/// Länge gegen Länge, Breite gegen Breite, Höhe gegen Höhe. Es wird keine
/// Drehung ausprobiert.
///
/// # Beispiel
/// ```
/// use load_it_now::geometry::fits_axis_aligned;
/// use load_it_now::types::Dimensions;
///
/// let item = Dimensions::new(40.0, 30.0, 20.0);
/// assert!(!fits_axis_aligned(&item, &Dimensions::cube(30.0)));
/// assert!(fits_axis_aligned(&item, &Dimensions::new(50.0, 40.0, 40.0)));
/// ```
#[inline]
pub fn fits_axis_aligned(item: &Dimensions, outer: &Dimensions) -> bool {
    outer.length >= item.length && outer.width >= item.width && outer.height >= item.height
}

/// Berechnet die Überlappung zweier Intervalle in einer Dimension.
///
/// # Rückgabewert
/// Länge der Überlappung, mindestens 0.0
pub fn overlap_1d(a1: f64, a2: f64, b1: f64, b2: f64) -> f64 {
    (a2.min(b2) - a1.max(b1)).max(0.0)
}

/// Prüft, ob der Hüllquader eines platzierten Pakets vollständig in
/// `[0, container]` liegt (Mittelpunkt ± halbe Ausdehnung).
pub fn lies_within(placed: &PackedPackage, container: &Dimensions) -> bool {
    let min = placed.min_corner();
    let max = placed.max_corner();
    let eps = EPSILON_GENERAL;

    min.x >= -eps
        && min.y >= -eps
        && min.z >= -eps
        && max.x <= container.length + eps
        && max.y <= container.height + eps
        && max.z <= container.width + eps
}

/// Prüft, ob zwei platzierte Pakete sich räumlich überschneiden.
///
/// Zwei Quader überschneiden sich NICHT, wenn sie in mindestens einer Achse
/// getrennt sind. Berührende Flächen zählen nicht als Überschneidung.
pub fn intersects(a: &PackedPackage, b: &PackedPackage) -> bool {
    let (a_min, a_max) = (a.min_corner(), a.max_corner());
    let (b_min, b_max) = (b.min_corner(), b.max_corner());
    let eps = EPSILON_GENERAL;

    overlap_1d(a_min.x, a_max.x, b_min.x, b_max.x) > eps
        && overlap_1d(a_min.y, a_max.y, b_min.y, b_max.y) > eps
        && overlap_1d(a_min.z, a_max.z, b_min.z, b_max.z) > eps
}
