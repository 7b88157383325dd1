use geojson::feature::Id;
use geojson::{Feature, FeatureCollection, Geometry, Value};
use serde::Serialize;

use crate::error::AoiError;

/// Closed ring of `[lng, lat]` positions (first position repeated last).
pub type Ring = Vec<[f64; 2]>;

/// One validated AOI polygon. `rings[0]` is the exterior, the rest are holes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoiFeature {
    pub id: String,
    rings: Vec<Ring>,
}

impl AoiFeature {
    /// Validates every ring: at least 4 finite positions, closed, and
    /// latitudes within `[-90, 90]`.
    pub fn new(id: impl Into<String>, rings: Vec<Ring>) -> Result<Self, AoiError> {
        if rings.is_empty() {
            return Err(AoiError::RingTooShort { ring: 0, len: 0 });
        }
        for (ring_idx, ring) in rings.iter().enumerate() {
            validate_ring(ring_idx, ring)?;
        }
        Ok(Self {
            id: id.into(),
            rings,
        })
    }

    pub fn exterior(&self) -> &Ring {
        &self.rings[0]
    }

    pub fn rings(&self) -> &[Ring] {
        &self.rings
    }

    /// Same polygon, ignoring the id.
    pub fn same_geometry(&self, other: &AoiFeature) -> bool {
        self.rings == other.rings
    }

    /// Reads a GeoJSON feature. The returned id is `None` when the feature
    /// carries none; callers assign one.
    pub fn parse_geojson(feature: &Feature) -> Result<(Option<String>, Vec<Ring>), AoiError> {
        let geometry = feature.geometry.as_ref().ok_or(AoiError::MissingGeometry)?;
        let Value::Polygon(polygon) = &geometry.value else {
            return Err(AoiError::NotAPolygon(geometry_kind(&geometry.value)));
        };

        let mut rings = Vec::with_capacity(polygon.len());
        for (ring_idx, ring) in polygon.iter().enumerate() {
            let mut out = Vec::with_capacity(ring.len());
            for (index, position) in ring.iter().enumerate() {
                let [lng, lat, ..] = position.as_slice() else {
                    return Err(AoiError::InvalidCoordinate {
                        ring: ring_idx,
                        index,
                    });
                };
                out.push([*lng, *lat]);
            }
            rings.push(out);
        }

        let id = feature.id.as_ref().map(|id| match id {
            Id::String(s) => s.clone(),
            Id::Number(n) => n.to_string(),
        });
        Ok((id, rings))
    }

    pub fn from_geojson(feature: &Feature, fallback_id: impl FnOnce() -> String) -> Result<Self, AoiError> {
        let (id, rings) = Self::parse_geojson(feature)?;
        Self::new(id.unwrap_or_else(fallback_id), rings)
    }

    pub fn to_geojson(&self) -> Feature {
        let polygon = self
            .rings
            .iter()
            .map(|ring| ring.iter().map(|p| vec![p[0], p[1]]).collect())
            .collect();
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(polygon))),
            id: Some(Id::String(self.id.clone())),
            properties: None,
            foreign_members: None,
        }
    }
}

fn validate_ring(ring_idx: usize, ring: &Ring) -> Result<(), AoiError> {
    if ring.len() < 4 {
        return Err(AoiError::RingTooShort {
            ring: ring_idx,
            len: ring.len(),
        });
    }
    for (index, p) in ring.iter().enumerate() {
        if !p[0].is_finite() || !p[1].is_finite() || !(-90.0..=90.0).contains(&p[1]) {
            return Err(AoiError::InvalidCoordinate {
                ring: ring_idx,
                index,
            });
        }
    }
    if ring.first() != ring.last() {
        return Err(AoiError::RingNotClosed { ring: ring_idx });
    }
    Ok(())
}

fn geometry_kind(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Committed AOI polygons in commit order. Never empty: "no AOI" is `None`
/// at the state level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AoiCollection {
    features: Vec<AoiFeature>,
}

impl AoiCollection {
    pub fn new(features: Vec<AoiFeature>) -> Option<Self> {
        if features.is_empty() {
            None
        } else {
            Some(Self { features })
        }
    }

    pub fn single(feature: AoiFeature) -> Self {
        Self {
            features: vec![feature],
        }
    }

    pub fn features(&self) -> &[AoiFeature] {
        &self.features
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&AoiFeature> {
        self.features.iter().find(|f| f.id == id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.features.iter().map(|f| f.id.clone()).collect()
    }

    /// Order-sensitive geometry equality, ignoring ids.
    pub fn same_geometry(&self, other: &AoiCollection) -> bool {
        self.features.len() == other.features.len()
            && self
                .features
                .iter()
                .zip(&other.features)
                .all(|(a, b)| a.same_geometry(b))
    }

    /// Adds `feature`, or replaces the one with the same id in place.
    pub fn upsert(&mut self, feature: AoiFeature) {
        match self.features.iter_mut().find(|f| f.id == feature.id) {
            Some(slot) => *slot = feature,
            None => self.features.push(feature),
        }
    }

    /// Removes features whose id is in `ids`. Returns `None` when nothing is
    /// left.
    pub fn without(mut self, ids: &[String]) -> Option<Self> {
        self.features.retain(|f| !ids.contains(&f.id));
        Self::new(self.features)
    }

    /// Validates every feature; ids missing from the input come from
    /// `next_id`.
    pub fn from_geojson(
        collection: &FeatureCollection,
        mut next_id: impl FnMut() -> String,
    ) -> Result<Option<Self>, AoiError> {
        let mut features = Vec::with_capacity(collection.features.len());
        for feature in &collection.features {
            features.push(AoiFeature::from_geojson(feature, &mut next_id)?);
        }
        Ok(Self::new(features))
    }

    pub fn to_geojson(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.iter().map(AoiFeature::to_geojson).collect(),
            foreign_members: None,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn square(x: f64, y: f64, size: f64) -> Ring {
        vec![
            [x, y],
            [x + size, y],
            [x + size, y + size],
            [x, y + size],
            [x, y],
        ]
    }

    pub(crate) fn polygon_feature(id: Option<&str>, ring: &Ring) -> Feature {
        let coords = vec![ring.iter().map(|p| vec![p[0], p[1]]).collect()];
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(coords))),
            id: id.map(|s| Id::String(s.to_string())),
            properties: None,
            foreign_members: None,
        }
    }

    #[test]
    fn accepts_closed_polygon() {
        let f = AoiFeature::from_geojson(&polygon_feature(Some("a"), &square(0.0, 0.0, 1.0)), || {
            "unused".into()
        })
        .unwrap();
        assert_eq!(f.id, "a");
        assert_eq!(f.exterior().len(), 5);
    }

    #[test]
    fn missing_id_uses_fallback() {
        let f = AoiFeature::from_geojson(&polygon_feature(None, &square(0.0, 0.0, 1.0)), || {
            "aoi-7".into()
        })
        .unwrap();
        assert_eq!(f.id, "aoi-7");
    }

    #[test]
    fn rejects_open_and_short_rings() {
        let open = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]];
        assert_eq!(
            AoiFeature::new("x", vec![open]),
            Err(AoiError::RingNotClosed { ring: 0 })
        );

        let short = vec![[0.0, 0.0], [1.0, 0.0], [0.0, 0.0]];
        assert_eq!(
            AoiFeature::new("x", vec![short]),
            Err(AoiError::RingTooShort { ring: 0, len: 3 })
        );
    }

    #[test]
    fn rejects_non_finite_and_out_of_range() {
        let mut ring = square(0.0, 0.0, 1.0);
        ring[2] = [f64::NAN, 1.0];
        assert_eq!(
            AoiFeature::new("x", vec![ring]),
            Err(AoiError::InvalidCoordinate { ring: 0, index: 2 })
        );
        assert!(AoiFeature::new("x", vec![square(0.0, 89.5, 1.0)]).is_err());
    }

    #[test]
    fn rejects_non_polygon_geometry() {
        let point = Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![1.0, 2.0]))),
            id: None,
            properties: None,
            foreign_members: None,
        };
        assert_eq!(
            AoiFeature::from_geojson(&point, String::new),
            Err(AoiError::NotAPolygon("Point"))
        );
        let empty = Feature {
            geometry: None,
            ..point
        };
        assert_eq!(
            AoiFeature::from_geojson(&empty, String::new),
            Err(AoiError::MissingGeometry)
        );
    }

    #[test]
    fn collection_upsert_and_remove() {
        let a = AoiFeature::new("a", vec![square(0.0, 0.0, 1.0)]).unwrap();
        let b = AoiFeature::new("b", vec![square(5.0, 5.0, 1.0)]).unwrap();
        let mut c = AoiCollection::single(a);
        c.upsert(b.clone());
        assert_eq!(c.ids(), vec!["a".to_string(), "b".to_string()]);

        let moved = AoiFeature::new("b", vec![square(6.0, 6.0, 1.0)]).unwrap();
        c.upsert(moved.clone());
        assert_eq!(c.len(), 2);
        assert_eq!(c.get("b"), Some(&moved));

        let c = c.without(&["a".to_string()]).unwrap();
        assert_eq!(c.ids(), vec!["b".to_string()]);
        assert_eq!(c.without(&["b".to_string()]), None);
    }

    #[test]
    fn geojson_export_keeps_ids_and_rings() {
        let a = AoiFeature::new("a", vec![square(0.0, 0.0, 1.0)]).unwrap();
        let fc = AoiCollection::single(a.clone()).to_geojson();
        let back = AoiCollection::from_geojson(&fc, || "unused".into())
            .unwrap()
            .unwrap();
        assert_eq!(back.features(), &[a]);
    }
}
