use serde::{Deserialize, Serialize};

/// Geographic bounding box in lon/lat degrees.
///
/// Serialized as `[swLng, swLat, neLng, neLat]`.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Bbox {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Bbox {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Bbox { min, max }
    }

    /// Smallest box containing every point; `None` for an empty input.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f64; 2]>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bbox = Bbox::new(first, first);
        for p in iter {
            bbox.extend(p);
        }
        Some(bbox)
    }

    pub fn extend(&mut self, p: [f64; 2]) {
        self.min[0] = self.min[0].min(p[0]);
        self.min[1] = self.min[1].min(p[1]);
        self.max[0] = self.max[0].max(p[0]);
        self.max[1] = self.max[1].max(p[1]);
    }

    pub fn union(&self, other: &Bbox) -> Bbox {
        let mut out = *self;
        out.extend(other.min);
        out.extend(other.max);
        out
    }

    /// Midpoint of the box as `[lng, lat]`.
    pub fn center(&self) -> [f64; 2] {
        [
            (self.min[0] + self.max[0]) / 2.0,
            (self.min[1] + self.max[1]) / 2.0,
        ]
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.min[0], self.min[1], self.max[0], self.max[1]]
    }
}

impl From<[f64; 4]> for Bbox {
    fn from(a: [f64; 4]) -> Self {
        Bbox::new([a[0], a[1]], [a[2], a[3]])
    }
}

impl From<Bbox> for [f64; 4] {
    fn from(b: Bbox) -> Self {
        b.to_array()
    }
}
