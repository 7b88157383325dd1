use foundation::Bbox;
use geo::{ChamberlainDuquetteArea, Coord, LineString, Polygon};

use crate::feature::{AoiCollection, AoiFeature};

/// Bounds over every exterior ring; `None` for no AOI.
pub fn collection_bbox(collection: Option<&AoiCollection>) -> Option<Bbox> {
    let collection = collection?;
    Bbox::from_points(
        collection
            .features()
            .iter()
            .flat_map(|f| f.exterior().iter().copied()),
    )
}

/// Geodesic area in km², holes subtracted.
pub fn area_km2(collection: Option<&AoiCollection>) -> f64 {
    let Some(collection) = collection else {
        return 0.0;
    };
    collection
        .features()
        .iter()
        .map(|f| to_geo(f).chamberlain_duquette_unsigned_area() / 1.0e6)
        .sum()
}

fn to_geo(feature: &AoiFeature) -> Polygon<f64> {
    let ring = |r: &Vec<[f64; 2]>| {
        LineString::new(r.iter().map(|p| Coord { x: p[0], y: p[1] }).collect())
    };
    let rings = feature.rings();
    Polygon::new(ring(&rings[0]), rings[1..].iter().map(ring).collect())
}

/// Human label for an area in km².
///
/// - no area: `"0"`
/// - below 1: two decimals
/// - below one million: rounded, with thousands separators (`"12,346"`)
/// - above: shortened with `M` / `B` suffixes (`"1.5M"`)
pub fn format_area(km2: f64) -> String {
    if !km2.is_finite() || km2 <= 0.0 {
        return "0".to_string();
    }
    if km2 < 1.0 {
        return format!("{km2:.2}");
    }
    if km2 < 1.0e6 {
        return group_thousands(km2.round() as u64);
    }
    let (scaled, suffix) = if km2 < 1.0e9 {
        (km2 / 1.0e6, "M")
    } else {
        (km2 / 1.0e9, "B")
    };
    let text = format!("{scaled:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text}{suffix}")
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::tests::square;
    use pretty_assertions::assert_eq;

    fn collection(rings: Vec<Vec<[f64; 2]>>) -> AoiCollection {
        let features = rings
            .into_iter()
            .enumerate()
            .map(|(i, r)| AoiFeature::new(format!("f{i}"), vec![r]).unwrap())
            .collect();
        AoiCollection::new(features).unwrap()
    }

    #[test]
    fn zero_state() {
        assert_eq!(collection_bbox(None), None);
        assert_eq!(area_km2(None), 0.0);
        assert_eq!(format_area(area_km2(None)), "0");
    }

    #[test]
    fn bbox_spans_all_features() {
        let c = collection(vec![square(0.0, 0.0, 1.0), square(10.0, -5.0, 2.0)]);
        assert_eq!(
            collection_bbox(Some(&c)).map(|b| b.to_array()),
            Some([0.0, -5.0, 12.0, 1.0])
        );
    }

    #[test]
    fn one_degree_square_at_equator() {
        let c = collection(vec![square(0.0, 0.0, 1.0)]);
        let km2 = area_km2(Some(&c));
        // ~111.3 km per degree on each side.
        assert!((km2 - 12_364.0).abs() < 150.0, "{km2}");
    }

    #[test]
    fn labels() {
        assert_eq!(format_area(0.0), "0");
        assert_eq!(format_area(f64::NAN), "0");
        assert_eq!(format_area(0.4242), "0.42");
        assert_eq!(format_area(999.6), "1,000");
        assert_eq!(format_area(12_345.6), "12,346");
        assert_eq!(format_area(1_500_000.0), "1.5M");
        assert_eq!(format_area(2_000_000.0), "2M");
        assert_eq!(format_area(510_072_000.0), "510.07M");
        assert_eq!(format_area(3.25e9), "3.25B");
    }
}
