//! Compact URL form of an AOI: `lng,lat|lng,lat|...` per polygon exterior,
//! polygons joined with `||`. The closing position is implied.

use crate::error::AoiError;
use crate::feature::{AoiCollection, AoiFeature};

const POINT_SEP: &str = "|";
const POLYGON_SEP: &str = "||";

/// Holes are not representable and are dropped.
pub fn polygon_url_encode(collection: &AoiCollection) -> String {
    collection
        .features()
        .iter()
        .map(|feature| {
            let ring = feature.exterior();
            ring[..ring.len() - 1]
                .iter()
                .map(|p| format!("{},{}", p[0], p[1]))
                .collect::<Vec<_>>()
                .join(POINT_SEP)
        })
        .collect::<Vec<_>>()
        .join(POLYGON_SEP)
}

/// Decoded features get positional ids `url-0`, `url-1`, ...
pub fn polygon_url_decode(raw: &str) -> Result<AoiCollection, AoiError> {
    let mut features = Vec::new();
    for (i, polygon) in raw.split(POLYGON_SEP).enumerate() {
        let mut ring = Vec::new();
        for point in polygon.split(POINT_SEP) {
            ring.push(parse_point(point)?);
        }
        if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied())
            && (ring.len() < 4 || first != last)
        {
            ring.push(first);
        }
        features.push(AoiFeature::new(format!("url-{i}"), vec![ring])?);
    }
    AoiCollection::new(features).ok_or_else(|| AoiError::Decode("no polygons".to_string()))
}

fn parse_point(raw: &str) -> Result<[f64; 2], AoiError> {
    let mut parts = raw.split(',');
    let (Some(lng), Some(lat), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(AoiError::Decode(format!("`{raw}` is not `lng,lat`")));
    };
    let parse = |s: &str| {
        s.trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| AoiError::Decode(format!("`{s}` is not a number")))
    };
    Ok([parse(lng)?, parse(lat)?])
}
