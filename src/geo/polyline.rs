// src/geo/polyline.rs — Encoded polyline decoding (precision 1e5)

use super::Coordinate;

/// Decode an encoded polyline string into coordinates.
///
/// Returns `None` if the string is truncated mid-value or contains bytes
/// outside the encoding alphabet.
pub fn decode(encoded: &str) -> Option<Vec<Coordinate>> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut idx = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;

    while idx < bytes.len() {
        lat += next_value(bytes, &mut idx)?;
        lng += next_value(bytes, &mut idx)?;
        points.push(Coordinate::new(lat as f64 / 1e5, lng as f64 / 1e5));
    }

    Some(points)
}

fn next_value(bytes: &[u8], idx: &mut usize) -> Option<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;
    loop {
        let b = *bytes.get(*idx)?;
        *idx += 1;
        if !(63..127).contains(&b) || shift > 60 {
            return None;
        }
        let chunk = (b - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;
        if chunk < 0x20 {
            break;
        }
    }
    Some(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}
