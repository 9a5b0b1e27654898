//! Position text parsing
//!
//! The source format is a loose dump of JavaScript-ish object fragments:
//!
//! ```text
//! { position: [116.4074, 39.9042], name: 'Tiananmen', time: '2024-05-01 10:00' },
//! ```
//!
//! Coordinates, names and timestamps are scanned independently and paired by
//! their match index, not by proximity. On malformed input this means a missing
//! name shifts every later name by one; that behaviour is kept on purpose so the
//! output matches existing data files.

use crate::{PinPoint, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tokio::io::{AsyncRead, AsyncReadExt};

/// `position: [lng, lat]`
static POSITION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"position:\s*\[([0-9.-]+),\s*([0-9.-]+)\]").unwrap());

/// `name: 'text'` or `name: "text"`
static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"name:\s*['"]([^'"]+)['"]"#).unwrap());

/// `time: 'text'` or `time: "text"`
static TIME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r#"time:\s*['"]([^'"]+)['"]"#).unwrap());

/// Extract every valid position from the given text, in source order
///
/// Each number is read up to its longest valid prefix, so `116.40.1` reads as
/// `116.4` and `1-2` as `1`. Pairs with a number that has no leading digits,
/// or that fall outside the WGS84 ranges, are dropped without error. A dropped
/// pair still consumes its index, so the next point keeps the name and
/// `source_index` it would have had anyway.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn parse_positions(text: &str) -> Vec<PinPoint> {
    let names: Vec<&str> = capture_values(&NAME_RE, text);
    let times: Vec<&str> = capture_values(&TIME_RE, text);

    let mut positions = Vec::new();
    let mut matched = 0usize;

    for (i, caps) in POSITION_RE.captures_iter(text).enumerate() {
        matched += 1;

        // First number is the longitude, second the latitude
        let lng = caps.get(1).and_then(|m| parse_number_prefix(m.as_str()));
        let lat = caps.get(2).and_then(|m| parse_number_prefix(m.as_str()));
        let (Some(lat), Some(lng)) = (lat, lng) else {
            continue;
        };

        let name = match names.get(i) {
            Some(name) => (*name).to_string(),
            None => format!("Position {}", i + 1),
        };
        let timestamp = times.get(i).map(|t| (*t).to_string());

        if let Some(point) = PinPoint::new(lat, lng, name, timestamp, i + 1) {
            positions.push(point);
        }
    }

    tracing::debug!(
        positions = matched,
        names = names.len(),
        times = times.len(),
        dropped = matched - positions.len(),
        "Parsed position text"
    );

    positions
}

/// Read a position file and parse it
///
/// Fails only when the file cannot be read or is not UTF-8; malformed
/// records inside a readable file are skipped.
pub async fn read_positions(path: impl AsRef<Path>) -> Result<Vec<PinPoint>> {
    let path = path.as_ref();
    let bytes = tokio::fs::read(path).await?;
    let text = String::from_utf8(bytes)?;
    tracing::info!("Loaded {} ({} bytes)", path.display(), text.len());
    Ok(parse_positions(&text))
}

/// Read position text from any async reader and parse it
pub async fn read_positions_from<R: AsyncRead + Unpin>(mut reader: R) -> Result<Vec<PinPoint>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes).await?;
    let text = String::from_utf8(bytes)?;
    Ok(parse_positions(&text))
}

/// Read the longest leading decimal number of `token`
///
/// Accepts an optional sign, digits and at most one decimal point, stopping at
/// the first character that does not fit. Returns `None` when no digit was read.
fn parse_number_prefix(token: &str) -> Option<f64> {
    let bytes = token.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'-' | b'+')));
    let mut digits = 0usize;
    let mut seen_point = false;

    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        end += 1;
    }

    if digits == 0 {
        return None;
    }
    token[..end].parse().ok()
}

fn capture_values<'t>(re: &Regex, text: &'t str) -> Vec<&'t str> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        { position: [116.4074, 39.9042], name: 'Tiananmen', time: '2024-05-01 10:00' },
        { position: [116.3972, 39.9163], name: "Forbidden City", time: "2024-05-01 11:30" },
        { position: [116.2755, 39.9999], name: 'Summer Palace', time: '2024-05-02 09:15' },
    "#;

    #[test]
    fn test_parse_sample() {
        let points = parse_positions(SAMPLE);
        assert_eq!(points.len(), 3);

        assert_eq!(points[0].name(), "Tiananmen");
        assert_eq!(points[0].latitude(), 39.9042);
        assert_eq!(points[0].longitude(), 116.4074);
        assert_eq!(points[0].timestamp(), Some("2024-05-01 10:00"));
        assert_eq!(points[0].source_index(), 1);

        assert_eq!(points[1].name(), "Forbidden City");
        assert_eq!(points[2].source_index(), 3);
    }

    #[test]
    fn test_missing_name_gets_placeholder() {
        let text = r#"
            position: [1.0, 2.0], name: 'a', time: 't1'
            position: [3.0, 4.0], name: 'b', time: 't2'
            position: [5.0, 6.0], time: 't3'
        "#;
        let points = parse_positions(text);
        assert_eq!(points.len(), 3);
        assert_eq!(points[2].name(), "Position 3");
        assert_eq!(points[2].timestamp(), Some("t3"));
    }

    #[test]
    fn test_pairing_is_by_index_not_proximity() {
        // The first record has no name, so the second record's name pairs with it
        let text = r#"
            position: [1.0, 2.0], time: 't1'
            position: [3.0, 4.0], name: 'second', time: 't2'
        "#;
        let points = parse_positions(text);
        assert_eq!(points[0].name(), "second");
        assert_eq!(points[1].name(), "Position 2");
    }

    #[test]
    fn test_missing_timestamp_is_none() {
        let points = parse_positions("position: [10.0, 20.0], name: 'x'");
        assert_eq!(points.len(), 1);
        assert!(points[0].timestamp().is_none());
    }

    #[test]
    fn test_invalid_coordinates_dropped() {
        let text = r#"
            position: [10.0, 95.0], name: 'too far north'
            position: [-, 4.0], name: 'garbage'
            position: [-200.0, 0.0], name: 'too far west'
            position: [10.0, 20.0], name: 'ok'
        "#;
        let points = parse_positions(text);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name(), "ok");
        // Dropped records still consume their index
        assert_eq!(points[0].source_index(), 4);
    }

    #[test]
    fn test_number_prefix() {
        assert_eq!(parse_number_prefix("116.40.1"), Some(116.4));
        assert_eq!(parse_number_prefix("1-2"), Some(1.0));
        assert_eq!(parse_number_prefix("-0.5-"), Some(-0.5));
        assert_eq!(parse_number_prefix(".5"), Some(0.5));
        assert_eq!(parse_number_prefix("5."), Some(5.0));
        assert_eq!(parse_number_prefix("-"), None);
        assert_eq!(parse_number_prefix("."), None);
        assert_eq!(parse_number_prefix("-.-"), None);
        assert_eq!(parse_number_prefix("--1"), None);
    }

    #[test]
    fn test_malformed_numbers_read_as_prefix() {
        let points = parse_positions("position: [116.40.1, 39.9], name: 'x'");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name(), "x");
        assert_eq!(points[0].longitude(), 116.4);
        assert_eq!(points[0].latitude(), 39.9);

        let points = parse_positions("position: [1-2, 3.5.5], name: 'y'");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].longitude(), 1.0);
        assert_eq!(points[0].latitude(), 3.5);
    }

    #[test]
    fn test_sign_only_number_dropped() {
        let text = r#"
            position: [-, 39.9], name: 'a'
            position: [116.4, 39.9], name: 'b'
        "#;
        let points = parse_positions(text);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name(), "b");
        assert_eq!(points[0].source_index(), 2);
    }

    #[test]
    fn test_negative_coordinates() {
        let points = parse_positions("position: [-0.1278, 51.5074], name: 'London'");
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].longitude(), -0.1278);
    }

    #[test]
    fn test_empty_text() {
        assert!(parse_positions("").is_empty());
        assert!(parse_positions("nothing to see here").is_empty());
    }

    #[tokio::test]
    async fn test_read_positions_from_reader() {
        let points = read_positions_from(SAMPLE.as_bytes()).await.unwrap();
        assert_eq!(points.len(), 3);
    }

    #[tokio::test]
    async fn test_read_positions_invalid_utf8() {
        let bytes: &[u8] = &[0x70, 0xff, 0xfe];
        let result = read_positions_from(bytes).await;
        assert!(matches!(result, Err(crate::PinsError::Decode(_))));
    }

    #[tokio::test]
    async fn test_read_positions_missing_file() {
        let result = read_positions("/definitely/not/here/positions.txt").await;
        assert!(result.unwrap_err().is_parse_error());
    }
}
