//! OpenStreetMap share-link to embed-URL conversion.

use regex::Regex;

lazy_static::lazy_static! {
    static ref SHARE_LINK_REGEX: Regex =
        Regex::new(r"#map=([0-9]+)/(\d+\.\d+)/(\d+\.\d+)").unwrap();
}

/// Half-width of the embedded bounding box, in degrees.
const BBOX_DELTA: f64 = 0.002;

/// Shown on the contact page when no map has been configured.
pub const DEFAULT_EMBED_URL: &str = "https://www.openstreetmap.org/export/embed.html?bbox=28.9784%2C41.0082%2C28.9784%2C41.0082&layer=mapnik";

/// Convert `https://www.openstreetmap.org/#map=zoom/lat/lon` into an
/// embeddable URL with a small bounding box and a marker. Anything else,
/// including URLs that are already embeds, is returned unchanged.
pub fn embed_map_url(url: &str) -> String {
    let Some(caps) = SHARE_LINK_REGEX.captures(url) else {
        return url.to_string();
    };
    let (lat_text, lon_text) = (&caps[2], &caps[3]);
    let (Ok(lat), Ok(lon)) = (lat_text.parse::<f64>(), lon_text.parse::<f64>()) else {
        return url.to_string();
    };

    let bbox = format!(
        "{}%2C{}%2C{}%2C{}",
        lon - BBOX_DELTA,
        lat - BBOX_DELTA,
        lon + BBOX_DELTA,
        lat + BBOX_DELTA
    );
    format!(
        "https://www.openstreetmap.org/export/embed.html?bbox={}&layer=mapnik&marker={}%2C{}",
        bbox, lat_text, lon_text
    )
}
