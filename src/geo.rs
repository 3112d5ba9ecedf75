use serde::Deserialize;

/// IP-geolocation endpoint; accurate enough for a city-level map search.
const GEO_URL: &str = "http://ip-api.com/json";

/// Fixed specialty search, percent-encoded once:
/// "Pulmonologist OR Respiratory Specialist OR General Physician Hospital".
const HOSPITAL_QUERY: &str =
    "Pulmonologist%20OR%20Respiratory%20Specialist%20OR%20General%20Physician%20Hospital";

#[derive(Debug, Deserialize)]
struct GeoReply {
    status: String,
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}

/// Resolve an approximate position for the current network address.
pub async fn locate() -> Result<(f64, f64), Box<dyn std::error::Error + Send + Sync>> {
    let reply: GeoReply = reqwest::get(GEO_URL).await?.json().await?;
    if reply.status != "success" {
        return Err(format!("geolocation lookup answered status {:?}", reply.status).into());
    }
    Ok((reply.lat, reply.lon))
}

/// Map search for respiratory specialists around the given position.
pub fn hospital_search_url(lat: f64, lon: f64) -> String {
    format!("https://www.google.com/maps/search/{HOSPITAL_QUERY}/@{lat},{lon},12z")
}
