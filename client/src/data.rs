use hexworld_shared::MapOverview;

/// Fetch and decode a map snapshot.
pub async fn fetch_map_overview(url: &str) -> Result<MapOverview, String> {
    let resp = gloo_net::http::Request::get(url)
        .send()
        .await
        .map_err(|e| format!("fetch error: {e}"))?;
    if !resp.ok() {
        return Err(format!("HTTP {}", resp.status()));
    }
    let body = resp.text().await.map_err(|e| format!("read error: {e}"))?;
    let map = MapOverview::from_json(&body)?;
    tracing::info!(
        tiles = map.tiles.len(),
        rivers = map.rivers.as_ref().map_or(0, |r| r.len()),
        species = map.species_ids().len(),
        "map overview loaded"
    );
    Ok(map)
}
