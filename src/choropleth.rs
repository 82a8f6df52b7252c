// Interactive choropleth of homicides per state.
//
// Boundaries come from a GeoJSON FeatureCollection fetched over HTTP; the map
// itself is a standalone HTML page with one inline SVG path per state, a
// hover tooltip and a color legend.
use crate::charts::or_rd;
use crate::error::{PipelineError, PipelineResult};
use crate::types::StateTotal;
use crate::util::format_number;
use reqwest::blocking::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

const MAP_WIDTH: f64 = 960.0;
const MAP_HEIGHT: f64 = 720.0;
const MAP_PADDING: f64 = 20.0;

/// GET the boundary document. The timeout covers the whole request.
pub fn fetch_geojson(url: &str, timeout: Duration) -> PipelineResult<Value> {
    let client = Client::builder()
        .timeout(timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()?;
    let resp = client.get(url).send()?.error_for_status()?;
    let doc: Value = resp.json()?;
    info!(url, "boundary geometry fetched");
    Ok(doc)
}

type Ring = Vec<(f64, f64)>;

/// Outer and inner rings for each feature, keyed by the state code property.
pub fn state_shapes(geojson: &Value, key: &str) -> PipelineResult<HashMap<String, Vec<Ring>>> {
    let features = geojson
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| PipelineError::Geometry("document has no 'features' array".to_string()))?;

    let mut shapes = HashMap::new();
    for feature in features {
        let Some(code) = feature
            .get("properties")
            .and_then(|p| p.get(key))
            .and_then(Value::as_str)
        else {
            continue;
        };
        let Some(geometry) = feature.get("geometry") else {
            continue;
        };
        let rings = geometry_rings(geometry);
        if !rings.is_empty() {
            shapes
                .entry(code.trim().to_string())
                .or_insert_with(Vec::new)
                .extend(rings);
        }
    }
    Ok(shapes)
}

fn geometry_rings(geometry: &Value) -> Vec<Ring> {
    let coords = geometry.get("coordinates");
    match geometry.get("type").and_then(Value::as_str) {
        Some("Polygon") => coords.map(polygon_rings).unwrap_or_default(),
        Some("MultiPolygon") => coords
            .and_then(Value::as_array)
            .map(|polys| polys.iter().flat_map(polygon_rings).collect())
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

fn polygon_rings(polygon: &Value) -> Vec<Ring> {
    polygon
        .as_array()
        .map(|rings| {
            rings
                .iter()
                .filter_map(|ring| {
                    let pts: Ring = ring
                        .as_array()?
                        .iter()
                        .filter_map(|p| {
                            let p = p.as_array()?;
                            Some((p.first()?.as_f64()?, p.get(1)?.as_f64()?))
                        })
                        .collect();
                    (pts.len() >= 3).then_some(pts)
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Equirectangular projection scaled to fit the given bounds.
struct Projection {
    min_lon: f64,
    max_lat: f64,
    kx: f64,
    ky: f64,
    scale: f64,
}

impl Projection {
    fn fit<'a>(rings: impl Iterator<Item = &'a Ring>) -> Option<Self> {
        let (mut min_lon, mut max_lon) = (f64::INFINITY, f64::NEG_INFINITY);
        let (mut min_lat, mut max_lat) = (f64::INFINITY, f64::NEG_INFINITY);
        for &(lon, lat) in rings.flatten() {
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
        }
        if !min_lon.is_finite() || !min_lat.is_finite() {
            return None;
        }
        let kx = ((min_lat + max_lat) / 2.0).to_radians().cos().abs().max(0.1);
        let ky = 1.0;
        let w = ((max_lon - min_lon) * kx).max(1e-9);
        let h = ((max_lat - min_lat) * ky).max(1e-9);
        let scale = ((MAP_WIDTH - 2.0 * MAP_PADDING) / w).min((MAP_HEIGHT - 2.0 * MAP_PADDING) / h);
        Some(Self {
            min_lon,
            max_lat,
            kx,
            ky,
            scale,
        })
    }

    fn project(&self, (lon, lat): (f64, f64)) -> (f64, f64) {
        (
            MAP_PADDING + (lon - self.min_lon) * self.kx * self.scale,
            MAP_PADDING + (self.max_lat - lat) * self.ky * self.scale,
        )
    }
}

fn svg_path(rings: &[Ring], proj: &Projection) -> String {
    let mut d = String::new();
    for ring in rings {
        for (i, p) in ring.iter().enumerate() {
            let (x, y) = proj.project(*p);
            let _ = write!(d, "{}{:.1},{:.1} ", if i == 0 { "M" } else { "L" }, x, y);
        }
        d.push_str("Z ");
    }
    d.trim_end().to_string()
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn css_color(t: f64) -> String {
    let c = or_rd(t);
    format!("#{:02x}{:02x}{:02x}", c.0, c.1, c.2)
}

/// Render the HTML map for the given totals. Only states with geometry are
/// drawn; the view is fitted to those states. Fails when no state matches.
pub fn render_html(totals: &[StateTotal], geojson: &Value, key: &str) -> PipelineResult<String> {
    let shapes = state_shapes(geojson, key)?;
    let matched: Vec<(&StateTotal, &Vec<Ring>)> = totals
        .iter()
        .filter_map(|t| shapes.get(&t.state).map(|rings| (t, rings)))
        .collect();
    let unmatched: Vec<&str> = totals
        .iter()
        .filter(|t| !shapes.contains_key(&t.state))
        .map(|t| t.state.as_str())
        .collect();
    if !unmatched.is_empty() {
        warn!(states = ?unmatched, "no boundary geometry for some states");
    }
    if matched.is_empty() {
        return Err(PipelineError::Geometry(format!(
            "no feature property '{}' matches any state code",
            key
        )));
    }

    let proj = Projection::fit(matched.iter().flat_map(|(_, rings)| rings.iter()))
        .ok_or_else(|| PipelineError::Geometry("matched features have no coordinates".to_string()))?;

    let lo = matched.iter().map(|(t, _)| t.homicides).fold(f64::INFINITY, f64::min);
    let hi = matched.iter().map(|(t, _)| t.homicides).fold(f64::NEG_INFINITY, f64::max);
    let span = if hi > lo { hi - lo } else { 1.0 };

    let mut paths = String::new();
    for (total, rings) in &matched {
        let label = format!(
            "{}: {} homicídios",
            escape_html(&total.state),
            format_number(total.homicides, 0)
        );
        let _ = writeln!(
            paths,
            r#"    <path class="uf" d="{}" fill="{}" data-label="{}"><title>{}</title></path>"#,
            svg_path(rings, &proj),
            css_color((total.homicides - lo) / span),
            label,
            label
        );
    }

    let mut stops = String::new();
    for i in 0..=4 {
        let t = i as f64 / 4.0;
        let _ = write!(
            stops,
            r#"<stop offset="{:.0}%" stop-color="{}"/>"#,
            t * 100.0,
            css_color(t)
        );
    }

    let mut html = String::new();
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head>
<meta charset="utf-8">
<title>Distribuição Geográfica de Homicídios Dolosos</title>
<style>
  body {{ font-family: sans-serif; margin: 24px; color: #222; }}
  .uf {{ stroke: #ffffff; stroke-width: 0.8; cursor: pointer; }}
  .uf:hover {{ stroke: #222; stroke-width: 2; }}
  #tip {{ position: fixed; pointer-events: none; background: rgba(255,255,255,0.95);
          border: 1px solid #999; padding: 4px 8px; font-size: 13px; display: none; }}
</style>
</head>
<body>
<h2>Distribuição Geográfica de Homicídios Dolosos</h2>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">
{paths}</svg>
<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="50">
  <defs><linearGradient id="scale">{stops}</linearGradient></defs>
  <rect x="20" y="5" width="{bar}" height="16" fill="url(#scale)"/>
  <text x="20" y="40" font-size="12">{lo}</text>
  <text x="{bar_end}" y="40" font-size="12" text-anchor="end">{hi}</text>
</svg>
<p>Homicídios</p>
<div id="tip"></div>
<script>
  const tip = document.getElementById("tip");
  document.querySelectorAll(".uf").forEach(function (el) {{
    el.addEventListener("mousemove", function (ev) {{
      tip.textContent = el.getAttribute("data-label");
      tip.style.left = (ev.clientX + 12) + "px";
      tip.style.top = (ev.clientY + 12) + "px";
      tip.style.display = "block";
    }});
    el.addEventListener("mouseleave", function () {{ tip.style.display = "none"; }});
  }});
</script>
</body>
</html>
"#,
        w = MAP_WIDTH,
        h = MAP_HEIGHT,
        paths = paths,
        stops = stops,
        bar = MAP_WIDTH - 40.0,
        bar_end = MAP_WIDTH - 20.0,
        lo = format_number(lo, 0),
        hi = format_number(hi, 0),
    );
    Ok(html)
}

/// Fetch, render and write the map.
pub fn write_choropleth(
    totals: &[StateTotal],
    url: &str,
    key: &str,
    timeout: Duration,
    path: &Path,
) -> PipelineResult<()> {
    let geojson = fetch_geojson(url, timeout)?;
    let html = render_html(totals, &geojson, key)?;
    std::fs::write(path, html)?;
    Ok(())
}
