// Static chart rendering (PNG) with plotters.
//
// Every function takes already-aggregated data and an output path and either
// writes the image or returns the drawing error. Category axes are continuous
// with category `i` centred on `i`, so the integer key points label cells.
use crate::types::{CorrelationMatrix, ForecastRow, StateTotal, YearStatePivot, YearTotal};
use plotters::prelude::*;
use plotters::series::DashedLineSeries;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::error::Error;
use std::ops::Range;
use std::path::Path;

pub type ChartResult = Result<(), Box<dyn Error>>;

const COOLWARM: &[RGBColor] = &[
    RGBColor(59, 76, 192),
    RGBColor(221, 221, 221),
    RGBColor(180, 4, 38),
];
const ROCKET: &[RGBColor] = &[
    RGBColor(3, 5, 26),
    RGBColor(95, 24, 83),
    RGBColor(203, 27, 79),
    RGBColor(243, 118, 81),
    RGBColor(250, 235, 221),
];
const OR_RD: &[RGBColor] = &[
    RGBColor(255, 247, 236),
    RGBColor(253, 212, 158),
    RGBColor(252, 141, 89),
    RGBColor(215, 48, 31),
    RGBColor(127, 0, 0),
];

const MISSING_CELL: RGBColor = RGBColor(235, 235, 235);

/// Colormaps panic on NaN, so anything non-finite maps to the low end.
fn unit(t: f64) -> f64 {
    if t.is_finite() {
        t.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn gradient(stops: &[RGBColor], t: f64) -> RGBColor {
    DerivedColorMap::new(stops).get_color(unit(t))
}

pub fn coolwarm(t: f64) -> RGBColor {
    gradient(COOLWARM, t)
}

pub fn viridis(t: f64) -> RGBColor {
    ViridisRGB::get_color(unit(t))
}

pub fn rocket(t: f64) -> RGBColor {
    gradient(ROCKET, t)
}

pub fn or_rd(t: f64) -> RGBColor {
    gradient(OR_RD, t)
}

/// `#RRGGBB` to a color; malformed input falls back to a neutral blue.
pub fn hex_color(s: &str) -> RGBColor {
    let h = s.trim_start_matches('#');
    let channel = |i: usize| h.get(i..i + 2).and_then(|c| u8::from_str_radix(c, 16).ok());
    match (h.len(), channel(0), channel(2), channel(4)) {
        (6, Some(r), Some(g), Some(b)) => RGBColor(r, g, b),
        _ => RGBColor(46, 134, 171),
    }
}

/// Readable text color over a cell of the given fill.
fn contrast_text(c: &RGBColor) -> RGBColor {
    let luma = 0.299 * c.0 as f64 + 0.587 * c.1 as f64 + 0.114 * c.2 as f64;
    if luma > 140.0 {
        BLACK
    } else {
        WHITE
    }
}

fn padded_range(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values.filter(|v| v.is_finite()) {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !lo.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.1 } else { lo.abs().max(1.0) * 0.1 };
    (lo - pad)..(hi + pad)
}

fn year_range(first: i32, last: i32) -> Range<i32> {
    if first < last {
        first..last
    } else {
        (first - 1)..(last + 1)
    }
}

/// Axis for `n` categories with category `i` centred on `i`.
fn category_axis(n: usize) -> Range<f64> {
    -0.5..(n as f64 - 0.5)
}

fn category_label(v: f64, names: &[String]) -> String {
    let i = v.round();
    if i < 0.0 || (v - i).abs() > 1e-6 {
        return String::new();
    }
    names.get(i as usize).cloned().unwrap_or_default()
}

fn centered(size: u32, color: RGBColor) -> TextStyle<'static> {
    ("sans-serif", size)
        .into_font()
        .color(&color)
        .pos(Pos::new(HPos::Center, VPos::Center))
}

/// Annotated correlation heatmap, diverging scale over [-1, 1].
pub fn correlation_heatmap(m: &CorrelationMatrix, path: &Path) -> ChartResult {
    let n = m.columns.len();
    if n == 0 {
        return Err("no numeric columns to correlate".into());
    }
    let root = BitMapBackend::new(path, (1500, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Correlação entre Variáveis de Segurança Pública",
            ("sans-serif", 32),
        )
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(320)
        .build_cartesian_2d(category_axis(n), category_axis(n))?;

    let names = &m.columns;
    // row 0 at the top
    let y_names: Vec<String> = names.iter().rev().cloned().collect();
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(n)
        .y_labels(n)
        .x_label_formatter(&|v| category_label(*v, names))
        .y_label_formatter(&|v| category_label(*v, &y_names))
        .label_style(("sans-serif", 16))
        .draw()?;

    let mut cells = Vec::with_capacity(n * n);
    let mut labels = Vec::with_capacity(n * n);
    for (r, row) in m.values.iter().enumerate() {
        let y = (n - 1 - r) as f64;
        for (c, value) in row.iter().enumerate() {
            let x = c as f64;
            let fill = value.map(|v| coolwarm((v + 1.0) / 2.0)).unwrap_or(MISSING_CELL);
            cells.push(Rectangle::new(
                [(x - 0.5, y - 0.5), (x + 0.5, y + 0.5)],
                fill.filled(),
            ));
            let text = value.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "nan".into());
            labels.push(Text::new(
                text,
                (x, y),
                centered(22, contrast_text(&fill)),
            ));
        }
    }
    chart.draw_series(cells)?;
    chart.draw_series(labels)?;

    root.present()?;
    Ok(())
}

/// Homicides per year as a line with markers.
pub fn time_series(totals: &[YearTotal], color: RGBColor, path: &Path) -> ChartResult {
    let (Some(first), Some(last)) = (totals.first(), totals.last()) else {
        return Err("no yearly totals to plot".into());
    };
    let root = BitMapBackend::new(path, (1800, 900)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Evolução de Homicídios Dolosos", ("sans-serif", 32))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(100)
        .build_cartesian_2d(
            year_range(first.year, last.year),
            padded_range(totals.iter().map(|t| t.homicides)),
        )?;

    chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .bold_line_style(BLACK.mix(0.3))
        .x_labels(totals.len().min(25))
        .x_label_formatter(&|y| y.to_string())
        .y_label_formatter(&|v| crate::util::format_number(*v, 0))
        .x_desc("ano")
        .y_desc("Número de Ocorrências")
        .draw()?;

    let points: Vec<(i32, f64)> = totals.iter().map(|t| (t.year, t.homicides)).collect();
    chart.draw_series(LineSeries::new(points.iter().copied(), color.stroke_width(3)))?;
    chart.draw_series(points.iter().map(|&p| Circle::new(p, 6, color.filled())))?;

    root.present()?;
    Ok(())
}

/// One bar per state, in the order given (callers sort descending).
pub fn state_bars(totals: &[StateTotal], path: &Path) -> ChartResult {
    let n = totals.len();
    if n == 0 {
        return Err("no states to plot".into());
    }
    let top = totals
        .iter()
        .map(|t| t.homicides)
        .fold(0.0f64, f64::max)
        .max(1.0)
        * 1.1;

    let root = BitMapBackend::new(path, (2100, 1200)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Distribuição de Homicídios Dolosos por Estado",
            ("sans-serif", 36),
        )
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(120)
        .build_cartesian_2d(category_axis(n), 0.0..top)?;

    let names: Vec<String> = totals.iter().map(|t| t.state.clone()).collect();
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| category_label(*v, &names))
        .y_label_formatter(&|v| crate::util::format_number(*v, 0))
        .x_desc("Estado")
        .y_desc("Número de Homicídios")
        .label_style(("sans-serif", 18))
        .draw()?;

    let denom = (n.saturating_sub(1)).max(1) as f64;
    chart.draw_series(totals.iter().enumerate().map(|(i, t)| {
        let x = i as f64;
        Rectangle::new(
            [(x - 0.4, 0.0), (x + 0.4, t.homicides)],
            rocket(i as f64 / denom * 0.85).filled(),
        )
    }))?;

    root.present()?;
    Ok(())
}

/// Years (rows, oldest on top) by states (columns); empty cells stay grey.
pub fn temporal_heatmap(p: &YearStatePivot, path: &Path) -> ChartResult {
    let (rows, cols) = (p.years.len(), p.states.len());
    if rows == 0 || cols == 0 {
        return Err("empty year/state pivot".into());
    }
    let (lo, hi) = p
        .cells
        .iter()
        .flatten()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    let span = if hi > lo { hi - lo } else { 1.0 };

    let root = BitMapBackend::new(path, (2400, 1500)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(
            "Evolução Temporal de Homicídios por Estado",
            ("sans-serif", 36),
        )
        .margin(20)
        .x_label_area_size(70)
        .y_label_area_size(100)
        .build_cartesian_2d(category_axis(cols), category_axis(rows))?;

    let y_names: Vec<String> = p.years.iter().rev().map(|y| y.to_string()).collect();
    chart
        .configure_mesh()
        .disable_mesh()
        .x_labels(cols)
        .y_labels(rows)
        .x_label_formatter(&|v| category_label(*v, &p.states))
        .y_label_formatter(&|v| category_label(*v, &y_names))
        .x_desc("Estado")
        .y_desc("Ano")
        .label_style(("sans-serif", 18))
        .draw()?;

    let mut cells = Vec::with_capacity(rows * cols);
    for (r, row) in p.cells.iter().enumerate() {
        let y = (rows - 1 - r) as f64;
        for (c, value) in row.iter().enumerate() {
            let x = c as f64;
            let fill = value.map(|v| viridis((v - lo) / span)).unwrap_or(MISSING_CELL);
            // thin white gap between cells
            cells.push(Rectangle::new(
                [(x - 0.48, y - 0.48), (x + 0.48, y + 0.48)],
                fill.filled(),
            ));
        }
    }
    chart.draw_series(cells)?;

    root.present()?;
    Ok(())
}

/// Historical totals as a solid line plus each model's projection dashed.
pub fn forecast_chart(
    history: &[YearTotal],
    forecast: &[ForecastRow],
    colors: [RGBColor; 3],
    path: &Path,
) -> ChartResult {
    let first = history
        .first()
        .map(|t| t.year)
        .or_else(|| forecast.first().map(|f| f.year))
        .ok_or("nothing to plot")?;
    let last = forecast
        .last()
        .map(|f| f.year)
        .or_else(|| history.last().map(|t| t.year))
        .ok_or("nothing to plot")?;
    let values = history
        .iter()
        .map(|t| t.homicides)
        .chain(forecast.iter().flat_map(|f| [f.linear, f.random_forest]));

    let root = BitMapBackend::new(path, (1500, 750)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption("Projeção de Homicídios Dolosos", ("sans-serif", 30))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(100)
        .build_cartesian_2d(year_range(first, last), padded_range(values))?;

    chart
        .configure_mesh()
        .light_line_style(BLACK.mix(0.05))
        .x_label_formatter(&|y| y.to_string())
        .y_label_formatter(&|v| crate::util::format_number(*v, 0))
        .draw()?;

    let [hist_c, lin_c, rf_c] = colors;
    chart
        .draw_series(LineSeries::new(
            history.iter().map(|t| (t.year, t.homicides)),
            hist_c.stroke_width(3),
        ))?
        .label("Histórico")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], hist_c.stroke_width(3)));

    let linear: Vec<(i32, f64)> = forecast.iter().map(|f| (f.year, f.linear)).collect();
    chart
        .draw_series(DashedLineSeries::new(
            linear,
            10,
            6,
            lin_c.stroke_width(3),
        ))?
        .label("Regressão Linear")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], lin_c.stroke_width(3)));

    let forest: Vec<(i32, f64)> = forecast
        .iter()
        .map(|f| (f.year, f.random_forest))
        .collect();
    chart
        .draw_series(DashedLineSeries::new(forest, 10, 6, rf_c.stroke_width(3)))?
        .label("Random Forest")
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 24, y)], rf_c.stroke_width(3)));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .label_font(("sans-serif", 20))
        .draw()?;

    root.present()?;
    Ok(())
}
