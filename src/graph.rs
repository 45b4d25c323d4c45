use crate::charts::{ChartData, ChartKind, DependantSeries, FlowDiagram, GapRow, Series};
use crate::config::DashboardConfig;
use crate::error::{DashboardError, Result};
use crate::geo::GeoRow;
use crate::table::format_number;
use crate::world::{self, ring_area};
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::collections::HashMap;
use std::error::Error;

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type DrawResult = std::result::Result<(), Box<dyn Error>>;

const SERIES_COLORS: [RGBColor; 10] = [
    RGBColor(65, 105, 225),
    RGBColor(34, 139, 34),
    RGBColor(255, 140, 0),
    RGBColor(220, 20, 60),
    RGBColor(139, 92, 246),
    RGBColor(236, 72, 153),
    RGBColor(20, 184, 166),
    RGBColor(132, 204, 22),
    RGBColor(100, 116, 139),
    RGBColor(245, 158, 11),
];
const BAR_COLOR: RGBColor = RGBColor(59, 130, 246);
const LIGHT_GREY: RGBColor = RGBColor(200, 200, 200);
const STUDY_COLOR: RGBColor = RGBColor(0, 128, 0);
const DEPENDANT_COLOR: RGBColor = RGBColor(255, 165, 0);
const VIRIDIS: [(f64, f64, f64); 5] = [
    (68.0, 1.0, 84.0),
    (59.0, 82.0, 139.0),
    (33.0, 145.0, 140.0),
    (94.0, 201.0, 98.0),
    (253.0, 231.0, 37.0),
];

/// Configuration options for chart rendering
///
/// Holds the caption, axis descriptions and pixel size of one chart.
#[derive(Clone, Debug)]
pub struct GraphOptions {
    /// Title displayed at the top of the graph
    pub title: String,

    /// Label for the X-axis
    pub x_label: String,

    /// Label for the Y-axis
    pub y_label: String,

    /// Width of the graph in pixels
    pub width: u32,

    /// Height of the graph in pixels
    pub height: u32,
}

impl Default for GraphOptions {
    fn default() -> Self {
        Self {
            title: "Graph".to_string(),
            x_label: "X Axis".to_string(),
            y_label: "Y Axis".to_string(),
            width: 1000,
            height: 550,
        }
    }
}

impl GraphOptions {
    /// Caption, axis labels and size for a chart kind
    pub fn for_chart(kind: ChartKind, config: &DashboardConfig) -> Self {
        let (x_label, y_label) = match kind {
            ChartKind::VisaTrends => ("Year", "Count"),
            ChartKind::StatusFlow => ("", ""),
            ChartKind::TopNationalities => ("Nationality", "Counts"),
            ChartKind::GeoSpread => ("", ""),
            ChartKind::StudyDependantGap => (config.cohort_label.as_str(), "Nationality"),
            ChartKind::DependantTrends => ("Year", "Counts"),
        };
        Self {
            title: kind.title(config),
            x_label: x_label.to_string(),
            y_label: y_label.to_string(),
            width: config.chart_width,
            height: config.chart_height,
        }
    }

    /// Grows the height so that one-row-per-category charts stay readable
    pub fn fit_to(mut self, data: &ChartData) -> Self {
        let rows = match data {
            ChartData::StudyDependantGap { rows, .. } => rows.len(),
            ChartData::StatusFlow(flow) => flow.sources.max(flow.nodes.len().saturating_sub(flow.sources)),
            _ => 0,
        };
        self.height = self.height.max(rows as u32 * 28 + 140);
        self
    }
}

/// Renders a chart dataset to an SVG document
///
/// # Arguments
/// * `data` - Dataset of any of the six chart kinds
/// * `options` - Caption, axis labels and pixel size
///
/// # Returns
/// A standalone `<svg>` document
///
/// # Errors
/// * `Render` if plotters fails to lay out or draw the chart
///
/// # Examples
/// ```
/// use visa_dashboard::charts::ChartData;
/// use visa_dashboard::graph::{GraphOptions, create_graph};
///
/// let data = ChartData::TopNationalities(vec![("Chinese".to_string(), 100.0)]);
/// let svg = create_graph(&data, &GraphOptions::default()).unwrap();
/// assert!(svg.starts_with("<svg"));
/// ```
pub fn create_graph(data: &ChartData, options: &GraphOptions) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (options.width, options.height))
            .into_drawing_area();
        draw(&root, data, options).map_err(|e| DashboardError::Render(e.to_string()))?;
        root.present()
            .map_err(|e| DashboardError::Render(e.to_string()))?;
    }
    Ok(svg)
}

fn draw(root: &Area<'_>, data: &ChartData, options: &GraphOptions) -> DrawResult {
    root.fill(&WHITE)?;
    match data {
        ChartData::VisaTrends { years, series } => create_area_graph(root, years, series, options),
        ChartData::StatusFlow(flow) => create_flow_graph(root, flow, options),
        ChartData::TopNationalities(bars) => create_bar_graph(root, bars, options),
        ChartData::GeoSpread(rows) => create_geo_graph(root, rows, options),
        ChartData::StudyDependantGap {
            study_label,
            dependant_label,
            rows,
        } => create_dumbbell_graph(root, rows, (study_label, dependant_label), options),
        ChartData::DependantTrends { years, series } => {
            create_line_graph(root, years, series, options)
        }
    }
}

fn upper_bound(max: f64) -> f64 {
    if max > 0.0 { max * 1.1 } else { 1.0 }
}

/// Last category index of a segmented axis over `n` categories
fn last_index(n: usize) -> usize {
    n.saturating_sub(1)
}

fn category_label(value: &SegmentValue<usize>, labels: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn series_color(i: usize) -> RGBColor {
    SERIES_COLORS[i % SERIES_COLORS.len()]
}

/// Stacked area graph of one series per visa type
///
/// Each layer is drawn as a polygon between the running total below it and
/// the running total including it. Negative values are clamped to 0.
fn create_area_graph(
    root: &Area<'_>,
    years: &[String],
    series: &[Series],
    options: &GraphOptions,
) -> DrawResult {
    let n = years.len();
    let mut base = vec![0.0f64; n];
    let mut layers: Vec<Vec<(f64, f64)>> = Vec::with_capacity(series.len());
    for s in series {
        let layer = (0..n)
            .map(|i| {
                let lower = base[i];
                let upper = lower + s.values.get(i).copied().unwrap_or(0.0).max(0.0);
                base[i] = upper;
                (lower, upper)
            })
            .collect();
        layers.push(layer);
    }
    let y_max = upper_bound(base.iter().copied().fold(0.0, f64::max));

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d((0..last_index(n)).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| category_label(v, years))
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    for (i, (s, layer)) in series.iter().zip(&layers).enumerate() {
        let color = series_color(i);
        let mut outline: Vec<(SegmentValue<usize>, f64)> = layer
            .iter()
            .enumerate()
            .map(|(x, (_, upper))| (SegmentValue::CenterOf(x), *upper))
            .collect();
        let top = outline.clone();
        outline.extend(
            layer
                .iter()
                .enumerate()
                .rev()
                .map(|(x, (lower, _))| (SegmentValue::CenterOf(x), *lower)),
        );

        chart
            .draw_series(std::iter::once(Polygon::new(outline, color.mix(0.55).filled())))?
            .label(s.name.as_str())
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], color.filled()));
        chart.draw_series(LineSeries::new(top, color.stroke_width(2)))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

/// Two-column flow diagram
///
/// Left column holds the status nodes, right column the visa nodes. Node
/// heights and band widths share one scale so that every band keeps its
/// width from source to target.
fn create_flow_graph(root: &Area<'_>, flow: &FlowDiagram, options: &GraphOptions) -> DrawResult {
    const MARGIN: i32 = 20;
    const NODE_WIDTH: i32 = 18;
    const PADDING: f64 = 14.0;
    const STEPS: usize = 24;

    let area = root.titled(&options.title, ("sans-serif", 24))?;
    let (width, height) = area.dim_in_pixel();
    let (width, height) = (width as i32, height as i32);

    let mut node_totals = vec![0.0f64; flow.nodes.len()];
    for link in &flow.links {
        node_totals[link.source] += link.value;
        node_totals[link.target] += link.value;
    }
    let total: f64 = flow.links.iter().map(|l| l.value).sum();
    if total <= 0.0 {
        return Ok(());
    }

    let targets = flow.nodes.len() - flow.sources;
    let usable = |k: usize| (height - 2 * MARGIN) as f64 - PADDING * k.saturating_sub(1) as f64;
    let scale = (usable(flow.sources).min(usable(targets)) / total).max(0.0);

    // top y of every node
    let mut node_top = vec![0.0f64; flow.nodes.len()];
    for (range, count) in [(0..flow.sources, flow.sources), (flow.sources..flow.nodes.len(), targets)] {
        let used: f64 = range.clone().map(|i| node_totals[i] * scale).sum::<f64>()
            + PADDING * count.saturating_sub(1) as f64;
        let mut y = MARGIN as f64 + ((height - 2 * MARGIN) as f64 - used).max(0.0) / 2.0;
        for i in range {
            node_top[i] = y;
            y += node_totals[i] * scale + PADDING;
        }
    }

    let left_x = MARGIN;
    let right_x = width - MARGIN - NODE_WIDTH;
    let node_color = |i: usize| {
        if i < flow.sources {
            series_color(i)
        } else {
            series_color(i - flow.sources + 3)
        }
    };

    let mut out_offset = vec![0.0f64; flow.nodes.len()];
    let mut in_offset = vec![0.0f64; flow.nodes.len()];
    for link in &flow.links {
        let thickness = link.value * scale;
        let y0 = node_top[link.source] + out_offset[link.source];
        let y1 = node_top[link.target] + in_offset[link.target];
        out_offset[link.source] += thickness;
        in_offset[link.target] += thickness;

        let (x0, x1) = ((left_x + NODE_WIDTH) as f64, right_x as f64);
        let curve: Vec<(f64, f64)> = (0..=STEPS)
            .map(|step| {
                let t = step as f64 / STEPS as f64;
                let s = t * t * (3.0 - 2.0 * t);
                (x0 + (x1 - x0) * t, y0 + (y1 - y0) * s)
            })
            .collect();
        let mut band: Vec<(i32, i32)> = curve
            .iter()
            .map(|(x, y)| (x.round() as i32, y.round() as i32))
            .collect();
        band.extend(
            curve
                .iter()
                .rev()
                .map(|(x, y)| (x.round() as i32, (y + thickness).round() as i32)),
        );
        area.draw(&Polygon::new(band, node_color(link.source).mix(0.35).filled()))?;
    }

    let label_font = ("sans-serif", 14).into_font();
    for (i, name) in flow.nodes.iter().enumerate() {
        let top = node_top[i].round() as i32;
        let bottom = (node_top[i] + node_totals[i] * scale).round() as i32;
        let (x, label_x, anchor) = if i < flow.sources {
            (left_x, left_x + NODE_WIDTH + 6, HPos::Left)
        } else {
            (right_x, right_x - 6, HPos::Right)
        };
        area.draw(&Rectangle::new(
            [(x, top), (x + NODE_WIDTH, bottom.max(top + 1))],
            node_color(i).filled(),
        ))?;
        let style = TextStyle::from(label_font.clone()).pos(Pos::new(anchor, VPos::Center));
        area.draw(&Text::new(
            format!("{} ({})", name, format_number(node_totals[i])),
            (label_x, (top + bottom) / 2),
            style,
        ))?;
    }

    Ok(())
}

/// Bar graph of the largest nationalities, in ranking order
fn create_bar_graph(root: &Area<'_>, bars: &[(String, f64)], options: &GraphOptions) -> DrawResult {
    let n = bars.len();
    let labels: Vec<String> = bars.iter().map(|(name, _)| name.clone()).collect();
    let y_max = upper_bound(bars.iter().map(|(_, v)| *v).fold(0.0, f64::max));

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d((0..last_index(n)).into_segmented(), 0f64..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| category_label(v, &labels))
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        let mut bar = Rectangle::new(
            [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), *value)],
            BAR_COLOR.filled(),
        );
        bar.set_margin(0, 0, 8, 8);
        bar
    }))?;

    chart.draw_series(bars.iter().enumerate().map(|(i, (_, value))| {
        Text::new(
            format_number(*value),
            (SegmentValue::CenterOf(i), *value),
            ("sans-serif", 12).into_font(),
        )
    }))?;

    Ok(())
}

/// Linear interpolation over the Viridis anchor colours, `t` in [0, 1]
fn viridis(t: f64) -> RGBColor {
    let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
    let scaled = t * (VIRIDIS.len() - 1) as f64;
    let lo = (scaled.floor() as usize).min(VIRIDIS.len() - 2);
    let frac = scaled - lo as f64;
    let (a, b) = (VIRIDIS[lo], VIRIDIS[lo + 1]);
    let mix = |x: f64, y: f64| (x + (y - x) * frac).round() as u8;
    RGBColor(mix(a.0, b.0), mix(a.1, b.1), mix(a.2, b.2))
}

/// Choropleth of counts per country
///
/// Every country outline is drawn; countries with data are filled on the
/// Viridis ramp between the smallest and largest count, the rest in grey.
/// Countries too small to have an outline get a marker at their centroid.
/// A colour bar on the right shows the scale.
fn create_geo_graph(root: &Area<'_>, rows: &[GeoRow], options: &GraphOptions) -> DrawResult {
    let shapes = world::world()?;

    let mut counts: HashMap<&str, f64> = HashMap::new();
    for r in rows {
        *counts.entry(r.iso_alpha.as_str()).or_insert(0.0) += r.counts;
    }
    let max = counts.values().copied().fold(f64::NEG_INFINITY, f64::max);
    let min = counts.values().copied().fold(f64::INFINITY, f64::min);
    let scale = |v: f64| if max > min { (v - min) / (max - min) } else { 1.0 };

    let (map_area, bar_area) = root.split_horizontally((options.width as i32 - 110).max(0));

    let mut chart = ChartBuilder::on(&map_area)
        .caption(&options.title, ("sans-serif", 24).into_font())
        .margin(15)
        .build_cartesian_2d(-180f64..180f64, -60f64..85f64)?;

    // largest first so enclaves land on top; Antarctica is off the grid
    let mut rings: Vec<(&[(f64, f64)], RGBColor)> = shapes
        .iter()
        .flat_map(|shape| {
            let fill = counts
                .get(shape.iso_alpha.as_str())
                .map_or(LIGHT_GREY, |&v| viridis(scale(v)));
            shape.rings.iter().map(move |ring| (ring.as_slice(), fill))
        })
        .filter(|(ring, _)| ring.iter().any(|&(_, lat)| lat > -60.0))
        .collect();
    rings.sort_by(|a, b| ring_area(b.0).total_cmp(&ring_area(a.0)));

    chart.draw_series(
        rings
            .iter()
            .map(|(ring, fill)| Polygon::new(ring.to_vec(), fill.filled())),
    )?;
    chart.draw_series(rings.iter().map(|(ring, _)| {
        let mut outline = ring.to_vec();
        outline.extend(ring.first().copied());
        PathElement::new(outline, WHITE.stroke_width(1))
    }))?;

    let without_outline = rows.iter().filter(|r| world::shape_for(&r.iso_alpha).is_none());
    chart.draw_series(without_outline.map(|r| {
        let fill = viridis(scale(counts.get(r.iso_alpha.as_str()).copied().unwrap_or(r.counts)));
        Circle::new((r.lon, r.lat), 5, fill.filled())
    }))?;
    chart.draw_series(rows.iter().map(|r| {
        Text::new(
            format!("{} {}", r.iso_alpha, format_number(r.counts)),
            (r.lon, r.lat),
            ("sans-serif", 11).into_font(),
        )
    }))?;

    // colour bar
    let (_, bar_height) = bar_area.dim_in_pixel();
    let (top, bottom) = (70i32, bar_height as i32 - 70);
    let slices = 40;
    let slice = ((bottom - top) / slices).max(1);
    for k in 0..slices {
        let y = bottom - (k + 1) * slice;
        bar_area.draw(&Rectangle::new(
            [(20, y), (45, y + slice)],
            viridis(k as f64 / (slices - 1) as f64).filled(),
        ))?;
    }
    let font = ("sans-serif", 12).into_font();
    bar_area.draw(&Text::new("Counts", (15, top - 25), font.clone()))?;
    let (high, low) = if counts.is_empty() { (0.0, 0.0) } else { (max, min) };
    bar_area.draw(&Text::new(format_number(high), (50, bottom - slices * slice), font.clone()))?;
    bar_area.draw(&Text::new(format_number(low), (50, bottom - 12), font))?;

    Ok(())
}

/// Dumbbell plot: one row per nationality, a segment between the two values
///
/// Rows are drawn top to bottom in the given order. A row with one value
/// gets only that marker.
fn create_dumbbell_graph(
    root: &Area<'_>,
    rows: &[GapRow],
    (study_label, dependant_label): (&str, &str),
    options: &GraphOptions,
) -> DrawResult {
    let n = rows.len();
    // row i is drawn at segment n-1-i so the first row is on top
    let labels: Vec<String> = rows.iter().rev().map(|r| r.nationality.clone()).collect();
    let y_of = |i: usize| SegmentValue::CenterOf(n - 1 - i);

    let values = || rows.iter().flat_map(|r| r.study.into_iter().chain(r.dependant));
    let x_max = upper_bound(values().fold(0.0, f64::max));
    let x_min = values().fold(0.0, f64::min);

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(150)
        .build_cartesian_2d(x_min..x_max, (0..last_index(n)).into_segmented())?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(n)
        .y_label_formatter(&|v| category_label(v, &labels))
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    chart.draw_series(rows.iter().enumerate().filter_map(|(i, r)| {
        let (study, dependant) = r.study.zip(r.dependant)?;
        Some(PathElement::new(
            vec![(study, y_of(i)), (dependant, y_of(i))],
            LIGHT_GREY.stroke_width(2),
        ))
    }))?;

    chart
        .draw_series(rows.iter().enumerate().filter_map(|(i, r)| {
            r.study.map(|x| Circle::new((x, y_of(i)), 6, STUDY_COLOR.filled()))
        }))?
        .label(study_label)
        .legend(|(x, y)| Circle::new((x + 6, y), 5, STUDY_COLOR.filled()));

    chart
        .draw_series(rows.iter().enumerate().filter_map(|(i, r)| {
            r.dependant.map(|x| Circle::new((x, y_of(i)), 6, DEPENDANT_COLOR.filled()))
        }))?
        .label(dependant_label)
        .legend(|(x, y)| Circle::new((x + 6, y), 5, DEPENDANT_COLOR.filled()));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::LowerRight)
        .background_style(WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}

/// Line graph with markers, one line per dependant category
fn create_line_graph(
    root: &Area<'_>,
    years: &[String],
    series: &[DependantSeries],
    options: &GraphOptions,
) -> DrawResult {
    let n = years.len();
    let y_max = upper_bound(
        series
            .iter()
            .flat_map(|s| s.points.iter().map(|(_, c)| *c as f64))
            .fold(0.0, f64::max),
    );
    let y_min = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(_, c)| *c as f64))
        .fold(0.0, f64::min);

    let mut chart = ChartBuilder::on(root)
        .caption(&options.title, ("sans-serif", 24).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(70)
        .build_cartesian_2d((0..last_index(n)).into_segmented(), y_min..y_max)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|v| category_label(v, years))
        .x_desc(&options.x_label)
        .y_desc(&options.y_label)
        .draw()?;

    for (i, s) in series.iter().enumerate() {
        let color = series_color(i);
        let points: Vec<(SegmentValue<usize>, f64)> = s
            .points
            .iter()
            .filter_map(|(year, count)| {
                let x = years.iter().position(|y| y == year)?;
                Some((SegmentValue::CenterOf(x), *count as f64))
            })
            .collect();

        chart
            .draw_series(LineSeries::new(points.clone(), color.stroke_width(2)))?
            .label(s.name.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], color.stroke_width(2)));
        chart.draw_series(points.into_iter().map(|p| Circle::new(p, 4, color.filled())))?;
    }

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperLeft)
        .background_style(WHITE.mix(0.85))
        .border_style(&BLACK)
        .draw()?;

    Ok(())
}
