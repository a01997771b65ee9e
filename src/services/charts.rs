//! Diagnostic charts rendered from the latest document of a collection.
//!
//! Four independent charts are produced per document. Each chart reads only the
//! fields it plots, so a document missing `hourly` still gets its cloud cover
//! and wind charts. A chart with no data is skipped with a log line, and a
//! chart that fails to draw does not stop the others. Files are named
//! `{collection}_{token}_{kind}.jpg`.

use crate::services::latest::latest_document;
use crate::services::storage::DocumentStore;
use crate::utils::{NO_TIMESTAMP_TOKEN, timestamp_token};
use log::{error, info, warn};
use plotters::prelude::*;
use serde_json::Value;
use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};

/// Angular width of the wind bar, in degrees.
const WIND_BAR_WIDTH_DEG: f64 = 20.0;

#[derive(Debug)]
pub enum ChartError {
    Io(std::io::Error),
    Draw(String),
}

impl fmt::Display for ChartError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChartError::Io(e) => write!(f, "io error: {}", e),
            ChartError::Draw(s) => write!(f, "drawing failed: {}", s),
        }
    }
}

impl Error for ChartError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ChartError::Io(e) => Some(e),
            ChartError::Draw(_) => None,
        }
    }
}

impl From<std::io::Error> for ChartError {
    fn from(value: std::io::Error) -> Self {
        ChartError::Io(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChartKind {
    TemperatureHourly,
    PrecipitationHourly,
    CloudCover,
    Wind,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::TemperatureHourly,
        ChartKind::PrecipitationHourly,
        ChartKind::CloudCover,
        ChartKind::Wind,
    ];

    /// File name suffix; these names are what downstream consumers look for.
    pub fn slug(&self) -> &'static str {
        match self {
            ChartKind::TemperatureHourly => "temperatura_horaria",
            ChartKind::PrecipitationHourly => "precipitacion_horaria",
            ChartKind::CloudCover => "cloud_cover",
            ChartKind::Wind => "viento",
        }
    }
}

/// One hourly entry as far as the charts care.
#[derive(Debug, Clone, PartialEq)]
pub struct HourPoint {
    pub label: String,
    pub temperature: Option<f64>,
    /// Missing totals count as no precipitation.
    pub precipitation: f64,
}

impl HourPoint {
    fn from_entry(entry: &Value) -> Self {
        HourPoint {
            label: entry
                .get("date")
                .and_then(Value::as_str)
                .map(hour_label)
                .unwrap_or_default()
                .to_string(),
            temperature: entry.get("temperature").and_then(Value::as_f64),
            precipitation: entry
                .pointer("/precipitation/total")
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
        }
    }
}

/// The values the four charts plot, read field by field from a stored document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartData {
    pub hours: Vec<HourPoint>,
    pub cloud_cover: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_angle: Option<f64>,
}

impl ChartData {
    pub fn from_document(doc: &Value) -> Self {
        let hours = doc
            .pointer("/hourly/data")
            .and_then(Value::as_array)
            .map(|entries| entries.iter().map(HourPoint::from_entry).collect())
            .unwrap_or_default();
        ChartData {
            hours,
            cloud_cover: doc.pointer("/current/cloud_cover").and_then(Value::as_f64),
            wind_speed: doc.pointer("/current/wind/speed").and_then(Value::as_f64),
            wind_angle: doc.pointer("/current/wind/angle").and_then(Value::as_f64),
        }
    }
}

/// Where and under which name a document's charts are written.
#[derive(Debug, Clone, Copy)]
pub struct ChartTarget<'a> {
    pub output_dir: &'a Path,
    pub collection: &'a str,
    pub token: &'a str,
}

impl ChartTarget<'_> {
    pub fn path_for(&self, kind: ChartKind) -> PathBuf {
        self.output_dir
            .join(format!("{}_{}_{}.jpg", self.collection, self.token, kind.slug()))
    }

    fn prepare(&self, kind: ChartKind) -> Result<PathBuf, ChartError> {
        std::fs::create_dir_all(self.output_dir)?;
        Ok(self.path_for(kind))
    }
}

/// `HH:MM` from an hourly `date`, i.e. characters 11..16 of `YYYY-MM-DDTHH:MM...`.
pub fn hour_label(date: &str) -> &str {
    date.get(11..16).unwrap_or(date)
}

pub fn render(kind: ChartKind, data: &ChartData, target: &ChartTarget) -> Result<Option<PathBuf>, ChartError> {
    match kind {
        ChartKind::TemperatureHourly => plot_temperature_hourly(data, target),
        ChartKind::PrecipitationHourly => plot_precipitation_hourly(data, target),
        ChartKind::CloudCover => plot_cloud_cover(data, target),
        ChartKind::Wind => plot_wind(data, target),
    }
}

/// Render every chart for `data`; returns how many files were written.
pub fn render_all(data: &ChartData, target: &ChartTarget) -> usize {
    let mut written = 0;
    for kind in ChartKind::ALL {
        match render(kind, data, target) {
            Ok(Some(path)) => {
                info!("[{}] Saved {}", target.collection, path.display());
                written += 1;
            }
            Ok(None) => {}
            Err(e) => error!("[{}] {} chart failed: {}", target.collection, kind.slug(), e),
        }
    }
    written
}

/// Render charts for the latest document stored in `collection`.
pub fn generate_for_collection(store: &mut dyn DocumentStore, collection: &str, output_dir: &Path) -> usize {
    info!("Processing collection {}", collection);
    let docs = match store.read_data(collection, None) {
        Ok(docs) => docs,
        Err(e) => {
            error!("[{}] Reading documents failed: {}", collection, e);
            Vec::new()
        }
    };

    let Some(latest) = latest_document(&docs) else {
        info!("[{}] No documents found", collection);
        return 0;
    };

    let token = timestamp_token(latest.get("timestamp_captura").and_then(Value::as_str));
    if token == NO_TIMESTAMP_TOKEN {
        warn!("[{}] Latest document has no parseable capture timestamp", collection);
    }

    let target = ChartTarget {
        output_dir,
        collection,
        token: &token,
    };
    render_all(&ChartData::from_document(latest), &target)
}

pub fn plot_temperature_hourly(data: &ChartData, target: &ChartTarget) -> Result<Option<PathBuf>, ChartError> {
    if data.hours.is_empty() {
        info!("[{}] No hourly data for the temperature chart", target.collection);
        return Ok(None);
    }

    let points: Vec<(usize, f64)> = data
        .hours
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.temperature.map(|t| (i, t)))
        .collect();
    if points.is_empty() {
        info!("[{}] No hourly temperature values", target.collection);
        return Ok(None);
    }

    let labels: Vec<String> = data.hours.iter().map(|h| h.label.clone()).collect();
    let path = target.prepare(ChartKind::TemperatureHourly)?;
    draw_temperature(&path, target.collection, &labels, &points).map_err(|e| ChartError::Draw(e.to_string()))?;
    Ok(Some(path))
}

pub fn plot_precipitation_hourly(data: &ChartData, target: &ChartTarget) -> Result<Option<PathBuf>, ChartError> {
    if data.hours.is_empty() {
        info!("[{}] No hourly data for the precipitation chart", target.collection);
        return Ok(None);
    }

    let labels: Vec<String> = data.hours.iter().map(|h| h.label.clone()).collect();
    let totals: Vec<f64> = data.hours.iter().map(|h| h.precipitation).collect();
    let path = target.prepare(ChartKind::PrecipitationHourly)?;
    draw_precipitation(&path, target.collection, &labels, &totals).map_err(|e| ChartError::Draw(e.to_string()))?;
    Ok(Some(path))
}

pub fn plot_cloud_cover(data: &ChartData, target: &ChartTarget) -> Result<Option<PathBuf>, ChartError> {
    let Some(cloud) = data.cloud_cover else {
        info!("[{}] No cloud_cover value", target.collection);
        return Ok(None);
    };

    let path = target.prepare(ChartKind::CloudCover)?;
    draw_cloud_cover(&path, target.collection, cloud).map_err(|e| ChartError::Draw(e.to_string()))?;
    Ok(Some(path))
}

pub fn plot_wind(data: &ChartData, target: &ChartTarget) -> Result<Option<PathBuf>, ChartError> {
    let (Some(speed), Some(angle)) = (data.wind_speed, data.wind_angle) else {
        info!("[{}] Not enough wind data", target.collection);
        return Ok(None);
    };

    let path = target.prepare(ChartKind::Wind)?;
    draw_wind(&path, target.collection, speed, angle).map_err(|e| ChartError::Draw(e.to_string()))?;
    Ok(Some(path))
}

fn segment_label(labels: &[String], v: &SegmentValue<usize>) -> String {
    match v {
        SegmentValue::CenterOf(i) => labels.get(*i).cloned().unwrap_or_default(),
        SegmentValue::Exact(_) | SegmentValue::Last => String::new(),
    }
}

fn draw_temperature(
    path: &Path,
    collection: &str,
    labels: &[String],
    points: &[(usize, f64)],
) -> Result<(), Box<dyn Error>> {
    let lo = points.iter().map(|(_, t)| *t).fold(f64::INFINITY, f64::min);
    let hi = points.iter().map(|(_, t)| *t).fold(f64::NEG_INFINITY, f64::max);
    let pad = ((hi - lo) * 0.1).max(1.0);

    let root = BitMapBackend::new(path, (1000, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Hourly temperature - {}", collection), ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d((0..labels.len()).into_segmented(), (lo - pad)..(hi + pad))?;
    chart
        .configure_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|v| segment_label(labels, v))
        .x_desc("Hour")
        .y_desc("Temperature (°C)")
        .draw()?;
    chart.draw_series(
        LineSeries::new(
            points.iter().map(|(i, t)| (SegmentValue::CenterOf(*i), *t)),
            &BLUE,
        )
        .point_size(4),
    )?;
    root.present()?;
    Ok(())
}

fn draw_precipitation(path: &Path, collection: &str, labels: &[String], totals: &[f64]) -> Result<(), Box<dyn Error>> {
    let hi = totals.iter().copied().fold(0.0, f64::max).max(1.0) * 1.2;

    let root = BitMapBackend::new(path, (1000, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Hourly precipitation - {}", collection), ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(45)
        .y_label_area_size(55)
        .build_cartesian_2d((0..labels.len()).into_segmented(), 0.0..hi)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(labels.len())
        .x_label_formatter(&|v| segment_label(labels, v))
        .x_desc("Hour")
        .y_desc("Precipitation (mm)")
        .draw()?;
    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.7).filled())
            .margin(6)
            .data(totals.iter().enumerate().map(|(i, v)| (i, *v))),
    )?;
    root.present()?;
    Ok(())
}

fn draw_cloud_cover(path: &Path, collection: &str, cloud: f64) -> Result<(), Box<dyn Error>> {
    let root = BitMapBackend::new(path, (400, 400)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Cloud cover - {}", collection), ("sans-serif", 22).into_font())
        .margin(15)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d((0..1usize).into_segmented(), 0.0..100.0)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_label_formatter(&|v| match v {
            SegmentValue::CenterOf(_) => "Cloud cover".to_string(),
            _ => String::new(),
        })
        .y_desc("%")
        .draw()?;
    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.7).filled())
            .margin(40)
            .data(std::iter::once((0usize, cloud.clamp(0.0, 100.0)))),
    )?;
    root.present()?;
    Ok(())
}

/// Polar angle in degrees (0 = east, counter-clockwise) to plot coordinates.
fn polar_point(radius: f64, angle_deg: f64) -> (f64, f64) {
    let rad = angle_deg.to_radians();
    (radius * rad.cos(), radius * rad.sin())
}

/// Closed outline of the wind bar: origin, then an arc `WIND_BAR_WIDTH_DEG` wide
/// centred on `angle_deg`.
fn wind_bar(speed: f64, angle_deg: f64) -> Vec<(f64, f64)> {
    let half = WIND_BAR_WIDTH_DEG / 2.0;
    let steps = WIND_BAR_WIDTH_DEG as usize;
    let mut points = vec![(0.0, 0.0)];
    points.extend((0..=steps).map(|s| polar_point(speed, angle_deg - half + s as f64)));
    points
}

fn draw_wind(path: &Path, collection: &str, speed: f64, angle_deg: f64) -> Result<(), Box<dyn Error>> {
    let outer = speed.max(1.0);
    let lim = outer * 1.25;

    let root = BitMapBackend::new(path, (500, 500)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Current wind - {}", collection), ("sans-serif", 22).into_font())
        .margin(20)
        .build_cartesian_2d(-lim..lim, -lim..lim)?;

    for ring in 1..=4 {
        let r = outer * f64::from(ring) / 4.0;
        let circle: Vec<(f64, f64)> = (0..=72).map(|s| polar_point(r, f64::from(s) * 5.0)).collect();
        chart.draw_series(std::iter::once(PathElement::new(circle, BLACK.mix(0.25).stroke_width(1))))?;
    }
    chart.draw_series((0..8).map(|s| {
        let deg = f64::from(s) * 45.0;
        PathElement::new(vec![(0.0, 0.0), polar_point(outer, deg)], BLACK.mix(0.15).stroke_width(1))
    }))?;
    chart.draw_series((0..8).map(|s| {
        let deg = f64::from(s) * 45.0;
        Text::new(format!("{}°", s * 45), polar_point(outer * 1.12, deg), ("sans-serif", 14).into_font())
    }))?;
    chart.draw_series(std::iter::once(Polygon::new(wind_bar(speed, angle_deg), BLUE.mix(0.6).filled())))?;

    root.present()?;
    Ok(())
}
