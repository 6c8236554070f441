//! Map renderer (plotters).
//!
//! Draws labelled points on an equirectangular world frame and writes a PNG.

use std::path::Path;

use plotters::prelude::*;
use tracing::debug;

use mapbot_core::{
    domain::MapPoint,
    errors::Error,
    render::{MapRenderer, MapStyle},
    Result,
};

const OCEAN: RGBColor = RGBColor(222, 235, 247);
const GRID: RGBColor = RGBColor(170, 190, 210);
const MARKER: RGBColor = RGBColor(220, 30, 30);

/// Spacing of meridians and parallels, in degrees.
const GRATICULE_STEP: i32 = 30;

#[derive(Clone, Debug)]
pub struct PlottersRenderer {
    font_family: String,
}

impl Default for PlottersRenderer {
    fn default() -> Self {
        Self::new("sans-serif")
    }
}

impl PlottersRenderer {
    pub fn new(font_family: impl Into<String>) -> Self {
        Self {
            font_family: font_family.into(),
        }
    }
}

impl MapRenderer for PlottersRenderer {
    fn render(&self, title: &str, points: &[MapPoint], style: MapStyle, out: &Path) -> Result<()> {
        debug!(
            title,
            points = points.len(),
            path = %out.display(),
            "rendering map"
        );

        let root = BitMapBackend::new(out, (style.width, style.height)).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, (self.font_family.as_str(), 24.0))
            .margin(12)
            .x_label_area_size(28)
            .y_label_area_size(36)
            .build_cartesian_2d(-180f64..180f64, -90f64..90f64)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(13)
            .y_labels(7)
            .label_style((self.font_family.as_str(), 11.0))
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(std::iter::once(Rectangle::new(
                [(-180.0, -90.0), (180.0, 90.0)],
                OCEAN.filled(),
            )))
            .map_err(render_err)?;

        chart
            .draw_series(
                graticule(GRATICULE_STEP)
                    .into_iter()
                    .map(|line| PathElement::new(line, GRID.stroke_width(1))),
            )
            .map_err(render_err)?;

        chart
            .draw_series(points.iter().map(|p| {
                Circle::new(
                    (p.coords.longitude, p.coords.latitude),
                    style.marker_radius,
                    MARKER.filled(),
                )
            }))
            .map_err(render_err)?;

        let font = (self.font_family.as_str(), f64::from(style.font_size)).into_font();
        chart
            .draw_series(points.iter().map(|p| {
                Text::new(
                    p.label.clone(),
                    label_anchor(p, style.label_offset),
                    font.clone(),
                )
            }))
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
        Ok(())
    }
}

fn render_err(e: impl std::fmt::Display) -> Error {
    Error::Render(e.to_string())
}

/// Meridians then parallels, each as a two-point polyline in (lon, lat).
fn graticule(step: i32) -> Vec<Vec<(f64, f64)>> {
    let step = step.max(1) as usize;
    let meridians = (-180..=180).step_by(step).map(|lon| {
        let lon = f64::from(lon);
        vec![(lon, -90.0), (lon, 90.0)]
    });
    let parallels = (-90..=90).step_by(step).map(|lat| {
        let lat = f64::from(lat);
        vec![(-180.0, lat), (180.0, lat)]
    });
    meridians.chain(parallels).collect()
}

/// Label position: offset up-right from the marker, kept inside the frame.
fn label_anchor(p: &MapPoint, offset: f64) -> (f64, f64) {
    let lon = (p.coords.longitude + offset).clamp(-180.0, 180.0);
    let lat = (p.coords.latitude + offset).clamp(-90.0, 90.0);
    (lon, lat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapbot_core::domain::Coordinates;

    #[test]
    fn graticule_covers_the_whole_frame() {
        let lines = graticule(30);
        // 13 meridians (-180..=180) + 7 parallels (-90..=90).
        assert_eq!(lines.len(), 20);
        assert_eq!(lines[0], vec![(-180.0, -90.0), (-180.0, 90.0)]);
        assert_eq!(lines[12], vec![(180.0, -90.0), (180.0, 90.0)]);
        assert_eq!(lines[13], vec![(-180.0, -90.0), (180.0, -90.0)]);
        assert_eq!(lines[19], vec![(-180.0, 90.0), (180.0, 90.0)]);
    }

    #[test]
    fn labels_sit_next_to_the_marker() {
        let paris = MapPoint::new("Paris", Coordinates::new(48.85, 2.35));
        let (lon, lat) = label_anchor(&paris, 1.0);
        assert!((lon - 3.35).abs() < 1e-9);
        assert!((lat - 49.85).abs() < 1e-9);
    }

    #[test]
    fn labels_near_the_edge_stay_in_frame() {
        let p = MapPoint::new("Suva", Coordinates::new(-18.14, 179.8));
        assert_eq!(label_anchor(&p, 1.0).0, 180.0);

        let p = MapPoint::new("Pole", Coordinates::new(89.9, 0.0));
        assert_eq!(label_anchor(&p, 0.5).1, 90.0);
    }

    fn assert_png(path: &Path) {
        let bytes = std::fs::read(path).unwrap();
        assert!(bytes.starts_with(b"\x89PNG\r\n\x1a\n"), "not a PNG: {}", path.display());
    }

    #[test]
    fn renders_a_single_city_to_png() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("temp_1_city.png");
        let points = [MapPoint::new("Paris", Coordinates::new(48.85, 2.35))];

        PlottersRenderer::default()
            .render("City: Paris", &points, MapStyle::single((800, 600)), &out)
            .unwrap();

        assert_png(&out);
    }

    #[test]
    fn renders_several_cities_including_frame_edges() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("temp_1_cities.png");
        let points = [
            MapPoint::new("Paris", Coordinates::new(48.85, 2.35)),
            MapPoint::new("Tokyo", Coordinates::new(35.68, 139.69)),
            MapPoint::new("Suva", Coordinates::new(-18.14, 179.8)),
            MapPoint::new("Ushuaia", Coordinates::new(-54.8, -68.3)),
        ];

        PlottersRenderer::default()
            .render("My saved cities", &points, MapStyle::multi((1000, 800)), &out)
            .unwrap();

        assert_png(&out);
    }
}
