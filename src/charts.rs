//! Chart rendering on the plotters bitmap backend.
//!
//! Every function here takes numbers that are already computed and only draws
//! them; nothing in this module decides what a value means.

use std::error::Error;
use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::error::{AnalysisError, Result};
use crate::stats::BoxplotStats;

type DrawResult = std::result::Result<(), Box<dyn Error>>;

const FONT: &str = "sans-serif";

pub const RED: RGBColor = RGBColor(220, 20, 20);
pub const GRAY: RGBColor = RGBColor(150, 150, 150);
pub const TEAL: RGBColor = RGBColor(0, 128, 128);
pub const PURPLE: RGBColor = RGBColor(128, 0, 128);
pub const DARK_GREEN: RGBColor = RGBColor(0, 150, 0);
pub const STEEL_BLUE: RGBColor = RGBColor(76, 114, 176);

pub const VIRIDIS: &[(u8, u8, u8)] = &[(68, 1, 84), (59, 82, 139), (33, 145, 140), (94, 201, 98), (253, 231, 37)];
pub const CREST: &[(u8, u8, u8)] = &[(165, 205, 144), (76, 166, 137), (37, 122, 134), (39, 80, 120), (44, 30, 80)];
pub const YL_GN_BU: &[(u8, u8, u8)] = &[(255, 255, 217), (199, 233, 180), (65, 182, 196), (34, 94, 168), (8, 29, 88)];
pub const COOLWARM: &[(u8, u8, u8)] = &[(59, 76, 192), (221, 221, 221), (180, 4, 38)];

/// Linear colour ramp over a value interval
#[derive(Debug, Clone, Copy)]
pub struct ColorScale {
    stops: &'static [(u8, u8, u8)],
    low: f64,
    high: f64,
}

impl ColorScale {
    /// Ramp spanning the smallest to the largest value
    pub fn sequential(stops: &'static [(u8, u8, u8)], values: impl Iterator<Item = f64>) -> Self {
        let (low, high) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
        if low.is_finite() && high.is_finite() {
            ColorScale { stops, low, high }
        } else {
            ColorScale { stops, low: 0.0, high: 1.0 }
        }
    }

    /// Ramp symmetric around zero so that the middle stop marks 0
    pub fn centered(stops: &'static [(u8, u8, u8)], values: impl Iterator<Item = f64>) -> Self {
        let bound = values.fold(0.0f64, |acc, v| acc.max(v.abs()));
        let bound = if bound > 0.0 { bound } else { 1.0 };
        ColorScale { stops, low: -bound, high: bound }
    }

    pub fn color(&self, value: f64) -> RGBColor {
        let t = if self.high > self.low { ((value - self.low) / (self.high - self.low)).clamp(0.0, 1.0) } else { 0.5 };
        ramp(self.stops, t)
    }
}

fn ramp(stops: &[(u8, u8, u8)], t: f64) -> RGBColor {
    if stops.len() == 1 {
        let (r, g, b) = stops[0];
        return RGBColor(r, g, b);
    }
    let pos = t * (stops.len() - 1) as f64;
    let i = (pos.floor() as usize).min(stops.len() - 2);
    let f = pos - i as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
    let (r0, g0, b0) = stops[i];
    let (r1, g1, b1) = stops[i + 1];
    RGBColor(lerp(r0, r1), lerp(g0, g1), lerp(b0, b1))
}

/// `n` colours evenly sampled from a ramp
pub fn palette(stops: &[(u8, u8, u8)], n: usize) -> Vec<RGBColor> {
    match n {
        0 => Vec::new(),
        1 => vec![ramp(stops, 0.5)],
        _ => (0..n).map(|i| ramp(stops, i as f64 / (n - 1) as f64)).collect(),
    }
}

fn value_range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (lo, hi) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !lo.is_finite() {
        return (0.0, 1.0);
    }
    let pad = if hi > lo { (hi - lo) * 0.08 } else { lo.abs().max(1.0) * 0.1 };
    (lo - pad, hi + pad)
}

/// Last index of a discrete axis with `n` slots; integer axis ranges include their end point
fn last_slot(n: usize) -> i32 {
    (n as i32 - 1).max(0)
}

// Axis labels are always centred on their tick, which splits rotated text across the axis.
// Vertical labels are therefore drawn by hand, anchored at their start below the axis.
fn vertical_label_style() -> TextStyle<'static> {
    TextStyle::from((FONT, 14).into_font().transform(FontTransform::Rotate90)).pos(Pos::new(HPos::Left, VPos::Center))
}

fn segment_label(value: &SegmentValue<i32>, names: &[String]) -> String {
    match value {
        SegmentValue::CenterOf(i) if *i >= 0 => names.get(*i as usize).cloned().unwrap_or_default(),
        _ => String::new(),
    }
}

fn render<F>(path: &Path, size: (u32, u32), paint: F) -> Result<()>
where
    F: FnOnce(&DrawingArea<BitMapBackend<'_>, Shift>) -> DrawResult,
{
    let root = BitMapBackend::new(path, size).into_drawing_area();
    let draw = || -> DrawResult {
        root.fill(&WHITE)?;
        paint(&root)?;
        root.present()?;
        Ok(())
    };
    draw().map_err(|e| AnalysisError::Render { path: path.to_path_buf(), message: e.to_string() })
}

// Vertical bars, one per category; a missing value leaves a gap
pub fn bar_chart(
    path: &Path,
    title: &str,
    categories: &[String],
    values: &[Option<f64>],
    y_desc: &str,
    colors: &[RGBColor],
    rotate_labels: bool,
) -> Result<()> {
    render(path, (1200, 600), |root| {
        let (lo, hi) = value_range(values.iter().flatten().copied().chain([0.0]));
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 24))
            .margin(15)
            .x_label_area_size(if rotate_labels { 110 } else { 50 })
            .y_label_area_size(90)
            .build_cartesian_2d((0..last_slot(categories.len())).into_segmented(), lo..hi)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(categories.len())
            .x_label_formatter(&|v| if rotate_labels { String::new() } else { segment_label(v, categories) })
            .x_label_style((FONT, 14))
            .y_desc(y_desc)
            .draw()?;

        if rotate_labels {
            for (i, name) in categories.iter().enumerate() {
                let (x, y) = chart.backend_coord(&(SegmentValue::CenterOf(i as i32), lo));
                root.draw(&Text::new(name.clone(), (x, y + 8), vertical_label_style()))?;
            }
        }

        chart.draw_series(values.iter().enumerate().filter_map(|(i, v)| {
            let v = (*v)?;
            let color = colors.get(i % colors.len().max(1)).copied().unwrap_or(STEEL_BLUE);
            let i = i as i32;
            let mut bar = Rectangle::new(
                [(SegmentValue::Exact(i), 0.0), (SegmentValue::Exact(i + 1), v)],
                color.filled(),
            );
            bar.set_margin(0, 0, 8, 8);
            Some(bar)
        }))?;
        Ok(())
    })
}

/// Annotated grid of coloured cells. `cells[row][col]`, first row on top.
pub fn heatmap(
    path: &Path,
    title: &str,
    columns: &[String],
    rows: &[String],
    cells: &[Vec<Option<f64>>],
    decimals: usize,
    scale: &ColorScale,
) -> Result<()> {
    let ny = rows.len() as i32;
    // y grows upwards, so the first row sits at the highest index
    let flipped: Vec<String> = rows.iter().rev().cloned().collect();

    render(path, (1100, 650), |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 24))
            .margin(15)
            .x_label_area_size(110)
            .y_label_area_size(230)
            .build_cartesian_2d(
                (0..last_slot(columns.len())).into_segmented(),
                (0..last_slot(rows.len())).into_segmented(),
            )?;

        chart
            .configure_mesh()
            .disable_mesh()
            .x_labels(columns.len())
            .y_labels(rows.len())
            .x_label_formatter(&|_| String::new())
            .y_label_formatter(&|v| segment_label(v, &flipped))
            .y_label_style((FONT, 14))
            .draw()?;

        for (i, name) in columns.iter().enumerate() {
            let (x, y) = chart.backend_coord(&(SegmentValue::CenterOf(i as i32), SegmentValue::Exact(0)));
            root.draw(&Text::new(name.clone(), (x, y + 8), vertical_label_style()))?;
        }

        let mut blocks = Vec::new();
        let mut labels = Vec::new();
        for (r, row) in cells.iter().enumerate() {
            let y = ny - 1 - r as i32;
            for (c, cell) in row.iter().enumerate() {
                let x = c as i32;
                let corners = [(SegmentValue::Exact(x), SegmentValue::Exact(y)), (SegmentValue::Exact(x + 1), SegmentValue::Exact(y + 1))];
                match cell {
                    Some(v) => {
                        let fill = scale.color(*v);
                        blocks.push(Rectangle::new(corners, fill.filled()));
                        let ink = if luminance(fill) < 0.5 { WHITE } else { BLACK };
                        let style = (FONT, 14).into_font().color(&ink).pos(Pos::new(HPos::Center, VPos::Center));
                        labels.push(Text::new(
                            format!("{:.*}", decimals, v),
                            (SegmentValue::CenterOf(x), SegmentValue::CenterOf(y)),
                            style,
                        ));
                    }
                    None => blocks.push(Rectangle::new(corners, RGBColor(235, 235, 235).filled())),
                }
            }
        }
        chart.draw_series(blocks)?;
        chart.draw_series(labels)?;
        Ok(())
    })
}

fn luminance(c: RGBColor) -> f64 {
    (0.299 * c.0 as f64 + 0.587 * c.1 as f64 + 0.114 * c.2 as f64) / 255.0
}

/// Several named series sharing an index x axis
pub fn line_chart(path: &Path, title: &str, x_desc: &str, y_desc: &str, series: &[(&str, RGBColor, &[f64])]) -> Result<()> {
    render(path, (1200, 600), |root| {
        let n = series.iter().map(|(_, _, v)| v.len()).max().unwrap_or(0).max(2);
        let (lo, hi) = value_range(series.iter().flat_map(|(_, _, v)| v.iter().copied()));
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 24))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(0f64..(n - 1) as f64, lo..hi)?;

        chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;

        for (name, color, values) in series {
            let color = *color;
            chart
                .draw_series(LineSeries::new(
                    values.iter().enumerate().map(|(i, v)| (i as f64, *v)),
                    color.stroke_width(2),
                ))?
                .label(*name)
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
        Ok(())
    })
}

/// Scatter of the whole population in gray with the flagged points overlaid
pub fn highlighted_scatter(
    path: &Path,
    title: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(f64, f64)],
    flagged: &[bool],
    highlight: (&str, RGBColor),
) -> Result<()> {
    render(path, (1200, 500), |root| {
        let (x_lo, x_hi) = value_range(points.iter().map(|p| p.0));
        let (y_lo, y_hi) = value_range(points.iter().map(|p| p.1));
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 24))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

        chart.configure_mesh().x_desc(x_desc).y_desc(y_desc).draw()?;

        chart
            .draw_series(points.iter().map(|p| Circle::new(*p, 3, GRAY.filled())))?
            .label("Normal")
            .legend(|(x, y)| Circle::new((x + 10, y), 4, GRAY.filled()));

        let (label, color) = highlight;
        chart
            .draw_series(
                points
                    .iter()
                    .zip(flagged)
                    .filter(|(_, f)| **f)
                    .map(|(p, _)| Circle::new(*p, 4, color.filled())),
            )?
            .label(label)
            .legend(move |(x, y)| Circle::new((x + 10, y), 4, color.filled()));

        chart
            .configure_series_labels()
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
        Ok(())
    })
}

// Residuals against predictions, with a reference line at zero
pub fn residual_plot(path: &Path, title: &str, predicted: &[f64], residuals: &[f64]) -> Result<()> {
    render(path, (1000, 500), |root| {
        let (x_lo, x_hi) = value_range(predicted.iter().copied());
        let (y_lo, y_hi) = value_range(residuals.iter().copied().chain([0.0]));
        let mut chart = ChartBuilder::on(root)
            .caption(title, (FONT, 24))
            .margin(15)
            .x_label_area_size(50)
            .y_label_area_size(90)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

        chart
            .configure_mesh()
            .x_desc("Predicted Grid Energy Use")
            .y_desc("Residuals")
            .draw()?;

        chart.draw_series(
            predicted
                .iter()
                .zip(residuals)
                .map(|(p, r)| Circle::new((*p, *r), 3, TEAL.filled())),
        )?;
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(x_lo, 0.0), (x_hi, 0.0)],
            BLACK.stroke_width(1),
        )))?;
        Ok(())
    })
}

pub fn boxplots(path: &Path, title: &str, panels: &[(String, BoxplotStats)]) -> Result<()> {
    render(path, (1500, 600), |root| {
        let body = root.titled(title, (FONT, 26))?;
        let areas = body.split_evenly((1, panels.len().max(1)));

        for (area, (name, stats)) in areas.iter().zip(panels) {
            let (lo, hi) = value_range(
                [stats.lower_whisker, stats.upper_whisker, stats.q1, stats.q3]
                    .into_iter()
                    .chain(stats.outliers.iter().copied()),
            );
            let mut chart = ChartBuilder::on(area)
                .caption(name, (FONT, 15))
                .margin(10)
                .x_label_area_size(10)
                .y_label_area_size(60)
                .build_cartesian_2d(0f64..1f64, lo..hi)?;

            chart.configure_mesh().disable_x_mesh().disable_x_axis().draw()?;

            chart.draw_series(std::iter::once(Rectangle::new(
                [(0.25, stats.q1), (0.75, stats.q3)],
                STEEL_BLUE.mix(0.7).filled(),
            )))?;
            chart.draw_series(std::iter::once(Rectangle::new(
                [(0.25, stats.q1), (0.75, stats.q3)],
                BLACK.stroke_width(1),
            )))?;
            chart.draw_series(vec![
                PathElement::new(vec![(0.25, stats.median), (0.75, stats.median)], BLACK.stroke_width(2)),
                PathElement::new(vec![(0.5, stats.q3), (0.5, stats.upper_whisker)], BLACK.stroke_width(1)),
                PathElement::new(vec![(0.5, stats.q1), (0.5, stats.lower_whisker)], BLACK.stroke_width(1)),
                PathElement::new(vec![(0.4, stats.upper_whisker), (0.6, stats.upper_whisker)], BLACK.stroke_width(1)),
                PathElement::new(vec![(0.4, stats.lower_whisker), (0.6, stats.lower_whisker)], BLACK.stroke_width(1)),
            ])?;
            chart.draw_series(stats.outliers.iter().map(|v| Circle::new((0.5, *v), 3, BLACK.stroke_width(1))))?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(c: RGBColor) -> (u8, u8, u8) {
        (c.0, c.1, c.2)
    }

    #[test]
    fn ramp_hits_end_stops() {
        assert_eq!(rgb(ramp(COOLWARM, 0.0)), (59, 76, 192));
        assert_eq!(rgb(ramp(COOLWARM, 0.5)), (221, 221, 221));
        assert_eq!(rgb(ramp(COOLWARM, 1.0)), (180, 4, 38));
    }

    #[test]
    fn centered_scale_puts_zero_in_the_middle() {
        let scale = ColorScale::centered(COOLWARM, [-0.3, 0.9].into_iter());
        assert_eq!(rgb(scale.color(0.0)), (221, 221, 221));
        assert_eq!(rgb(scale.color(0.9)), (180, 4, 38));
        assert_eq!(rgb(scale.color(-5.0)), (59, 76, 192));
    }

    #[test]
    fn palette_spans_the_ramp() {
        let colors = palette(VIRIDIS, 12);
        assert_eq!(colors.len(), 12);
        assert_eq!(rgb(colors[0]), (68, 1, 84));
        assert_eq!(rgb(colors[11]), (253, 231, 37));
    }

    #[test]
    fn value_range_pads_and_handles_flat_data() {
        let (lo, hi) = value_range([0.0, 10.0].into_iter());
        assert!(lo < 0.0 && hi > 10.0);
        let (lo, hi) = value_range([5.0, 5.0].into_iter());
        assert!(lo < 5.0 && hi > 5.0);
        assert_eq!(value_range(std::iter::empty()), (0.0, 1.0));
    }

    #[test]
    fn vertical_labels_start_at_the_tick() {
        let style = vertical_label_style();
        assert!(matches!(style.pos.h_pos, HPos::Left));
        assert!(matches!(style.pos.v_pos, VPos::Center));
        assert!(matches!(style.font.get_transform(), FontTransform::Rotate90));
    }

    #[test]
    fn segment_labels_only_at_centers() {
        let names = vec!["January".to_string(), "February".to_string()];
        assert_eq!(segment_label(&SegmentValue::CenterOf(1), &names), "February");
        assert_eq!(segment_label(&SegmentValue::Exact(1), &names), "");
        assert_eq!(segment_label(&SegmentValue::CenterOf(7), &names), "");
    }
}
