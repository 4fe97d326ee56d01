//! Visualization utilities for MWFVS runs.
//!
//! Generates SVG convergence plots and graph drawings, and exports them as SVG or PNG.

use crate::instance::FvsInstance;
use crate::solution::Candidate;
use std::f64::consts::PI;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::process::Command;
#[cfg(feature = "resvg")]
use resvg::usvg;
#[cfg(feature = "resvg")]
use resvg::render;
#[cfg(feature = "resvg")]
use resvg::FitTo;
#[cfg(feature = "resvg")]
use resvg::tiny_skia::{Pixmap, Transform};
#[cfg(feature = "resvg")]
use resvg::usvg::TreeParsing;

/// Endpoints of the weight color scale (low weight, high weight)
const COLD: (f64, f64, f64) = (59.0, 76.0, 192.0);
const HOT: (f64, f64, f64) = (180.0, 4.0, 38.0);

/// SVG visualization generator
pub struct Visualizer {
    /// Canvas width
    pub width: f64,
    /// Canvas height
    pub height: f64,
    /// Margin
    pub margin: f64,
    /// Node radius
    pub node_radius: f64,
}

impl Default for Visualizer {
    fn default() -> Self {
        Visualizer {
            width: 800.0,
            height: 800.0,
            margin: 60.0,
            node_radius: 12.0,
        }
    }
}

impl Visualizer {
    pub fn new() -> Self {
        Self::default()
    }

    fn header(&self, width: f64, height: f64, style: &str) -> String {
        format!(
            r##"<?xml version="1.0" encoding="UTF-8"?>
<svg xmlns="http://www.w3.org/2000/svg" width="{}" height="{}" viewBox="0 0 {} {}">
<style>
{}
    .label {{ font-family: Arial; font-size: 12px; fill: #2c3e50; }}
    .title {{ font-family: Arial; font-size: 16px; fill: #2c3e50; font-weight: bold; }}
</style>
<rect width="100%" height="100%" fill="#ffffff"/>
"##,
            width, height, width, height, style
        )
    }

    /// Line chart of the best fitness per generation on a log10 y axis.
    ///
    /// Values below 1 are drawn at 1.
    pub fn generate_convergence_svg(&self, fitness_history: &[u64], best_fitness: u64, name: &str) -> String {
        let width = self.width * 1.25;
        let height = self.width * 0.75;
        let margin = self.margin * 1.5;
        let plot_width = width - 2.0 * margin;
        let plot_height = height - 2.0 * margin;

        let mut svg = self.header(
            width,
            height,
            r##"    .line { stroke: #e74c3c; stroke-width: 2; fill: none; }
    .axis { stroke: #2c3e50; stroke-width: 1; }
    .grid { stroke: #bdc3c7; stroke-width: 0.5; stroke-dasharray: 3,3; }
    .note { font-family: Arial; font-size: 14px; fill: #2980b9; }"##,
        );

        svg.push_str(&format!(
            r#"<text x="{:.2}" y="30" class="title" text-anchor="middle">Convergence Plot - Instance: {}</text>
"#,
            width / 2.0,
            escape_xml(name)
        ));

        let logs: Vec<f64> = fitness_history.iter().map(|&f| (f.max(1) as f64).log10()).collect();
        let lo = logs.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = logs.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let (lo, hi) = if logs.is_empty() { (0.0, 1.0) } else { (lo.floor(), hi.ceil()) };
        let hi = if hi <= lo { lo + 1.0 } else { hi };

        let last = fitness_history.len().saturating_sub(1).max(1) as f64;
        let to_x = |i: usize| margin + i as f64 / last * plot_width;
        let to_y = |l: f64| margin + plot_height - (l - lo) / (hi - lo) * plot_height;

        // decade grid lines
        let mut decade = lo as i32;
        while decade as f64 <= hi {
            let y = to_y(decade as f64);
            svg.push_str(&format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" class="grid"/>
<text x="{:.2}" y="{:.2}" class="label" text-anchor="end">1e{}</text>
"#,
                margin, y, width - margin, y, margin - 8.0, y + 4.0, decade
            ));
            decade += 1;
        }

        let x_ticks = 5usize.min(fitness_history.len().max(1));
        for t in 0..=x_ticks {
            let generation = (t as f64 / x_ticks as f64 * last).round() as usize;
            let x = to_x(generation);
            svg.push_str(&format!(
                r#"<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"#,
                x,
                height - margin + 20.0,
                generation
            ));
        }

        svg.push_str(&format!(
            r#"<line x1="{m:.2}" y1="{b:.2}" x2="{r:.2}" y2="{b:.2}" class="axis"/>
<line x1="{m:.2}" y1="{m:.2}" x2="{m:.2}" y2="{b:.2}" class="axis"/>
<text x="{cx:.2}" y="{xl:.2}" class="label" text-anchor="middle">Generation</text>
<text x="20" y="{cy:.2}" class="label" text-anchor="middle" transform="rotate(-90 20 {cy:.2})">Best Fitness</text>
"#,
            m = margin,
            b = height - margin,
            r = width - margin,
            cx = width / 2.0,
            xl = height - margin + 45.0,
            cy = height / 2.0
        ));

        if !logs.is_empty() {
            let points: Vec<String> = logs
                .iter()
                .enumerate()
                .map(|(i, &l)| format!("{:.2},{:.2}", to_x(i), to_y(l)))
                .collect();
            svg.push_str(&format!(
                r#"<polyline points="{}" class="line"/>
"#,
                points.join(" ")
            ));

            let (px, py) = (to_x(logs.len() - 1), to_y((best_fitness.max(1) as f64).log10()));
            svg.push_str(&format!(
                r##"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" stroke="#000000" stroke-width="1"/>
<text x="{:.2}" y="{:.2}" class="note" text-anchor="end">Best Fitness: {}</text>
"##,
                px - 100.0,
                py - 30.0,
                px,
                py,
                px - 100.0,
                py - 34.0,
                best_fitness
            ));
        }

        svg.push_str("</svg>");
        svg
    }

    /// Draw the graph on a circle, colored by weight, with the removed vertices dashed
    pub fn generate_graph_svg(&self, instance: &FvsInstance, removed: &Candidate) -> String {
        let mut svg = self.header(
            self.width,
            self.height,
            r##"    .edge { stroke: #7f8c8d; stroke-width: 1.5; }
    .faded { stroke: #7f8c8d; stroke-width: 1; stroke-opacity: 0.2; }
    .node { stroke: #2c3e50; stroke-width: 2; }
    .removed { stroke: #2c3e50; stroke-width: 2; stroke-dasharray: 4,3; fill-opacity: 0.35; }"##,
        );

        svg.push_str(&format!(
            r#"<text x="{}" y="30" class="title">Graph Visualization - Instance {}</text>
"#,
            self.margin,
            escape_xml(&instance.name)
        ));

        let n = instance.num_vertices();
        let center = (self.width / 2.0, self.height / 2.0 + 10.0);
        let radius = (self.width.min(self.height) / 2.0 - self.margin).max(self.node_radius);
        let positions: Vec<(f64, f64)> = (0..n)
            .map(|v| {
                let angle = 2.0 * PI * v as f64 / n.max(1) as f64 - PI / 2.0;
                (center.0 + radius * angle.cos(), center.1 + radius * angle.sin())
            })
            .collect();

        let mask = instance.removal_mask(removed);

        for &(u, v) in &instance.edges {
            let class = if mask[u] || mask[v] { "faded" } else { "edge" };
            svg.push_str(&format!(
                r#"<line x1="{:.2}" y1="{:.2}" x2="{:.2}" y2="{:.2}" class="{}"/>
"#,
                positions[u].0, positions[u].1, positions[v].0, positions[v].1, class
            ));
        }

        let min_w = instance.weights.iter().copied().min().unwrap_or(0);
        let max_w = instance.weights.iter().copied().max().unwrap_or(0);

        for (v, &(x, y)) in positions.iter().enumerate() {
            let class = if mask[v] { "removed" } else { "node" };
            svg.push_str(&format!(
                r##"<circle cx="{:.2}" cy="{:.2}" r="{}" fill="{}" class="{}"/>
<text x="{:.2}" y="{:.2}" class="label" text-anchor="middle">{}</text>
"##,
                x,
                y,
                self.node_radius,
                weight_color(instance.weight(v), min_w, max_w),
                class,
                x,
                y + 4.0,
                instance.label(v)
            ));
        }

        svg.push_str("</svg>");
        svg
    }

    /// Save SVG to file
    pub fn save_svg<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let mut file = File::create(path)?;
        file.write_all(svg.as_bytes())?;
        Ok(())
    }

    /// Save SVG as PNG using an external converter if available.
    /// Tries `rsvg-convert`, then `magick convert`, then `inkscape`.
    pub fn save_png<P: AsRef<Path>>(&self, svg: &str, path: P) -> std::io::Result<()> {
        let path = path.as_ref();
        #[cfg(feature = "resvg")]
        {
            let opt = usvg::Options::default();
            let rtree = usvg::Tree::from_str(svg, &opt)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("usvg parse error: {}", e)))?;
            let (w, h) = svg_size(svg).unwrap_or((self.width as u32, self.height as u32));
            let mut pixmap = Pixmap::new(w.max(1), h.max(1))
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "Failed to create pixmap"))?;
            render(&rtree, FitTo::Original, Transform::default(), pixmap.as_mut())
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "resvg render failed"))?;
            pixmap
                .save_png(path)
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, format!("save_png failed: {}", e)))?;
            return Ok(());
        }

        let tmp_svg = path.with_extension("svg.tmp");
        std::fs::write(&tmp_svg, svg)?;
        let src_owned = tmp_svg.to_string_lossy().into_owned();
        let out_owned = path.to_string_lossy().into_owned();
        let (src, out): (&str, &str) = (&src_owned, &out_owned);

        let converters: [(&str, Vec<&str>); 3] = [
            ("rsvg-convert", vec!["-o", out, src]),
            ("magick", vec!["convert", src, out]),
            ("inkscape", vec![src, "--export-type=png", "--export-filename", out]),
        ];

        for (program, args) in &converters {
            if let Ok(status) = Command::new(program).args(args).status() {
                if status.success() {
                    let _ = std::fs::remove_file(&tmp_svg);
                    return Ok(());
                }
            }
            log::debug!("{} could not convert {}", program, src);
        }

        let _ = std::fs::remove_file(&tmp_svg);
        Err(std::io::Error::new(
            std::io::ErrorKind::Other,
            "No SVG->PNG converter succeeded (tried rsvg-convert, magick, inkscape)",
        ))
    }
}

/// Width and height attributes of the root element
#[cfg_attr(not(feature = "resvg"), allow(dead_code))]
fn svg_size(svg: &str) -> Option<(u32, u32)> {
    let attr = |name: &str| -> Option<u32> {
        let (_, rest) = svg.split_once(&format!(" {}=\"", name))?;
        let (value, _) = rest.split_once('"')?;
        value.parse::<f64>().ok().map(|v| v as u32)
    };
    Some((attr("width")?, attr("height")?))
}

/// Linear blue-to-red color for a weight within `[min, max]`
pub fn weight_color(weight: u64, min: u64, max: u64) -> String {
    let t = if max > min {
        (weight.saturating_sub(min)) as f64 / (max - min) as f64
    } else {
        0.5
    };
    let mix = |a: f64, b: f64| (a + (b - a) * t).round() as u8;
    format!("#{:02x}{:02x}{:02x}", mix(COLD.0, HOT.0), mix(COLD.1, HOT.1), mix(COLD.2, HOT.2))
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
