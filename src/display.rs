//! Terminal rendering of cluster assignments.
//!
//! Each cluster is drawn with its own letter, optionally on a colored
//! background. Hues advance by the golden angle per cluster index so
//! neighboring indices stay visually distinct.

use crossterm::style::{Color, Stylize};
use tracing::warn;

use crate::cluster::ClusterList;
use crate::point::Point;

/// Hue step between consecutive cluster colors, in degrees.
const GOLDEN_ANGLE: f32 = 137.507_77;

/// Maps a hue in degrees to an RGB triple at full saturation and value.
fn hue_to_rgb(hue: f32) -> (u8, u8, u8) {
    let hue = hue.rem_euclid(360.0);
    let c = 255u8;
    let x = ((1.0 - ((hue / 60.0).rem_euclid(2.0) - 1.0).abs()) * 255.0) as u8;
    match (hue / 60.0) as u32 {
        0 => (c, x, 0),
        1 => (x, c, 0),
        2 => (0, c, x),
        3 => (0, x, c),
        4 => (x, 0, c),
        _ => (c, 0, x),
    }
}

/// Renders the cluster list onto a character canvas scaled by `scale`.
///
/// Returns `None` when the display bounds are zero-area or inverted.
/// Clusters are labelled 'A'..'Z'; labels wrap past 26 clusters, and
/// points outside the bounds are dropped from the view.
fn render(
    list: &ClusterList,
    lower: Point,
    upper: Point,
    scale: f32,
    color: bool,
) -> Option<String> {
    let width = upper.x - lower.x;
    let height = upper.y - lower.y;
    if width <= 0.0 || height <= 0.0 || scale <= 0.0 {
        warn!(?lower, ?upper, scale, "invalid display bounds, skipping render");
        return None;
    }

    let view_width = (width * scale).ceil() as usize;
    let view_height = (height * scale).ceil() as usize;
    let mut canvas = vec![b' '; view_width * view_height];
    for (id, cluster) in list.iter().enumerate() {
        let symbol = b'A' + (id % 26) as u8;
        for point in cluster {
            let x = ((point.x - lower.x) * scale) as isize;
            let y = ((point.y - lower.y) * scale) as isize;
            if x < 0 || x >= view_width as isize || y < 0 || y >= view_height as isize {
                continue;
            }
            canvas[y as usize * view_width + x as usize] = symbol;
        }
    }

    let ruler = "--".repeat(view_width);
    let mut out = String::with_capacity(canvas.len() * 2 + ruler.len() * 2);
    out.push_str(&ruler);
    out.push('\n');
    for row in canvas.chunks_exact(view_width) {
        for &cell in row {
            if cell == b' ' {
                out.push_str("  ");
                continue;
            }
            let symbol = cell as char;
            let pair = format!("{symbol}{symbol}");
            if color {
                let hue = (cell - b'A') as f32 * GOLDEN_ANGLE;
                let (r, g, b) = hue_to_rgb(hue);
                out.push_str(&pair.on(Color::Rgb { r, g, b }).to_string());
            } else {
                out.push_str(&pair);
            }
        }
        out.push('\n');
    }
    out.push_str(&ruler);
    out.push('\n');
    Some(out)
}

/// Prints the rendered cluster list to stdout. Degenerate bounds are
/// reported and the render is skipped.
pub fn display_clusters(list: &ClusterList, lower: Point, upper: Point, scale: f32, color: bool) {
    if let Some(rendered) = render(list, lower, upper, scale, color) {
        print!("{rendered}");
    }
}
