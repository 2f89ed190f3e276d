use std::fmt::Write as _;

use crate::{dataset::Species, metrics::ConfusionMatrix};

const CELL: usize = 110;
const MARGIN_LEFT: usize = 140;
const MARGIN_TOP: usize = 70;
const MARGIN_BOTTOM: usize = 60;
const MARGIN_RIGHT: usize = 30;

/// Renders the confusion matrix as a self-contained SVG heatmap.
///
/// Rows are actual classes, columns are predicted classes, cell shading
/// scales with the count. The output is deterministic for a given matrix.
#[must_use]
pub fn render_confusion_matrix(matrix: &ConfusionMatrix) -> String {
    let width = MARGIN_LEFT + 3 * CELL + MARGIN_RIGHT;
    let height = MARGIN_TOP + 3 * CELL + MARGIN_BOTTOM;
    let max = matrix.max_count().max(1);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
    );
    let _ = writeln!(
        svg,
        r##"<rect width="{width}" height="{height}" fill="#ffffff"/>"##
    );
    let _ = writeln!(
        svg,
        r##"<text x="{x}" y="30" text-anchor="middle" font-family="sans-serif" font-size="20" fill="#222222">Confusion Matrix</text>"##,
        x = MARGIN_LEFT + (3 * CELL) / 2
    );

    for (row, actual) in Species::ALL.into_iter().enumerate() {
        for (col, predicted) in Species::ALL.into_iter().enumerate() {
            let count = matrix.get(actual, predicted);
            let x = MARGIN_LEFT + col * CELL;
            let y = MARGIN_TOP + row * CELL;
            let (fill, text_fill) = cell_colors(count, max);
            let _ = writeln!(
                svg,
                r##"<rect x="{x}" y="{y}" width="{CELL}" height="{CELL}" fill="{fill}" stroke="#ffffff" stroke-width="2"/>"##
            );
            let _ = writeln!(
                svg,
                r#"<text x="{cx}" y="{cy}" text-anchor="middle" dominant-baseline="middle" font-family="sans-serif" font-size="22" fill="{text_fill}">{count}</text>"#,
                cx = x + CELL / 2,
                cy = y + CELL / 2
            );
        }
    }

    for (idx, species) in Species::ALL.into_iter().enumerate() {
        // Column label under the grid.
        let _ = writeln!(
            svg,
            r##"<text x="{x}" y="{y}" text-anchor="middle" font-family="sans-serif" font-size="13" fill="#222222">{species}</text>"##,
            x = MARGIN_LEFT + idx * CELL + CELL / 2,
            y = MARGIN_TOP + 3 * CELL + 22
        );
        // Row label left of the grid.
        let _ = writeln!(
            svg,
            r##"<text x="{x}" y="{y}" text-anchor="end" font-family="sans-serif" font-size="13" fill="#222222">{species}</text>"##,
            x = MARGIN_LEFT - 10,
            y = MARGIN_TOP + idx * CELL + CELL / 2 + 5
        );
    }

    let _ = writeln!(
        svg,
        r##"<text x="{x}" y="{y}" text-anchor="middle" font-family="sans-serif" font-size="15" fill="#222222">Predicted Label</text>"##,
        x = MARGIN_LEFT + (3 * CELL) / 2,
        y = MARGIN_TOP + 3 * CELL + 48
    );
    let _ = writeln!(
        svg,
        r##"<text x="18" y="{y}" text-anchor="middle" font-family="sans-serif" font-size="15" fill="#222222" transform="rotate(-90 18 {y})">Actual Label</text>"##,
        y = MARGIN_TOP + (3 * CELL) / 2
    );
    svg.push_str("</svg>\n");
    svg
}

/// Blue shade scaled by `count / max`, with light text on dark cells.
fn cell_colors(count: usize, max: usize) -> (String, &'static str) {
    let intensity = count as f64 / max as f64;
    // Interpolate from near-white (#f7fbff) to a deep blue (#08306b).
    let channel = |from: u8, to: u8| -> u8 {
        let from = f64::from(from);
        let to = f64::from(to);
        (from + (to - from) * intensity).round() as u8
    };
    let r = channel(0xf7, 0x08);
    let g = channel(0xfb, 0x30);
    let b = channel(0xff, 0x6b);
    let text = if intensity > 0.5 { "#ffffff" } else { "#222222" };
    (format!("#{r:02x}{g:02x}{b:02x}"), text)
}
