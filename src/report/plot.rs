//! SVG plots: scanner similarity Venn diagrams and confusion matrices.

use crate::analysis::{ConfusionMatrix, PairRegions, ScannerSets, TripleRegions};
use anyhow::{anyhow, Context, Result};
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use std::path::{Path, PathBuf};
use tracing::info;

type Panel<'a> = DrawingArea<SVGBackend<'a>, plotters::coord::Shift>;

const TITLE_HEIGHT: i32 = 60;

const ORANGE: RGBColor = RGBColor(255, 165, 0);
const PURPLE: RGBColor = RGBColor(128, 0, 128);
const GRAY: RGBColor = RGBColor(128, 128, 128);
const DARK_GREEN: RGBColor = RGBColor(0, 128, 0);

/// Scanner colors in plot-letter order.
const PALETTE: [RGBColor; 7] = [BLUE, ORANGE, DARK_GREEN, PURPLE, GRAY, RED, CYAN];

fn scanner_color(index: usize) -> RGBColor {
    PALETTE[index % PALETTE.len()]
}

/// C and E are hatched so they stay apart from B and D in grayscale.
fn is_hatched(index: usize) -> bool {
    matches!(index % PALETTE.len(), 2 | 4)
}

const HATCH_SPACING: f64 = 8.0;

/// `/` chords filling a circle, `HATCH_SPACING` apart.
fn hatch_lines(center: (i32, i32), r: i32) -> Vec<[(i32, i32); 2]> {
    let (cx, cy) = (center.0 as f64, center.1 as f64);
    let r = r as f64;
    let s = std::f64::consts::FRAC_1_SQRT_2;
    let mut lines = Vec::new();

    let mut t = -r + HATCH_SPACING / 2.0;
    while t < r {
        let half = (r * r - t * t).sqrt();
        // Offset along (1, 1), chord along (1, -1): screen y grows downwards.
        let (mx, my) = (cx + t * s, cy + t * s);
        lines.push([
            ((mx - half * s).round() as i32, (my + half * s).round() as i32),
            ((mx + half * s).round() as i32, (my - half * s).round() as i32),
        ]);
        t += HATCH_SPACING;
    }
    lines
}

fn draw_circle(area: &Panel<'_>, center: (i32, i32), r: i32, index: usize) -> Result<()> {
    let color = scanner_color(index);
    area.draw(&Circle::new(center, r, color.mix(0.45).filled()))
        .map_err(draw_err)?;
    if is_hatched(index) {
        for line in hatch_lines(center, r) {
            area.draw(&PathElement::new(line.to_vec(), color.stroke_width(1)))
                .map_err(draw_err)?;
        }
    }
    area.draw(&Circle::new(center, r, BLACK.stroke_width(1)))
        .map_err(draw_err)
}

fn draw_err<E: std::fmt::Display>(e: E) -> anyhow::Error {
    anyhow!("Failed to draw plot: {}", e)
}

fn centered(size: f64) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font()).pos(Pos::new(HPos::Center, VPos::Center))
}

fn left_aligned(size: f64) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size).into_font()).pos(Pos::new(HPos::Left, VPos::Center))
}

/// Plot dimensions in pixels.
#[derive(Debug, Clone, Copy)]
pub struct PlotSize {
    pub width: u32,
    pub height: u32,
}

impl From<&crate::config::OutputConfig> for PlotSize {
    fn from(config: &crate::config::OutputConfig) -> Self {
        Self {
            width: config.plot_width,
            height: config.plot_height,
        }
    }
}

/// `<root>/<project_name_version>`, created if missing.
pub fn output_folder(root: &Path, project_name_version: &str) -> Result<PathBuf> {
    let folder = root.join(project_name_version);
    std::fs::create_dir_all(&folder)
        .with_context(|| format!("Failed to create output folder {}", folder.display()))?;
    Ok(folder)
}

/// Number of grid rows for a 2-column layout whose first row holds one
/// fixed panel plus one other cell.
fn grid_rows(remaining_panels: usize) -> usize {
    1 + remaining_panels.div_ceil(2)
}

/// Draw the SBOM similarity plot.
///
/// Layout: 3-way Venn top left, legend top right, then one 2-way Venn per
/// consecutive scanner pair.
pub fn similarity_plot(
    path: &Path,
    title: &str,
    sets: &ScannerSets,
    triple: Option<&TripleRegions>,
    legends: &[String],
    size: PlotSize,
) -> Result<()> {
    let pairs = sets.consecutive_pairs();
    let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let (title_area, body) = root.split_vertically(TITLE_HEIGHT);
    draw_title(&title_area, title)?;

    let panels = body.split_evenly((grid_rows(pairs.len()), 2));

    match triple {
        Some(triple) => draw_venn3(&panels[0], triple, sets)?,
        None => draw_placeholder(&panels[0], "3-way comparison needs three scanners")?,
    }
    draw_legend(&panels[1], sets, legends)?;

    for (pair, panel) in pairs.iter().zip(panels.iter().skip(2)) {
        draw_venn2(panel, pair, sets)?;
    }

    root.present().map_err(draw_err)?;
    info!("Similarity plot written to {}", path.display());
    Ok(())
}

/// Draw one confusion matrix per scanner.
///
/// Panels fill the grid row by row, skipping the top right cell.
pub fn confusion_matrix_plot(
    path: &Path,
    title: &str,
    matrices: &[(String, ConfusionMatrix)],
    size: PlotSize,
) -> Result<()> {
    let root = SVGBackend::new(path, (size.width, size.height)).into_drawing_area();
    root.fill(&WHITE).map_err(draw_err)?;

    let (title_area, body) = root.split_vertically(TITLE_HEIGHT);
    draw_title(&title_area, title)?;

    let rows = grid_rows(matrices.len().saturating_sub(1));
    let panels = body.split_evenly((rows, 2));

    let slots = panels
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 1)
        .map(|(_, p)| p);

    for ((scanner, matrix), panel) in matrices.iter().zip(slots) {
        draw_matrix(panel, scanner, matrix)?;
    }

    root.present().map_err(draw_err)?;
    info!("Confusion matrix plot written to {}", path.display());
    Ok(())
}

fn draw_title(area: &Panel<'_>, title: &str) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        title.to_string(),
        (w as i32 / 2, h as i32 / 2),
        centered(22.0),
    ))
    .map_err(draw_err)
}

fn draw_placeholder(area: &Panel<'_>, message: &str) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    area.draw(&Text::new(
        message.to_string(),
        (w as i32 / 2, h as i32 / 2),
        centered(14.0),
    ))
    .map_err(draw_err)
}

fn draw_panel_title(area: &Panel<'_>, title: &str) -> Result<()> {
    let (w, _) = area.dim_in_pixel();
    area.draw(&Text::new(title.to_string(), (w as i32 / 2, 18), centered(16.0)))
        .map_err(draw_err)
}

/// Plot letter and palette index of a scanner.
fn letter_and_index(sets: &ScannerSets, scanner: &str) -> (String, usize) {
    let index = sets.scanners().iter().position(|s| s == scanner).unwrap_or(0);
    let letter = sets
        .letter_of(scanner)
        .map(|c| c.to_string())
        .unwrap_or_else(|| scanner.to_string());
    (letter, index)
}

fn draw_venn2(area: &Panel<'_>, pair: &PairRegions, sets: &ScannerSets) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);
    let (left_letter, left_index) = letter_and_index(sets, &pair.left);
    let (right_letter, right_index) = letter_and_index(sets, &pair.right);

    draw_panel_title(area, &format!("{} vs. {}", left_letter, right_letter))?;

    let r = (w.min(h) as f64 * 0.28) as i32;
    let (cx, cy) = (w / 2, h / 2 + 10);
    let offset = (r as f64 * 0.6) as i32;

    for (x, index) in [(cx - offset, left_index), (cx + offset, right_index)] {
        draw_circle(area, (x, cy), r, index)?;
    }

    let counts = [
        (pair.only_left, cx - offset - r / 2),
        (pair.both, cx),
        (pair.only_right, cx + offset + r / 2),
    ];
    for (count, x) in counts {
        area.draw(&Text::new(count.to_string(), (x, cy), centered(15.0)))
            .map_err(draw_err)?;
    }

    for (letter, x) in [(left_letter, cx - offset), (right_letter, cx + offset)] {
        area.draw(&Text::new(letter, (x, cy + r + 16), centered(15.0)))
            .map_err(draw_err)?;
    }

    Ok(())
}

fn draw_venn3(area: &Panel<'_>, triple: &TripleRegions, sets: &ScannerSets) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);

    let labelled: Vec<(String, usize)> = triple
        .names
        .iter()
        .map(|name| letter_and_index(sets, name))
        .collect();

    draw_panel_title(
        area,
        &format!(
            "{} vs. {} vs. {}",
            labelled[0].0, labelled[1].0, labelled[2].0
        ),
    )?;

    let r = w.min(h) as f64 * 0.26;
    let d = r * 0.6;
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0 + 8.0);
    // Unit offsets of the three circle centers (equilateral layout).
    let dirs = [(-1.0, -0.577), (1.0, -0.577), (0.0, 1.155)];

    let point = |dx: f64, dy: f64, scale: f64| -> (i32, i32) {
        (
            (cx + dx * d * scale).round() as i32,
            (cy + dy * d * scale).round() as i32,
        )
    };

    for ((dx, dy), (_, index)) in dirs.iter().zip(labelled.iter()) {
        draw_circle(area, point(*dx, *dy, 1.0), r as i32, *index)?;
    }

    // Region label positions: single regions pushed outward, pair regions
    // opposite the excluded circle, the triple overlap in the middle.
    let opposite = |k: usize| point(-dirs[k].0, -dirs[k].1, 0.9);
    let positions = [
        point(dirs[0].0, dirs[0].1, 1.9),
        point(dirs[1].0, dirs[1].1, 1.9),
        opposite(2),
        point(dirs[2].0, dirs[2].1, 1.9),
        opposite(1),
        opposite(0),
        point(0.0, 0.0, 0.0),
    ];

    for (size, pos) in triple.sizes.iter().zip(positions) {
        area.draw(&Text::new(size.to_string(), pos, centered(15.0)))
            .map_err(draw_err)?;
    }

    for ((dx, dy), (letter, _)) in dirs.iter().zip(labelled.iter()) {
        let (x, y) = point(*dx, *dy, 1.0);
        let label_y = if *dy > 0.0 { y + r as i32 + 14 } else { y - r as i32 - 10 };
        area.draw(&Text::new(letter.clone(), (x, label_y), centered(15.0)))
            .map_err(draw_err)?;
    }

    Ok(())
}

fn draw_legend(area: &Panel<'_>, sets: &ScannerSets, legends: &[String]) -> Result<()> {
    let (_, h) = area.dim_in_pixel();
    let entries = sets.letters();
    let line_height = 30;
    let top = (h as i32 - line_height * entries.len() as i32) / 2;

    for (i, (letter, scanner)) in entries.into_iter().enumerate() {
        let y = top + i as i32 * line_height;
        let legend = legends.get(i).map(String::as_str).unwrap_or(scanner);
        area.draw(&Rectangle::new(
            [(30, y - 9), (48, y + 9)],
            scanner_color(i).mix(0.7).filled(),
        ))
        .map_err(draw_err)?;
        if is_hatched(i) {
            for x in [30, 36, 42] {
                area.draw(&PathElement::new(
                    vec![(x, y + 9), (x + 6, y - 9)],
                    BLACK.stroke_width(1),
                ))
                .map_err(draw_err)?;
            }
        }
        area.draw(&Text::new(
            format!("{}: {}", letter, legend),
            (60, y),
            left_aligned(16.0),
        ))
        .map_err(draw_err)?;
    }

    Ok(())
}

/// Cell shade from white (0) to dark blue (max).
fn cell_color(value: usize, max: usize) -> RGBColor {
    let t = if max == 0 { 0.0 } else { value as f64 / max as f64 };
    let channel = |full: f64, dark: f64| (full - (full - dark) * t).round() as u8;
    RGBColor(channel(247.0, 8.0), channel(251.0, 48.0), channel(255.0, 107.0))
}

fn draw_matrix(area: &Panel<'_>, scanner: &str, matrix: &ConfusionMatrix) -> Result<()> {
    let (w, h) = area.dim_in_pixel();
    let (w, h) = (w as i32, h as i32);

    draw_panel_title(area, scanner)?;

    let cell = ((w - 110) / 2).min((h - 100) / 2).max(10);
    let x0 = (w - 2 * cell) / 2 + 20;
    let y0 = 40;

    let grid = matrix.as_grid();
    let max = grid.iter().flatten().copied().max().unwrap_or(0);

    for (row, values) in grid.iter().enumerate() {
        for (col, value) in values.iter().enumerate() {
            let (x, y) = (x0 + col as i32 * cell, y0 + row as i32 * cell);
            area.draw(&Rectangle::new(
                [(x, y), (x + cell, y + cell)],
                cell_color(*value, max).filled(),
            ))
            .map_err(draw_err)?;
            area.draw(&Rectangle::new(
                [(x, y), (x + cell, y + cell)],
                BLACK.stroke_width(1),
            ))
            .map_err(draw_err)?;

            let dark = max > 0 && *value * 2 > max;
            let style = if dark {
                centered(18.0).color(&WHITE)
            } else {
                centered(18.0).color(&BLACK)
            };
            area.draw(&Text::new(
                value.to_string(),
                (x + cell / 2, y + cell / 2),
                style,
            ))
            .map_err(draw_err)?;
        }
    }

    for (i, label) in ["False", "True"].iter().enumerate() {
        let offset = i as i32 * cell + cell / 2;
        area.draw(&Text::new(
            label.to_string(),
            (x0 + offset, y0 + 2 * cell + 14),
            centered(13.0),
        ))
        .map_err(draw_err)?;
        area.draw(&Text::new(
            label.to_string(),
            (x0 - 24, y0 + offset),
            centered(13.0),
        ))
        .map_err(draw_err)?;
    }

    area.draw(&Text::new(
        "Predicted label".to_string(),
        (x0 + cell, y0 + 2 * cell + 34),
        centered(13.0),
    ))
    .map_err(draw_err)?;
    area.draw(&Text::new(
        "True label".to_string(),
        (x0 - 24, y0 - 14),
        centered(13.0),
    ))
    .map_err(draw_err)?;

    Ok(())
}
