//! Rasterising a series into a PNG line chart.
//!
//! Four lines (confirmed, active, deaths, recovered) are drawn against the
//! reporting date on a white canvas titled "Statistics". The x axis carries
//! date labels at fixed indices plus the last point, the y axis carries case
//! counts at each grid line, and a labelled legend sits in the top-left
//! corner of the plot area. Text uses the 8x8 glyphs from `font8x8`.

use std::io::Cursor;

use epistat_core::series::TimeSeriesPoint;
use font8x8::{BASIC_FONTS, UnicodeFonts};
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::Result;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);
const AXIS: Rgb<u8> = Rgb([0, 0, 0]);
const GRID: Rgb<u8> = Rgb([225, 225, 225]);

/// Line colours, in legend order.
pub const CONFIRMED: Rgb<u8> = Rgb([31, 119, 180]);
pub const ACTIVE: Rgb<u8> = Rgb([255, 127, 14]);
pub const DEATHS: Rgb<u8> = Rgb([44, 160, 44]);
pub const RECOVERED: Rgb<u8> = Rgb([214, 39, 40]);

const TITLE: &str = "Statistics";
const X_LABEL: &str = "Date";
const Y_LABEL: &str = "Cases";

/// Indices that get an x-axis tick, besides the last point.
const X_TICKS: [usize; 3] = [0, 200, 400];
const GRID_LINES: u32 = 4;

const MARGIN_LEFT: u32 = 72;
const MARGIN_RIGHT: u32 = 16;
const MARGIN_TOP: u32 = 32;
const MARGIN_BOTTOM: u32 = 44;

/// Glyph cell edge in pixels at scale 1.
const GLYPH: i64 = 8;
const SWATCH: i64 = 10;
const LEGEND_ROW: i64 = SWATCH + 4;

/// Canvas dimensions.
#[derive(Debug, Clone, Copy)]
pub struct ChartOptions {
  pub width:  u32,
  pub height: u32,
}

impl Default for ChartOptions {
  fn default() -> Self { Self { width: 800, height: 500 } }
}

/// Plot area in pixel coordinates plus the value range mapped onto it.
struct Frame {
  left:   i64,
  right:  i64,
  top:    i64,
  bottom: i64,
  min_y:  i64,
  max_y:  i64,
  len:    usize,
}

impl Frame {
  fn x(&self, index: usize) -> i64 {
    if self.len <= 1 {
      return self.left;
    }
    let span = (self.right - self.left) as f64;
    self.left + (span * index as f64 / (self.len - 1) as f64).round() as i64
  }

  fn y(&self, value: i64) -> i64 {
    let range = (self.max_y - self.min_y).max(1) as f64;
    let span = (self.bottom - self.top) as f64;
    let offset = (value.clamp(self.min_y, self.max_y) - self.min_y) as f64;
    self.bottom - (span * offset / range).round() as i64
  }
}

/// Render `series` to PNG bytes.
///
/// Points missing a value are left out of that value's line only.
pub fn render_png(series: &[TimeSeriesPoint], options: &ChartOptions) -> Result<Vec<u8>> {
  let width = options.width.max(MARGIN_LEFT + MARGIN_RIGHT + 2);
  let height = options.height.max(MARGIN_TOP + MARGIN_BOTTOM + 2);
  let mut img = RgbImage::from_pixel(width, height, BACKGROUND);

  let lines: [(&str, Rgb<u8>, fn(&TimeSeriesPoint) -> Option<i64>); 4] = [
    ("Confirmed", CONFIRMED, |p: &TimeSeriesPoint| p.confirmed),
    ("Active", ACTIVE, |p: &TimeSeriesPoint| p.active),
    ("Deaths", DEATHS, |p: &TimeSeriesPoint| p.deaths),
    ("Recovered", RECOVERED, |p: &TimeSeriesPoint| p.recovered),
  ];

  let values = series
    .iter()
    .flat_map(|p| lines.iter().filter_map(move |(_, _, get)| get(p)));
  let (min_y, max_y) = values.fold((0_i64, 1_i64), |(lo, hi), v| (lo.min(v), hi.max(v)));

  let frame = Frame {
    left:   MARGIN_LEFT as i64,
    right:  (width - MARGIN_RIGHT - 1) as i64,
    top:    MARGIN_TOP as i64,
    bottom: (height - MARGIN_BOTTOM - 1) as i64,
    min_y,
    max_y,
    len:    series.len(),
  };

  draw_grid(&mut img, &frame);
  draw_axes(&mut img, &frame, series);
  draw_titles(&mut img, &frame);

  for (_, colour, get) in lines {
    let mut prev: Option<(i64, i64)> = None;
    for (i, point) in series.iter().enumerate() {
      let Some(value) = get(point) else { continue };
      let here = (frame.x(i), frame.y(value));
      match prev {
        Some(from) => draw_line(&mut img, from, here, colour),
        None => plot(&mut img, here.0, here.1, colour),
      }
      prev = Some(here);
    }
  }

  let legend = lines.map(|(name, colour, _)| (name, colour));
  draw_legend(&mut img, &frame, &legend);

  let mut buf = Cursor::new(Vec::new());
  DynamicImage::ImageRgb8(img).write_to(&mut buf, ImageFormat::Png)?;
  Ok(buf.into_inner())
}

fn draw_grid(img: &mut RgbImage, frame: &Frame) {
  let range = frame.max_y - frame.min_y;
  for step in 0..=GRID_LINES {
    let y = frame.bottom - (frame.bottom - frame.top) * step as i64 / GRID_LINES as i64;
    if step > 0 {
      draw_line(img, (frame.left, y), (frame.right, y), GRID);
    }

    let label = compact(frame.min_y + range * step as i64 / GRID_LINES as i64);
    let x = frame.left - 6 - text_width(&label, 1);
    draw_text(img, (x, y - GLYPH / 2), &label, 1, AXIS);
  }
}

fn draw_axes(img: &mut RgbImage, frame: &Frame, series: &[TimeSeriesPoint]) {
  draw_line(img, (frame.left, frame.top), (frame.left, frame.bottom), AXIS);
  draw_line(img, (frame.left, frame.bottom), (frame.right, frame.bottom), AXIS);

  if frame.len == 0 {
    return;
  }
  let last = frame.len - 1;
  let ticks = X_TICKS.iter().copied().filter(|&i| i < last).chain([last]);
  let mut taken_until = i64::MIN;
  for i in ticks {
    let x = frame.x(i);
    draw_line(img, (x, frame.bottom), (x, frame.bottom + 5), AXIS);

    let label = series[i].day().map_or_else(|| i.to_string(), str::to_owned);
    let width = text_width(&label, 1);
    let left = (x - width / 2).min(img.width() as i64 - width).max(0);
    if left < taken_until {
      continue;
    }
    draw_text(img, (left, frame.bottom + 8), &label, 1, AXIS);
    taken_until = left + width + GLYPH;
  }
}

fn draw_titles(img: &mut RgbImage, frame: &Frame) {
  let centre = (frame.left + frame.right) / 2;
  draw_text(img, (centre - text_width(TITLE, 2) / 2, 8), TITLE, 2, AXIS);
  draw_text(
    img,
    (centre - text_width(X_LABEL, 1) / 2, frame.bottom + 8 + GLYPH + 6),
    X_LABEL,
    1,
    AXIS,
  );

  // Reads bottom to top, centred on the plot height.
  let middle = (frame.top + frame.bottom) / 2;
  draw_text_up(img, (4, middle + text_width(Y_LABEL, 1) / 2), Y_LABEL, AXIS);
}

fn draw_legend(img: &mut RgbImage, frame: &Frame, entries: &[(&str, Rgb<u8>)]) {
  for (row, (name, colour)) in entries.iter().enumerate() {
    let top = frame.top + 6 + row as i64 * LEGEND_ROW;
    let left = frame.left + 8;
    for y in top..top + SWATCH {
      for x in left..left + SWATCH * 2 {
        plot(img, x, y, *colour);
      }
    }
    draw_text(img, (left + SWATCH * 2 + 6, top + 1), name, 1, AXIS);
  }
}

/// Case counts shortened to fit the y-axis gutter.
fn compact(value: i64) -> String {
  match value.unsigned_abs() {
    0..=99_999 => value.to_string(),
    100_000..=99_999_999 => format!("{}k", value / 1_000),
    _ => format!("{}M", value / 1_000_000),
  }
}

fn text_width(text: &str, scale: i64) -> i64 {
  text.chars().count() as i64 * GLYPH * scale
}

/// Left-to-right text with its top-left corner at `origin`.
fn draw_text(img: &mut RgbImage, origin: (i64, i64), text: &str, scale: i64, colour: Rgb<u8>) {
  for_each_glyph_pixel(text, scale, |u, v| plot(img, origin.0 + u, origin.1 + v, colour));
}

/// Text rotated a quarter turn anticlockwise, starting at `origin` and
/// running upwards.
fn draw_text_up(img: &mut RgbImage, origin: (i64, i64), text: &str, colour: Rgb<u8>) {
  for_each_glyph_pixel(text, 1, |u, v| plot(img, origin.0 + v, origin.1 - u, colour));
}

/// Calls `f` with the offset of every set pixel of `text` laid out on one
/// line. Characters without a glyph still advance the pen.
fn for_each_glyph_pixel(text: &str, scale: i64, mut f: impl FnMut(i64, i64)) {
  for (n, c) in text.chars().enumerate() {
    let Some(rows) = BASIC_FONTS.get(c) else { continue };
    let pen = n as i64 * GLYPH * scale;
    for (gy, bits) in rows.iter().enumerate() {
      for gx in 0..GLYPH {
        if (*bits >> gx) & 1 == 0 {
          continue;
        }
        for dy in 0..scale {
          for dx in 0..scale {
            f(pen + gx * scale + dx, gy as i64 * scale + dy);
          }
        }
      }
    }
  }
}

/// Bresenham, two pixels thick.
fn draw_line(img: &mut RgbImage, (x0, y0): (i64, i64), (x1, y1): (i64, i64), colour: Rgb<u8>) {
  let dx = (x1 - x0).abs();
  let dy = -(y1 - y0).abs();
  let sx = if x0 < x1 { 1 } else { -1 };
  let sy = if y0 < y1 { 1 } else { -1 };
  let (mut x, mut y) = (x0, y0);
  let mut err = dx + dy;

  loop {
    plot(img, x, y, colour);
    plot(img, x, y + 1, colour);
    if x == x1 && y == y1 {
      break;
    }
    let e2 = 2 * err;
    if e2 >= dy {
      err += dy;
      x += sx;
    }
    if e2 <= dx {
      err += dx;
      y += sy;
    }
  }
}

fn plot(img: &mut RgbImage, x: i64, y: i64, colour: Rgb<u8>) {
  if x < 0 || y < 0 || x >= img.width() as i64 || y >= img.height() as i64 {
    return;
  }
  img.put_pixel(x as u32, y as u32, colour);
}
