//! Template matching on grayscale images.
//!
//! Scores are zero-mean normalized cross-correlation, from -1.0 to 1.0, where
//! 1.0 is a pixel-perfect match up to brightness and contrast. Large screens
//! are searched coarse-to-fine: a pass over downscaled copies finds the
//! neighborhood, then a full-resolution pass pins the exact position.

use image::GrayImage;
use image::imageops::{self, FilterType};

/// Smallest template side that still gives a usable coarse pass.
const MIN_COARSE_SIZE: u32 = 4;

/// Coarse peaks refined at full resolution.
const COARSE_CANDIDATES: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchResult {
    /// Top-left corner of the best match in haystack pixels
    pub x: u32,
    pub y: u32,
    pub score: f32,
}

/// Prefix sums of pixel values and squared pixel values.
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sq: Vec<f64>,
}

impl Integral {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sq = vec![0.0; stride * (h + 1)];

        for y in 0..h {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = img.get_pixel(x as u32, y as u32)[0] as f64;
                row_sum += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row_sum;
                sq[(y + 1) * stride + x + 1] = sq[y * stride + x + 1] + row_sq;
            }
        }

        Self { stride, sum, sq }
    }

    /// (sum, sum of squares) over the w×h block at (x, y).
    fn block(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let at = |table: &[f64]| {
            table[(y + h) * s + x + w] - table[y * s + x + w] - table[(y + h) * s + x]
                + table[y * s + x]
        };
        (at(&self.sum), at(&self.sq))
    }
}

/// Finds the position where `template` best matches `haystack`.
///
/// `downscale` > 1 enables the coarse pass. Returns `None` if the template is
/// empty or larger than the haystack.
pub fn find_best_match(
    haystack: &GrayImage,
    template: &GrayImage,
    downscale: u32,
) -> Option<MatchResult> {
    let (hw, hh) = haystack.dimensions();
    let (tw, th) = template.dimensions();
    if tw == 0 || th == 0 || tw > hw || th > hh {
        return None;
    }

    let factor = downscale.max(1);
    if factor > 1 && tw / factor >= MIN_COARSE_SIZE && th / factor >= MIN_COARSE_SIZE {
        let small_hay = imageops::resize(haystack, hw / factor, hh / factor, FilterType::Triangle);
        let small_tpl = imageops::resize(template, tw / factor, th / factor, FilterType::Triangle);
        // Peaks closer than half a template are the same spot seen twice
        let spacing = (small_tpl.width().min(small_tpl.height()) / 2).max(1);
        let candidates = coarse_candidates(&small_hay, &small_tpl, COARSE_CANDIDATES, spacing);

        // Lookalikes at reduced scale only separate at full resolution
        let margin = factor * 2;
        return candidates
            .iter()
            .filter_map(|coarse| {
                let cx = coarse.x * factor;
                let cy = coarse.y * factor;
                best_in_window(
                    haystack,
                    template,
                    (cx.saturating_sub(margin), (cx + margin).min(hw - tw)),
                    (cy.saturating_sub(margin), (cy + margin).min(hh - th)),
                )
            })
            .fold(None, |best: Option<MatchResult>, m| match best {
                Some(b) if b.score >= m.score => Some(b),
                _ => Some(m),
            });
    }

    best_in_window(haystack, template, (0, hw - tw), (0, hh - th))
}

/// Up to `limit` best positions of the coarse pass, at least `spacing`
/// coarse pixels apart on one axis, best first.
fn coarse_candidates(
    haystack: &GrayImage,
    template: &GrayImage,
    limit: usize,
    spacing: u32,
) -> Vec<MatchResult> {
    let mut all = Vec::new();
    scan(
        haystack,
        template,
        (0, haystack.width() - template.width()),
        (0, haystack.height() - template.height()),
        |m| all.push(m),
    );
    all.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut picked: Vec<MatchResult> = Vec::with_capacity(limit);
    for m in all {
        if picked.len() == limit {
            break;
        }
        let near = picked
            .iter()
            .any(|p| p.x.abs_diff(m.x) < spacing && p.y.abs_diff(m.y) < spacing);
        if !near {
            picked.push(m);
        }
    }
    picked
}

/// Exhaustive search over top-left positions in the inclusive ranges.
fn best_in_window(
    haystack: &GrayImage,
    template: &GrayImage,
    x_range: (u32, u32),
    y_range: (u32, u32),
) -> Option<MatchResult> {
    let mut best: Option<MatchResult> = None;
    scan(haystack, template, x_range, y_range, |m| {
        if best.is_none_or(|b| m.score > b.score) {
            best = Some(m);
        }
    });
    best
}

/// Scores every top-left position in the inclusive ranges.
fn scan(
    haystack: &GrayImage,
    template: &GrayImage,
    (x_min, x_max): (u32, u32),
    (y_min, y_max): (u32, u32),
    mut visit: impl FnMut(MatchResult),
) {
    let (tw, th) = (template.width() as usize, template.height() as usize);
    let n = (tw * th) as f64;

    let raw: Vec<f64> = template.pixels().map(|p| p[0] as f64).collect();
    let t_mean = raw.iter().sum::<f64>() / n;
    let centered: Vec<f64> = raw.iter().map(|v| v - t_mean).collect();
    let t_var: f64 = centered.iter().map(|v| v * v).sum();

    let integral = Integral::new(haystack);
    let hay = haystack.as_raw();
    let hay_w = haystack.width() as usize;

    for y in y_min..=y_max {
        for x in x_min..=x_max {
            let (x, y) = (x as usize, y as usize);
            let (w_sum, w_sq) = integral.block(x, y, tw, th);
            let w_mean = w_sum / n;
            let w_var = (w_sq - w_sum * w_sum / n).max(0.0);

            let score = if t_var < f64::EPSILON || w_var < f64::EPSILON {
                // Flat patch: correlation is undefined, compare brightness instead
                if t_var < f64::EPSILON && w_var < f64::EPSILON {
                    1.0 - (w_mean - t_mean).abs() / 255.0
                } else {
                    0.0
                }
            } else {
                let mut cross = 0.0;
                for ty in 0..th {
                    let row = (y + ty) * hay_w + x;
                    let t_row = &centered[ty * tw..(ty + 1) * tw];
                    for (tx, t) in t_row.iter().enumerate() {
                        cross += hay[row + tx] as f64 * t;
                    }
                }
                cross / (w_var * t_var).sqrt()
            };

            visit(MatchResult {
                x: x as u32,
                y: y as u32,
                score: score as f32,
            });
        }
    }
}
