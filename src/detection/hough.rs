//! Circular Hough transform over binary masks.
//!
//! Evidence pixels are taken from the outline band of the mask. Every
//! evidence pixel votes for all centers whose digital circle of radius `r`
//! passes through it, for each `r` in the configured range. Because each
//! (center, radius) cell collects at most one vote per point of its digital
//! circle, dividing by the circle's point count gives a score in [0, 1]: the
//! fraction of the circle covered by evidence. Peaks are local maxima of that
//! score over space and radius.

use log::debug;

use crate::config::{HoughParams, RadiusRange};
use crate::error::ConfigurationError;
use crate::models::{CellClass, Circle, Mask};

/// Integer offsets of the midpoint circle of radius `r`, sorted and unique.
pub fn circle_offsets(r: u32) -> Vec<(i32, i32)> {
    let r = r as i32;
    let mut points = Vec::with_capacity(8 * r.max(1) as usize);
    let (mut x, mut y, mut err) = (r, 0i32, 1 - r);
    while x >= y {
        points.extend_from_slice(&[
            (x, y),
            (y, x),
            (-y, x),
            (-x, y),
            (-x, -y),
            (-y, -x),
            (y, -x),
            (x, -y),
        ]);
        y += 1;
        if err < 0 {
            err += 2 * y + 1;
        } else {
            x -= 1;
            err += 2 * (y - x) + 1;
        }
    }
    points.sort_unstable();
    points.dedup();
    points
}

/// Vote counts indexed by (radius, y, x).
struct Accumulator {
    width: usize,
    height: usize,
    radii: Vec<u32>,
    /// Points on each radius' digital circle
    norms: Vec<f32>,
    votes: Vec<u32>,
}

impl Accumulator {
    fn plane(&self) -> usize {
        self.width * self.height
    }

    fn score(&self, idx: usize) -> f32 {
        self.votes[idx] as f32 / self.norms[idx / self.plane()]
    }

    fn vote(&mut self, evidence: &[(u32, u32)]) {
        let plane = self.plane();
        let (w, h) = (self.width as i32, self.height as i32);
        for (ri, &r) in self.radii.iter().enumerate() {
            let offsets = circle_offsets(r);
            let slice = &mut self.votes[ri * plane..(ri + 1) * plane];
            for &(px, py) in evidence {
                let (px, py) = (px as i32, py as i32);
                for &(dx, dy) in &offsets {
                    let cx = px - dx;
                    let cy = py - dy;
                    if cx >= 0 && cx < w && cy >= 0 && cy < h {
                        slice[(cy * w + cx) as usize] += 1;
                    }
                }
            }
        }
    }

    /// Local maxima with score >= `threshold` within a (2 * window + 1)^2 x 3
    /// neighbourhood. Equal neighbours with a lower index win, so a plateau
    /// yields a single peak.
    fn peaks(&self, threshold: f32, window: u32) -> Vec<(usize, f32)> {
        let plane = self.plane();
        let (w, h) = (self.width as i64, self.height as i64);
        let n_radii = self.radii.len() as i64;
        let window = window as i64;

        let mut peaks = Vec::new();
        for idx in 0..self.votes.len() {
            if self.votes[idx] == 0 {
                continue;
            }
            let val = self.score(idx);
            if val < threshold {
                continue;
            }
            let ri = (idx / plane) as i64;
            let y = ((idx % plane) / self.width) as i64;
            let x = (idx % self.width) as i64;

            let mut is_max = true;
            'search: for nr in (ri - 1).max(0)..=(ri + 1).min(n_radii - 1) {
                for ny in (y - window).max(0)..=(y + window).min(h - 1) {
                    for nx in (x - window).max(0)..=(x + window).min(w - 1) {
                        let nidx = (nr * h * w + ny * w + nx) as usize;
                        if nidx == idx {
                            continue;
                        }
                        let other = self.score(nidx);
                        if other > val || (other == val && nidx < idx) {
                            is_max = false;
                            break 'search;
                        }
                    }
                }
            }
            if is_max {
                peaks.push((idx, val));
            }
        }
        peaks
    }
}

/// Hough circle detector for one cell class.
#[derive(Debug, Clone)]
pub struct CircleDetector {
    pub class: CellClass,
    pub radius_range: RadiusRange,
    pub params: HoughParams,
    pub max_accumulator_bytes: u64,
}

impl CircleDetector {
    pub fn new(
        class: CellClass,
        radius_range: RadiusRange,
        params: HoughParams,
        max_accumulator_bytes: u64,
    ) -> Self {
        Self {
            class,
            radius_range,
            params,
            max_accumulator_bytes,
        }
    }

    /// Circle candidates found in `mask`, ranked by [`Circle::rank`].
    ///
    /// An empty mask yields no candidates. Fails only when the accumulator for
    /// this frame would exceed the configured memory ceiling.
    pub fn detect(&self, mask: &Mask) -> Result<Vec<Circle>, ConfigurationError> {
        let (width, height) = mask.dimensions();
        let required = self.radius_range.accumulator_bytes(width, height);
        if required > self.max_accumulator_bytes {
            return Err(ConfigurationError::AccumulatorTooLarge {
                class: self.class.as_str(),
                width,
                height,
                required,
                limit: self.max_accumulator_bytes,
            });
        }
        if self.radius_range.is_empty() || mask.is_empty() {
            return Ok(Vec::new());
        }

        let evidence = mask.outline().foreground_pixels();
        if evidence.is_empty() {
            return Ok(Vec::new());
        }

        let radii: Vec<u32> = self.radius_range.iter().collect();
        let norms = radii.iter().map(|&r| circle_offsets(r).len() as f32).collect();
        let plane = width as usize * height as usize;
        let mut acc = Accumulator {
            width: width as usize,
            height: height as usize,
            votes: vec![0; plane * radii.len()],
            radii,
            norms,
        };
        acc.vote(&evidence);

        let mut circles: Vec<Circle> = acc
            .peaks(self.params.vote_threshold, self.params.peak_window)
            .into_iter()
            .map(|(idx, score)| {
                let ri = idx / plane;
                let rest = idx % plane;
                Circle {
                    x: (rest % acc.width) as f32,
                    y: (rest / acc.width) as f32,
                    radius: acc.radii[ri] as f32,
                    class: self.class,
                    score,
                }
            })
            .collect();

        circles.sort_by(Circle::rank);
        if let Some(max_candidates) = self.params.max_candidates {
            circles.truncate(max_candidates);
        }

        debug!(
            "{} detector: {} evidence pixels, {} candidates (radii {}..={})",
            self.class.as_str(),
            evidence.len(),
            circles.len(),
            self.radius_range.min,
            self.radius_range.max
        );
        Ok(circles)
    }
}
