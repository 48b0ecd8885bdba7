//! Approximate dynamic time warping (FastDTW)
//!
//! Multi-resolution DTW in linear time and space:
//! 1. Coarsen both sequences by averaging adjacent frame pairs
//! 2. Recursively align the coarse sequences
//! 3. Project the coarse path back to full resolution, widened by `radius`
//! 4. Run exact DTW restricted to that window
//!
//! Sequences shorter than `radius + 2` are aligned with unrestricted DTW.
//!
//! # Reference
//!
//! Salvador, S., & Chan, P. (2007). Toward Accurate Dynamic Time Warping in Linear
//! Time and Space. *Intelligent Data Analysis*, 11(5), 561-580.

use crate::error::AnalysisError;
use crate::features::chroma::PITCH_CLASSES;

type Frame = [f32; PITCH_CLASSES];

/// Result of one warping
#[derive(Debug, Clone, PartialEq)]
pub struct Warping {
    /// Total cost along the path
    pub cost: f64,

    /// Path of `(x_index, y_index)` pairs from `(0, 0)` to `(n − 1, m − 1)`
    pub path: Vec<(usize, usize)>,
}

/// Per-row column ranges `[lo, hi)` that DTW is allowed to visit
#[derive(Debug, Clone, PartialEq)]
struct Window {
    rows: Vec<(usize, usize)>,
}

impl Window {
    fn full(n: usize, m: usize) -> Self {
        Self {
            rows: vec![(0, m); n],
        }
    }

    /// Project a coarse path onto an `n × m` grid, widened by `radius` coarse cells
    fn project(coarse_path: &[(usize, usize)], n: usize, m: usize, radius: usize) -> Self {
        let mut lo = vec![usize::MAX; n];
        let mut hi = vec![0usize; n];
        let r = radius as isize;

        for &(ci, cj) in coarse_path {
            for di in -r..=r {
                let ei = ci as isize + di;
                if ei < 0 {
                    continue;
                }
                for dj in -r..=r {
                    let ej = cj as isize + dj;
                    if ej < 0 {
                        continue;
                    }
                    let (ei, ej) = (ei as usize, ej as usize);
                    for fi in [2 * ei, 2 * ei + 1] {
                        if fi >= n {
                            continue;
                        }
                        for fj in [2 * ej, 2 * ej + 1] {
                            if fj >= m {
                                continue;
                            }
                            lo[fi] = lo[fi].min(fj);
                            hi[fi] = hi[fi].max(fj + 1);
                        }
                    }
                }
            }
        }

        // Make every row non-empty and connected to the previous one so a
        // monotone path from (0, 0) to (n − 1, m − 1) always exists.
        let mut rows = Vec::with_capacity(n);
        for i in 0..n {
            let (mut l, mut h) = if lo[i] == usize::MAX { (0, 0) } else { (lo[i], hi[i]) };
            if i == 0 {
                l = 0;
            } else {
                let (prev_l, prev_h) = rows[i - 1];
                if lo[i] == usize::MAX {
                    l = prev_l;
                }
                l = l.max(prev_l).min(prev_h).min(m - 1);
                h = h.max(prev_h);
            }
            h = h.max(l + 1).min(m);
            if i == n - 1 {
                h = m;
            }
            rows.push((l, h));
        }

        Self { rows }
    }

    fn cells(&self) -> usize {
        self.rows.iter().map(|(l, h)| h - l).sum()
    }
}

/// Average adjacent frame pairs; an odd trailing frame is kept as is
fn reduce_by_half(x: &[Frame]) -> Vec<Frame> {
    x.chunks(2)
        .map(|chunk| {
            let mut out = [0.0f32; PITCH_CLASSES];
            for frame in chunk {
                for (o, &v) in out.iter_mut().zip(frame.iter()) {
                    *o += v;
                }
            }
            let n = chunk.len() as f32;
            for o in out.iter_mut() {
                *o /= n;
            }
            out
        })
        .collect()
}

/// Exact DTW restricted to `window`
fn windowed_dtw<F>(x: &[Frame], y: &[Frame], window: &Window, dist: &F) -> Result<Warping, AnalysisError>
where
    F: Fn(&Frame, &Frame) -> f32,
{
    let n = x.len();
    let m = y.len();
    let rows = &window.rows;

    let mut acc: Vec<Vec<f64>> = rows.iter().map(|&(l, h)| vec![f64::INFINITY; h - l]).collect();

    let get = |acc: &Vec<Vec<f64>>, i: usize, j: usize| -> f64 {
        let (l, h) = rows[i];
        if j >= l && j < h {
            acc[i][j - l]
        } else {
            f64::INFINITY
        }
    };

    for i in 0..n {
        let (l, h) = rows[i];
        for j in l..h {
            let d = dist(&x[i], &y[j]) as f64;
            let best = if i == 0 && j == 0 {
                0.0
            } else {
                let diag = if i > 0 && j > 0 { get(&acc, i - 1, j - 1) } else { f64::INFINITY };
                let up = if i > 0 { get(&acc, i - 1, j) } else { f64::INFINITY };
                let left = if j > 0 { get(&acc, i, j - 1) } else { f64::INFINITY };
                diag.min(up).min(left)
            };
            acc[i][j - l] = best + d;
        }
    }

    let cost = get(&acc, n - 1, m - 1);
    if !cost.is_finite() {
        return Err(AnalysisError::ProcessingError(format!(
            "DTW window does not connect (0, 0) to ({}, {})",
            n - 1,
            m - 1
        )));
    }

    // Backtrack, preferring the diagonal on ties
    let mut path = Vec::with_capacity(n.max(m) * 2);
    let (mut i, mut j) = (n - 1, m - 1);
    path.push((i, j));
    while i > 0 || j > 0 {
        let mut best = (f64::INFINITY, i, j);
        if i > 0 && j > 0 {
            best = (get(&acc, i - 1, j - 1), i - 1, j - 1);
        }
        if i > 0 {
            let up = get(&acc, i - 1, j);
            if up < best.0 {
                best = (up, i - 1, j);
            }
        }
        if j > 0 {
            let left = get(&acc, i, j - 1);
            if left < best.0 {
                best = (left, i, j - 1);
            }
        }
        if !best.0.is_finite() {
            return Err(AnalysisError::ProcessingError(format!(
                "DTW backtrack stalled at ({}, {})",
                i, j
            )));
        }
        i = best.1;
        j = best.2;
        path.push((i, j));
    }
    path.reverse();

    Ok(Warping { cost, path })
}

/// Align two frame sequences with FastDTW
///
/// # Arguments
///
/// * `x` - First sequence (reference frames)
/// * `y` - Second sequence (user frames)
/// * `radius` - Window half-width in coarse cells (1 is the usual choice;
///   wider windows cost more but follow strong tempo warps better)
/// * `dist` - Frame distance
///
/// # Returns
///
/// Total cost and warping path. Empty input yields cost 0 and an empty path.
///
/// # Errors
///
/// Returns `AnalysisError::ProcessingError` if the search window fails to
/// connect the corners, which indicates an internal bug.
pub fn fast_dtw<F>(x: &[Frame], y: &[Frame], radius: usize, dist: &F) -> Result<Warping, AnalysisError>
where
    F: Fn(&Frame, &Frame) -> f32,
{
    if x.is_empty() || y.is_empty() {
        return Ok(Warping {
            cost: 0.0,
            path: Vec::new(),
        });
    }

    let min_size = radius + 2;
    if x.len() < min_size || y.len() < min_size {
        return windowed_dtw(x, y, &Window::full(x.len(), y.len()), dist);
    }

    let x_coarse = reduce_by_half(x);
    let y_coarse = reduce_by_half(y);
    let coarse = fast_dtw(&x_coarse, &y_coarse, radius, dist)?;

    let window = Window::project(&coarse.path, x.len(), y.len(), radius);
    log::trace!(
        "FastDTW level {}x{}: coarse path {} cells, window {} cells",
        x.len(),
        y.len(),
        coarse.path.len(),
        window.cells()
    );
    windowed_dtw(x, y, &window, dist)
}

/// Exact (unrestricted) DTW, O(n·m); used for small inputs and in tests
pub fn full_dtw<F>(x: &[Frame], y: &[Frame], dist: &F) -> Result<Warping, AnalysisError>
where
    F: Fn(&Frame, &Frame) -> f32,
{
    if x.is_empty() || y.is_empty() {
        return Ok(Warping {
            cost: 0.0,
            path: Vec::new(),
        });
    }
    windowed_dtw(x, y, &Window::full(x.len(), y.len()), dist)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(pc: usize) -> Frame {
        let mut f = [0.0f32; PITCH_CLASSES];
        f[pc % PITCH_CLASSES] = 1.0;
        f
    }

    fn l1(a: &Frame, b: &Frame) -> f32 {
        a.iter().zip(b.iter()).map(|(x, y)| (x - y).abs()).sum()
    }

    fn assert_valid_path(path: &[(usize, usize)], n: usize, m: usize) {
        assert_eq!(path.first(), Some(&(0, 0)));
        assert_eq!(path.last(), Some(&(n - 1, m - 1)));
        assert!(path.len() >= n.max(m));
        for w in path.windows(2) {
            let (a, b) = (w[0], w[1]);
            assert!(b.0 >= a.0 && b.1 >= a.1, "path not monotone: {:?} -> {:?}", a, b);
            assert!(b.0 - a.0 <= 1 && b.1 - a.1 <= 1, "path skips: {:?} -> {:?}", a, b);
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_empty_input() {
        let w = fast_dtw(&[], &[frame(0)], 1, &l1).unwrap();
        assert_eq!(w.cost, 0.0);
        assert!(w.path.is_empty());
    }

    #[test]
    fn test_self_alignment_is_diagonal() {
        let x: Vec<Frame> = (0..200).map(|t| frame(t / 10)).collect();
        let w = fast_dtw(&x, &x, 1, &l1).unwrap();
        assert_eq!(w.cost, 0.0);
        assert_eq!(w.path.len(), 200);
        assert!(w.path.iter().all(|&(i, j)| i == j));
    }

    #[test]
    fn test_tempo_stretch() {
        // y is x played at half speed
        let x: Vec<Frame> = (0..120).map(|t| frame(t / 20)).collect();
        let y: Vec<Frame> = (0..240).map(|t| frame(t / 40)).collect();
        let w = fast_dtw(&x, &y, 2, &l1).unwrap();
        assert_valid_path(&w.path, x.len(), y.len());
        assert!(w.cost < 1e-9, "stretched copy should align at zero cost, got {}", w.cost);
    }

    #[test]
    fn test_odd_lengths_reach_corners() {
        let x: Vec<Frame> = (0..97).map(|t| frame(t / 7)).collect();
        let y: Vec<Frame> = (0..131).map(|t| frame(t / 9)).collect();
        let w = fast_dtw(&x, &y, 1, &l1).unwrap();
        assert_valid_path(&w.path, x.len(), y.len());
    }

    #[test]
    fn test_close_to_full_dtw() {
        let x: Vec<Frame> = (0..64).map(|t| frame((t / 4) % 5)).collect();
        let y: Vec<Frame> = (0..80).map(|t| frame((t / 5) % 5)).collect();
        let approx = fast_dtw(&x, &y, 2, &l1).unwrap();
        let exact = full_dtw(&x, &y, &l1).unwrap();
        assert!(approx.cost >= exact.cost - 1e-9);
        assert_valid_path(&approx.path, x.len(), y.len());
        assert_valid_path(&exact.path, x.len(), y.len());
    }

    #[test]
    fn test_very_short_sequence() {
        let x = vec![frame(0), frame(1)];
        let y: Vec<Frame> = (0..50).map(|t| frame(t / 25)).collect();
        let w = fast_dtw(&x, &y, 1, &l1).unwrap();
        assert_valid_path(&w.path, 2, 50);
    }

    #[test]
    fn test_reduce_by_half_keeps_odd_tail() {
        let x = vec![frame(0), frame(0), frame(3)];
        let r = reduce_by_half(&x);
        assert_eq!(r.len(), 2);
        assert_eq!(r[1], frame(3));
    }
}
