//! 8-connected labeling of a binary mask.

use nalgebra::Point2;

/// One connected ink region.
#[derive(Clone, Debug)]
pub(crate) struct Component {
    pub pixels: usize,
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
    /// Extreme pixels: min(x+y), max(x-y), max(x+y), min(x-y).
    extremes: [(usize, usize); 4],
}

impl Component {
    fn seed(x: usize, y: usize) -> Self {
        Self {
            pixels: 0,
            min_x: x,
            min_y: y,
            max_x: x,
            max_y: y,
            extremes: [(x, y); 4],
        }
    }

    fn add(&mut self, x: usize, y: usize) {
        self.pixels += 1;
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);

        let sum = x as i64 + y as i64;
        let diff = x as i64 - y as i64;
        let [tl, tr, br, bl] = &mut self.extremes;
        if sum < tl.0 as i64 + tl.1 as i64 {
            *tl = (x, y);
        }
        if diff > tr.0 as i64 - tr.1 as i64 {
            *tr = (x, y);
        }
        if sum > br.0 as i64 + br.1 as i64 {
            *br = (x, y);
        }
        if diff < bl.0 as i64 - bl.1 as i64 {
            *bl = (x, y);
        }
    }

    pub fn bbox_width(&self) -> usize {
        self.max_x - self.min_x + 1
    }

    pub fn bbox_height(&self) -> usize {
        self.max_y - self.min_y + 1
    }

    /// Outer corners TL, TR, BR, BL in continuous image coordinates
    /// (pixel `(i, j)` covers `[i, i+1) × [j, j+1)`).
    pub fn corners(&self) -> [Point2<f32>; 4] {
        let [tl, tr, br, bl] = self.extremes;
        [
            Point2::new(tl.0 as f32, tl.1 as f32),
            Point2::new(tr.0 as f32 + 1.0, tr.1 as f32),
            Point2::new(br.0 as f32 + 1.0, br.1 as f32 + 1.0),
            Point2::new(bl.0 as f32, bl.1 as f32 + 1.0),
        ]
    }

    pub fn overlaps(&self, other: &Component) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }
}

/// Label `mask` (row-major, `true` = ink) and return its components in
/// raster order of their first pixel.
pub(crate) fn connected_components(mask: &[bool], width: usize, height: usize) -> Vec<Component> {
    let mut visited = vec![false; mask.len()];
    let mut out = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len().min(width * height) {
        if !mask[start] || visited[start] {
            continue;
        }
        let mut comp = Component::seed(start % width, start / width);
        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            let (x, y) = (idx % width, idx / width);
            comp.add(x, y);

            let x_lo = x.saturating_sub(1);
            let y_lo = y.saturating_sub(1);
            let x_hi = (x + 1).min(width - 1);
            let y_hi = (y + 1).min(height - 1);
            for ny in y_lo..=y_hi {
                for nx in x_lo..=x_hi {
                    let n = ny * width + nx;
                    if mask[n] && !visited[n] {
                        visited[n] = true;
                        stack.push(n);
                    }
                }
            }
        }
        out.push(comp);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from(rows: &[&str]) -> (Vec<bool>, usize, usize) {
        let w = rows[0].len();
        let h = rows.len();
        let m = rows
            .iter()
            .flat_map(|r| r.chars().map(|c| c == '#'))
            .collect();
        (m, w, h)
    }

    #[test]
    fn diagonal_neighbours_join() {
        let (m, w, h) = mask_from(&["#...", ".#..", "..#.", "...."]);
        let comps = connected_components(&m, w, h);
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].pixels, 3);
    }

    #[test]
    fn separate_blobs_and_extremes() {
        let (m, w, h) = mask_from(&[
            "###.....", //
            "#.#...##", //
            "###...##", //
        ]);
        let comps = connected_components(&m, w, h);
        assert_eq!(comps.len(), 2);
        let ring = &comps[0];
        assert_eq!(ring.pixels, 8);
        assert_eq!((ring.bbox_width(), ring.bbox_height()), (3, 3));
        let c = ring.corners();
        assert_eq!((c[0].x, c[0].y), (0.0, 0.0));
        assert_eq!((c[1].x, c[1].y), (3.0, 0.0));
        assert_eq!((c[2].x, c[2].y), (3.0, 3.0));
        assert_eq!((c[3].x, c[3].y), (0.0, 3.0));
        assert!(!ring.overlaps(&comps[1]));
    }
}
