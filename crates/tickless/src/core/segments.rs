//! Wall segment cache.
//!
//! Solid cells are reduced to the boundary edges they expose to free space,
//! bucketed by the direction the edge faces and merged into maximal runs.
//! Each bucket is sorted by the segment's fixed coordinate so a ray can
//! binary-search to the first wall ahead of it.

use glam::DVec2;

use crate::api::types::Axis;

/// Compass direction a boundary faces (from the solid cell toward free space).
/// Y grows downwards, as in screen space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [Direction::Up, Direction::Down, Direction::Left, Direction::Right];

    pub fn index(self) -> usize {
        match self {
            Direction::Up => 0,
            Direction::Down => 1,
            Direction::Left => 2,
            Direction::Right => 3,
        }
    }

    /// Cell offset of the neighbour this direction faces.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Up/Down boundaries are horizontal lines (fixed y); Left/Right are vertical.
    pub fn is_horizontal_line(self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

/// One merged boundary, in pixels.
/// `fixed` is the line's coordinate (y for horizontal lines, x for vertical
/// ones); `min..max` is its extent along the other axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub fixed: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone)]
pub struct SegmentCache {
    buckets: [Vec<Segment>; 4],
    dirty: bool,
}

impl SegmentCache {
    /// A fresh cache starts dirty; the first read builds it.
    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            dirty: true,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Mark the cache stale. Returns true only on the clean → dirty transition.
    pub fn mark_dirty(&mut self) -> bool {
        !std::mem::replace(&mut self.dirty, true)
    }

    /// Segments facing `direction`. Only meaningful while clean.
    pub fn bucket(&self, direction: Direction) -> &[Segment] {
        &self.buckets[direction.index()]
    }

    /// Rebuild every bucket from a `width` x `height` grid.
    ///
    /// `solid(x, y)` is only asked about in-bounds cells; a neighbour outside
    /// the grid counts as free space, so the grid's outer solid ring still
    /// exposes its faces.
    pub fn rebuild(
        &mut self,
        width: u32,
        height: u32,
        cell_size: (f64, f64),
        solid: impl Fn(u32, u32) -> bool,
    ) {
        let (cw, ch) = cell_size;
        let exposed = |x: u32, y: u32, direction: Direction| {
            if !solid(x, y) {
                return false;
            }
            let (dx, dy) = direction.offset();
            let (nx, ny) = (x as i64 + dx, y as i64 + dy);
            if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                return true;
            }
            !solid(nx as u32, ny as u32)
        };

        for direction in Direction::ALL {
            let bucket = &mut self.buckets[direction.index()];
            bucket.clear();

            // Walk lines in ascending fixed order, cells along each line in
            // ascending order; runs come out merged and sorted.
            let (lines, cells) = if direction.is_horizontal_line() {
                (height, width)
            } else {
                (width, height)
            };
            let (fixed_scale, perp_scale) = if direction.is_horizontal_line() {
                (ch, cw)
            } else {
                (cw, ch)
            };
            let fixed_shift = matches!(direction, Direction::Down | Direction::Right) as u32;

            for line in 0..lines {
                let fixed = (line + fixed_shift) as f64 * fixed_scale;
                let mut run_start: Option<u32> = None;
                for cell in 0..=cells {
                    let boundary = cell < cells && {
                        let (x, y) = if direction.is_horizontal_line() {
                            (cell, line)
                        } else {
                            (line, cell)
                        };
                        exposed(x, y, direction)
                    };
                    match (boundary, run_start) {
                        (true, None) => run_start = Some(cell),
                        (false, Some(start)) => {
                            bucket.push(Segment {
                                fixed,
                                min: start as f64 * perp_scale,
                                max: cell as f64 * perp_scale,
                            });
                            run_start = None;
                        }
                        _ => {}
                    }
                }
            }
        }

        self.dirty = false;
        log::debug!(
            "segment cache rebuilt: up={} down={} left={} right={}",
            self.buckets[0].len(),
            self.buckets[1].len(),
            self.buckets[2].len(),
            self.buckets[3].len(),
        );
    }

    /// Distance along `direction` (unit vector) from `origin` to the first
    /// wall crossed while moving on `axis`, or infinity if none.
    ///
    /// A horizontal ray tests vertical walls facing it, a vertical ray tests
    /// horizontal walls. The crossing point must fall inside the segment
    /// with `fudge` trimmed off both ends, and walls up to `fudge` behind the
    /// origin still count so a flush contact reports a near-zero distance.
    pub fn ray_cast(&self, origin: DVec2, direction: DVec2, axis: Axis, fudge: f64) -> f64 {
        // "independent" runs along the axis of motion, "dependent" across it.
        let (independent, dependent, dir_independent, dir_dependent, bucket) = match axis {
            Axis::Vertical => (
                origin.y,
                origin.x,
                direction.y,
                direction.x,
                if direction.y < 0.0 { Direction::Down } else { Direction::Up },
            ),
            Axis::Horizontal => (
                origin.x,
                origin.y,
                direction.x,
                direction.y,
                if direction.x < 0.0 { Direction::Right } else { Direction::Left },
            ),
        };
        if dir_independent == 0.0 {
            return f64::INFINITY;
        }
        let slope = dir_dependent / dir_independent;
        let segments = self.bucket(bucket);

        let hit = |segment: &Segment| {
            let crossing = dependent + slope * (segment.fixed - independent);
            if segment.min + fudge <= crossing && crossing <= segment.max - fudge {
                Some(DVec2::new(crossing - dependent, segment.fixed - independent).length())
            } else {
                None
            }
        };

        let distance = if dir_independent > 0.0 {
            let start = segments.partition_point(|s| s.fixed < independent - fudge);
            segments[start..].iter().find_map(hit)
        } else {
            let end = segments.partition_point(|s| s.fixed < independent + fudge);
            segments[..end].iter().rev().find_map(hit)
        };
        distance.unwrap_or(f64::INFINITY)
    }
}

impl Default for SegmentCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(width: u32, height: u32, solid: &[(u32, u32)]) -> SegmentCache {
        let mut cache = SegmentCache::new();
        cache.rebuild(width, height, (1.0, 1.0), |x, y| solid.contains(&(x, y)));
        cache
    }

    #[test]
    fn no_solid_cells_means_no_segments() {
        let cache = build(4, 3, &[]);
        for d in Direction::ALL {
            assert!(cache.bucket(d).is_empty(), "{:?} not empty", d);
        }
    }

    #[test]
    fn single_cell_exposes_four_faces() {
        let cache = build(3, 3, &[(1, 1)]);
        let seg = |fixed, min, max| Segment { fixed, min, max };
        assert_eq!(cache.bucket(Direction::Up), &[seg(1.0, 1.0, 2.0)]);
        assert_eq!(cache.bucket(Direction::Down), &[seg(2.0, 1.0, 2.0)]);
        assert_eq!(cache.bucket(Direction::Left), &[seg(1.0, 1.0, 2.0)]);
        assert_eq!(cache.bucket(Direction::Right), &[seg(2.0, 1.0, 2.0)]);
    }

    #[test]
    fn adjacent_cells_merge_into_one_run() {
        let cache = build(5, 3, &[(1, 1), (2, 1), (3, 1)]);
        let up = cache.bucket(Direction::Up);
        assert_eq!(up.len(), 1);
        assert_eq!((up[0].min, up[0].max), (1.0, 4.0));
        // Interior faces between solid neighbours are not boundaries.
        assert_eq!(cache.bucket(Direction::Left).len(), 1);
        assert_eq!(cache.bucket(Direction::Right).len(), 1);
    }

    #[test]
    fn buckets_are_sorted_by_fixed() {
        let cache = build(6, 6, &[(4, 4), (1, 1), (3, 0), (0, 5)]);
        for d in Direction::ALL {
            let b = cache.bucket(d);
            assert!(b.windows(2).all(|w| w[0].fixed <= w[1].fixed), "{:?} unsorted", d);
        }
    }

    #[test]
    fn rebuild_is_idempotent() {
        let solid = [(0, 0), (1, 0), (2, 2)];
        let mut cache = build(4, 4, &solid);
        let first = cache.buckets.clone();
        cache.mark_dirty();
        cache.rebuild(4, 4, (1.0, 1.0), |x, y| solid.contains(&(x, y)));
        assert_eq!(first, cache.buckets);
    }

    #[test]
    fn mark_dirty_reports_transition_once() {
        let mut cache = build(1, 1, &[]);
        assert!(cache.mark_dirty());
        assert!(!cache.mark_dirty());
    }

    #[test]
    fn pixel_scaling_uses_cell_size() {
        let mut cache = SegmentCache::new();
        cache.rebuild(2, 2, (32.0, 16.0), |x, y| (x, y) == (1, 1));
        assert_eq!(cache.bucket(Direction::Up)[0], Segment { fixed: 16.0, min: 32.0, max: 64.0 });
        assert_eq!(cache.bucket(Direction::Left)[0], Segment { fixed: 32.0, min: 16.0, max: 32.0 });
    }

    #[test]
    fn horizontal_ray_hits_facing_wall() {
        let cache = build(1, 1, &[(0, 0)]);
        let d = cache.ray_cast(DVec2::new(4.5, 0.5), DVec2::new(-1.0, 0.0), Axis::Horizontal, 0.001);
        assert!((d - 3.5).abs() < 1e-9, "distance was {}", d);
    }

    #[test]
    fn ray_misses_outside_inset_span() {
        let cache = build(1, 1, &[(0, 0)]);
        let d = cache.ray_cast(DVec2::new(4.5, 1.0), DVec2::new(-1.0, 0.0), Axis::Horizontal, 0.001);
        assert_eq!(d, f64::INFINITY);
    }

    #[test]
    fn ray_parallel_to_axis_is_infinite() {
        let cache = build(3, 3, &[(1, 1)]);
        let d = cache.ray_cast(DVec2::new(0.5, 1.5), DVec2::new(1.0, 0.0), Axis::Vertical, 0.001);
        assert_eq!(d, f64::INFINITY);
    }

    #[test]
    fn diagonal_ray_measures_euclidean_distance() {
        let cache = build(4, 4, &[(3, 0), (3, 1), (3, 2), (3, 3)]);
        let dir = DVec2::new(4.0, 3.0).normalize();
        let d = cache.ray_cast(DVec2::new(0.0, 0.5), dir, Axis::Horizontal, 0.001);
        // x travels 3, y travels 2.25.
        assert!((d - 3.75).abs() < 1e-9, "distance was {}", d);
    }

    #[test]
    fn flush_wall_reports_zero_distance() {
        let cache = build(3, 1, &[(2, 0)]);
        let d = cache.ray_cast(DVec2::new(2.0, 0.5), DVec2::new(1.0, 0.0), Axis::Horizontal, 0.001);
        assert!(d <= 0.001, "distance was {}", d);
    }

    #[test]
    fn nearest_wall_wins_when_moving_backwards() {
        let cache = build(6, 1, &[(0, 0), (2, 0)]);
        let d = cache.ray_cast(DVec2::new(5.5, 0.5), DVec2::new(-1.0, 0.0), Axis::Horizontal, 0.001);
        assert!((d - 2.5).abs() < 1e-9, "distance was {}", d);
    }
}
