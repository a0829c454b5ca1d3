//! Region geometry clamping
//!
//! Clients draw regions on their own preview canvas, so nothing about the
//! supplied rectangle can be trusted against the decoded frame.

use super::Region;

/// A rectangle guaranteed to lie inside a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// Exclusive right edge
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Exclusive bottom edge
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }
}

/// Clip `region` to a `frame_width` x `frame_height` frame
///
/// Returns `None` when nothing of the region is left inside the frame. The
/// result always satisfies `x + width <= frame_width` and
/// `y + height <= frame_height`.
pub fn clamp_region(region: &Region, frame_width: u32, frame_height: u32) -> Option<Rect> {
    let (x0, x1) = clamp_span(region.x, region.width, frame_width)?;
    let (y0, y1) = clamp_span(region.y, region.height, frame_height)?;

    Some(Rect {
        x: x0,
        y: y0,
        width: x1 - x0,
        height: y1 - y0,
    })
}

/// Clip the half-open span `[start, start + len)` to `[0, limit)`
fn clamp_span(start: i64, len: i64, limit: u32) -> Option<(u32, u32)> {
    let limit = i64::from(limit);
    let lo = start.clamp(0, limit);
    let hi = start.saturating_add(len).clamp(0, limit);

    if hi <= lo {
        return None;
    }

    // Both ends are within [0, limit] so they fit in u32
    Some((lo as u32, hi as u32))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i64, y: i64, width: i64, height: i64) -> Region {
        Region::new(x, y, width, height, "r")
    }

    #[test]
    fn test_in_bounds_region_unchanged() {
        let rect = clamp_region(&region(10, 20, 30, 40), 100, 100).unwrap();
        assert_eq!(
            rect,
            Rect {
                x: 10,
                y: 20,
                width: 30,
                height: 40
            }
        );

        // Exactly filling the frame is still in bounds
        let full = clamp_region(&region(0, 0, 64, 48), 64, 48).unwrap();
        assert_eq!((full.x, full.y, full.width, full.height), (0, 0, 64, 48));
    }

    #[test]
    fn test_negative_origin_is_clipped() {
        let rect = clamp_region(&region(-5, -10, 20, 30), 100, 100).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (0, 0, 15, 20));
    }

    #[test]
    fn test_overhanging_region_is_clipped() {
        let rect = clamp_region(&region(90, 95, 50, 50), 100, 100).unwrap();
        assert_eq!((rect.x, rect.y, rect.width, rect.height), (90, 95, 10, 5));
    }

    #[test]
    fn test_degenerate_regions_yield_nothing() {
        // Entirely outside
        assert!(clamp_region(&region(200, 0, 10, 10), 100, 100).is_none());
        assert!(clamp_region(&region(-50, 0, 20, 10), 100, 100).is_none());
        // Zero and negative sizes
        assert!(clamp_region(&region(10, 10, 0, 10), 100, 100).is_none());
        assert!(clamp_region(&region(10, 10, 10, -4), 100, 100).is_none());
        // Empty frame
        assert!(clamp_region(&region(0, 0, 10, 10), 0, 0).is_none());
    }

    #[test]
    fn test_extreme_values_do_not_overflow() {
        let rect = clamp_region(&region(i64::MAX - 1, 0, i64::MAX, 10), 100, 100);
        assert!(rect.is_none());

        let rect = clamp_region(&region(i64::MIN, i64::MIN, i64::MAX, i64::MAX), 100, 100);
        assert!(rect.is_none());

        let rect = clamp_region(&region(0, 0, i64::MAX, i64::MAX), 100, 80).unwrap();
        assert_eq!((rect.width, rect.height), (100, 80));
    }

    #[test]
    fn test_clamp_always_inside_frame() {
        let coords = [-1000, -17, -1, 0, 1, 7, 63, 64, 65, 500];
        let frames = [(1, 1), (64, 48), (640, 480)];

        for &(fw, fh) in &frames {
            for &x in &coords {
                for &w in &coords {
                    let r = region(x, x / 2, w, w + 3);
                    if let Some(rect) = clamp_region(&r, fw, fh) {
                        assert!(rect.width > 0 && rect.height > 0);
                        assert!(rect.right() <= fw, "{:?} escapes width {}", rect, fw);
                        assert!(rect.bottom() <= fh, "{:?} escapes height {}", rect, fh);
                    }
                }
            }
        }
    }

    #[test]
    fn test_clamp_is_idempotent() {
        let first = clamp_region(&region(-20, 30, 500, 10), 320, 240).unwrap();
        let again = clamp_region(
            &region(
                first.x as i64,
                first.y as i64,
                first.width as i64,
                first.height as i64,
            ),
            320,
            240,
        )
        .unwrap();

        assert_eq!(first, again);
    }
}
