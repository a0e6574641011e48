/// Pixel grid dimensions of one rendered frame.
///
/// One compute work item is dispatched per cell; the output buffer holds
/// `width * height` RGBA values in row-major order (`y * width + x`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Number of pixels (and work items) in the grid; `None` if it does not fit in `u32`.
    #[inline]
    pub const fn area(self) -> Option<u32> {
        self.width.checked_mul(self.height)
    }

    /// Linear index of pixel `(x, y)`.
    #[inline]
    pub const fn index(self, x: u32, y: u32) -> u32 {
        y * self.width + x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn area_is_width_times_height() {
        assert_eq!(GridSize::new(1060, 600).area(), Some(636_000));
    }

    #[test]
    fn oversized_area_is_none() {
        assert_eq!(GridSize::new(70_000, 70_000).area(), None);
        assert_eq!(GridSize::new(u32::MAX, 1).area(), Some(u32::MAX));
    }

    #[test]
    fn index_is_row_major() {
        let g = GridSize::new(4, 3);
        assert_eq!(g.index(0, 0), 0);
        assert_eq!(g.index(3, 0), 3);
        assert_eq!(g.index(0, 1), 4);
        assert_eq!(g.index(3, 2), 11);
    }

    #[test]
    fn zero_dimension_is_invalid() {
        assert!(!GridSize::new(0, 10).is_valid());
        assert!(!GridSize::new(10, 0).is_valid());
        assert!(GridSize::new(1, 1).is_valid());
    }
}
