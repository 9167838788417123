use core::ops::Range;

pub(crate) trait RangeSplitOffHalf {
    /// Shrinks `self` to its lower half and returns the upper half, or `None`
    /// when fewer than two indices remain.
    fn split_off_upper_half(&mut self) -> Option<Range<usize>>;
}

impl RangeSplitOffHalf for Range<usize> {
    #[inline]
    fn split_off_upper_half(&mut self) -> Option<Range<usize>> {
        if self.len() < 2 {
            return None;
        }
        let mid = self.start + self.len() / 2;
        let upper = mid..self.end;
        self.end = mid;
        Some(upper)
    }
}
