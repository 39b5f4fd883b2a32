//! Augmented sorted-array interval search.
//!
//! Intervals are sorted by `begin` and each slot additionally stores the running
//! maximum of `end` over all slots up to and including itself. Because that maximum
//! never decreases, every slot whose maximum is below a query's `begin` can be
//! discarded with a single binary search, after which a short forward scan confirms
//! the real overlaps.

/// A closed interval `[begin, end]` carrying a value
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval<T> {
    pub begin: u32,
    pub end: u32,
    pub value: T,

    /// Maximum `end` over the sorted prefix ending at this interval
    max: u32,
}
impl<T> Interval<T> {
    #[must_use]
    pub fn new(begin: u32, end: u32, value: T) -> Self {
        Self {
            begin,
            end,
            value,
            max: end,
        }
    }

    #[must_use]
    pub fn overlaps(&self, begin: u32, end: u32) -> bool {
        self.begin <= end && self.end >= begin
    }

    /// Running maximum of `end`, only meaningful inside an [`IntervalArray`]
    #[must_use]
    pub fn max(&self) -> u32 {
        self.max
    }
}

/// Returns the leftmost index whose running maximum reaches `begin`.
///
/// Every index before it ends strictly before `begin` and cannot overlap any query
/// starting at `begin`. `maxes` must be non-decreasing.
pub fn leftmost_candidate<F>(len: usize, begin: u32, max_at: F) -> usize
where
    F: Fn(usize) -> u32,
{
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if max_at(mid) < begin {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// A sorted interval set with running-maximum augmentation
#[derive(Clone, Debug)]
pub struct IntervalArray<T> {
    intervals: Vec<Interval<T>>,
}
impl<T> Default for IntervalArray<T> {
    fn default() -> Self {
        Self {
            intervals: Vec::new(),
        }
    }
}
impl<T> IntervalArray<T> {
    /// Sorts the intervals by `begin` and computes the running maxima
    #[must_use]
    pub fn new(mut intervals: Vec<Interval<T>>) -> Self {
        intervals.sort_by_key(|iv| iv.begin);
        let mut current_max = 0;
        for (i, interval) in intervals.iter_mut().enumerate() {
            if i == 0 || interval.end > current_max {
                current_max = interval.end;
            }
            interval.max = current_max;
        }
        Self { intervals }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Interval<T>> {
        self.intervals.iter()
    }

    /// Iterates all intervals that could overlap `[begin, end]` in begin order
    fn candidates(&self, begin: u32, end: u32) -> impl Iterator<Item = &Interval<T>> {
        let first = leftmost_candidate(self.intervals.len(), begin, |i| self.intervals[i].max);
        self.intervals[first..]
            .iter()
            .take_while(move |iv| iv.begin <= end)
            .filter(move |iv| iv.overlaps(begin, end))
    }

    #[must_use]
    pub fn overlaps_any(&self, begin: u32, end: u32) -> bool {
        self.first_overlap(begin, end).is_some()
    }

    #[must_use]
    pub fn first_overlap(&self, begin: u32, end: u32) -> Option<&Interval<T>> {
        self.candidates(begin, end).next()
    }

    /// Returns the values of every interval overlapping `[begin, end]`
    #[must_use]
    pub fn all_overlaps(&self, begin: u32, end: u32) -> Vec<&T> {
        self.candidates(begin, end).map(|iv| &iv.value).collect()
    }

    #[must_use]
    pub fn all_overlapping_intervals(&self, begin: u32, end: u32) -> Vec<&Interval<T>> {
        self.candidates(begin, end).collect()
    }
}
impl<T> FromIterator<Interval<T>> for IntervalArray<T> {
    fn from_iter<I: IntoIterator<Item = Interval<T>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
