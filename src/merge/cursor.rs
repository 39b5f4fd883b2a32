use std::mem;

use super::source::ItemIter;
use crate::error::ConsistencyError;
use crate::Result;

/// Items ordered by a position key
pub trait Keyed {
    fn key(&self) -> u32;
}

/// Forward-only view over one sorted input stream
pub struct Cursor<'a, T> {
    /// Chromosome the stream belongs to, for error reporting
    chromosome: String,
    iter: ItemIter<'a, T>,
    current: Option<T>,
}
impl<'a, T: Keyed> Cursor<'a, T> {
    pub fn new(chromosome: impl Into<String>, mut iter: ItemIter<'a, T>) -> Result<Self> {
        let current = iter.next().transpose()?;
        Ok(Self {
            chromosome: chromosome.into(),
            iter,
            current,
        })
    }

    #[must_use]
    pub fn current(&self) -> Option<&T> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn key(&self) -> Option<u32> {
        self.current.as_ref().map(Keyed::key)
    }

    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.current.is_none()
    }

    /// Returns the current item and moves to the next one.
    ///
    /// Equal keys may repeat, a decreasing key is an error.
    pub fn advance(&mut self) -> Result<Option<T>> {
        let next = self.iter.next().transpose()?;
        if let (Some(current), Some(next)) = (&self.current, &next) {
            if next.key() < current.key() {
                return Err(ConsistencyError::UnsortedInput {
                    chromosome: self.chromosome.clone(),
                    previous: current.key(),
                    current: next.key(),
                }
                .into());
            }
        }
        Ok(mem::replace(&mut self.current, next))
    }
}

/// Groups items of several sorted cursors by key, in ascending key order
pub struct KWayMerge<'a, T> {
    cursors: Vec<Cursor<'a, T>>,
}
impl<'a, T: Keyed> KWayMerge<'a, T> {
    pub fn new(cursors: Vec<Cursor<'a, T>>) -> Self {
        let cursors = cursors.into_iter().filter(|c| !c.is_exhausted()).collect();
        Self { cursors }
    }

    #[must_use]
    pub fn num_active(&self) -> usize {
        self.cursors.len()
    }

    /// Returns the next key with every item carrying it, or `None` when all
    /// cursors are exhausted
    pub fn next_group(&mut self) -> Result<Option<(u32, Vec<T>)>> {
        let Some(min) = self.cursors.iter().filter_map(Cursor::key).min() else {
            return Ok(None);
        };

        let mut group = Vec::new();
        for cursor in &mut self.cursors {
            while cursor.key() == Some(min) {
                if let Some(item) = cursor.advance()? {
                    group.push(item);
                }
            }
        }
        self.cursors.retain(|c| !c.is_exhausted());
        Ok(Some((min, group)))
    }
}
impl<T: Keyed> Iterator for KWayMerge<'_, T> {
    type Item = Result<(u32, Vec<T>)>;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.next_group();
        if next.is_err() {
            self.cursors.clear();
        }
        next.transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[derive(Debug, PartialEq, Eq)]
    struct Tagged(char, u32);
    impl Keyed for Tagged {
        fn key(&self) -> u32 {
            self.1
        }
    }

    fn cursor(tag: char, keys: &[u32]) -> Cursor<'static, Tagged> {
        let items: Vec<Result<Tagged>> = keys.iter().map(|k| Ok(Tagged(tag, *k))).collect();
        Cursor::new("1", Box::new(items.into_iter())).unwrap()
    }

    fn tags(items: &[Tagged]) -> Vec<char> {
        let mut tags: Vec<char> = items.iter().map(|t| t.0).collect();
        tags.sort_unstable();
        tags
    }

    #[test]
    fn test_three_way_merge() {
        let merge = KWayMerge::new(vec![
            cursor('A', &[10, 20, 30]),
            cursor('B', &[10, 25]),
            cursor('C', &[20]),
        ]);
        let groups: Vec<(u32, Vec<char>)> = merge
            .map(|group| {
                let (key, items) = group.unwrap();
                (key, tags(&items))
            })
            .collect();
        assert_eq!(
            groups,
            [
                (10, vec!['A', 'B']),
                (20, vec!['A', 'C']),
                (25, vec!['B']),
                (30, vec!['A']),
            ]
        );
    }

    #[test]
    fn test_repeated_keys_in_one_cursor_share_a_group() {
        let merge = KWayMerge::new(vec![cursor('A', &[5, 5, 7]), cursor('B', &[5])]);
        let groups: Vec<(u32, usize)> = merge
            .map(|group| {
                let (key, items) = group.unwrap();
                (key, items.len())
            })
            .collect();
        assert_eq!(groups, [(5, 3), (7, 1)]);
    }

    #[test]
    fn test_empty_cursors_are_dropped() {
        let mut merge = KWayMerge::new(vec![cursor('A', &[]), cursor('B', &[1])]);
        assert_eq!(merge.num_active(), 1);
        assert!(merge.next_group().unwrap().is_some());
        assert_eq!(merge.num_active(), 0);
        assert!(merge.next_group().unwrap().is_none());
    }

    #[test]
    fn test_unsorted_cursor_fails() {
        let merge = KWayMerge::new(vec![cursor('A', &[10, 5]), cursor('B', &[1])]);
        let results: Vec<_> = merge.collect();
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(Error::Consistency(ConsistencyError::UnsortedInput {
                previous: 10,
                current: 5,
                ..
            }))
        ));
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_source_error_is_propagated() {
        let items: Vec<Result<Tagged>> = vec![
            Ok(Tagged('A', 1)),
            Err(std::io::Error::other("read failure").into()),
        ];
        let failing = Cursor::new("1", Box::new(items.into_iter())).unwrap();
        let mut merge = KWayMerge::new(vec![failing]);
        assert!(matches!(merge.next(), Some(Err(Error::Io(_)))));
        assert!(merge.next().is_none());
    }
}
