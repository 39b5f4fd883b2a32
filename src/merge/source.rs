use auto_impl::auto_impl;
use indexmap::IndexMap;

use super::item::{InterimHeader, InterimSaItem};
use crate::sa::SaInterval;
use crate::Result;

/// Boxed fallible item stream borrowed from its source
pub type ItemIter<'a, T> = Box<dyn Iterator<Item = Result<T>> + 'a>;

/// An upstream producer of per-position annotation items.
///
/// Items for one chromosome must be ordered by position.
#[auto_impl(&, Box, Arc)]
pub trait SaItemSource: Send + Sync {
    /// Version information, required for annotation sources
    fn header(&self) -> Option<&InterimHeader>;

    /// Chromosomes this source has items for
    fn ref_names(&self) -> Vec<String>;

    fn items(&self, ref_name: &str) -> Result<ItemIter<'_, InterimSaItem>>;
}

/// An upstream producer of region-level annotations
#[auto_impl(&, Box, Arc)]
pub trait IntervalSource: Send + Sync {
    fn header(&self) -> Option<&InterimHeader>;

    fn ref_names(&self) -> Vec<String>;

    fn intervals(&self, ref_name: &str) -> Result<ItemIter<'_, SaInterval>>;
}

/// A source holding its items in memory, grouped by chromosome
#[derive(Clone, Debug, Default)]
pub struct MemorySource<T> {
    header: Option<InterimHeader>,
    items: IndexMap<String, Vec<T>>,
}
impl<T> MemorySource<T> {
    #[must_use]
    pub fn new(header: Option<InterimHeader>) -> Self {
        Self {
            header,
            items: IndexMap::new(),
        }
    }

    pub fn push(&mut self, ref_name: &str, item: T) {
        if let Some(items) = self.items.get_mut(ref_name) {
            items.push(item);
        } else {
            self.items.insert(ref_name.to_string(), vec![item]);
        }
    }

    #[must_use]
    pub fn with_items(mut self, ref_name: &str, items: impl IntoIterator<Item = T>) -> Self {
        for item in items {
            self.push(ref_name, item);
        }
        self
    }

    fn stream(&self, ref_name: &str) -> ItemIter<'_, T>
    where
        T: Clone,
    {
        Box::new(
            self.items
                .get(ref_name)
                .into_iter()
                .flatten()
                .cloned()
                .map(Ok),
        )
    }
}
impl SaItemSource for MemorySource<InterimSaItem> {
    fn header(&self) -> Option<&InterimHeader> {
        self.header.as_ref()
    }

    fn ref_names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    fn items(&self, ref_name: &str) -> Result<ItemIter<'_, InterimSaItem>> {
        Ok(self.stream(ref_name))
    }
}
impl IntervalSource for MemorySource<SaInterval> {
    fn header(&self) -> Option<&InterimHeader> {
        self.header.as_ref()
    }

    fn ref_names(&self) -> Vec<String> {
        self.items.keys().cloned().collect()
    }

    fn intervals(&self, ref_name: &str) -> Result<ItemIter<'_, SaInterval>> {
        Ok(self.stream(ref_name))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::sa::GenomeAssembly;

    #[test]
    fn test_memory_source_streams_by_chromosome() {
        let header = InterimHeader::new("dbSNP", "151", 0, GenomeAssembly::GRCh38);
        let source = MemorySource::new(Some(header))
            .with_items(
                "1",
                [
                    InterimSaItem::annotation("dbsnp", "1", 10, "{}"),
                    InterimSaItem::annotation("dbsnp", "1", 20, "{}"),
                ],
            )
            .with_items("2", [InterimSaItem::annotation("dbsnp", "2", 5, "{}")]);

        assert_eq!(source.ref_names(), ["1", "2"]);
        let positions: Vec<u32> = source
            .items("1")
            .unwrap()
            .map(|item| item.unwrap().position())
            .collect();
        assert_eq!(positions, [10, 20]);
        assert_eq!(source.items("MT").unwrap().count(), 0);
    }

    #[test]
    fn test_sources_behind_pointers() {
        let source = Arc::new(MemorySource::<InterimSaItem>::new(None));
        let shared: Box<dyn SaItemSource> = Box::new(Arc::clone(&source));
        assert!(shared.header().is_none());
        assert!(shared.ref_names().is_empty());
    }
}
