use tracing::debug;

use crate::importers::workbook_importer::{DefinitionMap, SeriesMap, WorkbookExtract};

/// Accumulates per-workbook extraction results over one run.
///
/// An explicit value owned and threaded by the caller; nothing is shared
/// across runs. Definitions merge last-writer-wins, observations pool with
/// no deduplication (duplicates collapse later, during finalization).
#[derive(Debug, Default)]
pub struct SeriesAccumulator {
    pub definitions: DefinitionMap,
    pub observations: SeriesMap,
}

impl SeriesAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one workbook's extraction result in.
    pub fn absorb(&mut self, extract: WorkbookExtract) {
        self.merge_definitions(extract.definitions);
        self.merge_observations(extract.observations);
    }

    /// Insert or overwrite definitions by identifier. The last workbook to
    /// define an identifier wins; there is no conflict detection.
    pub fn merge_definitions(&mut self, new: DefinitionMap) {
        for (id, definition) in new {
            if self.definitions.insert(id.clone(), definition).is_some() {
                debug!("Definition for {id:?} overwritten by a later workbook");
            }
        }
    }

    /// Append observations under the matching identifier, creating the
    /// series on first sight. The same (id, date) pair may appear twice when
    /// two workbooks report it.
    pub fn merge_observations(&mut self, new: SeriesMap) {
        for (id, observations) in new {
            self.observations.entry(id).or_default().extend(observations);
        }
    }
}
