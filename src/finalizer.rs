use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

use crate::accumulator::SeriesAccumulator;
use crate::config::EXCLUDED_SERIES;
use crate::importers::workbook_importer::CellValue;

/// One row of the definitions table. The id is nullable: metadata rows with
/// a blank identifier survive consolidation under a null id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DefinitionRow {
    pub id: Option<String>,
    pub group: Option<String>,
    pub name: Option<String>,
    pub unit: Option<String>,
    pub note: Option<String>,
}

/// One row of the observations table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRow {
    pub id: String,
    pub date: String,
    pub value: Option<CellValue>,
}

/// The two consolidated tables, ready for persistence.
#[derive(Debug, Default)]
pub struct ConsolidatedDataset {
    pub definitions: Vec<DefinitionRow>,
    pub observations: Vec<ObservationRow>,
}

/// Flatten the accumulated mappings into the two final tables.
///
/// Each series is sorted ascending by date label before flattening. Labels
/// are compared as text, not parsed as calendar dates: callers must ensure
/// the source labels are lexicographically monotonic with chronological
/// order, or the sort will be semantically wrong.
///
/// Deduplication here keeps the *first* occurrence (definitions by id,
/// observations by (id, date)) — deliberately not unified with the
/// accumulator's last-wins merge rule, which is pinned by tests until a
/// product decision resolves the inconsistency.
pub fn finalize(accumulator: SeriesAccumulator) -> ConsolidatedDataset {
    let mut dataset = ConsolidatedDataset::default();

    let mut seen_ids: HashSet<Option<String>> = HashSet::new();
    for (id, definition) in accumulator.definitions {
        if is_excluded(id.as_deref()) {
            debug!("Excluding definition for {id:?}");
            continue;
        }
        if !seen_ids.insert(id.clone()) {
            continue;
        }
        dataset.definitions.push(DefinitionRow {
            id,
            group: definition.group,
            name: definition.name,
            unit: definition.unit,
            note: definition.note,
        });
    }

    for (id, mut series) in accumulator.observations {
        if is_excluded(Some(id.as_str())) {
            debug!("Excluding {} observations for {id}", series.len());
            continue;
        }
        // Stable sort: among duplicates of a date, the pair appended first
        // (the earlier workbook) stays first and survives deduplication.
        series.sort_by(|a, b| a.date.cmp(&b.date));

        let mut seen_dates: HashSet<String> = HashSet::new();
        for observation in series {
            if !seen_dates.insert(observation.date.clone()) {
                continue;
            }
            dataset.observations.push(ObservationRow {
                id: id.clone(),
                date: observation.date,
                value: observation.value,
            });
        }
    }

    dataset
}

fn is_excluded(id: Option<&str>) -> bool {
    id.is_some_and(|id| EXCLUDED_SERIES.contains(&id))
}
