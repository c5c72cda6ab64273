//! Batch mutator: select identifiers from rows, then mutate them one by one.
//!
//! Exactly one remote call is in flight at a time. After every call,
//! including the last, the mutator pauses for the configured delay so the
//! provider's rate limit is respected. The first failed call halts the batch;
//! mutations already applied are not undone.

use crate::billing::BillingError;
use crate::error::{BatchError, Result};
use crate::row::Row;
use crate::selection::{FieldMapping, Selection};
use log::{debug, info};
use std::time::Duration;

/// Default pause between remote calls.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(100);

/// Waits out the inter-call delay.
pub trait Pacer {
    fn pause(&mut self, delay: Duration);
}

/// Pacer that blocks the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPacer;

impl Pacer for ThreadPacer {
    fn pause(&mut self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Counts for one completed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunSummary {
    /// Rows considered after header skipping.
    pub rows: usize,

    /// Rows that passed the selection.
    pub selected: usize,

    /// Remote calls that succeeded.
    pub completed: usize,
}

/// Drives a remote operation over the identifiers selected from a row set.
pub struct BatchMutator<P: Pacer = ThreadPacer> {
    delay: Duration,
    pacer: P,
}

impl BatchMutator<ThreadPacer> {
    /// Creates a mutator that sleeps `delay` after each call.
    pub fn new(delay: Duration) -> Self {
        Self::with_pacer(delay, ThreadPacer)
    }
}

impl Default for BatchMutator<ThreadPacer> {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl<P: Pacer> BatchMutator<P> {
    pub fn with_pacer(delay: Duration, pacer: P) -> Self {
        BatchMutator { delay, pacer }
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    /// Filters rows and extracts identifiers, in row order.
    ///
    /// Runs over every row before anything is mutated, so a row that lacks
    /// the match or identifier field fails the batch up front.
    pub fn select(
        &self,
        rows: &[Row],
        mapping: &FieldMapping,
        selection: &Selection,
    ) -> Result<Vec<String>> {
        let candidates = if mapping.header_skip {
            rows.get(1..).unwrap_or_default()
        } else {
            rows
        };

        let mut ids = Vec::new();
        for row in candidates {
            if let Some(index) = mapping.match_field {
                if !selection.matches(row.require(index)?) {
                    continue;
                }
            }
            ids.push(row.require(mapping.id_field)?.to_string());
        }

        debug!("Selected {} of {} rows", ids.len(), candidates.len());
        Ok(ids)
    }

    /// Selects identifiers and applies `operation` to each in turn.
    pub fn run<F>(
        &mut self,
        rows: &[Row],
        mapping: &FieldMapping,
        selection: &Selection,
        mut operation: F,
    ) -> Result<RunSummary>
    where
        F: FnMut(&str) -> std::result::Result<(), BillingError>,
    {
        let ids = self.select(rows, mapping, selection)?;
        let mut summary = RunSummary {
            rows: if mapping.header_skip {
                rows.len().saturating_sub(1)
            } else {
                rows.len()
            },
            selected: ids.len(),
            completed: 0,
        };

        for id in ids {
            info!("{}", id);
            operation(&id).map_err(|source| BatchError::Remote { id, source })?;
            summary.completed += 1;
            self.pacer.pause(self.delay);
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingPacer {
        pauses: Vec<Duration>,
    }

    impl Pacer for CountingPacer {
        fn pause(&mut self, delay: Duration) {
            self.pauses.push(delay);
        }
    }

    fn rows(data: &[&[&str]]) -> Vec<Row> {
        data.iter()
            .enumerate()
            .map(|(i, fields)| Row::new(i as u64 + 1, fields.iter().copied()))
            .collect()
    }

    fn mutator() -> BatchMutator<CountingPacer> {
        BatchMutator::with_pacer(Duration::from_millis(100), CountingPacer::default())
    }

    #[test]
    fn test_header_is_never_selected() {
        let rows = rows(&[&["id", "name"], &["c1", "name-a"], &["c2", "other"]]);
        let ids = mutator()
            .select(&rows, &FieldMapping::with_header(1, 0), &Selection::prefix("name"))
            .unwrap();
        assert_eq!(ids, vec!["c1"]);
    }

    #[test]
    fn test_every_row_mapping_includes_first_row() {
        let rows = rows(&[&["SAVE10"], &["SAVE20"]]);
        let ids = mutator()
            .select(&rows, &FieldMapping::every_row(0), &Selection::prefix("nothing"))
            .unwrap();
        assert_eq!(ids, vec!["SAVE10", "SAVE20"]);
    }

    #[test]
    fn test_header_only_file_selects_nothing() {
        let rows = rows(&[&["id", "name"]]);
        let ids = mutator()
            .select(&rows, &FieldMapping::with_header(1, 0), &Selection::All)
            .unwrap();
        assert!(ids.is_empty());

        let ids = mutator()
            .select(&[], &FieldMapping::with_header(1, 0), &Selection::All)
            .unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_pause_after_every_call() {
        let rows = rows(&[&["a"], &["b"], &["c"]]);
        let mut mutator = mutator();
        let mut calls = Vec::new();

        let summary = mutator
            .run(&rows, &FieldMapping::every_row(0), &Selection::All, |id| {
                calls.push(id.to_string());
                Ok(())
            })
            .unwrap();

        assert_eq!(calls, vec!["a", "b", "c"]);
        assert_eq!(mutator.pacer().pauses, vec![Duration::from_millis(100); 3]);
        assert_eq!(
            summary,
            RunSummary {
                rows: 3,
                selected: 3,
                completed: 3
            }
        );
    }

    #[test]
    fn test_failure_halts_remaining_batch() {
        let rows = rows(&[&["a"], &["b"], &["c"]]);
        let mut mutator = mutator();
        let mut calls = Vec::new();

        let result = mutator.run(&rows, &FieldMapping::every_row(0), &Selection::All, |id| {
            calls.push(id.to_string());
            if id == "b" {
                Err(BillingError::InvalidResponse("rejected".to_string()))
            } else {
                Ok(())
            }
        });

        match result {
            Err(BatchError::Remote { id, .. }) => assert_eq!(id, "b"),
            other => panic!("Expected Remote error, got {:?}", other),
        }
        assert_eq!(calls, vec!["a", "b"]);
        assert_eq!(mutator.pacer().pauses.len(), 1);
    }

    #[test]
    fn test_missing_field_fails_before_any_call() {
        let rows = rows(&[&["id", "a", "b"], &["s1", "x", "y"], &["s2", "x"]]);
        let mut mutator = BatchMutator::with_pacer(Duration::ZERO, CountingPacer::default());
        let mut calls = 0;

        let result = mutator.run(
            &rows,
            &FieldMapping::with_header(2, 0),
            &Selection::All,
            |_| {
                calls += 1;
                Ok(())
            },
        );

        assert!(matches!(
            result,
            Err(BatchError::MissingField { line: 3, index: 2, .. })
        ));
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_identifier_is_configured_field() {
        let rows = rows(&[&["hdr", "hdr", "hdr", "hdr"], &["x", "y", "sub_9", "VIP"]]);
        let mapping = FieldMapping {
            header_skip: true,
            match_field: Some(3),
            id_field: 2,
        };
        let ids = mutator()
            .select(&rows, &mapping, &Selection::prefix("VIP"))
            .unwrap();
        assert_eq!(ids, vec!["sub_9"]);
    }
}
