//! Parallel `get` requests over large gene id lists.
//!
//! Ids are packed into `+`-joined queries, queries are dispatched in groups on
//! a bounded rayon pool, and a failed group is retried from scratch.

use std::thread;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{BatchSettings, RetryPolicy};
use crate::error::KeggError;
use crate::flat_record::{FlatRecord, entry_name, extract_fields, split_records};
use crate::kegg::KeggClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneDetail {
    pub kegg_gene_id: String,
    pub record: FlatRecord,
}

pub struct BatchFetcher<'a, K: KeggClient> {
    client: &'a K,
    settings: BatchSettings,
    retry: RetryPolicy,
}

impl<'a, K: KeggClient> BatchFetcher<'a, K> {
    pub fn new(client: &'a K, settings: BatchSettings, retry: RetryPolicy) -> Self {
        Self {
            client,
            settings,
            retry,
        }
    }

    /// Fetches and parses every id. Ids the server returned nothing for are
    /// simply absent from the result.
    pub fn fetch_details(&self, ids: &[String]) -> Result<Vec<GeneDetail>, KeggError> {
        let queries = pack_queries(ids, self.settings.query_size);
        let groups = queries
            .chunks(self.settings.group_size.max(1))
            .collect::<Vec<_>>();
        let mut details = Vec::with_capacity(ids.len());
        for (index, group) in groups.iter().enumerate() {
            info!(
                group = index + 1,
                groups = groups.len(),
                queries = group.len(),
                "fetching batch"
            );
            let rows = with_retry(&self.retry, || self.run_group(group))?;
            details.extend(rows);
            if index + 1 < groups.len() && !self.settings.pause.is_zero() {
                thread::sleep(self.settings.pause);
            }
        }
        Ok(details)
    }

    fn run_group(&self, group: &[Vec<String>]) -> Result<Vec<GeneDetail>, KeggError> {
        let results = map_parallel(self.settings.workers, group, |query| self.run_query(query))?
            .into_iter()
            .collect::<Result<Vec<_>, KeggError>>()?;
        Ok(results.into_iter().flatten().collect())
    }

    fn run_query(&self, ids: &[String]) -> Result<Vec<GeneDetail>, KeggError> {
        match self.client.get_entries(ids) {
            Ok(text) => Ok(pair_records(ids, &text)),
            Err(err) if err.is_status() => {
                warn!(ids = %ids.join("+"), error = %err, "no entries returned");
                Ok(Vec::new())
            }
            Err(err) => Err(err),
        }
    }
}

/// Maps `f` over `items` on a dedicated pool of `workers` threads.
pub fn map_parallel<T, R, F>(workers: usize, items: &[T], f: F) -> Result<Vec<R>, KeggError>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers)
        .build()
        .map_err(|err| KeggError::WorkerPool(err.to_string()))?;
    Ok(pool.install(|| items.par_iter().map(f).collect()))
}

/// Joins ids into `+`-separated `get` targets of at most `query_size` ids.
pub fn pack_queries(ids: &[String], query_size: usize) -> Vec<Vec<String>> {
    ids.chunks(query_size.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Matches each returned entry to the requested id whose local part (after
/// `org:`) equals its `ENTRY` name. Unknown ids are simply missing from the
/// response, so position is only used for blocks without an `ENTRY` line.
pub fn pair_records(ids: &[String], text: &str) -> Vec<GeneDetail> {
    let blocks = split_records(text);
    let mut details = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.iter().enumerate() {
        let name = entry_name(block);
        let id = match name {
            Some(name) => ids.iter().find(|id| local_part(id) == name),
            None => ids.get(index),
        };
        let Some(id) = id else {
            warn!(entry = ?name, "entry matches no requested id");
            continue;
        };
        details.push(GeneDetail {
            kegg_gene_id: id.clone(),
            record: extract_fields(block),
        });
    }
    details
}

fn local_part(id: &str) -> &str {
    id.split_once(':').map(|(_, local)| local).unwrap_or(id)
}

/// Runs `attempt` until it succeeds or `policy.max_attempts` runs are used up,
/// sleeping `policy.delay` between runs.
pub fn with_retry<T, F>(policy: &RetryPolicy, mut attempt: F) -> Result<T, KeggError>
where
    F: FnMut() -> Result<T, KeggError>,
{
    let mut attempts = 0usize;
    loop {
        attempts += 1;
        match attempt() {
            Ok(value) => return Ok(value),
            Err(err) if attempts < policy.max_attempts => {
                warn!(attempt = attempts, error = %err, delay = ?policy.delay, "batch failed, retrying");
                if !policy.delay.is_zero() {
                    thread::sleep(policy.delay);
                }
            }
            Err(err) => {
                return Err(KeggError::RetriesExhausted {
                    attempts,
                    message: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("eco:b{i:04}")).collect()
    }

    #[test]
    fn queries_are_packed_by_size() {
        let queries = pack_queries(&ids(23), 10);
        assert_eq!(
            queries.iter().map(Vec::len).collect::<Vec<_>>(),
            vec![10, 10, 3]
        );
        assert!(pack_queries(&[], 10).is_empty());
    }

    #[test]
    fn parallel_map_keeps_item_order() {
        let squares = map_parallel(4, &[1u32, 2, 3, 4, 5], |n| n * n).unwrap();
        assert_eq!(squares, vec![1, 4, 9, 16, 25]);
    }

    #[test]
    fn records_pair_in_order() {
        let text = "ENTRY b0001\nORTHOLOGY   K08278  x\n///\nENTRY b0002\n///\n";
        let details = pair_records(&ids(2), text);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].record.koid.as_deref(), Some("ko:K08278"));
        assert_eq!(details[1].kegg_gene_id, "eco:b0002");
        assert_eq!(details[1].record.koid, None);
    }

    #[test]
    fn records_pair_by_entry_name_when_ids_are_missing() {
        let text = "\
ENTRY       b0001             CDS       T00007
ORTHOLOGY   K00001  first
///
ENTRY       b0003             CDS       T00007
ORTHOLOGY   K00003  third
///
";
        let details = pair_records(&ids(3), text);
        assert_eq!(details.len(), 2);
        assert_eq!(details[0].kegg_gene_id, "eco:b0001");
        assert_eq!(details[0].record.koid.as_deref(), Some("ko:K00001"));
        assert_eq!(details[1].kegg_gene_id, "eco:b0003");
        assert_eq!(details[1].record.koid.as_deref(), Some("ko:K00003"));
        assert!(details.iter().all(|d| d.kegg_gene_id != "eco:b0002"));
    }

    #[test]
    fn unmatched_entries_are_dropped() {
        let text = "ENTRY       b9999\nORTHOLOGY   K00001  x\n///\n";
        assert!(pair_records(&ids(1), text).is_empty());
    }

    #[test]
    fn retry_stops_after_max_attempts() {
        let policy = RetryPolicy {
            max_attempts: 3,
            delay: Duration::ZERO,
        };
        let mut calls = 0;
        let result: Result<(), KeggError> = with_retry(&policy, || {
            calls += 1;
            Err(KeggError::KeggHttp("connection reset".to_string()))
        });
        assert_eq!(calls, 3);
        assert_matches!(result, Err(KeggError::RetriesExhausted { attempts: 3, .. }));
    }

    #[test]
    fn retry_returns_first_success() {
        let policy = RetryPolicy {
            max_attempts: 5,
            delay: Duration::ZERO,
        };
        let mut calls = 0;
        let value = with_retry(&policy, || {
            calls += 1;
            if calls < 2 {
                Err(KeggError::KeggHttp("timeout".to_string()))
            } else {
                Ok(calls)
            }
        })
        .unwrap();
        assert_eq!(value, 2);
    }
}
