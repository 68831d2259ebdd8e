//! Intra-batch deduplication on a normalized (title, date, venue) key.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use tracing::debug;

use crate::domain::{DateGranularity, DedupKey, EventCandidate};

/// Which instance survives when several candidates share a dedup key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupPolicy {
    /// Keep the first candidate in input order.
    FirstSeen,
    /// Keep the best-scored candidate; ties go to the smaller (url, description).
    HighestScore,
}

/// Collapses candidates sharing a normalized (title, date, venue) key.
///
/// Output is ordered by key, so it never depends on discovery order.
#[derive(Debug, Clone, Copy)]
pub struct Deduplicator {
    policy: DedupPolicy,
    granularity: DateGranularity,
}

fn outranks(challenger: &EventCandidate, incumbent: &EventCandidate) -> bool {
    match challenger
        .quality_score
        .total_cmp(&incumbent.quality_score)
    {
        Ordering::Greater => true,
        Ordering::Less => false,
        Ordering::Equal => {
            (&challenger.url, &challenger.description) < (&incumbent.url, &incumbent.description)
        }
    }
}

impl Deduplicator {
    pub fn new(policy: DedupPolicy, granularity: DateGranularity) -> Self {
        Self {
            policy,
            granularity,
        }
    }

    pub fn policy(&self) -> DedupPolicy {
        self.policy
    }

    pub fn dedupe(&self, candidates: Vec<EventCandidate>) -> Vec<EventCandidate> {
        let total = candidates.len();
        let mut by_key: BTreeMap<DedupKey, EventCandidate> = BTreeMap::new();

        for mut candidate in candidates {
            candidate.key_granularity = self.granularity;
            match by_key.entry(candidate.dedup_key(self.granularity)) {
                Entry::Vacant(slot) => {
                    slot.insert(candidate);
                }
                Entry::Occupied(mut slot) => {
                    debug!(key = %slot.key(), "Duplicate candidate");
                    if self.policy == DedupPolicy::HighestScore && outranks(&candidate, slot.get())
                    {
                        slot.insert(candidate);
                    }
                }
            }
        }

        debug!("Deduplicated {} candidates into {}", total, by_key.len());
        by_key.into_values().collect()
    }
}
