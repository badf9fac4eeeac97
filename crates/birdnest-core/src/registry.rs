//! Time-windowed registry of pilots who recently violated the no-fly zone.
//!
//! The registry is keyed by pilot id. New sightings are merged in with
//! [`ViolatorRegistry::merge`] and old ones dropped with
//! [`ViolatorRegistry::expire`]. Both are pure in-memory operations; loading
//! and saving are left to the caller.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::models::{PilotRecord, ViolationEvent, ViolatorRecord};

/// Default retention window for violators.
pub const DEFAULT_RETENTION_SECS: i64 = 600;

pub fn default_retention() -> Duration {
    Duration::seconds(DEFAULT_RETENTION_SECS)
}

/// Counts produced by one merge call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub inserted: usize,
    pub updated: usize,
}

/// Mapping from pilot id to that pilot's violation record.
///
/// Stored as an object keyed by pilot id. On load the keys are rebuilt from
/// each record's `pilotId`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ViolatorRegistry {
    records: BTreeMap<String, ViolatorRecord>,
}

/// Batch-local reduction of every sighting of one pilot.
struct Sighting {
    pilot: PilotRecord,
    latest: DateTime<Utc>,
    closest: f64,
}

impl ViolatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, pilot_id: &str) -> Option<&ViolatorRecord> {
        self.records.get(pilot_id)
    }

    pub fn contains(&self, pilot_id: &str) -> bool {
        self.records.contains_key(pilot_id)
    }

    /// Insert or replace a record as-is.
    pub fn insert(&mut self, record: ViolatorRecord) {
        self.records.insert(record.pilot.pilot_id.clone(), record);
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViolatorRecord> {
        self.records.values()
    }

    /// Records ordered by most recent violation first, ties by pilot id.
    pub fn by_recency(&self) -> Vec<&ViolatorRecord> {
        let mut records: Vec<&ViolatorRecord> = self.records.values().collect();
        records.sort_by(|a, b| {
            b.time_of_violation
                .cmp(&a.time_of_violation)
                .then_with(|| a.pilot.pilot_id.cmp(&b.pilot.pilot_id))
        });
        records
    }

    /// Merge a batch of sightings into the registry.
    ///
    /// Sightings of the same pilot are first reduced independently (latest
    /// time, smallest distance) so the result does not depend on batch order.
    /// An existing record then takes the batch time unconditionally and keeps
    /// the smaller of the two distances. Contact details of an existing
    /// record are left as they were.
    pub fn merge<I>(&mut self, sightings: I) -> MergeSummary
    where
        I: IntoIterator<Item = (ViolationEvent, PilotRecord)>,
    {
        let mut batch: BTreeMap<String, Sighting> = BTreeMap::new();
        for (event, pilot) in sightings {
            match batch.entry(pilot.pilot_id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(Sighting {
                        pilot,
                        latest: event.detected_at,
                        closest: event.distance_to_center,
                    });
                }
                Entry::Occupied(mut slot) => {
                    let sighting = slot.get_mut();
                    sighting.latest = sighting.latest.max(event.detected_at);
                    sighting.closest = sighting.closest.min(event.distance_to_center);
                }
            }
        }

        let mut summary = MergeSummary::default();
        for (pilot_id, sighting) in batch {
            match self.records.entry(pilot_id) {
                Entry::Vacant(slot) => {
                    slot.insert(ViolatorRecord {
                        pilot: sighting.pilot,
                        time_of_violation: sighting.latest,
                        closest_distance: sighting.closest,
                    });
                    summary.inserted += 1;
                }
                Entry::Occupied(mut slot) => {
                    let record = slot.get_mut();
                    record.time_of_violation = sighting.latest;
                    record.closest_distance = record.closest_distance.min(sighting.closest);
                    summary.updated += 1;
                }
            }
        }
        summary
    }

    /// Remove every record whose last violation is more than `ttl` before
    /// `now`. A record exactly `ttl` old stays. Returns the removed records.
    pub fn expire(&mut self, now: DateTime<Utc>, ttl: Duration) -> Vec<ViolatorRecord> {
        let stale: Vec<String> = self
            .records
            .iter()
            .filter(|(_, record)| is_expired(record, now, ttl))
            .map(|(pilot_id, _)| pilot_id.clone())
            .collect();

        stale
            .into_iter()
            .filter_map(|pilot_id| self.records.remove(&pilot_id))
            .collect()
    }

    /// Copy of the registry without records that would be expired at `now`.
    pub fn retained_at(&self, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            records: self
                .records
                .iter()
                .filter(|(_, record)| !is_expired(record, now, ttl))
                .map(|(pilot_id, record)| (pilot_id.clone(), record.clone()))
                .collect(),
        }
    }
}

fn is_expired(record: &ViolatorRecord, now: DateTime<Utc>, ttl: Duration) -> bool {
    now.signed_duration_since(record.time_of_violation) > ttl
}

impl FromIterator<ViolatorRecord> for ViolatorRegistry {
    fn from_iter<T: IntoIterator<Item = ViolatorRecord>>(iter: T) -> Self {
        let mut registry = Self::new();
        for record in iter {
            registry.insert(record);
        }
        registry
    }
}

impl<'de> Deserialize<'de> for ViolatorRegistry {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = BTreeMap::<String, ViolatorRecord>::deserialize(deserializer)?;
        Ok(stored.into_values().collect())
    }
}
