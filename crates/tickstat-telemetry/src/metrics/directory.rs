// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Process-wide name → metric directories, one per metric kind.

use super::kind::MetricKind;
use super::named::NamedMetric;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tickstat_core::{MetricsError, MetricsResult};

/// Directory of every live [`NamedMetric`] of one kind.
///
/// Entries are weak, so the directory never keeps a metric alive and never
/// hands out a destroyed one. Membership changes and enumeration are
/// serialised by a directory-wide lock that is distinct from every metric's
/// own lock; no metric lock is ever taken while it is held.
pub struct Directory<K: MetricKind> {
    entries: Mutex<BTreeMap<String, Weak<NamedMetric<K>>>>,
}

impl<K: MetricKind> Directory<K> {
    /// Creates an empty directory.
    pub const fn new() -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, BTreeMap<String, Weak<NamedMetric<K>>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds a metric under its name.
    ///
    /// Fails if a live metric already holds the name. An entry whose metric
    /// is mid-destruction counts as free.
    pub(crate) fn insert(&self, metric: &Arc<NamedMetric<K>>) -> MetricsResult<()> {
        let mut entries = self.entries();
        if let Some(existing) = entries.get(metric.name()) {
            if existing.strong_count() > 0 {
                return Err(MetricsError::DuplicateName {
                    kind: K::TYPE,
                    name: metric.name().to_string(),
                });
            }
        }
        entries.insert(metric.name().to_string(), Arc::downgrade(metric));
        Ok(())
    }

    /// Removes the entry for `name` if it still refers to `metric`.
    pub(crate) fn remove(&self, name: &str, metric: *const NamedMetric<K>) {
        let mut entries = self.entries();
        let owned = entries
            .get(name)
            .is_some_and(|entry| std::ptr::eq(entry.as_ptr(), metric));
        if owned {
            entries.remove(name);
        }
    }

    /// Looks up a live metric by name.
    pub fn get(&self, name: &str) -> Option<Arc<NamedMetric<K>>> {
        self.entries().get(name).and_then(Weak::upgrade)
    }

    /// Number of live metrics.
    pub fn len(&self) -> usize {
        self.entries()
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    /// Returns `true` if no live metric is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of the live metrics, in name order.
    pub fn names(&self) -> Vec<String> {
        self.entries()
            .iter()
            .filter(|(_, entry)| entry.strong_count() > 0)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Visits every live metric.
    ///
    /// Metrics are visited in name order, which is convenient for reports but
    /// not part of the contract. The directory lock is released before the
    /// first visit, so the visitor may take snapshots or register metrics.
    pub fn for_each(&self, mut visitor: impl FnMut(&NamedMetric<K>)) {
        let metrics: Vec<Arc<NamedMetric<K>>> = {
            let entries = self.entries();
            entries.values().filter_map(Weak::upgrade).collect()
        };
        for metric in &metrics {
            visitor(metric);
        }
    }
}

impl<K: MetricKind> Default for Directory<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: MetricKind> fmt::Debug for Directory<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Directory")
            .field("kind", &K::TYPE)
            .field("names", &self.names())
            .finish()
    }
}
