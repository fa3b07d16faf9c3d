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

//! Named values computed on demand at report time.
//!
//! A user stat has no per-thread state: its callback is invoked whenever a
//! report is produced, e.g. to expose a queue length or a cache size next to
//! the counters and timers.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tickstat_core::{MetricsError, MetricsResult};

type Callback = Box<dyn Fn() -> String + Send + Sync>;

struct Entry {
    description: String,
    callback: Callback,
}

static USER_STATS: Mutex<BTreeMap<String, Arc<Entry>>> = Mutex::new(BTreeMap::new());

fn user_stats() -> MutexGuard<'static, BTreeMap<String, Arc<Entry>>> {
    USER_STATS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registration handle for a user stat; dropping it unregisters the stat.
#[must_use = "the stat is unregistered when the handle is dropped"]
pub struct UserStat {
    name: String,
    entry: Arc<Entry>,
}

impl UserStat {
    /// Registers a stat whose value is produced by `callback`.
    pub fn register(
        name: impl Into<String>,
        description: impl Into<String>,
        callback: impl Fn() -> String + Send + Sync + 'static,
    ) -> MetricsResult<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(MetricsError::EmptyName);
        }
        let entry = Arc::new(Entry {
            description: description.into(),
            callback: Box::new(callback),
        });

        let mut stats = user_stats();
        if stats.contains_key(&name) {
            return Err(MetricsError::DuplicateStat(name));
        }
        stats.insert(name.clone(), Arc::clone(&entry));
        drop(stats);

        log::debug!("Registered user stat '{name}'");
        Ok(Self { name, entry })
    }

    /// The stat's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stat's description.
    pub fn description(&self) -> &str {
        &self.entry.description
    }

    /// Evaluates the callback.
    pub fn value(&self) -> String {
        (self.entry.callback)()
    }
}

impl Drop for UserStat {
    fn drop(&mut self) {
        let mut stats = user_stats();
        let owned = stats
            .get(&self.name)
            .is_some_and(|entry| Arc::ptr_eq(entry, &self.entry));
        if owned {
            stats.remove(&self.name);
        }
    }
}

impl fmt::Debug for UserStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStat")
            .field("name", &self.name)
            .field("description", &self.entry.description)
            .finish_non_exhaustive()
    }
}

/// Visits every registered user stat as `(name, description, value)`, in
/// name order.
///
/// Callbacks run after the registry lock is released, so they may read
/// metrics or register further stats.
pub fn for_each_user_stat(mut visitor: impl FnMut(&str, &str, String)) {
    let entries: Vec<(String, Arc<Entry>)> = user_stats()
        .iter()
        .map(|(name, entry)| (name.clone(), Arc::clone(entry)))
        .collect();
    for (name, entry) in entries {
        visitor(&name, &entry.description, (entry.callback)());
    }
}
