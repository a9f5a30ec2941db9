// Copyright 2024 Vincent Chan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::path::Path;
use std::sync::{Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};
use bson::Document;
use hashbrown::HashMap;
use log::{debug, info};
use crate::{Config, Error, Metrics, Result};
use crate::coll::collection_info::CollectionSpecification;
use crate::journal::{JournalFile, JournalRecord};
use crate::utils::bson::stacked_key;

/// The primary key of a document, encoded for the collection map.
pub(crate) fn primary_key_of(doc: &Document) -> Result<Vec<u8>> {
    let id = doc.get("_id").ok_or(Error::DataHasNoPrimaryKey)?;
    stacked_key([id])
}

pub(crate) fn validate_collection_name(name: &str) -> Result<()> {
    if name.is_empty() || name.starts_with('$') || name.contains('\0') {
        return Err(Error::IllegalCollectionName(name.to_string()));
    }
    Ok(())
}

/// The in-memory image of the store. Only [`StoreState::apply`] mutates
/// it, both for new writes and when the journal is replayed.
#[derive(Default)]
pub(crate) struct StoreState {
    collections: HashMap<String, CollectionSpecification>,
}

impl StoreState {

    pub fn collection(&self, name: &str) -> Option<&CollectionSpecification> {
        self.collections.get(name)
    }

    fn collection_mut(&mut self, name: String) -> &mut CollectionSpecification {
        let spec_name = name.clone();
        self.collections
            .entry(name)
            .or_insert_with(|| CollectionSpecification::new(spec_name))
    }

    pub fn apply(&mut self, record: JournalRecord) -> Result<()> {
        match record {
            JournalRecord::Put { collection, doc } => {
                let pkey = primary_key_of(&doc)?;
                self.collection_mut(collection).put(pkey, doc);
            }
            JournalRecord::Delete { collection, id } => {
                let pkey = stacked_key([&id])?;
                if let Some(spec) = self.collections.get_mut(&collection) {
                    spec.remove(&pkey);
                }
            }
            JournalRecord::Clear { collection } => {
                if let Some(spec) = self.collections.get_mut(&collection) {
                    spec.clear();
                }
            }
            JournalRecord::Drop { collection } => {
                self.collections.remove(&collection);
            }
            JournalRecord::CreateIndex { collection, field } => {
                self.collection_mut(collection).create_index(&field);
            }
            JournalRecord::DropIndex { collection, field } => {
                if let Some(spec) = self.collections.get_mut(&collection) {
                    spec.drop_index(&field);
                }
            }
        }
        Ok(())
    }

    pub fn collection_names(&self) -> Vec<String> {
        let mut names = self.collections
            .values()
            .filter(|spec| !spec.is_empty())
            .map(|spec| spec.name().to_string())
            .collect::<Vec<String>>();
        names.sort();
        names
    }

    /// How many records it takes to rebuild the state from nothing.
    fn live_count(&self) -> u64 {
        self.collections
            .values()
            .map(|spec| (spec.documents.len() + spec.indexes.len()) as u64)
            .sum()
    }

    /// The records that rebuild the state: per collection, the index
    /// declarations first, then the documents in insertion order.
    fn snapshot(&self) -> Vec<JournalRecord> {
        let mut result = Vec::new();
        for name in self.collection_names() {
            let spec = match self.collections.get(&name) {
                Some(spec) => spec,
                None => continue,
            };
            for field in spec.indexes.keys() {
                result.push(JournalRecord::CreateIndex {
                    collection: name.clone(),
                    field: field.clone(),
                });
            }
            for doc in spec.documents.values() {
                result.push(JournalRecord::Put {
                    collection: name.clone(),
                    doc: doc.clone(),
                });
            }
        }
        result
    }

}

pub(crate) struct DatabaseInner {
    state:   RwLock<StoreState>,
    journal: Mutex<Option<JournalFile>>,
    config:  Config,
    metrics: Metrics,
}

impl DatabaseInner {

    pub fn open_path(path: &Path, config: Config) -> Result<DatabaseInner> {
        let (journal, records) = JournalFile::open(path, &config)?;

        let mut state = StoreState::default();
        for record in records {
            state.apply(record)?;
        }

        let inner = DatabaseInner {
            state: RwLock::new(state),
            journal: Mutex::new(Some(journal)),
            config,
            metrics: Metrics::new(),
        };

        {
            let state = inner.state.read()?;
            inner.try_compact(&state)?;
        }

        info!("database opened: {}", path.display());

        Ok(inner)
    }

    pub fn open_memory(config: Config) -> Result<DatabaseInner> {
        debug!("memory database opened");
        Ok(DatabaseInner {
            state: RwLock::new(StoreState::default()),
            journal: Mutex::new(None),
            config,
            metrics: Metrics::new(),
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn metrics(&self) -> Metrics {
        self.metrics.clone()
    }

    pub fn read_state(&self) -> Result<RwLockReadGuard<StoreState>> {
        Ok(self.state.read()?)
    }

    pub fn write_state(&self) -> Result<RwLockWriteGuard<StoreState>> {
        Ok(self.state.write()?)
    }

    /// Journal the record, then apply it. The caller holds the write lock
    /// and has already checked the record is valid.
    pub fn commit(&self, state: &mut StoreState, record: JournalRecord) -> Result<()> {
        validate_collection_name(record.collection())?;
        {
            let mut journal = self.journal.lock()?;
            if let Some(journal) = journal.as_mut() {
                journal.append(&record)?;
            }
        }
        state.apply(record)
    }

    /// Compact the journal when it holds too many dead frames.
    pub fn try_compact(&self, state: &StoreState) -> Result<()> {
        let mut journal = self.journal.lock()?;
        let journal = match journal.as_mut() {
            Some(journal) => journal,
            None => return Ok(()),
        };

        let dead = journal.frame_count().saturating_sub(state.live_count());
        if dead <= self.config.journal_full_size {
            return Ok(());
        }

        debug!("{} dead frames in {}, compacting", dead, journal.path().display());
        journal.rewrite(state.snapshot())?;
        self.metrics.add_compaction_count();
        Ok(())
    }

    pub fn compact(&self) -> Result<()> {
        let state = self.state.read()?;
        let mut journal = self.journal.lock()?;
        if let Some(journal) = journal.as_mut() {
            journal.rewrite(state.snapshot())?;
            self.metrics.add_compaction_count();
        }
        Ok(())
    }

    /// Flush the journal and release the file. Later operations fail with
    /// `DbIsClosed` once the last handle is gone.
    pub fn close(&self) -> Result<()> {
        let _state = self.state.write()?;
        let mut journal = self.journal.lock()?;
        if let Some(mut journal) = journal.take() {
            journal.sync()?;
            info!("database closed: {}", journal.path().display());
        }
        Ok(())
    }

}
