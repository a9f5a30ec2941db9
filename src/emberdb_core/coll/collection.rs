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

use std::borrow::Borrow;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Weak};
use bson::{Bson, Document};
use bson::oid::ObjectId;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use crate::{ClientCursor, DbRef, Error, Result};
use crate::coll::collection_info::CollectionSpecification;
use crate::db::db_inner::{primary_key_of, DatabaseInner, StoreState};
use crate::errors::DuplicateKeyError;
use crate::index::IndexHelper;
use crate::journal::JournalRecord;
use crate::query::{Filter, Update};
use crate::results::{DeleteResult, InsertManyResult, InsertOneResult, UpdateResult};
use crate::utils::bson::{compare_bson, stacked_key};
use crate::utils::path::{flatten_arrays, for_each_path_value_mut, resolve_path, validate_field_path};

/// Compile a filter document with its constants written the way the
/// database's mapper stores values.
fn compile_filter(db: &DatabaseInner, filter: &Document) -> Result<Filter> {
    let mut filter = Filter::compile(filter)?;
    filter.bind(&db.config().mapper)?;
    Ok(filter)
}

/// Primary keys worth testing against `filter`, in insertion order.
pub(crate) fn candidate_pkeys(db: &DatabaseInner, spec: &CollectionSpecification, filter: &Filter) -> Vec<Vec<u8>> {
    if !filter.is_empty() {
        if let Some(pkeys) = IndexHelper::new(spec).candidates(filter) {
            db.metrics().add_find_by_index_count();
            return pkeys;
        }
        db.metrics().add_full_scan_count();
    }
    spec.documents.keys().cloned().collect()
}

/// Copy of a stored document with the references under `includes`
/// replaced by the documents they point to.
pub(crate) fn materialize(state: &StoreState, doc: &Document, includes: &[String]) -> Result<Document> {
    let mut result = doc.clone();
    for include in includes {
        let path = include.split('.').map(|s| s.to_string()).collect::<Vec<String>>();
        for_each_path_value_mut(&mut result, &path, &mut |value: &mut Bson| -> Result<()> {
            let db_ref = match DbRef::from_bson(value) {
                Some(db_ref) => db_ref,
                None => return Ok(()),
            };
            let target = match state.collection(&db_ref.collection) {
                Some(spec) => {
                    let pkey = stacked_key([&db_ref.id])?;
                    spec.documents.get(&pkey)
                }
                None => None,
            };
            if let Some(target) = target {
                *value = Bson::Document(target.clone());
            }
            Ok(())
        })?;
    }
    Ok(result)
}

/// Values found at `field` that take part in `min`/`max`.
fn aggregatable_values<'a>(doc: &'a Document, field: &str) -> impl Iterator<Item = &'a Bson> {
    flatten_arrays(resolve_path(doc, field))
        .into_iter()
        .filter(|value| !matches!(value, Bson::Null | Bson::Undefined | Bson::Document(_) | Bson::Array(_)))
}

/// Put `_id` first, generating one when it is missing or null.
fn ensure_primary_key(doc: Document) -> Document {
    if !matches!(doc.get("_id"), Some(Bson::Null) | None) {
        return doc;
    }
    let mut result = Document::new();
    result.insert("_id", ObjectId::new());
    for (key, value) in doc {
        if key != "_id" {
            result.insert(key, value);
        }
    }
    result
}

/// A wrapper of collection in struct.
///
/// All CURD methods can be done through this structure. Values of `T` are
/// turned into documents by the database's [`BsonMapper`](crate::BsonMapper)
/// and back.
pub struct Collection<T> {
    db: Weak<DatabaseInner>,
    name: String,
    includes: Vec<String>,
    _phantom: PhantomData<T>,
}

impl<T> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Collection {
            db: self.db.clone(),
            name: self.name.clone(),
            includes: self.includes.clone(),
            _phantom: PhantomData,
        }
    }
}

impl<T> Collection<T>
{

    pub(crate) fn new(db: Weak<DatabaseInner>, name: &str) -> Collection<T> {
        Collection {
            db,
            name: name.into(),
            includes: Vec::new(),
            _phantom: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    fn db(&self) -> Result<Arc<DatabaseInner>> {
        self.db.upgrade().ok_or(Error::DbIsClosed)
    }

    /// Return a handle that replaces the document references found at
    /// `field` with the referenced documents on every read.
    pub fn include(&self, field: &str) -> Collection<T> {
        let mut result = self.clone();
        if !result.includes.iter().any(|f| f == field) {
            result.includes.push(field.to_string());
        }
        result
    }

    /// Return the number of documents in the collection.
    pub fn count_documents(&self) -> Result<u64> {
        let db = self.db()?;
        let state = db.read_state()?;
        let count = state.collection(&self.name)
            .map(|spec| spec.documents.len() as u64)
            .unwrap_or(0);
        Ok(count)
    }

    /// Return the number of documents matching `filter`.
    pub fn count(&self, filter: Document) -> Result<u64> {
        let db = self.db()?;
        let filter = compile_filter(&db, &filter)?;
        let state = db.read_state()?;
        let spec = match state.collection(&self.name) {
            Some(spec) => spec,
            None => return Ok(0),
        };
        let count = candidate_pkeys(&db, spec, &filter)
            .iter()
            .filter_map(|pkey| spec.documents.get(pkey))
            .filter(|doc| filter.matches(doc))
            .count();
        Ok(count as u64)
    }

    pub fn exists(&self, filter: Document) -> Result<bool> {
        let db = self.db()?;
        let filter = compile_filter(&db, &filter)?;
        let state = db.read_state()?;
        let spec = match state.collection(&self.name) {
            Some(spec) => spec,
            None => return Ok(false),
        };
        let found = candidate_pkeys(&db, spec, &filter)
            .iter()
            .filter_map(|pkey| spec.documents.get(pkey))
            .any(|doc| filter.matches(doc));
        Ok(found)
    }

    /// Declare an index on the dotted path `field`. Returns `false` when
    /// the index already exists.
    pub fn ensure_index(&self, field: &str) -> Result<bool> {
        validate_field_path(field)?;
        let db = self.db()?;
        let mut state = db.write_state()?;
        let exists = state.collection(&self.name)
            .map(|spec| spec.indexes.contains_key(field))
            .unwrap_or(false);
        if exists {
            return Ok(false);
        }
        db.commit(&mut state, JournalRecord::CreateIndex {
            collection: self.name.clone(),
            field: field.to_string(),
        })?;
        debug!("index created: {}.{}", self.name, field);
        Ok(true)
    }

    /// Drops the index on `field`. Returns `false` when there is none.
    pub fn drop_index(&self, field: &str) -> Result<bool> {
        let db = self.db()?;
        let mut state = db.write_state()?;
        let exists = state.collection(&self.name)
            .map(|spec| spec.indexes.contains_key(field))
            .unwrap_or(false);
        if !exists {
            return Ok(false);
        }
        db.commit(&mut state, JournalRecord::DropIndex {
            collection: self.name.clone(),
            field: field.to_string(),
        })?;
        db.try_compact(&state)?;
        Ok(true)
    }

    /// Fields with an index, in declaration order.
    pub fn list_indexes(&self) -> Result<Vec<String>> {
        let db = self.db()?;
        let state = db.read_state()?;
        let result = state.collection(&self.name)
            .map(|spec| spec.indexes.keys().cloned().collect())
            .unwrap_or_default();
        Ok(result)
    }

    fn update_matching(&self, filter: Document, update: Document, multi: bool) -> Result<UpdateResult> {
        let db = self.db()?;
        let filter = compile_filter(&db, &filter)?;
        let update = Update::compile(&update)?;
        let mapper = &db.config().mapper;

        let mut state = db.write_state()?;

        let mut matched_count: u64 = 0;
        let mut records = Vec::new();
        if let Some(spec) = state.collection(&self.name) {
            for pkey in candidate_pkeys(&db, spec, &filter) {
                let doc = match spec.documents.get(&pkey) {
                    Some(doc) => doc,
                    None => continue,
                };
                if !filter.matches(doc) {
                    continue;
                }
                matched_count += 1;
                if let Some(new_doc) = update.apply(doc)? {
                    let new_doc = mapper.write(new_doc)?;
                    if new_doc != *doc {
                        records.push(JournalRecord::Put {
                            collection: self.name.clone(),
                            doc: new_doc,
                        });
                    }
                }
                if !multi {
                    break;
                }
            }
        }

        let modified_count = records.len() as u64;
        for record in records {
            db.commit(&mut state, record)?;
        }
        db.try_compact(&state)?;

        Ok(UpdateResult {
            matched_count,
            modified_count,
        })
    }

    /// Updates up to one document matching `filter` in the collection.
    pub fn update_one(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.update_matching(filter, update, false)
    }

    /// Updates all documents matching `filter` in the collection.
    ///
    /// Only the fields named by the update operators change; the rest of
    /// every document is kept as stored.
    pub fn update_many(&self, filter: Document, update: Document) -> Result<UpdateResult> {
        self.update_matching(filter, update, true)
    }

    fn delete_matching(&self, filter: Document, multi: bool) -> Result<DeleteResult> {
        let db = self.db()?;
        let filter = compile_filter(&db, &filter)?;

        let mut state = db.write_state()?;

        let mut ids = Vec::new();
        if let Some(spec) = state.collection(&self.name) {
            for pkey in candidate_pkeys(&db, spec, &filter) {
                let doc = match spec.documents.get(&pkey) {
                    Some(doc) => doc,
                    None => continue,
                };
                if !filter.matches(doc) {
                    continue;
                }
                if let Some(id) = doc.get("_id") {
                    ids.push(id.clone());
                }
                if !multi {
                    break;
                }
            }
        }

        let deleted_count = ids.len() as u64;
        for id in ids {
            db.commit(&mut state, JournalRecord::Delete {
                collection: self.name.clone(),
                id,
            })?;
        }
        db.try_compact(&state)?;

        Ok(DeleteResult {
            deleted_count,
        })
    }

    /// Deletes the document whose `_id` is `id`. A missing document is not
    /// an error, the count is 0.
    pub fn delete(&self, id: impl Into<Bson>) -> Result<DeleteResult> {
        let id = id.into();
        let pkey = stacked_key([&id])?;

        let db = self.db()?;
        let mut state = db.write_state()?;
        let exists = state.collection(&self.name)
            .map(|spec| spec.documents.contains_key(&pkey))
            .unwrap_or(false);
        if !exists {
            return Ok(DeleteResult::default());
        }

        db.commit(&mut state, JournalRecord::Delete {
            collection: self.name.clone(),
            id,
        })?;
        db.try_compact(&state)?;

        Ok(DeleteResult {
            deleted_count: 1,
        })
    }

    /// Deletes up to one document found matching `filter`.
    pub fn delete_one(&self, filter: Document) -> Result<DeleteResult> {
        self.delete_matching(filter, false)
    }

    /// Deletes every document matching `filter`.
    pub fn delete_many(&self, filter: Document) -> Result<DeleteResult> {
        self.delete_matching(filter, true)
    }

    /// Deletes every document. Declared indexes stay, empty.
    pub fn delete_all(&self) -> Result<DeleteResult> {
        let db = self.db()?;
        let mut state = db.write_state()?;
        let deleted_count = state.collection(&self.name)
            .map(|spec| spec.documents.len() as u64)
            .unwrap_or(0);
        if deleted_count == 0 {
            return Ok(DeleteResult::default());
        }

        db.commit(&mut state, JournalRecord::Clear {
            collection: self.name.clone(),
        })?;
        db.try_compact(&state)?;

        Ok(DeleteResult {
            deleted_count,
        })
    }

    /// Remove the documents and the indexes of the collection.
    pub fn drop(&self) -> Result<()> {
        let db = self.db()?;
        drop_collection(&db, &self.name)
    }

    fn aggregate(&self, field: &str, wanted: std::cmp::Ordering) -> Result<Option<Bson>> {
        let db = self.db()?;
        let state = db.read_state()?;
        let spec = match state.collection(&self.name) {
            Some(spec) => spec,
            None => return Ok(None),
        };

        if let Some(index) = spec.indexes.get(field) {
            db.metrics().add_find_by_index_count();
            let key = if wanted == std::cmp::Ordering::Greater {
                index.max_key()
            } else {
                index.min_key()
            };
            return Ok(key.cloned());
        }

        let mut result: Option<&Bson> = None;
        for doc in spec.documents.values() {
            for value in aggregatable_values(doc, field) {
                result = match result {
                    Some(best) if compare_bson(value, best) != wanted => Some(best),
                    _ => Some(value),
                };
            }
        }
        Ok(result.cloned())
    }

    /// The largest value found at `field`, arrays flattened. `None` when
    /// no document carries the field.
    pub fn max(&self, field: &str) -> Result<Option<Bson>> {
        self.aggregate(field, std::cmp::Ordering::Greater)
    }

    /// The smallest value found at `field`, arrays flattened.
    pub fn min(&self, field: &str) -> Result<Option<Bson>> {
        self.aggregate(field, std::cmp::Ordering::Less)
    }

}

pub(crate) fn drop_collection(db: &DatabaseInner, name: &str) -> Result<()> {
    let mut state = db.write_state()?;
    if state.collection(name).is_none() {
        return Ok(());
    }
    db.commit(&mut state, JournalRecord::Drop {
        collection: name.to_string(),
    })?;
    db.try_compact(&state)?;
    debug!("collection dropped: {}", name);
    Ok(())
}

impl<T> Collection<T>
where
    T: Serialize,
{

    /// Inserts `doc` into the collection. A fresh `ObjectId` is assigned
    /// when `_id` is missing or null.
    pub fn insert_one(&self, doc: impl Borrow<T>) -> Result<InsertOneResult> {
        let db = self.db()?;
        let doc = db.config().mapper.to_document::<T>(doc.borrow())?;
        let doc = ensure_primary_key(doc);
        let pkey = primary_key_of(&doc)?;
        let inserted_id = doc.get("_id").cloned().unwrap_or(Bson::Null);

        let mut state = db.write_state()?;
        let duplicated = state.collection(&self.name)
            .map(|spec| spec.documents.contains_key(&pkey))
            .unwrap_or(false);
        if duplicated {
            return Err(DuplicateKeyError {
                name: "_id_".to_string(),
                key: inserted_id.to_string(),
                ns: self.name.clone(),
            }.into());
        }

        db.commit(&mut state, JournalRecord::Put {
            collection: self.name.clone(),
            doc,
        })?;
        db.try_compact(&state)?;

        Ok(InsertOneResult {
            inserted_id,
        })
    }

    /// Inserts the documents one by one. When one fails, the ones before it
    /// stay inserted and the error is returned.
    pub fn insert_many(&self, docs: impl IntoIterator<Item = impl Borrow<T>>) -> Result<InsertManyResult> {
        let mut inserted_ids = HashMap::new();
        for (index, doc) in docs.into_iter().enumerate() {
            let result = self.insert_one(doc)?;
            inserted_ids.insert(index, result.inserted_id);
        }
        Ok(InsertManyResult {
            inserted_ids,
        })
    }

    /// Replace the stored document that has the same `_id` as `doc`.
    pub fn update(&self, doc: impl Borrow<T>) -> Result<()> {
        let db = self.db()?;
        let doc = db.config().mapper.to_document::<T>(doc.borrow())?;
        let id = match doc.get("_id") {
            Some(Bson::Null) | None => return Err(Error::DataHasNoPrimaryKey),
            Some(id) => id.clone(),
        };
        let pkey = stacked_key([&id])?;

        let mut state = db.write_state()?;
        let exists = state.collection(&self.name)
            .map(|spec| spec.documents.contains_key(&pkey))
            .unwrap_or(false);
        if !exists {
            return Err(Error::DocumentNotFound(id.to_string()));
        }

        db.commit(&mut state, JournalRecord::Put {
            collection: self.name.clone(),
            doc,
        })?;
        db.try_compact(&state)?;
        Ok(())
    }

}

impl<T> Collection<T>
where
    T: DeserializeOwned,
{

    /// Every document, in insertion order.
    pub fn find_all(&self) -> Result<ClientCursor<T>> {
        self.find(Document::new())
    }

    /// When query is empty, all the data in the collection will be returned.
    pub fn find(&self, filter: Document) -> Result<ClientCursor<T>> {
        let db = self.db()?;
        let filter = compile_filter(&db, &filter)?;
        Ok(ClientCursor::new(self.db.clone(), self.name.clone(), filter, self.includes.clone()))
    }

    /// The first document matching `filter`, in insertion order.
    pub fn find_one(&self, filter: Document) -> Result<Option<T>> {
        let mut cursor = self.find(filter)?;
        cursor.next().transpose()
    }

    pub fn find_by_id(&self, id: impl Into<Bson>) -> Result<Option<T>> {
        let id = id.into();
        let pkey = stacked_key([&id])?;

        let db = self.db()?;
        let doc = {
            let state = db.read_state()?;
            let found = state.collection(&self.name)
                .and_then(|spec| spec.documents.get(&pkey));
            match found {
                Some(doc) => materialize(&state, doc, &self.includes)?,
                None => return Ok(None),
            }
        };

        let value = db.config().mapper.from_document(doc)?;
        Ok(Some(value))
    }

}
