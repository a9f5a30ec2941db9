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

use std::marker::PhantomData;
use std::sync::Weak;
use bson::Document;
use serde::de::DeserializeOwned;
use crate::{Error, Result};
use crate::coll::collection::{candidate_pkeys, materialize};
use crate::db::db_inner::DatabaseInner;
use crate::query::Filter;

/// A `ClientCursor` is used get the result of a query.
/// You can move the cursor forward using the `advance()`.
///
/// Documents are fetched one at a time from the live store; a document
/// deleted after the cursor was created is skipped. `rewind()` starts the
/// query over, including documents inserted in the meantime.
pub struct ClientCursor<T> {
    db: Weak<DatabaseInner>,
    collection: String,
    filter: Filter,
    includes: Vec<String>,
    pkeys: Option<Vec<Vec<u8>>>,
    position: usize,
    current: Option<Document>,
    _phantom: PhantomData<T>,
}

impl<T: DeserializeOwned> ClientCursor<T> {

    pub(crate) fn new(
        db: Weak<DatabaseInner>,
        collection: String,
        filter: Filter,
        includes: Vec<String>,
    ) -> ClientCursor<T> {
        ClientCursor {
            db,
            collection,
            filter,
            includes,
            pkeys: None,
            position: 0,
            current: None,
            _phantom: PhantomData,
        }
    }

    /// Move to the next matching document. Returns `false` at the end.
    pub fn advance(&mut self) -> Result<bool> {
        let db = self.db.upgrade().ok_or(Error::DbIsClosed)?;
        let state = db.read_state()?;
        self.current = None;

        let spec = match state.collection(&self.collection) {
            Some(spec) => spec,
            None => return Ok(false),
        };

        if self.pkeys.is_none() {
            self.pkeys = Some(candidate_pkeys(&db, spec, &self.filter));
        }
        let pkeys = match &self.pkeys {
            Some(pkeys) => pkeys,
            None => return Ok(false),
        };

        while self.position < pkeys.len() {
            let pkey = &pkeys[self.position];
            self.position += 1;

            let doc = match spec.documents.get(pkey) {
                Some(doc) => doc,
                None => continue,
            };
            if !self.filter.matches(doc) {
                continue;
            }

            self.current = Some(materialize(&state, doc, &self.includes)?);
            return Ok(true);
        }

        Ok(false)
    }

    pub fn deserialize_current(&self) -> Result<T> {
        let db = self.db.upgrade().ok_or(Error::DbIsClosed)?;
        let doc = self.current.clone().ok_or_else(|| {
            Error::ValidationError("the cursor is not positioned on a document".to_string())
        })?;
        db.config().mapper.from_document(doc)
    }

    /// Start over from the beginning of the collection.
    pub fn rewind(&mut self) {
        self.pkeys = None;
        self.position = 0;
        self.current = None;
    }

}

impl<T: DeserializeOwned> Iterator for ClientCursor<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.advance() {
            Ok(false) => None,
            Ok(true) => Some(self.deserialize_current()),
            Err(err) => Some(Err(err)),
        }
    }
}
