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

use emberdb_core::Database;
use emberdb_core::bson::{Bson, Document, doc};

mod common;

use common::{albums, prepare_dbs};

#[test]
fn test_max_min_scan() {
    prepare_dbs("test-max-min-scan").iter().for_each(|db| {
        let collection = db.collection::<Document>("albums");
        collection.insert_many(albums()).unwrap();
        collection.insert_one(doc! { "title": "Korn", "year": Bson::Null }).unwrap();

        assert_eq!(collection.max("year").unwrap(), Some(Bson::Int32(2000)));
        assert_eq!(collection.min("year").unwrap(), Some(Bson::Int32(1999)));

        // arrays are flattened
        assert_eq!(collection.max("songs.length").unwrap(), Some(Bson::Int64(270_000)));
        assert_eq!(collection.min("songs.track_number").unwrap(), Some(Bson::Int32(1)));
    });
}

#[test]
fn test_max_min_with_index() {
    prepare_dbs("test-max-min-index").iter().for_each(|db| {
        let metrics = db.metrics();
        metrics.enable();

        let collection = db.collection::<Document>("albums");
        collection.ensure_index("year").unwrap();
        collection.insert_many(albums()).unwrap();

        assert_eq!(collection.max("year").unwrap(), Some(Bson::Int32(2000)));
        assert_eq!(collection.min("year").unwrap(), Some(Bson::Int32(1999)));
        assert_eq!(metrics.find_by_index_count(), 2);

        collection.update_one(doc! { "year": 1999 }, doc! { "$set": { "year": 2021 } }).unwrap();
        assert_eq!(collection.max("year").unwrap(), Some(Bson::Int32(2021)));
    });
}

#[test]
fn test_max_empty() {
    let db = Database::open_memory().unwrap();
    let collection = db.collection::<Document>("albums");
    assert_eq!(collection.max("year").unwrap(), None);

    collection.insert_one(doc! { "title": "Issues" }).unwrap();
    assert_eq!(collection.max("year").unwrap(), None);
    assert_eq!(collection.min("year").unwrap(), None);
}

#[test]
fn test_count_and_exists() {
    prepare_dbs("test-count-exists").iter().for_each(|db| {
        let collection = db.collection::<Document>("albums");
        collection.insert_many(albums()).unwrap();

        assert_eq!(collection.count_documents().unwrap(), 2);
        assert_eq!(collection.count(doc! { "year": { "$lt": 2000 } }).unwrap(), 1);
        assert!(collection.exists(doc! { "title": "Issues" }).unwrap());
        assert!(!collection.exists(doc! { "title": "Untouchables" }).unwrap());
    });
}
