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

use emberdb_core::{Database, Error};
use emberdb_core::bson::{Document, doc};

mod common;

use common::{albums, prepare_dbs};

fn titles(docs: Vec<Document>) -> Vec<String> {
    docs.iter()
        .map(|doc| doc.get_str("title").unwrap().to_string())
        .collect()
}

#[test]
fn test_find_all_in_insertion_order() {
    prepare_dbs("test-find-all-order").iter().for_each(|db| {
        let collection = db.collection::<Document>("albums");
        collection.insert_one(doc! { "_id": 3, "title": "c" }).unwrap();
        collection.insert_one(doc! { "_id": 1, "title": "a" }).unwrap();
        collection.insert_one(doc! { "_id": 2, "title": "b" }).unwrap();

        let docs = collection.find_all().unwrap().collect::<emberdb_core::Result<Vec<Document>>>().unwrap();
        assert_eq!(titles(docs), vec!["c", "a", "b"]);
    });
}

#[test]
fn test_find_by_range_and_nested() {
    prepare_dbs("test-find-range-nested").iter().for_each(|db| {
        let collection = db.collection::<Document>("albums");
        collection.insert_many(albums()).unwrap();

        let docs = collection.find(doc! { "year": { "$gte": 2000 } }).unwrap()
            .collect::<emberdb_core::Result<Vec<Document>>>().unwrap();
        assert_eq!(titles(docs), vec!["Don't Give Me Names"]);

        let docs = collection.find(doc! { "songs.title": "Falling Away From Me" }).unwrap()
            .collect::<emberdb_core::Result<Vec<Document>>>().unwrap();
        assert_eq!(titles(docs), vec!["Issues"]);

        let found = collection.find_one(doc! { "title": "Issues" }).unwrap().unwrap();
        assert_eq!(found.get_i32("year").unwrap(), 1999);

        assert!(collection.find_one(doc! { "title": "Untouchables" }).unwrap().is_none());
    });
}

#[test]
fn test_find_operators() {
    let db = Database::open_memory().unwrap();
    let collection = db.collection::<Document>("albums");
    collection.insert_many(albums()).unwrap();
    collection.insert_one(doc! { "title": "Korn" }).unwrap();

    let count = |filter: Document| collection.count(filter).unwrap();

    assert_eq!(count(doc! {}), 3);
    assert_eq!(count(doc! { "year": null }), 1);
    assert_eq!(count(doc! { "year": { "$exists": false } }), 1);
    assert_eq!(count(doc! { "year": { "$in": [1999, 2010] } }), 1);
    assert_eq!(count(doc! { "year": { "$nin": [1999] } }), 2);
    assert_eq!(count(doc! { "year": { "$ne": 1999 } }), 2);
    assert_eq!(count(doc! { "songs": { "$size": 1 } }), 1);
    assert_eq!(count(doc! { "title": { "$regex": "^issues$", "$options": "i" } }), 1);
    assert_eq!(count(doc! { "year": { "$not": { "$gte": 2000 } } }), 2);
    assert_eq!(count(doc! { "$or": [{ "year": 1999 }, { "title": "Korn" }] }), 2);
    assert_eq!(count(doc! { "$nor": [{ "year": 1999 }, { "title": "Korn" }] }), 1);
    assert_eq!(count(doc! {
        "songs": { "$elemMatch": { "track_number": 2, "length": { "$gt": 200_000 } } }
    }), 1);
    // ranges never cross type brackets
    assert_eq!(count(doc! { "title": { "$gt": 0 } }), 0);

    assert!(collection.exists(doc! { "songs.track_number": 2 }).unwrap());
    assert!(!collection.exists(doc! { "songs.track_number": 3 }).unwrap());
}

#[test]
fn test_find_bad_filter() {
    let db = Database::open_memory().unwrap();
    let collection = db.collection::<Document>("albums");
    collection.insert_many(albums()).unwrap();

    let err = collection.find(doc! { "year": { "$between": [1, 2] } }).err().unwrap();
    assert!(matches!(err, Error::UnknownQueryOperator(_)));

    let err = collection.find(doc! { "$or": 1 }).err().unwrap();
    assert!(matches!(err, Error::ValidationError(_)));
}

#[test]
fn test_find_empty_collection() {
    prepare_dbs("test-find-empty-collection").iter().for_each(|db| {
        let collection = db.collection::<Document>("nothing");
        assert_eq!(collection.find_all().unwrap().count(), 0);
        assert!(collection.find_by_id(1).unwrap().is_none());
        assert_eq!(collection.count_documents().unwrap(), 0);
    });
}

#[test]
fn test_cursor_rewind_sees_new_documents() {
    let db = Database::open_memory().unwrap();
    let collection = db.collection::<Document>("albums");
    collection.insert_one(doc! { "_id": 1 }).unwrap();

    let mut cursor = collection.find_all().unwrap();
    assert!(cursor.advance().unwrap());
    assert_eq!(cursor.deserialize_current().unwrap(), doc! { "_id": 1 });
    assert!(!cursor.advance().unwrap());

    collection.insert_one(doc! { "_id": 2 }).unwrap();
    cursor.rewind();
    assert_eq!(cursor.count(), 2);
}

#[test]
fn test_cursor_skips_deleted() {
    let db = Database::open_memory().unwrap();
    let collection = db.collection::<Document>("albums");
    collection.insert_many(vec![doc! { "_id": 1 }, doc! { "_id": 2 }]).unwrap();

    let mut cursor = collection.find_all().unwrap();
    assert!(cursor.advance().unwrap());
    collection.delete(2).unwrap();
    assert!(!cursor.advance().unwrap());
}
