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
use emberdb_core::bson::{Document, doc};

mod common;

use common::{albums, prepare_dbs};

#[test]
fn test_delete_by_id() {
    prepare_dbs("test-delete-by-id").iter().for_each(|db| {
        let collection = db.collection::<Document>("albums");
        let result = collection.insert_many(albums()).unwrap();
        let first = result.inserted_ids.get(&0).unwrap().clone();

        let result = collection.delete(first.clone()).unwrap();
        assert_eq!(result.deleted_count, 1);
        assert!(collection.find_by_id(first.clone()).unwrap().is_none());

        // deleting again is not an error
        let result = collection.delete(first).unwrap();
        assert_eq!(result.deleted_count, 0);
        assert_eq!(collection.count_documents().unwrap(), 1);
    });
}

#[test]
fn test_delete_one_and_many() {
    prepare_dbs("test-delete-one-many").iter().for_each(|db| {
        let collection = db.collection::<Document>("albums");
        collection.insert_many(vec![
            doc! { "_id": 1, "year": 1999 },
            doc! { "_id": 2, "year": 2016 },
            doc! { "_id": 3, "year": 2019 },
            doc! { "_id": 4, "year": 2022 },
        ]).unwrap();

        let result = collection.delete_one(doc! { "year": { "$gte": 2015 } }).unwrap();
        assert_eq!(result.deleted_count, 1);
        assert!(collection.find_by_id(2).unwrap().is_none());

        let result = collection.delete_many(doc! { "year": { "$gte": 2015 } }).unwrap();
        assert_eq!(result.deleted_count, 2);

        let result = collection.delete_many(doc! { "year": { "$gte": 2015 } }).unwrap();
        assert_eq!(result.deleted_count, 0);
        assert_eq!(collection.count_documents().unwrap(), 1);
    });
}

#[test]
fn test_delete_all_keeps_indexes() {
    prepare_dbs("test-delete-all").iter().for_each(|db| {
        let collection = db.collection::<Document>("albums");
        collection.ensure_index("title").unwrap();
        collection.insert_many(albums()).unwrap();

        let result = collection.delete_all().unwrap();
        assert_eq!(result.deleted_count, 2);
        assert_eq!(collection.find_all().unwrap().count(), 0);
        assert_eq!(collection.list_indexes().unwrap(), vec!["title".to_string()]);

        // an empty collection clears nothing
        assert_eq!(collection.delete_all().unwrap().deleted_count, 0);

        collection.insert_one(doc! { "title": "Issues" }).unwrap();
        assert_eq!(collection.count(doc! { "title": "Issues" }).unwrap(), 1);
    });
}

#[test]
fn test_drop_collection() {
    prepare_dbs("test-drop-collection").iter().for_each(|db| {
        let collection = db.collection::<Document>("albums");
        collection.ensure_index("title").unwrap();
        collection.insert_many(albums()).unwrap();
        db.collection::<Document>("artists").insert_one(doc! { "name": "Korn" }).unwrap();

        assert_eq!(db.list_collection_names().unwrap(), vec!["albums".to_string(), "artists".to_string()]);

        db.drop_collection("albums").unwrap();
        assert_eq!(db.list_collection_names().unwrap(), vec!["artists".to_string()]);
        assert!(collection.list_indexes().unwrap().is_empty());
        assert_eq!(collection.count_documents().unwrap(), 0);

        // dropping a missing collection succeeds
        db.drop_collection("albums").unwrap();
        db.collection::<Document>("artists").drop().unwrap();
        assert!(db.list_collection_names().unwrap().is_empty());
    });
}

#[test]
fn test_delete_on_memory_db_without_data() {
    let db = Database::open_memory().unwrap();
    let collection = db.collection::<Document>("albums");
    assert_eq!(collection.delete(1).unwrap().deleted_count, 0);
    assert_eq!(collection.delete_many(doc! {}).unwrap().deleted_count, 0);
}
