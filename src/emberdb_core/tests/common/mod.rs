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

use std::path::PathBuf;
use std::env;
use emberdb_core::{Config, Database, Result};
use emberdb_core::bson::{Document, doc};

#[allow(dead_code)]
pub fn mk_db_path(db_name: &str) -> PathBuf {
    let mut db_path = env::temp_dir();
    let db_filename = format!("{}-{}.emberdb", db_name, std::process::id());
    db_path.push(db_filename);
    db_path
}

#[allow(dead_code)]
pub fn clean_db_path(db_path: &PathBuf) {
    let _ = std::fs::remove_file(db_path);
}

#[allow(dead_code)]
pub fn prepare_db_with_config(db_name: &str, config: Config) -> Result<Database> {
    let db_path = mk_db_path(db_name);
    clean_db_path(&db_path);
    Database::open_path_with_config(db_path.as_path(), config)
}

#[allow(dead_code)]
pub fn prepare_db(db_name: &str) -> Result<Database> {
    prepare_db_with_config(db_name, Config::default())
}

/// A file database and a memory database, the usual pair to run a test on.
#[allow(dead_code)]
pub fn prepare_dbs(db_name: &str) -> Vec<Database> {
    vec![
        prepare_db(db_name).unwrap(),
        Database::open_memory().unwrap(),
    ]
}

#[allow(dead_code)]
pub fn albums() -> Vec<Document> {
    vec![
        doc! {
            "year": 1999,
            "title": "Issues",
            "songs": [
                { "track_number": 1, "title": "Dead", "length": 72_000_i64 },
                { "track_number": 2, "title": "Falling Away From Me", "length": 270_000_i64 },
            ],
        },
        doc! {
            "year": 2000,
            "title": "Don't Give Me Names",
            "songs": [
                { "track_number": 1, "title": "Innocent Greed", "length": 231_000_i64 },
            ],
        },
    ]
}
