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

use emberdb_core::{BsonMapper, Config, Database, DbRef};
use emberdb_core::bson::{Document, doc};
use serde::{Deserialize, Serialize};

mod common;

use common::prepare_db_with_config;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Artist {
    #[serde(rename = "_id")]
    id: i32,
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Album {
    #[serde(rename = "_id")]
    id: i32,
    title: String,
    artist: Artist,
}

fn ref_config() -> Config {
    let mut mapper = BsonMapper::new();
    mapper.register_ref("artist", "artists");
    Config::default().with_mapper(mapper)
}

fn korn() -> Artist {
    Artist {
        id: 7,
        name: Some("Korn".to_string()),
    }
}

#[test]
fn test_include_reference() {
    vec![
        prepare_db_with_config("test-include-reference", ref_config()).unwrap(),
        Database::open_memory_with_config(ref_config()).unwrap(),
    ].iter().for_each(|db| {
        db.collection::<Artist>("artists").insert_one(korn()).unwrap();

        let albums = db.collection::<Album>("albums");
        albums.insert_one(Album {
            id: 1,
            title: "Issues".to_string(),
            artist: korn(),
        }).unwrap();

        // stored as a reference
        let raw = db.collection::<Document>("albums").find_by_id(1).unwrap().unwrap();
        let db_ref = DbRef::from_bson(raw.get("artist").unwrap()).unwrap();
        assert_eq!(db_ref, DbRef::new("artists", 7));

        // without include only the id comes back
        let album = albums.find_by_id(1).unwrap().unwrap();
        assert_eq!(album.artist, Artist { id: 7, name: None });

        let album = albums.include("artist").find_by_id(1).unwrap().unwrap();
        assert_eq!(album.artist, korn());

        let album = albums.include("artist").find_one(doc! { "title": "Issues" }).unwrap().unwrap();
        assert_eq!(album.artist, korn());
    });
}

#[test]
fn test_include_follows_updates() {
    let db = Database::open_memory_with_config(ref_config()).unwrap();
    let artists = db.collection::<Artist>("artists");
    artists.insert_one(korn()).unwrap();

    let albums = db.collection::<Album>("albums").include("artist");
    albums.insert_one(Album { id: 1, title: "Issues".to_string(), artist: korn() }).unwrap();

    artists.update_one(doc! { "_id": 7 }, doc! { "$set": { "name": "KoЯn" } }).unwrap();
    let album = albums.find_by_id(1).unwrap().unwrap();
    assert_eq!(album.artist.name.as_deref(), Some("KoЯn"));

    // a missing target leaves the reference
    artists.delete(7).unwrap();
    let album = albums.find_by_id(1).unwrap().unwrap();
    assert_eq!(album.artist, Artist { id: 7, name: None });
}
