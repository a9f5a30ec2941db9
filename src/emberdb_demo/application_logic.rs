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

use std::io;
use anyhow::{anyhow, Context, Result};
use bson::doc;
use emberdb_core::{Collection, Database};
use log::{error, info};
use crate::app_context::AppContext;
use crate::models::{Album, AlbumList, Song};
use crate::settings::SettingsError;

pub const COLLECTION_NAME: &str = "albums";

/// Status for a process that failed with `err`.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<SettingsError>().is_some() {
        return 78;
    }
    if let Some(err) = err.downcast_ref::<emberdb_core::Error>() {
        return err.code();
    }
    if let Some(err) = err.downcast_ref::<io::Error>() {
        return err.raw_os_error().unwrap_or(74);
    }
    1
}

/// Walks an album collection through its whole lifecycle.
pub struct ApplicationLogic {
    ctx: AppContext,
}

impl ApplicationLogic {

    pub fn new(ctx: AppContext) -> Self {
        ApplicationLogic { ctx }
    }

    /// Run every phase and return the process status.
    pub fn run(&self) -> i32 {
        match self.run_internal() {
            Ok(()) => 0,
            Err(err) => {
                error!("Application has failed: {:?}", err);
                exit_code(&err)
            }
        }
    }

    fn run_internal(&self) -> Result<()> {
        let db = self.ctx.open_database().context("failed to open the database")?;
        let collection = self.prepare_collection(&db)?;

        self.create_data(&collection).context("failed to create the data")?;
        self.read_data(&collection).context("failed to read the data")?;
        self.update_data(&collection).context("failed to update the data")?;
        self.delete_data(&collection).context("failed to delete the data")?;

        db.close().context("failed to close the database")?;
        info!("Good bye :)");
        Ok(())
    }

    /// Start from an empty collection with an index on `title`.
    pub fn prepare_collection(&self, db: &Database) -> Result<Collection<Album>> {
        db.drop_collection(COLLECTION_NAME)?;

        let collection = db.collection::<Album>(COLLECTION_NAME);
        collection.ensure_index("title")?;
        Ok(collection)
    }

    pub fn create_data(&self, collection: &Collection<Album>) -> Result<()> {
        info!("Creating the data ...");

        // the ids are assigned by the store
        let issues = Album::new(1999, "Issues", vec![
            Song::new(1, "Dead", 1, 12),
            Song::new(2, "Falling Away From Me", 4, 30),
        ]);
        let names = Album::new(2000, "Don't Give Me Names", vec![
            Song::new(1, "Innocent Greed", 3, 51),
        ]);

        let result = collection.insert_one(&issues)?;
        info!("Inserted {} with id {}", issues, result.inserted_id);
        let result = collection.insert_one(&names)?;
        info!("Inserted {} with id {}", names, result.inserted_id);

        Ok(())
    }

    pub fn read_data(&self, collection: &Collection<Album>) -> Result<()> {
        info!("Reading the data ...");

        let all_albums = collection.find_all()?.collect::<emberdb_core::Result<Vec<Album>>>()?;
        info!("Found all albums: {}", AlbumList(&all_albums));

        let last_id = all_albums.last()
            .and_then(|album| album.id)
            .ok_or_else(|| anyhow!("the collection has no album with an id"))?;
        let album_by_id = collection.find_by_id(last_id)?;
        info!("Found album by id: {}", display_option(&album_by_id));

        let album_by_title = collection.find_one(doc! { "title": "Issues" })?;
        info!("Found album by title: {}", display_option(&album_by_title));

        let albums = collection.find(doc! { "year": { "$gte": 2000 } })?
            .collect::<emberdb_core::Result<Vec<Album>>>()?;
        info!("Found albums by expression: {}", AlbumList(&albums));

        let albums = collection.find(doc! { "songs.title": "Falling Away From Me" })?
            .collect::<emberdb_core::Result<Vec<Album>>>()?;
        info!("Found albums by nested document: {}", AlbumList(&albums));

        match collection.max("year")? {
            Some(year) => info!("Latest album year: {}", year),
            None => info!("Latest album year: none"),
        }

        Ok(())
    }

    pub fn update_data(&self, collection: &Collection<Album>) -> Result<()> {
        info!("Updating the data ...");

        let mut album = collection
            .include("songs")
            .find_one(doc! { "title": "Issues" })?
            .ok_or_else(|| anyhow!("album 'Issues' not found"))?;

        album.year = Some(2021);
        album.songs
            .get_or_insert_with(Vec::new)
            .push(Song::new(3, "Trash", 3, 27));
        collection.update(&album)?;
        info!("Updated album: {}", album);

        // partial update of multiple documents
        let result = collection.update_many(
            doc! { "year": { "$gte": 2020 } },
            doc! { "$set": { "title": { "$concat": ["Updated: ", "$title"] } } },
        )?;
        info!("Renamed {} of {} matched albums", result.modified_count, result.matched_count);

        Ok(())
    }

    pub fn delete_data(&self, collection: &Collection<Album>) -> Result<()> {
        info!("Deleting the data ...");

        let first = collection.find_all()?
            .next()
            .transpose()?
            .and_then(|album| album.id)
            .ok_or_else(|| anyhow!("the collection is empty"))?;

        let result = collection.delete(first)?;
        info!("Deleted {} album by id {}", result.deleted_count, first);

        let result = collection.delete_many(doc! { "year": { "$gte": 2015 } })?;
        info!("Deleted {} albums by expression", result.deleted_count);

        let result = collection.delete_all()?;
        info!("Deleted the remaining {} albums", result.deleted_count);

        Ok(())
    }

}

fn display_option(album: &Option<Album>) -> String {
    match album {
        Some(album) => album.to_string(),
        None => "none".to_string(),
    }
}
