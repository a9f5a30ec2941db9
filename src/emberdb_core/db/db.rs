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
use std::sync::Arc;
use log::info;
use crate::{Collection, Config, Metrics, Result};
use crate::coll::collection::drop_collection;
use crate::db::db_inner::{validate_collection_name, DatabaseInner};

///
/// API wrapper for Rust-level
///
/// [open_path]: #method.open_path
/// [collection]: #method.collection
///
/// Use [open_path] API to open a database. The journal file will be
/// created in the path user provided when it does not exist yet.
///
/// When you own an instance of a Database, the instance holds a file
/// descriptor of the journal file, locked exclusively. When the Database
/// instance is dropped, the lock of the file will be released.
///
/// # Collection
/// A [Collection](./struct.Collection.html) is a dataset of a kind of data.
/// Collections are created by the first write, use [collection] to
/// obtain one.
///
/// # Example
///
/// ```rust
/// use emberdb_core::Database;
/// use emberdb_core::bson::{Document, doc};
///
/// let db = Database::open_memory().unwrap();
/// let collection = db.collection::<Document>("books");
///
/// let docs = vec![
///     doc! { "title": "1984", "author": "George Orwell" },
///     doc! { "title": "Animal Farm", "author": "George Orwell" },
///     doc! { "title": "The Great Gatsby", "author": "F. Scott Fitzgerald" },
/// ];
/// collection.insert_many(docs).unwrap();
/// assert_eq!(collection.count_documents().unwrap(), 3);
/// ```
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {

    /// Return the version of package version in string.
    /// Defined in `Cargo.toml`.
    pub fn get_version() -> String {
        const VERSION: &str = env!("CARGO_PKG_VERSION");
        VERSION.into()
    }

    pub fn open_memory() -> Result<Database> {
        Database::open_memory_with_config(Config::default())
    }

    pub fn open_memory_with_config(config: Config) -> Result<Database> {
        let inner = DatabaseInner::open_memory(config)?;

        Ok(Database {
            inner: Arc::new(inner),
        })
    }

    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Database> {
        Database::open_path_with_config(path, Config::default())
    }

    pub fn open_path_with_config<P: AsRef<Path>>(path: P, config: Config) -> Result<Database> {
        let inner = DatabaseInner::open_path(path.as_ref(), config)?;

        Ok(Database {
            inner: Arc::new(inner),
        })
    }

    /// Return a handle of the collection named `name`. Nothing is written
    /// until the first document goes in.
    pub fn collection<T>(&self, name: &str) -> Collection<T> {
        Collection::new(Arc::downgrade(&self.inner), name)
    }

    /// Remove the collection with its documents and indexes.
    pub fn drop_collection(&self, name: &str) -> Result<()> {
        validate_collection_name(name)?;
        drop_collection(&self.inner, name)
    }

    /// Gets the names of the collections in the database, sorted.
    pub fn list_collection_names(&self) -> Result<Vec<String>> {
        let state = self.inner.read_state()?;
        Ok(state.collection_names())
    }

    /// Rewrite the journal so it holds the live documents and indexes only.
    pub fn compact(&self) -> Result<()> {
        self.inner.compact()
    }

    pub fn metrics(&self) -> Metrics {
        self.inner.metrics()
    }

    pub fn config(&self) -> &Config {
        self.inner.config()
    }

    /// Flush and release the journal. Collection handles obtained from this
    /// database fail with `DbIsClosed` afterwards.
    pub fn close(self) -> Result<()> {
        self.inner.close()?;
        info!("database handle released");
        Ok(())
    }

}
