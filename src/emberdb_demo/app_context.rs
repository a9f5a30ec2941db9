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

use emberdb_core::{BsonMapper, Config, Database};
use log::info;
use crate::settings::Settings;

/// Everything the driver needs, built once in `main`.
#[derive(Debug, Clone)]
pub struct AppContext {
    settings: Settings,
    mapper: BsonMapper,
}

impl AppContext {

    pub fn new(settings: Settings) -> Self {
        let mut mapper = BsonMapper::new();
        mapper.enum_as_integer = true;
        mapper.serialize_null_values = false;
        mapper.trim_whitespace = false;
        mapper.empty_string_to_null = false;

        AppContext {
            settings,
            mapper,
        }
    }

    #[inline]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[inline]
    pub fn mapper(&self) -> &BsonMapper {
        &self.mapper
    }

    pub fn open_database(&self) -> emberdb_core::Result<Database> {
        let path = &self.settings.database_path;
        info!("Creating instance of EmberDB on {} ...", path.display());
        let config = Config::default().with_mapper(self.mapper.clone());
        Database::open_path_with_config(path, config)
    }

}
