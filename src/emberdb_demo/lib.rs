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

//! A console walkthrough of EmberDB.
//!
//! It opens a database file, stores two albums with their songs, reads
//! them back in several ways, updates and finally deletes them, logging
//! every step.

pub mod app_context;
pub mod application_logic;
pub mod models;
pub mod settings;

use clap::{Arg, Command as App};

pub use app_context::AppContext;
pub use application_logic::{exit_code, ApplicationLogic};

pub fn build_cli() -> App {
    App::new("emberdb-demo")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Stores, queries, updates and deletes albums with EmberDB")
        .arg(
            Arg::new("database-path")
                .long("database-path")
                .help("path of the database file")
                .env("EMBERDB_DATABASE_PATH")
                .value_name("PATH")
                .num_args(1)
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("settings file, emberdb-demo.toml in the working directory by default")
                .value_name("FILE")
                .num_args(1)
        )
}

#[cfg(test)]
mod tests {
    use super::build_cli;

    #[test]
    fn test_cli_args() {
        let matches = build_cli()
            .try_get_matches_from(["emberdb-demo", "--database-path", "albums.db", "-c", "demo.toml"])
            .unwrap();
        assert_eq!(matches.get_one::<String>("database-path").map(String::as_str), Some("albums.db"));
        assert_eq!(matches.get_one::<String>("config").map(String::as_str), Some("demo.toml"));
    }
}
