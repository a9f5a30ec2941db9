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

//! Entry point of the demo.
//!
//! Run it with `cargo run -p emberdb_demo -- --database-path albums.db`.
//! Set `RUST_LOG=debug` to see what the engine does underneath.

use std::path::PathBuf;
use emberdb_demo::settings::{LoadOptions, Settings};
use emberdb_demo::{build_cli, exit_code, AppContext, ApplicationLogic};
use env_logger::Env;
use log::error;

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let matches = build_cli().get_matches();
    let options = LoadOptions {
        database_path: matches.get_one::<String>("database-path").map(PathBuf::from),
        config_path: matches.get_one::<String>("config").map(PathBuf::from),
        working_dir: None,
    };

    let code = match Settings::load(options) {
        Ok(settings) => ApplicationLogic::new(AppContext::new(settings)).run(),
        Err(err) => {
            let err = anyhow::Error::from(err);
            error!("Application has failed: {:?}", err);
            exit_code(&err)
        }
    };

    std::process::exit(code);
}
