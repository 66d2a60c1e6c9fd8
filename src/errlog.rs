/*
 *  errlog.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  Append-only log of quote fetch failures.
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use chrono::Local;
use log::warn;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

/// Timestamped failure lines, one per fetch error:
/// `DD.MM.YY - HH:MM:SS -> <ErrorKind> - <message>`
#[derive(Debug, Clone)]
pub struct FetchLog {
    path: PathBuf,
}

impl FetchLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Appends one line. A failing log sink is reported via the process
    /// logger and otherwise ignored; it must never take the poller down.
    pub fn append(&self, kind: &str, message: &str) {
        let stamp = Local::now().format("%d.%m.%y - %H:%M:%S");
        let line = format!("{} -> {} - {}\n", stamp, kind, message);

        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(mut file) => {
                if let Err(e) = file.write_all(line.as_bytes()) {
                    warn!("Failed to write fetch log line: {}", e);
                }
            }
            Err(e) => warn!("Fetch log {} unavailable: {}", self.path.display(), e),
        }
    }
}
