/*
 *  tick.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  Render loop dispatch - maps the wall-clock second and minute onto
 *  exactly one display action per tick.
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

use chrono::{DateTime, Local};

use crate::glyphs;
use crate::quote::QuoteSnapshot;

/// The ticker scrolls on minutes divisible by five, the date two minutes
/// later; both halfway through the minute.
const OVERLAY_SECOND: u32 = 30;
const TICKER_MINUTE_PHASE: u32 = 0;
const DATE_MINUTE_PHASE: u32 = 2;

/// What the render loop does on one wake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickMode {
    /// Normal clock redraw with blinking separator
    Tick,
    /// Minute digits roll over (second 59)
    MinuteRoll,
    /// Scroll the cached quote (second 30, minute % 5 == 0)
    TickerScroll,
    /// Scroll the current date (second 30, minute % 5 == 2)
    DateScroll,
}

/// Dispatch for one wake of the render loop. Modes are mutually
/// exclusive; the minute roll takes priority over the overlays.
pub fn mode_for(minute: u32, second: u32) -> TickMode {
    if second == 59 {
        TickMode::MinuteRoll
    } else if second == OVERLAY_SECOND && minute % 5 == TICKER_MINUTE_PHASE {
        TickMode::TickerScroll
    } else if second == OVERLAY_SECOND && minute % 5 == DATE_MINUTE_PHASE {
        TickMode::DateScroll
    } else {
        TickMode::Tick
    }
}

/// Scrolled ticker text, e.g. `TSLA ▲ 245.67`
pub fn ticker_message(symbol: &str, snapshot: &QuoteSnapshot) -> String {
    format!(
        "{} {} {}",
        symbol,
        glyphs::trend_marker(snapshot.trend),
        snapshot.value
    )
}

/// Scrolled date text, e.g. `Wed 05 Aug 2026`
pub fn date_message(now: &DateTime<Local>) -> String {
    now.format("%a %d %b %Y").to_string()
}
