/*
 *  market.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
 *
 *  US equity session calendar: Eastern-time trading window on weekdays,
 *  minus the exchange holiday set for the current year.
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

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Utc, Weekday};
use log::info;
use std::sync::RwLock;

const EST_SECS: i32 = -5 * 3600;
const EDT_SECS: i32 = -4 * 3600;

fn session_open() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 30, 0).unwrap()
}

fn session_close() -> NaiveTime {
    NaiveTime::from_hms_opt(16, 0, 0).unwrap()
}

/// Date of the nth occurrence of `weekday` in the given month.
fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
    let shift = (7 + weekday.num_days_from_monday() as i64
        - first.weekday().num_days_from_monday() as i64)
        % 7;
    first + Duration::days(shift + 7 * (n as i64 - 1))
}

/// Date of the last occurrence of `weekday` in the given month.
fn last_weekday(year: i32, month: u32, weekday: Weekday) -> NaiveDate {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1).unwrap()
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1).unwrap()
    };
    let last = next_month.pred_opt().unwrap();
    let shift = (7 + last.weekday().num_days_from_monday() as i64
        - weekday.num_days_from_monday() as i64)
        % 7;
    last - Duration::days(shift)
}

/// Easter Sunday via the anonymous Gregorian computus.
fn easter_sunday(year: i32) -> NaiveDate {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32).unwrap()
}

/// Exchange observance: Saturday holidays move to the Friday before,
/// Sunday holidays to the Monday after.
fn observed(year: i32, month: u32, day: u32) -> NaiveDate {
    let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
    match date.weekday() {
        Weekday::Sat => date.pred_opt().unwrap(),
        Weekday::Sun => date.succ_opt().unwrap(),
        _ => date,
    }
}

/// Full-day market closures for one calendar year.
fn holidays_for_year(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(10);

    // A Saturday January 1st is observed on the prior year's December 31st
    // and so never lands in this year's set.
    let new_years = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
    match new_years.weekday() {
        Weekday::Sat => {}
        Weekday::Sun => days.push(new_years.succ_opt().unwrap()),
        _ => days.push(new_years),
    }

    days.push(nth_weekday(year, 1, Weekday::Mon, 3)); // Martin Luther King Jr.
    days.push(nth_weekday(year, 2, Weekday::Mon, 3)); // Washington's Birthday
    days.push(easter_sunday(year) - Duration::days(2)); // Good Friday
    days.push(last_weekday(year, 5, Weekday::Mon)); // Memorial Day
    days.push(observed(year, 6, 19)); // Juneteenth
    days.push(observed(year, 7, 4)); // Independence Day
    days.push(nth_weekday(year, 9, Weekday::Mon, 1)); // Labor Day
    days.push(nth_weekday(year, 11, Weekday::Thu, 4)); // Thanksgiving
    days.push(observed(year, 12, 25)); // Christmas

    days
}

/// US daylight saving: second Sunday of March through first Sunday of November.
fn dst_in_effect(date: NaiveDate) -> bool {
    let start = nth_weekday(date.year(), 3, Weekday::Sun, 2);
    let end = nth_weekday(date.year(), 11, Weekday::Sun, 1);
    date >= start && date < end
}

/// UTC offset of US Eastern time at the given instant.
///
/// The civil date is approximated with standard time first; the DST switch
/// happens at 02:00 local, hours outside the trading window, so the
/// approximation never reclassifies a session instant.
pub fn eastern_offset(t: DateTime<Utc>) -> FixedOffset {
    let approx = t.with_timezone(&FixedOffset::east_opt(EST_SECS).unwrap());
    let secs = if dst_in_effect(approx.date_naive()) {
        EDT_SECS
    } else {
        EST_SECS
    };
    FixedOffset::east_opt(secs).unwrap()
}

fn to_eastern(t: DateTime<Utc>) -> DateTime<FixedOffset> {
    t.with_timezone(&eastern_offset(t))
}

/// One trading session as a half-open UTC interval [opens_at, closes_at).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketWindow {
    pub opens_at: DateTime<Utc>,
    pub closes_at: DateTime<Utc>,
}

impl MarketWindow {
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        t >= self.opens_at && t < self.closes_at
    }
}

#[derive(Debug)]
struct CalendarYear {
    year: i32,
    holidays: Vec<NaiveDate>,
}

/// Session calendar with a year-scoped holiday cache, recomputed on rollover.
#[derive(Debug)]
pub struct MarketCalendar {
    cached: RwLock<CalendarYear>,
}

impl MarketCalendar {
    pub fn new() -> Self {
        Self {
            cached: RwLock::new(CalendarYear {
                year: 0,
                holidays: Vec::new(),
            }),
        }
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        {
            let cache = self.cached.read().unwrap();
            if cache.year == date.year() {
                return cache.holidays.contains(&date);
            }
        }

        info!("Computing market holidays for {}", date.year());
        let holidays = holidays_for_year(date.year());
        let hit = holidays.contains(&date);

        let mut cache = self.cached.write().unwrap();
        *cache = CalendarYear {
            year: date.year(),
            holidays,
        };
        hit
    }

    fn is_trading_day(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.is_holiday(date)
    }

    /// Whether the market is open at `t`. Open includes 09:30:00 Eastern
    /// through but excluding 16:00:00.
    pub fn is_open(&self, t: DateTime<Utc>) -> bool {
        let et = to_eastern(t);
        self.is_trading_day(et.date_naive())
            && et.time() >= session_open()
            && et.time() < session_close()
    }

    fn session_window(&self, date: NaiveDate) -> MarketWindow {
        let secs = if dst_in_effect(date) { EDT_SECS } else { EST_SECS };
        let offset = FixedOffset::east_opt(secs).unwrap();
        let opens_at = date
            .and_time(session_open())
            .and_local_timezone(offset)
            .unwrap()
            .with_timezone(&Utc);
        let closes_at = date
            .and_time(session_close())
            .and_local_timezone(offset)
            .unwrap()
            .with_timezone(&Utc);
        MarketWindow { opens_at, closes_at }
    }

    fn next_trading_day(&self, mut date: NaiveDate) -> NaiveDate {
        while !self.is_trading_day(date) {
            date = date.succ_opt().unwrap();
        }
        date
    }

    /// First session open strictly after `t`.
    pub fn next_open(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        let et = to_eastern(t);
        let mut date = et.date_naive();
        if !(self.is_trading_day(date) && et.time() < session_open()) {
            date = date.succ_opt().unwrap();
        }
        self.session_window(self.next_trading_day(date)).opens_at
    }

    /// Close of the active session, or of the next upcoming one when closed.
    pub fn current_close(&self, t: DateTime<Utc>) -> DateTime<Utc> {
        self.current_window(t).closes_at
    }

    /// The active session window at `t`, or the next upcoming one.
    pub fn current_window(&self, t: DateTime<Utc>) -> MarketWindow {
        let et = to_eastern(t);
        let mut date = et.date_naive();
        if !self.is_trading_day(date) || et.time() >= session_close() {
            date = self.next_trading_day(date.succ_opt().unwrap());
        }
        self.session_window(date)
    }
}

impl Default for MarketCalendar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_weekend_closed_all_day() {
        let cal = MarketCalendar::new();
        // Saturday / Sunday, mid trading hours Eastern
        assert!(!cal.is_open(utc(2026, 8, 8, 15, 0)));
        assert!(!cal.is_open(utc(2026, 8, 9, 15, 0)));
        // and outside them
        assert!(!cal.is_open(utc(2026, 8, 8, 2, 0)));
    }

    #[test]
    fn test_holiday_closed_all_day() {
        let cal = MarketCalendar::new();
        // Thanksgiving 2026 falls on November 26th; 15:00 UTC is 10:00 EST
        assert!(!cal.is_open(utc(2026, 11, 26, 15, 0)));
    }

    #[test]
    fn test_session_boundaries() {
        let cal = MarketCalendar::new();
        // Wednesday 2026-08-05, EDT is UTC-4
        assert!(!cal.is_open(utc(2026, 8, 5, 13, 29))); // 09:29 ET
        assert!(cal.is_open(utc(2026, 8, 5, 13, 30))); // 09:30 ET
        assert!(cal.is_open(utc(2026, 8, 5, 19, 59))); // 15:59 ET
        assert!(!cal.is_open(utc(2026, 8, 5, 20, 0))); // 16:00 ET
    }

    #[test]
    fn test_next_open_same_day_before_bell() {
        let cal = MarketCalendar::new();
        // Wednesday 07:00 ET
        let t = utc(2026, 8, 5, 11, 0);
        assert_eq!(cal.next_open(t), utc(2026, 8, 5, 13, 30));
    }

    #[test]
    fn test_next_open_skips_weekend() {
        let cal = MarketCalendar::new();
        // Friday 17:00 ET -> Monday 09:30 ET
        let t = utc(2026, 8, 7, 21, 0);
        let open = cal.next_open(t);
        assert_eq!(open, utc(2026, 8, 10, 13, 30));
        assert!(open > t);
        assert!(cal.is_open(open));
    }

    #[test]
    fn test_next_open_is_always_open_and_after() {
        let cal = MarketCalendar::new();
        let samples = [
            utc(2026, 8, 5, 14, 0),  // mid-session
            utc(2026, 8, 5, 13, 30), // exactly at the bell
            utc(2026, 8, 8, 12, 0),  // Saturday
            utc(2026, 11, 26, 15, 0), // holiday
            utc(2026, 12, 31, 23, 0), // year boundary
        ];
        for t in samples {
            let open = cal.next_open(t);
            assert!(open > t, "next_open not after {}", t);
            assert!(cal.is_open(open), "next_open not open for {}", t);
        }
    }

    #[test]
    fn test_current_close() {
        let cal = MarketCalendar::new();
        // During Wednesday's session: that day's close
        assert_eq!(
            cal.current_close(utc(2026, 8, 5, 14, 0)),
            utc(2026, 8, 5, 20, 0)
        );
        // After the close: Thursday's close
        assert_eq!(
            cal.current_close(utc(2026, 8, 5, 21, 0)),
            utc(2026, 8, 6, 20, 0)
        );
    }

    #[test]
    fn test_window_contains_is_half_open() {
        let cal = MarketCalendar::new();
        let w = cal.current_window(utc(2026, 8, 5, 14, 0));
        assert!(w.contains(w.opens_at));
        assert!(!w.contains(w.closes_at));
    }

    #[test]
    fn test_holidays_2026() {
        let days = holidays_for_year(2026);
        // Good Friday (Easter 2026 is April 5th)
        assert!(days.contains(&NaiveDate::from_ymd_opt(2026, 4, 3).unwrap()));
        // July 4th is a Saturday, observed Friday the 3rd
        assert!(days.contains(&NaiveDate::from_ymd_opt(2026, 7, 3).unwrap()));
        assert!(!days.contains(&NaiveDate::from_ymd_opt(2026, 7, 4).unwrap()));
        // Thanksgiving
        assert!(days.contains(&NaiveDate::from_ymd_opt(2026, 11, 26).unwrap()));
        // MLK day, third Monday of January
        assert!(days.contains(&NaiveDate::from_ymd_opt(2026, 1, 19).unwrap()));
    }

    #[test]
    fn test_dst_offsets() {
        assert_eq!(
            eastern_offset(utc(2026, 1, 15, 12, 0)),
            FixedOffset::east_opt(-5 * 3600).unwrap()
        );
        assert_eq!(
            eastern_offset(utc(2026, 7, 15, 12, 0)),
            FixedOffset::east_opt(-4 * 3600).unwrap()
        );
    }

    #[test]
    fn test_dst_boundaries_2026() {
        assert!(!dst_in_effect(NaiveDate::from_ymd_opt(2026, 3, 7).unwrap()));
        assert!(dst_in_effect(NaiveDate::from_ymd_opt(2026, 3, 8).unwrap()));
        assert!(dst_in_effect(NaiveDate::from_ymd_opt(2026, 10, 31).unwrap()));
        assert!(!dst_in_effect(NaiveDate::from_ymd_opt(2026, 11, 1).unwrap()));
    }

    #[test]
    fn test_year_rollover_recomputes_holidays() {
        let cal = MarketCalendar::new();
        // Prime the cache with 2026, then query 2027
        assert!(cal.is_open(utc(2026, 8, 5, 14, 0)));
        // January 1st 2027 is a Friday holiday
        assert!(!cal.is_open(utc(2027, 1, 1, 15, 0)));
        // Monday January 4th 2027, 10:00 EST
        assert!(cal.is_open(utc(2027, 1, 4, 15, 0)));
    }
}
