/*
 *  main.rs
 *
 *  TickerTock - time is money
 *  (c) 2020-26 Stuart Hunter
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

use chrono::{Local, Timelike};
use env_logger::Env;
use log::{error, info};
use std::time::Duration;

#[cfg(unix)] // Only compile this block on Unix-like systems
use tokio::signal::unix::{signal, SignalKind};

mod clock_font;
mod config;
mod display;
mod errlog;
mod glyphs;
mod market;
mod quote;
mod tick;

use display::drivers::{Max7219, MockDriver};
use display::{BoxedDriver, DisplayError, MatrixDisplay};
use errlog::FetchLog;
use market::MarketCalendar;
use quote::{QuoteCache, QuoteClient, QuoteReader};
use tick::TickMode;

include!(concat!(env!("OUT_DIR"), "/build_info.rs"));

/// Both overlay messages scroll through twice before the clock returns.
const OVERLAY_PASSES: u32 = 2;

/// Asynchronously waits for a SIGINT, SIGTERM, or SIGHUP signal.
async fn signal_handler() -> Result<(), Box<dyn std::error::Error>> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sighup = signal(SignalKind::hangup())?;

    tokio::select! {
        _ = sigint.recv() => {
            info!("SIGINT received. Initiating graceful shutdown.");
        }
        _ = sigterm.recv() => {
            info!("SIGTERM received. Initiating graceful shutdown.");
        }
        _ = sighup.recv() => {
            info!("SIGHUP received. Initiating graceful shutdown.");
        }
    }
    Ok(())
}

/// Overlay envelope: clock slides away, the message scrolls, clock returns.
async fn scroll_overlay(display: &mut MatrixDisplay, msg: &str) -> Result<(), DisplayError> {
    display.sink().await?;
    display.show_message(msg, OVERLAY_PASSES).await?;
    display.rise().await
}

/// Foreground render loop. Wakes twice a second for the blinking
/// separator; each wake dispatches to exactly one display action. Quote
/// data only ever arrives through the cache reader, so a stalled fetch
/// can never hold up a tick.
async fn display_loop(display: &mut MatrixDisplay, quotes: QuoteReader, symbol: String) {
    // The time ascends from the abyss...
    if let Err(e) = display.rise().await {
        error!("Failed to render startup animation: {}", e);
    }

    let mut colon = false;
    loop {
        colon = !colon;
        let now = Local::now();

        let result = match tick::mode_for(now.minute(), now.second()) {
            TickMode::MinuteRoll => display.minute_roll().await,
            TickMode::TickerScroll => {
                let snapshot = quotes.read();
                let msg = tick::ticker_message(&symbol, &snapshot);
                scroll_overlay(display, &msg).await
            }
            TickMode::DateScroll => {
                let msg = tick::date_message(&Local::now());
                scroll_overlay(display, &msg).await
            }
            TickMode::Tick => {
                let drawn = display.tick(colon);
                tokio::time::sleep(Duration::from_millis(500)).await;
                drawn
            }
        };

        if let Err(e) = result {
            error!("Failed to render display frame: {}", e);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load()?;

    // Initialize the logger with the appropriate level from the config
    env_logger::Builder::from_env(
        Env::default().default_filter_or(cfg.log_level.as_deref().unwrap_or("info")),
    )
    .format_timestamp_secs()
    .init();

    info!("{} - time is money", env!("CARGO_PKG_NAME"));
    info!("v.{} built {}", env!("CARGO_PKG_VERSION"), BUILD_DATE);

    let quote_settings = cfg.quote_settings();
    let display_settings = cfg.display_settings();

    // A missing credential is the one unrecoverable startup condition
    let api_key = cfg.resolve_api_key()?;

    let driver: BoxedDriver = if display_settings.mock {
        info!("Using mock matrix driver");
        Box::new(MockDriver::new(display_settings.cascaded * 8, 8))
    } else {
        Box::new(Max7219::new(
            &display_settings.bus,
            display_settings.speed_hz,
            display_settings.cascaded,
            display_settings.block_rotation,
            display_settings.reverse_blocks,
        )?)
    };
    let mut display = MatrixDisplay::new(
        driver,
        display_settings.contrast,
        display_settings.scroll_delay,
    )?;

    let client = QuoteClient::new(
        &quote_settings.symbol,
        &api_key,
        MarketCalendar::new(),
        quote_settings.interval,
        quote_settings.backoff,
    )?;
    let (cache, reader) = QuoteCache::channel();
    let poller = client.start_polling(cache, FetchLog::new(quote_settings.error_log.clone()));
    info!("Quote polling started for {}", quote_settings.symbol);

    // Main application loop
    tokio::select! {
        // Handle Unix signals for graceful shutdown
        _ = signal_handler() => {}

        _ = display_loop(&mut display, reader, quote_settings.symbol.clone()) => {
            info!("Closed Application Loop.");
        }
    }

    info!("Main application exiting. Stopping quote polling and clearing display.");

    poller.shutdown().await;
    display
        .blank()
        .unwrap_or_else(|e| error!("Failed to clear display: {}", e));
    display
        .power(false)
        .unwrap_or_else(|e| error!("Failed to power down display: {}", e));

    Ok(())
}
