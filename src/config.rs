use clap::{ArgAction, Parser, ValueHint};
use dirs_next::home_dir;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::{Path, PathBuf}};
use thiserror::Error;

/// Error type for config loading/validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level app configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub log_level: Option<String>, // e.g., "info" | "debug"
    /// quote source & polling behavior
    pub quote: Option<QuoteConfig>,
    /// display-specific geometry & behavior
    pub display: Option<DisplayConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuoteConfig {
    pub symbol: Option<String>,
    pub api_key: Option<String>,
    pub api_key_file: Option<PathBuf>,
    pub interval_secs: Option<u64>,
    pub backoff_secs: Option<u64>,
    pub error_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DisplayConfig {
    pub driver: Option<DriverKind>, // <- strongly-typed driver selection
    pub bus: Option<String>,        // e.g. "/dev/spidev0.0"
    pub speed_hz: Option<u32>,
    pub cascaded: Option<u32>,      // 8x8 blocks in the chain
    pub block_rotation: Option<i16>, // 0 | 90 | -90
    pub reverse_blocks: Option<bool>,
    pub contrast: Option<u8>,       // 0-255
    pub scroll_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    Max7219,
    Mock,
}

/// CLI overrides. All fields are Options so we can layer them over YAML.
#[derive(Debug, Parser, Clone)]
#[command(name = "tickertock", about = "LED matrix ticker clock", disable_help_flag = false)]
pub struct Cli {
    /// Path to a YAML config file (overrides search)
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,
    /// Enable debug log level
    #[arg(short = 'v', long, action = ArgAction::SetTrue)]
    pub debug: bool,
    /// Ticker symbol to display
    #[arg(short = 'S', long)]
    pub symbol: Option<String>,
    /// File holding the quote API key
    #[arg(long, value_hint = ValueHint::FilePath)]
    pub api_key_file: Option<PathBuf>,
    /// Seconds between quote refreshes
    #[arg(long)]
    pub interval_secs: Option<u64>,
    /// SPI bus device path (e.g. /dev/spidev0.0)
    #[arg(long)]
    pub spi_bus: Option<String>,
    /// Display contrast 0-255
    #[arg(long)]
    pub contrast: Option<u8>,
    /// Run against the mock driver instead of hardware
    #[arg(long, action = ArgAction::SetTrue)]
    pub mock: bool,
    /// dump fully merged config (after overrides) and exit
    #[arg(long, action = ArgAction::SetTrue)]
    pub dump_config: bool,
}

/// Public entry point: parse CLI, read YAML, merge, validate.
pub fn load() -> Result<Config, ConfigError> {
    let cli = Cli::parse();

    // 1) defaults (from `Default` impl)
    let mut cfg = Config::default();

    // 2) YAML file (explicit path or search)
    if let Some(p) = cli.config.as_ref() {
        if p.exists() {
            let y = read_yaml(p)?;
            merge(&mut cfg, y);
        } else {
            return Err(ConfigError::Validation(format!(
                "Config file not found: {}",
                p.display()
            )));
        }
    } else if let Some(p) = find_config_file() {
        let y = read_yaml(&p)?;
        merge(&mut cfg, y);
    }

    // 3) CLI overrides (highest precedence)
    apply_cli_overrides(&mut cfg, &cli);

    // 4) Validate
    validate(&cfg)?;

    if cli.dump_config {
        // Pretty YAML of effective config (nice for debugging)
        let s = serde_yaml::to_string(&cfg)?;
        println!("{s}");
        std::process::exit(0);
    }

    Ok(cfg)
}

/// Try common locations in order (first hit wins).
fn find_config_file() -> Option<PathBuf> {
    // XDG-style: ~/.config/tickertock/config.yaml
    if let Some(home) = home_dir() {
        let p = home.join(".config/tickertock/config.yaml");
        if p.exists() { return Some(p) }
        let p = home.join(".config/tickertock.yaml");
        if p.exists() { return Some(p) }
    }
    // project local
    for candidate in &["tickertock.yaml", "config.yaml"] {
        let p = PathBuf::from(candidate);
        if p.exists() { return Some(p) }
    }
    None
}

fn read_yaml(path: &Path) -> Result<Config, ConfigError> {
    let s = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&s)?;
    Ok(cfg)
}

/// Shallow merge `src` into `dst`, Option-by-Option.
fn merge(dst: &mut Config, src: Config) {
    if src.log_level.is_some() { dst.log_level = src.log_level; }
    match (&mut dst.quote, src.quote) {
        (None, Some(q)) => dst.quote = Some(q),
        (Some(d), Some(s)) => merge_quote(d, s),
        _ => {}
    }
    match (&mut dst.display, src.display) {
        (None, Some(c)) => dst.display = Some(c),
        (Some(d), Some(s)) => merge_display(d, s),
        _ => {}
    }
}

fn merge_quote(dst: &mut QuoteConfig, src: QuoteConfig) {
    if src.symbol.is_some()        { dst.symbol = src.symbol; }
    if src.api_key.is_some()       { dst.api_key = src.api_key; }
    if src.api_key_file.is_some()  { dst.api_key_file = src.api_key_file; }
    if src.interval_secs.is_some() { dst.interval_secs = src.interval_secs; }
    if src.backoff_secs.is_some()  { dst.backoff_secs = src.backoff_secs; }
    if src.error_log.is_some()     { dst.error_log = src.error_log; }
}

fn merge_display(dst: &mut DisplayConfig, src: DisplayConfig) {
    if src.driver.is_some()          { dst.driver = src.driver; }
    if src.bus.is_some()             { dst.bus = src.bus; }
    if src.speed_hz.is_some()        { dst.speed_hz = src.speed_hz; }
    if src.cascaded.is_some()        { dst.cascaded = src.cascaded; }
    if src.block_rotation.is_some()  { dst.block_rotation = src.block_rotation; }
    if src.reverse_blocks.is_some()  { dst.reverse_blocks = src.reverse_blocks; }
    if src.contrast.is_some()        { dst.contrast = src.contrast; }
    if src.scroll_delay_ms.is_some() { dst.scroll_delay_ms = src.scroll_delay_ms; }
}

fn apply_cli_overrides(cfg: &mut Config, cli: &Cli) {
    if cli.debug { cfg.log_level = Some("debug".to_string()); }

    let any_quote = cli.symbol.is_some()
        || cli.api_key_file.is_some()
        || cli.interval_secs.is_some();
    if any_quote && cfg.quote.is_none() {
        cfg.quote = Some(QuoteConfig::default());
    }
    if let Some(quote) = cfg.quote.as_mut() {
        if cli.symbol.is_some()        { quote.symbol = cli.symbol.clone(); }
        if cli.api_key_file.is_some()  { quote.api_key_file = cli.api_key_file.clone(); }
        if cli.interval_secs.is_some() { quote.interval_secs = cli.interval_secs; }
    }

    let any_display = cli.spi_bus.is_some() || cli.contrast.is_some() || cli.mock;
    if any_display && cfg.display.is_none() {
        cfg.display = Some(DisplayConfig::default());
    }
    if let Some(display) = cfg.display.as_mut() {
        if cli.spi_bus.is_some()  { display.bus = cli.spi_bus.clone(); }
        if cli.contrast.is_some() { display.contrast = cli.contrast; }
        if cli.mock               { display.driver = Some(DriverKind::Mock); }
    }
}

/// Put any invariants here (required fields, ranges, etc.)
fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if let Some(quote) = cfg.quote.as_ref() {
        if let Some(interval) = quote.interval_secs {
            if !(30..=300).contains(&interval) {
                return Err(ConfigError::Validation(
                    "quote interval_secs must be 30..=300".into(),
                ));
            }
        }
        if let Some(backoff) = quote.backoff_secs {
            if backoff == 0 {
                return Err(ConfigError::Validation("quote backoff_secs must be > 0".into()));
            }
        }
        if let Some(symbol) = quote.symbol.as_ref() {
            if symbol.is_empty() {
                return Err(ConfigError::Validation("quote symbol must not be empty".into()));
            }
        }
    }
    if let Some(display) = cfg.display.as_ref() {
        if let Some(cascaded) = display.cascaded {
            if cascaded == 0 {
                return Err(ConfigError::Validation("display cascaded must be > 0".into()));
            }
        }
        if let Some(rot) = display.block_rotation {
            match rot {
                0 | 90 | -90 => {},
                _ => return Err(ConfigError::Validation("display block_rotation must be 0|90|-90".into()))
            }
        }
    }
    Ok(())
}

/// Fully-defaulted quote settings ready for the client.
#[derive(Debug, Clone)]
pub struct QuoteSettings {
    pub symbol: String,
    pub interval: Duration,
    pub backoff: Duration,
    pub error_log: PathBuf,
}

/// Fully-defaulted display settings ready for the driver.
#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub mock: bool,
    pub bus: String,
    pub speed_hz: u32,
    pub cascaded: u32,
    pub block_rotation: i16,
    pub reverse_blocks: bool,
    pub contrast: u8,
    pub scroll_delay: Duration,
}

impl Config {
    pub fn quote_settings(&self) -> QuoteSettings {
        let q = self.quote.clone().unwrap_or_default();
        QuoteSettings {
            symbol: q.symbol.unwrap_or_else(|| "TSLA".to_string()),
            interval: Duration::from_secs(q.interval_secs.unwrap_or(120)),
            backoff: Duration::from_secs(q.backoff_secs.unwrap_or(300)),
            error_log: q
                .error_log
                .unwrap_or_else(|| PathBuf::from("tickertock-fetch.log")),
        }
    }

    pub fn display_settings(&self) -> DisplaySettings {
        let d = self.display.clone().unwrap_or_default();
        DisplaySettings {
            mock: matches!(d.driver, Some(DriverKind::Mock)),
            bus: d.bus.unwrap_or_else(|| "/dev/spidev0.0".to_string()),
            speed_hz: d.speed_hz.unwrap_or(1_000_000),
            cascaded: d.cascaded.unwrap_or(4),
            block_rotation: d.block_rotation.unwrap_or(-90),
            reverse_blocks: d.reverse_blocks.unwrap_or(false),
            contrast: d.contrast.unwrap_or(16),
            scroll_delay: Duration::from_millis(d.scroll_delay_ms.unwrap_or(100)),
        }
    }

    /// Resolve the quote API credential. Checked in order: inline config
    /// value, TICKERTOCK_API_KEY in the environment, configured key file,
    /// ~/.config/tickertock/apikey. A missing credential is fatal.
    pub fn resolve_api_key(&self) -> Result<String, ConfigError> {
        let q = self.quote.clone().unwrap_or_default();

        if let Some(key) = q.api_key {
            if !key.is_empty() {
                return Ok(key);
            }
        }
        if let Ok(key) = std::env::var("TICKERTOCK_API_KEY") {
            if !key.is_empty() {
                return Ok(key);
            }
        }

        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(p) = q.api_key_file {
            candidates.push(p);
        }
        if let Some(home) = home_dir() {
            candidates.push(home.join(".config/tickertock/apikey"));
        }
        for path in candidates {
            if path.exists() {
                let key = fs::read_to_string(&path)?.trim().to_string();
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }

        Err(ConfigError::Validation(
            "quote API key not configured; set quote.api_key, TICKERTOCK_API_KEY, \
             or ~/.config/tickertock/apikey"
                .into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        let q = cfg.quote_settings();
        assert_eq!(q.symbol, "TSLA");
        assert_eq!(q.interval, Duration::from_secs(120));
        assert_eq!(q.backoff, Duration::from_secs(300));

        let d = cfg.display_settings();
        assert!(!d.mock);
        assert_eq!(d.cascaded, 4);
        assert_eq!(d.block_rotation, -90);
        assert_eq!(d.contrast, 16);
    }

    #[test]
    fn test_merge_prefers_src_options() {
        let mut dst = Config::default();
        dst.quote = Some(QuoteConfig {
            symbol: Some("TSLA".into()),
            interval_secs: Some(60),
            ..Default::default()
        });

        let src = Config {
            quote: Some(QuoteConfig {
                symbol: Some("AAPL".into()),
                ..Default::default()
            }),
            ..Default::default()
        };

        merge(&mut dst, src);
        let q = dst.quote.unwrap();
        assert_eq!(q.symbol.as_deref(), Some("AAPL"));
        assert_eq!(q.interval_secs, Some(60)); // untouched
    }

    #[test]
    fn test_validate_interval_range() {
        let mut cfg = Config::default();
        cfg.quote = Some(QuoteConfig {
            interval_secs: Some(10),
            ..Default::default()
        });
        assert!(validate(&cfg).is_err());

        cfg.quote.as_mut().unwrap().interval_secs = Some(30);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_validate_rotation() {
        let mut cfg = Config::default();
        cfg.display = Some(DisplayConfig {
            block_rotation: Some(45),
            ..Default::default()
        });
        assert!(validate(&cfg).is_err());

        cfg.display.as_mut().unwrap().block_rotation = Some(-90);
        assert!(validate(&cfg).is_ok());
    }

    #[test]
    fn test_api_key_inline() {
        let mut cfg = Config::default();
        cfg.quote = Some(QuoteConfig {
            api_key: Some("sekrit".into()),
            ..Default::default()
        });
        assert_eq!(cfg.resolve_api_key().unwrap(), "sekrit");
    }

    #[test]
    fn test_api_key_from_file() {
        let path = std::env::temp_dir().join("tickertock-test-apikey");
        fs::write(&path, "filekey\n").unwrap();

        let mut cfg = Config::default();
        cfg.quote = Some(QuoteConfig {
            api_key_file: Some(path.clone()),
            ..Default::default()
        });
        assert_eq!(cfg.resolve_api_key().unwrap(), "filekey");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_yaml_round_trip() {
        let yaml = "\
quote:
  symbol: TSLA
  interval_secs: 60
display:
  driver: max7219
  cascaded: 4
  block_rotation: -90
";
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.quote.as_ref().unwrap().symbol.as_deref(), Some("TSLA"));
        assert!(matches!(
            cfg.display.as_ref().unwrap().driver,
            Some(DriverKind::Max7219)
        ));
        assert!(validate(&cfg).is_ok());
    }
}
