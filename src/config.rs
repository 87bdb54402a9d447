use serde::Deserialize;
use std::fs;

use crate::constants::agents as defaults;

#[derive(Clone, Debug, Deserialize)]
pub struct TickerConfig {
    #[serde(default = "TickerConfig::default_interval_secs")]
    pub interval_secs: u64,
}

impl TickerConfig {
    fn default_interval_secs() -> u64 {
        60
    }
}

impl Default for TickerConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "AnalysisConfig::default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "AnalysisConfig::default_bar_window")]
    pub bar_window: usize,
    #[serde(default = "AnalysisConfig::default_min_bars")]
    pub min_bars: usize,
}

impl AnalysisConfig {
    fn default_interval_secs() -> u64 {
        120
    }
    fn default_bar_window() -> usize {
        defaults::ANALYSIS_BAR_WINDOW
    }
    fn default_min_bars() -> usize {
        defaults::ANALYSIS_MIN_BARS
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            bar_window: Self::default_bar_window(),
            min_bars: Self::default_min_bars(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewsConfig {
    /// Requested poll interval. The worker floors this at 15 minutes.
    #[serde(default = "NewsConfig::default_interval_secs")]
    pub interval_secs: u64,
    /// Analyses below this confidence never produce a signal.
    #[serde(default = "NewsConfig::default_min_confidence")]
    pub min_confidence: f64,
}

impl NewsConfig {
    fn default_interval_secs() -> u64 {
        defaults::NEWS_MIN_POLL_INTERVAL.as_secs()
    }
    fn default_min_confidence() -> f64 {
        0.7
    }
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            interval_secs: Self::default_interval_secs(),
            min_confidence: Self::default_min_confidence(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TradingConfig {
    #[serde(default = "TradingConfig::default_initial_cash")]
    pub initial_cash: f64,
    /// Maximum exposure per symbol, in account currency.
    #[serde(default = "TradingConfig::default_max_position_size")]
    pub max_position_size: f64,
    /// Signals below this confidence are discarded silently.
    #[serde(default = "TradingConfig::default_min_confidence")]
    pub min_confidence: f64,
}

impl TradingConfig {
    fn default_initial_cash() -> f64 {
        100_000.0
    }
    fn default_max_position_size() -> f64 {
        5_000.0
    }
    fn default_min_confidence() -> f64 {
        0.65
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            initial_cash: Self::default_initial_cash(),
            max_position_size: Self::default_max_position_size(),
            min_confidence: Self::default_min_confidence(),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub symbols: Vec<String>,

    #[serde(default = "AppConfig::default_history_limit")]
    pub history_limit: usize,

    #[serde(default)]
    pub ticker: TickerConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub trading: TradingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            symbols: Vec::new(),
            history_limit: Self::default_history_limit(),
            ticker: TickerConfig::default(),
            analysis: AnalysisConfig::default(),
            news: NewsConfig::default(),
            trading: TradingConfig::default(),
        }
    }
}

impl AppConfig {
    fn default_history_limit() -> usize {
        defaults::DEFAULT_HISTORY_LIMIT
    }

    pub fn load() -> Self {
        Self::load_from("config.yaml")
    }

    pub fn load_from(path: &str) -> Self {
        let content = fs::read_to_string(path)
            .unwrap_or_else(|e| panic!("failed to read {path}: {e}"));
        Self::from_yaml(&content).unwrap_or_else(|e| panic!("failed to parse {path}: {e}"))
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        // Strip BOM if present
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        serde_yaml::from_str(content)
    }
}
