//! Configuration surface (§6). Read from environment variables with
//! sensible defaults, in the teacher's `RateLimitConfig::from_env` idiom —
//! no config-file/CLI parsing (out of scope per spec.md).

use std::env;

/// One `(rate, window)` pair for the rate limiter (§4.5, §6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateWindow {
    pub rate: f64,
    pub window_secs: i64,
}

/// `base * backoff_factor^prior_count` escalation policy for C7.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoRestrictionConfig {
    pub base_duration_secs: i64,
    pub backoff_factor: f64,
}

impl Default for AutoRestrictionConfig {
    fn default() -> Self {
        Self {
            base_duration_secs: 3600,
            backoff_factor: 2.0,
        }
    }
}

impl AutoRestrictionConfig {
    /// `duration = base * backoff_factor^prior_count` (§4.7).
    pub fn duration_for(&self, prior_count: u32) -> i64 {
        let scaled = self.base_duration_secs as f64 * self.backoff_factor.powi(prior_count as i32);
        scaled.round() as i64
    }
}

/// The full configuration surface enumerated in spec.md §6.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Weighting factor for one reaction (§4.6).
    pub reaction_coefficient: f64,
    /// Percentile gate for reactors (§4.3, §4.8 step 5).
    pub required_percentile: f64,
    /// Global per-reactor rate windows, evaluated in order.
    pub rate_limits_global: Vec<RateWindow>,
    /// Per-(reactor, target) rate windows, evaluated in order (before global).
    pub rate_limits_per_target: Vec<RateWindow>,
    /// TTL for the cancel notification + undo window (§4.9, §6).
    pub time_to_cancel_actions_secs: i64,
    /// C2 retention window.
    pub message_retention_hours: i64,
    /// C2 cleanup loop period.
    pub cleanup_interval_hours: i64,
    pub auto_restriction: AutoRestrictionConfig,
    /// Host-policy toggle: whether bot targets are eligible at all (§4.6 step 4).
    pub can_be_bot: bool,
    /// Host-policy toggle: whether a reciprocal self-debit check runs (§4.6
    /// step 6, §9 open question — default false).
    pub debit_reactor_on_negative: bool,
    /// Base of the logarithm used by `power()` (§9 decision). Larger values
    /// flatten the curve; must be > 1.0.
    pub power_log_base: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            reaction_coefficient: 0.1,
            required_percentile: 0.5,
            rate_limits_global: vec![
                RateWindow { rate: 10.0, window_secs: 3600 },
                RateWindow { rate: 20.0, window_secs: 86_400 },
            ],
            rate_limits_per_target: vec![
                RateWindow { rate: 3.0, window_secs: 3600 },
                RateWindow { rate: 5.0, window_secs: 86_400 },
            ],
            time_to_cancel_actions_secs: 60,
            message_retention_hours: 2160,
            cleanup_interval_hours: 24,
            auto_restriction: AutoRestrictionConfig::default(),
            can_be_bot: false,
            debit_reactor_on_negative: false,
            power_log_base: std::f64::consts::E,
        }
    }
}

impl Config {
    /// Build from environment variables, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("REACTION_COEFFICIENT")
            && let Ok(n) = val.parse::<f64>()
        {
            config.reaction_coefficient = n;
        }
        if let Ok(val) = env::var("REQUIRED_PERCENTILE")
            && let Ok(n) = val.parse::<f64>()
        {
            config.required_percentile = n;
        }
        if let Ok(val) = env::var("TIME_TO_CANCEL_ACTIONS_SECS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.time_to_cancel_actions_secs = n;
        }
        if let Ok(val) = env::var("MESSAGE_RETENTION_HOURS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.message_retention_hours = n;
        }
        if let Ok(val) = env::var("CLEANUP_INTERVAL_HOURS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.cleanup_interval_hours = n;
        }
        if let Ok(val) = env::var("AUTO_RESTRICTION_BASE_DURATION_SECS")
            && let Ok(n) = val.parse::<i64>()
        {
            config.auto_restriction.base_duration_secs = n;
        }
        if let Ok(val) = env::var("AUTO_RESTRICTION_BACKOFF_FACTOR")
            && let Ok(n) = val.parse::<f64>()
        {
            config.auto_restriction.backoff_factor = n;
        }
        if let Ok(val) = env::var("CAN_BE_BOT")
            && let Ok(n) = val.parse::<bool>()
        {
            config.can_be_bot = n;
        }
        if let Ok(val) = env::var("DEBIT_REACTOR_ON_NEGATIVE")
            && let Ok(n) = val.parse::<bool>()
        {
            config.debit_reactor_on_negative = n;
        }
        if let Ok(val) = env::var("POWER_LOG_BASE")
            && let Ok(n) = val.parse::<f64>()
            && n > 1.0
        {
            config.power_log_base = n;
        }

        config
    }

    /// §4.6 step 2-3: reactor power scaled by the fixed reaction
    /// coefficient. `power(k) = 1 + log_base(1 + max(k, 0))`, per the §9
    /// decision: flat at 1.0 for non-positive karma, growing sub-linearly
    /// above it.
    pub fn power(&self, karma: f64) -> f64 {
        1.0 + karma.max(0.0).ln_1p() / self.power_log_base.ln()
    }
}
