//! Subscription tiers and the pulse cadence they grant.
//!
//! Tier bookkeeping (who holds which tier) lives outside this crate;
//! this module only maps a tier to a refresh interval.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::error::PulseError;

/// Longest accepted refresh interval (one year).
pub const MAX_TIER_HOURS: u64 = 24 * 365;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Premium,
}

impl SubscriptionTier {
    /// Unknown tier names fall back to `Free`.
    pub fn parse_or_free(name: &str) -> Self {
        name.parse().unwrap_or_else(|_| {
            log::debug!("unknown subscription tier {name:?}, treating as free");
            SubscriptionTier::Free
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Premium => "premium",
        }
    }
}

impl FromStr for SubscriptionTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(SubscriptionTier::Free),
            "pro" => Ok(SubscriptionTier::Pro),
            "premium" => Ok(SubscriptionTier::Premium),
            other => Err(format!("unknown tier '{other}'")),
        }
    }
}

impl fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Refresh interval in hours per tier.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct TierSchedule {
    pub free_hours: u64,
    pub pro_hours: u64,
    pub premium_hours: u64,
}

impl Default for TierSchedule {
    fn default() -> Self {
        Self {
            free_hours: 4,
            pro_hours: 2,
            premium_hours: 1,
        }
    }
}

impl TierSchedule {
    pub fn interval_hours(&self, tier: SubscriptionTier) -> u64 {
        match tier {
            SubscriptionTier::Free => self.free_hours,
            SubscriptionTier::Pro => self.pro_hours,
            SubscriptionTier::Premium => self.premium_hours,
        }
    }

    /// Every tier needs an interval between 1 hour and `MAX_TIER_HOURS`.
    pub fn validate(&self) -> Result<(), PulseError> {
        for tier in [SubscriptionTier::Free, SubscriptionTier::Pro, SubscriptionTier::Premium] {
            let hours = self.interval_hours(tier);
            if hours == 0 || hours > MAX_TIER_HOURS {
                return Err(PulseError::config(format!(
                    "{tier} refresh interval must be 1..={MAX_TIER_HOURS} hours, got {hours}"
                )));
            }
        }
        Ok(())
    }

    pub fn refresh_interval(&self, tier: SubscriptionTier) -> Result<Duration, PulseError> {
        let hours = self.interval_hours(tier);
        if hours == 0 {
            return Err(PulseError::config(format!("{tier} refresh interval is zero")));
        }
        hours
            .checked_mul(3600)
            .map(Duration::from_secs)
            .ok_or_else(|| PulseError::config(format!("{tier} refresh interval of {hours}h overflows")))
    }

    /// Whether a holder of `tier` may see a fresh pulse at `now`.
    ///
    /// Always true when no pulse has been seen yet.
    pub fn can_access_pulse(
        &self,
        tier: SubscriptionTier,
        last_pulse: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> bool {
        let Some(last) = last_pulse else {
            return true;
        };
        let hours = i64::try_from(self.interval_hours(tier)).unwrap_or(i64::MAX);
        TimeDelta::try_hours(hours)
            .and_then(|interval| last.checked_add_signed(interval))
            .is_some_and(|next| now >= next)
    }
}
