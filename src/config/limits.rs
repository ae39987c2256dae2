//! Per-endpoint rate-limit grammar
//!
//! - `"-1"`: endpoint disabled
//! - `"0"`: endpoint unlimited
//! - `"<count><unit>"`: at most `count` (1-3 digits) requests per second,
//!   minute, hour or day (`s`, `m`, `h`, `d`)
//!
//! Limits are parsed here and handed to the HTTP layer; nothing in this crate
//! enforces them.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Serialize;

fn limit_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(\d{1,3})([smhd])$").expect("limit pattern is valid"))
}

/// Rate limit of a single endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum Limit {
    /// Endpoint is not registered at all
    Disabled,
    /// No limit applies
    Unlimited,
    /// At most `count` requests per `interval`
    Rate { count: u32, interval: Duration },
}

impl FromStr for Limit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-1" => return Ok(Limit::Disabled),
            "0" => return Ok(Limit::Unlimited),
            _ => {}
        }

        let captures = limit_pattern().captures(s).ok_or(())?;
        let count = captures[1].parse::<u32>().map_err(|_| ())?;
        let interval = match &captures[2] {
            "s" => Duration::from_secs(1),
            "m" => Duration::from_secs(60),
            "h" => Duration::from_secs(60 * 60),
            "d" => Duration::from_secs(24 * 60 * 60),
            _ => return Err(()),
        };

        Ok(Limit::Rate { count, interval })
    }
}

impl Limit {
    pub fn is_disabled(&self) -> bool {
        matches!(self, Limit::Disabled)
    }
}

/// Limits of the four endpoints of one service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EndpointLimits {
    pub get: Limit,
    pub list: Limit,
    pub put: Limit,
    pub delete: Limit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limits() {
        assert_eq!(
            "2s".parse::<Limit>(),
            Ok(Limit::Rate {
                count: 2,
                interval: Duration::from_secs(1)
            })
        );
        assert_eq!(
            "6m".parse::<Limit>(),
            Ok(Limit::Rate {
                count: 6,
                interval: Duration::from_secs(60)
            })
        );
        assert_eq!(
            "100d".parse::<Limit>(),
            Ok(Limit::Rate {
                count: 100,
                interval: Duration::from_secs(86_400)
            })
        );
    }

    #[test]
    fn test_special_values() {
        assert_eq!("-1".parse::<Limit>(), Ok(Limit::Disabled));
        assert_eq!("0".parse::<Limit>(), Ok(Limit::Unlimited));
        assert!(Limit::Disabled.is_disabled());
    }

    #[test]
    fn test_invalid_limits() {
        for input in ["", "5", "1000s", "5w", "-2", "s", " 5s"] {
            assert!(input.parse::<Limit>().is_err(), "{input:?}");
        }
    }
}
