//! Strategy instance parameters.
//!
//! Configuration rides on the strategy name as `key~value` components, e.g.
//! `/strategy/asf/v=4/probing-interval~30000/max-timeouts~5`. Values are
//! parsed strictly; cross-key constraints are checked only after every
//! component has been read, so component order never matters.

use crate::strategy::probing::{DEFAULT_PROBING_INTERVAL, MIN_PROBING_INTERVAL};
use crate::tables::measurements::DEFAULT_LIFETIME;
use ndn_asf_common::name::Name;
use ndn_asf_common::Error;
use std::time::Duration;

const KEY_PROBING_INTERVAL: &str = "probing-interval";
const KEY_MAX_TIMEOUTS: &str = "max-timeouts";
const KEY_MEASUREMENTS_LIFETIME: &str = "measurements-lifetime";

/// Smallest accepted measurements lifetime.
pub const MIN_MEASUREMENTS_LIFETIME: Duration = Duration::from_secs(60);

/// Parsed ASF instance configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsfParameters {
    pub probing_interval: Duration,
    pub max_timeouts: u32,
    pub measurements_lifetime: Duration,
}

impl Default for AsfParameters {
    fn default() -> Self {
        Self {
            probing_interval: DEFAULT_PROBING_INTERVAL,
            max_timeouts: 3,
            measurements_lifetime: DEFAULT_LIFETIME,
        }
    }
}

impl AsfParameters {
    /// Parses the components of `instance_name` that follow `base`.
    pub fn parse(instance_name: &Name, base: &Name) -> Result<Self, Error> {
        if !base.is_prefix_of(instance_name) {
            return Err(Error::InvalidArgument(format!(
                "strategy name {instance_name} does not start with {base}"
            )));
        }

        let mut probing_interval = None;
        let mut max_timeouts = None;
        let mut measurements_lifetime = None;

        for component in instance_name.components().skip(base.len()) {
            let text = component.as_str();
            let mut parts = text.split('~');
            let (key, value) = match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => (key, value),
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "malformed parameter component {text:?}"
                    )))
                }
            };
            let value: i64 = value.parse().map_err(|_| {
                Error::InvalidArgument(format!("non-numeric value in {text:?}"))
            })?;
            if value < 0 {
                return Err(Error::InvalidArgument(format!(
                    "negative value in {text:?}"
                )));
            }

            let slot = match key {
                KEY_PROBING_INTERVAL => &mut probing_interval,
                KEY_MAX_TIMEOUTS => &mut max_timeouts,
                KEY_MEASUREMENTS_LIFETIME => &mut measurements_lifetime,
                _ => {
                    return Err(Error::InvalidArgument(format!(
                        "unknown parameter {key:?}"
                    )))
                }
            };
            if slot.replace(value).is_some() {
                return Err(Error::InvalidArgument(format!(
                    "duplicate parameter {key:?}"
                )));
            }
        }

        let params = Self {
            probing_interval: probing_interval
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(DEFAULT_PROBING_INTERVAL),
            max_timeouts: match max_timeouts {
                Some(n) => u32::try_from(n).map_err(|_| {
                    Error::InvalidArgument(format!("max timeouts {n} out of range"))
                })?,
                None => Self::default().max_timeouts,
            },
            measurements_lifetime: measurements_lifetime
                .map(|ms| Duration::from_millis(ms as u64))
                .unwrap_or(DEFAULT_LIFETIME),
        };
        params.validate()?;
        Ok(params)
    }

    fn validate(&self) -> Result<(), Error> {
        if self.probing_interval < MIN_PROBING_INTERVAL {
            return Err(Error::InvalidArgument(format!(
                "probing interval must be at least {:?}",
                MIN_PROBING_INTERVAL
            )));
        }
        if self.measurements_lifetime < MIN_MEASUREMENTS_LIFETIME {
            return Err(Error::InvalidArgument(format!(
                "measurements lifetime must be at least {:?}",
                MIN_MEASUREMENTS_LIFETIME
            )));
        }
        if self.measurements_lifetime < self.probing_interval {
            return Err(Error::InvalidArgument(
                "measurements lifetime must not be shorter than the probing interval".into(),
            ));
        }
        Ok(())
    }

    /// Serialises the configuration back onto `base` as name components.
    pub fn to_strategy_name(&self, base: &Name) -> Name {
        base.clone()
            .append(format!(
                "{KEY_PROBING_INTERVAL}~{}",
                self.probing_interval.as_millis()
            ))
            .append(format!("{KEY_MAX_TIMEOUTS}~{}", self.max_timeouts))
            .append(format!(
                "{KEY_MEASUREMENTS_LIFETIME}~{}",
                self.measurements_lifetime.as_millis()
            ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Name {
        Name::from_uri("/strategy/asf/v=4").unwrap()
    }

    fn parse(suffix: &str) -> Result<AsfParameters, Error> {
        let mut name = base();
        if !suffix.is_empty() {
            name = name.append_name(&Name::from_uri(suffix).unwrap());
        }
        AsfParameters::parse(&name, &base())
    }

    #[test]
    fn defaults_without_components() {
        let params = parse("").unwrap();
        assert_eq!(params, AsfParameters::default());
        assert_eq!(params.probing_interval, Duration::from_secs(60));
        assert_eq!(params.max_timeouts, 3);
        assert_eq!(params.measurements_lifetime, Duration::from_secs(300));
    }

    #[test]
    fn full_configuration() {
        let params =
            parse("/probing-interval~30000/max-timeouts~5/measurements-lifetime~120000").unwrap();
        assert_eq!(params.probing_interval, Duration::from_secs(30));
        assert_eq!(params.max_timeouts, 5);
        assert_eq!(params.measurements_lifetime, Duration::from_secs(120));
    }

    #[test]
    fn component_order_is_irrelevant() {
        let a = parse("/probing-interval~30000/max-timeouts~5").unwrap();
        let b = parse("/max-timeouts~5/probing-interval~30000").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn partial_configuration_keeps_other_defaults() {
        let params = parse("/max-timeouts~5/measurements-lifetime~120000").unwrap();
        assert_eq!(params.probing_interval, Duration::from_secs(60));
        assert_eq!(params.max_timeouts, 5);
        assert_eq!(params.measurements_lifetime, Duration::from_secs(120));
    }

    #[test]
    fn boundary_values() {
        let params = parse("/probing-interval~1000").unwrap();
        assert_eq!(params.probing_interval, Duration::from_secs(1));

        let params = parse("/max-timeouts~0").unwrap();
        assert_eq!(params.max_timeouts, 0);

        let params = parse("/measurements-lifetime~60000").unwrap();
        assert_eq!(params.measurements_lifetime, Duration::from_secs(60));
    }

    #[test]
    fn rejections() {
        for suffix in [
            "/probing-interval~500",
            "/probing-interval~-5000",
            "/probing-interval~foo",
            "/max-timeouts~-1",
            "/max-timeouts~ -1",
            "/max-timeouts~1-0",
            "/max-timeouts~1~2",
            "/max-timeouts~1/probing-interval~-30000",
            "/max-timeouts~3/max-timeouts~3",
            "/measurements-lifetime~1000",
            "/measurements-lifetime~1000/probing-interval~30000",
            "/measurements-lifetime~-120000",
            "/measurements-lifetime~ -120000",
            "/measurements-lifetime~0-120000",
            "/max-timeouts~1/measurements-lifetime~-120000",
            "/probing-interval~30000/measurements-lifetime~-120000",
            "/max-timeouts~1/probing-interval~30000/measurements-lifetime~-120000",
            "/retx-interval~10",
        ] {
            assert!(parse(suffix).is_err(), "{suffix} should be rejected");
        }
    }

    #[test]
    fn lifetime_must_cover_the_probing_interval() {
        // 120s lifetime with a 180s probing interval is inconsistent even
        // though both are individually in range.
        assert!(parse("/probing-interval~180000/measurements-lifetime~120000").is_err());
        // The check also applies against the default lifetime of 300s.
        assert!(parse("/probing-interval~600000").is_err());
        assert!(parse("/probing-interval~120000/measurements-lifetime~120000").is_ok());
    }

    #[test]
    fn serialise_parse_round_trip() {
        for params in [
            AsfParameters::default(),
            AsfParameters {
                probing_interval: Duration::from_secs(30),
                max_timeouts: 5,
                measurements_lifetime: Duration::from_secs(120),
            },
            AsfParameters {
                probing_interval: Duration::from_secs(1),
                max_timeouts: 0,
                measurements_lifetime: Duration::from_secs(60),
            },
        ] {
            let name = params.to_strategy_name(&base());
            let parsed = AsfParameters::parse(&name, &base()).unwrap();
            assert_eq!(parsed, params);
        }
    }
}
