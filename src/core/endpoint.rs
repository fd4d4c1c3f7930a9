//! Endpoints under management: a single IPv4 address or a closed range.
//!
//! An endpoint's identity is its canonical text (`1.2.3.4` or
//! `1.2.3.4-1.2.3.10`); store keys and equality are based on that text.

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use serde::Serialize;

use crate::config;
use crate::error::AppError;

/// A single IPv4 address or a closed range `[start, end]` with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Single(Ipv4Addr),
    Range { start: Ipv4Addr, end: Ipv4Addr },
}

/// Traffic direction relative to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Value of netsh's `dir=` parameter.
    pub fn as_netsh(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    fn rule_suffix(self) -> &'static str {
        match self {
            Direction::In => "IN",
            Direction::Out => "OUT",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rule_suffix())
    }
}

impl Endpoint {
    /// Canonical text form, used as the store key.
    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn is_range(&self) -> bool {
        matches!(self, Endpoint::Range { .. })
    }

    /// Display label for the endpoint type.
    pub fn kind(&self) -> &'static str {
        match self {
            Endpoint::Single(_) => "Single IP",
            Endpoint::Range { .. } => "Range",
        }
    }

    /// Number of addresses covered.
    pub fn address_count(&self) -> u64 {
        match self {
            Endpoint::Single(_) => 1,
            Endpoint::Range { start, end } => u64::from(u32::from(*end)) - u64::from(u32::from(*start)) + 1,
        }
    }

    /// Member addresses, or an empty list if there are more than `limit`.
    pub fn expand(&self, limit: u64) -> Vec<Ipv4Addr> {
        match self {
            Endpoint::Single(addr) => vec![*addr],
            Endpoint::Range { start, end } => {
                if self.address_count() > limit {
                    return Vec::new();
                }
                (u32::from(*start)..=u32::from(*end)).map(Ipv4Addr::from).collect()
            }
        }
    }

    /// Deterministic firewall rule name for this endpoint and direction.
    ///
    /// `IPBlocker_10_0_0_1_IN`, `IPBlocker_RANGE_10_0_0_5_to_10_0_0_9_OUT`.
    pub fn rule_name(&self, direction: Direction) -> String {
        let prefix = config::RULE_NAME_PREFIX;
        let suffix = direction.rule_suffix();
        match self {
            Endpoint::Single(addr) => format!("{prefix}_{}_{suffix}", underscored(*addr)),
            Endpoint::Range { start, end } => format!(
                "{prefix}_RANGE_{}_to_{}_{suffix}",
                underscored(*start),
                underscored(*end)
            ),
        }
    }
}

fn underscored(addr: Ipv4Addr) -> String {
    addr.to_string().replace('.', "_")
}

fn parse_addr(text: &str, line: &str) -> Result<Ipv4Addr, AppError> {
    text.trim()
        .parse::<Ipv4Addr>()
        .map_err(|_| AppError::Validation(format!("invalid IPv4 address '{}' in '{line}'", text.trim())))
}

impl FromStr for Endpoint {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        match line.split_once('-') {
            Some((start, end)) => {
                let start = parse_addr(start, line)?;
                let end = parse_addr(end, line)?;
                if start > end {
                    return Err(AppError::Validation(format!(
                        "range start {start} is greater than end {end}"
                    )));
                }
                Ok(Endpoint::Range { start, end })
            }
            None => Ok(Endpoint::Single(parse_addr(line, line)?)),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Single(addr) => write!(f, "{addr}"),
            Endpoint::Range { start, end } => write!(f, "{start}-{end}"),
        }
    }
}

impl Serialize for Endpoint {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_address_round_trips_to_key() {
        let ep: Endpoint = "10.0.0.1".parse().unwrap();
        assert_eq!(ep, Endpoint::Single(Ipv4Addr::new(10, 0, 0, 1)));
        assert_eq!(ep.key(), "10.0.0.1");
        assert!(!ep.is_range());
    }

    #[test]
    fn test_parse_range_trims_bounds_into_canonical_key() {
        let ep: Endpoint = " 10.0.0.5 - 10.0.0.9 ".parse().unwrap();
        assert_eq!(ep.key(), "10.0.0.5-10.0.0.9");
        assert!(ep.is_range());
        assert_eq!(ep.kind(), "Range");
    }

    #[test]
    fn test_parse_range_with_equal_bounds_accepted() {
        let ep: Endpoint = "1.1.1.1-1.1.1.1".parse().unwrap();
        assert_eq!(ep.address_count(), 1);
    }

    #[test]
    fn test_parse_reversed_range_rejected() {
        let err = "10.0.0.9-10.0.0.5".parse::<Endpoint>().unwrap_err();
        assert_eq!(err.kind(), "Validation");
    }

    #[test]
    fn test_parse_garbage_rejected() {
        for bad in ["", "not-an-ip", "256.1.1.1", "1.2.3", "1.1.1.1-2.2.2.2-3.3.3.3", "::1"] {
            assert!(bad.parse::<Endpoint>().is_err(), "expected '{bad}' to be rejected");
        }
    }

    #[test]
    fn test_rule_names_are_deterministic_per_direction() {
        let single: Endpoint = "10.0.0.1".parse().unwrap();
        assert_eq!(single.rule_name(Direction::In), "IPBlocker_10_0_0_1_IN");
        assert_eq!(single.rule_name(Direction::Out), "IPBlocker_10_0_0_1_OUT");

        let range: Endpoint = "10.0.0.5-10.0.0.9".parse().unwrap();
        assert_eq!(
            range.rule_name(Direction::In),
            "IPBlocker_RANGE_10_0_0_5_to_10_0_0_9_IN"
        );
    }

    #[test]
    fn test_address_count_spans_octet_boundary() {
        let ep: Endpoint = "10.0.0.250-10.0.1.4".parse().unwrap();
        assert_eq!(ep.address_count(), 11);
        let full: Endpoint = "0.0.0.0-255.255.255.255".parse().unwrap();
        assert_eq!(full.address_count(), 1u64 << 32);
    }

    #[test]
    fn test_expand_respects_limit() {
        let small: Endpoint = "10.0.0.5-10.0.0.7".parse().unwrap();
        assert_eq!(
            small.expand(100),
            vec![
                Ipv4Addr::new(10, 0, 0, 5),
                Ipv4Addr::new(10, 0, 0, 6),
                Ipv4Addr::new(10, 0, 0, 7)
            ]
        );
        let big: Endpoint = "10.0.0.0-10.0.1.0".parse().unwrap();
        assert!(big.expand(100).is_empty());
    }

    #[test]
    fn test_endpoint_serializes_as_canonical_text() {
        let ep: Endpoint = "10.0.0.5-10.0.0.9".parse().unwrap();
        assert_eq!(serde_json::to_value(ep).unwrap(), "10.0.0.5-10.0.0.9");
        assert_eq!(serde_json::to_value(Direction::Out).unwrap(), "out");
    }
}
