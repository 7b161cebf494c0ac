//! Subscription tier types

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Subscription tier levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Free tier - small monthly caps on everything, no SMS
    Free,
    /// Solo tradie plan
    Solo,
    /// Small crew plan
    Crew,
    /// Pro plan (surfaced as "business" on some clients)
    Pro,
}

impl Tier {
    /// All tiers, lowest first
    pub const ALL: [Tier; 4] = [Self::Free, Self::Solo, Self::Crew, Self::Pro];

    /// Parse a tier name, falling back to [`Tier::Free`] for anything unrecognized.
    ///
    /// An unknown tier is never treated as a paid tier.
    pub fn parse_or_free(s: &str) -> Self {
        s.parse().unwrap_or(Self::Free)
    }

    /// Whether this is a paid tier
    pub const fn is_paid(&self) -> bool {
        !matches!(self, Self::Free)
    }

    /// Get the tier name as stored in `profiles.subscription_tier`
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Solo => "solo",
            Self::Crew => "crew",
            Self::Pro => "pro",
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Self::Free
    }
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Tier {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "solo" => Ok(Self::Solo),
            "crew" => Ok(Self::Crew),
            "pro" | "business" => Ok(Self::Pro),
            _ => Err(ParseError::InvalidTier(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_aliases() {
        assert_eq!("Pro".parse::<Tier>().unwrap(), Tier::Pro);
        assert_eq!("business".parse::<Tier>().unwrap(), Tier::Pro);
        assert_eq!(" crew ".parse::<Tier>().unwrap(), Tier::Crew);
        assert!("enterprise".parse::<Tier>().is_err());
    }

    #[test]
    fn test_parse_or_free() {
        assert_eq!(Tier::parse_or_free("solo"), Tier::Solo);
        assert_eq!(Tier::parse_or_free(""), Tier::Free);
        assert_eq!(Tier::parse_or_free("platinum"), Tier::Free);
    }

    #[test]
    fn test_display_round_trips_through_from_str() {
        for tier in Tier::ALL {
            assert_eq!(tier.to_string().parse::<Tier>().unwrap(), tier);
        }
    }
}
