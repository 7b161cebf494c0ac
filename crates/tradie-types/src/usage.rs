//! Usage types, monthly periods and quota-check results

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{Limit, ParseError, Tier};

/// Metered action categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageType {
    /// Quotes created
    Quotes,
    /// Invoices created (including recurring generation)
    Invoices,
    /// Jobs created
    Jobs,
    /// Emails sent
    Emails,
    /// SMS messages sent
    Sms,
    /// Clients created
    Clients,
}

impl UsageType {
    /// All usage types
    pub const ALL: [UsageType; 6] = [
        Self::Quotes,
        Self::Invoices,
        Self::Jobs,
        Self::Emails,
        Self::Sms,
        Self::Clients,
    ];

    /// Get the usage type name
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Quotes => "quotes",
            Self::Invoices => "invoices",
            Self::Jobs => "jobs",
            Self::Emails => "emails",
            Self::Sms => "sms",
            Self::Clients => "clients",
        }
    }

    /// Counter column in `usage_tracking`
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Quotes => "quotes_created",
            Self::Invoices => "invoices_created",
            Self::Jobs => "jobs_created",
            Self::Emails => "emails_sent",
            Self::Sms => "sms_sent",
            Self::Clients => "clients_created",
        }
    }

    /// Human-readable noun used in denial messages
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Quotes => "quotes",
            Self::Invoices => "invoices",
            Self::Jobs => "jobs",
            Self::Emails => "emails",
            Self::Sms => "SMS messages",
            Self::Clients => "clients",
        }
    }

    /// Outbound messaging types carry a real per-message cost
    pub const fn is_messaging(&self) -> bool {
        matches!(self, Self::Emails | Self::Sms)
    }
}

impl std::fmt::Display for UsageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UsageType {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quotes" | "quote" => Ok(Self::Quotes),
            "invoices" | "invoice" => Ok(Self::Invoices),
            "jobs" | "job" => Ok(Self::Jobs),
            "emails" | "email" => Ok(Self::Emails),
            "sms" => Ok(Self::Sms),
            "clients" | "client" => Ok(Self::Clients),
            _ => Err(ParseError::InvalidUsageType(s.to_string())),
        }
    }
}

/// A calendar month usage period, rendered as `YYYY-MM`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UsagePeriod {
    year: i32,
    month: u32,
}

impl UsagePeriod {
    /// The period containing the given instant (UTC)
    pub fn containing(at: DateTime<Utc>) -> Self {
        Self::for_date(at.date_naive())
    }

    /// The period containing the given date
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The current period
    pub fn current() -> Self {
        Self::containing(Utc::now())
    }

    /// Year component
    pub const fn year(&self) -> i32 {
        self.year
    }

    /// Month component (1-12)
    pub const fn month(&self) -> u32 {
        self.month
    }
}

impl std::fmt::Display for UsagePeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for UsagePeriod {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidPeriod(s.to_string());

        let (year, month) = s.split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }

        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        if !(1..=12).contains(&month) {
            return Err(invalid());
        }

        Ok(Self { year, month })
    }
}

impl TryFrom<String> for UsagePeriod {
    type Error = ParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<UsagePeriod> for String {
    fn from(period: UsagePeriod) -> Self {
        period.to_string()
    }
}

/// The six counters of one user's usage period. Absent rows read as all zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounts {
    pub quotes_created: u32,
    pub invoices_created: u32,
    pub jobs_created: u32,
    pub emails_sent: u32,
    pub sms_sent: u32,
    pub clients_created: u32,
}

impl UsageCounts {
    /// Get the counter for a usage type
    pub const fn get(&self, usage_type: UsageType) -> u32 {
        match usage_type {
            UsageType::Quotes => self.quotes_created,
            UsageType::Invoices => self.invoices_created,
            UsageType::Jobs => self.jobs_created,
            UsageType::Emails => self.emails_sent,
            UsageType::Sms => self.sms_sent,
            UsageType::Clients => self.clients_created,
        }
    }

    /// Increment a single counter, leaving the others untouched
    pub fn increment(&mut self, usage_type: UsageType) {
        let counter = match usage_type {
            UsageType::Quotes => &mut self.quotes_created,
            UsageType::Invoices => &mut self.invoices_created,
            UsageType::Jobs => &mut self.jobs_created,
            UsageType::Emails => &mut self.emails_sent,
            UsageType::Sms => &mut self.sms_sent,
            UsageType::Clients => &mut self.clients_created,
        };
        *counter = counter.saturating_add(1);
    }
}

/// How a quota check reached its decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckOutcome {
    /// Tier has no limit for this usage type; the ledger was not read
    Unlimited,
    /// Usage is below the limit
    WithinLimit,
    /// Usage has reached the limit (or the plan does not include the type)
    LimitReached,
    /// Tier could not be resolved; denied (fail closed)
    TierUnavailable,
    /// Usage ledger could not be read; allowed (fail open)
    LedgerUnavailable,
}

/// Result of `check_usage_limit`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCheck {
    /// Whether the action may proceed
    pub allowed: bool,
    /// Resolved tier
    pub tier: Tier,
    /// Usage type checked
    pub usage_type: UsageType,
    /// Usage recorded this period
    pub used: u32,
    /// Limit for the tier
    pub limit: Limit,
    /// Remaining allowance this period
    pub remaining: Limit,
    /// Decision basis
    pub outcome: CheckOutcome,
    /// Infrastructure error note, when the decision was a fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl UsageCheck {
    /// Evaluate a limit against recorded usage
    pub fn evaluate(tier: Tier, usage_type: UsageType, used: u32, limit: Limit) -> Self {
        let allowed = limit.admits(used);
        Self {
            allowed,
            tier,
            usage_type,
            used,
            limit,
            remaining: limit.remaining(used),
            outcome: match (limit, allowed) {
                (Limit::Unlimited, _) => CheckOutcome::Unlimited,
                (_, true) => CheckOutcome::WithinLimit,
                (_, false) => CheckOutcome::LimitReached,
            },
            error: None,
        }
    }

    /// Unlimited decision; usage is not reported because the ledger was skipped
    pub fn unlimited(tier: Tier, usage_type: UsageType) -> Self {
        Self::evaluate(tier, usage_type, 0, Limit::Unlimited)
    }
}

/// Why an action was denied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// The plan does not include this usage type at all (limit 0)
    NotIncluded,
    /// The monthly cap has been reached
    LimitReached,
    /// The subscription tier could not be determined
    TierUnavailable,
}

/// Structured rejection returned to the caller of an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDenial {
    /// Resolved tier
    pub tier: Tier,
    /// Usage type denied
    pub usage_type: UsageType,
    /// Usage recorded this period
    pub used: u32,
    /// Limit for the tier
    pub limit: Limit,
    /// Remaining allowance (zero when denied for quota)
    pub remaining: Limit,
    /// Denial reason
    pub reason: DenialReason,
    /// Human-readable message for an upgrade prompt
    pub message: String,
}

impl UsageDenial {
    /// Build the denial for a check that did not allow the action.
    pub fn from_check(check: &UsageCheck) -> Self {
        let label = check.usage_type.label();
        let (reason, message) = match (check.outcome, check.limit) {
            (CheckOutcome::TierUnavailable, _) => (
                DenialReason::TierUnavailable,
                "We couldn't confirm your subscription plan. Please try again shortly.".to_string(),
            ),
            (_, Limit::Finite(0)) => (
                DenialReason::NotIncluded,
                format!(
                    "Your {} plan does not include {label}. Upgrade to unlock this feature.",
                    check.tier
                ),
            ),
            (_, limit) => (
                DenialReason::LimitReached,
                format!(
                    "You've reached your monthly limit of {limit} {label} on the {} plan. \
                     Upgrade for more.",
                    check.tier
                ),
            ),
        };

        Self {
            tier: check.tier,
            usage_type: check.usage_type,
            used: check.used,
            limit: check.limit,
            remaining: check.remaining,
            reason,
            message,
        }
    }
}
