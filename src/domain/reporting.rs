//! Provider usage reporting.

use serde::{Deserialize, Serialize};

use super::foundation::Timestamp;

/// Per-provider activity counters for a bounded reporting period,
/// typically "yesterday".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageReport {
    pub emails_sent: u64,
    pub opens: u64,
    pub clicks: u64,
    pub unsubscribes: u64,
    pub subscribes: u64,
    pub total_contacts: u64,
}

impl UsageReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Net audience growth over the period, as a fraction of the total
    /// contact count. Defined as 0.0 when there are no contacts.
    pub fn growth_rate(&self) -> f64 {
        if self.total_contacts < 1 {
            return 0.0;
        }
        let net = self.subscribes as f64 - self.unsubscribes as f64;
        net / self.total_contacts as f64
    }
}

/// The reporting window a usage report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportingPeriod {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl ReportingPeriod {
    /// The default window: the full day before today.
    pub fn yesterday() -> Self {
        let end = Timestamp::now();
        Self {
            start: end.minus_days(1),
            end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn growth_rate_is_zero_with_no_contacts() {
        let report = UsageReport {
            subscribes: 50,
            unsubscribes: 10,
            total_contacts: 0,
            ..UsageReport::new()
        };
        assert_eq!(report.growth_rate(), 0.0);
    }

    #[test]
    fn growth_rate_reflects_net_change() {
        let report = UsageReport {
            subscribes: 30,
            unsubscribes: 10,
            total_contacts: 200,
            ..UsageReport::new()
        };
        assert!((report.growth_rate() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn growth_rate_can_be_negative() {
        let report = UsageReport {
            subscribes: 5,
            unsubscribes: 25,
            total_contacts: 100,
            ..UsageReport::new()
        };
        assert!(report.growth_rate() < 0.0);
    }

    proptest! {
        #[test]
        fn growth_rate_is_always_finite(
            subscribes in 0u64..1_000_000,
            unsubscribes in 0u64..1_000_000,
            total_contacts in 0u64..10_000_000,
        ) {
            let report = UsageReport {
                subscribes,
                unsubscribes,
                total_contacts,
                ..UsageReport::new()
            };
            prop_assert!(report.growth_rate().is_finite());
        }
    }

    #[test]
    fn yesterday_period_spans_one_day() {
        let period = ReportingPeriod::yesterday();
        assert!(period.start.is_before(&period.end));
    }
}
