//! Access status classification and lifetime budget

use chrono::{DateTime, Utc};
use coursekeep_api::{AccessStatus, AccessStatusReport, Enrollment, ExtensionOption};
use coursekeep_config::AccessPolicy;
use coursekeep_util::{days, days_until_ceil};
use tracing::debug;

/// Evaluates enrollments against an access policy.
///
/// Holds no state besides the policy; identical inputs always produce
/// identical outputs.
#[derive(Debug, Clone, Default)]
pub struct AccessEvaluator {
    policy: AccessPolicy,
}

impl AccessEvaluator {
    pub fn new(policy: AccessPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &AccessPolicy {
        &self.policy
    }

    /// Classify an enrollment at `now`.
    ///
    /// Rules are checked in priority order: revoked, expired, expiring
    /// soon, active. An unset expiry is active with no day count.
    pub fn access_status(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> AccessStatusReport {
        let days_remaining = enrollment
            .access_expires_at
            .map(|expires_at| days_until_ceil(expires_at, now));

        let report = if enrollment.is_access_revoked {
            AccessStatusReport {
                status: AccessStatus::Revoked,
                message: self.revoked_message(),
                days_remaining,
            }
        } else {
            match enrollment.access_expires_at {
                Some(expires_at) if expires_at < now => AccessStatusReport {
                    status: AccessStatus::Expired,
                    message: "Your access to this course has expired. You can no longer access course materials.".into(),
                    days_remaining,
                },
                Some(expires_at)
                    if expires_at - now <= days(self.policy.expiring_soon_days) =>
                {
                    let n = days_remaining.unwrap_or(0);
                    AccessStatusReport {
                        status: AccessStatus::ExpiringSoon,
                        message: format!(
                            "Your access will expire in {} days. You can extend it to continue learning.",
                            n
                        ),
                        days_remaining,
                    }
                }
                Some(_) => AccessStatusReport {
                    status: AccessStatus::Active,
                    message: format!(
                        "Your access is active. You have {} days remaining.",
                        days_remaining.unwrap_or(0)
                    ),
                    days_remaining,
                },
                None => AccessStatusReport {
                    status: AccessStatus::Active,
                    message: "Your access is active. This course has no expiry date.".into(),
                    days_remaining: None,
                },
            }
        };

        debug!(
            enrollment_id = %enrollment.id,
            status = %report.status,
            days_remaining = ?report.days_remaining,
            "Access evaluated"
        );

        report
    }

    /// Days left in the lifetime budget, never negative
    pub fn remaining_access_days(&self, enrollment: &Enrollment) -> u32 {
        self.policy
            .lifetime_budget_days
            .saturating_sub(enrollment.total_access_days)
    }

    /// Whether no further extension may ever be granted
    pub fn has_hit_access_limit(&self, enrollment: &Enrollment) -> bool {
        enrollment.total_access_days >= self.policy.lifetime_budget_days
            || enrollment.is_access_revoked
    }

    /// Whether an extension of `days` fits the remaining budget
    pub fn can_extend_by(&self, enrollment: &Enrollment, days: u32) -> bool {
        days > 0 && !self.has_hit_access_limit(enrollment) && days <= self.remaining_access_days(enrollment)
    }

    /// Every configured extension length, ascending.
    ///
    /// Lengths over the remaining budget stay in the list, disabled.
    pub fn extension_options(&self, enrollment: &Enrollment) -> Vec<ExtensionOption> {
        self.policy
            .extension_options
            .iter()
            .map(|&days| ExtensionOption {
                days,
                enabled: self.can_extend_by(enrollment, days),
            })
            .collect()
    }

    /// Shown instead of extension choices once the budget is spent
    pub fn limit_reached_message(&self) -> String {
        format!(
            "You have reached the maximum access period of {} days for this course.",
            self.policy.lifetime_budget_days
        )
    }

    /// Why no extension can be chosen, or None while one still can.
    ///
    /// A revoked enrollment gets the revocation notice even when budget
    /// remains.
    pub fn limit_message(&self, enrollment: &Enrollment) -> Option<String> {
        if enrollment.is_access_revoked {
            Some("Access to this course has been revoked and can no longer be extended.".into())
        } else if self.has_hit_access_limit(enrollment) {
            Some(self.limit_reached_message())
        } else {
            None
        }
    }

    fn revoked_message(&self) -> String {
        let period = if self.policy.lifetime_budget_days == 365 {
            "1 year".to_string()
        } else {
            format!("{} days", self.policy.lifetime_budget_days)
        };
        format!(
            "Your access to this course has been revoked after {} of access.",
            period
        )
    }
}

/// Classify an enrollment with the default policy
pub fn access_status(enrollment: &Enrollment, now: DateTime<Utc>) -> AccessStatusReport {
    AccessEvaluator::default().access_status(enrollment, now)
}

/// Remaining lifetime budget with the default policy
pub fn remaining_access_days(enrollment: &Enrollment) -> u32 {
    AccessEvaluator::default().remaining_access_days(enrollment)
}

/// Lifetime limit check with the default policy
pub fn has_hit_access_limit(enrollment: &Enrollment) -> bool {
    AccessEvaluator::default().has_hit_access_limit(enrollment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 15, 9, 30, 0).unwrap()
    }

    fn enrollment() -> Enrollment {
        Enrollment::new("enr-1")
    }

    #[test]
    fn expired_long_ago() {
        let e = enrollment()
            .with_expiry(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap())
            .with_total_days(100);

        let report = access_status(&e, now());
        assert_eq!(report.status, AccessStatus::Expired);
        assert_eq!(report.days_remaining, Some(0));
        assert_eq!(
            report.message,
            "Your access to this course has expired. You can no longer access course materials."
        );
    }

    #[test]
    fn expiring_in_three_days() {
        let e = enrollment().with_expiry(now() + days(3)).with_total_days(50);

        let report = access_status(&e, now());
        assert_eq!(report.status, AccessStatus::ExpiringSoon);
        assert_eq!(report.days_remaining, Some(3));
        assert_eq!(
            report.message,
            "Your access will expire in 3 days. You can extend it to continue learning."
        );
    }

    #[test]
    fn active_with_thirty_days() {
        let e = enrollment().with_expiry(now() + days(30)).with_total_days(200);

        let report = access_status(&e, now());
        assert_eq!(report.status, AccessStatus::Active);
        assert_eq!(report.days_remaining, Some(30));
        assert_eq!(
            report.message,
            "Your access is active. You have 30 days remaining."
        );
        assert_eq!(remaining_access_days(&e), 165);
        assert!(!has_hit_access_limit(&e));
    }

    #[test]
    fn spent_budget_disables_every_option() {
        let e = enrollment().with_expiry(now() + days(30)).with_total_days(365);
        let evaluator = AccessEvaluator::default();

        assert!(has_hit_access_limit(&e));
        assert_eq!(remaining_access_days(&e), 0);

        let options = evaluator.extension_options(&e);
        let lengths: Vec<u32> = options.iter().map(|o| o.days).collect();
        assert_eq!(lengths, vec![7, 14, 30, 60]);
        assert!(options.iter().all(|o| !o.enabled));

        // Still active by date: the two questions are independent.
        assert_eq!(evaluator.access_status(&e, now()).status, AccessStatus::Active);
    }

    #[test]
    fn unset_expiry_is_active_without_day_count() {
        let e = enrollment();

        let report = access_status(&e, now());
        assert_eq!(report.status, AccessStatus::Active);
        assert_eq!(report.days_remaining, None);
        assert_eq!(report.days_remaining_or_zero(), 0);
        assert_eq!(
            report.message,
            "Your access is active. This course has no expiry date."
        );
    }

    #[test]
    fn revoked_beats_expired() {
        let e = enrollment()
            .with_expiry(now() - days(1))
            .with_total_days(365)
            .revoked();

        let report = access_status(&e, now());
        assert_eq!(report.status, AccessStatus::Revoked);
        assert_eq!(
            report.message,
            "Your access to this course has been revoked after 1 year of access."
        );
    }

    #[test]
    fn revoked_regardless_of_expiry_or_budget() {
        let expiries = [
            None,
            Some(now() - days(400)),
            Some(now() + days(2)),
            Some(now() + days(90)),
        ];
        for expiry in expiries {
            for total in [0, 100, 365, 500] {
                let mut e = enrollment().with_total_days(total).revoked();
                e.access_expires_at = expiry;
                assert_eq!(access_status(&e, now()).status, AccessStatus::Revoked);
                assert!(has_hit_access_limit(&e));
            }
        }
    }

    #[test]
    fn expiry_exactly_now_is_expiring_soon_with_zero_days() {
        let e = enrollment().with_expiry(now());
        let report = access_status(&e, now());
        assert_eq!(report.status, AccessStatus::ExpiringSoon);
        assert_eq!(report.days_remaining, Some(0));
    }

    #[test]
    fn one_second_past_expiry_is_expired() {
        let e = enrollment().with_expiry(now() - Duration::seconds(1));
        assert_eq!(access_status(&e, now()).status, AccessStatus::Expired);
    }

    #[test]
    fn warning_window_boundary() {
        let at_edge = enrollment().with_expiry(now() + days(7));
        let report = access_status(&at_edge, now());
        assert_eq!(report.status, AccessStatus::ExpiringSoon);
        assert_eq!(report.days_remaining, Some(7));

        let past_edge = enrollment().with_expiry(now() + days(7) + Duration::seconds(1));
        let report = access_status(&past_edge, now());
        assert_eq!(report.status, AccessStatus::Active);
        assert_eq!(report.days_remaining, Some(8));
    }

    #[test]
    fn expiring_soon_rounds_partial_days_up() {
        for hours in [1, 23, 24, 25, 100, 167, 168] {
            let e = enrollment().with_expiry(now() + Duration::hours(hours));
            let report = access_status(&e, now());
            assert_eq!(report.status, AccessStatus::ExpiringSoon, "{} hours", hours);
            let expected = ((hours + 23) / 24) as u32;
            assert_eq!(report.days_remaining, Some(expected), "{} hours", hours);
        }
    }

    #[test]
    fn remaining_budget_never_negative() {
        for (total, expected) in [(0, 365), (1, 364), (364, 1), (365, 0), (366, 0), (10_000, 0)] {
            let e = enrollment().with_total_days(total);
            assert_eq!(remaining_access_days(&e), expected);
            assert_eq!(has_hit_access_limit(&e), total >= 365);
        }
    }

    #[test]
    fn options_over_remaining_budget_are_disabled() {
        let evaluator = AccessEvaluator::default();
        let e = enrollment().with_total_days(340); // 25 left

        let options = evaluator.extension_options(&e);
        assert_eq!(
            options,
            vec![
                ExtensionOption { days: 7, enabled: true },
                ExtensionOption { days: 14, enabled: true },
                ExtensionOption { days: 30, enabled: false },
                ExtensionOption { days: 60, enabled: false },
            ]
        );
    }

    #[test]
    fn option_equal_to_remaining_budget_is_enabled() {
        let evaluator = AccessEvaluator::default();
        let e = enrollment().with_total_days(335);
        assert!(evaluator.can_extend_by(&e, 30));
        assert!(!evaluator.can_extend_by(&e, 31));
        assert!(!evaluator.can_extend_by(&e, 0));
    }

    #[test]
    fn classification_is_repeatable() {
        let e = enrollment().with_expiry(now() + days(5)).with_total_days(12);
        assert_eq!(access_status(&e, now()), access_status(&e, now()));
    }

    #[test]
    fn custom_policy_changes_window_and_budget() {
        let evaluator = AccessEvaluator::new(AccessPolicy {
            lifetime_budget_days: 90,
            expiring_soon_days: 14,
            extension_options: vec![15, 45],
        });

        let e = enrollment().with_expiry(now() + days(10)).with_total_days(60);
        assert_eq!(
            evaluator.access_status(&e, now()).status,
            AccessStatus::ExpiringSoon
        );
        assert_eq!(evaluator.remaining_access_days(&e), 30);
        assert_eq!(
            evaluator.extension_options(&e),
            vec![
                ExtensionOption { days: 15, enabled: true },
                ExtensionOption { days: 45, enabled: false },
            ]
        );

        let revoked = evaluator.access_status(&e.clone().revoked(), now());
        assert_eq!(
            revoked.message,
            "Your access to this course has been revoked after 90 days of access."
        );
        assert_eq!(
            evaluator.limit_reached_message(),
            "You have reached the maximum access period of 90 days for this course."
        );
    }

    #[test]
    fn limit_message_depends_on_why_extension_is_closed() {
        let evaluator = AccessEvaluator::default();

        assert_eq!(evaluator.limit_message(&enrollment().with_total_days(100)), None);
        assert_eq!(
            evaluator.limit_message(&enrollment().with_total_days(365)),
            Some("You have reached the maximum access period of 365 days for this course.".into())
        );

        let revoked_with_budget = enrollment().with_total_days(100).revoked();
        assert_eq!(evaluator.remaining_access_days(&revoked_with_budget), 265);
        let message = evaluator.limit_message(&revoked_with_budget).unwrap();
        assert!(message.contains("revoked"));
        assert!(!message.contains("maximum access period"));
    }
}
