//! Access banner presentation

use chrono::{DateTime, Utc};
use coursekeep_api::{AccessStatus, BannerTone, BannerView, Enrollment};

use crate::AccessEvaluator;

impl AccessEvaluator {
    /// What the course page banner should show for this enrollment.
    ///
    /// The extend action is only offered while an extension could still be
    /// granted and the learner actually needs one.
    pub fn banner(&self, enrollment: &Enrollment, now: DateTime<Utc>) -> BannerView {
        let report = self.access_status(enrollment, now);
        let can_extend = !self.has_hit_access_limit(enrollment);

        let (tone, title, show_extend_action) = match report.status {
            AccessStatus::Revoked => (BannerTone::Critical, "Access Revoked", false),
            AccessStatus::Expired => (BannerTone::Critical, "Access Expired", can_extend),
            AccessStatus::ExpiringSoon => (BannerTone::Warning, "Access Expiring Soon", can_extend),
            AccessStatus::Active => (BannerTone::Info, "Access Active", false),
        };

        BannerView {
            status: report.status,
            tone,
            title: title.to_string(),
            message: report.message,
            show_extend_action,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use coursekeep_util::days;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn expiring_soon_offers_extension() {
        let e = Enrollment::new("e").with_expiry(now() + days(2)).with_total_days(30);
        let banner = AccessEvaluator::default().banner(&e, now());

        assert_eq!(banner.tone, BannerTone::Warning);
        assert_eq!(banner.title, "Access Expiring Soon");
        assert!(banner.show_extend_action);
    }

    #[test]
    fn expired_without_budget_hides_extension() {
        let e = Enrollment::new("e").with_expiry(now() - days(2)).with_total_days(365);
        let banner = AccessEvaluator::default().banner(&e, now());

        assert_eq!(banner.status, AccessStatus::Expired);
        assert_eq!(banner.tone, BannerTone::Critical);
        assert!(!banner.show_extend_action);
    }

    #[test]
    fn expired_with_budget_offers_extension() {
        let e = Enrollment::new("e").with_expiry(now() - days(2)).with_total_days(60);
        assert!(AccessEvaluator::default().banner(&e, now()).show_extend_action);
    }

    #[test]
    fn revoked_and_active_never_offer_extension() {
        let revoked = Enrollment::new("e").with_expiry(now() + days(3)).revoked();
        let banner = AccessEvaluator::default().banner(&revoked, now());
        assert_eq!(banner.title, "Access Revoked");
        assert!(!banner.show_extend_action);

        let active = Enrollment::new("e").with_expiry(now() + days(40));
        let banner = AccessEvaluator::default().banner(&active, now());
        assert_eq!(banner.tone, BannerTone::Info);
        assert!(!banner.show_extend_action);
    }
}
