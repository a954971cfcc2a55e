//! Staleness policy: liveness verdict + activity -> classification
//!
//! Pure function, no I/O. Usable with fabricated inputs independent of
//! any provider connection.

use crate::model::{ActivityRecord, Classification, LivenessVerdict};
use chrono::{DateTime, Utc};

/// Classify a resource for this run.
///
/// `Active` wins over everything: any matched usage signal keeps the
/// resource, regardless of missing activity metadata or unchecked
/// sources. `Recent` requires an observed activity strictly newer than
/// the cutoff; an activity of exactly the cutoff classifies `Unused`.
pub fn classify(
    verdict: &LivenessVerdict,
    activity: ActivityRecord,
    cutoff: DateTime<Utc>,
) -> Classification {
    if verdict.in_use {
        return Classification::Active;
    }
    match activity {
        ActivityRecord::Observed(t) if t > cutoff => Classification::Recent,
        ActivityRecord::Observed(_) | ActivityRecord::NeverUsed | ActivityRecord::NotTracked => {
            Classification::Unused
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{UsageSignal, UsageSourceKind};
    use chrono::{Duration, TimeZone};

    fn cutoff() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()
    }

    fn in_use_verdict() -> LivenessVerdict {
        let mut v = LivenessVerdict::default();
        v.record_match(UsageSignal {
            source: UsageSourceKind::Ec2Instance,
            detail: "i-1".to_string(),
        });
        v
    }

    #[test]
    fn any_signal_classifies_active() {
        // Fail-safe: ACTIVE regardless of other inputs
        assert_eq!(
            classify(&in_use_verdict(), ActivityRecord::NeverUsed, cutoff()),
            Classification::Active
        );
        assert_eq!(
            classify(
                &in_use_verdict(),
                ActivityRecord::Observed(cutoff() - Duration::days(400)),
                cutoff()
            ),
            Classification::Active
        );
    }

    #[test]
    fn activity_newer_than_cutoff_classifies_recent() {
        let v = LivenessVerdict::default();
        let activity = ActivityRecord::Observed(cutoff() + Duration::days(10));
        assert_eq!(classify(&v, activity, cutoff()), Classification::Recent);
    }

    #[test]
    fn cutoff_boundary_is_strict() {
        let v = LivenessVerdict::default();
        // Exactly the cutoff: unused
        assert_eq!(
            classify(&v, ActivityRecord::Observed(cutoff()), cutoff()),
            Classification::Unused
        );
        // One second past the cutoff: recent
        assert_eq!(
            classify(
                &v,
                ActivityRecord::Observed(cutoff() + Duration::seconds(1)),
                cutoff()
            ),
            Classification::Recent
        );
    }

    #[test]
    fn no_signal_and_no_activity_classifies_unused() {
        let v = LivenessVerdict::default();
        assert_eq!(
            classify(&v, ActivityRecord::NeverUsed, cutoff()),
            Classification::Unused
        );
        assert_eq!(
            classify(&v, ActivityRecord::NotTracked, cutoff()),
            Classification::Unused
        );
    }

    #[test]
    fn unchecked_sources_never_flip_the_outcome() {
        let mut v = LivenessVerdict::default();
        v.record_unchecked(UsageSourceKind::RdsInstance);
        assert_eq!(
            classify(&v, ActivityRecord::NeverUsed, cutoff()),
            Classification::Unused
        );

        let mut v = in_use_verdict();
        v.record_unchecked(UsageSourceKind::RdsInstance);
        assert_eq!(
            classify(&v, ActivityRecord::NeverUsed, cutoff()),
            Classification::Active
        );
    }
}
