//! Pairwise skew detector
//!
//! Observer A's timeline of observations about subject B is aligned with
//! B's own timeline about itself. Matching state codes act as sync
//! markers: once two consecutive aligned pairs yield the same timestamp
//! delta (within tolerance), that delta is A's clock minus B's clock.

use std::time::Duration;

use skewline_core::{Event, EventFilter, EventSource, NodeName, Skew, SkewEstimate, SkewResult};

/// Result of aligning two streams
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Detection {
    /// Two consecutive aligned pairs agreed on a skew larger than tolerance
    Confirmed(Skew),
    /// Aligned pairs agreed, but the offset was within tolerance
    Negligible,
    /// Not enough correlated data
    Undetermined,
}

impl Detection {
    /// Only a confirmed detection becomes a determined estimate
    #[inline]
    pub fn estimate(self) -> SkewEstimate {
        match self {
            Detection::Confirmed(skew) => SkewEstimate::Determined(skew),
            Detection::Negligible | Detection::Undetermined => SkewEstimate::Undetermined,
        }
    }

    /// Streams lined up, whatever the offset
    #[inline]
    pub fn is_aligned(self) -> bool {
        !matches!(self, Detection::Undetermined)
    }

    #[inline]
    pub fn reversed(self) -> Detection {
        match self {
            Detection::Confirmed(skew) => Detection::Confirmed(-skew),
            other => other,
        }
    }
}

/// Detection outcome with alignment diagnostics
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DetectionReport {
    pub outcome: Detection,
    /// Aligned windows whose deltas were compared
    pub windows: u32,
    /// Soft misalignments recovered from
    pub resyncs: u32,
}

impl DetectionReport {
    fn undetermined() -> Self {
        DetectionReport {
            outcome: Detection::Undetermined,
            windows: 0,
            resyncs: 0,
        }
    }

    fn exhausted(mut self, saw_negligible: bool) -> Self {
        self.outcome = if saw_negligible {
            Detection::Negligible
        } else {
            Detection::Undetermined
        };
        self
    }
}

/// Pairwise skew detector
#[derive(Clone, Debug)]
pub struct SkewDetector {
    tolerance: Skew,
}

impl SkewDetector {
    pub const DEFAULT_TOLERANCE: Duration = Duration::from_secs(2);

    pub fn new(tolerance: Duration) -> Self {
        SkewDetector {
            tolerance: Skew::from_duration(tolerance),
        }
    }

    pub fn tolerance(&self) -> Skew {
        self.tolerance
    }

    /// Skew of `a`'s clock relative to `b`'s, from `a`'s observations of
    /// `b` against `b`'s observations of itself
    pub fn detect<S>(&self, source: &S, a: &NodeName, b: &NodeName) -> SkewResult<SkewEstimate>
    where
        S: EventSource + ?Sized,
    {
        Ok(self.detect_report(source, a, b)?.outcome.estimate())
    }

    pub fn detect_report<S>(
        &self,
        source: &S,
        a: &NodeName,
        b: &NodeName,
    ) -> SkewResult<DetectionReport>
    where
        S: EventSource + ?Sized,
    {
        if a == b || a.is_reserved() || b.is_reserved() {
            return Ok(DetectionReport::undetermined());
        }
        let stream_a = source.scan(&EventFilter::observations(a, b))?;
        let stream_b = source.scan(&EventFilter::observations(b, b))?;
        Ok(self.detect_streams(stream_a, stream_b))
    }

    /// Try `a` observing `b`, then `b` observing `a`; the result is always
    /// expressed as `a`'s clock relative to `b`'s.
    pub fn detect_pair<S>(
        &self,
        source: &S,
        a: &NodeName,
        b: &NodeName,
    ) -> SkewResult<DetectionReport>
    where
        S: EventSource + ?Sized,
    {
        let forward = self.detect_report(source, a, b)?;
        if let Detection::Confirmed(_) = forward.outcome {
            return Ok(forward);
        }
        let backward = self.detect_report(source, b, a)?;
        let outcome = match backward.outcome {
            Detection::Confirmed(_) => backward.outcome.reversed(),
            _ if forward.outcome.is_aligned() || backward.outcome.is_aligned() => {
                Detection::Negligible
            }
            _ => Detection::Undetermined,
        };
        Ok(DetectionReport {
            outcome,
            windows: forward.windows + backward.windows,
            resyncs: forward.resyncs + backward.resyncs,
        })
    }

    /// Align two timestamp-ordered streams.
    ///
    /// Empty, single-event and never-aligning streams are undetermined.
    pub fn detect_streams<A, B>(&self, stream_a: A, stream_b: B) -> DetectionReport
    where
        A: IntoIterator<Item = Event>,
        B: IntoIterator<Item = Event>,
    {
        let mut report = DetectionReport::undetermined();
        let mut stream_a = stream_a.into_iter();
        let mut stream_b = stream_b.into_iter();

        let (Some(mut a1), Some(mut b1)) = (stream_a.next(), stream_b.next()) else {
            return report;
        };
        let mut saw_negligible = false;

        loop {
            // Advance A until its head matches B's head
            while a1.state != b1.state {
                match stream_a.next() {
                    Some(next) => a1 = next,
                    None => return report.exhausted(saw_negligible),
                }
            }

            let (Some(a2), Some(b2)) = (stream_a.next(), stream_b.next()) else {
                return report.exhausted(saw_negligible);
            };

            if a2.state != b2.state {
                // Soft misalignment: both streams move on by one and realign
                report.resyncs += 1;
                a1 = a2;
                b1 = b2;
                continue;
            }

            report.windows += 1;
            let d1 = a1.timestamp - b1.timestamp;
            let d2 = a2.timestamp - b2.timestamp;

            if (d1 - d2).abs() < self.tolerance {
                if d1.abs() > self.tolerance {
                    report.outcome = Detection::Confirmed(d1);
                    return report;
                }
                saw_negligible = true;
            }

            a1 = a2;
            b1 = b2;
        }
    }
}

impl Default for SkewDetector {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TOLERANCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use skewline_core::{MemoryEventStore, StateCode, Timestamp};

    const P: StateCode = StateCode::PRIMARY;
    const S: StateCode = StateCode::SECONDARY;
    const R: StateCode = StateCode::RECOVERING;
    const D: StateCode = StateCode::DOWN;

    fn stream(origin: &str, subject: &str, steps: &[(StateCode, i64)]) -> Vec<Event> {
        steps
            .iter()
            .map(|&(state, millis)| Event::new(origin, subject, state, Timestamp::from_millis(millis)))
            .collect()
    }

    fn shifted(steps: &[(StateCode, i64)], delta_ms: i64) -> Vec<(StateCode, i64)> {
        steps.iter().map(|&(s, t)| (s, t + delta_ms)).collect()
    }

    const TIMELINE: [(StateCode, i64); 5] = [
        (S, 10_000),
        (P, 60_000),
        (S, 120_000),
        (R, 180_000),
        (S, 240_000),
    ];

    #[test]
    fn test_empty_streams_undetermined() {
        let detector = SkewDetector::default();
        let b = stream("b", "b", &TIMELINE);

        assert_eq!(detector.detect_streams(Vec::new(), b.clone()).outcome, Detection::Undetermined);
        assert_eq!(detector.detect_streams(b, Vec::<Event>::new()).outcome, Detection::Undetermined);
    }

    #[test]
    fn test_single_event_streams_undetermined() {
        let detector = SkewDetector::default();
        let a = stream("a", "b", &[(P, 15_000)]);
        let b = stream("b", "b", &[(P, 5_000)]);

        assert_eq!(detector.detect_streams(a, b).outcome, Detection::Undetermined);
    }

    #[test]
    fn test_constant_offset_confirmed() {
        let detector = SkewDetector::default();
        let a = stream("a", "b", &shifted(&TIMELINE, 5_000));
        let b = stream("b", "b", &TIMELINE);

        let report = detector.detect_streams(a, b);
        assert_eq!(report.outcome, Detection::Confirmed(Skew::from_secs(5)));
        assert_eq!(report.windows, 1);
    }

    #[test]
    fn test_negative_offset_confirmed() {
        let detector = SkewDetector::default();
        let a = stream("a", "b", &shifted(&TIMELINE, -7_500));
        let b = stream("b", "b", &TIMELINE);

        assert_eq!(
            detector.detect_streams(a, b).outcome,
            Detection::Confirmed(Skew::from_millis(-7_500))
        );
    }

    #[test]
    fn test_small_offset_is_not_zero() {
        let detector = SkewDetector::default();
        let a = stream("a", "b", &shifted(&TIMELINE, 1_000));
        let b = stream("b", "b", &TIMELINE);

        let report = detector.detect_streams(a, b);
        assert_eq!(report.outcome, Detection::Negligible);
        assert_eq!(report.outcome.estimate(), SkewEstimate::Undetermined);
    }

    #[test]
    fn test_offset_equal_to_tolerance_is_undetermined() {
        let detector = SkewDetector::default();
        let a = stream("a", "b", &shifted(&TIMELINE, 2_000));
        let b = stream("b", "b", &TIMELINE);

        assert_eq!(detector.detect_streams(a, b).outcome.estimate(), SkewEstimate::Undetermined);
    }

    #[test]
    fn test_leading_unmatched_events_skipped() {
        let detector = SkewDetector::default();
        // A saw a DOWN and a RECOVERING before B's log begins
        let mut steps = vec![(D, 0), (R, 4_000)];
        steps.extend(shifted(&TIMELINE, 9_000));
        let a = stream("a", "b", &steps);
        let b = stream("b", "b", &TIMELINE);

        assert_eq!(
            detector.detect_streams(a, b).outcome,
            Detection::Confirmed(Skew::from_secs(9))
        );
    }

    #[test]
    fn test_disagreeing_deltas_shift_window() {
        let detector = SkewDetector::default();
        // First pair is 30s off, the rest a steady 6s
        let a = stream("a", "b", &[(S, 40_000), (P, 66_000), (S, 126_000), (R, 186_000)]);
        let b = stream("b", "b", &TIMELINE[..4]);

        let report = detector.detect_streams(a, b);
        assert_eq!(report.outcome, Detection::Confirmed(Skew::from_secs(6)));
        assert_eq!(report.windows, 2);
    }

    #[test]
    fn test_soft_misalignment_resyncs() {
        let detector = SkewDetector::default();
        // A logged an extra DOWN that B never reported
        let a = stream(
            "a",
            "b",
            &[(S, 13_000), (D, 20_000), (P, 63_000), (S, 123_000), (R, 183_000)],
        );
        let b = stream("b", "b", &[(S, 10_000), (P, 60_000), (S, 120_000), (R, 180_000)]);

        let report = detector.detect_streams(a, b);
        assert_eq!(report.outcome, Detection::Confirmed(Skew::from_secs(3)));
        assert_eq!(report.resyncs, 1);
    }

    #[test]
    fn test_permanent_misalignment_undetermined() {
        let detector = SkewDetector::default();
        let a = stream("a", "b", &[(D, 1_000), (D, 2_000), (D, 3_000)]);
        let b = stream("b", "b", &TIMELINE);

        assert_eq!(detector.detect_streams(a, b).outcome, Detection::Undetermined);
    }

    #[test]
    fn test_configurable_tolerance() {
        let strict = SkewDetector::new(Duration::from_millis(200));
        let a = stream("a", "b", &shifted(&TIMELINE, 1_000));
        let b = stream("b", "b", &TIMELINE);

        assert_eq!(
            strict.detect_streams(a, b).outcome,
            Detection::Confirmed(Skew::from_secs(1))
        );
    }

    #[test]
    fn test_detect_against_store() {
        let detector = SkewDetector::default();
        let mut store = MemoryEventStore::new();
        store.extend(stream("a", "b", &shifted(&TIMELINE, 4_000)));
        store.extend(stream("b", "self", &TIMELINE));
        // Noise from other observers and subjects
        store.extend(stream("c", "b", &shifted(&TIMELINE, -20_000)));
        store.extend(stream("unknown", "b", &TIMELINE));

        let a = NodeName::new("a");
        let b = NodeName::new("b");
        assert_eq!(
            detector.detect(&store, &a, &b).unwrap(),
            SkewEstimate::Determined(Skew::from_secs(4))
        );
        // b never observed a
        assert_eq!(detector.detect(&store, &b, &a).unwrap(), SkewEstimate::Undetermined);
        assert_eq!(detector.detect(&store, &a, &a).unwrap(), SkewEstimate::Undetermined);
    }

    #[test]
    fn test_detect_pair_falls_back_to_reverse_direction() {
        let detector = SkewDetector::default();
        let mut store = MemoryEventStore::new();
        store.extend(stream("a", "b", &shifted(&TIMELINE, 4_000)));
        store.extend(stream("b", "self", &TIMELINE));

        let a = NodeName::new("a");
        let b = NodeName::new("b");
        let report = detector.detect_pair(&store, &b, &a).unwrap();
        assert_eq!(report.outcome, Detection::Confirmed(Skew::from_secs(-4)));
    }

    fn arb_states() -> impl Strategy<Value = Vec<StateCode>> {
        prop::collection::vec((0u8..=10).prop_map(StateCode::new), 2..40)
    }

    proptest! {
        #[test]
        fn prop_exact_offset_detected(
            states in arb_states(),
            magnitude_ms in 2_001i64..3_600_000,
            negative in any::<bool>(),
        ) {
            let delta_ms = if negative { -magnitude_ms } else { magnitude_ms };
            let steps: Vec<(StateCode, i64)> = states
                .iter()
                .enumerate()
                .map(|(i, &s)| (s, 1_000_000 + i as i64 * 30_000))
                .collect();
            let a = stream("a", "b", &shifted(&steps, delta_ms));
            let b = stream("b", "b", &steps);

            let outcome = SkewDetector::default().detect_streams(a, b).outcome;
            prop_assert_eq!(outcome, Detection::Confirmed(Skew::from_millis(delta_ms)));
        }

        #[test]
        fn prop_offset_within_tolerance_never_confirmed(
            states in arb_states(),
            delta_ms in -2_000i64..=2_000,
        ) {
            let steps: Vec<(StateCode, i64)> = states
                .iter()
                .enumerate()
                .map(|(i, &s)| (s, i as i64 * 30_000))
                .collect();
            let a = stream("a", "b", &shifted(&steps, delta_ms));
            let b = stream("b", "b", &steps);

            let outcome = SkewDetector::default().detect_streams(a, b).outcome;
            prop_assert_eq!(outcome.estimate(), SkewEstimate::Undetermined);
        }

        #[test]
        fn prop_short_streams_undetermined(state in 0u8..=10, t_a in any::<i32>(), t_b in any::<i32>()) {
            let a = stream("a", "b", &[(StateCode::new(state), t_a as i64)]);
            let b = stream("b", "b", &[(StateCode::new(state), t_b as i64)]);
            prop_assert_eq!(
                SkewDetector::default().detect_streams(a, b).outcome,
                Detection::Undetermined
            );
        }
    }
}
