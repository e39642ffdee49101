//! Presentation views derived from a grouped ledger.

use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::models::{Asset, ChartPoint, GroupedTransfer};

/// Default number of axis intervals.
pub const NUM_TICKS: usize = 6;

/// Everything needed to render one account's history.
///
/// Immutable; rebuilt after every fetch or threshold change.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerView {
    pub account: String,
    /// Balance the history was reconstructed from.
    pub balance: Asset,
    /// Filtered transfers, newest first, with impact buckets.
    pub transfers: Vec<GroupedTransfer>,
    pub chart_points: Vec<ChartPoint>,
    /// Evenly spaced axis timestamps, oldest first.
    pub ticks: Vec<DateTime<Utc>>,
    /// Vertical chart bounds, `None` without points.
    pub chart_range: Option<(f64, f64)>,
}

/// One chart point per transfer, in the same order.
pub fn chart_points(transfers: &[GroupedTransfer]) -> Vec<ChartPoint> {
    transfers
        .iter()
        .map(|t| ChartPoint {
            timestamp: t.timestamp,
            balance: t.balance_after.to_decimal_f64(),
        })
        .collect()
}

/// `tick_count + 1` timestamps spanning the oldest to the newest point.
///
/// `points` are newest first. Offsets are floored to whole milliseconds.
pub fn axis_ticks(points: &[ChartPoint], tick_count: usize) -> Vec<DateTime<Utc>> {
    if points.len() < 2 || tick_count == 0 {
        return Vec::new();
    }

    let end = points[0].timestamp;
    let start = points[points.len() - 1].timestamp;
    let span_ms = (end - start).num_milliseconds();
    let n = tick_count as i64;

    (0..=n)
        .map(|i| start + TimeDelta::milliseconds((i * span_ms).div_euclid(n)))
        .collect()
}

/// Vertical range `[min * 0.5, max * 1.05]` over the point balances.
pub fn chart_range(points: &[ChartPoint]) -> Option<(f64, f64)> {
    let mut balances = points.iter().map(|p| p.balance);
    let first = balances.next()?;
    let (min, max) = balances.fold((first, first), |(lo, hi), b| (lo.min(b), hi.max(b)));
    Some((min * 0.5, max * 1.05))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::grouping::group_transfers;
    use crate::services::testing::*;

    fn point(ms: i64, balance: f64) -> ChartPoint {
        ChartPoint {
            timestamp: DateTime::from_timestamp_millis(ms).unwrap(),
            balance,
        }
    }

    #[test]
    fn chart_points_use_whole_units() {
        let events = vec![leg("A", 100, "bob", 5_000), leg("B", 90, "carol", -2_000)];
        let transfers = group_transfers(ACCOUNT, &events, &eos(10_000)).unwrap();

        let points = chart_points(&transfers);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].balance, 1.0);
        assert_eq!(points[1].balance, 0.5);
        assert_eq!(points[0].timestamp, ts(100));
    }

    #[test]
    fn ticks_span_oldest_to_newest() {
        let points = vec![point(6_000, 1.0), point(3_000, 2.0), point(0, 3.0)];
        let ticks = axis_ticks(&points, NUM_TICKS);

        let ms: Vec<i64> = ticks.iter().map(|t| t.timestamp_millis()).collect();
        assert_eq!(ms, vec![0, 1_000, 2_000, 3_000, 4_000, 5_000, 6_000]);
    }

    #[test]
    fn tick_offsets_are_floored() {
        let points = vec![point(10, 1.0), point(0, 1.0)];
        let ms: Vec<i64> = axis_ticks(&points, 6)
            .iter()
            .map(|t| t.timestamp_millis())
            .collect();
        assert_eq!(ms, vec![0, 1, 3, 5, 6, 8, 10]);
    }

    #[test]
    fn fewer_than_two_points_have_no_ticks() {
        assert!(axis_ticks(&[], NUM_TICKS).is_empty());
        assert!(axis_ticks(&[point(0, 1.0)], NUM_TICKS).is_empty());
    }

    #[test]
    fn range_pads_min_and_max() {
        let points = vec![point(0, 10.0), point(1, 40.0), point(2, 20.0)];
        let (low, high) = chart_range(&points).unwrap();
        assert!((low - 5.0).abs() < 1e-9);
        assert!((high - 42.0).abs() < 1e-9);
        assert_eq!(chart_range(&[]), None);
    }
}
