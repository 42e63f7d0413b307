//! Trailing return calculation over a NAV series.

use crate::core::fund::{Horizon, NavPoint};
use chrono::Duration;
use std::collections::BTreeMap;

/// Computes trailing returns for the fixed set of horizons.
///
/// `history` must be ordered newest-first; `history[0]` is the latest
/// observation. For each horizon the chronologically nearest point to
/// `latest.date - horizon` is used as the reference; a horizon is
/// omitted when no point lies within 365 days of the target, or when
/// the reference NAV is not positive. Fewer than two points yields an
/// empty map. Pure and never fails.
pub fn trailing_returns(history: &[NavPoint]) -> BTreeMap<Horizon, f64> {
    let mut returns = BTreeMap::new();
    if history.len() < 2 {
        return returns;
    }

    let latest = &history[0];
    for horizon in Horizon::ALL {
        let target = latest.date - horizon.to_duration();

        // Full scan; strictly-smaller comparison means the first point
        // encountered wins ties.
        let mut reference: Option<f64> = None;
        let mut min_diff = Duration::days(365);
        for point in history {
            let diff = (point.date - target).abs();
            if diff < min_diff {
                min_diff = diff;
                reference = Some(point.nav);
            }
        }

        if let Some(nav) = reference
            && nav > 0.0
        {
            let pct = ((latest.nav - nav) / nav) * 100.0;
            returns.insert(horizon, (pct * 100.0).round() / 100.0);
        }
    }

    returns
}
