//! Telemetry aggregation over the normalization event log.
//!
//! Read-only rollups for operational oversight: disposition mix, confidence
//! and latency KPIs, per-facility aggregates, and a daily time series. The
//! aggregator works on a snapshot of the log and is fully deterministic —
//! the only wall-clock input is the caller-supplied `now` used for the
//! window filter, so recomputation from the full log is reproducible.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate};
use serde::Serialize;

use crate::events::NormalizationEvent;
use crate::triage::Disposition;

/// Per-disposition share of events in the window, in percent.
/// The four buckets sum to 100 (±0.1 rounding tolerance) when the window is
/// non-empty, and are all zero when it is empty.
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct DispositionBreakdown {
    pub auto_accept_pct: f64,
    pub review_required_pct: f64,
    pub rejected_pct: f64,
    pub no_match_pct: f64,
}

/// One facility's rollup within the window.
#[derive(Clone, Debug, Serialize)]
pub struct FacilityTelemetry {
    pub facility_id: String,
    pub volume: usize,
    pub avg_confidence: f64,
    pub override_hits: usize,
}

/// One calendar day's rollup, bucketed in the event's source timezone.
#[derive(Clone, Debug, Serialize)]
pub struct DailyTelemetryPoint {
    pub day: NaiveDate,
    pub volume: usize,
    pub avg_confidence: f64,
}

/// The full telemetry rollup for one reporting window.
#[derive(Clone, Debug, Serialize)]
pub struct TelemetrySnapshot {
    pub window_days: i64,
    pub total_events: usize,
    pub unique_internal_codes: usize,
    pub override_count: usize,
    pub dispositions: DispositionBreakdown,
    /// Mean confidence of the chosen code (top candidate when no explicit
    /// choice). Events with no candidates contribute nothing.
    pub avg_confidence: f64,
    pub avg_latency_ms: f64,
    pub p95_latency_ms: u64,
    /// Sorted by volume descending, then facility id for determinism.
    pub facilities: Vec<FacilityTelemetry>,
    /// Sorted by day ascending.
    pub daily: Vec<DailyTelemetryPoint>,
    pub last_event_at: Option<DateTime<FixedOffset>>,
}

impl TelemetrySnapshot {
    fn empty(window_days: i64) -> Self {
        Self {
            window_days,
            total_events: 0,
            unique_internal_codes: 0,
            override_count: 0,
            dispositions: DispositionBreakdown::default(),
            avg_confidence: 0.0,
            avg_latency_ms: 0.0,
            p95_latency_ms: 0,
            facilities: Vec::new(),
            daily: Vec::new(),
            last_event_at: None,
        }
    }
}

/// 95th-percentile by the nearest-rank method: sort ascending, take the
/// value at `ceil(0.95 * n) - 1`, clamped to a valid index for small n.
pub fn p95(latencies: &mut Vec<u64>) -> u64 {
    if latencies.is_empty() {
        return 0;
    }
    latencies.sort_unstable();
    let n = latencies.len();
    let idx = ((0.95 * n as f64).ceil() as usize).saturating_sub(1).min(n - 1);
    latencies[idx]
}

/// An event the aggregator refuses to count: a confidence outside [0, 1]
/// or non-finite means the record is corrupt, and one bad record must not
/// blank the whole snapshot.
fn is_malformed(event: &NormalizationEvent) -> bool {
    match event.confidence {
        Some(c) => !c.is_finite() || !(0.0..=1.0).contains(&c),
        None => false,
    }
}

/// Aggregate the event log into a telemetry snapshot for the trailing
/// `window_days` ending at `now`.
pub fn aggregate(
    events: &[NormalizationEvent],
    window_days: i64,
    now: DateTime<FixedOffset>,
) -> TelemetrySnapshot {
    let cutoff = now - Duration::days(window_days);

    let windowed: Vec<&NormalizationEvent> = events
        .iter()
        .filter(|e| e.timestamp >= cutoff)
        .filter(|e| {
            if is_malformed(e) {
                log::warn!("skipping malformed event {} (confidence {:?})", e.id, e.confidence);
                false
            } else {
                true
            }
        })
        .collect();

    if windowed.is_empty() {
        return TelemetrySnapshot::empty(window_days);
    }

    let total = windowed.len();

    // Disposition mix
    let count_of = |d: Disposition| windowed.iter().filter(|e| e.disposition == d).count();
    let pct = |count: usize| 100.0 * count as f64 / total as f64;
    let dispositions = DispositionBreakdown {
        auto_accept_pct: pct(count_of(Disposition::AutoAccept)),
        review_required_pct: pct(count_of(Disposition::ReviewRequired)),
        rejected_pct: pct(count_of(Disposition::Rejected)),
        no_match_pct: pct(count_of(Disposition::NoMatch)),
    };

    // Confidence KPI: only events that produced a candidate contribute.
    let confidences: Vec<f64> = windowed.iter().filter_map(|e| e.confidence).collect();
    let avg_confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f64>() / confidences.len() as f64
    };

    // Latency KPIs
    let mut latencies: Vec<u64> = windowed.iter().map(|e| e.latency_ms).collect();
    let avg_latency_ms = latencies.iter().sum::<u64>() as f64 / total as f64;
    let p95_latency_ms = p95(&mut latencies);

    let unique_internal_codes = windowed
        .iter()
        .map(|e| e.internal_code.as_str())
        .collect::<HashSet<_>>()
        .len();

    let override_count = windowed.iter().filter(|e| e.overridden).count();

    // Per-facility rollup. BTreeMap keeps the grouping itself deterministic.
    let mut by_facility: BTreeMap<&str, (usize, Vec<f64>, usize)> = BTreeMap::new();
    for e in &windowed {
        let entry = by_facility
            .entry(e.facility_id.as_str())
            .or_insert((0, Vec::new(), 0));
        entry.0 += 1;
        if let Some(c) = e.confidence {
            entry.1.push(c);
        }
        if e.overridden {
            entry.2 += 1;
        }
    }
    let mut facilities: Vec<FacilityTelemetry> = by_facility
        .into_iter()
        .map(|(facility_id, (volume, confs, override_hits))| FacilityTelemetry {
            facility_id: facility_id.to_string(),
            volume,
            avg_confidence: if confs.is_empty() {
                0.0
            } else {
                confs.iter().sum::<f64>() / confs.len() as f64
            },
            override_hits,
        })
        .collect();
    facilities.sort_by(|a, b| {
        b.volume
            .cmp(&a.volume)
            .then_with(|| a.facility_id.cmp(&b.facility_id))
    });

    // Daily series, bucketed by calendar day in the event's source offset.
    let mut by_day: BTreeMap<NaiveDate, (usize, Vec<f64>)> = BTreeMap::new();
    for e in &windowed {
        let entry = by_day.entry(e.timestamp.date_naive()).or_insert((0, Vec::new()));
        entry.0 += 1;
        if let Some(c) = e.confidence {
            entry.1.push(c);
        }
    }
    let daily: Vec<DailyTelemetryPoint> = by_day
        .into_iter()
        .map(|(day, (volume, confs))| DailyTelemetryPoint {
            day,
            volume,
            avg_confidence: if confs.is_empty() {
                0.0
            } else {
                confs.iter().sum::<f64>() / confs.len() as f64
            },
        })
        .collect();

    let last_event_at = windowed.iter().map(|e| e.timestamp).max();

    TelemetrySnapshot {
        window_days,
        total_events: total,
        unique_internal_codes,
        override_count,
        dispositions,
        avg_confidence,
        avg_latency_ms,
        p95_latency_ms,
        facilities,
        daily,
        last_event_at,
    }
}
