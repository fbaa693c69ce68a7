use std::env;
use std::fs::File;
use std::io::Read;
use std::process;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use codelink_pipeline::events::EventLog;
use codelink_pipeline::normalizer::Normalizer;
use codelink_pipeline::telemetry::{aggregate, TelemetrySnapshot};
use codelink_pipeline::triage::{Disposition, TriageConfig};
use codelink_pipeline::types::MappingQuery;
use codelink_registry::bundles::load_bundles_file;
use codelink_registry::registry::load_registry_file;

// ---------------------------------------------------------------------------
// Feed input
// ---------------------------------------------------------------------------

/// One facility feed row: a facility-local code plus its free-text
/// description, exactly as the submitting HIS exported it.
#[derive(Debug, Deserialize)]
struct FeedRecord {
    facility_id: String,
    internal_code: String,
    description: String,
}

/// Counts gathered across the run, threaded into both output formats.
struct RunCounts {
    processed: usize,
    skipped: usize,
    registry_entries: usize,
    bundles: usize,
}

/// Load the normalization feed CSV. Expected columns:
/// facility_id,internal_code,description
///
/// Fields are whitespace-trimmed so padded facility ids still match the
/// `--facilities` filter.
fn load_feed<R: Read>(reader: R) -> Result<Vec<FeedRecord>, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<FeedRecord>().enumerate() {
        let record = row.map_err(|e| format!("feed line {}: {}", i + 2, e))?;
        records.push(record);
    }
    Ok(records)
}

fn load_feed_file(path: &str) -> Result<Vec<FeedRecord>, String> {
    let file = File::open(path).map_err(|e| format!("cannot open '{}': {}", path, e))?;
    load_feed(file)
}

/// Parse the `--days` value. The telemetry window must cover at least one
/// day; zero or negative windows would silently produce an empty snapshot.
fn parse_window_days(raw: &str) -> Result<i64, String> {
    let days: i64 = raw
        .parse()
        .map_err(|_| "--days requires a positive integer".to_string())?;
    if days < 1 {
        return Err("--days must be at least 1".to_string());
    }
    Ok(days)
}

// ---------------------------------------------------------------------------
// JSON output contract
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct TelemetryJson {
    success: bool,
    generated_at: String,
    window_days: i64,
    facility_filter: Vec<String>,
    load_ms: u128,
    normalize_ms: u128,
    totals: TotalsJson,
    kpis: KpisJson,
    dispositions: DispositionsJson,
    facilities: Vec<FacilityJson>,
    daily: Vec<DailyJson>,
    #[serde(skip_serializing_if = "Option::is_none")]
    last_event_at: Option<String>,
    config: ConfigJson,
}

#[derive(Serialize)]
struct TotalsJson {
    events: usize,
    unique_internal_codes: usize,
    overrides: usize,
    records_processed: usize,
    records_skipped: usize,
    registry_entries: usize,
    bundle_catalog_size: usize,
}

#[derive(Serialize)]
struct KpisJson {
    avg_confidence: f64,
    avg_latency_ms: f64,
    p95_latency_ms: u64,
}

#[derive(Serialize)]
struct DispositionsJson {
    auto_accept_pct: f64,
    review_required_pct: f64,
    rejected_pct: f64,
    no_match_pct: f64,
}

#[derive(Serialize)]
struct FacilityJson {
    facility_id: String,
    volume: usize,
    avg_confidence: f64,
    override_hits: usize,
}

#[derive(Serialize)]
struct DailyJson {
    day: String,
    volume: usize,
    avg_confidence: f64,
}

#[derive(Serialize)]
struct ConfigJson {
    auto_accept_threshold: f64,
    review_trigger: f64,
}

fn build_json(
    snapshot: &TelemetrySnapshot,
    config: &TriageConfig,
    facility_filter: &[String],
    counts: &RunCounts,
    load_ms: u128,
    normalize_ms: u128,
) -> TelemetryJson {
    TelemetryJson {
        success: true,
        generated_at: Utc::now().to_rfc3339(),
        window_days: snapshot.window_days,
        facility_filter: facility_filter.to_vec(),
        load_ms,
        normalize_ms,
        totals: TotalsJson {
            events: snapshot.total_events,
            unique_internal_codes: snapshot.unique_internal_codes,
            overrides: snapshot.override_count,
            records_processed: counts.processed,
            records_skipped: counts.skipped,
            registry_entries: counts.registry_entries,
            bundle_catalog_size: counts.bundles,
        },
        kpis: KpisJson {
            avg_confidence: snapshot.avg_confidence,
            avg_latency_ms: snapshot.avg_latency_ms,
            p95_latency_ms: snapshot.p95_latency_ms,
        },
        dispositions: DispositionsJson {
            auto_accept_pct: snapshot.dispositions.auto_accept_pct,
            review_required_pct: snapshot.dispositions.review_required_pct,
            rejected_pct: snapshot.dispositions.rejected_pct,
            no_match_pct: snapshot.dispositions.no_match_pct,
        },
        facilities: snapshot
            .facilities
            .iter()
            .map(|f| FacilityJson {
                facility_id: f.facility_id.clone(),
                volume: f.volume,
                avg_confidence: f.avg_confidence,
                override_hits: f.override_hits,
            })
            .collect(),
        daily: snapshot
            .daily
            .iter()
            .map(|d| DailyJson {
                day: d.day.to_string(),
                volume: d.volume,
                avg_confidence: d.avg_confidence,
            })
            .collect(),
        last_event_at: snapshot.last_event_at.map(|t| t.to_rfc3339()),
        config: ConfigJson {
            auto_accept_threshold: config.auto_accept_threshold,
            review_trigger: config.review_trigger,
        },
    }
}

// ---------------------------------------------------------------------------
// Human-readable output
// ---------------------------------------------------------------------------

fn disposition_bar(pct: f64) -> String {
    let filled = (pct / 100.0 * 24.0).round() as usize;
    let mut bar = String::new();
    for i in 0..24 {
        bar.push(if i < filled { '\u{2588}' } else { '\u{2591}' });
    }
    bar
}

fn print_human(
    snapshot: &TelemetrySnapshot,
    config: &TriageConfig,
    counts: &RunCounts,
    load_ms: u128,
    normalize_ms: u128,
) {
    println!();
    println!("  \u{2554}{}\u{2557}", "\u{2550}".repeat(62));
    println!("  \u{2551}          CODELINK \u{2014} Normalization Telemetry Digest           \u{2551}");
    println!("  \u{255a}{}\u{255d}", "\u{2550}".repeat(62));
    println!();

    println!(
        "  {} registry entries  \u{00b7}  {} bundles in catalog",
        counts.registry_entries, counts.bundles
    );
    println!(
        "  {} records processed ({} skipped)  \u{00b7}  {} events in the last {} days",
        counts.processed, counts.skipped, snapshot.total_events, snapshot.window_days
    );
    println!(
        "  {} unique internal codes  \u{00b7}  {} operator overrides",
        snapshot.unique_internal_codes, snapshot.override_count
    );
    println!();

    if snapshot.total_events == 0 {
        println!("  No events in the reporting window.");
    } else {
        let d = &snapshot.dispositions;
        let rows = [
            (Disposition::AutoAccept, d.auto_accept_pct),
            (Disposition::ReviewRequired, d.review_required_pct),
            (Disposition::Rejected, d.rejected_pct),
            (Disposition::NoMatch, d.no_match_pct),
        ];
        for (disposition, pct) in rows {
            println!(
                "  {:16} {} {:5.1}%",
                disposition.to_string(),
                disposition_bar(pct),
                pct
            );
        }
        println!();

        println!(
            "  Confidence avg {:.2}  \u{00b7}  Latency avg {:.1}ms, p95 {}ms",
            snapshot.avg_confidence, snapshot.avg_latency_ms, snapshot.p95_latency_ms
        );
        println!();

        println!("  {:\u{2500}<62}", "");
        println!(
            "  {:14} {:>8} {:>16} {:>12}",
            "FACILITY", "VOLUME", "AVG CONFIDENCE", "OVERRIDES"
        );
        for f in &snapshot.facilities {
            println!(
                "  {:14} {:>8} {:>16.2} {:>12}",
                f.facility_id, f.volume, f.avg_confidence, f.override_hits
            );
        }
        println!("  {:\u{2500}<62}", "");
        println!();

        for point in &snapshot.daily {
            println!(
                "  {}  {:>5} events  \u{00b7}  avg confidence {:.2}",
                point.day, point.volume, point.avg_confidence
            );
        }
        if let Some(last) = snapshot.last_event_at {
            println!();
            println!("  Last event at {}", last.to_rfc3339());
        }
    }

    println!();
    println!(
        "  Thresholds: auto-accept \u{2265} {:.2}, review \u{2265} {:.2}",
        config.auto_accept_threshold, config.review_trigger
    );
    println!(
        "  \u{23f1}  Reference data loaded in {}ms \u{00b7} Normalization ran in {}ms \u{00b7} Total {}ms",
        load_ms,
        normalize_ms,
        load_ms + normalize_ms
    );
    println!();
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn usage() -> ! {
    eprintln!("Usage: codelink-server <registry.csv> <bundles.csv> <feed.csv> [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --facilities    Comma-separated facility IDs to process");
    eprintln!("  --days          Telemetry window in days (default: 7)");
    eprintln!("  --auto-accept   Auto-accept confidence threshold (default: 0.80)");
    eprintln!("  --review        Review-trigger confidence threshold (default: 0.50)");
    eprintln!("  --json          Output as JSON instead of formatted text");
    eprintln!();
    eprintln!("Example:");
    eprintln!("  codelink-server fixtures/sbs_registry.csv fixtures/bundles.csv fixtures/feed.csv");
    eprintln!("  codelink-server fixtures/sbs_registry.csv fixtures/bundles.csv fixtures/feed.csv \\");
    eprintln!("      --facilities fac-riyadh-01,fac-jeddah-02 --days 30 --json");
    process::exit(1);
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 4 {
        usage();
    }

    let registry_path = &args[1];
    let bundles_path = &args[2];
    let feed_path = &args[3];

    // Parse optional flags
    let mut facility_filter: Option<Vec<String>> = None;
    let mut window_days: i64 = 7;
    let mut auto_accept = codelink_registry::thresholds::DEFAULT_AUTO_ACCEPT_THRESHOLD;
    let mut review = codelink_registry::thresholds::DEFAULT_REVIEW_TRIGGER;
    let mut json_output = false;
    let mut i = 4;
    while i < args.len() {
        match args[i].as_str() {
            "--facilities" => {
                if i + 1 < args.len() {
                    facility_filter = Some(
                        args[i + 1]
                            .split(',')
                            .map(|s| s.trim().to_string())
                            .collect(),
                    );
                    i += 2;
                } else {
                    eprintln!("Error: --facilities requires a comma-separated list of facility IDs");
                    process::exit(1);
                }
            }
            "--days" => {
                if i + 1 < args.len() {
                    window_days = parse_window_days(&args[i + 1]).unwrap_or_else(|e| {
                        eprintln!("Error: {}", e);
                        process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --days requires a number");
                    process::exit(1);
                }
            }
            "--auto-accept" => {
                if i + 1 < args.len() {
                    auto_accept = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: --auto-accept requires a number in [0, 1]");
                        process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --auto-accept requires a value");
                    process::exit(1);
                }
            }
            "--review" => {
                if i + 1 < args.len() {
                    review = args[i + 1].parse().unwrap_or_else(|_| {
                        eprintln!("Error: --review requires a number in [0, 1]");
                        process::exit(1);
                    });
                    i += 2;
                } else {
                    eprintln!("Error: --review requires a value");
                    process::exit(1);
                }
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
    }

    let config = match TriageConfig::validated(auto_accept, review) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Load reference data and the feed
    let load_start = Instant::now();
    let registry = match load_registry_file(registry_path) {
        Ok(r) => Arc::new(r),
        Err(e) => {
            eprintln!("Error loading registry CSV: {}", e);
            process::exit(1);
        }
    };
    let bundles = match load_bundles_file(bundles_path) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error loading bundle CSV: {}", e);
            process::exit(1);
        }
    };
    let feed = match load_feed_file(feed_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error loading feed CSV: {}", e);
            process::exit(1);
        }
    };
    let load_ms = load_start.elapsed().as_millis();

    let facility_filter_list: Vec<String> = facility_filter.clone().unwrap_or_default();

    // Normalize every feed row and record it in the event log
    let normalizer = Normalizer::new(Arc::clone(&registry));
    let event_log = EventLog::new();

    let normalize_start = Instant::now();
    let mut records_processed = 0usize;
    let mut records_skipped = 0usize;
    for (n, record) in feed.iter().enumerate() {
        if let Some(ref filter) = facility_filter {
            if !filter.contains(&record.facility_id) {
                continue;
            }
        }
        let query = MappingQuery::new(
            &format!("feed-{:06}", n + 1),
            &record.facility_id,
            &record.internal_code,
            &record.description,
        );
        match normalizer.normalize(query.clone()).await {
            Ok(outcome) => {
                event_log.record(Utc::now().fixed_offset(), &query, &outcome, &config);
                records_processed += 1;
            }
            Err(e) => {
                log::warn!("skipping feed row {}: {}", n + 1, e);
                records_skipped += 1;
            }
        }
    }
    let normalize_ms = normalize_start.elapsed().as_millis();

    if records_processed == 0 && records_skipped == 0 {
        eprintln!("Error: no matching feed rows to process");
        if let Some(ref filter) = facility_filter {
            eprintln!("  Requested facilities: {:?}", filter);
        }
        process::exit(1);
    }

    let snapshot = aggregate(&event_log.snapshot(), window_days, Utc::now().fixed_offset());

    let counts = RunCounts {
        processed: records_processed,
        skipped: records_skipped,
        registry_entries: registry.len(),
        bundles: bundles.len(),
    };

    if json_output {
        let digest = build_json(
            &snapshot,
            &config,
            &facility_filter_list,
            &counts,
            load_ms,
            normalize_ms,
        );
        match serde_json::to_string_pretty(&digest) {
            Ok(out) => println!("{}", out),
            Err(e) => {
                eprintln!("Error serializing output: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_human(&snapshot, &config, &counts, load_ms, normalize_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feed_fields_are_trimmed_for_filter_matching() {
        let csv = "\
facility_id,internal_code,description
 fac-riyadh-01 ,  NEW_LAB_X1,  Rapid PCR panel
fac-jeddah-02,HEM_CBC,complete blood count
";
        let records = load_feed(csv.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].facility_id, "fac-riyadh-01");
        assert_eq!(records[0].internal_code, "NEW_LAB_X1");
        assert_eq!(records[0].description, "Rapid PCR panel");
    }

    #[test]
    fn malformed_feed_row_reports_its_line() {
        let csv = "\
facility_id,internal_code,description
fac-riyadh-01,NEW_LAB_X1
";
        let err = load_feed(csv.as_bytes()).unwrap_err();
        assert!(err.contains("feed line 2"), "got: {}", err);
    }

    #[test]
    fn window_days_rejects_zero_and_negatives() {
        assert_eq!(parse_window_days("7").unwrap(), 7);
        assert!(parse_window_days("0").is_err());
        assert!(parse_window_days("-3").is_err());
        assert!(parse_window_days("abc").is_err());
    }
}
