//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `playdate_core` linkage without the Flutter runtime.
//! - Print a deterministic sample aggregation for quick sanity checks.

use chrono::{NaiveDate, NaiveTime};
use playdate_core::{SchedulerConfig, Session};

fn main() {
    println!("playdate_core ping={}", playdate_core::ping());
    println!("playdate_core version={}", playdate_core::core_version());

    if std::env::args().any(|arg| arg == "--demo") {
        if let Err(err) = run_demo() {
            eprintln!("demo failed: {err}");
            std::process::exit(1);
        }
    }
}

fn run_demo() -> Result<(), Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2026, 1, 5).ok_or("invalid demo date")?;
    let two_pm = NaiveTime::from_hms_opt(14, 0, 0).ok_or("invalid demo time")?;
    let half_past = NaiveTime::from_hms_opt(14, 30, 0).ok_or("invalid demo time")?;

    let mut session = Session::init(SchedulerConfig::default(), start);
    let ann = session.participants_mut().add("Ann", Some("555-0101"))?;
    let bo = session.participants_mut().add("Bo", Some("555-0102"))?;
    for id in [&ann.id, &bo.id] {
        session.participants_mut().toggle_slot(id, start, two_pm)?;
        session.participants_mut().toggle_slot(id, start, half_past)?;
    }

    for ranked in session.top_slots(None) {
        println!(
            "top date={} time={} count={} names={}",
            ranked.date,
            ranked.slot.display,
            ranked.count(),
            ranked.names()
        );
    }

    session.participants_mut().select(&ann.id)?;
    if let Some(range) = session.propose_range(start, two_pm) {
        println!(
            "range date={} start={} end={} phones={}",
            range.date,
            range.start_display,
            range.end_display,
            range.phones().join(",")
        );
    }
    session.teardown();
    Ok(())
}
