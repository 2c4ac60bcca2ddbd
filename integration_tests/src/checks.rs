//! Publish-rate checks over a captured traffic window.

use std::time::Duration;

use colored::Colorize;

use sensor_node_rust_firmware::config::policy;
use sensor_node_rust_firmware::telemetry::Message;

use crate::sniffer::Capture;

/// Check result.
pub struct TestResult {
    pub name: String,
    pub passed: bool,
    pub message: Option<String>,
}

impl TestResult {
    fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            message: None,
        }
    }

    fn fail(name: &str, message: &str) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            message: Some(message.to_string()),
        }
    }
}

/// Run a check function and print results as it happens.
fn run_check<F>(name: &str, capture: &Capture, check_fn: F) -> TestResult
where
    F: FnOnce(&Capture) -> TestResult,
{
    print!("  {} ... ", name);
    std::io::Write::flush(&mut std::io::stdout()).ok();

    let mut result = check_fn(capture);
    result.name = name.to_string();

    if result.passed {
        println!("{}", "PASS".green().bold());
    } else {
        println!("{}", "FAIL".red().bold());
        if let Some(msg) = &result.message {
            println!("    {}", msg.red());
        }
    }

    result
}

/// Run all checks and return results.
pub fn run_all_checks(capture: &Capture) -> Vec<TestResult> {
    let mut results = Vec::new();

    results.push(run_check("All frames decode", capture, check_all_frames_decode));
    results.push(run_check("Temperature is publishing", capture, check_temperature_present));
    results.push(run_check(
        "Early temperature publishes carry a real change",
        capture,
        check_temperature_spacing,
    ));
    results.push(run_check(
        "Flood alarm respects the quiet period",
        capture,
        check_flood_quiet_period,
    ));
    results.push(run_check(
        "GPS positions are rate limited",
        capture,
        check_gps_spacing,
    ));
    results.push(run_check("TVOC values are sane", capture, check_tvoc_range));

    results
}

/// Print check results summary.
pub fn print_results(results: &[TestResult]) {
    println!("\n{}", "=".repeat(60));
    println!("{}", "Check Results".bold());
    println!("{}", "=".repeat(60));

    let mut passed = 0;
    let mut failed = 0;

    for result in results {
        if result.passed {
            println!("  {} {}", "[PASS]".green().bold(), result.name);
            passed += 1;
        } else {
            println!("  {} {}", "[FAIL]".red().bold(), result.name);
            if let Some(msg) = &result.message {
                println!("         {}", msg.red());
            }
            failed += 1;
        }
    }

    println!("{}", "-".repeat(60));
    println!(
        "  Total: {} passed, {} failed",
        passed.to_string().green(),
        if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        }
    );
    println!("{}", "=".repeat(60));
}

// --- Individual Checks ---

fn check_all_frames_decode(capture: &Capture) -> TestResult {
    if capture.messages.is_empty() {
        return TestResult::fail("check", "No frames captured, is the node running?");
    }
    if capture.decode_errors > 0 {
        return TestResult::fail(
            "check",
            &format!("{} frames failed to decode", capture.decode_errors),
        );
    }
    TestResult::pass("check")
}

fn check_temperature_present(capture: &Capture) -> TestResult {
    let count = capture
        .messages
        .iter()
        .filter(|(_, m)| matches!(m, Message::Temperature { .. }))
        .count();

    if count == 0 {
        TestResult::fail("check", "No temperature publishes observed")
    } else {
        TestResult::pass("check")
    }
}

/// Two temperature publishes closer together than the ceiling interval must
/// differ by at least the change threshold.
fn check_temperature_spacing(capture: &Capture) -> TestResult {
    let ceiling = Duration::from_millis(policy::TEMPERATURE_PUB_INTERVAL_MS);

    let readings: Vec<(Duration, f32)> = capture
        .messages
        .iter()
        .filter_map(|(at, m)| match m {
            Message::Temperature { celsius, .. } => Some((*at, *celsius)),
            _ => None,
        })
        .collect();

    for pair in readings.windows(2) {
        let (prev_at, prev) = pair[0];
        let (at, value) = pair[1];

        if at - prev_at < ceiling && (value - prev).abs() < policy::TEMPERATURE_PUB_DIFFERENCE_C {
            return TestResult::fail(
                "check",
                &format!(
                    "Publishes {:.1}s apart with only {:.3} C between them",
                    (at - prev_at).as_secs_f64(),
                    (value - prev).abs()
                ),
            );
        }
    }

    TestResult::pass("check")
}

/// Repeated flood alarm publishes with the same value must be at least the
/// quiet period apart.
fn check_flood_quiet_period(capture: &Capture) -> TestResult {
    let quiet = Duration::from_millis(policy::FLOOD_NO_CHANGE_INTERVAL_MS);

    let alarms: Vec<(Duration, bool)> = capture
        .messages
        .iter()
        .filter_map(|(at, m)| match m {
            Message::Bool { value, .. } => Some((*at, *value)),
            _ => None,
        })
        .collect();

    for pair in alarms.windows(2) {
        let (prev_at, prev) = pair[0];
        let (at, value) = pair[1];

        if value == prev && at - prev_at < quiet {
            return TestResult::fail(
                "check",
                &format!(
                    "Unchanged alarm repeated after {:.1}s",
                    (at - prev_at).as_secs_f64()
                ),
            );
        }
    }

    TestResult::pass("check")
}

/// GPS position publishes must be at least the minimum interval apart.
fn check_gps_spacing(capture: &Capture) -> TestResult {
    let min_interval = Duration::from_millis(policy::GPS_PUB_INTERVAL_MS);

    let positions: Vec<Duration> = capture
        .messages
        .iter()
        .filter_map(|(at, m)| match m {
            Message::Text { .. } => Some(*at),
            _ => None,
        })
        .collect();

    for pair in positions.windows(2) {
        let spacing = pair[1] - pair[0];
        if spacing < min_interval {
            return TestResult::fail(
                "check",
                &format!("Positions only {:.1}s apart", spacing.as_secs_f64()),
            );
        }
    }

    TestResult::pass("check")
}

fn check_tvoc_range(capture: &Capture) -> TestResult {
    for (_, message) in &capture.messages {
        if let Message::Int { value, .. } = message {
            // SGP30 reports 0..=60000 ppb
            if *value < 0 || *value > 60_000 {
                return TestResult::fail("check", &format!("TVOC reading {} out of range", value));
            }
        }
    }
    TestResult::pass("check")
}
