//! V2X Security Simulator CLI
//!
//! Run deterministic traffic/attack scenarios with invariant checking.

use clap::Parser;
use std::time::Duration;
use tracing::{debug, error, info, Level};
use tracing_subscriber::FmtSubscriber;
use v2x_core::{SimConfig, SimulationWorld};
use v2x_sim::scenarios::ScenarioId;
use v2x_sim::{ScenarioResult, ScenarioRunner, SimExport};

/// Run a single scenario with frame-by-frame export for offline viewing.
fn run_with_export(seed: u64, scenario: ScenarioId, duration: f64, export_path: &str) -> ScenarioResult {
    let mut export = SimExport::new(scenario.name(), seed);
    // Export every 10 ticks (one frame per simulated second).
    let export_interval = 10;

    let result = ScenarioRunner::new(seed)
        .with_duration(duration)
        .run_observed(scenario, |time_sec, snap| {
            if (snap.step - 1) % export_interval == 0 {
                export.add_frame(time_sec, snap.clone());
            }
        });
    export.finalize(result.passed, result.failure_reason.clone());

    if let Err(e) = export.write_to_file(export_path) {
        error!("Failed to write export: {}", e);
    } else {
        info!("Exported {} frames to {}", export.frames.len(), export_path);
    }

    result
}

/// Paced real-time demonstration loop: 10 Hz while running, 2 Hz while
/// paused, matching the liveness cadence a live viewer expects.
async fn run_paced(seed: u64, scenario: ScenarioId, duration: f64) {
    let mut world = SimulationWorld::new(SimConfig {
        seed,
        ..Default::default()
    });
    let preset = scenario.preset();
    world.update_params(preset.params);
    if let Some((kind, sophistication)) = preset.attack {
        world.set_attack(Some(kind), sophistication);
    }
    world.start();

    let target_ticks = (duration / v2x_core::TICK_SECS) as u64;
    while world.tick_count() < target_ticks {
        let snap = if world.is_running() {
            tokio::time::sleep(Duration::from_millis(100)).await;
            world.step()
        } else {
            tokio::time::sleep(Duration::from_millis(500)).await;
            world.snapshot()
        };

        if snap.step % 10 == 0 {
            info!(
                "t={:.1}s | vehicles={} | links={} | attacks={} | anomalies={}",
                world.now(),
                snap.vehicles.len(),
                snap.v2v_communications.len(),
                snap.active_attacks_count,
                snap.anomalies.len()
            );
        } else {
            debug!("t={:.1}s step complete", world.now());
        }
    }
    info!("Paced run finished at t={:.1}s", world.now());
}

/// V2X Security Simulator CLI
#[derive(Parser, Debug)]
#[command(name = "v2x-sim")]
#[command(about = "Run deterministic V2X security simulations", long_about = None)]
struct Args {
    /// Master seed for determinism (0 = random from time)
    #[arg(short, long, default_value = "42")]
    seed: u64,

    /// Scenario to run (normal, heavy, highway, attack_demo, replay, flood, all)
    #[arg(short = 'S', long, default_value = "all")]
    scenario: String,

    /// Number of consecutive seeds to test (for CI mode)
    #[arg(long, default_value = "1")]
    seeds: usize,

    /// Maximum simulation duration in simulated seconds
    #[arg(short, long, default_value = "60")]
    duration: f64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// JSON output for CI parsing
    #[arg(long)]
    json: bool,

    /// Export sampled snapshots to a JSON file
    #[arg(long)]
    export: Option<String>,

    /// Run one scenario paced in real time instead of as fast as possible
    #[arg(long)]
    paced: bool,
}

fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    if !args.json {
        info!("V2X Security Simulator v0.1.0");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    }

    // Parse scenarios
    let scenarios: Vec<ScenarioId> = if args.scenario == "all" {
        ScenarioId::all()
    } else {
        vec![args.scenario.parse().unwrap_or_else(|e: String| {
            eprintln!("Error: {}", e);
            eprintln!("Available scenarios: normal, heavy, highway, attack_demo, replay, flood, all");
            std::process::exit(1);
        })]
    };

    // Determine base seed
    let base_seed = if args.seed == 0 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos() as u64
    } else {
        args.seed
    };

    // Handle --paced mode for live demonstration
    if args.paced {
        if scenarios.len() > 1 {
            eprintln!("Error: --paced only supports a single scenario, not 'all'");
            std::process::exit(1);
        }
        let runtime = tokio::runtime::Runtime::new().expect("Failed to build tokio runtime");
        runtime.block_on(run_paced(base_seed, scenarios[0], args.duration));
        return;
    }

    // Handle --export mode
    if let Some(export_path) = &args.export {
        if scenarios.len() > 1 {
            eprintln!("Error: --export only supports a single scenario, not 'all'");
            std::process::exit(1);
        }

        info!("Running with export to: {}", export_path);
        let result = run_with_export(base_seed, scenarios[0], args.duration, export_path);

        if result.passed {
            info!("✓ {} (seed={}) PASSED - exported to {}", scenarios[0].name(), base_seed, export_path);
        } else {
            error!(
                "✗ {} FAILED: {}",
                scenarios[0].name(),
                result.failure_reason.as_deref().unwrap_or("unknown")
            );
            std::process::exit(1);
        }
        return;
    }

    // Track results
    let mut all_results: Vec<ScenarioResult> = Vec::new();
    let mut failed_count = 0;

    // Run simulations
    for seed_offset in 0..args.seeds {
        let seed = base_seed.wrapping_add(seed_offset as u64);

        let runner = ScenarioRunner::new(seed).with_duration(args.duration);

        for scenario in &scenarios {
            let result = runner.run(*scenario);

            if !args.json {
                if result.passed {
                    info!("✓ {} (seed={}) PASSED", scenario.name(), seed);
                } else {
                    error!(
                        "✗ {} (seed={}) FAILED: {}",
                        scenario.name(),
                        seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }

            if !result.passed {
                failed_count += 1;
            }

            all_results.push(result);
        }
    }

    // Summary
    let total = all_results.len();
    let passed = total - failed_count;

    if args.json {
        // JSON output for CI parsing
        let summary = serde_json::json!({
            "total": total,
            "passed": passed,
            "failed": failed_count,
            "results": all_results.iter().map(|r| {
                serde_json::json!({
                    "scenario": r.scenario.name(),
                    "seed": r.seed,
                    "passed": r.passed,
                    "ticks": r.total_ticks,
                    "time_secs": r.final_time_secs,
                    "beacons": r.metrics.beacons_sent,
                    "attacks_initiated": r.metrics.attacks_initiated,
                    "attacks_blocked": r.metrics.attacks_blocked,
                    "failure_reason": r.failure_reason,
                })
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
    } else {
        info!("");
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        if failed_count == 0 {
            info!("✅ All {} scenario runs passed!", total);
        } else {
            error!("❌ {}/{} scenario runs failed!", failed_count, total);

            // List failed seeds
            for result in &all_results {
                if !result.passed {
                    error!(
                        "  - {} seed={}: {}",
                        result.scenario.name(),
                        result.seed,
                        result.failure_reason.as_deref().unwrap_or("unknown")
                    );
                }
            }
        }
    }

    // Exit with proper code for CI
    if failed_count > 0 {
        std::process::exit(1);
    }
}
