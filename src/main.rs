//! Off-grid solar simulator entry point — CLI wiring and config-driven engine
//! construction.

use std::path::Path;
use std::process;

use offgrid_sim::config::ScenarioConfig;
use offgrid_sim::io::export::export_csv;
use offgrid_sim::sim::engine::Engine;
use offgrid_sim::sim::summary::{Metric, MonthlyPerformance};

/// Parsed CLI arguments.
struct CliArgs {
    scenario_path: Option<String>,
    preset: Option<String>,
    csv_out: Option<String>,
    log_out: Option<String>,
    strict: bool,
}

fn print_help() {
    eprintln!("offgrid-sim — Off-grid solar PV energy-balance simulator");
    eprintln!();
    eprintln!("Usage: offgrid-sim [OPTIONS]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --scenario <path>   Load scenario from TOML config file");
    eprintln!("  --preset <name>     Use a built-in preset (cabin_dc)");
    eprintln!("  --out <path>        Export the hourly series to CSV");
    eprintln!("  --log <path>        Write the per-hour text log");
    eprintln!("  --strict            Abort on fatal diagnostics");
    eprintln!("  --help              Show this help message");
    eprintln!();
    eprintln!("If no --scenario or --preset is given, the cabin_dc preset is used.");
}

fn parse_args() -> CliArgs {
    let args: Vec<String> = std::env::args().collect();
    let mut cli = CliArgs {
        scenario_path: None,
        preset: None,
        csv_out: None,
        log_out: None,
        strict: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_help();
                process::exit(0);
            }
            "--scenario" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --scenario requires a path argument");
                    process::exit(1);
                }
                cli.scenario_path = Some(args[i].clone());
            }
            "--preset" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --preset requires a name argument");
                    process::exit(1);
                }
                cli.preset = Some(args[i].clone());
            }
            "--out" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --out requires a path argument");
                    process::exit(1);
                }
                cli.csv_out = Some(args[i].clone());
            }
            "--log" => {
                i += 1;
                if i >= args.len() {
                    eprintln!("error: --log requires a path argument");
                    process::exit(1);
                }
                cli.log_out = Some(args[i].clone());
            }
            "--strict" => {
                cli.strict = true;
            }
            other => {
                eprintln!("error: unknown argument \"{other}\"");
                print_help();
                process::exit(1);
            }
        }
        i += 1;
    }

    cli
}

/// Prints the site overview before the run starts.
fn print_overview(scenario: &ScenarioConfig) {
    let profile = scenario.load_profile();
    println!("Site overview");
    println!("  Sub-arrays: {}", scenario.arrays.len());
    let peak: f64 = scenario.arrays.iter().map(|a| a.peak_power_w).sum();
    println!("  Combined peak array power: {peak:.0} W");
    println!("  Daily load: {:.1} Wh over {} demand hours", profile.daily_load_wh(), profile.demand_hours());
    println!("  Peak hourly load: {:.1} W", profile.peak_load_w());
    println!(
        "  Inverter: {}",
        if scenario.inverter.is_some() { "present" } else { "absent" }
    );
    println!(
        "  Charge controller: {}",
        if scenario.charge_controller.is_some() { "present" } else { "absent" }
    );
    match &scenario.battery_bank {
        Some(bank) => println!(
            "  Battery bank: {:.0} Ah at {:.0} V",
            bank.capacity_ah, bank.nominal_voltage_v
        ),
        None => println!("  Battery bank: absent"),
    }
    println!();
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = parse_args();

    // Load config: --scenario takes priority, then --preset, then cabin_dc
    let scenario = if let Some(ref path) = cli.scenario_path {
        match ScenarioConfig::from_toml_file(Path::new(path)) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else if let Some(ref name) = cli.preset {
        match ScenarioConfig::from_preset(name) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        }
    } else {
        ScenarioConfig::cabin_dc()
    };

    // Validate
    let errors = scenario.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    print_overview(&scenario);

    // Build and run
    let series = scenario.combined_array_series();
    let profile = scenario.load_profile();
    let mut engine = Engine::new(scenario.equipment(), scenario.battery_bank.as_ref())
        .with_start_fraction(scenario.simulation.start_soc_fraction)
        .with_strict(scenario.simulation.strict || cli.strict);

    let result = match engine.run(&series, &profile) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    // Monthly rollups and the annual score
    println!("{}", MonthlyPerformance::compute(&result.records, Metric::ArrayPower));
    println!("{}", MonthlyPerformance::compute(&result.records, Metric::PowerOut));
    println!("{}", result.annual);
    if result.warning_hours() > 0 {
        println!("Under-supply warnings on {} hours", result.warning_hours());
    }
    if let Some(bank) = engine.bank() {
        println!(
            "Bank autonomy sizing: {:.0} Ah required for 3 days at current load",
            bank.capacity_requirement(
                3.0,
                profile.daily_load_wh(),
                scenario.simulation.grid_voltage_v
            )
        );
    }

    // Export CSV if requested
    if let Some(ref path) = cli.csv_out {
        if let Err(e) = export_csv(&result.records, Path::new(path)) {
            eprintln!("error: failed to write CSV: {e}");
            process::exit(1);
        }
        eprintln!("Hourly series written to {path}");
    }

    // Write the per-hour text log if requested
    if let Some(ref path) = cli.log_out {
        if let Err(e) = std::fs::write(path, &result.log) {
            eprintln!("error: failed to write log: {e}");
            process::exit(1);
        }
        eprintln!("Hourly log written to {path}");
    }
}
