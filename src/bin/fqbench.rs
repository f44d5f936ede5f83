use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use fqcodel_cuckoo::demo::generator::{one_fat_flow_workload, uniform_constant_workload};
use fqcodel_cuckoo::demo::run_once;
use fqcodel_cuckoo::qdisc::{Config, FqCodelQdisc, ManualClock};

#[derive(Parser)]
#[command(name = "fqbench", about = "Drives the FQ-CoDel scheduler against synthetic workloads")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario and print its analysis report.
    Run {
        #[arg(long, default_value_t = 8)]
        flows: u32,
        #[arg(long, default_value_t = 1000.0)]
        rate_pps: f64,
        #[arg(long, default_value_t = 1_000_000_000)]
        duration_ns: u64,
        #[arg(long, default_value_t = 100_000_000)]
        bandwidth_bps: u64,
    },
    /// Sweep a fat-flow-vs-thin-flows scenario across several flow counts.
    Sweep {
        #[arg(long, default_value_t = 1_000_000_000)]
        duration_ns: u64,
        #[arg(long, default_value_t = 100_000_000)]
        bandwidth_bps: u64,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            flows,
            rate_pps,
            duration_ns,
            bandwidth_bps,
        } => {
            let config = Config::new(flows.max(1))?;
            let qdisc = FqCodelQdisc::try_new(config, ManualClock::new(0))?;
            let workload = uniform_constant_workload(flows, rate_pps, 1500, 42);
            let report = run_once(qdisc, workload, duration_ns, bandwidth_bps, "fq_codel");
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Sweep {
            duration_ns,
            bandwidth_bps,
        } => {
            for flows in [2u32, 4, 8, 16, 32] {
                let config = Config::new(flows)?;
                let qdisc = FqCodelQdisc::try_new(config, ManualClock::new(0))?;
                let workload = one_fat_flow_workload(flows, 5000.0, 200.0, 1500, 7);
                let report = run_once(qdisc, workload, duration_ns, bandwidth_bps, &format!("fat-flow/{flows}"));
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
        }
    }

    Ok(())
}
