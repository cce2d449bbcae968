use partition_stress::harness::pool::WorkerPool;
use partition_stress::harness::types::HarnessConfig;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        eprintln!(
            "Usage: {} [--workers N] [--ops N] [--move-cap N] [--hard-cap N] \
             [--cycles N] [--value-size N] [--epoch-ms N] [--json]",
            args[0]
        );
        eprintln!("Example: {} --workers 2 --ops 10000 --move-cap 500000", args[0]);
        std::process::exit(0);
    }

    let mut config = HarnessConfig::default();
    let mut json_output = false;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--workers" => {
                config.worker_count = args[i + 1].parse()?;
                i += 2;
            }
            "--ops" => {
                config.operations_per_worker = args[i + 1].parse()?;
                i += 2;
            }
            "--move-cap" => {
                config.move_cap = args[i + 1].parse()?;
                i += 2;
            }
            "--hard-cap" => {
                config.hard_cap = Some(args[i + 1].parse()?);
                i += 2;
            }
            "--cycles" => {
                config.partition_cycles = args[i + 1].parse()?;
                i += 2;
            }
            "--value-size" => {
                config.value_size = args[i + 1].parse()?;
                i += 2;
            }
            "--epoch-ms" => {
                config.epoch = Duration::from_millis(args[i + 1].parse()?);
                i += 2;
            }
            "--json" => {
                json_output = true;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    config.validate()?;

    tracing::info!("Starting stress run...");
    let pool = WorkerPool::new(config);
    let summary = pool.run().await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for report in &summary.reports {
            tracing::info!(
                "worker {} -> {:?}: {} (ops={}, stalls={}, advisories={})",
                report.worker_id,
                report.status,
                report.detail,
                report.ops_ok,
                report.budget_stalls,
                report.hard_cap_warnings
            );
        }
        tracing::info!(
            "summary: {} ops, {} errors, {} splits, {} partitions, {} records, {} failed workers",
            summary.total_ops,
            summary.total_errors,
            summary.splits_observed,
            summary.final_partition_count,
            summary.final_record_count,
            summary.failed_workers()
        );
    }

    if summary.failed_workers() > 0 {
        std::process::exit(1);
    }

    Ok(())
}
