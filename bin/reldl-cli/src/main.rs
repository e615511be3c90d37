//! reldl-cli - command-line driver for the reliability simulator.
//!
//! Parses and validates the run configuration, echoes it back, runs the
//! batch via `reldl-orchestrator`, and prints the aggregated metrics.

use clap::{Parser, ValueEnum};
use reldl_types::{
    Code, ImportanceSamplingParams, LrcSchema, NetworkSetting, PlaceType, SimConfig, SimType,
    WeibullParams,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum CodeTypeArg {
    Rs,
    Lrc,
    Drc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PlaceTypeArg {
    Flat,
    Hie,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SimTypeArg {
    Regular,
    Unifbfb,
}

#[derive(Parser, Debug)]
#[command(name = "reldl-cli")]
#[command(about = "Monte-Carlo reliability simulator for erasure-coded storage clusters")]
#[command(version)]
struct Args {
    /// Total Monte-Carlo iterations across all shards
    #[arg(short = 'i', long)]
    total_iterations: u64,

    /// Number of shards (worker threads) to split the run across
    #[arg(short = 'p', long)]
    num_processes: u64,

    /// Mission time, in hours
    #[arg(short = 'm', long)]
    mission_time: f64,

    /// Base RNG seed; each shard draws from rseed_plus + shard_index
    #[arg(short = 'u', long)]
    rseed_plus: u64,

    /// Number of racks in the cluster
    #[arg(short = 'R', long)]
    num_racks: usize,

    /// Nodes per rack
    #[arg(short = 'N', long)]
    nodes_per_rack: usize,

    /// Disks per node
    #[arg(short = 'D', long)]
    disks_per_node: usize,

    /// Capacity per disk, in MiB
    #[arg(short = 'C', long)]
    capacity_per_disk: u64,

    /// Chunk size, in MiB
    #[arg(short = 'K', long)]
    chunk_size: u64,

    /// Number of stripes
    #[arg(short = 'S', long)]
    num_stripes: usize,

    /// Erasure code family
    #[arg(short = 't', long, value_enum)]
    code_type: CodeTypeArg,

    /// Total chunks per stripe
    #[arg(short = 'n', long)]
    code_n: u8,

    /// Data chunks per stripe
    #[arg(short = 'k', long)]
    code_k: u8,

    /// Local parity groups (LRC only)
    #[arg(short = 'l', long, default_value_t = 0)]
    code_l: u8,

    /// Reserved free-slot count, never branched on by placement/repair logic
    #[arg(short = 'E', long, default_value_t = 0)]
    code_free: u8,

    /// Chunk placement policy
    #[arg(short = 'T', long, value_enum)]
    place_type: PlaceTypeArg,

    /// Comma-separated chunks-per-rack distribution, e.g. "3,3,3"
    #[arg(short = 'g', long)]
    chunk_rack_config: Option<String>,

    /// Enable the bandwidth-contention network model
    #[arg(short = 'W', long, default_value_t = false)]
    use_network: bool,

    /// "cross_rack_bw,intra_rack_bw" in MiB/s, required when -W is set
    #[arg(short = 's', long)]
    network_setting: Option<String>,

    /// Enable process-wide power-outage events
    #[arg(short = 'O', long, default_value_t = false)]
    use_power_outage: bool,

    /// Drive failures/repairs from recorded trace files instead of Weibull draws
    #[arg(short = 'F', long, default_value_t = false)]
    use_trace: bool,

    /// Trace identifier, required when -F is set
    #[arg(short = 'd', long)]
    trace_id: Option<u32>,

    /// Simulator variant
    #[arg(short = 'A', long, value_enum, default_value_t = SimTypeArg::Regular)]
    sim_type: SimTypeArg,

    /// Balanced-failure-biasing forced-failure probability (UnifBFB only)
    #[arg(short = 'f', long, default_value_t = 0.5)]
    fb_prob: f64,

    /// Uniformization normalizing rate (UnifBFB only)
    #[arg(short = 'b', long, default_value_t = 0.61)]
    beta: f64,

    /// Log level (respects RUST_LOG if set)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

fn parse_chunk_rack_config(raw: &str) -> anyhow::Result<Vec<u8>> {
    raw.split(',')
        .map(|part| part.trim().parse::<u8>().map_err(|e| anyhow::anyhow!("invalid chunk_rack_config entry '{part}': {e}")))
        .collect()
}

fn parse_network_setting(raw: &str) -> anyhow::Result<NetworkSetting> {
    let mut parts = raw.split(',');
    let cross_rack_bw: f64 = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("network_setting must be 'cross_rack_bw,intra_rack_bw'"))?
        .trim()
        .parse()?;
    let intra_rack_bw: f64 = parts
        .next()
        .ok_or_else(|| anyhow::anyhow!("network_setting must be 'cross_rack_bw,intra_rack_bw'"))?
        .trim()
        .parse()?;
    Ok(NetworkSetting { cross_rack_bw, intra_rack_bw })
}

fn build_code(args: &Args) -> anyhow::Result<Code> {
    let code = match args.code_type {
        CodeTypeArg::Rs => Code::Rs { n: args.code_n, k: args.code_k },
        CodeTypeArg::Lrc => {
            if args.code_l == 0 {
                return Err(anyhow::anyhow!("code_l must be > 0 when code_type=lrc"));
            }
            let schema = if (args.code_n, args.code_k, args.code_l) == (16, 12, 2) {
                LrcSchema::canonical_16_12_2()
            } else {
                LrcSchema::even_groups(args.code_n, args.code_k, args.code_l)?
            };
            Code::Lrc { n: args.code_n, k: args.code_k, l: args.code_l, schema }
        }
        CodeTypeArg::Drc => Code::Drc { n: args.code_n, k: args.code_k },
    };
    code.validate()?;
    Ok(code)
}

/// Every validation gate spec.md §6 requires, run once before any
/// simulation work starts (mirrors `simedc.py`'s `main()` pre-flight block).
fn validate(config: &SimConfig) -> reldl_types::Result<()> {
    use reldl_types::Error;

    if u32::from(config.code_free) >= u32::from(config.code.n()) {
        return Err(Error::Config {
            reason: format!("code_free ({}) must be < code_n ({})", config.code_free, config.code.n()),
        });
    }

    let required_mib = u64::from(config.code.n()) * config.num_stripes as u64 * config.chunk_size_mib;
    let available_mib = config.capacity_per_disk_mib * config.num_disks() as u64;
    if available_mib < required_mib {
        return Err(Error::CapacityShortfall {
            required_mib,
            available_mib,
            num_disks: config.num_disks(),
        });
    }

    if let Some(network) = &config.network_setting {
        if network.cross_rack_bw > network.intra_rack_bw {
            return Err(Error::BandwidthOrdering {
                cross_rack: network.cross_rack_bw,
                intra_rack: network.intra_rack_bw,
            });
        }
    }

    if let Some(chunk_rack_config) = &config.chunk_rack_config {
        let sum: u32 = chunk_rack_config.iter().map(|&c| u32::from(c)).sum();
        if sum != u32::from(config.code.n()) {
            return Err(Error::ChunkRackConfigMismatch {
                sum: sum as u8,
                n: config.code.n(),
            });
        }
    }

    if config.num_processes == 0 || config.total_iterations % config.num_processes != 0 {
        return Err(Error::IterationShardMismatch {
            total: config.total_iterations,
            processes: config.num_processes,
        });
    }

    Ok(())
}

fn build_config(args: &Args) -> anyhow::Result<SimConfig> {
    let code = build_code(args)?;
    let chunk_rack_config = match (&args.chunk_rack_config, code.forced_chunk_rack_config()) {
        (_, Some(forced)) => Some(forced),
        (Some(raw), None) => Some(parse_chunk_rack_config(raw)?),
        (None, None) => None,
    };
    let network_setting = args.network_setting.as_deref().map(parse_network_setting).transpose()?;
    let importance_sampling = match args.sim_type {
        SimTypeArg::Unifbfb => Some(ImportanceSamplingParams { fb_prob: args.fb_prob, beta: args.beta }),
        SimTypeArg::Regular => None,
    };

    Ok(SimConfig {
        total_iterations: args.total_iterations,
        num_processes: args.num_processes,
        rseed_plus: args.rseed_plus,
        mission_time: args.mission_time,
        num_racks: args.num_racks,
        nodes_per_rack: args.nodes_per_rack,
        disks_per_node: args.disks_per_node,
        capacity_per_disk_mib: args.capacity_per_disk,
        chunk_size_mib: args.chunk_size,
        num_stripes: args.num_stripes,
        code,
        code_free: args.code_free,
        place_type: match args.place_type {
            PlaceTypeArg::Flat => PlaceType::Flat,
            PlaceTypeArg::Hie => PlaceType::Hierarchical,
        },
        chunk_rack_config,
        rack_transient_fail_dist: WeibullParams::new(1.0, 87_600.0, 0.0),
        rack_transient_repair_dist: WeibullParams::new(1.0, 24.0, 10.0),
        node_fail_dist: WeibullParams::new(1.0, 91_250.0, 0.0),
        node_repair_dist: WeibullParams::new(1.0, 24.0, 0.5),
        node_transient_fail_dist: WeibullParams::new(1.0, 2890.8, 0.0),
        node_transient_repair_dist: WeibullParams::new(1.0, 0.25, 0.0),
        disk_fail_dist: WeibullParams::new(1.12, 87_600.0, 0.0),
        disk_repair_dist: Some(WeibullParams::new(1.0, 24.0, 0.0)),
        use_network: args.use_network,
        network_setting,
        use_power_outage: args.use_power_outage,
        power_outage: None,
        use_trace: args.use_trace,
        trace_id: args.trace_id,
        trace_dir: args.use_trace.then(|| std::path::PathBuf::from("./traces")),
        sim_type: match args.sim_type {
            SimTypeArg::Regular => SimType::Regular,
            SimTypeArg::Unifbfb => SimType::UnifBfb,
        },
        importance_sampling,
        step_cap: 500_000,
    })
}

fn print_configuration(config: &SimConfig) {
    println!("Configuration");
    println!("=============");
    println!("total_iterations:    {}", config.total_iterations);
    println!("num_processes:       {}", config.num_processes);
    println!("mission_time (h):    {}", config.mission_time);
    println!("rseed_plus:          {}", config.rseed_plus);
    println!(
        "topology:            {} racks x {} nodes/rack x {} disks/node ({} disks total)",
        config.num_racks,
        config.nodes_per_rack,
        config.disks_per_node,
        config.num_disks()
    );
    println!("code:                {:?}", config.code);
    let total_mib = config.capacity_per_disk_mib * config.num_disks() as u64;
    let used_mib = u64::from(config.code.n()) * config.num_stripes as u64 * config.chunk_size_mib;
    println!(
        "capacity:            {total_mib} MiB total, {used_mib} MiB used ({:.4} usage ratio)",
        used_mib as f64 / total_mib as f64
    );
    println!("place_type:          {:?}", config.place_type);
    if let Some(chunk_rack_config) = &config.chunk_rack_config {
        println!("chunk_rack_config:   {chunk_rack_config:?}");
    }
    println!();
}

fn print_results(result: &reldl_orchestrator::BatchResult) {
    println!("Results");
    println!("=======");
    println!("num_zeroes:                {}", result.pdl.num_zeroes);
    println!("PDL:                       {:e}", result.pdl.mean);
    println!("RE%:                       {:.4}", result.pdl.relative_error_pct);
    println!("NOMDL:                     {:e}", result.nomdl.mean);
    println!("BR:                        {:e}", result.blocked_ratio.mean);
    println!("single-chunk repair ratio: {:.6}", result.single_chunk_repair_ratio);
    if result.failed_iterations > 0 {
        println!(
            "failed_iterations:         {} / {}",
            result.failed_iterations, result.total_iterations
        );
    }
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("configuration error: {err}");
            std::process::exit(2);
        }
    };

    if let Err(err) = validate(&config) {
        eprintln!("configuration error: {err}");
        std::process::exit(2);
    }

    print_configuration(&config);

    tracing::info!(
        total_iterations = config.total_iterations,
        num_processes = config.num_processes,
        "starting batch"
    );
    match reldl_orchestrator::run_batch(&config) {
        Ok(result) => {
            tracing::info!(failed_iterations = result.failed_iterations, "batch complete");
            print_results(&result);
            std::process::exit(0);
        }
        Err(err) => {
            eprintln!("simulation error: {err}");
            std::process::exit(2);
        }
    }
}
