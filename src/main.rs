use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use nashealth::analysis::normalize::{latest_reading_time, parse_timestamp};
use nashealth::analysis::{self, CancelFlag, LiveQuery};
use nashealth::collectors::command::{CommandRunner, LocalRunner, SshRunner};
use nashealth::collectors::thresholds::SmartctlQuery;
use nashealth::collectors::{attrlog, device_map, remote};
use nashealth::config::{Config, WindowAnchor};
use nashealth::models::raw::DriveLog;
use nashealth::models::DeviceMap;
use nashealth::report;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "nashealth", about = "Drive health report from SMART attribute logs", version = "0.1")]
struct Cli {
    /// More log output on stderr (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (default: ~/.config/nashealth/nashealth.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Analyze attribute logs and print the health report
    Analyze(AnalyzeArgs),

    /// Map drive serials to device paths on a host and save the map
    Scan {
        /// ssh destination (user@host); omit to scan this machine
        host: Option<String>,

        /// Output file
        #[arg(short, long, default_value = "device_map.json")]
        output: PathBuf,
    },

    /// Print config file path and effective values, then exit
    Config,
}

#[derive(clap::Args, Debug)]
struct AnalyzeArgs {
    /// Local directory holding attrlog.*.csv (or the remote one with --host)
    dir: Option<String>,

    /// Read logs and query drives over ssh on this host
    #[arg(long)]
    host: Option<String>,

    /// Serial -> device path map (JSON) from `nashealth scan`
    #[arg(short = 'm', long)]
    device_map: Option<PathBuf>,

    /// Build the device map on the fly with `smartctl --scan`
    #[arg(long, conflicts_with = "device_map")]
    discover: bool,

    /// Skip live threshold queries; use configured limits
    #[arg(long)]
    no_live: bool,

    /// Print JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Include every parsed reading in the JSON output
    #[arg(long, requires = "json")]
    with_history: bool,

    /// One-shot health check: exit 0=OK, 1=WARNING, 2=CRITICAL (nagios/cron compatible)
    #[arg(long)]
    check: bool,

    /// Plain text report without colours
    #[arg(long)]
    no_color: bool,

    /// End of the observation window ("YYYY-MM-DD HH:MM:SS")
    #[arg(long, conflicts_with = "anchor")]
    now: Option<String>,

    /// Anchor the window at the wall clock or at the newest reading
    #[arg(long, value_enum)]
    anchor: Option<WindowAnchor>,

    /// Window length in hours
    #[arg(long)]
    window_hours: Option<i64>,

    /// Parallel per-drive workers
    #[arg(short, long)]
    jobs: Option<usize>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let cfg = Config::load(cli.config.as_deref())?;

    match cli.command {
        Cmd::Analyze(args)          => run_analyze(cfg, args),
        Cmd::Scan { host, output }  => run_scan(&cfg, host, &output),
        Cmd::Config                 => run_print_config(&cfg),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "nashealth=warn",
        1 => "nashealth=info",
        _ => "nashealth=debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn install_cancel_handler() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\ninterrupted; finishing drives in progress");
        flag.cancel();
    }) {
        tracing::warn!(error = %e, "cannot install Ctrl+C handler");
    }
    cancel
}

fn run_analyze(mut cfg: Config, args: AnalyzeArgs) -> Result<()> {
    if let Some(h) = args.window_hours {
        if h <= 0 {
            bail!("--window-hours must be positive");
        }
        cfg.analysis.window_hours = h;
    }
    if let Some(j) = args.jobs {
        cfg.analysis.jobs = j;
    }
    if let Some(a) = args.anchor {
        cfg.analysis.anchor = a;
    }

    let cancel = install_cancel_handler();
    let fetch_timeout = Duration::from_secs(cfg.remote.command_timeout_sec.max(1));
    let runner: Box<dyn CommandRunner> = match &args.host {
        Some(host) => Box::new(SshRunner::new(host.clone(), cfg.remote.ssh_options.clone(), cancel.clone())),
        None       => Box::new(LocalRunner { cancel: cancel.clone() }),
    };

    // ── Logs ──
    let logs: Vec<DriveLog> = match (&args.host, &args.dir) {
        (Some(_), dir) => {
            let dir = dir.as_deref().unwrap_or(&cfg.remote.smart_dir);
            remote::read_remote(&*runner, dir, fetch_timeout)?
        }
        (None, Some(dir)) => attrlog::read_dir(Path::new(dir))?,
        (None, None)      => attrlog::read_dir(Path::new(&cfg.remote.smart_dir))?,
    };
    if logs.is_empty() {
        tracing::warn!("no attribute logs found");
    }

    // ── Device map ──
    let mapping: Option<DeviceMap> = if let Some(path) = &args.device_map {
        Some(device_map::load(path)?)
    } else if args.discover {
        Some(device_map::discover(&*runner, fetch_timeout))
    } else {
        None
    };

    // ── Window end ──
    let now = match &args.now {
        Some(s) => parse_timestamp(s).with_context(|| format!("invalid --now timestamp {:?}", s))?,
        None => match cfg.analysis.anchor {
            WindowAnchor::Clock  => chrono::Local::now().naive_local(),
            WindowAnchor::Latest => latest_reading_time(&logs)
                .unwrap_or_else(|| chrono::Local::now().naive_local()),
        },
    };

    // Live limits need somewhere to send the query
    let query = SmartctlQuery::new(runner);
    let live: Option<&dyn LiveQuery> = if args.no_live || mapping.is_none() {
        None
    } else {
        Some(&query as &dyn LiveQuery)
    };

    let opts = cfg.analysis_options();
    let system = analysis::analyze_with(logs, now, mapping.as_ref(), live, &opts, &cancel);

    if args.json {
        println!("{}", report::to_json(&system, args.with_history)?);
    } else {
        let color = !args.no_color && std::io::stdout().is_terminal();
        print!("{}", report::generate(&system, color));
    }

    if args.check {
        std::process::exit(system.overall_status.exit_code());
    }
    Ok(())
}

fn run_scan(cfg: &Config, host: Option<String>, output: &Path) -> Result<()> {
    let cancel = install_cancel_handler();
    let timeout = Duration::from_secs(cfg.remote.command_timeout_sec.max(1));
    let map = match host {
        Some(h) => device_map::discover(&SshRunner::new(h, cfg.remote.ssh_options.clone(), cancel), timeout),
        None    => device_map::discover(&LocalRunner { cancel }, timeout),
    };
    device_map::save(output, &map)?;
    println!("{} drive(s) mapped -> {}", map.len(), output.display());
    for (serial, dev) in &map {
        println!("  {:<24} {}", serial, dev);
    }
    Ok(())
}

fn run_print_config(cfg: &Config) -> Result<()> {
    let path = Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    let a = &cfg.analysis;
    println!("Config: {}", path);
    println!();
    println!("[analysis]");
    println!("  window_hours      = {}", a.window_hours);
    println!("  query_timeout_sec = {}", a.query_timeout_sec);
    println!("  jobs              = {}", a.jobs);
    println!("  anchor            = {:?}", a.anchor);
    println!();
    println!("[thresholds]");
    println!("  ata   warning {}°C  critical {}°C", cfg.thresholds.ata.warning, cfg.thresholds.ata.critical);
    println!("  nvme  warning {}°C  critical {}°C", cfg.thresholds.nvme.warning, cfg.thresholds.nvme.critical);
    println!();
    println!("[attributes]");
    println!("  ata_error_ids    = {:?}", cfg.attributes.ata_error_ids);
    println!("  nvme_error_names = {:?}", cfg.attributes.nvme_error_names);
    println!();
    println!("[remote]");
    println!("  smart_dir           = {}", cfg.remote.smart_dir);
    println!("  ssh_options         = {:?}", cfg.remote.ssh_options);
    println!("  command_timeout_sec = {}", cfg.remote.command_timeout_sec);
    Ok(())
}
