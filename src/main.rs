use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use memory_inspect::config::{load_config, validate_config, Config, ConfigLoader, LoggingConfig};
use memory_inspect::core::types::{Address, ProcessId, ScanComparison, ValueType};
use memory_inspect::dissect::{Dissection, Explorer, Field};
use memory_inspect::evaluator::{evaluate, module_identifiers};
use memory_inspect::memory::{
    find_code_caves, find_code_caves_in_modules, pattern_scan, MemoryScanner, ProtectionFlags,
    ScanOptions, DEFAULT_MIN_CAVE_SIZE, DEFAULT_PATTERN_END, DEFAULT_PATTERN_START,
};
use memory_inspect::process::ProcessMemory;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "memory-inspect", version, about = "Scan, search and dissect the memory of a live process")]
struct Cli {
    /// Configuration file (defaults to ./memory-inspect.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate an address expression such as `game.exe+0x1F0`
    Eval {
        expression: String,
        /// Resolve module names against this process
        #[arg(long)]
        pid: Option<ProcessId>,
    },
    /// Run a first scan, optionally followed by next scans
    Scan {
        #[arg(long)]
        pid: ProcessId,
        #[arg(long = "type", default_value = "i32")]
        value_type: ValueType,
        #[arg(long, default_value = "exact")]
        compare: ScanComparison,
        /// Target value, or the lower bound for `between`
        #[arg(long)]
        value: Option<String>,
        #[arg(long)]
        upper: Option<String>,
        /// Follow-up scan such as `changed`, `exact=100` or `between=1,5`
        #[arg(long = "next")]
        next: Vec<NextStep>,
        /// Delay before each follow-up scan
        #[arg(long, default_value_t = 1000)]
        interval_ms: u64,
        /// Maximum number of results printed
        #[arg(long, default_value_t = 100)]
        limit: usize,
    },
    /// Explore the memory at an address as a struct
    Dissect {
        #[arg(long)]
        pid: ProcessId,
        /// Address expression of the struct
        address: String,
        /// Levels of pointers to follow
        #[arg(long, default_value_t = 1)]
        depth: usize,
        #[arg(long)]
        window: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Find the first match of a byte pattern such as `48 8B ?? ?? 89`
    Pattern {
        #[arg(long)]
        pid: ProcessId,
        pattern: String,
        #[arg(long, default_value_t = DEFAULT_PATTERN_START)]
        start: Address,
        #[arg(long, default_value_t = DEFAULT_PATTERN_END)]
        end: Address,
    },
    /// List runs of filler bytes in executable memory
    Caves {
        #[arg(long)]
        pid: ProcessId,
        /// Restrict the search to these modules
        #[arg(long = "module")]
        modules: Vec<String>,
        #[arg(long, default_value_t = DEFAULT_MIN_CAVE_SIZE)]
        min_size: usize,
        /// Stop at the first cave
        #[arg(long)]
        first: bool,
    },
}

/// A follow-up scan given on the command line
#[derive(Debug, Clone)]
struct NextStep {
    comparison: ScanComparison,
    lower: Option<String>,
    upper: Option<String>,
}

impl FromStr for NextStep {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, values) = match s.split_once('=') {
            Some((name, values)) => (name, Some(values)),
            None => (s, None),
        };
        let comparison = name.parse::<ScanComparison>().map_err(|e| e.to_string())?;
        let (lower, upper) = match values.map(|v| v.split_once(',')) {
            Some(Some((lower, upper))) => (Some(lower.to_string()), Some(upper.to_string())),
            Some(None) => (values.map(str::to_string), None),
            None => (None, None),
        };
        Ok(NextStep { comparison, lower, upper })
    }
}

fn init_logging(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path))?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn read_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => ConfigLoader::new(path).load()?,
        None => load_config()?,
    };
    validate_config(&config)?;
    Ok(config)
}

#[cfg(windows)]
fn open_process(
    pid: ProcessId,
    config: &Config,
) -> Result<Arc<memory_inspect::process::WindowsProcess>> {
    let process =
        memory_inspect::process::WindowsProcess::open_read_write(pid, config.process.module_cache_ttl())?;
    Ok(Arc::new(process))
}

#[cfg(not(windows))]
fn open_process(
    _pid: ProcessId,
    _config: &Config,
) -> Result<Arc<memory_inspect::process::SnapshotProcess>> {
    anyhow::bail!("attaching to a live process is only supported on Windows")
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = read_config(cli.config.as_ref())?;
    init_logging(&config.logging)?;

    info!("Memory-Inspect v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Eval { expression, pid } => {
            let identifiers = match pid {
                Some(pid) => module_identifiers(&open_process(pid, &config)?.enumerate_modules()?),
                None => Default::default(),
            };
            let value = evaluate(&expression, &identifiers)?;
            println!("{:#x}", value);
        }
        Command::Scan {
            pid,
            value_type,
            compare,
            value,
            upper,
            next,
            interval_ms,
            limit,
        } => {
            let process = open_process(pid, &config)?;
            let options = ScanOptions {
                value_type,
                comparison: compare,
                start_address: Address::new(config.scanner.start_address),
                end_address: Address::new(config.scanner.end_address),
                lower: value,
                upper,
            };
            run_scan(process, &config, options, &next, Duration::from_millis(interval_ms), limit).await?;
        }
        Command::Dissect {
            pid,
            address,
            depth,
            window,
            json,
        } => {
            let process = open_process(pid, &config)?;
            let mut explorer = Explorer::from(&config.dissect);
            if let Some(window) = window {
                explorer.window_size = window;
            }
            run_dissect(&*process, &address, explorer, depth, json)?;
        }
        Command::Pattern {
            pid,
            pattern,
            start,
            end,
        } => {
            let process = open_process(pid, &config)?;
            match pattern_scan(&*process, &pattern, start, end)? {
                Some(address) => println!("{}", address),
                None => println!("no match"),
            }
        }
        Command::Caves {
            pid,
            modules,
            min_size,
            first,
        } => {
            let process = open_process(pid, &config)?;
            let caves = if modules.is_empty() {
                find_code_caves(&*process, min_size, first, ProtectionFlags::EXECUTABLE_MASK)
            } else {
                let names: Vec<&str> = modules.iter().map(String::as_str).collect();
                find_code_caves_in_modules(&*process, &names, min_size, ProtectionFlags::EXECUTABLE_MASK)
            };
            println!("{}", serde_json::to_string_pretty(&caves)?);
        }
    }

    Ok(())
}

async fn run_scan<P: ProcessMemory + 'static>(
    process: Arc<P>,
    config: &Config,
    first: ScanOptions,
    next: &[NextStep],
    interval: Duration,
    limit: usize,
) -> Result<()> {
    let scanner = MemoryScanner::with_config(process, &config.scanner)?;
    let value_type = first.value_type;
    let (start, end) = (first.start_address, first.end_address);

    let count = scanner.first_scan(first)?.wait().await?;
    info!(count, "first scan finished");

    for step in next {
        tokio::time::sleep(interval).await;
        let options = ScanOptions {
            lower: step.lower.clone(),
            upper: step.upper.clone(),
            ..ScanOptions::new(value_type, step.comparison).range(start, end)
        };
        let count = scanner.next_scan(options)?.wait().await?;
        info!(count, comparison = %step.comparison, "next scan finished");
    }

    let shown = scanner.with_results(|results| {
        serde_json::to_string_pretty(&results[..results.len().min(limit)])
    })?;
    println!("{}", shown);
    Ok(())
}

fn run_dissect<P: ProcessMemory + ?Sized>(
    process: &P,
    expression: &str,
    explorer: Explorer,
    depth: usize,
    json: bool,
) -> Result<()> {
    let identifiers = module_identifiers(&process.enumerate_modules()?);
    let address = Address::new(evaluate(expression, &identifiers)?);

    let mut dissection = Dissection::new(process, expression, address, &explorer);
    expand_pointers(&mut dissection, process, &explorer, &mut Vec::new(), depth);

    if json {
        println!("{}", serde_json::to_string_pretty(&dissection)?);
    } else {
        println!("{} @ {}", dissection.name(), dissection.address());
        print_fields(process, dissection.root(), address, 1);
    }
    Ok(())
}

fn expand_pointers<P: ProcessMemory + ?Sized>(
    dissection: &mut Dissection,
    process: &P,
    explorer: &Explorer,
    path: &mut Vec<usize>,
    depth: usize,
) {
    if depth == 0 {
        return;
    }
    let count = dissection.field_at(path).map_or(0, |f| f.children().len());
    for index in 0..count {
        path.push(index);
        let expandable = dissection
            .field_at(path)
            .is_some_and(|f| f.field_type.is_expandable());
        if expandable && dissection.expand(process, path, explorer).is_some() {
            expand_pointers(dissection, process, explorer, path, depth - 1);
        }
        path.pop();
    }
}

fn print_fields<P: ProcessMemory + ?Sized>(process: &P, field: &Field, base: Address, indent: usize) {
    for child in field.children() {
        let name = child
            .name
            .as_deref()
            .map(|n| format!("  ({})", n))
            .unwrap_or_default();
        println!(
            "{:indent$}+{:04X} {:<14} {:>4}  {}{}",
            "",
            child.offset,
            child.field_type.to_string(),
            child.size,
            child.format_value(process, base),
            name,
            indent = indent * 2,
        );
        if child.expanded {
            if let Some((target, _)) = child.pointed_region(process, base) {
                print_fields(process, child, target, indent + 1);
            }
        }
    }
}
