use anyhow::{bail, Context};
use clap::{Arg, ArgAction, Command};
use csv_validate::{
    ledger, logging, run_batch, Compression, EngineChoice, ExpectedSchema, ReferenceHeader,
    ScannedSet, ValidationMode, Validator, ValidatorConfig, Verdict,
};
use std::path::PathBuf;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    logging::init_logging();

    match run().await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("csv-validate error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn command() -> Command {
    Command::new("csv-validate")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Validate comma- or pipe-delimited files (plain, .gz, .zst) against an expected header and trailer record count")
        .arg(Arg::new("path").help("File or directory to validate").required(true).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("config").long("config").help("TOML configuration file").value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("mode").long("mode").help(format!("Validation mode: {}", ValidationMode::NAMES)).value_parser(|s: &str| s.parse::<ValidationMode>()))
        .arg(Arg::new("engine").long("engine").help(format!("Header scan engine: {}", EngineChoice::NAMES)).value_parser(|s: &str| s.parse::<EngineChoice>()))
        .arg(Arg::new("compression").long("compression").help("Force compression (none, gzip, zstd) instead of inferring from the suffix").value_parser(|s: &str| s.parse::<Compression>()))
        .arg(Arg::new("expected-columns").long("expected-columns").help("File with one expected column name per line").value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("reserved-memory").long("reserved-memory").help("Bytes of memory to leave free when sizing chunks").value_parser(clap::value_parser!(u64)))
        .arg(Arg::new("trailer-index").long("trailer-index").help("0-based trailer field holding the record count").value_parser(clap::value_parser!(usize)))
        .arg(Arg::new("scanned-list").long("scanned-list").help("List of already scanned files").default_value(ledger::SCANNED_FILES).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("records").long("records").help("Validation record log (CSV)").default_value(ledger::RECORDS_FILE).value_parser(clap::value_parser!(PathBuf)))
        .arg(Arg::new("no-persist").long("no-persist").help("Do not read or write the scanned list and record log").action(ArgAction::SetTrue))
}

async fn run() -> anyhow::Result<ExitCode> {
    let matches = command().get_matches();

    let mut config = match matches.get_one::<PathBuf>("config") {
        Some(path) => ValidatorConfig::load(path).await?,
        None => ValidatorConfig::default(),
    };
    if let Some(mode) = matches.get_one::<ValidationMode>("mode") {
        config.mode = *mode;
    }
    if let Some(engine) = matches.get_one::<EngineChoice>("engine") {
        config.engine = *engine;
    }
    if let Some(compression) = matches.get_one::<Compression>("compression") {
        config.compression = Some(*compression);
    }
    if let Some(path) = matches.get_one::<PathBuf>("expected-columns") {
        config.expected_columns = path.clone();
    }
    if let Some(bytes) = matches.get_one::<u64>("reserved-memory") {
        config.reserved_memory_bytes = *bytes;
    }
    if let Some(index) = matches.get_one::<usize>("trailer-index") {
        config.trailer_count_index = *index;
    }

    let root = matches
        .get_one::<PathBuf>("path")
        .context("missing <path>")?;
    if !root.exists() {
        bail!("{} is neither a file nor a directory", root.display());
    }

    let mut validator = Validator::new(config.clone())?;
    if config.mode.reference() == ReferenceHeader::ExpectedSchema {
        let schema = ExpectedSchema::load(&config.expected_columns).await?;
        if schema.is_empty() {
            bail!("{} lists no columns", config.expected_columns.display());
        }
        validator = validator.with_expected_schema(schema);
    }

    tracing::info!(
        method = %validator.config().method(),
        expected_columns = validator.expected_schema().map_or(0, ExpectedSchema::len),
        "validator ready"
    );

    let persist = !matches.get_flag("no-persist");
    let scanned_list = matches
        .get_one::<PathBuf>("scanned-list")
        .context("missing --scanned-list")?;
    let records = matches
        .get_one::<PathBuf>("records")
        .context("missing --records")?;

    let scanned = if persist {
        ledger::load_scanned(scanned_list)
            .await
            .with_context(|| format!("reading {}", scanned_list.display()))?
    } else {
        ScannedSet::new()
    };

    let report = run_batch(&validator, root, scanned).await;

    for path in &report.already_scanned {
        println!("SKIP  {} (already scanned)", path.display());
    }
    for verdict in &report.verdicts {
        println!("{}", render(verdict));
    }
    for err in &report.walk_errors {
        println!("ERROR {err}");
    }

    if persist {
        ledger::append_records(records, report.verdicts.iter().filter(|v| v.is_pass()))
            .await
            .with_context(|| format!("appending to {}", records.display()))?;
        ledger::save_scanned(scanned_list, &report.scanned)
            .await
            .with_context(|| format!("writing {}", scanned_list.display()))?;
    }

    // skipped files are reported but do not fail the run
    let failed = report.failed() + report.walk_errors.len();
    println!(
        "summary: {} passed, {} failed, {} skipped, {} already scanned",
        report.passed(),
        failed,
        report.skipped(),
        report.already_scanned.len()
    );
    Ok(if failed == 0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn render(verdict: &Verdict) -> String {
    let secs = verdict.elapsed.as_secs_f64();
    match &verdict.failure {
        None => format!(
            "PASS  {} ({secs:.2}s, {})",
            verdict.path.display(),
            verdict.method
        ),
        Some(failure) if verdict.is_skip() => {
            format!("SKIP  {} ({})", verdict.path.display(), failure.error)
        }
        Some(failure) => format!(
            "FAIL  {} ({secs:.2}s, {}) {failure}",
            verdict.path.display(),
            verdict.method
        ),
    }
}
