use clap::{Arg, ArgAction, Command};
use std::io::{self, BufWriter, Write};

const FLUSH_EVERY: u64 = 10_000;

/// Writes a synthetic delimited file to stdout: header, `rows` data rows and,
/// unless `--no-trailer`, a trailer `TRL<d><YYYYMMDD><d><rows>` whose third
/// field is the data-row count.
fn main() -> anyhow::Result<()> {
    let matches = Command::new("gen")
        .about("Generate a validator fixture on stdout")
        .arg(
            Arg::new("rows")
                .long("rows")
                .value_parser(clap::value_parser!(u64))
                .required(true),
        )
        .arg(
            Arg::new("cols")
                .long("cols")
                .help("Column count (at least 3)")
                .value_parser(clap::value_parser!(usize))
                .default_value("4"),
        )
        .arg(
            Arg::new("delim")
                .long("delim")
                .value_parser([",", "|"])
                .default_value(","),
        )
        .arg(
            Arg::new("date")
                .long("date")
                .help("Business date written into the trailer")
                .default_value("20240611"),
        )
        .arg(
            Arg::new("no_trailer")
                .long("no-trailer")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let rows = matches.get_one::<u64>("rows").copied().unwrap_or_default();
    let cols = matches.get_one::<usize>("cols").copied().unwrap_or(4).max(3);
    let delim = matches.get_one::<String>("delim").map_or(",", String::as_str);
    let date = matches.get_one::<String>("date").map_or("20240611", String::as_str);

    let mut out = BufWriter::new(io::stdout().lock());

    let header: Vec<String> = std::iter::once("id".to_owned())
        .chain((1..cols).map(|c| format!("field_{c}")))
        .collect();
    writeln!(out, "{}", header.join(delim))?;

    for row in 0..rows {
        write!(out, "{row}")?;
        for c in 1..cols {
            write!(out, "{delim}r{row}c{c}")?;
        }
        writeln!(out)?;
        if row % FLUSH_EVERY == 0 {
            out.flush()?;
        }
    }

    if !matches.get_flag("no_trailer") {
        writeln!(out, "TRL{delim}{date}{delim}{rows}")?;
    }

    out.flush()?;
    Ok(())
}
