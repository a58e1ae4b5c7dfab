use anyhow::{Context, Result, anyhow};
use clap::Parser;
use crossbeam_channel::bounded;
use rayon::prelude::*;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{CompiledConfig, RoutesConfig};
use crate::selector::{Expr, Properties, SelectorError, Value, evaluate};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input JSONL file ("-" for stdin)
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output JSONL file ("-" for stdout)
    #[arg(short, long)]
    pub output: PathBuf,

    /// Selector applied to every record
    #[arg(short, long, conflicts_with = "routes")]
    pub select: Option<String>,

    /// Route configuration file (YAML); matched records gain a "_routes"
    /// field listing the routes they satisfied
    #[arg(short, long)]
    pub routes: Option<PathBuf>,

    /// Number of threads (default: all cores)
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Drop records that are not flat JSON objects instead of failing
    #[arg(long)]
    pub skip_invalid: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// How records are matched: one ad-hoc selector, or a compiled route table.
pub enum Mode {
    Select(Expr),
    Routes(Arc<CompiledConfig>),
}

pub fn build_mode(cli: &Cli) -> Result<Mode> {
    match (&cli.select, &cli.routes) {
        (Some(filter), None) => {
            let expr = crate::selector::parse(filter).context("CLI: invalid --select filter")?;
            Ok(Mode::Select(expr))
        }
        (None, Some(path)) => {
            let config = RoutesConfig::load(path)
                .with_context(|| format!("CLI: failed to load routes from {path:?}"))?;
            let compiled = config.compile()?;
            tracing::info!("Routes: {} selectors compiled", compiled.routes.len());
            Ok(Mode::Routes(Arc::new(compiled)))
        }
        _ => anyhow::bail!("CLI: exactly one of --select or --routes is required"),
    }
}

/// Convert one parsed record into a property context. Only flat objects of
/// null/bool/number/string values are valid property sets; anything else is
/// a configuration error, never a filter verdict.
pub fn record_properties(
    record: &serde_json::Map<String, serde_json::Value>,
) -> Result<Properties, SelectorError> {
    let mut props = Properties::with_capacity(record.len());
    for (name, value) in record {
        if name.is_empty() {
            return Err(SelectorError::Config(
                "property names must be non-empty".to_string(),
            ));
        }
        let value = match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Int(i)
                } else if let Some(x) = n.as_f64() {
                    Value::Real(x)
                } else {
                    return Err(SelectorError::Config(format!(
                        "property '{name}' does not fit a 64-bit integer or double"
                    )));
                }
            }
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => {
                return Err(SelectorError::Config(format!(
                    "property '{name}' must be a boolean, number, string, or null"
                )));
            }
        };
        props.insert(name.clone(), value);
    }
    Ok(props)
}

/// Evaluate one input line; returns the output line if the record matched.
fn process_line(line: &str, mode: &Mode, skip_invalid: bool) -> Result<Option<String>> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let parsed: serde_json::Value = match serde_json::from_str(trimmed) {
        Ok(value) => value,
        Err(err) => return invalid(skip_invalid, format!("Records: not valid JSON: {err}")),
    };
    let Some(object) = parsed.as_object() else {
        return invalid(skip_invalid, "Records: record is not a JSON object".to_string());
    };
    let props = match record_properties(object) {
        Ok(props) => props,
        Err(err) => return invalid(skip_invalid, format!("Records: {err}")),
    };

    match mode {
        Mode::Select(filter) => {
            if evaluate(filter, &props)? {
                Ok(Some(trimmed.to_string()))
            } else {
                Ok(None)
            }
        }
        Mode::Routes(config) => {
            let mut matched = Vec::new();
            for route in &config.routes {
                if evaluate(&route.filter, &props)? {
                    matched.push(route.name.clone());
                }
            }
            if matched.is_empty() {
                return Ok(None);
            }
            let mut annotated = object.clone();
            annotated.insert(
                "_routes".to_string(),
                serde_json::Value::Array(
                    matched.into_iter().map(serde_json::Value::String).collect(),
                ),
            );
            Ok(Some(serde_json::Value::Object(annotated).to_string()))
        }
    }
}

fn invalid(skip: bool, message: String) -> Result<Option<String>> {
    if skip {
        tracing::warn!("{message} (record dropped)");
        Ok(None)
    } else {
        Err(anyhow!(message))
    }
}

const BATCH_SIZE: usize = 1024;

fn read_batches<R: BufRead + Send>(reader: R) -> impl Iterator<Item = io::Result<Vec<String>>> {
    let mut lines = reader.lines();
    std::iter::from_fn(move || {
        let mut batch = Vec::with_capacity(BATCH_SIZE);
        for line in lines.by_ref() {
            match line {
                Ok(line) => {
                    batch.push(line);
                    if batch.len() == BATCH_SIZE {
                        break;
                    }
                }
                Err(err) => return Some(Err(err)),
            }
        }
        if batch.is_empty() { None } else { Some(Ok(batch)) }
    })
}

fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>> {
    if path == Path::new("-") {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        let file =
            File::open(path).with_context(|| format!("CLI: failed to open input {path:?}"))?;
        Ok(Box::new(BufReader::new(file)))
    }
}

fn open_output(path: &Path) -> Result<Box<dyn Write + Send>> {
    if path == Path::new("-") {
        Ok(Box::new(BufWriter::new(io::stdout())))
    } else {
        let file =
            File::create(path).with_context(|| format!("CLI: failed to create output {path:?}"))?;
        Ok(Box::new(BufWriter::new(file)))
    }
}

/// Stream records through the selectors: parallel workers evaluate batches
/// and a single writer thread emits matches in arrival order. Returns
/// (records read, records matched).
pub fn process_records(cli: &Cli, mode: Arc<Mode>) -> Result<(u64, u64)> {
    let reader = open_input(&cli.input)?;
    let mut writer = open_output(&cli.output)?;

    let (tx, rx) = bounded::<Vec<String>>(64);
    let read_count = Arc::new(AtomicU64::new(0));

    let writer_thread = std::thread::spawn(move || -> Result<u64> {
        let mut match_count = 0u64;
        for batch in rx {
            for line in batch {
                writer
                    .write_all(line.as_bytes())
                    .context("Pipeline: failed writing record")?;
                writer
                    .write_all(b"\n")
                    .context("Pipeline: failed writing record")?;
                match_count += 1;
            }
        }
        writer.flush().context("Pipeline: failed flushing output")?;
        Ok(match_count)
    });

    let skip_invalid = cli.skip_invalid;
    let decode_result = {
        let tx = tx.clone();
        let read_count = Arc::clone(&read_count);
        let mode = Arc::clone(&mode);
        read_batches(reader)
            .par_bridge()
            .try_for_each(move |batch| -> Result<()> {
                let batch = batch.context("Pipeline: failed reading input")?;
                read_count.fetch_add(batch.len() as u64, Ordering::Relaxed);

                let mut out = Vec::new();
                for line in &batch {
                    if let Some(line) = process_line(line, &mode, skip_invalid)? {
                        out.push(line);
                    }
                }
                if !out.is_empty() {
                    tx.send(out)
                        .map_err(|err| anyhow!("Pipeline: failed to send record batch: {err}"))?;
                }
                Ok(())
            })
    };

    drop(tx);

    // Check the writer thread first - it has the real error if the channel
    // disconnected mid-stream
    let writer_join = writer_thread.join();
    let match_count = match writer_join {
        Ok(Ok(count)) => count,
        Ok(Err(writer_err)) => {
            return if decode_result.is_err() {
                Err(writer_err
                    .context("Pipeline: writer thread failed (caused channel disconnect)"))
            } else {
                Err(writer_err)
            };
        }
        Err(panic_payload) => {
            let panic_msg = panic_payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic_payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            return Err(anyhow!("Pipeline: writer thread panicked: {panic_msg}"));
        }
    };
    decode_result?;

    Ok((read_count.load(Ordering::Relaxed), match_count))
}
