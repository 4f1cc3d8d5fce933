use crate::backend::HttpBackend;
use crate::model::{AggregationChoice, Field, WizardConfig};
use crate::orchestrator::{run_process, run_upload};
use crate::wizard::ViewState;
use anyhow::{bail, Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tokio::sync::mpsc;
use tracing::info;

/// Output line routing for stdout/stderr writer.
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer for stdout/stderr to avoid blocking async tasks.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "sheet-wizard",
    version,
    about = "Upload a spreadsheet, pick grouping and sums, download the result"
)]
pub struct Cli {
    /// Base URL of the shaping service
    #[arg(long, default_value = "http://localhost:8000")]
    pub base_url: String,

    /// Path of the upload endpoint
    #[arg(long, default_value = "/upload")]
    pub upload_path: String,

    /// Path of the process endpoint
    #[arg(long, default_value = "/process")]
    pub process_path: String,

    /// Directory to save grouped_data.xlsx into (default: your downloads directory)
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// File to upload (repeatable). The TUI uploads these on launch.
    #[arg(short = 'f', long = "file")]
    pub files: Vec<PathBuf>,

    /// Run without the TUI and print a text summary
    #[arg(long)]
    pub text: bool,

    /// Run without the TUI and print a JSON summary
    #[arg(long)]
    pub json: bool,

    /// Suppress all output except errors (for scripts)
    #[arg(long)]
    pub silent: bool,

    /// Upload, print the discovered columns and exit
    #[arg(long)]
    pub list_columns: bool,

    /// Column to include (repeatable)
    #[arg(long = "select")]
    pub select: Vec<String>,

    /// Include every discovered column
    #[arg(long)]
    pub all_columns: bool,

    /// Column to group by (repeatable)
    #[arg(long = "group-by")]
    pub group_by: Vec<String>,

    /// Column to sum within each group (repeatable)
    #[arg(long = "sum")]
    pub sum: Vec<String>,

    /// Aggregation as `<column>:<function>`; only `sum` is supported (repeatable)
    #[arg(long = "aggregate", value_name = "COL:FUNC")]
    pub aggregate: Vec<AggregationChoice>,

    /// Column to sort the output by (default: first selected column)
    #[arg(long)]
    pub order_by: Option<String>,

    /// Leading output columns, in order; comma separated or repeated
    #[arg(long = "column-order", value_delimiter = ',')]
    pub column_order: Vec<String>,

    /// Append logs to this file (RUST_LOG controls the level)
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Cli {
    pub fn is_headless(&self) -> bool {
        self.text || self.json || self.silent || !cfg!(feature = "tui")
    }
}

pub async fn run(args: Cli) -> Result<()> {
    if args.silent && !args.json && !args.text {
        return Err(anyhow::anyhow!(
            "--silent can only be used with --text or --json."
        ));
    }

    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args).await;
        }
    }

    run_headless(args).await
}

/// Build a `WizardConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> WizardConfig {
    WizardConfig {
        base_url: args.base_url.clone(),
        upload_path: args.upload_path.clone(),
        process_path: args.process_path.clone(),
        download_dir: args
            .output_dir
            .clone()
            .unwrap_or_else(crate::download::default_download_dir),
        user_agent: format!("sheet-wizard/{}", env!("CARGO_PKG_VERSION")),
    }
}

fn require_column(view: &ViewState, field: Field, name: &str) -> Result<usize> {
    if let Some(i) = view.position(field, name) {
        return Ok(i);
    }
    if view.position(Field::Columns, name).is_some() {
        bail!("column {name:?} was not selected, so it cannot be used for {field}");
    }
    let known: Vec<&str> = view.columns.iter().map(|t| t.item.as_str()).collect();
    bail!(
        "unknown column {name:?}; available: {}",
        known.join(", ")
    )
}

/// Drive the confirm step and the option panels from command-line choices.
pub(crate) fn apply_selections(view: &mut ViewState, args: &Cli) -> Result<()> {
    if args.all_columns {
        for i in 0..view.len(Field::Columns) {
            view.set_checked(Field::Columns, i, true)?;
        }
    } else {
        for name in &args.select {
            let i = require_column(view, Field::Columns, name)?;
            view.set_checked(Field::Columns, i, true)?;
        }
    }
    view.confirm_columns()?;

    for name in &args.group_by {
        let i = require_column(view, Field::GroupBy, name)?;
        view.set_checked(Field::GroupBy, i, true)?;
    }
    let sums = args.sum.iter().map(AggregationChoice::sum);
    for choice in sums.chain(args.aggregate.iter().cloned()) {
        let i = require_column(view, Field::Aggregations, &choice.column)?;
        if view.aggregations[i].item != choice {
            bail!("no {} aggregation offered", choice.label());
        }
        view.set_checked(Field::Aggregations, i, true)?;
    }
    if let Some(name) = args.order_by.as_deref() {
        let i = require_column(view, Field::OrderBy, name)?;
        view.select_order_by(i)?;
    }
    for (target, name) in args.column_order.iter().enumerate() {
        let from = require_column(view, Field::ColumnOrder, name)?;
        if target < view.len(Field::ColumnOrder) {
            view.move_column(from, target)?;
        }
    }
    Ok(())
}

async fn run_headless(args: Cli) -> Result<()> {
    if args.files.is_empty() {
        bail!("at least one --file is required without the TUI");
    }
    let cfg = build_config(&args);
    let backend = HttpBackend::new(&cfg)?;
    let (out_tx, out_handle) = if args.silent {
        (None, None)
    } else {
        let (tx, handle) = spawn_output_writer();
        (Some(tx), Some(handle))
    };
    let say = |line: OutputLine| {
        if let Some(tx) = out_tx.as_ref() {
            let _ = tx.send(line);
        }
    };

    let mut view = ViewState::default();
    view.begin_upload()?;
    if args.text {
        say(OutputLine::Stderr(format!(
            "Uploading {} file(s) to {}",
            args.files.len(),
            cfg.upload_url()
        )));
    }
    let uploaded = run_upload(&backend, &args.files).await;
    view.complete_upload(uploaded)?;
    if let Some(alert) = view.alert.take() {
        bail!(alert);
    }

    if args.list_columns {
        if args.json {
            let cols = crate::summary::columns(&view);
            say(OutputLine::Stdout(serde_json::to_string_pretty(&cols)?));
        } else {
            for c in crate::summary::columns(&view) {
                say(OutputLine::Stdout(c));
            }
        }
    } else {
        apply_selections(&mut view, &args).context("invalid column choice")?;
        let request = view.begin_process()?;
        if args.text {
            say(OutputLine::Stderr(format!(
                "Processing via {}",
                cfg.process_url()
            )));
        }
        let processed = run_process(&backend, &cfg.download_dir, &request).await;
        view.complete_process(processed)?;
        if let Some(alert) = view.alert.take() {
            bail!(alert);
        }
        info!("headless run complete");

        if args.json {
            let doc = crate::summary::build_json_summary(&view, &request);
            say(OutputLine::Stdout(serde_json::to_string_pretty(&doc)?));
        } else {
            for line in crate::summary::build_text_summary(&view, &request) {
                say(OutputLine::Stdout(line));
            }
        }
    }

    drop(out_tx);
    if let Some(handle) = out_handle {
        let _ = handle.await;
    }
    Ok(())
}
