//! # review-dash
//!
//! Command-line front end for the review dashboard data layer: sentiment
//! summaries, correlation heatmaps, top-feature reports, CSV export and the
//! training backend.
//!
//! ```bash
//! review-dash summary data/reviews.csv --label positive
//! review-dash correlate https://host/provider_agg.csv
//! review-dash features outputs/top_features.txt --polarity neg --top 10
//! ```
//!
//! Set `RUST_LOG=debug` for progress output on stderr.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use serde::Serialize;

use review_dash::backend::client::{BackendClient, TrainRequest};
use review_dash::config::Settings;
use review_dash::data::export::{download_filename, to_csv_string, write_csv};
use review_dash::data::filter::{FlagFilter, RowFilter};
use review_dash::data::loader::{load, LoadOptions, Source};
use review_dash::data::model::{Row, Table, Value};
use review_dash::jobs::{spawn_loader, LoadJob};
use review_dash::state::{Action, PanelState};
use review_dash::stats::confusion::{ConfusionMatrix, Normalization};
use review_dash::stats::correlation::correlation_matrix;
use review_dash::stats::tally::{
    group_by, summary_from_counts, tally_predictions, CountFields, LabelMode, SentimentLabel,
};
use review_dash::stats::trend::monthly_counts;
use review_dash::text::features::{features_to_table, load_top_features, select, FeatureQuery, Polarity};
use review_dash::text::flags::flag_string;
use review_dash::text::highlight::{Highlighter, Segment};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// JSON settings file (falls back to REVIEW_DASH_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Training backend base URL (overrides config and REVIEW_DASH_BACKEND)
    #[arg(long, global = true)]
    backend: Option<String>,

    /// Treat the first line as data, naming columns 0, 1, 2, ...
    #[arg(long, global = true, default_value_t = false)]
    no_header: bool,

    /// Keep every cell as text
    #[arg(long, global = true, default_value_t = false)]
    raw: bool,

    /// Field delimiter
    #[arg(long, global = true)]
    delimiter: Option<char>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Clone)]
struct FilterArgs {
    /// Case-insensitive search over game, text and flag
    #[arg(long, default_value = "")]
    query: String,

    #[arg(long, value_enum, default_value_t = FlagFilter::All)]
    flag: FlagFilter,

    /// Only rows with this sentiment label
    #[arg(long)]
    label: Option<SentimentLabel>,

    /// Column holding sentiment labels
    #[arg(long, default_value = "sentiment")]
    label_column: String,

    /// Read the label column as words or as 1/0 predictions
    #[arg(long, value_enum, default_value_t = LabelMode::Text)]
    label_mode: LabelMode,
}

impl FilterArgs {
    fn row_filter(&self) -> RowFilter {
        RowFilter {
            label_column: self.label_column.clone(),
            label_mode: self.label_mode,
            ..RowFilter::for_reviews()
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Sentiment tally of a review table
    Summary {
        source: String,
        #[command(flatten)]
        filter: FilterArgs,
        /// Tally binary predictions (1/0) from this column instead of labels
        #[arg(long)]
        predictions: Option<String>,
        /// Read a pre-aggregated count row instead of tallying reviews
        #[arg(long, default_value_t = false)]
        counts: bool,
        /// With --counts: pick the row whose `game` equals this value
        #[arg(long)]
        title: Option<String>,
    },
    /// One page of filtered rows
    Rows {
        source: String,
        #[command(flatten)]
        filter: FilterArgs,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
        /// Split the text column into highlighted segments
        #[arg(long, default_value_t = false)]
        highlight: bool,
    },
    /// Per-group sentiment tallies
    Groups {
        source: String,
        #[arg(long, default_value = "game")]
        by: String,
        #[arg(long, default_value = "sentiment")]
        label_column: String,
    },
    /// Pearson correlation between numeric columns
    Correlate {
        source: String,
        #[arg(long)]
        max_columns: Option<usize>,
        #[arg(long)]
        sample_rows: Option<usize>,
    },
    /// Top weighted terms from a feature report
    Features {
        source: String,
        #[arg(long, value_enum, default_value_t = Polarity::Pos)]
        polarity: Polarity,
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 20)]
        top: usize,
        /// Emit CSV instead of JSON
        #[arg(long, default_value_t = false)]
        csv: bool,
    },
    /// Filtered rows as CSV
    Export {
        source: String,
        #[command(flatten)]
        filter: FilterArgs,
        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Derive the output file name from this title
        #[arg(long)]
        title: Option<String>,
        #[arg(long, default_value = "reviews")]
        suffix: String,
    },
    /// Reviews per month
    Trend {
        source: String,
        #[arg(long, default_value = "timestamp")]
        date_column: String,
    },
    /// Confusion matrix from a header-less count grid
    Confusion {
        source: String,
        #[arg(long, value_enum, default_value_t = Normalization::Row)]
        normalize: Normalization,
    },
    /// Recompute moderation flags and print the table as CSV
    Flags {
        source: String,
        #[arg(long, default_value = "text")]
        text_column: String,
    },
    /// Start a training run on the backend
    Train {
        dataset: String,
        /// Hyper-parameters as a JSON object
        #[arg(long, default_value = "{}")]
        params: String,
    },
    /// Training run history
    Runs,
    /// Datasets known to the backend
    Datasets,
    /// Latest evaluation metrics
    Metrics,
    /// Upload a CSV dataset to the backend
    Upload { path: PathBuf },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::resolve(cli.config.as_deref()).context("loading settings")?;
    if let Some(url) = &cli.backend {
        settings.backend_url = url.clone();
    }
    let options = load_options(&cli, &settings)?;

    match cli.command {
        Command::Summary {
            source,
            filter,
            predictions,
            counts,
            title,
        } => {
            if counts {
                let table = load_table(&source, &options)?;
                let row = count_row(&table, title.as_deref())?;
                return print_json(&summary_from_counts(row, &CountFields::default()));
            }
            let state = filtered_panel(&source, options, &filter, &settings)?;
            match predictions {
                Some(column) => print_json(&tally_predictions(state.visible_rows(), &column)),
                None => print_json(&state.summary()),
            }
        }
        Command::Rows {
            source,
            filter,
            page,
            page_size,
            highlight,
        } => {
            let mut state = filtered_panel(&source, options, &filter, &settings)?;
            if let Some(size) = page_size {
                state.apply(Action::SetPageSize(size));
            }
            state.apply(Action::SetPage(page));
            print_json(&page_view(&state, highlight))
        }
        Command::Groups {
            source,
            by,
            label_column,
        } => {
            let table = load_table(&source, &options)?;
            print_json(&group_by(&table.rows, &by, &label_column))
        }
        Command::Correlate {
            source,
            max_columns,
            sample_rows,
        } => {
            let table = load_table(&source, &options)?;
            let mut corr = settings.correlation;
            if let Some(n) = max_columns {
                corr.max_columns = n;
            }
            if let Some(n) = sample_rows {
                corr.sample_rows = n;
            }
            let matrix = correlation_matrix(&table, &corr);
            if matrix.is_empty() {
                info!("No numeric columns in {source}");
            }
            print_json(&matrix)
        }
        Command::Features {
            source,
            polarity,
            search,
            top,
            csv,
        } => {
            let entries = load_top_features(&Source::parse(&source), options.max_bytes)
                .with_context(|| format!("reading features from {source}"))?;
            let query = FeatureQuery { search, top_n: top };
            let picked: Vec<_> = select(&entries, polarity, &query).into_iter().cloned().collect();
            if csv {
                print!("{}", to_csv_string(&features_to_table(&picked))?);
                Ok(())
            } else {
                print_json(&picked)
            }
        }
        Command::Export {
            source,
            filter,
            out,
            title,
            suffix,
        } => {
            let state = filtered_panel(&source, options, &filter, &settings)?;
            let table = visible_table(&state);
            let target = out.or_else(|| title.map(|t| PathBuf::from(download_filename(&t, &suffix))));
            match target {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    write_csv(&table, file, b',')?;
                    info!("Wrote {} rows to {}", table.len(), path.display());
                    println!("{}", path.display());
                }
                None => write_csv(&table, io::stdout().lock(), b',')?,
            }
            Ok(())
        }
        Command::Trend {
            source,
            date_column,
        } => {
            let table = load_table(&source, &options)?;
            print_json(&monthly_counts(&table.rows, &date_column))
        }
        Command::Confusion { source, normalize } => {
            let options = LoadOptions {
                has_header: false,
                ..options
            };
            let table = load_table(&source, &options)?;
            let matrix = ConfusionMatrix::from_table(&table);
            if matrix.is_empty() {
                bail!("{source} holds no confusion counts");
            }
            print_json(&ConfusionView {
                cells: matrix.normalized(normalize),
                accuracy: matrix.accuracy(),
            })
        }
        Command::Flags {
            source,
            text_column,
        } => {
            let mut table = load_table(&source, &options)?;
            add_flags(&mut table, &text_column);
            write_csv(&table, io::stdout().lock(), b',')?;
            Ok(())
        }
        Command::Train { dataset, params } => {
            let params = serde_json::from_str(&params).context("--params must be JSON")?;
            let request = TrainRequest {
                dataset_ref: dataset,
                params,
            };
            print_json(&client(&settings).train(&request)?.status)
        }
        Command::Runs => {
            let runs: Vec<RunView> = client(&settings)
                .runs()?
                .into_iter()
                .map(|run| RunView {
                    params: run.params(),
                    id: run.id,
                    created_at: run.created_at,
                    accuracy: run.accuracy,
                    f1: run.f1,
                })
                .collect();
            print_json(&runs)
        }
        Command::Datasets => print_json(&client(&settings).datasets()?),
        Command::Metrics => print_json(&client(&settings).metrics()?),
        Command::Upload { path } => print_json(&client(&settings).upload(&path)?.path),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn load_options(cli: &Cli, settings: &Settings) -> Result<LoadOptions> {
    let mut options = settings.load.clone();
    if cli.no_header {
        options.has_header = false;
    }
    if cli.raw {
        options.infer_types = false;
    }
    if let Some(d) = cli.delimiter {
        if !d.is_ascii() {
            bail!("delimiter must be a single ASCII character");
        }
        options.delimiter = d as u8;
    }
    Ok(options)
}

fn client(settings: &Settings) -> BackendClient {
    BackendClient::new(settings.backend_url.clone()).with_max_bytes(settings.load.max_bytes)
}

fn load_table(source: &str, options: &LoadOptions) -> Result<Table> {
    load(&Source::parse(source), options).with_context(|| format!("loading {source}"))
}

/// Load through the background worker into a panel and apply the filter.
fn filtered_panel(
    source: &str,
    options: LoadOptions,
    filter: &FilterArgs,
    settings: &Settings,
) -> Result<PanelState> {
    let mut state = PanelState::new(filter.row_filter(), settings.page_size);
    let (jobs, results, mut handle) = spawn_loader();
    let ticket = state.begin_load();
    jobs.send(LoadJob {
        ticket,
        source: Source::parse(source),
        options,
    })
    .context("loader thread stopped")?;
    let outcome = results.recv().context("loader thread stopped")?;
    handle.shutdown();

    if let Err(e) = &outcome.result {
        return Err(e.clone()).with_context(|| format!("loading {source}"));
    }
    info!("Loaded {source} in {:?}", outcome.elapsed);
    state.apply(Action::LoadFinished(outcome.ticket, outcome.result));
    state.apply(Action::SetQuery(filter.query.clone()));
    state.apply(Action::SetFlagFilter(filter.flag));
    state.apply(Action::SetLabelFilter(filter.label));
    Ok(state)
}

fn visible_table(state: &PanelState) -> Table {
    state
        .table
        .as_ref()
        .map(|t| t.select(&state.visible_indices))
        .unwrap_or_default()
}

fn count_row<'a>(table: &'a Table, title: Option<&str>) -> Result<&'a Row> {
    let row = match title {
        Some(title) => table
            .rows
            .iter()
            .find(|row| row.get("game").is_some_and(|v| v.to_string() == title)),
        None => table.rows.first(),
    };
    row.with_context(|| match title {
        Some(t) => format!("no count row for '{t}'"),
        None => "count table is empty".to_string(),
    })
}

fn add_flags(table: &mut Table, text_column: &str) {
    for row in &mut table.rows {
        let text = row.get(text_column).map(Value::to_string).unwrap_or_default();
        let flags = flag_string(&text);
        let value = if flags.is_empty() {
            Value::Absent
        } else {
            Value::Text(flags)
        };
        row.insert("flag".to_string(), value);
    }
    if !table.has_column("flag") {
        table.columns.push("flag".to_string());
    }
}

#[derive(Serialize)]
struct PageView<'a> {
    page: usize,
    total_pages: usize,
    pages: Vec<usize>,
    showing: (usize, usize),
    total: usize,
    rows: Vec<&'a Row>,
    #[serde(skip_serializing_if = "Option::is_none")]
    highlights: Option<Vec<Vec<Segment>>>,
}

fn page_view(state: &PanelState, highlight: bool) -> PageView<'_> {
    let total = state.visible_indices.len();
    let rows = state.page_rows();
    let highlights = highlight.then(|| {
        let highlighter = if state.filter.query.trim().is_empty() {
            Highlighter::default()
        } else {
            Highlighter::for_query(&state.filter.query)
        };
        rows.iter()
            .map(|row| {
                let text = row.get("text").map(Value::to_string).unwrap_or_default();
                highlighter.segments(&text)
            })
            .collect()
    });
    PageView {
        page: state.page.clamped(total).page,
        total_pages: state.page.total_pages(total),
        pages: state.page.window(total),
        showing: state.page.showing(total),
        total,
        rows,
        highlights,
    }
}

#[derive(Serialize)]
struct ConfusionView {
    cells: Vec<Vec<f64>>,
    accuracy: f64,
}

#[derive(Serialize)]
struct RunView {
    id: String,
    created_at: String,
    accuracy: Option<f64>,
    f1: Option<f64>,
    params: Option<review_dash::backend::params::RunParams>,
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    let mut out = io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

