use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;

use clap::Parser;
use tracing::{info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use dashtable::controller::Controller;
use dashtable::domain::{TVConfig, TVError};
use dashtable::model::{Model, Status};
use dashtable::source::{self, Dataset, FileActions, FileItem, Payment, PaymentActions, Plan, Record, User, UserActions};
use dashtable::table::DataTable;
use dashtable::ui::TableUI;

/// Browse, filter, sort, select and export tabular data in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV, Parquet or Arrow IPC file to open
    file: Option<String>,
    /// Built-in demo dataset to open when no file is given
    #[arg(long, value_enum, conflicts_with = "file")]
    dataset: Option<Dataset>,
    /// Rows per page
    #[arg(long, default_value_t = 10)]
    page_size: usize,
    /// Match filters case sensitively
    #[arg(long)]
    case_sensitive: bool,
    /// Directory exports are written to
    #[arg(long, default_value = ".")]
    export_dir: String,
    /// File name of exports, `.xlsx` is appended
    #[arg(long, default_value = "data")]
    export_name: String,
    /// Log file, stdout belongs to the terminal UI
    #[arg(long, default_value = "dashtable.log")]
    log_file: String,
    /// Terminals narrower than this show rows as cards
    #[arg(long, default_value_t = 80)]
    card_width: usize,
    /// Upper bound for auto sized columns
    #[arg(long, default_value_t = 32)]
    max_column_width: usize,
}

fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.into_owned()),
        Err(e) => {
            warn!("Cannot expand {path}: {e}");
            PathBuf::from(path)
        }
    }
}

fn start_logging(path: &Path) -> Result<(), TVError> {
    let file = File::create(path)?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let init = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .with(ErrorLayer::default())
        .try_init();
    if let Err(e) = init {
        eprintln!("Logging disabled: {e}");
    }
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    match run(args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: Args) -> Result<(), TVError> {
    start_logging(&expand_path(&args.log_file))?;

    let config = TVConfig {
        max_column_width: args.max_column_width,
        page_size: args.page_size,
        card_breakpoint: args.card_width,
        case_sensitive: args.case_sensitive,
        export_dir: expand_path(&args.export_dir),
        export_name: args.export_name.clone(),
        ..TVConfig::default()
    };
    if config.page_size == 0 {
        return Err(TVError::InvalidPageSize);
    }
    info!("Starting with {config:?}");

    if let Some(file) = &args.file {
        let loaded = source::load_data_file(expand_path(file))?;
        let table = DataTable::new(loaded.records, loaded.columns, |r: &Record| r.key.clone());
        return run_ui(|width| Model::init(loaded.name, table, &config, width), &config);
    }

    let stats = source::DashboardStats::compute(&source::users(), &source::payments()).summary();
    match args.dataset.unwrap_or(Dataset::Payments) {
        Dataset::Users => {
            let table = DataTable::new(source::users(), source::user_columns(), |u: &User| u.id.clone());
            run_ui(
                |width| {
                    Ok(Model::init("users", table, &config, width)?
                        .with_actions(UserActions)
                        .with_summary(stats))
                },
                &config,
            )
        }
        Dataset::Payments => {
            let table = DataTable::new(source::payments(), source::payment_columns(), |p: &Payment| p.id.clone());
            run_ui(
                |width| {
                    Ok(Model::init("payments", table, &config, width)?
                        .with_aggregate("Total", |p: &Payment| p.amount)
                        .with_actions(PaymentActions)
                        .with_summary(stats))
                },
                &config,
            )
        }
        Dataset::Files => {
            let table = DataTable::new(source::files(), source::file_columns(), |f: &FileItem| f.id.clone());
            run_ui(
                |width| {
                    Ok(Model::init("files", table, &config, width)?
                        .with_aggregate("Bytes", |f: &FileItem| f.size as f64)
                        .with_actions(FileActions))
                },
                &config,
            )
        }
        Dataset::Plans => {
            let table = DataTable::new(source::plans(), source::plan_columns(), |p: &Plan| p.id.clone());
            run_ui(|width| Model::init("plans", table, &config, width), &config)
        }
    }
}

fn run_ui<T, F>(build: F, config: &TVConfig) -> Result<(), TVError>
where
    T: Sync,
    F: FnOnce(usize) -> Result<Model<T>, TVError>,
{
    let mut terminal = ratatui::init();
    let result = (|| -> Result<(), TVError> {
        let size = terminal.size()?;
        let mut model = build(size.width as usize)?;
        let mut ui = TableUI::new(config);
        let controller = Controller::new(config);

        while model.status != Status::QUITTING {
            // Render the current view
            terminal.draw(|f| ui.draw(&model, f))?;

            // Handle events and map to a Message
            let message = controller.handle_event(&model)?;
            model.update(message)?;
        }
        Ok(())
    })();
    ratatui::restore();
    result
}
