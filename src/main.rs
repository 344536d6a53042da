use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use ratatui::DefaultTerminal;
use tracing::{error, info};

use admission_table::controller::Controller;
use admission_table::domain::{AdmError, AppConfig};
use admission_table::logging::init_logging;
use admission_table::model::{Model, Status};
use admission_table::page::ListPage;
use admission_table::record::ListRecord;
use admission_table::records::{Applicant, Credential, ExamCenter, Institution, MarkColumn};
use admission_table::source::FileSource;
use admission_table::ui::TableUI;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Applicants,
    Institutions,
    ExamCenters,
    MarkColumns,
    Credentials,
}

/// Browse admission exports with search, column filters and sorting.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Which list the file holds
    #[arg(value_enum)]
    kind: Kind,

    /// csv, parquet or arrow export
    path: String,

    #[arg(long, default_value_t = 32)]
    max_column_width: usize,

    /// Milliseconds to wait for terminal events per frame
    #[arg(long, default_value_t = 100)]
    event_poll_time: u64,

    #[arg(long)]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn expand(path: &str) -> Result<PathBuf, AdmError> {
    shellexpand::full(path)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| AdmError::LoadingFailed(e.to_string()))
}

fn run(cli: Cli) -> Result<(), AdmError> {
    let mut config = AppConfig::default()
        .with_max_column_width(cli.max_column_width)
        .with_event_poll_time(cli.event_poll_time);
    if let Some(log_file) = &cli.log_file {
        config = config.with_log_file(expand(log_file)?);
    }
    init_logging(&config.log_file)?;

    let path = expand(&cli.path)?;
    info!("Starting admtable: {:?} from {}", cli.kind, path.display());
    match cli.kind {
        Kind::Applicants => run_page::<Applicant>(&config, path),
        Kind::Institutions => run_page::<Institution>(&config, path),
        Kind::ExamCenters => run_page::<ExamCenter>(&config, path),
        Kind::MarkColumns => run_page::<MarkColumn>(&config, path),
        Kind::Credentials => run_page::<Credential>(&config, path),
    }
}

fn run_page<R: ListRecord>(config: &AppConfig, path: PathBuf) -> Result<(), AdmError> {
    let source = FileSource::open(path)?;
    let mut page = ListPage::<R>::for_kind()?;
    page.load(&source)?;

    let mut terminal = ratatui::init();
    let result = event_loop(config, source.name(), page, &mut terminal);
    ratatui::restore();
    result
}

fn event_loop<R: ListRecord>(
    config: &AppConfig,
    name: String,
    page: ListPage<R>,
    terminal: &mut DefaultTerminal,
) -> Result<(), AdmError> {
    let size = terminal.size()?;
    let mut model = Model::init(config, name, page, size.width as usize, size.height as usize);
    let ui = TableUI::new();
    let controller = Controller::new(config);

    while model.status != Status::Quitting {
        // Render the current view
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(model.raw_keyevents())? {
            model.update(message);
        }
    }
    info!("Quitting");
    Ok(())
}
