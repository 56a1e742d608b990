use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use add_to_search::app::commands::{
    AddOutcome, MergeController, SourceView, capture, check_add, open_target, plan_for,
    use_target,
};
use add_to_search::app::document::split_lines;
use add_to_search::app::selection::LineSelection;
use add_to_search::app::settings::{ProjectSettings, ProjectStore};
use add_to_search::infra::config::{Config, project_root};
use add_to_search::infra::host::{Document, FsHost};

#[derive(Parser)]
#[command(
    name = "add-to-search",
    author,
    version,
    about = "Collect lines from source files into a search-results document"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Make FILE the target aggregation document for this project
    Use { file: PathBuf },
    /// Print the target aggregation document
    Open,
    /// Merge lines of SOURCE into the target aggregation document
    Add {
        source: PathBuf,
        /// 1-indexed lines to collect, e.g. `3,7-9` (whole file when omitted)
        #[arg(long = "lines", value_name = "SPEC")]
        lines: Vec<String>,
        /// Merge into this document instead of the configured target
        #[arg(long)]
        target: Option<PathBuf>,
        /// Print the planned insertions as JSON without writing
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;
    add_to_search::init(&config.defaults.log_filter);

    let store = ProjectStore::new(project_root()?, &config.defaults.state_dir);
    match cli.command {
        Commands::Use { file } => run_use(&config, &store, &file),
        Commands::Open => run_open(&store),
        Commands::Add {
            source,
            lines,
            target,
            dry_run,
        } => run_add(&config, &store, &source, &lines, target.as_deref(), dry_run),
    }
}

fn run_use(config: &Config, store: &ProjectStore, file: &Path) -> Result<()> {
    let project = store.load()?;
    let mut settings = ProjectSettings::read(&project);
    let path = absolute_string(file)?;
    if let Err(reason) = use_target(&mut settings, &path, &config.defaults.extension) {
        println!("{reason}");
        return Ok(());
    }
    store.save(&settings.apply(&project))?;
    println!("using {path}");
    Ok(())
}

fn run_open(store: &ProjectStore) -> Result<()> {
    let settings = ProjectSettings::read(&store.load()?);
    match open_target(&settings) {
        Ok(path) => println!("{path}"),
        Err(reason) => println!("{reason}"),
    }
    Ok(())
}

fn run_add(
    config: &Config,
    store: &ProjectStore,
    source: &Path,
    specs: &[String],
    target: Option<&Path>,
    dry_run: bool,
) -> Result<()> {
    let extension = &config.defaults.extension;
    let mut settings = ProjectSettings::read(&store.load()?);
    if let Some(target) = target {
        settings.set_add_to(absolute_string(target)?);
    }

    let source_path = absolute_string(source)?;
    let text = fs::read_to_string(source)
        .with_context(|| format!("failed to read source {}", source.display()))?;
    let selection = parse_selection(specs, split_lines(&text).len())?;
    let view = SourceView {
        path: Some(&source_path),
        text: &text,
        selection: &selection,
        aggregation_syntax: false,
    };

    if dry_run {
        let planned = check_add(&view, &settings, extension).and_then(|target| {
            capture(&view, extension).map(|batches| (target, batches))
        });
        let (target, batches) = match planned {
            Ok(planned) => planned,
            Err(reason) => {
                println!("{reason}");
                return Ok(());
            }
        };
        let document = Document::open(target)?;
        let insertions = plan_for(document.contents(), batches);
        println!(
            "{}",
            serde_json::to_string_pretty(&insertions).context("failed to serialize plan")?
        );
        return Ok(());
    }

    let mut host = FsHost::new();
    let mut controller = MergeController::new(config.merge.select_inserted());
    match controller.add_selection(&mut host, &settings, &view, extension)? {
        AddOutcome::Applied(applied) => {
            host.save_all()?;
            let target = settings.add_to().unwrap_or_default();
            println!("merged {} line(s) into {target}", applied.inserted);
        }
        AddOutcome::Deferred { .. } => println!("merge deferred until the target loads"),
        AddOutcome::Skipped(reason) => println!("{reason}"),
    }
    Ok(())
}

fn parse_selection(specs: &[String], line_count: usize) -> Result<LineSelection> {
    if specs.is_empty() {
        return Ok(LineSelection::whole(line_count));
    }
    let mut selection = LineSelection::new();
    for spec in specs {
        let parsed: LineSelection = spec.parse()?;
        for &(start, end) in parsed.ranges() {
            selection.add_range(start, end);
        }
    }
    Ok(selection)
}

fn absolute_string(path: &Path) -> Result<String> {
    let absolute = std::path::absolute(path)
        .with_context(|| format!("failed to resolve path {}", path.display()))?;
    absolute
        .to_str()
        .map(str::to_owned)
        .with_context(|| format!("path is not valid UTF-8: {}", absolute.display()))
}
