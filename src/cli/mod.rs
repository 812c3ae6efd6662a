//! # CLI Module
//!
//! Command-line front end for the space reclaimer.
//!
//! ## Usage
//! ```bash
//! # Where is the space going?
//! reclaim scan ~/
//!
//! # Byte-identical files over 1 MiB
//! reclaim dupes ~/Downloads --min-size 1048576
//!
//! # Move files into quarantine, then bring one back
//! reclaim dispose --quarantine ~/Downloads/old.iso
//! reclaim quarantine list
//! reclaim quarantine restore <id>
//!
//! # JSON output for scripting
//! reclaim --output json dupes ~/Pictures
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use console::{style, Term};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use space_reclaim::config::{AppPaths, ExclusionList};
use space_reclaim::core::category::{Categorizer, Category};
use space_reclaim::core::disposal::{
    DeletionEngine, DisposeMode, DisposeReport, DisposeRequest, SystemRecycleBin,
};
use space_reclaim::core::duplicates::{DuplicateConfig, DuplicateFinder, DuplicateScanResult};
use space_reclaim::core::empty_folders::{EmptyFolderConfig, EmptyFolderFinder};
use space_reclaim::core::history::HistoryRepository;
use space_reclaim::core::paths::normalize;
use space_reclaim::core::quarantine::QuarantineStore;
use space_reclaim::core::scanner::{
    CategorySummary, DirectoryScanner, ExclusionSet, ScanConfig, ScanOutcome,
};
use space_reclaim::core::CancellationToken;
use space_reclaim::error::Result;
use space_reclaim::events::{
    DisposeEvent, DuplicateEvent, EmptyFolderEvent, Event, EventChannel, EventReceiver, ScanEvent,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Space Reclaim - find what is using your disk and dispose of it safely
#[derive(Parser, Debug)]
#[command(name = "reclaim")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Keep quarantine, history and exclusions under this directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show sizes by category and the largest directories
    Scan {
        root: PathBuf,

        /// How many of the largest directories to show
        #[arg(long, default_value = "10")]
        top: usize,

        /// Follow symbolic links
        #[arg(long)]
        follow_symlinks: bool,
    },

    /// Find byte-identical files
    Dupes {
        root: PathBuf,

        /// Ignore files of this size or smaller
        #[arg(long, default_value = "1024")]
        min_size: u64,
    },

    /// Find empty directories
    Empty {
        root: PathBuf,

        /// Also report directories that only hold empty directories
        #[arg(long)]
        nested: bool,
    },

    /// Send files or directories to the recycle bin or quarantine
    Dispose {
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Move into the quarantine area instead of the recycle bin
        #[arg(long)]
        quarantine: bool,
    },

    /// Inspect and manage the quarantine area
    Quarantine {
        #[command(subcommand)]
        action: QuarantineAction,
    },

    /// Show the deletion history
    History {
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Remove every history record
        #[arg(long)]
        clear: bool,
    },

    /// Manage directories that scans never enter
    Exclusions {
        #[command(subcommand)]
        action: ExclusionAction,
    },
}

#[derive(Subcommand, Debug)]
enum QuarantineAction {
    /// List quarantined items, including unindexed ones
    List,
    /// Put items back where they came from
    Restore {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Delete items for good
    Purge {
        #[arg(required = true)]
        ids: Vec<String>,

        /// Confirm that this cannot be undone
        #[arg(long)]
        yes: bool,
    },
    /// Report objects without index entries and entries without objects
    Reconcile,
}

#[derive(Subcommand, Debug)]
enum ExclusionAction {
    List,
    Add { dir: PathBuf },
    Remove { dir: PathBuf },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Human-readable output with colors
    Pretty,
    /// JSON output for scripting
    Json,
}

struct Context {
    paths: AppPaths,
    output: OutputFormat,
    term: Term,
}

impl Context {
    fn pretty(&self) -> bool {
        self.output == OutputFormat::Pretty
    }

    /// Read fresh for every scan
    fn exclusions(&self) -> Result<ExclusionSet> {
        Ok(ExclusionList::load(&self.paths.exclusions_file())?.to_set())
    }

    fn history(&self) -> Result<Arc<HistoryRepository>> {
        Ok(Arc::new(HistoryRepository::open(&self.paths.history_db())?))
    }

    fn store(&self, history: Arc<HistoryRepository>) -> Arc<QuarantineStore> {
        Arc::new(QuarantineStore::new(self.paths.quarantine_dir()).with_audit(history))
    }

    fn line(&self, text: impl AsRef<str>) {
        self.term.write_line(text.as_ref()).ok();
    }

    fn spinner(&self) -> Option<ProgressBar> {
        if !self.pretty() {
            return None;
        }
        let pb = ProgressBar::new_spinner();
        if let Ok(template) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
            pb.set_style(template);
        }
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }

    fn bar(&self, total: u64) -> Option<ProgressBar> {
        if !self.pretty() {
            return None;
        }
        let pb = ProgressBar::new(total);
        if let Ok(template) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            pb.set_style(template.progress_chars("█▓░"));
        }
        Some(pb)
    }
}

/// Run the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    let paths = match cli.data_dir {
        Some(dir) => AppPaths::rooted_at(dir),
        None => AppPaths::from_environment()?,
    };
    let ctx = Context {
        paths,
        output: cli.output,
        term: Term::stderr(),
    };

    match cli.command {
        Commands::Scan {
            root,
            top,
            follow_symlinks,
        } => run_scan(&ctx, &root, top, follow_symlinks),
        Commands::Dupes { root, min_size } => run_dupes(&ctx, &root, min_size),
        Commands::Empty { root, nested } => run_empty(&ctx, &root, nested),
        Commands::Dispose { paths, quarantine } => run_dispose(&ctx, paths, quarantine),
        Commands::Quarantine { action } => run_quarantine(&ctx, action),
        Commands::History { limit, clear } => run_history(&ctx, limit, clear),
        Commands::Exclusions { action } => run_exclusions(&ctx, action),
    }
}

#[derive(Serialize)]
struct ScanSummary {
    root: PathBuf,
    completed: bool,
    total_size_bytes: u64,
    files: usize,
    directories: usize,
    skipped: usize,
    categories: BTreeMap<Category, CategorySummary>,
    largest_directories: Vec<(PathBuf, u64)>,
}

fn run_scan(ctx: &Context, root: &Path, top: usize, follow_symlinks: bool) -> Result<()> {
    let exclusions = ctx.exclusions()?;
    let scanner = DirectoryScanner::new(
        ScanConfig {
            follow_symlinks,
            ..ScanConfig::default()
        },
        Categorizer::from_environment(),
    );

    let (sender, receiver) = EventChannel::new();
    let spinner = ctx.spinner();
    let spinner_events = spinner.clone();

    // Bucket items as they stream in
    let collector = receiver.fold_in_background(
        BTreeMap::<Category, CategorySummary>::new(),
        move |categories, event| match event {
            Event::Scan(ScanEvent::ItemFound(item)) => {
                categories.entry(item.category).or_default().add(&item);
            }
            Event::Scan(ScanEvent::Progress(p)) => {
                if let Some(ref pb) = spinner_events {
                    pb.set_message(format!(
                        "{} files, {} directories  {}",
                        p.files_found,
                        p.directories_scanned,
                        p.current_path.display()
                    ));
                }
            }
            _ => {}
        },
    );

    let outcome = scanner.scan_with_events(root, &exclusions, &sender, &CancellationToken::new());
    drop(sender);
    let categories = collector.join().unwrap_or_default();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let outcome = outcome?;

    let summary = ScanSummary {
        root: outcome.root.clone(),
        completed: outcome.completed,
        total_size_bytes: outcome.total_size_bytes(),
        files: outcome.files,
        directories: outcome.directories,
        skipped: outcome.skipped,
        categories,
        largest_directories: outcome.largest_directories(top),
    };

    match ctx.output {
        OutputFormat::Json => print_json(&summary),
        OutputFormat::Pretty => print_scan(ctx, &summary, &outcome),
    }
    Ok(())
}

fn print_scan(ctx: &Context, summary: &ScanSummary, outcome: &ScanOutcome) {
    ctx.line(format!(
        "{} {}",
        style("✓").green().bold(),
        style(display_path(&summary.root)).bold()
    ));
    ctx.line(format!(
        "  {} in {} files and {} directories",
        style(format_bytes(summary.total_size_bytes)).yellow(),
        style(summary.files).cyan(),
        style(summary.directories).cyan()
    ));
    if outcome.skipped > 0 {
        ctx.line(format!("  {} entries could not be read", style(outcome.skipped).dim()));
    }
    ctx.line("");

    ctx.line(format!("{}", style("By category:").bold().underlined()));
    for (category, bucket) in &summary.categories {
        let name = if category.is_protected() {
            style(category.display_name()).red()
        } else {
            style(category.display_name()).green()
        };
        ctx.line(format!(
            "  {:<24} {:>10}  {} files",
            name,
            format_bytes(bucket.size_bytes),
            bucket.files
        ));
    }

    if !summary.largest_directories.is_empty() {
        ctx.line("");
        ctx.line(format!("{}", style("Largest directories:").bold().underlined()));
        for (path, size) in &summary.largest_directories {
            ctx.line(format!("  {:>10}  {}", format_bytes(*size), display_path(path)));
        }
    }
}

fn run_dupes(ctx: &Context, root: &Path, min_size: u64) -> Result<()> {
    let exclusions = ctx.exclusions()?;
    let finder = DuplicateFinder::new(DuplicateConfig::default().with_min_size(min_size));

    let (sender, receiver) = EventChannel::new();
    let progress = ctx.bar(0);
    let watcher = watch_duplicate_events(receiver, progress.clone());

    let result = finder.find_with_events(root, &exclusions, &sender, &CancellationToken::new());
    drop(sender);
    watcher.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let result = result?;

    match ctx.output {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Pretty => print_dupes(ctx, &result),
    }
    Ok(())
}

fn watch_duplicate_events(
    receiver: EventReceiver,
    progress: Option<ProgressBar>,
) -> thread::JoinHandle<()> {
    receiver.listen_in_background(move |event| {
        let Some(ref pb) = progress else { return };
        match event {
            Event::Duplicate(DuplicateEvent::PhaseChanged { phase }) => {
                pb.set_position(0);
                pb.set_message(phase.to_string());
            }
            Event::Duplicate(DuplicateEvent::Progress(p)) => {
                pb.set_length(p.total as u64);
                pb.set_position(p.completed as u64);
            }
            _ => {}
        }
    })
}

fn print_dupes(ctx: &Context, result: &DuplicateScanResult) {
    ctx.line(format!("{} Duplicate scan complete", style("✓").green().bold()));
    ctx.line(format!(
        "  {} files considered, {} duplicate groups holding {} files, {} reclaimable",
        style(result.files_considered).cyan(),
        style(result.sets.len()).cyan(),
        style(result.duplicate_file_count()).cyan(),
        style(format_bytes(result.reclaimable_bytes())).yellow()
    ));
    if result.files_dropped > 0 {
        ctx.line(format!(
            "  {} files could not be read",
            style(result.files_dropped).dim()
        ));
    }
    ctx.line("");

    for (i, set) in result.sets.iter().enumerate() {
        ctx.line(format!(
            "  {} {} copies of {}",
            style(format!("Group {}:", i + 1)).bold(),
            set.paths.len(),
            format_bytes(set.size_bytes)
        ));
        for path in &set.paths {
            ctx.line(format!("    {} {}", style("○").dim(), display_path(path)));
        }
        ctx.line("");
    }

    ctx.line(format!(
        "{}",
        style("No files were deleted. Use `reclaim dispose` on the copies you do not need.").dim()
    ));
}

fn run_empty(ctx: &Context, root: &Path, nested: bool) -> Result<()> {
    let exclusions = ctx.exclusions()?;
    let finder = EmptyFolderFinder::new(EmptyFolderConfig {
        include_nested: nested,
        ..Default::default()
    });

    let (sender, receiver) = EventChannel::new();
    let spinner = ctx.spinner();
    let spinner_events = spinner.clone();
    let watcher = receiver.listen_in_background(move |event| {
        if let (Some(pb), Event::EmptyFolder(EmptyFolderEvent::Found { path })) =
            (&spinner_events, event)
        {
            pb.set_message(path.display().to_string());
        }
    });

    let result = finder.find_with_events(root, &exclusions, &sender, &CancellationToken::new());
    drop(sender);
    watcher.join().ok();
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let result = result?;

    match ctx.output {
        OutputFormat::Json => print_json(&result),
        OutputFormat::Pretty => {
            ctx.line(format!(
                "{} {} empty directories",
                style("✓").green().bold(),
                style(result.folders.len()).cyan()
            ));
            for folder in &result.folders {
                ctx.line(format!("  {}", display_path(folder)));
            }
        }
    }
    Ok(())
}

fn run_dispose(ctx: &Context, paths: Vec<PathBuf>, quarantine: bool) -> Result<()> {
    let categorizer = Categorizer::from_environment();
    let requests: Vec<DisposeRequest> = paths
        .iter()
        .map(|p| {
            let path = normalize(p);
            let size = fs::symlink_metadata(&path)
                .map(|m| if m.is_dir() { 0 } else { m.len() })
                .unwrap_or(0);
            let category = categorizer.classify(&path);
            DisposeRequest::new(path, size).with_category(category)
        })
        .collect();

    let history = ctx.history()?;
    let engine = DeletionEngine::new(
        ctx.store(history.clone()),
        Arc::new(SystemRecycleBin),
        history,
    );
    let mode = if quarantine {
        DisposeMode::Quarantine
    } else {
        DisposeMode::Recycle
    };

    let (sender, receiver) = EventChannel::new();
    let progress = ctx.bar(requests.len() as u64);
    let progress_events = progress.clone();
    let watcher = receiver.listen_in_background(move |event| {
        if let (Some(pb), Event::Dispose(DisposeEvent::Progress(p))) = (&progress_events, event) {
            pb.set_position(p.completed as u64);
            pb.set_message(format!("{}%", p.percent()));
        }
    });

    let report = engine.dispose_with_events(&requests, mode, &sender, &CancellationToken::new());
    drop(sender);
    watcher.join().ok();
    if let Some(pb) = progress {
        pb.finish_and_clear();
    }
    let report = report?;

    match ctx.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Pretty => print_dispose(ctx, &report),
    }
    Ok(())
}

fn print_dispose(ctx: &Context, report: &DisposeReport) {
    let verb = match report.mode {
        DisposeMode::Recycle => "Recycled",
        DisposeMode::Quarantine => "Quarantined",
    };
    ctx.line(format!(
        "{} {} {} items ({})",
        style("✓").green().bold(),
        verb,
        style(report.succeeded_count()).cyan(),
        format_bytes(report.freed_bytes())
    ));
    for item in &report.succeeded {
        match &item.quarantine_id {
            Some(id) => ctx.line(format!(
                "  {} {}",
                display_path(&item.request.path),
                style(id).dim()
            )),
            None => ctx.line(format!("  {}", display_path(&item.request.path))),
        }
    }

    if !report.failed.is_empty() {
        ctx.line("");
        ctx.line(format!(
            "{} {} items failed",
            style("✗").red().bold(),
            report.failed_count()
        ));
        for failure in &report.failed {
            ctx.line(format!(
                "  {} {}",
                display_path(&failure.request.path),
                style(&failure.reason).red()
            ));
            if let Some(id) = &failure.quarantine_id {
                ctx.line(format!(
                    "    {} reclaim quarantine restore {}",
                    style("undo with").dim(),
                    style(id).cyan()
                ));
            }
        }
    }
}

fn run_quarantine(ctx: &Context, action: QuarantineAction) -> Result<()> {
    let history = ctx.history()?;
    let store = ctx.store(history);

    match action {
        QuarantineAction::List => {
            let items = store.list()?;
            match ctx.output {
                OutputFormat::Json => print_json(&items),
                OutputFormat::Pretty => {
                    if items.is_empty() {
                        ctx.line("Quarantine is empty");
                    }
                    for item in &items {
                        let when = item
                            .timestamp
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "unknown".to_string());
                        let original = item
                            .entry
                            .as_ref()
                            .map(|e| display_path(&e.original_path))
                            .unwrap_or_else(|| "-".to_string());
                        let status = if item.is_unknown() || !item.object_present {
                            style(item.status()).red()
                        } else {
                            style(item.status()).dim()
                        };
                        ctx.line(format!("{}  {}  {}", when, style(&item.id).bold(), status));
                        ctx.line(format!("    {}", original));
                    }
                }
            }
        }
        QuarantineAction::Restore { ids } => {
            let report = store.restore(&ids);
            match ctx.output {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Pretty => {
                    for item in &report.restored {
                        ctx.line(format!(
                            "{} {}",
                            style("✓").green(),
                            display_path(&item.restored_path)
                        ));
                    }
                    for failure in &report.failed {
                        ctx.line(format!(
                            "{} {}: {}",
                            style("✗").red(),
                            failure.quarantine_id,
                            failure.reason
                        ));
                    }
                }
            }
        }
        QuarantineAction::Purge { ids, yes } => {
            if !yes {
                ctx.line(format!(
                    "{} Permanent deletion cannot be undone. Re-run with --yes to confirm.",
                    style("!").yellow().bold()
                ));
                return Ok(());
            }
            let report = store.purge_permanently(&ids);
            match ctx.output {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Pretty => {
                    ctx.line(format!("Deleted {} items permanently", report.purged_count));
                    for failure in &report.failed {
                        ctx.line(format!(
                            "{} {}: {}",
                            style("✗").red(),
                            failure.quarantine_id,
                            failure.reason
                        ));
                    }
                }
            }
        }
        QuarantineAction::Reconcile => {
            let report = store.reconcile()?;
            match ctx.output {
                OutputFormat::Json => print_json(&report),
                OutputFormat::Pretty => {
                    if report.is_consistent() {
                        ctx.line(format!("{} Quarantine index is consistent", style("✓").green()));
                    }
                    for object in &report.unknown_objects {
                        ctx.line(format!(
                            "{} unknown quarantined item: {}",
                            style("?").yellow(),
                            object.display()
                        ));
                    }
                    for (id, entry) in &report.orphaned_entries {
                        ctx.line(format!(
                            "{} orphaned metadata: {} (was {})",
                            style("?").yellow(),
                            id,
                            display_path(&entry.original_path)
                        ));
                    }
                }
            }
        }
    }
    Ok(())
}

fn run_history(ctx: &Context, limit: usize, clear: bool) -> Result<()> {
    let history = ctx.history()?;
    if clear {
        let removed = history.clear()?;
        ctx.line(format!("Removed {} history records", removed));
        return Ok(());
    }

    let records = history.list_recent(limit)?;
    match ctx.output {
        OutputFormat::Json => print_json(&records),
        OutputFormat::Pretty => {
            for record in &records {
                ctx.line(format!(
                    "{}  {:<20} {}",
                    record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    record.event_type.display_name(),
                    display_path(&record.path)
                ));
            }
        }
    }
    Ok(())
}

fn run_exclusions(ctx: &Context, action: ExclusionAction) -> Result<()> {
    let mut list = ExclusionList::load(&ctx.paths.exclusions_file())?;
    match action {
        ExclusionAction::List => match ctx.output {
            OutputFormat::Json => print_json(&list.entries()),
            OutputFormat::Pretty => {
                for entry in list.entries() {
                    ctx.line(entry);
                }
            }
        },
        ExclusionAction::Add { dir } => {
            if list.add(&dir) {
                list.save()?;
                ctx.line(format!("Excluded {}", display_path(&normalize(&dir))));
            } else {
                ctx.line("Already excluded");
            }
        }
        ExclusionAction::Remove { dir } => {
            if list.remove(&dir) {
                list.save()?;
                ctx.line(format!("No longer excluding {}", display_path(&normalize(&dir))));
            } else {
                ctx.line("Not in the exclusion list");
            }
        }
    }
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("failed to render JSON: {}", e),
    }
}

fn display_path(path: &Path) -> String {
    match dirs::home_dir().and_then(|home| path.strip_prefix(home).ok().map(Path::to_path_buf)) {
        Some(relative) if !relative.as_os_str().is_empty() => format!("~/{}", relative.display()),
        _ => path.display().to_string(),
    }
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}
