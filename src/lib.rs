//! coco-doctor: merge, repair and curate COCO-style annotation datasets.
//!
//! The library holds the dataset engine; the `coco-doctor` binary is a thin
//! command-line front end over it. Engine modules perform no I/O beyond the
//! explicit file helpers and never log.
//!
//! # Modules
//!
//! - [`dataset`]: COCO records, the borrowing [`dataset::Index`], JSON I/O
//!   and the image-path map
//! - [`reconcile`]: collision-free id planning for merges
//! - [`merge`]: the merge engine and its report
//! - [`mutate`]: category rename/delete, image delete, field repair
//! - [`palette`]: deterministic per-category display colors
//! - [`validation`]: dataset validation and error reporting
//! - [`inspect`]: summary and single-sample views
//! - [`export`]: writing a self-contained dataset directory
//! - [`error`]: error types for coco-doctor operations

pub mod dataset;
pub mod error;
pub mod export;
pub mod inspect;
pub mod merge;
pub mod mutate;
pub mod palette;
pub mod reconcile;
pub mod validation;

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand, ValueEnum};
use log::{debug, info, warn};
use serde::Serialize;

use dataset::io_coco_json::{read_coco_json, write_coco_json};
use dataset::{
    resolve_image_paths, BaseDirResolver, CategoryId, Dataset, ImageId, ImagePaths, Index,
};
use reconcile::{CategoryMapping, CategoryPolicy};

pub use error::{DoctorError, PolicyConflict, RecordKind};

/// Environment variable consulted for the primary dataset's image directory.
pub const IMAGES_ENV: &str = "COCO_DOCTOR_IMAGES";

/// The coco-doctor CLI application.
#[derive(Parser)]
#[command(name = "coco-doctor")]
#[command(version, author, about)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Print dataset counts and the class list.
    Info(InfoArgs),
    /// Show images with their annotations.
    Show(ShowArgs),
    /// Validate a dataset for errors and warnings.
    Validate(ValidateArgs),
    /// Merge a second dataset into the first.
    Merge(MergeArgs),
    /// List, renumber or delete categories.
    Categories(CategoriesArgs),
    /// Delete one image and its annotations.
    DeleteImage(DeleteImageArgs),
    /// Fill in missing `iscrowd` / `segmentation` fields.
    Repair(RepairArgs),
    /// Write the dataset and copy its images to a directory.
    Export(ExportArgs),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum PolicyArg {
    /// Keep only annotations whose category id exists in the target.
    #[default]
    Strict,
    /// Match categories by name; unmatched names get new ids.
    ByName,
}

/// Where a modified dataset is written.
#[derive(clap::Args)]
struct Destination {
    /// Write the result to this file.
    #[arg(long, value_name = "FILE", conflicts_with = "in_place")]
    out: Option<PathBuf>,

    /// Overwrite the input file.
    #[arg(long)]
    in_place: bool,
}

impl Destination {
    fn resolve(&self, input: &Path) -> Result<PathBuf, DoctorError> {
        match (&self.out, self.in_place) {
            (Some(out), _) => Ok(out.clone()),
            (None, true) => Ok(input.to_path_buf()),
            (None, false) => Err(DoctorError::InvalidArgument(
                "pass --out FILE or --in-place".to_string(),
            )),
        }
    }
}

#[derive(clap::Args)]
struct InfoArgs {
    /// COCO annotation file.
    input: PathBuf,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct ShowArgs {
    /// COCO annotation file.
    input: PathBuf,

    /// 1-based position of the first image to show.
    #[arg(long, default_value_t = 1, conflicts_with = "id")]
    position: usize,

    /// Id of the first image to show.
    #[arg(long)]
    id: Option<u64>,

    /// Number of images to show, wrapping around the end of the list.
    #[arg(long, default_value_t = 1)]
    count: usize,

    /// Step backwards through the image list.
    #[arg(long)]
    reverse: bool,

    /// Directory holding the image files.
    #[arg(long, env = IMAGES_ENV)]
    images: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct ValidateArgs {
    /// COCO annotation file.
    input: PathBuf,

    /// Treat warnings as errors (exit non-zero if any warnings).
    #[arg(long)]
    strict: bool,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct MergeArgs {
    /// Dataset to merge into.
    target: PathBuf,

    /// Dataset whose images and annotations are imported.
    source: PathBuf,

    /// How source categories map onto the target's.
    #[arg(long, value_enum, default_value_t)]
    policy: PolicyArg,

    /// Assign a source category an explicit target id (by-name policy).
    #[arg(long = "map", value_name = "SRC=DST", value_parser = parse_id_pair)]
    maps: Vec<(u64, u64)>,

    /// Do not import annotations of this source category (by-name policy).
    #[arg(long = "skip", value_name = "SRC")]
    skips: Vec<u64>,

    /// Also import source images that end up without annotations.
    #[arg(long)]
    keep_unannotated_images: bool,

    /// Report what would happen without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Image directory of the target dataset.
    #[arg(long, env = IMAGES_ENV)]
    images: Option<PathBuf>,

    /// Image directory of the source dataset.
    #[arg(long)]
    source_images: Option<PathBuf>,

    /// Also export the merged dataset with its images to this directory.
    #[arg(long, value_name = "DIR")]
    export: Option<PathBuf>,

    #[command(flatten)]
    dest: Destination,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct CategoriesArgs {
    /// COCO annotation file.
    input: PathBuf,

    /// Renumber a category; may be repeated and is applied as one batch.
    #[arg(long = "rename", value_name = "OLD=NEW", value_parser = parse_id_pair)]
    renames: Vec<(u64, u64)>,

    /// Delete a category and all of its annotations; may be repeated.
    #[arg(long = "delete", value_name = "ID", conflicts_with = "renames")]
    deletes: Vec<u64>,

    /// Confirm a delete.
    #[arg(long)]
    yes: bool,

    #[command(flatten)]
    dest: Destination,

    /// Output format.
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

#[derive(clap::Args)]
struct DeleteImageArgs {
    /// COCO annotation file.
    input: PathBuf,

    /// Id of the image to delete.
    #[arg(long)]
    id: u64,

    /// Confirm the delete.
    #[arg(long)]
    yes: bool,

    /// Directory holding the image files; the file itself is never removed.
    #[arg(long, env = IMAGES_ENV)]
    images: Option<PathBuf>,

    #[command(flatten)]
    dest: Destination,
}

#[derive(clap::Args)]
struct RepairArgs {
    /// COCO annotation file.
    input: PathBuf,

    /// Only add missing `iscrowd` fields.
    #[arg(long)]
    iscrowd: bool,

    /// Only add missing `segmentation` fields.
    #[arg(long)]
    segmentation: bool,

    #[command(flatten)]
    dest: Destination,
}

#[derive(clap::Args)]
struct ExportArgs {
    /// COCO annotation file.
    input: PathBuf,

    /// Directory holding the image files.
    #[arg(long, env = IMAGES_ENV)]
    images: PathBuf,

    /// Export directory.
    #[arg(long, value_name = "DIR")]
    out_dir: PathBuf,

    /// Output format for the report.
    #[arg(long, value_enum, default_value_t)]
    output: OutputFormat,
}

/// Run the coco-doctor CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), DoctorError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Info(args)) => run_info(args),
        Some(Commands::Show(args)) => run_show(args),
        Some(Commands::Validate(args)) => run_validate(args),
        Some(Commands::Merge(args)) => run_merge(args),
        Some(Commands::Categories(args)) => run_categories(args),
        Some(Commands::DeleteImage(args)) => run_delete_image(args),
        Some(Commands::Repair(args)) => run_repair(args),
        Some(Commands::Export(args)) => run_export(args),
        None => {
            println!("coco-doctor {}", env!("CARGO_PKG_VERSION"));
            println!();
            println!("Merge, repair and curate COCO-style annotation datasets.");
            println!();
            println!("Run 'coco-doctor --help' for usage information.");
            Ok(())
        }
    }
}

// RUST_LOG wins over -v when set.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .try_init();
}

fn parse_id_pair(s: &str) -> Result<(u64, u64), String> {
    let (left, right) = s
        .split_once('=')
        .ok_or_else(|| format!("expected OLD=NEW, got '{}'", s))?;
    let parse = |part: &str| {
        part.trim()
            .parse::<u64>()
            .map_err(|e| format!("invalid id '{}': {}", part, e))
    };
    Ok((parse(left)?, parse(right)?))
}

fn load(path: &Path) -> Result<Dataset, DoctorError> {
    debug!("reading {}", path.display());
    let dataset = read_coco_json(path)?;
    info!(
        "loaded {}: {} images, {} categories, {} annotations",
        path.display(),
        dataset.images.len(),
        dataset.categories.len(),
        dataset.annotations.len()
    );
    Ok(dataset)
}

fn save(path: &Path, dataset: &Dataset) -> Result<(), DoctorError> {
    write_coco_json(path, dataset)?;
    info!("wrote {}", path.display());
    Ok(())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), DoctorError> {
    let json = serde_json::to_string_pretty(value).map_err(DoctorError::ReportEncode)?;
    println!("{}", json);
    Ok(())
}

/// Image directory for a dataset file: the explicit one, else the file's
/// own directory.
fn image_dir(explicit: Option<&Path>, annotations: &Path) -> PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => annotations
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    }
}

fn run_info(args: InfoArgs) -> Result<(), DoctorError> {
    let dataset = load(&args.input)?;
    let report = inspect::inspect_dataset(&dataset, &inspect::InspectOptions::default());

    match args.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            print!("{}", report);
            Ok(())
        }
    }
}

fn run_show(args: ShowArgs) -> Result<(), DoctorError> {
    let dataset = load(&args.input)?;
    let len = dataset.images.len();
    if len == 0 {
        return Err(DoctorError::InvalidArgument(format!(
            "{} has no images",
            args.input.display()
        )));
    }

    let mut cursor = match args.id {
        Some(id) => inspect::cursor_of(&dataset, ImageId(id))?,
        None => {
            if args.position == 0 || args.position > len {
                return Err(DoctorError::InvalidArgument(format!(
                    "--position must be between 1 and {}",
                    len
                )));
            }
            args.position - 1
        }
    };

    let paths = image_dir(args.images.as_deref(), &args.input);
    let paths = resolve_image_paths(&dataset, &paths);
    let colors = palette::CategoryColors::assign(&dataset);
    let index = Index::build(&dataset)?;

    let mut views = Vec::new();
    for _ in 0..args.count.min(len) {
        views.push(inspect::sample_at(&index, cursor, Some(&paths), Some(&colors))?);
        let step = if args.reverse {
            inspect::prev_cursor(cursor, len)
        } else {
            inspect::next_cursor(cursor, len)
        };
        match step {
            Some(next) => cursor = next,
            None => break,
        }
    }

    match args.output {
        OutputFormat::Json => print_json(&views),
        OutputFormat::Text => {
            for view in &views {
                print!("{}", view);
            }
            Ok(())
        }
    }
}

/// Execute the validate subcommand.
fn run_validate(args: ValidateArgs) -> Result<(), DoctorError> {
    let dataset = load(&args.input)?;

    let opts = validation::ValidateOptions {
        strict: args.strict,
    };
    let report = validation::validate_dataset(&dataset, &opts);

    match args.output {
        OutputFormat::Json => print_json(&serde_json::json!({
            "error_count": report.error_count(),
            "warning_count": report.warning_count(),
            "issues": &report.issues,
        }))?,
        OutputFormat::Text => print!("{}", report),
    }

    let has_errors = report.error_count() > 0;
    let has_warnings = report.warning_count() > 0;

    if has_errors || (args.strict && has_warnings) {
        Err(DoctorError::ValidationFailed {
            error_count: report.error_count(),
            warning_count: report.warning_count(),
            report,
        })
    } else {
        Ok(())
    }
}

fn build_policy(
    args: &MergeArgs,
    target: &Dataset,
    source: &Dataset,
) -> Result<CategoryPolicy, DoctorError> {
    match args.policy {
        PolicyArg::Strict => {
            if !args.maps.is_empty() || !args.skips.is_empty() {
                return Err(DoctorError::InvalidArgument(
                    "--map and --skip require --policy by-name".to_string(),
                ));
            }
            Ok(CategoryPolicy::Strict)
        }
        PolicyArg::ByName => {
            let mut mapping = CategoryMapping::propose(target, source);
            for &(src, dst) in &args.maps {
                mapping.assign(CategoryId(src), CategoryId(dst))?;
            }
            for &src in &args.skips {
                mapping.skip(CategoryId(src))?;
            }
            for entry in mapping.entries() {
                debug!(
                    "category '{}' ({}) -> {}",
                    entry.name,
                    entry.source_id,
                    entry
                        .target_id
                        .map_or_else(|| "skipped".to_string(), |id| id.to_string())
                );
            }
            Ok(CategoryPolicy::Mapped(mapping))
        }
    }
}

fn run_merge(args: MergeArgs) -> Result<(), DoctorError> {
    let dest = if args.dry_run {
        None
    } else {
        Some(args.dest.resolve(&args.target)?)
    };

    let mut target = load(&args.target)?;
    let source = load(&args.source)?;

    let policy = build_policy(&args, &target, &source)?;
    let opts = merge::MergeOptions {
        policy: policy.clone(),
        keep_unannotated_images: args.keep_unannotated_images,
    };

    let mut paths = resolve_image_paths(&target, &image_dir(args.images.as_deref(), &args.target));
    let resolver = BaseDirResolver::new(image_dir(args.source_images.as_deref(), &args.source));

    let report = merge::merge_datasets(&mut target, &mut paths, &source, &resolver, &opts)?;

    if report.annotations_dropped() > 0 {
        warn!(
            "{} source annotation(s) were not imported",
            report.annotations_dropped()
        );
    }
    info!(
        "merged {} images and {} annotations",
        report.images_imported, report.annotations_imported
    );

    match args.output {
        OutputFormat::Json => {
            let mapping = match &policy {
                CategoryPolicy::Mapped(mapping) => Some(mapping.entries()),
                CategoryPolicy::Strict => None,
            };
            print_json(&serde_json::json!({
                "dry_run": args.dry_run,
                "mapping": mapping,
                "report": &report,
            }))?;
        }
        OutputFormat::Text => {
            if let CategoryPolicy::Mapped(mapping) = &policy {
                println!("Category mapping:");
                for entry in mapping.entries() {
                    let to = entry
                        .target_id
                        .map_or_else(|| "(skipped)".to_string(), |id| id.to_string());
                    let how = if entry.matched_by_name { "name match" } else { "new" };
                    println!("  {} ({}) -> {}  [{}]", entry.name, entry.source_id, to, how);
                }
                println!();
            }
            print!("{}", report);
            if args.dry_run {
                println!();
                println!("Dry run: nothing written.");
            }
        }
    }

    if let Some(dest) = dest {
        save(&dest, &target)?;
        if let Some(out_dir) = &args.export {
            export_with_logging(&target, &paths, out_dir)?;
        }
    }
    Ok(())
}

fn run_categories(args: CategoriesArgs) -> Result<(), DoctorError> {
    let mut dataset = load(&args.input)?;

    if !args.renames.is_empty() {
        let renames: BTreeMap<CategoryId, CategoryId> = args
            .renames
            .iter()
            .map(|&(old, new)| (CategoryId(old), CategoryId(new)))
            .collect();
        if renames.len() != args.renames.len() {
            return Err(DoctorError::InvalidArgument(
                "a category is renamed more than once".to_string(),
            ));
        }
        let dest = args.dest.resolve(&args.input)?;
        let report = mutate::rename_categories(&mut dataset, &renames, None)?;
        info!(
            "renamed {} categories, updated {} annotations",
            report.categories_renamed, report.annotations_updated
        );
        save(&dest, &dataset)?;
        return match args.output {
            OutputFormat::Json => print_json(&report),
            OutputFormat::Text => {
                println!(
                    "Renamed {} categories ({} annotations updated)",
                    report.categories_renamed, report.annotations_updated
                );
                Ok(())
            }
        };
    }

    if !args.deletes.is_empty() {
        let ids: BTreeSet<CategoryId> = args.deletes.iter().copied().map(CategoryId).collect();
        let affected = {
            let index = Index::build(&dataset)?;
            ids.iter()
                .filter_map(|id| index.annotations_for_category(*id).ok())
                .map(|anns| anns.len())
                .sum::<usize>()
        };
        if !args.yes {
            return Err(DoctorError::ConfirmationRequired(format!(
                "deleting {} categor{} removes {} annotation(s); rerun with --yes",
                ids.len(),
                if ids.len() == 1 { "y" } else { "ies" },
                affected
            )));
        }
        let dest = args.dest.resolve(&args.input)?;
        let report = mutate::delete_categories(&mut dataset, &ids, None);
        if report.categories_removed < ids.len() {
            warn!(
                "{} of the given category ids did not exist",
                ids.len() - report.categories_removed
            );
        }
        save(&dest, &dataset)?;
        return match args.output {
            OutputFormat::Json => print_json(&report),
            OutputFormat::Text => {
                println!(
                    "Deleted {} categories and {} annotations",
                    report.categories_removed, report.annotations_removed
                );
                Ok(())
            }
        };
    }

    list_categories(&dataset, args.output)
}

#[derive(Serialize)]
struct CategoryRow<'a> {
    id: CategoryId,
    name: &'a str,
    annotations: usize,
    color: Option<palette::Rgb>,
}

fn list_categories(dataset: &Dataset, output: OutputFormat) -> Result<(), DoctorError> {
    let colors = palette::CategoryColors::assign(dataset);
    let report = inspect::inspect_dataset(dataset, &inspect::InspectOptions::default());
    let rows: Vec<CategoryRow<'_>> = report
        .classes
        .iter()
        .map(|class| CategoryRow {
            id: class.id,
            name: &class.name,
            annotations: class.annotations,
            color: colors.get(class.id),
        })
        .collect();

    match output {
        OutputFormat::Json => print_json(&rows),
        OutputFormat::Text => {
            for row in &rows {
                let color = row.color.map(|c| c.to_string()).unwrap_or_default();
                println!(
                    "{:<28} {:>8}  {}",
                    format!("{} ({})", row.name, row.id),
                    row.annotations,
                    color
                );
            }
            Ok(())
        }
    }
}

fn run_delete_image(args: DeleteImageArgs) -> Result<(), DoctorError> {
    let mut dataset = load(&args.input)?;
    let id = ImageId(args.id);

    let (file_name, affected) = {
        let index = Index::build(&dataset)?;
        let image = index.image(id)?;
        (image.file_name.clone(), index.annotations_for_image(id)?.len())
    };
    if !args.yes {
        return Err(DoctorError::ConfirmationRequired(format!(
            "deleting image {} ({}) removes {} annotation(s); rerun with --yes",
            id, file_name, affected
        )));
    }

    let dest = args.dest.resolve(&args.input)?;
    let base_dir = image_dir(args.images.as_deref(), &args.input);
    let mut paths = resolve_image_paths(&dataset, &base_dir);
    let orphaned = paths.get(id).map(Path::to_path_buf);
    let report = mutate::delete_image(&mut dataset, &mut paths, id)?;
    debug!("{} image path(s) still referenced", paths.len());
    save(&dest, &dataset)?;
    println!(
        "Deleted image {} ({}) and {} annotation(s)",
        id, file_name, report.annotations_removed
    );
    if let Some(path) = orphaned {
        println!("Image file left on disk: {}", path.display());
    }
    Ok(())
}

fn run_repair(args: RepairArgs) -> Result<(), DoctorError> {
    let dest = args.dest.resolve(&args.input)?;
    let mut dataset = load(&args.input)?;

    // No flag means both passes.
    let both = !args.iscrowd && !args.segmentation;
    let report = mutate::RepairReport {
        iscrowd_added: if both || args.iscrowd {
            mutate::repair_iscrowd(&mut dataset)
        } else {
            0
        },
        segmentation_added: if both || args.segmentation {
            mutate::repair_segmentation(&mut dataset)
        } else {
            0
        },
    };

    save(&dest, &dataset)?;
    println!(
        "Added iscrowd to {} and segmentation to {} annotation(s)",
        report.iscrowd_added, report.segmentation_added
    );
    Ok(())
}

fn run_export(args: ExportArgs) -> Result<(), DoctorError> {
    let dataset = load(&args.input)?;
    let paths = resolve_image_paths(&dataset, &args.images);
    let report = export_with_logging(&dataset, &paths, &args.out_dir)?;

    match args.output {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            println!("Wrote {}", report.annotations_path.display());
            println!(
                "Copied {} image(s), {} already present",
                report.images_copied, report.images_skipped_existing
            );
            let failed = report.failures.len() + report.images_without_path.len();
            if failed > 0 {
                println!("{} image(s) could not be copied", failed);
            }
            Ok(())
        }
    }
}

fn export_with_logging(
    dataset: &Dataset,
    paths: &ImagePaths,
    out_dir: &Path,
) -> Result<export::ExportReport, DoctorError> {
    debug!("exporting to {}", out_dir.display());
    let report = export::export_dataset(dataset, paths, out_dir)?;
    for failure in &report.failures {
        warn!(
            "could not copy image {} from {}: {}",
            failure.image_id,
            failure.source.display(),
            failure.message
        );
    }
    for id in &report.images_without_path {
        warn!("image {} has no known file path", id);
    }
    info!(
        "exported {} image(s) to {}",
        report.images_copied,
        out_dir.display()
    );
    Ok(report)
}
