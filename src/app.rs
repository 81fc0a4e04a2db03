//! Application orchestrator.
//! Loads/merges config, initializes logging, installs the signal handler, validates roots,
//! builds the local stores, and dispatches the subcommand.

use anyhow::{Context, Result, bail};
use bytes::Bytes;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, error};

use datum::cli::{Args, Command};
use datum::config::{CONFIG_ENV, LoadResult, load_or_init};
use datum::output as out;
use datum::store::fs::{FsBlobStore, FsMetadataStore};
use datum::store::memory::StaticDirectory;
use datum::{
    Config, DatumError, DocumentRelocator, FileRecord, FileService, IntentJournal, LogLevel,
    ReconcileOutcome, RelocateOptions, RelocationPlan, UploadRequest, default_config_path,
    reconcile, relocate_many, shutdown,
};

use crate::logging::init_tracing;

/// Run the CLI application.
pub async fn run(args: Args) -> Result<()> {
    // Handle --print-config before logging init
    if args.print_config {
        print_config_location();
        return Ok(());
    }

    // Create template config if none exists (before logging init)
    let mut cfg = match load_or_init()? {
        LoadResult::Loaded(cfg, path) => {
            debug!(config = %path.display(), "loaded config");
            *cfg
        }
        LoadResult::CreatedTemplate(path) => {
            out::print_success(&format!(
                "A template datum config was written to: {}",
                path.display()
            ));
            out::print_info("Edit `tenant`, the store roots and the <departments> list, then re-run this command.");
            out::print_info(&format!("To use a different location set {CONFIG_ENV}."));
            return Ok(());
        }
        LoadResult::Unavailable => Config::default(),
    };
    args.apply_overrides(&mut cfg);

    let Some(command) = args.command.clone() else {
        return Ok(());
    };

    // Initialize logging and capture the guard so we can drop it on signal
    let guard_opt = init_tracing(cfg.log_level, cfg.log_file.as_deref(), args.json).map_err(|e| {
        out::print_error(&format!("Failed to initialize logging: {e}"));
        e
    })?;

    // Guard needs to be dropped on SIGINT to flush logs
    let guard_slot = Arc::new(Mutex::new(guard_opt));
    {
        let guard_slot = Arc::clone(&guard_slot);
        ctrlc::set_handler(move || {
            shutdown::request();
            out::print_warn("Received interrupt; finishing the current file and stopping...");
            if let Ok(mut g) = guard_slot.lock() {
                let _ = g.take();
            }
        })
        .context("install signal handler")?;
    }

    debug!(?args, "starting datum");

    let result = match cfg.validate() {
        Ok(()) => dispatch(&cfg, command).await,
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        match e.downcast_ref::<DatumError>() {
            Some(de) => error!(code = de.code(), kind = de.kind(), error = %de, "Command failed"),
            None => error!(error = ?e, "Command failed"),
        }
    }

    // Ensure logs are flushed before exit
    if let Ok(mut g) = guard_slot.lock() {
        let _ = g.take();
    }

    result
}

fn print_config_location() {
    if let Ok(cfg_env) = std::env::var(CONFIG_ENV)
        && !cfg_env.is_empty()
    {
        out::print_info(&format!("Using {CONFIG_ENV} (explicit):\n  {cfg_env}\n"));
        out::print_info(&format!("To override, unset {CONFIG_ENV} or set it to another file."));
        return;
    }
    match default_config_path() {
        Some(p) => {
            out::print_info(&format!("Default datum config path:\n  {}\n", p.display()));
            if p.exists() {
                out::print_info("A config file already exists at that location.");
            } else {
                out::print_info("No config file exists there yet. Run any command to create a template.");
            }
        }
        None => out::print_error("Could not determine a default config path"),
    }
}

/// Stores and services over the local filesystem backend.
struct Services {
    metadata: Arc<FsMetadataStore>,
    blobs: Arc<FsBlobStore>,
    relocator: DocumentRelocator,
    files: FileService,
    journal: Option<IntentJournal>,
}

impl Services {
    fn from_config(cfg: &Config) -> Self {
        let metadata = Arc::new(FsMetadataStore::new(&cfg.metadata_root));
        let blobs = Arc::new(FsBlobStore::new(&cfg.blob_root));
        let mut directory = StaticDirectory::new();
        for (id, name) in &cfg.departments {
            directory.insert(&cfg.tenant, id, name);
        }
        let directory = Arc::new(directory);
        let journal = cfg.journal_dir.as_ref().map(IntentJournal::new);

        let mut relocator = DocumentRelocator::new(metadata.clone(), blobs.clone(), directory.clone());
        if let Some(j) = &journal {
            relocator = relocator.with_journal(j.clone());
        }
        let files = FileService::new(metadata.clone(), blobs.clone(), directory);
        Self {
            metadata,
            blobs,
            relocator,
            files,
            journal,
        }
    }
}

async fn dispatch(cfg: &Config, command: Command) -> Result<()> {
    let svc = Services::from_config(cfg);
    let tenant = cfg.tenant.as_str();
    let verbose = cfg.log_level == LogLevel::Debug;

    match command {
        Command::Relocate {
            from,
            to,
            copy,
            dry_run,
            ids,
        } => {
            let source = from.in_tenant(tenant)?;
            let destination = to.in_tenant(tenant)?;
            let options = if copy {
                RelocateOptions::copy()
            } else {
                RelocateOptions::default()
            };

            if dry_run {
                let mut failed = 0usize;
                for id in &ids {
                    match svc.relocator.plan(&source, &destination, id, options).await {
                        Ok(plan) => out::print_info(&describe_plan(&plan)),
                        Err(e) => {
                            failed += 1;
                            out::print_error(&format!("{id}: {e}"));
                        }
                    }
                }
                if failed > 0 {
                    bail!("{failed} of {} files cannot be relocated", ids.len());
                }
                return Ok(());
            }

            let report = relocate_many(&svc.relocator, &source, &destination, &ids, options).await;
            let verb = if copy { "Copied" } else { "Moved" };
            if !report.succeeded.is_empty() {
                out::print_success(&format!(
                    "{verb} {} file(s) from {source} to {destination}",
                    report.succeeded.len()
                ));
            }
            if verbose {
                for f in &report.failed {
                    out::print_error(&format!("{} [{}]: {}", f.id, f.code, f.message));
                }
            }
            if report.interrupted {
                out::print_warn(&format!(
                    "Interrupted; {} file(s) were not attempted",
                    report.skipped.len()
                ));
            }
            if !report.all_ok() {
                bail!(
                    "{} of {} files failed",
                    report.failed.len() + report.skipped.len(),
                    report.total()
                );
            }
            Ok(())
        }

        Command::Upload {
            location,
            file,
            name,
            tags,
            by,
            by_name,
        } => {
            let location = location.in_tenant(tenant)?;
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("read '{}'", file.display()))?;
            let name = match name {
                Some(n) => n,
                None => file_name_of(&file)?,
            };
            let uploaded_by = by.unwrap_or_else(current_user);
            let uploaded_by_name = by_name.unwrap_or_else(|| uploaded_by.clone());
            let record = svc
                .files
                .upload(
                    &location,
                    UploadRequest {
                        name,
                        content: Bytes::from(content),
                        uploaded_by,
                        uploaded_by_name,
                        tags,
                    },
                )
                .await?;
            out::print_success(&format!("Uploaded '{}' to {location}", record.name));
            out::print_user(&record.id);
            Ok(())
        }

        Command::Ls { location, search } => {
            let location = location.in_tenant(tenant)?;
            let records = match search.as_deref() {
                Some(q) => svc.files.search(&location, q).await?,
                None => svc.files.list(&location).await?,
            };
            for r in &records {
                out::print_user(&listing_line(r));
            }
            Ok(())
        }

        Command::Tag { location, id, tags } => {
            let location = location.in_tenant(tenant)?;
            let record = svc.files.set_tags(&location, &id, tags).await?;
            out::print_success(&format!("{}: [{}]", record.id, record.tags.join(", ")));
            Ok(())
        }

        Command::Rm { location, ids } => {
            let location = location.in_tenant(tenant)?;
            let mut failed = 0usize;
            for id in &ids {
                if shutdown::is_requested() {
                    bail!(DatumError::Interrupted);
                }
                match svc.files.delete(&location, id).await {
                    Ok(record) => out::print_success(&format!("Deleted '{}' ({})", record.name, record.id)),
                    Err(e) => {
                        failed += 1;
                        error!(id = %id, code = e.code(), kind = e.kind(), error = %e, "Delete failed");
                        if verbose {
                            out::print_error(&format!("{id}: {e}"));
                        }
                    }
                }
            }
            if failed > 0 {
                bail!("{failed} of {} files failed", ids.len());
            }
            Ok(())
        }

        Command::Reconcile => {
            let Some(journal) = &svc.journal else {
                bail!("no journal_dir configured; nothing to reconcile");
            };
            let report = reconcile(journal, &*svc.metadata, &*svc.blobs).await?;
            let completed = report.count(|o| *o == ReconcileOutcome::Completed);
            let rolled_back = report.count(|o| *o == ReconcileOutcome::RolledBack);
            out::print_info(&format!(
                "Reconciled {} intent(s): {completed} completed, {rolled_back} rolled back, {} failed",
                report.items.len(),
                report.failed()
            ));
            if report.failed() > 0 {
                bail!("{} intent(s) could not be reconciled", report.failed());
            }
            Ok(())
        }
    }
}

fn describe_plan(plan: &RelocationPlan) -> String {
    let verb = if plan.copy { "copy" } else { "move" };
    match &plan.blob {
        Some(b) => format!(
            "Dry-run: would {verb} '{}' -> '{}' (blob '{}' -> '{}')",
            plan.source, plan.destination, b.from, b.to
        ),
        None => format!(
            "Dry-run: would {verb} '{}' -> '{}' (blob unchanged)",
            plan.source, plan.destination
        ),
    }
}

fn listing_line(r: &FileRecord) -> String {
    if r.tags.is_empty() {
        format!("{}\t{}", r.id, r.name)
    } else {
        format!("{}\t{}\t[{}]", r.id, r.name, r.tags.join(", "))
    }
}

fn file_name_of(path: &Path) -> Result<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .with_context(|| format!("'{}' has no usable file name; pass --name", path.display()))
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string())
}
