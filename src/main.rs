use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use scm_version::changelog;
use scm_version::config::{self, Config, VersionSettings};
use scm_version::domain::BranchKind;
use scm_version::git::{open_repository, Repository};
use scm_version::previous::PreviousVersionIndex;
use scm_version::release::ReleaseManager;
use scm_version::resolver::{Resolution, VersionResolver};
use scm_version::ui;

#[derive(Parser)]
#[command(
    name = "scm-version",
    version,
    about = "Calculate project versions from git branches and tags"
)]
struct Args {
    #[arg(short, long, global = true, help = "Custom configuration file path")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        global = true,
        default_value = ".",
        help = "Working copy to inspect"
    )]
    path: PathBuf,

    #[arg(short, long, global = true, help = "Show resolution details and debug logs")]
    verbose: bool,

    #[arg(long, global = true, help = "Preview what would happen without making changes")]
    dry_run: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print the version of the working copy
    Show,
    /// Print the previous release version
    Previous,
    /// Write the change log since the previous release
    Changelog {
        #[arg(long, help = "Release to start from instead of the previous one")]
        previous_version: Option<String>,

        #[arg(short, long, help = "Output file")]
        output: Option<PathBuf>,
    },
    /// Create the release tag for the current version
    Tag {
        #[arg(long, help = "Revision to tag instead of HEAD")]
        rev: Option<String>,

        #[arg(short, long, help = "Skip confirmation prompts")]
        force: bool,
    },
    /// Create a stabilization or feature branch for the current version
    Branch {
        #[arg(long, help = "Create a feature branch with this name")]
        feature: Option<String>,
    },
    /// Move the working copy to a released or branched version
    ToVersion {
        version: String,

        #[arg(long, help = "Branch type to search when no tag exists")]
        branch_type: Option<String>,

        #[arg(long, help = "Feature name of the target version")]
        feature: Option<String>,
    },
    /// Tag the current version and move the working copy to the tag
    Release {
        #[arg(short, long, help = "Skip confirmation prompts")]
        force: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut config = config::load_config(args.config.as_deref(), &args.path)
        .context("Error loading config")?;
    config.apply_env_overrides();
    let settings = config.settings().context("Invalid version configuration")?;

    let repo = open_repository(&args.path, &config.credentials);

    match args.command.unwrap_or(Command::Show) {
        Command::Show => show(repo.as_ref(), &config, &settings, args.verbose),
        Command::Previous => previous(repo.as_ref(), &config, &settings),
        Command::Changelog {
            previous_version,
            output,
        } => write_changelog(
            repo.as_ref(),
            &config,
            &settings,
            previous_version,
            output,
            &args.path,
        ),
        Command::Tag { rev, force } => {
            let resolution = resolve(repo.as_ref(), &config, &settings);
            let manager = ReleaseManager::new(repo.as_ref(), &config.naming, &settings, args.dry_run);
            let prompt = format!("Create tag for version {}?", resolution.pre_version);
            if !force && !args.dry_run && !ui::confirm_action(&prompt)? {
                println!("Tag creation cancelled by user.");
                return Ok(());
            }
            let name = manager.create_tag(&resolution, rev.as_deref())?;
            report(&manager, &format!("Tag created: {}", name));
            Ok(())
        }
        Command::Branch { feature } => {
            let resolution = resolve(repo.as_ref(), &config, &settings);
            let manager = ReleaseManager::new(repo.as_ref(), &config.naming, &settings, args.dry_run);
            let name = manager.create_branch(&resolution, feature.as_deref())?;
            report(&manager, &format!("Branch created: {}", name));
            Ok(())
        }
        Command::ToVersion {
            version,
            branch_type,
            feature,
        } => {
            let kind = match branch_type.as_deref() {
                Some(kind) => kind.parse::<BranchKind>()?,
                None if feature.is_some() => BranchKind::Feature,
                None => BranchKind::Stabilization,
            };
            let manager = ReleaseManager::new(repo.as_ref(), &config.naming, &settings, args.dry_run);
            let commit = manager
                .move_to(&version, kind, feature.as_deref())
                .context("It was not possible to switch the working copy to the specified version")?;
            report(
                &manager,
                &format!("Working copy switched to {} ({})", version, commit),
            );
            Ok(())
        }
        Command::Release { force } => {
            let resolution = resolve(repo.as_ref(), &config, &settings);
            let manager = ReleaseManager::new(repo.as_ref(), &config.naming, &settings, args.dry_run);
            let prompt = format!("Release version {}?", resolution.pre_version);
            if !force && !args.dry_run && !ui::confirm_action(&prompt)? {
                println!("Release cancelled by user.");
                return Ok(());
            }
            let version = manager.prepare_release(&resolution)?;
            if manager.is_dry_run() {
                ui::display_banner("DryRun", "No changes on working copy.");
            } else {
                ui::display_banner("Project version", &version);
            }
            Ok(())
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve(repo: &dyn Repository, config: &Config, settings: &VersionSettings) -> Resolution {
    let resolution = VersionResolver::new(repo, &config.naming, settings).resolve();
    for warning in &resolution.warnings {
        ui::display_warning(warning);
    }
    resolution
}

fn report(manager: &ReleaseManager<'_>, message: &str) {
    if manager.is_dry_run() {
        ui::display_status(&format!("DryRun: {}", message));
    } else {
        ui::display_success(message);
    }
}

fn show(
    repo: &dyn Repository,
    config: &Config,
    settings: &VersionSettings,
    verbose: bool,
) -> Result<()> {
    let resolution = resolve(repo, config, settings);
    if verbose {
        ui::display_resolution(&resolution);
    }
    println!("{}", resolution.version);
    Ok(())
}

fn previous(repo: &dyn Repository, config: &Config, settings: &VersionSettings) -> Result<()> {
    let resolution = resolve(repo, config, settings);
    let index = PreviousVersionIndex::build(
        repo,
        &config.naming,
        &resolution.pre_version,
        settings.use_build_extension,
    )?;
    let tag = index.previous_version_tag(config.changelog.previous_version.as_deref())?;
    println!("{}", tag.version);
    Ok(())
}

fn write_changelog(
    repo: &dyn Repository,
    config: &Config,
    settings: &VersionSettings,
    previous_version: Option<String>,
    output: Option<PathBuf>,
    project_dir: &Path,
) -> Result<()> {
    let resolution = resolve(repo, config, settings);
    let requested = previous_version.or_else(|| config.changelog.previous_version.clone());

    let record = changelog::change_record(
        repo,
        &config.naming,
        &resolution.pre_version,
        settings.use_build_extension,
        requested.as_deref(),
    )?;

    let file = output.unwrap_or_else(|| project_dir.join(&config.changelog.file));
    record.write_to(&file)?;
    ui::display_success(&format!("Change log written to {}", file.display()));
    Ok(())
}
