//! Records Taxonomy CLI
//!
//! Navigate taxonomies, provision them into a document store and migrate
//! legacy documents.
//!
//! # Usage
//!
//! ```bash
//! # Check a path against the household taxonomy
//! taxonomy validate HealthManagement/MedicalCare/Consultations
//!
//! # What would an install create?
//! DOCUMENT_STORE_URL=http://localhost:8000 taxonomy install --dry-run
//!
//! # Map legacy documents, then work through the review queue
//! taxonomy migrate --entity household
//! taxonomy review --entity household
//! ```
//!
//! Store-backed commands read `DOCUMENT_STORE_URL` / `DOCUMENT_STORE_TOKEN`.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::Serialize;

use records_taxonomy::migration::MappingMethod;
use records_taxonomy::navigation::PathResolver;
use records_taxonomy::provisioning::ResourceTally;
use records_taxonomy::store::{Document, DocumentStore, ResourceId};
use records_taxonomy::{
    HttpDocumentStore, InstallOptions, TaxonomyConfig, TaxonomySession, UpdateOptions,
};

#[derive(Parser)]
#[command(name = "taxonomy")]
#[command(version)]
#[command(about = "Records taxonomy: navigation, provisioning and legacy migration")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,

    /// Country whose taxonomies are loaded (overrides TAXONOMY_COUNTRY)
    #[arg(long, global = true)]
    country: Option<String>,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tags, document types, storage paths and custom fields
    Install {
        /// Limit to these entity types (repeatable)
        #[arg(long = "entity")]
        entities: Vec<String>,

        #[arg(long)]
        dry_run: bool,

        /// Reinstall entity types already at this taxonomy version
        #[arg(long)]
        force: bool,
    },

    /// Show what an update would change
    Diff {
        #[arg(long = "entity")]
        entities: Vec<String>,
    },

    /// Apply taxonomy changes since the last install
    Update {
        #[arg(long = "entity")]
        entities: Vec<String>,

        #[arg(long)]
        dry_run: bool,

        /// Apply retention rule changes without manual review
        #[arg(long)]
        auto_approve: bool,
    },

    /// Resolve a partial path and list what can come next
    Resolve {
        path: String,

        #[arg(long, default_value = "household")]
        entity: String,
    },

    /// Validate a full path
    Validate {
        path: String,

        #[arg(long, default_value = "household")]
        entity: String,
    },

    /// Keyword search across every level
    Search {
        keyword: String,

        #[arg(long, default_value = "household")]
        entity: String,
    },

    /// Map every legacy document onto the hierarchy
    Migrate {
        #[arg(long)]
        entity: String,
    },

    /// Work through documents awaiting manual review
    Review {
        #[arg(long)]
        entity: String,

        /// Review just this document
        #[arg(long)]
        document: Option<ResourceId>,
    },
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if format == OutputFormat::Json {
                println!("{}", serde_json::json!({ "error": format!("{:#}", e) }));
            } else {
                eprintln!("{}: {:#}", "error".red().bold(), e);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = TaxonomyConfig::from_env();
    if let Some(country) = &cli.country {
        config = config.with_country(country);
    }
    let session = TaxonomySession::open(config)?;
    let format = cli.format;

    match cli.command {
        Commands::Install {
            entities,
            dry_run,
            force,
        } => cmd_install(&session, entities, dry_run, force, format).await,
        Commands::Diff { entities } => cmd_diff(&session, entities, format).await,
        Commands::Update {
            entities,
            dry_run,
            auto_approve,
        } => cmd_update(&session, entities, dry_run, auto_approve, format).await,
        Commands::Resolve { path, entity } => cmd_resolve(&resolver(&session, &entity)?, &path, format),
        Commands::Validate { path, entity } => {
            cmd_validate(&resolver(&session, &entity)?, &path, format)
        }
        Commands::Search { keyword, entity } => {
            cmd_search(&resolver(&session, &entity)?, &keyword, format)
        }
        Commands::Migrate { entity } => cmd_migrate(&session, &entity, format).await,
        Commands::Review { entity, document } => {
            cmd_review(&session, &entity, document, format).await
        }
    }
}

// =============================================================================
// HELPERS
// =============================================================================

fn resolver(session: &TaxonomySession, entity: &str) -> Result<PathResolver> {
    session.resolver(entity).ok_or_else(|| {
        anyhow!(
            "no {} taxonomy for {} (available: {})",
            entity,
            session.country(),
            session.entity_types().join(", ")
        )
    })
}

fn document_store() -> Result<Arc<dyn DocumentStore>> {
    let store = HttpDocumentStore::from_env().context("document store is not configured")?;
    Ok(Arc::new(store))
}

fn entity_filter(entities: Vec<String>) -> Option<Vec<String>> {
    if entities.is_empty() {
        None
    } else {
        Some(entities)
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_tally(label: &str, tally: &ResourceTally) {
    println!(
        "  {:<10} {} tag(s), {} document type(s), {} storage path(s), {} custom field(s)",
        label,
        tally.tag_count(),
        tally.document_type_count(),
        tally.storage_path_count(),
        tally.custom_field_count()
    );
}

fn print_names(label: &str, names: &[String]) {
    if !names.is_empty() {
        println!("  {}: {}", label.bold(), names.join(", "));
    }
}

// =============================================================================
// PROVISIONING
// =============================================================================

async fn cmd_install(
    session: &TaxonomySession,
    entities: Vec<String>,
    dry_run: bool,
    force: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut options = InstallOptions::new()
        .with_dry_run(dry_run)
        .with_force(force);
    options.entity_types = entity_filter(entities);

    let result = session.installer(document_store()?).install(options).await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    let heading = if result.dry_run {
        "Dry run".yellow()
    } else {
        "Installed".green()
    };
    println!(
        "{} {} for {}",
        heading,
        result.entity_types.join(", "),
        result.country
    );
    print_tally("created", &result.installed);
    print_tally("skipped", &result.skipped);
    if !result.already_installed.is_empty() {
        println!(
            "  {} {} (use --force to reinstall)",
            "already installed:".dimmed(),
            result.already_installed.join(", ")
        );
    }
    Ok(())
}

async fn cmd_diff(
    session: &TaxonomySession,
    entities: Vec<String>,
    format: OutputFormat,
) -> Result<()> {
    let mut options = UpdateOptions::new();
    options.entity_types = entity_filter(entities);

    let diff = session
        .updater(document_store()?)
        .detect_changes(&options)
        .await?;

    if format == OutputFormat::Json {
        return print_json(&diff);
    }

    if !diff.has_changes {
        println!("{} taxonomy is up to date", "OK".green());
        return Ok(());
    }
    println!("{} for {}", "Changes".yellow(), diff.entity_types.join(", "));
    print_names("tags", &diff.new_tags);
    print_names("document types", &diff.new_document_types);
    print_names("storage paths", &diff.new_storage_paths);
    print_names("custom fields", &diff.new_custom_fields);
    for change in &diff.retention_changes {
        println!(
            "  {} {} [{}] {:?}",
            "retention".bold(),
            change.path,
            change.country,
            change.kind()
        );
    }
    Ok(())
}

async fn cmd_update(
    session: &TaxonomySession,
    entities: Vec<String>,
    dry_run: bool,
    auto_approve: bool,
    format: OutputFormat,
) -> Result<()> {
    let mut options = UpdateOptions::new()
        .with_dry_run(dry_run)
        .with_auto_approve(auto_approve);
    options.entity_types = entity_filter(entities);

    let result = session.updater(document_store()?).update(options).await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    if result.requires_manual_review {
        println!(
            "{} {} retention change(s) need review; rerun with --auto-approve to apply",
            "HALTED".yellow().bold(),
            result.retention_changes.len()
        );
        return Ok(());
    }
    let heading = if result.dry_run {
        "Dry run".yellow()
    } else {
        "Updated".green()
    };
    println!("{} {}", heading, result.entity_types.join(", "));
    print_tally("created", &result.installed);
    Ok(())
}

// =============================================================================
// NAVIGATION
// =============================================================================

fn cmd_resolve(resolver: &PathResolver, path: &str, format: OutputFormat) -> Result<()> {
    let resolution = resolver.resolve_path(path);

    if format == OutputFormat::Json {
        return print_json(&resolution);
    }

    if !resolution.matched.is_empty() {
        println!("{} {}", "matched".green(), resolution.matched.join("/"));
    }
    let label = if resolution.fuzzy {
        "did you mean"
    } else {
        "next"
    };
    println!("{} ({} level(s) left):", label.bold(), resolution.remaining);
    for suggestion in &resolution.suggestions {
        println!("  {}", suggestion);
    }
    Ok(())
}

fn cmd_validate(resolver: &PathResolver, path: &str, format: OutputFormat) -> Result<()> {
    let validation = resolver.validate(path);

    if format == OutputFormat::Json {
        print_json(&validation)?;
    } else if validation.valid {
        println!("{} {}", "VALID".green(), path);
        if let Some(resolved) = &validation.resolved {
            print_names("document types", &resolved.document_types);
            for (country, rule) in &resolved.retention {
                let period = match rule.years {
                    Some(0) => "permanent".to_string(),
                    Some(years) => format!("{} year(s)", years),
                    None => "no period".to_string(),
                };
                println!(
                    "  {} [{}] {}, {}",
                    "retention".bold(),
                    country,
                    period,
                    rule.authority
                );
            }
        }
    } else {
        println!(
            "{} {}",
            "INVALID".red(),
            validation.error.as_deref().unwrap_or_default()
        );
        if let Some(suggestion) = &validation.suggestion {
            println!("  did you mean {}?", suggestion.cyan());
        }
    }

    if validation.valid {
        Ok(())
    } else {
        Err(anyhow!("invalid path: {}", path))
    }
}

fn cmd_search(resolver: &PathResolver, keyword: &str, format: OutputFormat) -> Result<()> {
    let hits = resolver.search_by_keyword(keyword);

    if format == OutputFormat::Json {
        return print_json(&hits);
    }

    if hits.is_empty() {
        println!("No matches for '{}'", keyword);
    }
    for hit in &hits {
        println!("{:>3}  {}  ({})", hit.relevance, hit.path, hit.matched.dimmed());
    }
    Ok(())
}

// =============================================================================
// MIGRATION
// =============================================================================

async fn cmd_migrate(session: &TaxonomySession, entity: &str, format: OutputFormat) -> Result<()> {
    let mut mapper = session.migrator(document_store()?);
    mapper.load_mapping_table(entity)?;
    let result = mapper.migrate_all_documents().await?;

    if format == OutputFormat::Json {
        return print_json(&result);
    }

    println!("{} run {}", "Migrated".green(), result.run_id);
    println!("  documents      {}", result.total);
    println!("  automatic      {}", result.auto_mapped);
    println!("  manual review  {}", result.manual_review.to_string().yellow());
    println!("  failed         {}", result.failed.to_string().red());
    Ok(())
}

/// Numbered alternatives on stdout, choice read from stdin; blank skips
fn choose_interactively(document: &Document, alternatives: &[String]) -> Option<String> {
    println!(
        "\n{} #{} {} ({})",
        "Document".bold(),
        document.id,
        document.title,
        document.document_type.as_deref().unwrap_or("untyped")
    );
    for (i, alternative) in alternatives.iter().enumerate() {
        println!("  [{}] {}", i + 1, alternative);
    }
    print!("Choose 1-{} or a full path (blank to skip): ", alternatives.len());
    io::stdout().flush().ok()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line).ok()?;
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match line.parse::<usize>() {
        Ok(n) if (1..=alternatives.len()).contains(&n) => Some(alternatives[n - 1].clone()),
        Ok(_) => None,
        Err(_) => Some(line.to_string()),
    }
}

async fn cmd_review(
    session: &TaxonomySession,
    entity: &str,
    document: Option<ResourceId>,
    format: OutputFormat,
) -> Result<()> {
    let mut mapper = session.migrator(document_store()?);
    mapper.load_mapping_table(entity)?;

    let ids: Vec<ResourceId> = match document {
        Some(id) => vec![id],
        None => mapper
            .get_documents_for_manual_review()
            .await?
            .into_iter()
            .map(|item| item.document.id)
            .collect(),
    };

    if ids.is_empty() {
        println!("Nothing awaiting review");
        return Ok(());
    }

    let mut entries = Vec::new();
    for id in ids {
        let entry = mapper.prompt_manual_review(id, choose_interactively).await?;
        if format == OutputFormat::Pretty {
            match (entry.method, &entry.new_path) {
                (MappingMethod::Manual, Some(path)) => println!("  {} {}", "→".green(), path),
                _ => println!("  {}", "skipped".dimmed()),
            }
        }
        entries.push(entry);
    }

    if format == OutputFormat::Json {
        print_json(&entries)?;
    }
    Ok(())
}
