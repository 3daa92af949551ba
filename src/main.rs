use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use save_patcher::catalog::{car_name, npc_name, resource_name};
use save_patcher::config::{load_from_path, EditorConfig};
use save_patcher::{
    CarUnlock, GlobalSettingsPatch, Patch, RelationshipLevel, ResourceAmount, SaveDocument,
    SaveEditor, SaveFile, Snapshot, WriteOutcome,
};
use similar::{ChangeTag, TextDiff};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;

#[derive(Parser)]
#[command(name = "save-patcher")]
#[command(about = "Inspect and patch gzip-wrapped loose-JSON game saves", long_about = None)]
#[command(version)]
struct Cli {
    /// Editor config (TOML); defaults apply when omitted
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Save directory, added to the configured ones (repeatable)
    #[arg(short, long = "dir", global = true)]
    dirs: Vec<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List saves grouped by city
    Scan {
        /// Print JSON instead of a tree
        #[arg(long)]
        json: bool,
    },

    /// Show one save's editable fields
    Show {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Patch one save (a backup is taken first)
    Set(SetArgs),

    /// List backups of a save
    Backups {
        path: PathBuf,
        #[arg(long)]
        json: bool,
    },

    /// Overwrite a save with one of its backups
    Restore { path: PathBuf, backup: PathBuf },

    /// Delete a save
    Delete {
        path: PathBuf,
        /// Take a backup before deleting
        #[arg(long)]
        backup: bool,
    },

    /// Survival global settings of a data directory
    Globals {
        #[command(subcommand)]
        command: GlobalsCommand,
    },

    /// Print a line whenever saves in the configured directories change
    Watch,
}

#[derive(Args)]
struct SetArgs {
    path: PathBuf,

    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    money: Option<f64>,
    #[arg(long)]
    research_points: Option<f64>,
    #[arg(long)]
    day: Option<f64>,
    #[arg(long)]
    day_progress: Option<f64>,
    #[arg(long)]
    difficulty: Option<f64>,
    #[arg(long)]
    level: Option<f64>,
    /// Requested map size; never shrinks, clamped to 40..=88
    #[arg(long)]
    map_size: Option<f64>,
    /// Toggle the sandbox flags; ignored for survival saves
    #[arg(long)]
    sandbox: Option<bool>,

    /// Resource amount as ID=AMOUNT (repeatable)
    #[arg(long = "resource", value_parser = parse_resource)]
    resources: Vec<ResourceAmount>,
    /// Relationship level as ID=LEVEL (repeatable)
    #[arg(long = "relationship", value_parser = parse_relationship)]
    relationships: Vec<RelationshipLevel>,
    /// Car unlock as ID=true|false (repeatable)
    #[arg(long = "car", value_parser = parse_car)]
    cars: Vec<CarUnlock>,

    /// JSON patch file; flags override its fields
    #[arg(long)]
    patch: Option<PathBuf>,

    /// Show what would change without writing
    #[arg(short = 'n', long)]
    dry_run: bool,

    /// Show unified diff of the decoded text
    #[arg(long)]
    diff: bool,

    /// Print the write outcome as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum GlobalsCommand {
    /// Show the editable global settings
    Show {
        dir: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Update global settings from a JSON patch
    Set {
        dir: PathBuf,
        /// JSON object with camelCase field names
        #[arg(long)]
        patch: PathBuf,
        /// Fail instead of creating a missing file
        #[arg(long)]
        no_create: bool,
    },
    /// Delete the global settings file (a backup is taken first)
    Delete { dir: PathBuf },
}

fn split_pair(s: &str) -> Result<(i64, &str), String> {
    let (id, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{s}'"))?;
    let id = id
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("invalid id '{id}': {e}"))?;
    Ok((id, value.trim()))
}

fn parse_number(value: &str) -> Result<f64, String> {
    value
        .parse::<f64>()
        .map_err(|e| format!("invalid number '{value}': {e}"))
}

fn parse_resource(s: &str) -> Result<ResourceAmount, String> {
    let (id, value) = split_pair(s)?;
    Ok(ResourceAmount {
        id,
        amount: parse_number(value)?,
    })
}

fn parse_relationship(s: &str) -> Result<RelationshipLevel, String> {
    let (id, value) = split_pair(s)?;
    Ok(RelationshipLevel {
        id,
        level: parse_number(value)?,
    })
}

fn parse_car(s: &str) -> Result<CarUnlock, String> {
    let (id, value) = split_pair(s)?;
    let unlocked = value
        .parse::<bool>()
        .map_err(|e| format!("invalid flag '{value}': {e}"))?;
    Ok(CarUnlock { id, unlocked })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = match cli.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let mut config = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => EditorConfig::default(),
    };
    config.directories.extend(cli.dirs.iter().cloned());
    let editor = SaveEditor::new(config);

    match cli.command {
        Commands::Scan { json } => cmd_scan(&editor, json),
        Commands::Show { path, json } => cmd_show(&editor, &path, json),
        Commands::Set(args) => cmd_set(&editor, args),
        Commands::Backups { path, json } => cmd_backups(&editor, &path, json),
        Commands::Restore { path, backup } => cmd_restore(&editor, &path, &backup),
        Commands::Delete { path, backup } => cmd_delete(&editor, &path, backup),
        Commands::Globals { command } => cmd_globals(&editor, command),
        Commands::Watch => cmd_watch(&editor),
    }
}

/// Helper: Show unified diff between original and patched text
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn save_line(save: &SaveFile) -> String {
    let snap = &save.snapshot;
    let mut badges = Vec::new();
    if snap.is_survival_mode {
        badges.push("survival".red().to_string());
    }
    if snap.sandbox_enabled {
        badges.push("sandbox".cyan().to_string());
    }
    if snap.tolerant {
        badges.push("read-only".yellow().to_string());
    }
    format!(
        "{} [{}] day {} money {} {}",
        save.display_name.bold(),
        save.tag.as_str(),
        snap.day,
        snap.money,
        badges.join(" ")
    )
}

fn cmd_scan(editor: &SaveEditor, json: bool) -> Result<()> {
    if editor.config().directories.is_empty() {
        anyhow::bail!("No save directories given; pass --dir or set `directories` in the config");
    }

    let dirs = editor.config().directories.clone();
    let (saves, issues) = editor.scan_with_issues(&dirs);
    let groups = save_patcher::group_saves(&saves);

    if json {
        println!("{}", serde_json::to_string_pretty(&groups)?);
        return Ok(());
    }

    for group in &groups {
        println!("{} {}", "▸".green(), group.group_id.bold());
        for save in &group.roots {
            println!("  {}", save_line(save));
            println!("    {}", save.path.display().to_string().dimmed());
        }
        for save in &group.children {
            println!("    {} {}", "↳".dimmed(), save_line(save));
        }
    }
    for issue in &issues {
        eprintln!(
            "{} {}: {}",
            "✗".red(),
            issue.path.display(),
            issue.message
        );
    }

    println!();
    println!("{}", "Summary:".bold());
    println!("  {} saves", format!("{}", saves.len()).green());
    println!("  {} groups", format!("{}", groups.len()).cyan());
    println!("  {} unreadable", format!("{}", issues.len()).red());
    Ok(())
}

fn print_snapshot(path: &Path, snap: &Snapshot) {
    println!("{}", path.display().to_string().bold());
    if snap.tolerant {
        println!(
            "  {} {}",
            "read-only (best-effort):".yellow(),
            snap.error.as_deref().unwrap_or("unknown error")
        );
    }
    println!("  FILE_ID:        {}", snap.file_id);
    println!("  name:           {}", snap.name);
    if !snap.is_root() {
        println!("  parent:         {}", snap.parent_city);
    }
    println!("  difficulty:     {}", snap.difficulty);
    println!("  map size:       {}", snap.map_size);
    println!("  day:            {} ({})", snap.day, snap.day_progress);
    println!("  money:          {}", snap.money);
    println!("  research:       {}", snap.research_points);
    println!("  level:          {}", snap.level);
    println!("  survival:       {}", snap.is_survival_mode);
    println!(
        "  sandbox:        {} (unlockAll {}, infiniteMoney {}, maxLevel {})",
        snap.sandbox_enabled, snap.unlock_all, snap.infinite_money, snap.max_level
    );

    if !snap.resources.is_empty() {
        println!("  {}", "resources:".bold());
        for (id, amount) in &snap.resources {
            println!("    {:>3} {:<24} {}", id, resource_name(*id), amount);
        }
    }
    if !snap.relationships.is_empty() {
        println!("  {}", "relationships:".bold());
        for (id, level) in &snap.relationships {
            println!("    {:>3} {:<24} {}", id, npc_name(*id), level);
        }
    }
    if !snap.unlocked_cars.is_empty() {
        println!("  {}", "cars:".bold());
        for (id, unlocked) in &snap.unlocked_cars {
            let mark = if *unlocked { "✓".green() } else { "·".dimmed() };
            println!("    {:>3} {:<24} {}", id, car_name(*id), mark);
        }
    }
}

fn cmd_show(editor: &SaveEditor, path: &Path, json: bool) -> Result<()> {
    let snap = editor.read_snapshot(path);
    if json {
        println!("{}", serde_json::to_string_pretty(&snap)?);
    } else {
        print_snapshot(path, &snap);
    }
    Ok(())
}

fn build_patch(args: &SetArgs) -> Result<Patch> {
    let mut patch = match &args.patch {
        Some(file) => {
            let raw = fs::read_to_string(file)
                .with_context(|| format!("failed to read patch {}", file.display()))?;
            serde_json::from_str::<Patch>(&raw)
                .with_context(|| format!("invalid patch {}", file.display()))?
        }
        None => Patch::default(),
    };

    if args.name.is_some() {
        patch.name = args.name.clone();
    }
    let numbers = [
        (&mut patch.money, args.money),
        (&mut patch.research_points, args.research_points),
        (&mut patch.day, args.day),
        (&mut patch.day_progress, args.day_progress),
        (&mut patch.difficulty, args.difficulty),
        (&mut patch.level, args.level),
        (&mut patch.map_size, args.map_size),
    ];
    for (slot, value) in numbers {
        if value.is_some() {
            *slot = value;
        }
    }
    if args.sandbox.is_some() {
        patch.sandbox = args.sandbox;
    }
    if !args.resources.is_empty() {
        patch.resources = Some(args.resources.clone());
    }
    if !args.relationships.is_empty() {
        patch.relationships = Some(args.relationships.clone());
    }
    if !args.cars.is_empty() {
        patch.unlocked_cars = Some(args.cars.clone());
    }
    Ok(patch)
}

fn report_outcome(path: &Path, outcome: &WriteOutcome) {
    println!("{} Patched {}", "✓".green(), path.display());
    match &outcome.backup_path {
        Some(backup) => println!("  Backup: {}", backup.display()),
        None => println!("  {}", "Backup: none (backup failed)".yellow()),
    }
    if outcome.fallback {
        println!(
            "  {}",
            "File did not parse; patched structurally".yellow()
        );
    }
    if !outcome.skipped.is_empty() {
        println!(
            "  {} {}",
            "Not placed:".yellow(),
            outcome.skipped.join(", ")
        );
    }
}

fn cmd_set(editor: &SaveEditor, args: SetArgs) -> Result<()> {
    let patch = build_patch(&args)?;
    if patch.is_empty() {
        anyhow::bail!("Nothing to change; pass at least one field flag or --patch");
    }

    if args.diff || args.dry_run {
        let doc = SaveDocument::open(&args.path)?;
        let preview = doc.preview(&patch)?;
        if args.diff && doc.text != preview.text {
            display_diff(&args.path, &doc.text, &preview.text);
        }
        if args.dry_run {
            println!(
                "{} {}: Would patch{}",
                "⊙".yellow(),
                args.path.display(),
                if preview.fallback { " (structural)" } else { "" }
            );
            return Ok(());
        }
    }

    let outcome = editor.write_snapshot(&args.path, &patch)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        report_outcome(&args.path, &outcome);
    }
    Ok(())
}

fn cmd_backups(editor: &SaveEditor, path: &Path, json: bool) -> Result<()> {
    let backups = editor.list_backups(path);
    if json {
        println!("{}", serde_json::to_string_pretty(&backups)?);
        return Ok(());
    }
    if backups.is_empty() {
        println!("{}", "No backups found".yellow());
        return Ok(());
    }
    for entry in &backups {
        let when = chrono::DateTime::from_timestamp_millis(entry.modified_ms)
            .map(|t| {
                t.with_timezone(&chrono::Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_default();
        println!(
            "{}  {:>8} B  {}",
            when.dimmed(),
            entry.size,
            entry.path.display()
        );
    }
    Ok(())
}

fn cmd_restore(editor: &SaveEditor, path: &Path, backup: &Path) -> Result<()> {
    editor
        .restore_backup(path, backup)
        .with_context(|| format!("failed to restore {}", path.display()))?;
    println!(
        "{} Restored {} from {}",
        "✓".green(),
        path.display(),
        backup.display()
    );
    Ok(())
}

fn cmd_delete(editor: &SaveEditor, path: &Path, backup: bool) -> Result<()> {
    if backup {
        let backup_path = editor.backup(path)?;
        println!("  Backup: {}", backup_path.display());
    }
    editor.delete_save(path)?;
    println!("{} Deleted {}", "✓".green(), path.display());
    Ok(())
}

fn cmd_globals(editor: &SaveEditor, command: GlobalsCommand) -> Result<()> {
    match command {
        GlobalsCommand::Show { dir, json } => {
            let view = editor.read_global_settings(&dir);
            if json {
                println!("{}", serde_json::to_string_pretty(&view)?);
                return Ok(());
            }
            if !view.exists {
                println!(
                    "{} (not present, showing defaults)",
                    view.path.display().to_string().yellow()
                );
            } else {
                println!("{}", view.path.display().to_string().bold());
            }
            if let Some(error) = &view.error {
                println!("  {} {}", "read-only:".yellow(), error);
            }
            let e = &view.editable;
            println!(
                "  best day        easy {} / hard {} / expert {}",
                e.best_day_reached_easy, e.best_day_reached_hard, e.best_day_reached_expert
            );
            println!(
                "  stars           easy {} / hard {} / expert {}",
                e.highest_stars_reached_easy,
                e.highest_stars_reached_hard,
                e.highest_stars_reached_expert
            );
            println!(
                "  population      easy {} / hard {} / expert {}",
                e.highest_population_reached_easy,
                e.highest_population_reached_hard,
                e.highest_population_reached_expert
            );
            println!("  upgrade points  {}", e.total_upgrade_points);
            for (id, level) in &e.upgrades_spent {
                let name = save_patcher::catalog::upgrade(*id).map_or("?", |u| u.name);
                println!("    {:>2} {:<28} {}", id, name, level);
            }
            Ok(())
        }
        GlobalsCommand::Set {
            dir,
            patch,
            no_create,
        } => {
            let raw = fs::read_to_string(&patch)
                .with_context(|| format!("failed to read patch {}", patch.display()))?;
            let patch: GlobalSettingsPatch = serde_json::from_str(&raw)
                .with_context(|| format!("invalid patch {}", patch.display()))?;
            let outcome = editor.write_global_settings(&dir, &patch, !no_create)?;
            println!("{} Updated global settings in {}", "✓".green(), dir.display());
            if let Some(backup) = outcome.backup_path {
                println!("  Backup: {}", backup.display());
            }
            Ok(())
        }
        GlobalsCommand::Delete { dir } => {
            let outcome = editor.delete_global_settings(&dir)?;
            println!("{} Deleted global settings in {}", "✓".green(), dir.display());
            if let Some(backup) = outcome.backup_path {
                println!("  Backup: {}", backup.display());
            }
            Ok(())
        }
    }
}

fn cmd_watch(editor: &SaveEditor) -> Result<()> {
    if editor.config().directories.is_empty() {
        anyhow::bail!("No save directories given; pass --dir or set `directories` in the config");
    }

    let (tx, rx) = mpsc::channel::<()>();
    let _subscription = editor.on_change(move || {
        let _ = tx.send(());
    });

    let watched = editor.watch();
    if watched == 0 {
        anyhow::bail!("None of the configured directories could be watched");
    }
    println!(
        "{}",
        format!("Watching {} director{}", watched, if watched == 1 { "y" } else { "ies" })
            .dimmed()
    );

    while rx.recv().is_ok() {
        let saves = editor.scan();
        println!(
            "{} {} saves",
            chrono::Local::now().format("%H:%M:%S").to_string().dimmed(),
            saves.len()
        );
    }
    Ok(())
}
