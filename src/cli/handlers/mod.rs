mod init;
pub use init::cmd_init;

use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Global override for the vault directory (set by -C flag)
static VAULT_DIR_OVERRIDE: Mutex<Option<PathBuf>> = Mutex::new(None);

use crate::cli::commands::*;
use crate::cli::output::*;
use crate::io::config_io;
use crate::io::lock::FileLock;
use crate::io::store::FsStore;
use crate::ops::order_ops::DropPosition;
use crate::sync::engine::{Engine, PassOutcome};
use crate::sync::watch;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

pub fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let json = cli.json;

    // Store -C override for load_engine()
    if let Some(ref dir) = cli.vault {
        let abs = std::fs::canonicalize(dir)
            .map_err(|e| format!("cannot resolve -C path '{}': {}", dir, e))?;
        set_vault_override(abs);
    }

    match cli.command {
        // Init runs before any vault exists
        Commands::Init(args) => cmd_init(args, vault_override().as_deref()),

        // Passes
        Commands::Refresh => cmd_refresh(json),
        Commands::Sync => cmd_sync(json),
        Commands::Move(args) => cmd_move(args, json),
        Commands::Reorder(args) => cmd_reorder(args, json),

        // Read commands
        Commands::Open => cmd_open(json),
        Commands::List => cmd_list(json),

        // Settings
        Commands::Exclude(cmd) => cmd_exclude(cmd, json),

        Commands::Watch => cmd_watch(),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn set_vault_override(dir: PathBuf) {
    if let Ok(mut slot) = VAULT_DIR_OVERRIDE.lock() {
        slot.replace(dir);
    }
}

fn vault_override() -> Option<PathBuf> {
    VAULT_DIR_OVERRIDE
        .lock()
        .ok()
        .and_then(|slot| slot.as_ref().cloned())
}

fn vault_root() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let start = match vault_override() {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    Ok(config_io::discover_vault(&start)?)
}

fn load_engine() -> Result<Engine<FsStore>, Box<dyn std::error::Error>> {
    let root = vault_root()?;
    Ok(Engine::open(&root)?)
}

fn print_pass(
    engine: &Engine<FsStore>,
    outcome: &PassOutcome,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let aggregate = &engine.settings().output_file_path;
    if json {
        println!("{}", serde_json::to_string_pretty(&pass_to_json(aggregate, outcome))?);
    } else {
        println!("{}", format_pass(aggregate, outcome));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Pass commands
// ---------------------------------------------------------------------------

fn cmd_refresh(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = load_engine()?;
    let outcome = engine.refresh()?;
    print_pass(&engine, &outcome, json)
}

fn cmd_sync(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = load_engine()?;
    let outcome = engine.sync_aggregate()?;
    print_pass(&engine, &outcome, json)
}

fn cmd_move(args: MoveArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = load_engine()?;
    let outcome = engine.move_task(args.line, args.section.into())?;
    print_pass(&engine, &outcome, json)
}

fn cmd_reorder(args: ReorderArgs, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let position = if args.after {
        DropPosition::After
    } else {
        DropPosition::Before
    };
    let mut engine = load_engine()?;
    let outcome = engine.reorder(args.from, args.to, position)?;
    print_pass(&engine, &outcome, json)
}

fn cmd_watch() -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = load_engine()?;
    eprintln!(
        "Watching {} (Ctrl-C to stop)",
        engine.root().join(&engine.settings().output_file_path).display()
    );
    watch::run(&mut engine)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

fn cmd_open(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let mut engine = load_engine()?;
    let rel = engine.ensure_aggregate()?;
    let path = engine.root().join(&rel);

    let editor = std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty());
    match editor {
        Some(editor) if !json => open_in_editor(&editor, &path),
        _ => {
            if json {
                println!("{}", serde_json::json!({ "path": path.display().to_string() }));
            } else {
                println!("{}", path.display());
            }
            Ok(())
        }
    }
}

/// Run `$EDITOR` on `path`; the variable may carry its own arguments.
fn open_in_editor(editor: &str, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let mut parts = editor.split_whitespace();
    let program = parts.next().ok_or("EDITOR is empty")?;
    let status = std::process::Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| format!("could not run editor '{}': {}", program, e))?;
    if !status.success() {
        return Err(format!("editor '{}' exited with {}", program, status).into());
    }
    Ok(())
}

fn cmd_list(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let engine = load_engine()?;
    let items = engine.list_items()?;

    if json {
        let out: Vec<ItemJson> = items.iter().map(item_to_json).collect();
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else if items.is_empty() {
        println!("No open tasks.");
    } else {
        for line in format_items(&items, engine.settings().enable_time_groups) {
            println!("{}", line);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

fn cmd_exclude(cmd: ExcludeCmd, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let root = vault_root()?;
    let state_dir = config_io::state_dir(&root);

    let (changed, settings) = {
        let _lock = FileLock::acquire_default(&state_dir)?;
        let (_, mut doc) = config_io::read_settings(&state_dir)?;
        let changed = match &cmd.action {
            ExcludeAction::Add { folder } => config_io::add_exclude(&mut doc, folder)?,
            ExcludeAction::Remove { folder } => config_io::remove_exclude(&mut doc, folder)?,
        };
        if changed {
            config_io::write_config(&state_dir, &doc)?;
        }
        (changed, config_io::parse_settings(&doc.to_string())?)
    };

    if changed {
        // The lock is released above; refresh takes its own
        Engine::open(&root)?.refresh()?;
    }

    if json {
        let out = ExcludeJson {
            exclude_folders: settings.exclude_folders,
            changed,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        let (verb, folder) = match &cmd.action {
            ExcludeAction::Add { folder } => ("excluded", folder),
            ExcludeAction::Remove { folder } => ("included", folder),
        };
        if changed {
            println!("{} {}", verb, folder.trim_matches('/'));
        } else {
            println!("{} already {}", folder.trim_matches('/'), verb);
        }
    }
    Ok(())
}
