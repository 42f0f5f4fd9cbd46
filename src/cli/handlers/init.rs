use std::fs;
use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io;
use crate::model::config::Settings;

/// Validate the aggregate path: vault-relative, markdown, no `..`.
fn validate_output(path: &str) -> Result<String, String> {
    let invalid = || {
        format!(
            "invalid output path \"{}\": use a path inside the vault (e.g. \"Tasks.md\")",
            path
        )
    };
    if path.trim().starts_with('/') {
        return Err(invalid());
    }
    let normalized = config_io::normalize_vault_path(path).map_err(|_| invalid())?;
    if normalized.is_empty() {
        return Err("output path cannot be empty".to_string());
    }
    if !normalized.ends_with(".md") {
        return Err(format!("output path \"{}\" must end in .md", path));
    }
    Ok(normalized)
}

/// Settings for a fresh vault from the init flags.
fn settings_from_args(args: &InitArgs) -> Result<Settings, String> {
    let mut settings = Settings::default();
    if let Some(ref output) = args.output {
        settings.output_file_path = validate_output(output)?;
    }
    for folder in &args.exclude {
        let folder = config_io::normalize_vault_path(folder).map_err(|e| e.to_string())?;
        if !folder.is_empty() && !settings.exclude_folders.contains(&folder) {
            settings.exclude_folders.push(folder);
        }
    }
    settings.enable_time_groups = !args.flat;
    Ok(settings)
}

pub fn cmd_init(args: InitArgs, vault: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let root = match vault {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir()?,
    };
    let state_dir = config_io::state_dir(&root);
    let config_path = state_dir.join("config.toml");

    if config_path.is_file() && !args.force {
        return Err(format!(
            "vault already initialized at {} (use --force to overwrite)",
            state_dir.display()
        )
        .into());
    }

    // Nested vaults collect each other's notes
    if let Some(parent) = root.parent()
        && let Ok(parent_root) = config_io::discover_vault(parent)
    {
        eprintln!("Note: enclosing vault found at {}/", parent_root.display());
        eprintln!("Its aggregate will also pick up tasks from this folder.");
    }

    let settings = settings_from_args(&args)?;
    fs::create_dir_all(&state_dir)?;
    fs::write(&config_path, config_io::initial_config(&settings))?;

    println!("Initialized gather vault: {}", root.display());
    println!("  aggregate: {}", settings.output_file_path);
    for folder in &settings.exclude_folders {
        println!("  excluded: {}/", folder);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> InitArgs {
        InitArgs {
            output: None,
            exclude: Vec::new(),
            flat: false,
            force: false,
        }
    }

    #[test]
    fn test_validate_output() {
        assert_eq!(validate_output("Tasks.md").unwrap(), "Tasks.md");
        assert_eq!(validate_output("./Inbox/Todo.md").unwrap(), "Inbox/Todo.md");
        assert!(validate_output("").is_err());
        assert!(validate_output("/abs/Tasks.md").is_err());
        assert!(validate_output("../Tasks.md").is_err());
        assert!(validate_output("Tasks.txt").is_err());
        assert_eq!(validate_output("Inbox//Todo.md").unwrap(), "Inbox/Todo.md");
    }

    #[test]
    fn test_settings_from_args() {
        let mut a = args();
        a.output = Some("Todo.md".into());
        a.exclude = vec!["templates/".into(), "templates".into(), "Archive".into()];
        a.flat = true;
        let settings = settings_from_args(&a).unwrap();
        assert_eq!(settings.output_file_path, "Todo.md");
        assert_eq!(settings.exclude_folders, vec!["templates", "Archive"]);
        assert!(!settings.enable_time_groups);
    }

    #[test]
    fn test_rendered_config_parses_back() {
        let mut a = args();
        a.exclude = vec!["templates".into()];
        let settings = settings_from_args(&a).unwrap();
        let parsed = config_io::parse_settings(&config_io::initial_config(&settings)).unwrap();
        assert_eq!(parsed, settings);
    }
}
