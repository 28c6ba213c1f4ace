//! CLI command implementations.

use crate::agents::{find_rules_dir, AgentRegistry};
use crate::cancel::install_interrupt_handler;
use crate::cli::AgentCommand;
use crate::config::{load_config, save_config, Config};
use crate::context::{load_agent, load_agent_with_store, ContextStore};
use crate::git::GitCli;
use crate::import::{import_rules, ImportOptions};
use crate::models::{AgentDefinition, CursorRule};
use crate::paths::AppPaths;
use crate::storage::{AutoRename, ConflictResolver, PromptResolver};
use crate::sync::{print_copy_summary, AgentInitializer};
use crate::{Result, VibeError};
use anstream::println;
use itertools::Itertools;
use owo_colors::OwoColorize;
use std::path::PathBuf;
use tracing::{info, warn};

/// Overrides the detected terminal width for listings
pub const COLUMNS_ENV: &str = "COLUMNS";
const DEFAULT_WIDTH: usize = 80;
/// Agents shown after `init` before "...and more"
const INIT_PREVIEW: usize = 3;

/// Everything a command needs: configuration, platform paths and the working directory
#[derive(Debug, Clone)]
pub struct Session {
    pub config: Config,
    pub paths: AppPaths,
    pub cwd: PathBuf,
}

impl Session {
    /// Load `config.json` from `paths` and capture the working directory
    pub fn load(paths: AppPaths) -> Result<Self> {
        let config = load_config(paths.config_file())?;
        let cwd = std::env::current_dir()
            .map_err(|e| VibeError::operation("resolve", "current directory", e))?;
        Ok(Self { config, paths, cwd })
    }

    pub fn new(config: Config, paths: AppPaths, cwd: PathBuf) -> Self {
        Self { config, paths, cwd }
    }

    fn initializer(&self) -> Result<AgentInitializer> {
        AgentInitializer::new(self.config.clone(), &self.paths, Box::new(GitCli))
    }

    /// Remember `id` for next time; failing to save is only a warning
    fn remember_agent(&mut self, id: &str) {
        self.config.last_selected_agent = id.to_string();
        match save_config(self.paths.config_file(), &self.config) {
            Ok(()) => info!(agent = id, "saved last selected agent"),
            Err(e) => warn!(error = %e, "failed to save last selected agent"),
        }
    }

    /// Registry over the first rules directory that has definitions, if any
    fn agent_registry(&self) -> Result<Option<AgentRegistry>> {
        let Some(dir) = find_rules_dir(
            &self.cwd,
            &self.paths.rules_dir(&self.config),
            &self.config.rules_dir_name,
            &self.config.agents_dir_name,
        ) else {
            return Ok(None);
        };

        let mut registry = AgentRegistry::new(dir, self.config.dir_permission);
        registry.scan()?;
        Ok(Some(registry))
    }
}

pub fn run_init(session: &Session) -> Result<()> {
    let initializer = session.initializer()?;
    let report = initializer.init_in(&session.cwd)?;

    if report.setup_ran {
        println!(
            "✓ Populated {} from the default repository",
            initializer.agent_path().display().cyan()
        );
    }
    print_copy_summary(&report.copied);
    println!(
        "\n{} Initialized agent definitions in {}",
        "✓".green(),
        session.cwd.display()
    );

    if let Some(registry) = session.agent_registry()? {
        let agents = registry.list_agents();
        if !agents.is_empty() {
            println!("\nAvailable agents ({}):", agents.len());
            for agent in agents.iter().take(INIT_PREVIEW) {
                println!("  • {} (@{}.mdc)", agent.name.cyan(), agent.id);
            }
            if agents.len() > INIT_PREVIEW {
                println!("  • {}", "...and more".yellow());
            }
        }
    }

    println!("\nNext steps:");
    println!("  1. Run {} to see available agents", "vibe agent list".green());
    println!(
        "  2. Reference an agent with {} in your chat",
        "@agent-name.mdc".green()
    );
    println!(
        "  3. Run {} for details about one agent",
        "vibe agent info <agent-id>".green()
    );
    Ok(())
}

pub fn run_merge(session: &Session) -> Result<()> {
    let report = session.initializer()?.merge_from(&session.cwd)?;
    report.print_summary();
    println!(
        "\n{} Merged: {} project(s) updated, {} failed",
        "✓".green(),
        report.succeeded.len(),
        report.failed.len()
    );
    Ok(())
}

pub fn run_sync(session: &Session) -> Result<()> {
    let report = session.initializer()?.sync_into(&session.cwd)?;
    print_copy_summary(&report);
    Ok(())
}

pub fn run_clean(session: &Session) -> Result<()> {
    let removed = session.initializer()?.clean_projects()?;
    if removed == 0 {
        println!("✓ All registered projects still exist");
    } else {
        println!("✓ Removed {removed} missing project(s) from the registry");
    }
    Ok(())
}

pub fn run_import(session: &Session, source: &str, force: bool, yes: bool) -> Result<()> {
    let opts = ImportOptions {
        force,
        cancel: install_interrupt_handler(),
        project: Some(session.cwd.clone()),
        ..ImportOptions::default()
    };

    let mut prompt = PromptResolver;
    let mut rename = AutoRename;
    let resolver: &mut dyn ConflictResolver = if yes { &mut rename } else { &mut prompt };

    println!("Importing rules from {}...", source.cyan());
    let report = import_rules(
        source,
        &session.config,
        &session.paths,
        &opts,
        |rules| confirm_import(rules, yes),
        resolver,
    )?;

    println!(
        "\n{} Imported {} rule(s) into {}",
        "✓".green(),
        report.stored.saved.len(),
        session.paths.rules_dir(&session.config).display()
    );
    if !report.stored.skipped.is_empty() {
        println!("→ Skipped: {}", report.stored.skipped.iter().format(", "));
    }
    if let Some(project) = &report.project_stored {
        println!("✓ Also stored {} rule(s) in this project", project.saved.len());
    }
    Ok(())
}

fn confirm_import(rules: &[CursorRule], yes: bool) -> bool {
    println!("\nFound {} rule(s) to import:", rules.len());
    for (i, rule) in rules.iter().enumerate() {
        println!("  {}. {} - {}", i + 1, rule.name().bold(), rule.metadata.description);
    }
    println!();

    if yes {
        return true;
    }
    dialoguer::Confirm::new()
        .with_prompt("Do you want to import these rules?")
        .default(false)
        .interact()
        .unwrap_or(false)
}

pub fn run_agent(session: &mut Session, command: Option<AgentCommand>) -> Result<()> {
    let Some(registry) = session.agent_registry()? else {
        println!("{}", "No local or system agent definitions found.".yellow());
        println!(
            "Run {} to initialize the agent system in this directory.",
            "vibe init".green()
        );
        return Ok(());
    };

    match command.unwrap_or(AgentCommand::List) {
        AgentCommand::List => {
            print_agent_list(&registry, &session.config.last_selected_agent);
            Ok(())
        }
        AgentCommand::Select { agent } => select_agent(session, &registry, agent.as_deref()),
        AgentCommand::Info { agent } => {
            let definition = registry.find_agent(&agent)?;
            print_agent_info(definition);
            Ok(())
        }
        AgentCommand::Run { agent } => run_agent_once(session, &registry, &agent),
    }
}

fn select_agent(session: &mut Session, registry: &AgentRegistry, query: Option<&str>) -> Result<()> {
    if registry.is_empty() {
        println!("{}", "No agents available to select.".yellow());
        return Ok(());
    }

    let cancel = install_interrupt_handler();
    let id = match query {
        Some(query) => registry.find_agent(query)?.id.clone(),
        None => {
            let agents = registry.list_agents();
            let labels: Vec<String> = agents
                .iter()
                .map(|a| format!("{} ({})", a.name, a.id))
                .collect();
            let choice = dialoguer::Select::new()
                .with_prompt("Select an agent")
                .items(&labels)
                .default(0)
                .interact_opt()
                .map_err(|e| {
                    VibeError::operation("agent selection", "terminal", VibeError::Other(e.to_string()))
                })?;
            let Some(index) = choice else {
                return Err(VibeError::Cancelled {
                    op: "agent selection".to_string(),
                });
            };
            agents[index].id.clone()
        }
    };

    let agent = load_agent(registry, &id, &cancel)?;
    session.remember_agent(&agent.definition.id);

    println!(
        "\n{} Agent '{}' selected and loaded",
        "✓".green(),
        agent.definition.name
    );
    print_agent_info(&agent.definition);
    Ok(())
}

fn run_agent_once(session: &mut Session, registry: &AgentRegistry, query: &str) -> Result<()> {
    let id = registry.find_agent(query)?.id.clone();
    let store = ContextStore::new(
        session.paths.context_dir(),
        session.config.dir_permission,
        session.config.file_permission,
    );

    let mut agent = load_agent_with_store(registry, &store, &id, &install_interrupt_handler())?;
    agent.context.record_execution();
    store.save(&agent.context)?;
    session.remember_agent(&id);

    println!(
        "{} Ran agent '{}' ({} run(s) so far)",
        "✓".green(),
        agent.definition.name,
        agent.context.execution_count
    );
    Ok(())
}

fn print_agent_list(registry: &AgentRegistry, selected: &str) {
    let agents = registry.list_agents();
    if agents.is_empty() {
        println!("{}", "No agents found.".yellow());
        return;
    }

    let width = terminal_width();
    println!("\nAvailable Agents ({})\n", agents.len());
    for (i, agent) in agents.iter().enumerate() {
        println!("{}", agent_line(i + 1, agent, agent.id == selected, width));
    }

    println!("\nTo select an agent, use: {}", "vibe agent select".green());
    println!(
        "To get more info about an agent, use: {}",
        "vibe agent info <agent-id>".green()
    );
}

/// One listing row: marker, index, name, ID, and as much description as fits
fn agent_line(index: usize, agent: &AgentDefinition, selected: bool, width: usize) -> String {
    let marker = if selected { "→" } else { " " };
    let head = format!("{marker} {index:>2}. {} [{}]", agent.name, agent.id);

    let used = head.chars().count();
    if agent.description.is_empty() || used + 5 >= width {
        return head;
    }
    let description = truncate(&agent.description, width - used - 3);
    format!("{head} - {}", description.dimmed())
}

fn print_agent_info(agent: &AgentDefinition) {
    println!("\n{}", agent.name.bold());
    println!("  ID:          {}", agent.id.cyan());
    if !agent.description.is_empty() {
        println!("  Description: {}", agent.description);
    }
    println!("  Version:     {}", agent.version);
    println!("  Type:        {}", agent.agent_type);
    if !agent.templates.is_empty() {
        println!("  Templates:   {}", agent.templates.iter().format(", "));
    }
    if let Some(path) = &agent.definition_path {
        println!("  File:        {}", path.display());
    }
    println!("  Usage:       @{}.mdc", agent.id);
}

fn terminal_width() -> usize {
    std::env::var(COLUMNS_ENV)
        .ok()
        .and_then(|c| c.trim().parse::<usize>().ok())
        .filter(|w| *w > 0)
        .unwrap_or(DEFAULT_WIDTH)
}

/// Cut `text` to at most `max` characters, ending in `…` when shortened
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(max.saturating_sub(1)).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::unwrap_used)]

    use super::*;
    use chrono::Utc;
    use fs_err as fs;
    use tempfile::TempDir;

    fn definition(id: &str, description: &str) -> AgentDefinition {
        AgentDefinition {
            id: id.to_string(),
            name: "Planner".to_string(),
            description: description.to_string(),
            version: "1.0".to_string(),
            agent_type: "ai".to_string(),
            templates: Vec::new(),
            last_updated: Utc::now(),
            definition_path: None,
        }
    }

    fn session(root: &TempDir) -> Session {
        let cwd = root.path().join("project");
        fs::create_dir_all(&cwd).unwrap();
        Session::new(
            Config::default(),
            AppPaths::rooted(&root.path().join("app")),
            cwd,
        )
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a longer description", 8), "a longe…");
        assert_eq!(truncate("ééééé", 3), "éé…");
    }

    #[test]
    fn test_agent_line() {
        let agent = definition("planner", "Plans the work before anyone writes code");

        let wide = agent_line(1, &agent, true, 120);
        assert!(wide.starts_with("→  1. Planner [planner] - "));
        assert!(wide.contains("Plans the work"));

        let narrow = agent_line(1, &agent, false, 20);
        assert_eq!(narrow, "   1. Planner [planner]");
    }

    #[test]
    fn test_sync_and_clean_commands() {
        let root = TempDir::new().unwrap();
        let session = session(&root);
        let store = session.paths.rules_dir(&session.config);
        fs::create_dir_all(&store).unwrap();
        fs::write(store.join("planner.mdc"), "# Planner\n").unwrap();

        run_sync(&session).unwrap();
        assert!(session.cwd.join(".cursor/rules/planner.mdc").is_file());

        run_clean(&session).unwrap();
    }

    #[test]
    fn test_agent_run_records_context() {
        let root = TempDir::new().unwrap();
        let mut session = session(&root);
        let rules = session.cwd.join(".cursor/rules");
        fs::create_dir_all(&rules).unwrap();
        fs::write(rules.join("planner.mdc"), "# Planner\n").unwrap();

        run_agent(
            &mut session,
            Some(AgentCommand::Run {
                agent: "planner".to_string(),
            }),
        )
        .unwrap();

        assert_eq!(session.config.last_selected_agent, "planner");
        let saved = load_config(session.paths.config_file()).unwrap();
        assert_eq!(saved.last_selected_agent, "planner");

        let store = ContextStore::new(session.paths.context_dir(), 0o755, 0o644);
        assert_eq!(store.load("planner").unwrap().unwrap().execution_count, 1);
    }

    #[test]
    fn test_agent_info_unknown() {
        let root = TempDir::new().unwrap();
        let mut session = session(&root);
        let rules = session.cwd.join(".cursor/rules");
        fs::create_dir_all(&rules).unwrap();
        fs::write(rules.join("planner.mdc"), "# Planner\n").unwrap();

        let err = run_agent(
            &mut session,
            Some(AgentCommand::Info {
                agent: "plannr".to_string(),
            }),
        )
        .unwrap_err();
        assert!(matches!(err, VibeError::AgentNotFound { .. }));
    }

    #[test]
    fn test_agent_without_definitions() {
        let root = TempDir::new().unwrap();
        let mut session = session(&root);
        run_agent(&mut session, None).unwrap();
    }
}
