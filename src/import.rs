//! Fetch, parse, confirm and store rules from a file or URL

use crate::cancel::Cancellation;
use crate::config::Config;
use crate::models::CursorRule;
use crate::paths::AppPaths;
use crate::source::{CompositeRuleParser, ParserConfig, RuleSource};
use crate::storage::{store_rules_to_path, ConflictResolver, StoreReport};
use crate::{Result, VibeError};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Overwrite existing rule files without asking the resolver
    pub force: bool,
    pub parser: ParserConfig,
    pub cancel: Cancellation,
    /// Project to store into as well; the working directory when `None`
    pub project: Option<PathBuf>,
}

#[derive(Debug)]
pub struct ImportReport {
    pub rules: Vec<CursorRule>,
    /// Files written to the canonical store
    pub stored: StoreReport,
    /// Files written to the project, when it has a rules directory and storing worked
    pub project_stored: Option<StoreReport>,
}

/// Import every rule found at `source`
///
/// `confirm` sees the parsed rules before anything is written; returning `false` aborts
/// with a validation error. Storing into the project is best effort.
pub fn import_rules(
    source: &str,
    config: &Config,
    paths: &AppPaths,
    opts: &ImportOptions,
    confirm: impl FnOnce(&[CursorRule]) -> bool,
    resolver: &mut dyn ConflictResolver,
) -> Result<ImportReport> {
    info!(source, "importing rules");

    let parser =
        CompositeRuleParser::new(opts.parser.clone())?.with_cancellation(opts.cancel.clone());
    let rules = parser.parse_all(source)?;
    if rules.is_empty() {
        return Err(VibeError::not_found("rules", source));
    }
    info!(count = rules.len(), "parsed rules");

    if !confirm(&rules) {
        return Err(VibeError::validation("import", "import cancelled by user"));
    }

    let store = paths.rules_dir(config);
    let stored = store_rules_to_path(&rules, &store, opts.force, resolver, config.file_permission)
        .map_err(|e| VibeError::operation("store rules", &store, e))?;

    let project_stored = project_rules_dir(config, opts).and_then(|dir| {
        match store_rules_to_path(&rules, &dir, opts.force, resolver, config.file_permission) {
            Ok(report) => {
                info!(dir = %dir.display(), saved = report.saved.len(), "rules also stored in project");
                Some(report)
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "failed to store rules in project");
                None
            }
        }
    });

    Ok(ImportReport {
        rules,
        stored,
        project_stored,
    })
}

/// The project's rules directory, only when it already exists
fn project_rules_dir(config: &Config, opts: &ImportOptions) -> Option<PathBuf> {
    let project = match &opts.project {
        Some(project) => project.clone(),
        None => match std::env::current_dir() {
            Ok(dir) => dir,
            Err(e) => {
                warn!(error = %e, "could not access current directory");
                return None;
            }
        },
    };

    let dir = project.join(&config.rules_dir_name);
    dir.is_dir().then_some(dir)
}
