//! Expose-rule resolution.
//!
//! A rule list is turned into the concrete programs to publish. The symbolic
//! rules `__eponym__`, `__main__` and `__all__` form a small fallback chain:
//! `__eponym__` and `__main__` fall back to each other once, and both end in
//! `__all__`, which always resolves. The transition table lives in
//! [`fallback_after`].

use anyhow::Result;
use log::{debug, warn};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Component, Path};

use super::ResolutionWarning;
use crate::venv::EnvironmentInspector;

pub const OPT_OUT_RULE: &str = "_";
pub const EPONYM_RULE: &str = "__eponym__";
pub const MAIN_RULE: &str = "__main__";
pub const ALL_RULE: &str = "__all__";

/// What manifests written before versioning recorded for "everything".
const LEGACY_ALL_RULE: &str = "*";

/// Interpreter and installer entry points are never published implicitly.
const INTERPRETER_PATTERN: &str = r"^(python|pip)(\d+(\.\d+)?)?$";

/// One `name` or `name:alias` entry of an explicit rule list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplicitRule {
    pub name: String,
    pub alias: Option<String>,
}

impl ExplicitRule {
    pub fn parse(entry: &str) -> Self {
        match entry.split_once(':') {
            Some((name, alias)) if !alias.is_empty() => Self {
                name: name.to_string(),
                alias: Some(alias.to_string()),
            },
            Some((name, _)) => Self {
                name: name.to_string(),
                alias: None,
            },
            None => Self {
                name: entry.to_string(),
                alias: None,
            },
        }
    }

    fn exposed_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// First of name and alias that could not stay a single file name inside
    /// a bin directory.
    fn invalid_part(&self) -> Option<&str> {
        std::iter::once(self.name.as_str())
            .chain(self.alias.as_deref())
            .find(|part| !is_plain_name(part))
    }
}

/// A single normal path component: no separators, no `.`/`..`, not absolute.
fn is_plain_name(name: &str) -> bool {
    if name.contains(['/', '\\']) {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// A rule list classified by shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExposeRules {
    /// `[]`: no rule given.
    Nothing,
    /// `["_"]`: explicit opt-out.
    OptOut,
    /// Start of the fallback chain.
    Chain(FallbackState),
    Explicit(Vec<ExplicitRule>),
}

impl ExposeRules {
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> Self {
        match rules {
            [] => Self::Nothing,
            [single] => match single.as_ref() {
                OPT_OUT_RULE => Self::OptOut,
                EPONYM_RULE => Self::Chain(FallbackState::Eponym),
                MAIN_RULE => Self::Chain(FallbackState::Main),
                ALL_RULE | LEGACY_ALL_RULE => Self::Chain(FallbackState::All),
                other => Self::Explicit(vec![ExplicitRule::parse(other)]),
            },
            many => Self::Explicit(
                many.iter()
                    .map(|entry| ExplicitRule::parse(entry.as_ref()))
                    .collect(),
            ),
        }
    }
}

/// States of the symbolic fallback chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackState {
    /// A program named exactly like the main package.
    Eponym,
    /// Console scripts declared by the main package.
    Main,
    /// Every non-interpreter executable. Terminal.
    All,
}

const FALLBACKS: [(FallbackState, FallbackState); 2] = [
    (FallbackState::Eponym, FallbackState::Main),
    (FallbackState::Main, FallbackState::Eponym),
];

/// Next state after `from` came up empty, given the states already visited.
/// A state is never entered twice; when the table's target was visited the
/// chain ends in [`FallbackState::All`].
pub fn fallback_after(from: FallbackState, visited: &[FallbackState]) -> FallbackState {
    FALLBACKS
        .iter()
        .find(|(source, _)| *source == from)
        .map(|(_, target)| *target)
        .filter(|target| !visited.contains(target))
        .unwrap_or(FallbackState::All)
}

/// Programs to publish, in the environment's namespace.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Program names inside the environment's bin directory, in rule order.
    pub binaries: Vec<String>,
    /// Program name to the name it is published under.
    pub renames: BTreeMap<String, String>,
    /// Explicitly requested programs that are not in the environment.
    pub missing: Vec<String>,
    /// Fallback states visited, in order.
    pub visited: Vec<FallbackState>,
    pub warnings: Vec<ResolutionWarning>,
}

impl Resolution {
    /// Name `bin_name` is published under in the shared bin directory.
    pub fn exposed_name<'a>(&'a self, bin_name: &'a str) -> &'a str {
        self.renames
            .get(bin_name)
            .map(String::as_str)
            .unwrap_or(bin_name)
    }

    fn warn(&mut self, warning: ResolutionWarning) {
        warn!("{}", warning);
        self.warnings.push(warning);
    }
}

pub struct RuleResolver<'a, I: EnvironmentInspector> {
    inspector: &'a I,
    main_package: &'a str,
    interpreter: Regex,
}

impl<'a, I: EnvironmentInspector> RuleResolver<'a, I> {
    pub fn new(inspector: &'a I, main_package: &'a str) -> Result<Self> {
        Ok(Self {
            inspector,
            main_package,
            interpreter: Regex::new(INTERPRETER_PATTERN)?,
        })
    }

    fn is_interpreter(&self, name: &str) -> bool {
        self.interpreter.is_match(name)
    }

    #[tracing::instrument(skip(self))]
    pub fn resolve(&self, rules: &[String]) -> Result<Resolution> {
        let mut resolution = Resolution::default();
        match ExposeRules::parse(rules) {
            ExposeRules::Nothing | ExposeRules::OptOut => {
                debug!("Rules {:?} publish nothing", rules);
            }
            ExposeRules::Chain(start) => self.run_chain(start, &mut resolution)?,
            ExposeRules::Explicit(entries) => self.resolve_explicit(&entries, &mut resolution),
        }
        Ok(resolution)
    }

    fn run_chain(&self, start: FallbackState, resolution: &mut Resolution) -> Result<()> {
        let mut state = start;
        loop {
            resolution.visited.push(state);
            debug!("Resolving {} with {:?}", self.main_package, state);

            match state {
                FallbackState::Eponym => {
                    if self.inspector.has_executable(self.main_package) {
                        resolution.binaries = vec![self.main_package.to_string()];
                        return Ok(());
                    }
                    resolution.warn(ResolutionWarning::EponymMissing {
                        package: self.main_package.to_string(),
                    });
                }
                FallbackState::Main => {
                    let scripts: Vec<String> = self
                        .inspector
                        .console_scripts(self.main_package)?
                        .into_iter()
                        .filter(|name| !self.is_interpreter(name))
                        .collect();
                    if !scripts.is_empty() {
                        resolution.binaries = scripts;
                        return Ok(());
                    }
                    resolution.warn(ResolutionWarning::NoConsoleScripts {
                        package: self.main_package.to_string(),
                    });
                }
                FallbackState::All => {
                    resolution.binaries = self
                        .inspector
                        .executables()?
                        .into_iter()
                        .filter(|name| !self.is_interpreter(name))
                        .collect();
                    return Ok(());
                }
            }

            state = fallback_after(state, &resolution.visited);
        }
    }

    /// Later entries win: a repeated program takes its last alias, and when
    /// two programs would be published under the same name the later one is
    /// kept.
    fn resolve_explicit(&self, entries: &[ExplicitRule], resolution: &mut Resolution) {
        for entry in entries {
            if let Some(part) = entry.invalid_part() {
                resolution.warn(ResolutionWarning::InvalidName {
                    name: part.to_string(),
                });
                continue;
            }
            if !self.inspector.has_executable(&entry.name) {
                resolution.missing.push(entry.name.clone());
                resolution.warn(ResolutionWarning::MissingExecutable {
                    name: entry.name.clone(),
                });
                continue;
            }

            resolution.binaries.retain(|b| b != &entry.name);
            resolution.renames.remove(&entry.name);

            let exposed = entry.exposed_name();
            if let Some(pos) = resolution
                .binaries
                .iter()
                .position(|b| resolution.exposed_name(b) == exposed)
            {
                let loser = resolution.binaries.remove(pos);
                resolution.renames.remove(&loser);
                resolution.warn(ResolutionWarning::Shadowed {
                    name: loser,
                    winner: entry.name.clone(),
                    exposed: exposed.to_string(),
                });
            }

            resolution.binaries.push(entry.name.clone());
            if let Some(alias) = &entry.alias {
                resolution
                    .renames
                    .insert(entry.name.clone(), alias.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venv::MockEnvironmentInspector;
    use mockall::predicate::eq;

    fn rules(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Inspector whose bin directory holds exactly `bins` and whose metadata
    /// declares `scripts` for every package.
    fn inspector(bins: &[&str], scripts: &[&str]) -> MockEnvironmentInspector {
        let bins: Vec<String> = bins.iter().map(|s| s.to_string()).collect();
        let scripts: Vec<String> = scripts.iter().map(|s| s.to_string()).collect();

        let mut inspector = MockEnvironmentInspector::new();
        let listed = bins.clone();
        inspector
            .expect_has_executable()
            .returning(move |name| bins.iter().any(|b| b == name));
        inspector
            .expect_executables()
            .returning(move || Ok(listed.clone()));
        inspector
            .expect_console_scripts()
            .returning(move |_| Ok(scripts.clone()));
        inspector
    }

    #[test]
    fn test_parse_shapes() {
        assert_eq!(ExposeRules::parse::<&str>(&[]), ExposeRules::Nothing);
        assert_eq!(ExposeRules::parse(&["_"]), ExposeRules::OptOut);
        assert_eq!(
            ExposeRules::parse(&["__eponym__"]),
            ExposeRules::Chain(FallbackState::Eponym)
        );
        assert_eq!(
            ExposeRules::parse(&["__main__"]),
            ExposeRules::Chain(FallbackState::Main)
        );
        assert_eq!(
            ExposeRules::parse(&["*"]),
            ExposeRules::Chain(FallbackState::All)
        );
        assert_eq!(
            ExposeRules::parse(&["__all__", "jc"]),
            ExposeRules::Explicit(vec![ExplicitRule::parse("__all__"), ExplicitRule::parse("jc")])
        );
    }

    #[test]
    fn test_explicit_rule_parse() {
        assert_eq!(
            ExplicitRule::parse("jc:myjc"),
            ExplicitRule {
                name: "jc".into(),
                alias: Some("myjc".into())
            }
        );
        assert_eq!(ExplicitRule::parse("jc:").alias, None);
        assert_eq!(ExplicitRule::parse("a:b:c").alias.as_deref(), Some("b:c"));
    }

    #[test]
    fn test_fallback_table_visits_each_state_once() {
        use FallbackState::*;
        assert_eq!(fallback_after(Eponym, &[Eponym]), Main);
        assert_eq!(fallback_after(Main, &[Main]), Eponym);
        assert_eq!(fallback_after(Main, &[Eponym, Main]), All);
        assert_eq!(fallback_after(Eponym, &[Main, Eponym]), All);
        assert_eq!(fallback_after(All, &[All]), All);
    }

    #[test]
    fn test_empty_and_opt_out_publish_nothing() {
        let mut inspector = MockEnvironmentInspector::new();
        inspector.expect_has_executable().never();
        inspector.expect_executables().never();
        inspector.expect_console_scripts().never();

        let resolver = RuleResolver::new(&inspector, "jc").unwrap();
        assert_eq!(resolver.resolve(&[]).unwrap(), Resolution::default());
        assert_eq!(resolver.resolve(&rules(&["_"])).unwrap(), Resolution::default());
    }

    #[test]
    fn test_eponym_found() {
        let inspector = inspector(&["jc", "jc-helper"], &["jc", "jc-helper"]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver.resolve(&rules(&["__eponym__"])).unwrap();
        assert_eq!(resolution.binaries, vec!["jc"]);
        assert_eq!(resolution.visited, vec![FallbackState::Eponym]);
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_eponym_falls_back_to_console_scripts() {
        let mut inspector = MockEnvironmentInspector::new();
        inspector
            .expect_has_executable()
            .with(eq("jc"))
            .returning(|_| false);
        inspector
            .expect_console_scripts()
            .with(eq("jc"))
            .times(1)
            .returning(|_| Ok(vec!["jc".to_string()]));
        inspector.expect_executables().never();

        let resolver = RuleResolver::new(&inspector, "jc").unwrap();
        let resolution = resolver.resolve(&rules(&["__eponym__"])).unwrap();

        assert_eq!(resolution.binaries, vec!["jc"]);
        assert_eq!(
            resolution.visited,
            vec![FallbackState::Eponym, FallbackState::Main]
        );
        assert_eq!(
            resolution.warnings,
            vec![ResolutionWarning::EponymMissing {
                package: "jc".into()
            }]
        );
    }

    #[test]
    fn test_main_falls_back_through_eponym_to_all() {
        let inspector = inspector(&["pip", "python3", "tool-a", "tool-b"], &[]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver.resolve(&rules(&["__main__"])).unwrap();
        assert_eq!(resolution.binaries, vec!["tool-a", "tool-b"]);
        assert_eq!(
            resolution.visited,
            vec![
                FallbackState::Main,
                FallbackState::Eponym,
                FallbackState::All
            ]
        );
        assert_eq!(resolution.warnings.len(), 2);
    }

    #[test]
    fn test_main_falls_back_to_eponym() {
        let inspector = inspector(&["jc", "jc-helper"], &[]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver.resolve(&rules(&["__main__"])).unwrap();
        assert_eq!(resolution.binaries, vec!["jc"]);
        assert_eq!(
            resolution.visited,
            vec![FallbackState::Main, FallbackState::Eponym]
        );
    }

    #[test]
    fn test_main_excludes_interpreter_scripts() {
        let inspector = inspector(&[], &["pip3.12", "python", "jc"]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver.resolve(&rules(&["__main__"])).unwrap();
        assert_eq!(resolution.binaries, vec!["jc"]);
    }

    #[test]
    fn test_all_excludes_interpreters() {
        let inspector = inspector(&["jc", "jc-helper", "pip", "python3"], &[]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver.resolve(&rules(&["__all__"])).unwrap();
        assert_eq!(resolution.binaries, vec!["jc", "jc-helper"]);
        assert_eq!(resolution.visited, vec![FallbackState::All]);
    }

    #[test]
    fn test_interpreter_pattern_is_anchored() {
        let inspector = inspector(&["pipx", "pip3", "python3.12", "mypython", "pip-audit"], &[]);
        let resolver = RuleResolver::new(&inspector, "x").unwrap();

        let resolution = resolver.resolve(&rules(&["__all__"])).unwrap();
        assert_eq!(resolution.binaries, vec!["pipx", "mypython", "pip-audit"]);
    }

    #[test]
    fn test_explicit_with_rename() {
        let inspector = inspector(&["jc"], &[]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver.resolve(&rules(&["jc:myjc"])).unwrap();
        assert_eq!(resolution.binaries, vec!["jc"]);
        assert_eq!(resolution.exposed_name("jc"), "myjc");
    }

    #[test]
    fn test_explicit_missing_entry_does_not_stop_others() {
        let inspector = inspector(&["jc", "jc-helper"], &[]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver
            .resolve(&rules(&["ghost", "jc", "jc-helper:h"]))
            .unwrap();
        assert_eq!(resolution.binaries, vec!["jc", "jc-helper"]);
        assert_eq!(resolution.missing, vec!["ghost"]);
        assert_eq!(
            resolution.warnings,
            vec![ResolutionWarning::MissingExecutable {
                name: "ghost".into()
            }]
        );
    }

    #[test]
    fn test_explicit_same_destination_last_wins() {
        let inspector = inspector(&["jc", "jc-helper"], &[]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver.resolve(&rules(&["jc:tool", "jc-helper:tool"])).unwrap();
        assert_eq!(resolution.binaries, vec!["jc-helper"]);
        assert_eq!(resolution.exposed_name("jc-helper"), "tool");
        assert!(!resolution.renames.contains_key("jc"));
        assert!(matches!(
            resolution.warnings.as_slice(),
            [ResolutionWarning::Shadowed { name, .. }] if name == "jc"
        ));
    }

    #[test]
    fn test_explicit_repeated_program_takes_last_alias() {
        let inspector = inspector(&["jc"], &[]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver.resolve(&rules(&["jc:myjc", "jc"])).unwrap();
        assert_eq!(resolution.binaries, vec!["jc"]);
        assert_eq!(resolution.exposed_name("jc"), "jc");
        assert!(resolution.warnings.is_empty());
    }

    #[test]
    fn test_explicit_alias_cannot_leave_bin_dir() {
        let inspector = inspector(&["jc", "jc-helper"], &[]);
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver
            .resolve(&rules(&["jc:../escaped", "jc:/etc/x", "jc-helper:h"]))
            .unwrap();
        assert_eq!(resolution.binaries, vec!["jc-helper"]);
        assert!(resolution.missing.is_empty());
        assert_eq!(
            resolution.warnings,
            vec![
                ResolutionWarning::InvalidName {
                    name: "../escaped".into()
                },
                ResolutionWarning::InvalidName {
                    name: "/etc/x".into()
                },
            ]
        );
    }

    #[test]
    fn test_explicit_name_with_separator_is_rejected() {
        let mut inspector = MockEnvironmentInspector::new();
        inspector.expect_has_executable().never();
        let resolver = RuleResolver::new(&inspector, "jc").unwrap();

        let resolution = resolver
            .resolve(&rules(&["../../usr/bin/sh", "sub/jc", ".."]))
            .unwrap();
        assert!(resolution.binaries.is_empty());
        assert_eq!(resolution.warnings.len(), 3);
    }

    #[test]
    fn test_is_plain_name() {
        assert!(is_plain_name("jc"));
        assert!(is_plain_name("jc.py"));
        assert!(is_plain_name("..jc"));
        assert!(!is_plain_name(""));
        assert!(!is_plain_name("."));
        assert!(!is_plain_name(".."));
        assert!(!is_plain_name("a/b"));
        assert!(!is_plain_name("jc/"));
        assert!(!is_plain_name("a\\b"));
        assert!(!is_plain_name("/etc/x"));
    }
}
