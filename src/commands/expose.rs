use anyhow::Result;
use log::debug;

use crate::application::{ExposeAction, ExposeOutcome};
use crate::config::Layout;
use crate::runtime::Runtime;

/// Expose programs of one environment
#[tracing::instrument(skip(runtime, layout))]
pub fn expose<R: Runtime>(runtime: R, name: &str, rules: &[String], layout: Layout) -> Result<()> {
    let action = ExposeAction::new(&runtime, &layout);
    let outcome = action.expose(name, rules)?;
    print_outcome(name, &outcome);
    Ok(())
}

/// Re-apply the recorded rules of one environment
#[tracing::instrument(skip(runtime, layout))]
pub fn reexpose<R: Runtime>(runtime: R, name: &str, layout: Layout) -> Result<()> {
    let action = ExposeAction::new(&runtime, &layout);
    let outcome = action.reexpose(name)?;
    print_outcome(name, &outcome);
    Ok(())
}

/// Expose programs of every environment
#[tracing::instrument(skip(runtime, layout))]
pub fn expose_all<R: Runtime>(runtime: R, rules: &[String], layout: Layout) -> Result<()> {
    let action = ExposeAction::new(&runtime, &layout);
    let results = action.expose_all(rules)?;
    if results.is_empty() {
        println!("No environments found.");
        return Ok(());
    }

    let mut failed = Vec::new();
    for (name, result) in results {
        match result {
            Ok(outcome) => print_outcome(&name, &outcome),
            Err(e) => {
                println!("{}: failed: {:#}", name, e);
                failed.push(name);
            }
        }
    }

    if !failed.is_empty() {
        anyhow::bail!("Failed to expose: {}", failed.join(", "));
    }
    Ok(())
}

fn print_outcome(name: &str, outcome: &ExposeOutcome) {
    let report = &outcome.report;
    debug!("{} mutation(s) for {}", report.mutations(), name);

    println!("{}:", name);
    for path in &report.removed {
        println!("  [DEL]  {}", path.display());
    }
    for link in &report.created {
        println!("  [NEW]  {}", link.display_name());
    }
    for link in &report.kept {
        println!("  [OK]   {}", link.display_name());
    }
    for warning in &report.warnings {
        println!("  [WARN] {}", warning);
    }
    if report.apps.is_empty() {
        println!("  (nothing exposed)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    fn layout() -> Layout {
        Layout {
            venvs_root: PathBuf::from("/venvs"),
            bin_dir: PathBuf::from("/bin"),
        }
    }

    #[test]
    fn test_expose_all_without_environments() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/venvs")))
            .returning(|_| false);

        assert!(expose_all(runtime, &["__all__".to_string()], layout()).is_ok());
    }

    #[test]
    fn test_expose_missing_environment() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        assert!(expose(runtime, "jc", &["__all__".to_string()], layout()).is_err());
    }
}
