//! Dry-run mode utilities

use colored::Colorize;

/// Log a dry-run action
pub fn log_action(action: &str) {
    eprintln!("  {} {}", "[DRY RUN]".cyan().bold(), action);
}

/// Print the dry-run banner shown once at startup
pub fn announce() {
    eprintln!(
        "{}",
        "DRY RUN MODE: mutating commands and requests are printed, not executed"
            .cyan()
            .bold()
    );
    eprintln!();
}

/// Execute function only if not in dry-run mode
/// Returns Ok(()) in dry-run mode without executing
pub fn exec_unless_dry_run<F>(dry_run: bool, action_desc: &str, f: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    if dry_run {
        log_action(action_desc);
        Ok(())
    } else {
        f()
    }
}

/// Execute function and return value only if not in dry-run mode
/// Returns default value in dry-run mode
pub fn exec_unless_dry_run_with_default<F, T>(
    dry_run: bool,
    action_desc: &str,
    default: T,
    f: F,
) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T>,
{
    if dry_run {
        log_action(action_desc);
        Ok(default)
    } else {
        f()
    }
}
