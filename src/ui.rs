use colored::Colorize;
use declarative::RemovalPolicy;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print one link of an error chain
pub fn cause(msg: &str) {
    eprintln!("  {} {}", "caused by:".dimmed(), msg);
}

/// Print what kind of failure this was and how to fix it
pub fn advice(description: &str, advice: &str) {
    eprintln!();
    eprintln!("  {} {}", description.yellow().bold(), format!("({advice})").dimmed());
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

/// Print a key-value pair
pub fn kv(key: &str, value: &str) {
    println!("  {}: {}", key.dimmed(), value);
}

/// Print a step indicator
pub fn step(num: usize, total: usize, msg: &str) {
    println!("{} {}", format!("[{num}/{total}]").blue().bold(), msg);
}

// ============================================================================
// Formatting
// ============================================================================

/// First 12 characters of a content hash
pub fn short_hash(hash: &str) -> &str {
    hash.get(..12).unwrap_or(hash)
}

/// Teardown label for a resource
pub fn policy_label(policy: Option<RemovalPolicy>) -> String {
    match policy {
        None => "-".to_string(),
        Some(RemovalPolicy::Destroy) => format!("{}", "destroy".red()),
        Some(RemovalPolicy::Snapshot) => format!("{}", "snapshot".green()),
        Some(RemovalPolicy::Retain) => format!("{}", "retain".green()),
    }
}

/// Print a line diff between two renderings
///
/// Returns false when the texts are identical.
pub fn text_diff(old: &str, new: &str) -> bool {
    let diff = similar::TextDiff::from_lines(old, new);
    let mut has_changes = false;

    for change in diff.iter_all_changes() {
        match change.tag() {
            similar::ChangeTag::Delete => {
                has_changes = true;
                print!("    {}", format!("- {change}").red());
            }
            similar::ChangeTag::Insert => {
                has_changes = true;
                print!("    {}", format!("+ {change}").green());
            }
            similar::ChangeTag::Equal => {}
        }
    }

    has_changes
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_hash() {
        let hash = "af1349b9f5f9a1a6a0404dea36dcc9499bcb25c9adc112b7cc9a93cae41f3262";
        assert_eq!(short_hash(hash), "af1349b9f5f9");
        assert_eq!(short_hash("abc"), "abc");
    }

    #[test]
    fn test_policy_label_none() {
        assert_eq!(policy_label(None), "-");
    }

    #[test]
    fn test_policy_label_plain() {
        colored::control::set_override(false);
        assert_eq!(policy_label(Some(RemovalPolicy::Destroy)), "destroy");
        assert_eq!(policy_label(Some(RemovalPolicy::Snapshot)), "snapshot");
        colored::control::unset_override();
    }

    #[test]
    fn test_text_diff_detects_changes() {
        assert!(!text_diff("a\nb\n", "a\nb\n"));
        assert!(text_diff("a\nb\n", "a\nc\n"));
    }
}
