use colored::{ColoredString, Colorize};
use reconcile::Action;

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

/// Plain symbol for a planned action
pub const fn action_symbol(action: &Action) -> &'static str {
    match action {
        Action::Create { .. } => "+",
        Action::Update { .. } => "~",
        Action::Replace { .. } => "-/+",
        Action::Delete { .. } => "-",
        Action::NoOp { .. } => "=",
    }
}

/// Colored symbol for a planned action
pub fn action_marker(action: &Action) -> ColoredString {
    let symbol = action_symbol(action);
    match action {
        Action::Create { .. } => symbol.green(),
        Action::Update { .. } => symbol.yellow(),
        Action::Replace { .. } => symbol.magenta(),
        Action::Delete { .. } => symbol.red(),
        Action::NoOp { .. } => symbol.dimmed(),
    }
}

/// Pad a label to a column width, counting characters rather than bytes
pub fn pad(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        text.to_string()
    } else {
        format!("{text}{}", " ".repeat(width - len))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reconcile::ResourceState;

    #[test]
    fn test_action_symbols() {
        let state = ResourceState::with_id("x");
        assert_eq!(
            action_symbol(&Action::Create {
                desired: state.clone()
            }),
            "+"
        );
        assert_eq!(
            action_symbol(&Action::Delete {
                current: state.clone()
            }),
            "-"
        );
        assert_eq!(action_symbol(&Action::NoOp { current: state }), "=");
    }

    #[test]
    fn test_pad() {
        assert_eq!(pad("ab", 4), "ab  ");
        assert_eq!(pad("abcdef", 4), "abcdef");
        assert_eq!(pad("─x", 3), "─x ");
    }
}
