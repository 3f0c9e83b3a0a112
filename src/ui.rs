use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// enable developer-level output for `debug!`
pub fn set_verbose(verbose: bool) {
    VERBOSE.store(verbose, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

#[macro_export]
macro_rules! warning {
    // format string literal (with or without inline formatting)
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).yellow());
    }};
    // arbitrary expression (non-literal)
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!("{}", $expr).yellow());
    }};
}

#[macro_export]
macro_rules! error {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).red());
    }};
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stderr(), "{}", format!("{}", $expr).red());
    }};
}

#[macro_export]
macro_rules! status {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", format!($fmt $(, $($arg)*)?).green());
    }};
    ($expr:expr) => {{
        use colored::Colorize;
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", format!("{}", $expr).green());
    }};
}

#[macro_export]
macro_rules! info {
    () => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout());
    }};
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), $fmt $(, $($arg)*)?);
    }};
    ($expr:expr) => {{
        use std::io::{self, Write};
        let _ = writeln!(io::stdout(), "{}", $expr);
    }};
}

/// developer-level detail, only printed when verbose output is enabled
#[macro_export]
macro_rules! debug {
    ($fmt:literal $(, $($arg:tt)*)?) => {{
        if $crate::ui::is_verbose() {
            use colored::Colorize;
            use std::io::{self, Write};
            let _ = writeln!(io::stderr(), "{}", format!($fmt $(, $($arg)*)?).dimmed());
        }
    }};
}
