//! Status lines for the account commands
//!
//! `login` and `logout` report one line per outcome. Colors are only used
//! when stdout is a terminal, so piped output stays greppable.

use std::io::IsTerminal;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Status {
    Info,
    Warn,
    Error,
    Success,
}

impl Status {
    fn label(self) -> &'static str {
        match self {
            Status::Info => "INFO",
            Status::Warn => "WARN",
            Status::Error => "ERROR",
            Status::Success => "OK",
        }
    }

    /// ANSI SGR color code.
    fn color(self) -> u8 {
        match self {
            Status::Info => 33,
            Status::Warn => 91,
            Status::Error => 31,
            Status::Success => 32,
        }
    }
}

/// `[LABEL] title: details`, or `[LABEL] title` without details.
pub fn status_line(status: Status, title: &str, details: &str, colored: bool) -> String {
    let label = if colored {
        format!("\x1b[1;{}m[{}]\x1b[0m", status.color(), status.label())
    } else {
        format!("[{}]", status.label())
    };

    if details.is_empty() {
        format!("{} {}", label, title)
    } else {
        format!("{} {}: {}", label, title, details)
    }
}

pub fn print_status(status: Status, title: &str, details: &str) {
    let colored = std::io::stdout().is_terminal();
    println!("{}", status_line(status, title, details, colored));
}

/// `report!(Error, "Login failed", "{}", e)`
#[macro_export]
macro_rules! report {
    ($status:ident, $title:expr) => {
        $crate::cli_messages::print_status($crate::cli_messages::Status::$status, $title, "")
    };
    ($status:ident, $title:expr, $($details:tt)+) => {
        $crate::cli_messages::print_status(
            $crate::cli_messages::Status::$status,
            $title,
            &format!($($details)+),
        )
    };
}
