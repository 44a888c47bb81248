//! # Terminal Output
//!
//! Decides how the `histdir` binary talks to the terminal: whether status
//! lines carry emoji or plain bracketed tags, and whether they are printed
//! at all.
//!
//! Color support is detected from the `--color` flag and the usual
//! environment variables:
//! - `--color=never|always|auto`
//! - `NO_COLOR` disables colors when set, even if empty (https://no-color.org/)
//! - `CLICOLOR=0` disables colors
//! - `CLICOLOR_FORCE=1` forces colors on a non-TTY
//! - `TERM=dumb` disables colors
//!
//! Status lines go to stdout. Logging goes to stderr through `log`, so
//! `--quiet` silences the former without touching the latter.
//!
//! ```rust,ignore
//! use histdir::output::{emoji, OutputConfig};
//!
//! let out = OutputConfig::from_env_and_flag("auto").quiet(false);
//! out.status(emoji(&out, "📦", "[READ]"), "Reading commits");
//! ```

use std::env;

/// How status output should look.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    /// Use emoji instead of plain tags.
    pub use_color: bool,
    /// Print nothing but errors.
    pub quiet: bool,
}

impl OutputConfig {
    /// Build from the value of `--color` (`always`, `never` or `auto`) and
    /// the environment.
    ///
    /// `always` wins over `NO_COLOR`. Anything other than `always` or
    /// `never` is treated as `auto`.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };

        Self {
            use_color,
            quiet: false,
        }
    }

    /// Set whether status lines are suppressed.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }

        console::Term::stdout().features().colors_supported()
    }

    /// Print `marker message` to stdout unless quiet.
    pub fn status(&self, marker: &str, message: impl std::fmt::Display) {
        if !self.quiet {
            println!("{} {}", marker, message);
        }
    }

    /// Print an indented detail line to stdout unless quiet.
    pub fn detail(&self, message: impl std::fmt::Display) {
        if !self.quiet {
            println!("   {}", message);
        }
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self {
            use_color: true,
            quiet: false,
        }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self {
            use_color: false,
            quiet: false,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// `emoji_str` when colors are on, otherwise `plain`.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// `"1 commit"`, `"3 commits"`.
pub fn count(n: usize, noun: &str) -> String {
    if n == 1 {
        format!("{} {}", n, noun)
    } else {
        format!("{} {}s", n, noun)
    }
}
