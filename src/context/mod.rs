//! Execution environment (tty state, color support)

pub struct Environment {
    pub stdin_isatty: bool,
    pub stdout_isatty: bool,
    pub stderr_isatty: bool,
    pub colors: u32,
}

impl Environment {
    /// Initialize the environment with Windows ANSI support
    pub fn init() -> Self {
        // Enable ANSI escape codes on Windows 10+
        #[cfg(windows)]
        {
            // crossterm handles enabling virtual terminal processing
            let _ = crossterm::execute!(
                std::io::stdout(),
                crossterm::terminal::SetTitle("rurl")
            );
        }

        Self::default()
    }

    pub fn color_enabled(&self) -> bool {
        self.colors > 0
    }

    /// Body is being piped in rather than typed at a terminal.
    pub fn stdin_redirected(&self) -> bool {
        !self.stdin_isatty
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            stdin_isatty: atty::is(atty::Stream::Stdin),
            stdout_isatty: atty::is(atty::Stream::Stdout),
            stderr_isatty: atty::is(atty::Stream::Stderr),
            colors: detect_color_support(),
        }
    }
}

/// Detect color support level
fn detect_color_support() -> u32 {
    if !atty::is(atty::Stream::Stdout) {
        return 0;
    }
    if std::env::var("NO_COLOR").is_ok() {
        return 0;
    }
    if let Ok(colorterm) = std::env::var("COLORTERM") {
        if colorterm == "truecolor" || colorterm == "24bit" {
            return 16_777_216;
        }
    }
    match std::env::var("TERM") {
        Ok(term) if term == "dumb" => 0,
        _ => 256,
    }
}
