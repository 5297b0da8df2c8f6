use owo_colors::Style;
use std::sync::OnceLock;

static STDOUT: OnceLock<Palette> = OnceLock::new();
static STDERR: OnceLock<Palette> = OnceLock::new();

/// Styles for the CLI's record listings and status lines
#[derive(Debug, Clone, Copy)]
pub struct Palette {
    /// Banner and section titles
    pub title: Style,
    /// Completed actions (`init`, schema report)
    pub done: Style,
    /// Not-found and failure messages
    pub failure: Style,
    /// Empty results
    pub notice: Style,
    /// Row labels in `show` and summaries
    pub label: Style,
}

impl Palette {
    pub fn colored() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            done: Style::new().green().bold(),
            failure: Style::new().red().bold(),
            notice: Style::new().yellow(),
            label: Style::new().dimmed(),
        }
    }

    pub fn plain() -> Self {
        let none = Style::new();
        Self { title: none, done: none, failure: none, notice: none, label: none }
    }

    fn for_stream(colors: bool) -> Self {
        if colors { Self::colored() } else { Self::plain() }
    }
}

/// Palette for stdout; plain when stdout is not a color terminal or `CLICOLOR=0`
pub fn stdout_palette() -> &'static Palette {
    STDOUT.get_or_init(|| Palette::for_stream(console::colors_enabled()))
}

/// Palette for stderr, detected independently of stdout
pub fn stderr_palette() -> &'static Palette {
    STDERR.get_or_init(|| Palette::for_stream(console::colors_enabled_stderr()))
}
