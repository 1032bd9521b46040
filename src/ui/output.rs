use crate::decode::ResolutionWarning;
use crate::store::Backend;
use crate::ui::Icons;
use owo_colors::{OwoColorize, Style};
use std::ffi::OsString;
use std::sync::OnceLock;

/// Styles for terminal output; all blank when color is off
#[derive(Debug, Clone, Copy)]
pub(crate) struct Palette {
    pub heading: Style,
    pub ok: Style,
    pub failure: Style,
    pub caution: Style,
    pub accent: Style,
    pub label: Style,
    pub entity: Style,
    pub identifier: Style,
}

impl Palette {
    fn colored() -> Self {
        Self {
            heading: Style::new().cyan().bold(),
            ok: Style::new().green().bold(),
            failure: Style::new().red().bold(),
            caution: Style::new().yellow().bold(),
            accent: Style::new().magenta(),
            label: Style::new().white().dimmed(),
            entity: Style::new().blue().bold(),
            identifier: Style::new().bright_black().italic(),
        }
    }

    fn blank() -> Self {
        let none = Style::new();
        Self {
            heading: none,
            ok: none,
            failure: none,
            caution: none,
            accent: none,
            label: none,
            entity: none,
            identifier: none,
        }
    }
}

/// `NO_COLOR` wins; otherwise color needs both stdout and stderr on a terminal
fn wants_color(no_color: Option<OsString>, terminals: bool) -> bool {
    no_color.map_or(true, |v| v.is_empty()) && terminals
}

pub(crate) fn palette() -> &'static Palette {
    static PALETTE: OnceLock<Palette> = OnceLock::new();
    PALETTE.get_or_init(|| {
        let terminals = console::Term::stdout().is_term() && console::Term::stderr().is_term();
        if wants_color(std::env::var_os("NO_COLOR"), terminals) {
            Palette::colored()
        } else {
            Palette::blank()
        }
    })
}

pub fn header(text: &str) {
    println!("{} {}", Icons::BRIDGE, text.style(palette().heading));
}

pub fn success(label: &str) {
    println!("{} {}", Icons::CHECK, label.style(palette().ok));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(palette().failure));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(palette().caution));
}

pub fn info(label: &str, value: &str) {
    println!(
        "{} {}: {}",
        Icons::INFO.style(palette().accent),
        label.style(palette().label),
        value
    );
}

pub fn section(title: &str) {
    println!();
    println!("━{}━", title.style(palette().heading));
}

pub fn timing(elapsed: &str) {
    println!("{} {}", Icons::CLOCK.style(palette().label), elapsed);
}

pub fn summary_row(label: &str, value: &str) {
    println!("  {} {}", label.style(palette().label), value);
}

pub fn backend_icon(backend: Backend) -> &'static str {
    match backend {
        Backend::Sqlite => Icons::DATABASE,
        Backend::Xml => Icons::DOCUMENT,
    }
}

/// One line per reference a lenient decode left unset
pub fn resolution_warnings(warnings: &[ResolutionWarning]) {
    if warnings.is_empty() {
        return;
    }
    warn(&format!("{} unresolved reference(s) dropped", warnings.len()));
    for w in warnings {
        eprintln!(
            "  {} {} {}.{} -> {}",
            Icons::LINK,
            w.entity.style(palette().entity),
            w.referrer.style(palette().identifier),
            w.field,
            w.target.style(palette().caution)
        );
    }
}

/// Pretty JSON on stdout for `--json`
pub fn json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_color_and_terminals() {
        assert!(wants_color(None, true));
        assert!(!wants_color(None, false));
        assert!(!wants_color(Some(OsString::from("1")), true));
        // an empty NO_COLOR does not count
        assert!(wants_color(Some(OsString::new()), true));
    }

    #[test]
    fn test_blank_palette_emits_no_escapes() {
        let blank = Palette::blank();
        assert_eq!(format!("{}", "bank-n".style(blank.identifier)), "bank-n");
        assert_eq!(format!("{}", "Sense".style(blank.entity)), "Sense");
        assert!(format!("{}", "Sense".style(Palette::colored().entity)).contains('\x1b'));
    }
}
