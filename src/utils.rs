use bitflags::bitflags;
use colored::Colorize;

bitflags! {
    pub struct CompileFlags: u32 {
        const NO_FLAG = 0;
        const DEBUG = 1 << 1;
    }
}

impl Default for CompileFlags {
    fn default() -> Self {
        CompileFlags::NO_FLAG
    }
}

/// Column of the character that starts at or after byte `position`. Offsets
/// past the end land one column after the last character.
pub fn caret_column(input: &str, position: usize) -> usize {
    input
        .char_indices()
        .take_while(|(offset, _)| *offset < position)
        .count()
}

pub fn render_diagnostic(stage: &str, message: &str, input: &str, position: usize) -> String {
    format!(
        "{} {}\n | {}\n | {}{}",
        format!("{} error:", stage).red().bold(),
        message,
        input,
        " ".repeat(caret_column(input, position)),
        "^".green()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_caret_column() {
        assert_eq!(caret_column("abc", 0), 0);
        assert_eq!(caret_column("abc", 2), 2);
        assert_eq!(caret_column("abc", 3), 3);
        assert_eq!(caret_column("abc", 100), 3);
        assert_eq!(caret_column("", 0), 0);
        // 'é' is two bytes wide
        assert_eq!(caret_column("aé&", 3), 2);
    }

    #[test]
    fn test_render_diagnostic_places_caret() {
        colored::control::set_override(false);
        let rendered = render_diagnostic("lexing", "invalid character", "ab&c", 2);
        assert_eq!(
            rendered,
            "lexing error: invalid character\n | ab&c\n |   ^"
        );
    }

    #[test]
    fn test_flags_default() {
        assert_eq!(CompileFlags::default(), CompileFlags::NO_FLAG);
        assert!(!CompileFlags::default().contains(CompileFlags::DEBUG));
    }
}
