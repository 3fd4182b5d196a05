/// Host family, which decides how tools are wrapped and which interpreters
/// make sense as fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    Unix,
}

impl Platform {
    #[must_use]
    pub fn current() -> Self {
        if cfg!(windows) {
            Platform::Windows
        } else {
            Platform::Unix
        }
    }

    #[must_use]
    pub fn is_windows(self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Rewrite `program args…` so the platform shell resolves `program`.
    ///
    /// On Windows this is `cmd /C program args…`, which finds `.cmd`/`.bat`
    /// shims that a direct spawn cannot. Elsewhere the program runs through
    /// `sh -c`, with the arguments passed positionally so they are never
    /// re-split by the shell.
    #[must_use]
    pub fn shell_wrap(self, program: &str, args: &[String]) -> (String, Vec<String>) {
        match self {
            Platform::Windows => {
                let mut wrapped = Vec::with_capacity(args.len() + 2);
                wrapped.push("/C".to_string());
                wrapped.push(program.to_string());
                wrapped.extend(args.iter().cloned());
                ("cmd".to_string(), wrapped)
            }
            Platform::Unix => {
                let script = format!("{} \"$@\"", posix_quote(program));
                let mut wrapped = Vec::with_capacity(args.len() + 3);
                wrapped.push("-c".to_string());
                wrapped.push(script);
                wrapped.push("sh".to_string());
                wrapped.extend(args.iter().cloned());
                ("sh".to_string(), wrapped)
            }
        }
    }
}

/// Quote a string for a POSIX shell: wrap in single quotes and splice any
/// embedded single quote as `'\''`.
#[must_use]
pub fn posix_quote(value: &str) -> String {
    if !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '/' | ':' | '='))
    {
        return value.to_string();
    }
    format!("'{}'", value.replace('\'', "'\\''"))
}

/// Quote a string as a PowerShell single-quoted literal.
#[must_use]
pub fn powershell_quote(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_wrap_goes_through_cmd() {
        let (program, args) =
            Platform::Windows.shell_wrap("nvm", &["list".to_string(), "available".to_string()]);

        assert_eq!(program, "cmd");
        assert_eq!(args, vec!["/C", "nvm", "list", "available"]);
    }

    #[test]
    fn unix_wrap_passes_arguments_positionally() {
        let (program, args) = Platform::Unix.shell_wrap("nrm", &["use".to_string(), "a b".to_string()]);

        assert_eq!(program, "sh");
        assert_eq!(args, vec!["-c", "nrm \"$@\"", "sh", "use", "a b"]);
    }

    #[test]
    fn posix_quote_leaves_plain_words_alone() {
        assert_eq!(posix_quote("nvm"), "nvm");
        assert_eq!(posix_quote("/home/user/.nvm"), "/home/user/.nvm");
    }

    #[test]
    fn posix_quote_escapes_single_quotes() {
        assert_eq!(posix_quote("it's"), "'it'\\''s'");
        assert_eq!(posix_quote(""), "''");
        assert_eq!(posix_quote("a b"), "'a b'");
    }

    #[test]
    fn powershell_quote_doubles_single_quotes() {
        assert_eq!(powershell_quote("C:\\O'Neil"), "'C:\\O''Neil'");
    }
}
