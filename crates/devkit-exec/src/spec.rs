use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// How the spawned program relates to the tool the chain is after.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Reach {
    /// `program` is the tool itself.
    #[default]
    Direct,
    /// `program` is a script host (`bash -c`, `powershell -Command`) that
    /// looks the tool up by name.
    Interpreter,
    /// `program` fetches the tool before running it (`npx`).
    Launcher,
}

/// One concrete invocation of an external program.
///
/// Specs are built once per attempt and never mutated afterwards; the
/// builder methods consume and return the spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
    use_shell: bool,
    reach: Reach,
    hidden: bool,
    working_directory: Option<PathBuf>,
    timeout: Option<Duration>,
    env_overrides: Vec<(String, Option<String>)>,
}

impl CommandSpec {
    /// A direct, hidden invocation of `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            use_shell: false,
            reach: Reach::Direct,
            hidden: true,
            working_directory: None,
            timeout: None,
            env_overrides: Vec::new(),
        }
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run through the platform shell instead of spawning `program` directly.
    #[must_use]
    pub fn through_shell(mut self) -> Self {
        self.use_shell = true;
        self
    }

    /// The program is an interpreter running a script that calls the tool,
    /// so "command not found" from the script means the tool is missing.
    #[must_use]
    pub fn interpreted(mut self) -> Self {
        self.reach = Reach::Interpreter;
        self
    }

    /// The program downloads or resolves the tool on demand. When it fails
    /// after every earlier attempt missed the tool, the tool counts as not
    /// installed.
    #[must_use]
    pub fn launcher(mut self) -> Self {
        self.reach = Reach::Launcher;
        self
    }

    #[must_use]
    pub fn visible(mut self) -> Self {
        self.hidden = false;
        self
    }

    #[must_use]
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_overrides.push((key.into(), Some(value.into())));
        self
    }

    #[must_use]
    pub fn env_remove(mut self, key: impl Into<String>) -> Self {
        self.env_overrides.push((key.into(), None));
        self
    }

    /// Apply a batch of overrides; `None` removes the variable from the
    /// child's environment.
    #[must_use]
    pub fn envs<I>(mut self, overrides: I) -> Self
    where
        I: IntoIterator<Item = (String, Option<String>)>,
    {
        self.env_overrides.extend(overrides);
        self
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.args
    }

    #[must_use]
    pub fn uses_shell(&self) -> bool {
        self.use_shell
    }

    #[must_use]
    pub fn is_interpreted(&self) -> bool {
        self.reach == Reach::Interpreter
    }

    #[must_use]
    pub fn is_launcher(&self) -> bool {
        self.reach == Reach::Launcher
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    #[must_use]
    pub fn working_directory(&self) -> Option<&Path> {
        self.working_directory.as_deref()
    }

    #[must_use]
    pub fn timeout_override(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub fn env_overrides(&self) -> &[(String, Option<String>)] {
        &self.env_overrides
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.use_shell {
            write!(f, "[shell] ")?;
        }
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}
