use portable_pty::CommandBuilder;
use std::path::Path;

/// Shell program and the flag that makes it run one command string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellSpec {
    pub program: String,
    pub run_flag: &'static str,
}

impl ShellSpec {
    pub fn platform_default() -> Self {
        if cfg!(target_os = "windows") {
            Self::named("cmd.exe")
        } else {
            Self::named("bash")
        }
    }

    /// `cmd`-family shells take `/c`, everything else `-c`.
    pub fn named(program: impl Into<String>) -> Self {
        let program = program.into();
        let stem = Path::new(&program)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        let run_flag = if stem == "cmd" { "/c" } else { "-c" };
        Self { program, run_flag }
    }

    pub fn resolve(configured: Option<&str>) -> Self {
        match configured.map(str::trim).filter(|s| !s.is_empty()) {
            Some(program) => Self::named(program),
            None => Self::platform_default(),
        }
    }

    pub fn command(&self, command: &str, cwd: &str, term: &str) -> CommandBuilder {
        let mut builder = CommandBuilder::new(&self.program);
        builder.arg(self.run_flag);
        builder.arg(command);
        builder.cwd(cwd);
        builder.env("TERM", term);
        builder.env("COLORTERM", "truecolor");
        builder
    }
}
