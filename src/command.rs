//! Composition of argv and environment for one sweep point.

use std::{
    env,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use crate::{
    axis::{ArgStyle, Combination},
    error::{Result, SweepError},
};

/// Fully composed child-process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Overrides applied on top of the inherited environment.
    pub env: Vec<(String, String)>,
    pub working_dir: PathBuf,
}

impl Invocation {
    pub fn build(
        program: &Path,
        base_args: &[String],
        combination: &Combination<'_>,
        working_dir: &Path,
    ) -> Self {
        let mut args = ArgBuilder::new();
        for arg in base_args {
            args.push(arg);
        }
        for sel in &combination.flags {
            args.flag(&sel.axis.label, sel.value, sel.axis.style);
        }
        let env = combination
            .env
            .iter()
            .map(|sel| (sel.axis.label.clone(), sel.value.to_string()))
            .collect();
        Self {
            program: program.to_path_buf(),
            args: args.finish(),
            env,
            working_dir: working_dir.to_path_buf(),
        }
    }

    pub fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own process group, so helpers the program forks can be killed with it.
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    /// Shell-like rendering used for console echo and dry runs.
    pub fn display_line(&self) -> String {
        let mut parts: Vec<String> = self
            .env
            .iter()
            .map(|(k, v)| format!("{}={}", k, shell_quote(v)))
            .collect();
        parts.push(shell_quote(&self.program.to_string_lossy()));
        parts.extend(self.args.iter().map(|a| shell_quote(a)));
        parts.join(" ")
    }
}

/// Collects argv items without any whitespace splicing.
#[derive(Debug, Default)]
pub struct ArgBuilder {
    args: Vec<String>,
}

impl ArgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// An empty value passes the flag on its own.
    pub fn flag(&mut self, label: &str, value: &str, style: ArgStyle) -> &mut Self {
        if value.is_empty() {
            return self.push(label);
        }
        match style {
            ArgStyle::Separate => self.push(label).push(value),
            ArgStyle::Joined => self.push(format!("{label}={value}")),
        }
    }

    pub fn finish(self) -> Vec<String> {
        self.args
    }
}

/// Resolves `program` the way a shell would: paths against `working_dir`,
/// bare names through `PATH`. The result is absolute.
pub fn resolve_program(program: &str, working_dir: &Path) -> Result<PathBuf> {
    let program = program.trim();
    let not_found = || SweepError::ExecutableNotFound {
        program: program.to_string(),
        searched: working_dir.to_path_buf(),
    };
    if program.is_empty() {
        return Err(SweepError::InvalidConfig("command is empty".into()));
    }
    let base = std::path::absolute(working_dir).map_err(|_| not_found())?;

    if Path::new(program).components().count() > 1 || Path::new(program).is_absolute() {
        let candidate = base.join(program);
        return if is_executable(&candidate) {
            Ok(candidate)
        } else {
            Err(not_found())
        };
    }

    let path_var = env::var_os("PATH").ok_or_else(not_found)?;
    env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(not_found)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}

fn shell_quote(s: &str) -> String {
    let plain = !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./=:,+%@".contains(c));
    if plain {
        s.to_string()
    } else {
        format!("'{}'", s.replace('\'', r"'\''"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis::{Axis, AxisMap, Combinations};

    #[test]
    fn test_flags_keep_axis_order_and_style() {
        let env = AxisMap::from_axes([Axis::new("OMP_NUM_THREADS", [4])]).unwrap();
        let flags = AxisMap::from_axes([
            Axis::from_legacy("-k ", ["life"]),
            Axis::from_legacy("-ts ", [16]),
            Axis::from_legacy("--size=", [1024]),
            Axis::from_legacy("-o ", [""]),
        ])
        .unwrap();
        let combo = Combinations::product(&env, &flags).next().unwrap();
        let inv = Invocation::build(Path::new("/opt/run"), &["-n".to_string()], &combo, Path::new("."));
        assert_eq!(inv.args, vec!["-n", "-k", "life", "-ts", "16", "--size=1024", "-o"]);
        assert_eq!(inv.env, vec![("OMP_NUM_THREADS".to_string(), "4".to_string())]);
        assert_eq!(
            inv.display_line(),
            "OMP_NUM_THREADS=4 /opt/run -n -k life -ts 16 --size=1024 -o"
        );
    }

    #[test]
    fn test_values_with_spaces_stay_single_arguments() {
        let flags = AxisMap::from_axes([Axis::new("-a", ["two words"])]).unwrap();
        let env = AxisMap::new();
        let combo = Combinations::product(&env, &flags).next().unwrap();
        let inv = Invocation::build(Path::new("run"), &[], &combo, Path::new("."));
        assert_eq!(inv.args, vec!["-a", "two words"]);
        assert_eq!(inv.display_line(), "run -a 'two words'");
    }

    #[test]
    fn test_resolve_missing_program() {
        let err = resolve_program("./definitely-not-here", Path::new(".")).unwrap_err();
        assert!(matches!(err, SweepError::ExecutableNotFound { .. }));
        let err = resolve_program("no-such-binary-on-path-4242", Path::new(".")).unwrap_err();
        assert!(matches!(err, SweepError::ExecutableNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_bare_name_through_path() {
        let resolved = resolve_program("sh", Path::new(".")).unwrap();
        assert!(resolved.is_absolute());
        assert!(resolved.ends_with("sh"));
    }
}
