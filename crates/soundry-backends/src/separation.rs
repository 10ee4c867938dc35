//! Source separation through an external command-line tool.
//!
//! # Design
//! - Each run gets its own scratch directory, removed when the run ends
//!   whatever the outcome.
//! - The child process is killed if the run future is dropped, which is how
//!   dispatcher timeouts stop it. Everything runs inside that future, so no
//!   output can appear after it is dropped.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use soundry_config::{SeparationConfig, SpleeterConfig};
use soundry_storage::AudioExtension;
use tokio::process::Command;
use tracing::{debug, info, instrument};

use crate::backend::ProcessingBackend;
use crate::error::{BackendError, BackendResult};
use crate::job::Job;

/// Bytes of stderr kept in failure messages.
const STDERR_TAIL_BYTES: usize = 2_048;

/// External separation tool and its tool-specific settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeparationTool {
    /// `demucs -n <model> -o <dir> <input>`, writing `<dir>/<model>/<input stem>/<stem>.wav`.
    Demucs {
        /// Model name.
        model: String,
    },
    /// `spleeter separate -p <preset> -o <dir> <input>`, writing `<dir>/<input stem>/<stem>.wav`.
    Spleeter {
        /// Model preset.
        preset: String,
    },
}

impl SeparationTool {
    fn arguments(&self, scratch: &Path, input: &Path) -> Vec<std::ffi::OsString> {
        let mut args: Vec<std::ffi::OsString> = Vec::new();
        match self {
            Self::Demucs { model } => {
                args.extend(["-n".into(), model.into()]);
            }
            Self::Spleeter { preset } => {
                args.extend(["separate".into(), "-p".into(), preset.into()]);
            }
        }
        args.extend(["-o".into(), scratch.as_os_str().to_owned(), input.as_os_str().to_owned()]);
        args
    }

    fn stem_path(&self, scratch: &Path, input: &Path, stem: &str) -> PathBuf {
        let track = input.file_stem().map(Path::new).unwrap_or(Path::new("input"));
        let base = match self {
            Self::Demucs { model } => scratch.join(model).join(track),
            Self::Spleeter { .. } => scratch.join(track),
        };
        base.join(format!("{stem}.wav"))
    }
}

/// Runs an external separation tool and relocates one stem to the output.
#[derive(Debug, Clone)]
pub struct SeparationBackend {
    name: &'static str,
    aliases: &'static [&'static str],
    command: Vec<String>,
    tool: SeparationTool,
    stem: String,
    scratch_dir: PathBuf,
}

impl SeparationBackend {
    /// The `separation` method backed by demucs.
    #[must_use]
    pub fn demucs(config: &SeparationConfig, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "separation",
            aliases: &["demucs"],
            command: config.command.clone(),
            tool: SeparationTool::Demucs {
                model: config.model.clone(),
            },
            stem: config.stem.clone(),
            scratch_dir: scratch_dir.into(),
        }
    }

    /// The `spleeter` method.
    #[must_use]
    pub fn spleeter(config: &SpleeterConfig, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "spleeter",
            aliases: &[],
            command: config.command.clone(),
            tool: SeparationTool::Spleeter {
                preset: config.preset.clone(),
            },
            stem: config.stem.clone(),
            scratch_dir: scratch_dir.into(),
        }
    }

    fn program(&self) -> &str {
        self.command.first().map_or("", String::as_str)
    }

    async fn run_tool(&self, scratch: &Path, input: &Path) -> BackendResult<()> {
        let program = self.program().to_string();
        let mut command = Command::new(&program);
        command
            .args(self.command.iter().skip(1))
            .args(self.tool.arguments(scratch, input))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = command
            .output()
            .await
            .map_err(|source| BackendError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BackendError::ProcessFailed {
                program,
                status: output.status.to_string(),
                stderr: stderr_tail(&output.stderr),
            });
        }
        debug!(
            program = %program,
            stdout_bytes = output.stdout.len(),
            "separation tool finished"
        );
        Ok(())
    }
}

#[async_trait]
impl ProcessingBackend for SeparationBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn aliases(&self) -> &'static [&'static str] {
        self.aliases
    }

    fn output_extension(&self) -> Option<AudioExtension> {
        Some(AudioExtension::Wav)
    }

    #[instrument(name = "separation.process", skip(self, job), fields(method = self.name))]
    async fn process(&self, input: &Path, output: &Path, job: &Job) -> BackendResult<PathBuf> {
        if tokio::fs::metadata(input).await.is_err() {
            return Err(BackendError::MissingInput {
                path: input.to_path_buf(),
            });
        }

        tokio::fs::create_dir_all(&self.scratch_dir)
            .await
            .map_err(|source| BackendError::io("create scratch area", &self.scratch_dir, source))?;
        let scratch = tempfile::Builder::new()
            .prefix("job-")
            .tempdir_in(&self.scratch_dir)
            .map_err(|source| BackendError::io("create job directory", &self.scratch_dir, source))?;

        self.run_tool(scratch.path(), input).await?;

        let stem_path = self.tool.stem_path(scratch.path(), input, &self.stem);
        if !tokio::fs::metadata(&stem_path)
            .await
            .is_ok_and(|meta| meta.is_file())
        {
            return Err(BackendError::MissingStem {
                stem: self.stem.clone(),
                path: stem_path,
            });
        }

        job.ensure_active()?;
        relocate(&stem_path, output).await?;
        info!(stem = %self.stem, output = %output.display(), "stem relocated");
        Ok(output.to_path_buf())
    }
}

/// Move `from` to `to`, copying when the two sit on different filesystems.
async fn relocate(from: &Path, to: &Path) -> BackendResult<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to)
        .await
        .map_err(|source| BackendError::io("copy stem", to, source))?;
    Ok(())
}

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

    const FAKE_DEMUCS: &str = r#"
model="$2"; out="$4"; input="$5"
name=$(basename "$input"); name="${name%.*}"
mkdir -p "$out/$model/$name"
printf 'RIFF-vocals' > "$out/$model/$name/vocals.wav"
printf 'RIFF-drums' > "$out/$model/$name/drums.wav"
"#;

    const FAKE_SPLEETER: &str = r#"
out="$5"; input="$6"
name=$(basename "$input"); name="${name%.*}"
mkdir -p "$out/$name"
printf 'RIFF-spleeter' > "$out/$name/vocals.wav"
"#;

    fn backend_with_script(
        root: &Path,
        script: &str,
        spleeter: bool,
    ) -> TestResult<(SeparationBackend, PathBuf)> {
        let script_path = root.join("tool.sh");
        std::fs::write(&script_path, script)?;
        let command = vec!["sh".to_string(), script_path.display().to_string()];
        let scratch = root.join("separated");
        let backend = if spleeter {
            SeparationBackend::spleeter(
                &SpleeterConfig {
                    command,
                    ..SpleeterConfig::default()
                },
                &scratch,
            )
        } else {
            SeparationBackend::demucs(
                &SeparationConfig {
                    command,
                    ..SeparationConfig::default()
                },
                &scratch,
            )
        };
        Ok((backend, scratch))
    }

    fn input_file(root: &Path) -> TestResult<PathBuf> {
        let input = root.join("0123abcd.mp3");
        std::fs::write(&input, b"ID3-fake")?;
        Ok(input)
    }

    fn scratch_is_empty(scratch: &Path) -> TestResult<bool> {
        Ok(std::fs::read_dir(scratch)?.next().is_none())
    }

    #[tokio::test]
    async fn demucs_stem_is_relocated() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let (backend, scratch) = backend_with_script(temp.path(), FAKE_DEMUCS, false)?;
        let input = input_file(temp.path())?;
        let output = temp.path().join("out.wav");

        let written = backend.process(&input, &output, &Job::detached()).await?;

        assert_eq!(written, output);
        assert_eq!(std::fs::read(&output)?, b"RIFF-vocals");
        assert!(scratch_is_empty(&scratch)?);
        Ok(())
    }

    #[tokio::test]
    async fn spleeter_layout_is_supported() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let (backend, _) = backend_with_script(temp.path(), FAKE_SPLEETER, true)?;
        let input = input_file(temp.path())?;
        let output = temp.path().join("out.wav");

        backend.process(&input, &output, &Job::detached()).await?;

        assert_eq!(backend.name(), "spleeter");
        assert_eq!(std::fs::read(&output)?, b"RIFF-spleeter");
        Ok(())
    }

    #[tokio::test]
    async fn failing_tool_reports_stderr() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let (backend, scratch) =
            backend_with_script(temp.path(), "echo 'model download failed' >&2\nexit 3\n", false)?;
        let input = input_file(temp.path())?;
        let output = temp.path().join("out.wav");

        match backend.process(&input, &output, &Job::detached()).await {
            Err(BackendError::ProcessFailed { stderr, .. }) => {
                assert_eq!(stderr, "model download failed");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!output.exists());
        assert!(scratch_is_empty(&scratch)?);
        Ok(())
    }

    #[tokio::test]
    async fn missing_stem_is_an_error() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let (backend, _) = backend_with_script(temp.path(), "exit 0\n", false)?;
        let input = input_file(temp.path())?;
        let output = temp.path().join("out.wav");

        let err = backend.process(&input, &output, &Job::detached()).await;

        assert!(matches!(err, Err(BackendError::MissingStem { ref stem, .. }) if stem == "vocals"));
        assert!(!output.exists());
        Ok(())
    }

    #[tokio::test]
    async fn missing_input_is_reported_before_spawning() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let (backend, _) = backend_with_script(temp.path(), FAKE_DEMUCS, false)?;
        let err = backend
            .process(
                &temp.path().join("absent.wav"),
                &temp.path().join("out.wav"),
                &Job::detached(),
            )
            .await;
        assert!(matches!(err, Err(BackendError::MissingInput { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_program_fails_to_spawn() -> TestResult<()> {
        let temp = tempfile::tempdir()?;
        let backend = SeparationBackend::demucs(
            &SeparationConfig {
                command: vec!["soundry-no-such-tool".to_string()],
                ..SeparationConfig::default()
            },
            temp.path().join("separated"),
        );
        let input = input_file(temp.path())?;
        let err = backend
            .process(&input, &temp.path().join("out.wav"), &Job::detached())
            .await;
        assert!(matches!(err, Err(BackendError::Spawn { .. })));
        Ok(())
    }

    #[test]
    fn stderr_tail_keeps_the_end() {
        let long = vec![b'x'; STDERR_TAIL_BYTES + 10];
        assert_eq!(stderr_tail(&long).len(), STDERR_TAIL_BYTES);
    }
}
