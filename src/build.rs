use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{CpLinkError, Result};

/// Runs the package's build command as a child process.
#[derive(Debug, Clone)]
pub struct BuildRunner {
    command: String,
}

impl BuildRunner {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Run the command in `cwd` and wait for it to exit.
    ///
    /// The child's stdout and stderr are forwarded line by line to this
    /// process's stdout and stderr while it runs. Exit code 0 is success.
    pub async fn run(&self, cwd: &Path) -> Result<()> {
        let (program, args) = split_command(&self.command)?;
        info!("Building: {}", self.command);

        let mut child = Command::new(&program)
            .args(&args)
            .current_dir(cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CpLinkError::BuildSpawn {
                command: self.command.clone(),
                source,
            })?;

        let stdout = child
            .stdout
            .take()
            .map(|out| tokio::spawn(forward_lines(out, tokio::io::stdout())));
        let stderr = child
            .stderr
            .take()
            .map(|err| tokio::spawn(forward_lines(err, tokio::io::stderr())));

        let status = child.wait().await.map_err(|source| CpLinkError::BuildSpawn {
            command: self.command.clone(),
            source,
        })?;

        // Drain whatever the child wrote just before exiting.
        for task in [stdout, stderr].into_iter().flatten() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => warn!("lost build output: {err}"),
                Err(err) => warn!("build output forwarder stopped: {err}"),
            }
        }

        debug!("build exited with {status}");
        if status.success() {
            Ok(())
        } else {
            Err(CpLinkError::BuildFailed {
                command: self.command.clone(),
                code: status.code(),
            })
        }
    }
}

/// Copy `reader` to `writer` one line at a time, flushing after each line.
///
/// Bytes are passed through untouched; build tools do not always write UTF-8.
async fn forward_lines<R, W>(reader: R, mut writer: W) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();
    loop {
        line.clear();
        if reader.read_until(b'\n', &mut line).await? == 0 {
            return Ok(());
        }
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
}

/// Split a command line into a program and its arguments using POSIX shell
/// quoting rules. Nothing else is interpreted: no pipes, globs or variables.
pub fn split_command(command: &str) -> Result<(String, Vec<String>)> {
    let words = shlex::split(command).ok_or_else(|| CpLinkError::MalformedBuildCommand {
        command: command.to_string(),
    })?;

    let mut words = words.into_iter();
    let program = words.next().ok_or(CpLinkError::EmptyBuildCommand)?;
    Ok((program, words.collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_command_plain_words() {
        let (program, args) = split_command("npm run build").unwrap();
        assert_eq!(program, "npm");
        assert_eq!(args, vec!["run", "build"]);
    }

    #[test]
    fn test_split_command_quotes_group_words() {
        let (program, args) = split_command(r#"node -e "console.log('hi there')" ''"#).unwrap();
        assert_eq!(program, "node");
        assert_eq!(args, vec!["-e", "console.log('hi there')", ""]);
    }

    #[test]
    fn test_split_command_backslash_escapes() {
        let (program, args) = split_command(r"tsc --outDir my\ dist").unwrap();
        assert_eq!(program, "tsc");
        assert_eq!(args, vec!["--outDir", "my dist"]);
    }

    #[test]
    fn test_split_command_unterminated_quote() {
        match split_command("npm run 'build").unwrap_err() {
            CpLinkError::MalformedBuildCommand { command } => assert_eq!(command, "npm run 'build"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_split_command_empty() {
        assert!(matches!(
            split_command("   "),
            Err(CpLinkError::EmptyBuildCommand)
        ));
    }

    #[tokio::test]
    async fn test_forward_lines_streams_every_line() {
        let input: &[u8] = b"one\ntwo\nthree";
        let mut output = Vec::new();
        forward_lines(input, &mut output).await.unwrap();
        assert_eq!(output, b"one\ntwo\nthree");
    }

    #[tokio::test]
    async fn test_forward_lines_passes_non_utf8_through() {
        let input: &[u8] = b"\xff\xfe bad bytes\nafter\n";
        let mut output = Vec::new();
        forward_lines(input, &mut output).await.unwrap();
        assert_eq!(output, input);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_success_on_zero_exit() {
        let dir = std::env::temp_dir();
        BuildRunner::new("true").run(&dir).await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_code() {
        let dir = std::env::temp_dir();
        let err = BuildRunner::new("sh -c 'exit 3'").run(&dir).await.unwrap_err();
        match err {
            CpLinkError::BuildFailed { code, .. } => assert_eq!(code, Some(3)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_survives_non_utf8_output() {
        let dir = std::env::temp_dir();
        BuildRunner::new(r#"sh -c "printf '\377\n'; sleep 0.2; echo after; exit 0""#)
            .run(&dir)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_run_reports_spawn_failure() {
        let dir = std::env::temp_dir();
        let err = BuildRunner::new("cp-link-no-such-program --flag")
            .run(&dir)
            .await
            .unwrap_err();
        assert!(matches!(err, CpLinkError::BuildSpawn { .. }), "{err}");
    }
}
