use anyhow::{anyhow, Result};
use tokio::process::Command;

/// Speech-to-text capture through an external recorder/transcriber.
///
/// The command records until it decides the user has stopped speaking and
/// prints the transcript on stdout, e.g. a small whisper.cpp wrapper script.
#[derive(Debug, Clone)]
pub struct Dictation {
    program: String,
    args: Vec<String>,
}

impl Dictation {
    /// Build from a configured argv; `None` when nothing usable is configured
    pub fn from_command(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        if program.trim().is_empty() {
            return None;
        }
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Run the command once and return the trimmed transcript
    pub async fn capture(&self) -> Result<String> {
        log::info!("Starting dictation with {}", self.program);
        let output = Command::new(&self.program)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| anyhow!("Could not start {}: {}", self.program, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            ));
        }

        let transcript = String::from_utf8_lossy(&output.stdout).trim().to_string();
        log::info!("Dictation finished ({} chars)", transcript.len());
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_requires_program() {
        assert!(Dictation::from_command(&[]).is_none());
        assert!(Dictation::from_command(&["  ".to_string()]).is_none());
        let dictation = Dictation::from_command(&["whisper-dictate".to_string(), "--once".to_string()]).unwrap();
        assert_eq!(dictation.program(), "whisper-dictate");
        assert_eq!(dictation.args, vec!["--once".to_string()]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_returns_trimmed_stdout() {
        let dictation = Dictation::from_command(&[
            "sh".to_string(),
            "-c".to_string(),
            "printf '  hello world \\n'".to_string(),
        ])
        .unwrap();
        assert_eq!(dictation.capture().await.unwrap(), "hello world");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_capture_reports_failure() {
        let dictation =
            Dictation::from_command(&["sh".to_string(), "-c".to_string(), "exit 3".to_string()]).unwrap();
        assert!(dictation.capture().await.is_err());
    }
}
