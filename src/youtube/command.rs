use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::{PlatformError, PlatformResult};

/// Captured result of a finished tool invocation.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// External tool invocation representation
#[derive(Debug, Clone)]
pub struct ToolCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
    pub timeout: Option<Duration>,
}

impl ToolCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
            timeout: None,
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Kill the process when it runs longer than `timeout`
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Metadata only, no media download
    pub fn skip_download(self) -> Self {
        self.arg("--skip-download")
    }

    pub fn no_warnings(self) -> Self {
        self.arg("--no-warnings")
    }

    /// Print the full info record as a single JSON document
    pub fn dump_single_json(self) -> Self {
        self.arg("--dump-single-json")
    }

    /// Do not resolve playlist entries while probing
    pub fn flat_playlist(self) -> Self {
        self.arg("--flat-playlist")
    }

    /// Treat a video link carrying a playlist context as the video alone
    pub fn no_playlist(self) -> Self {
        self.arg("--no-playlist")
    }

    /// Write human and generated captions for `languages` in `format`
    pub fn write_captions(self, languages: &[String], format: &str) -> Self {
        self.arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs")
            .arg(languages.join(","))
            .arg("--sub-format")
            .arg(format)
    }

    pub fn output_template<P: AsRef<Path>>(self, template: P) -> Self {
        self.arg("-o").arg(template.as_ref().to_string_lossy().to_string())
    }

    /// Run the command and capture its output. A non-zero exit is not an
    /// error here; callers classify stderr themselves.
    pub async fn run(&self) -> PlatformResult<ToolOutput> {
        debug!("Executing {}: {} {:?}", self.description, self.binary_path, self.args);

        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, cmd.output())
                .await
                .map_err(|_| PlatformError::Timeout(limit))?,
            None => cmd.output().await,
        }
        .map_err(|e| PlatformError::ToolUnavailable {
            tool: self.binary_path.clone(),
            reason: e.to_string(),
        })?;

        Ok(ToolOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

/// Builder for the yt-dlp invocations used by the platform
pub struct ToolCommandBuilder {
    binary_path: String,
}

impl ToolCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    pub fn version_check(&self) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Version check").arg("--version")
    }

    /// Single-record metadata probe for a URL
    pub fn probe(&self, url: &str) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Metadata probe")
            .dump_single_json()
            .skip_download()
            .no_warnings()
            .no_playlist()
            .flat_playlist()
            .arg(url)
    }

    /// Caption download into `output_dir`, one file per language
    pub fn caption_file<P: AsRef<Path>>(&self, url: &str, languages: &[String], output_dir: P) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Caption download")
            .skip_download()
            .no_warnings()
            .write_captions(languages, "vtt")
            .output_template(output_dir.as_ref().join("%(id)s.%(ext)s"))
            .arg(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_command_shape() {
        let cmd = ToolCommandBuilder::new("yt-dlp").probe("https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(cmd.binary_path, "yt-dlp");
        assert_eq!(
            cmd.args,
            vec![
                "--dump-single-json",
                "--skip-download",
                "--no-warnings",
                "--no-playlist",
                "--flat-playlist",
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            ]
        );
    }

    #[test]
    fn test_video_in_playlist_context_stays_single() {
        let url = "https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=PL590L5WQmH8fJ54F369BLDSqIwcs-TCfs";
        let cmd = ToolCommandBuilder::new("yt-dlp").probe(url);
        let no_playlist = cmd.args.iter().position(|a| a == "--no-playlist").unwrap();
        let target = cmd.args.iter().position(|a| a == url).unwrap();
        assert!(no_playlist < target);
        assert_eq!(target, cmd.args.len() - 1);
    }

    #[test]
    fn test_caption_file_command_shape() {
        let languages = vec!["en".to_string(), "en-US".to_string()];
        let cmd = ToolCommandBuilder::new("yt-dlp").caption_file("URL", &languages, "/tmp/captions");
        let joined = cmd.args.join(" ");
        assert!(joined.contains("--sub-langs en,en-US"));
        assert!(joined.contains("--sub-format vtt"));
        assert!(joined.contains("-o /tmp/captions/%(id)s.%(ext)s"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("URL"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_unavailable() {
        let result = ToolCommand::new("/nonexistent/reangle-tool", "Missing")
            .arg("--version")
            .run()
            .await;
        assert!(matches!(result, Err(PlatformError::ToolUnavailable { .. })));
    }
}
