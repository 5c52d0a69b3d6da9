//! Engines backed by external programs.
//!
//! The recognizer runs a program that records one utterance and prints the
//! transcript on stdout (a whisper or vosk wrapper script, for instance). The
//! synthesizer runs a program such as `espeak-ng` with the text as its last
//! argument. Both child processes are killed when the adapter cancels them.

use crate::engine::{RecognitionEngine, SynthesisEngine, SynthesisError};
use async_trait::async_trait;
use dali_voice_types::RecognitionErrorCode;
use std::io;
use std::process::Stdio;
use tokio::process::Command;

fn split_command_line(line: &str) -> Option<(String, Vec<String>)> {
    let mut parts = line.split_whitespace().map(str::to_string);
    let program = parts.next()?;
    Some((program, parts.collect()))
}

#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    program: String,
    args: Vec<String>,
}

impl CommandRecognizer {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: vec![],
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Builds a recognizer from a whitespace separated command line.
    pub fn from_command_line(line: &str) -> Option<Self> {
        let (program, args) = split_command_line(line)?;
        Some(Self { program, args })
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

fn recognition_error(e: &io::Error) -> RecognitionErrorCode {
    match e.kind() {
        io::ErrorKind::NotFound => RecognitionErrorCode::Unsupported,
        io::ErrorKind::PermissionDenied => RecognitionErrorCode::NotAllowed,
        _ => RecognitionErrorCode::Other(e.to_string()),
    }
}

#[async_trait]
impl RecognitionEngine for CommandRecognizer {
    fn is_supported(&self) -> bool {
        true
    }

    async fn recognize_once(&self) -> Result<String, RecognitionErrorCode> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                tracing::error!("failed to run recognizer `{}`: {}", self.program, e);
                recognition_error(&e)
            })?;

        if !output.status.success() {
            tracing::warn!(
                "recognizer `{}` exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(RecognitionErrorCode::Other(format!(
                "exit-{}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let transcript = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        Ok(transcript)
    }
}

#[derive(Debug, Clone)]
pub struct CommandSynthesizer {
    program: String,
    args: Vec<String>,
    language_flag: Option<String>,
}

impl CommandSynthesizer {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            args: vec![],
            language_flag: None,
        }
    }

    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Passes `<flag> <voice>` before the text when a reply carries a language.
    pub fn with_language_flag(mut self, flag: &str) -> Self {
        self.language_flag = Some(flag.to_string());
        self
    }

    pub fn from_command_line(line: &str) -> Option<Self> {
        let (program, args) = split_command_line(line)?;
        Some(Self {
            program,
            args,
            language_flag: None,
        })
    }

    /// Full argument list for one utterance.
    pub fn arguments(&self, text: &str, language: Option<&str>) -> Vec<String> {
        let mut args = self.args.clone();
        if let (Some(flag), Some(language)) = (&self.language_flag, language) {
            args.push(flag.clone());
            args.push(voice_for(language).to_string());
        }
        // Reply text comes from the backend and must never parse as an option.
        args.push("--".to_string());
        args.push(text.to_string());
        args
    }
}

/// Maps a reply language tag to a synthesizer voice name.
pub fn voice_for(language: &str) -> &str {
    let tag = language.trim();
    let lower = tag.to_ascii_lowercase();
    if lower == "hindi" || lower == "hi" || lower.starts_with("hi-") {
        "hi"
    } else if lower == "english" || lower == "en" || lower.starts_with("en-") {
        "en"
    } else {
        tag
    }
}

#[async_trait]
impl SynthesisEngine for CommandSynthesizer {
    fn is_supported(&self) -> bool {
        true
    }

    async fn speak(&self, text: &str, language: Option<&str>) -> Result<(), SynthesisError> {
        let status = Command::new(&self.program)
            .args(self.arguments(text, language))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => SynthesisError::Unsupported,
                _ => SynthesisError::Failed(e.to_string()),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(SynthesisError::Failed(format!(
                "`{}` exited with {}",
                self.program, status
            )))
        }
    }
}
