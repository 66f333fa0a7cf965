// Interactive CLI session abstraction
//
// The core pushes newline-separated command lists and gets the device's
// echoed output back as text. Whether the bytes travel over SSH or a plain
// line-oriented TCP transport is the connector's business.

mod codec;
mod tcp;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Error;

pub use codec::{CliFrame, PromptCodec};
pub use tcp::{TcpCliConnector, TcpCliSession};

/// Vendor-specific command vocabulary around a config push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliDialect {
    /// Sent once after login, e.g. to disable paging.
    pub session_setup: Vec<String>,
    /// Privilege escalation command, answered with the enable secret.
    pub enable_command: Option<String>,
    pub enter_config: String,
    pub exit_config: String,
    /// Persist the running configuration. Confirmation prompts are answered
    /// with `y`.
    pub save_config: Option<String>,
    /// Trailing characters that mark a prompt awaiting input.
    pub prompt_suffixes: Vec<char>,
}

impl CliDialect {
    /// Huawei VRP (NetEngine).
    pub fn huawei_vrp() -> Self {
        Self {
            session_setup: vec!["screen-length 0 temporary".into()],
            enable_command: Some("super".into()),
            enter_config: "system-view".into(),
            exit_config: "return".into(),
            save_config: Some("save".into()),
            prompt_suffixes: vec!['>', ']', '#', ':'],
        }
    }

    /// Junos (MX). The commit happens on leaving configuration mode.
    pub fn junos() -> Self {
        Self {
            session_setup: vec!["set cli screen-length 0".into()],
            enable_command: None,
            enter_config: "configure".into(),
            exit_config: "commit and-quit".into(),
            save_config: None,
            prompt_suffixes: vec!['>', '#', '%', ':'],
        }
    }
}

/// Where, as whom, and in which dialect to open a CLI session.
#[derive(Debug, Clone)]
pub struct CliTarget {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub enable_secret: Option<SecretString>,
    pub dialect: CliDialect,
}

/// An authenticated CLI session.
#[async_trait]
pub trait CliSession: Send {
    /// Enter configuration mode, run `commands` in order, leave it again.
    /// Returns everything the device echoed.
    async fn send_config_set(&mut self, commands: &[String]) -> Result<String, Error>;
    /// Run one operational command and return its output.
    async fn send_command(&mut self, command: &str) -> Result<String, Error>;
    /// Persist configuration; empty output when the dialect has no save step.
    async fn save_config(&mut self) -> Result<String, Error>;
    async fn close(&mut self) -> Result<(), Error>;
}

/// Opens sessions. One session per executor call; nothing is pooled.
#[async_trait]
pub trait CliConnector: Send + Sync {
    async fn connect(&self, target: &CliTarget) -> Result<Box<dyn CliSession>, Error>;
}
