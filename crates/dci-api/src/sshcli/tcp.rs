// Line-oriented CLI session over a TCP stream (telnet-style VTY or a local
// SSH forwarder). Handles the username/password/enable dialogue, then
// drives commands prompt by prompt.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use secrecy::ExposeSecret;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, info};

use super::codec::{CliFrame, PromptCodec};
use super::{CliConnector, CliDialect, CliSession, CliTarget};
use crate::error::Error;
use crate::transport::{TransportConfig, deadline};

#[derive(Debug, Clone)]
pub struct TcpCliConnector {
    connect_timeout: Duration,
    timeout: Duration,
}

impl TcpCliConnector {
    pub fn new(transport: &TransportConfig) -> Self {
        Self {
            connect_timeout: transport.connect_timeout,
            timeout: transport.timeout,
        }
    }
}

#[async_trait]
impl CliConnector for TcpCliConnector {
    async fn connect(&self, target: &CliTarget) -> Result<Box<dyn CliSession>, Error> {
        let addr = format!("{}:{}", target.host, target.port);
        let stream = deadline(self.connect_timeout, async {
            TcpStream::connect(&addr).await.map_err(|e| Error::Connect {
                host: addr.clone(),
                reason: e.to_string(),
            })
        })
        .await?;

        let mut session = TcpCliSession {
            framed: Framed::new(stream, PromptCodec::new(target.dialect.prompt_suffixes.clone())),
            host: target.host.clone(),
            dialect: target.dialect.clone(),
            timeout: self.timeout,
        };
        let timeout = self.timeout;
        deadline(timeout, session.login(target)).await?;
        debug!(host = %target.host, "CLI session established");
        Ok(Box::new(session))
    }
}

pub struct TcpCliSession {
    framed: Framed<TcpStream, PromptCodec>,
    host: String,
    dialect: CliDialect,
    timeout: Duration,
}

fn is_login_prompt(prompt: &str) -> bool {
    let p = prompt.to_ascii_lowercase();
    p.ends_with("username:") || p.ends_with("login:")
}

fn is_password_prompt(prompt: &str) -> bool {
    prompt.to_ascii_lowercase().ends_with("password:")
}

fn is_confirmation(prompt: &str) -> bool {
    let p = prompt.to_ascii_lowercase();
    p.contains("[y/n]") || p.contains("(y/n)") || p.contains("[yes/no]")
}

impl TcpCliSession {
    async fn next_frame(&mut self) -> Result<CliFrame, Error> {
        self.framed.next().await.ok_or(Error::SessionClosed)?
    }

    async fn send_line(&mut self, line: &str) -> Result<(), Error> {
        self.framed.send(line.to_owned()).await
    }

    async fn login(&mut self, target: &CliTarget) -> Result<(), Error> {
        let mut sent_password = false;
        loop {
            match self.next_frame().await? {
                CliFrame::Line(_) => {}
                CliFrame::Prompt(p) if is_login_prompt(&p) => {
                    self.send_line(&target.username).await?;
                }
                CliFrame::Prompt(p) if is_password_prompt(&p) => {
                    if sent_password {
                        return Err(Error::Authentication {
                            message: format!("{} rejected the password", self.host),
                        });
                    }
                    self.send_line(target.password.expose_secret()).await?;
                    sent_password = true;
                }
                CliFrame::Prompt(p) if self.is_device_prompt(&p) => break,
                CliFrame::Prompt(_) => {}
            }
        }

        if let (Some(cmd), Some(secret)) = (self.dialect.enable_command.clone(), &target.enable_secret) {
            self.send_line(&cmd).await?;
            loop {
                match self.next_frame().await? {
                    CliFrame::Prompt(p) if is_password_prompt(&p) => {
                        self.send_line(secret.expose_secret()).await?;
                    }
                    CliFrame::Prompt(p) if self.is_device_prompt(&p) => break,
                    _ => {}
                }
            }
        }

        for cmd in self.dialect.session_setup.clone() {
            self.exchange(&cmd).await?;
        }
        Ok(())
    }

    fn is_device_prompt(&self, prompt: &str) -> bool {
        !prompt.ends_with(':')
            && prompt
                .chars()
                .last()
                .is_some_and(|c| self.dialect.prompt_suffixes.contains(&c))
    }

    /// Send one line and collect output up to the next device prompt,
    /// answering confirmation prompts with `y`.
    async fn exchange(&mut self, line: &str) -> Result<String, Error> {
        self.send_line(line).await?;
        let mut out = Vec::new();
        loop {
            match self.next_frame().await? {
                CliFrame::Line(l) => out.push(l),
                CliFrame::Prompt(p) if is_confirmation(&p) => {
                    out.push(p);
                    self.send_line("y").await?;
                }
                CliFrame::Prompt(p) if self.is_device_prompt(&p) => {
                    out.push(p);
                    break;
                }
                CliFrame::Prompt(p) => out.push(p),
            }
        }
        Ok(out.join("\n"))
    }

    async fn exchange_all(&mut self, lines: &[String]) -> Result<String, Error> {
        let mut out = Vec::with_capacity(lines.len());
        for line in lines {
            out.push(self.exchange(line).await?);
        }
        Ok(out.join("\n"))
    }
}

#[async_trait]
impl CliSession for TcpCliSession {
    async fn send_config_set(&mut self, commands: &[String]) -> Result<String, Error> {
        info!(host = %self.host, commands = commands.len(), "pushing config set");
        let mut lines = Vec::with_capacity(commands.len() + 2);
        lines.push(self.dialect.enter_config.clone());
        lines.extend(commands.iter().filter(|c| !c.trim().is_empty()).cloned());
        lines.push(self.dialect.exit_config.clone());
        let timeout = self.timeout;
        deadline(timeout, self.exchange_all(&lines)).await
    }

    async fn send_command(&mut self, command: &str) -> Result<String, Error> {
        let timeout = self.timeout;
        deadline(timeout, self.exchange(command)).await
    }

    async fn save_config(&mut self) -> Result<String, Error> {
        let Some(save) = self.dialect.save_config.clone() else {
            return Ok(String::new());
        };
        let timeout = self.timeout;
        deadline(timeout, self.exchange(&save)).await
    }

    async fn close(&mut self) -> Result<(), Error> {
        let _ = self.send_line("quit").await;
        self.framed.close().await
    }
}
