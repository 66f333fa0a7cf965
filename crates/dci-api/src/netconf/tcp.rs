// EOM-framed NETCONF session over a TCP stream.
//
// Used for devices (or local SSH subsystem forwarders) that expose the
// NETCONF 1.0 message layer directly on a TCP port. Every RPC waits for its
// reply under the operation deadline.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tracing::{debug, warn};

use super::codec::EomCodec;
use super::{
    Datastore, EditConfig, NetconfConnector, NetconfSession, NetconfTarget, RpcReply, rpc,
};
use crate::error::Error;
use crate::transport::{TransportConfig, deadline};

/// Opens [`TcpNetconfSession`]s with the connect/operation deadlines from a
/// [`TransportConfig`].
#[derive(Debug, Clone)]
pub struct TcpNetconfConnector {
    connect_timeout: Duration,
    timeout: Duration,
}

impl TcpNetconfConnector {
    pub fn new(transport: &TransportConfig) -> Self {
        Self {
            connect_timeout: transport.connect_timeout,
            timeout: transport.timeout,
        }
    }
}

#[async_trait]
impl NetconfConnector for TcpNetconfConnector {
    async fn connect(&self, target: &NetconfTarget) -> Result<Box<dyn NetconfSession>, Error> {
        let addr = format!("{}:{}", target.host, target.port);
        debug!(host = %target.host, port = target.port, user = %target.username, "opening NETCONF session");

        let stream = deadline(self.connect_timeout, async {
            TcpStream::connect(&addr).await.map_err(|e| Error::Connect {
                host: addr.clone(),
                reason: e.to_string(),
            })
        })
        .await?;

        let mut framed = Framed::new(stream, EomCodec::new());
        let hello = deadline(self.timeout, next_frame(&mut framed)).await?;
        let capabilities = rpc::hello_capabilities(&hello);
        if capabilities.is_empty() {
            return Err(Error::Framing("server hello carried no capabilities".into()));
        }
        let session_id = rpc::hello_session_id(&hello);
        deadline(self.timeout, async {
            framed.send(rpc::client_hello()).await
        })
        .await?;

        debug!(host = %target.host, ?session_id, caps = capabilities.len(), "NETCONF hello exchanged");
        Ok(Box::new(TcpNetconfSession {
            framed,
            host: target.host.clone(),
            capabilities,
            session_id,
            next_message_id: 1,
            timeout: self.timeout,
        }))
    }
}

async fn next_frame(framed: &mut Framed<TcpStream, EomCodec>) -> Result<String, Error> {
    framed.next().await.ok_or(Error::SessionClosed)?
}

/// One NETCONF session; dropped (and the socket closed) after `close`.
pub struct TcpNetconfSession {
    framed: Framed<TcpStream, EomCodec>,
    host: String,
    capabilities: Vec<String>,
    session_id: Option<u32>,
    next_message_id: u64,
    timeout: Duration,
}

impl TcpNetconfSession {
    async fn rpc(&mut self, body: String) -> Result<RpcReply, Error> {
        let id = self.next_message_id;
        self.next_message_id += 1;
        debug!(host = %self.host, message_id = id, "RPC {}", rpc_name(&body));

        let framed = &mut self.framed;
        let xml = deadline(self.timeout, async move {
            framed.send(rpc::envelope(id, &body)).await?;
            next_frame(framed).await
        })
        .await?;

        if rpc::element_text(&xml, "rpc-reply").is_none() {
            return Err(Error::Framing(format!(
                "expected rpc-reply for message {id}"
            )));
        }
        RpcReply::new(xml).into_result()
    }
}

/// Operation element name, for logging.
fn rpc_name(body: &str) -> &str {
    body.trim_start_matches('<')
        .split(|c: char| c.is_whitespace() || c == '>' || c == '/')
        .next()
        .unwrap_or("rpc")
}

#[async_trait]
impl NetconfSession for TcpNetconfSession {
    fn session_id(&self) -> Option<u32> {
        self.session_id
    }

    fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    async fn lock(&mut self, target: Datastore) -> Result<RpcReply, Error> {
        self.rpc(rpc::lock(target)).await
    }

    async fn unlock(&mut self, target: Datastore) -> Result<RpcReply, Error> {
        self.rpc(rpc::unlock(target)).await
    }

    async fn discard_changes(&mut self) -> Result<RpcReply, Error> {
        self.rpc(rpc::discard_changes()).await
    }

    async fn edit_config(&mut self, edit: &EditConfig) -> Result<RpcReply, Error> {
        self.rpc(rpc::edit_config(edit)).await
    }

    async fn validate(&mut self, source: Datastore) -> Result<RpcReply, Error> {
        self.rpc(rpc::validate(source)).await
    }

    async fn commit(&mut self) -> Result<RpcReply, Error> {
        self.rpc(rpc::commit()).await
    }

    async fn get(&mut self, filter: Option<&str>) -> Result<RpcReply, Error> {
        self.rpc(rpc::get(filter)).await
    }

    async fn get_config(
        &mut self,
        source: Datastore,
        filter: Option<&str>,
    ) -> Result<RpcReply, Error> {
        self.rpc(rpc::get_config(source, filter)).await
    }

    async fn dispatch(&mut self, body: &str) -> Result<RpcReply, Error> {
        self.rpc(body.to_owned()).await
    }

    async fn close(&mut self) -> Result<(), Error> {
        if let Err(e) = self.rpc(rpc::close_session()).await {
            warn!(host = %self.host, error = %e, "close-session failed, dropping transport");
        }
        self.framed.close().await
    }
}
