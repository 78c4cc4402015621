//! Protocol client: drives one connection through its lifecycle.
//!
//! Every exchange goes through [`ConnectionState::transition`]; a response
//! the current state does not allow surfaces as a protocol error instead of
//! being absorbed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use super::connection::{connect_tcp, BoltConnection};
use super::state::{ConnectionEvent, ConnectionState};
use crate::bolt::message::{Hello, Route, Run};
use crate::bolt::{BoltError, BoltRequest, BoltResponse, BoltVersion, Success};
use crate::driver::config::{AuthToken, ServerAddress};
use crate::driver::error::{DriverError, DriverResult};
use crate::driver::record::{EagerResult, Record, ResultSummary};

/// What every new connection needs to authenticate.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub auth: AuthToken,
    pub user_agent: String,
    /// Sent in HELLO and ROUTE when the driver routes (`neo4j://`).
    pub routing_context: Option<HashMap<String, String>>,
    pub connection_timeout: Duration,
}

impl ConnectOptions {
    fn hello(&self) -> Hello {
        Hello {
            user_agent: self.user_agent.clone(),
            auth: self.auth.to_hello_entries(),
            routing: self.routing_context.clone(),
        }
    }
}

/// An authenticated Bolt connection and its lifecycle state.
pub struct BoltClient<S = TcpStream> {
    connection: BoltConnection<S>,
    state: ConnectionState,
    server_agent: Option<String>,
    connection_id: Option<String>,
}

impl BoltClient<TcpStream> {
    /// Open a TCP connection, negotiate a version and authenticate.
    pub async fn connect(address: &ServerAddress, options: &ConnectOptions) -> DriverResult<Self> {
        let stream = connect_tcp(address, options.connection_timeout)
            .await
            .map_err(|e| match e {
                BoltError::Io(io) if io.kind() == std::io::ErrorKind::TimedOut => {
                    DriverError::timeout(io.to_string())
                }
                other => DriverError::connection(format!("cannot connect to {}: {}", address, other)),
            })?;
        let client = Self::open(stream, options.hello()).await?;
        tracing::debug!(
            %address,
            version = %client.version(),
            server = client.server_agent().unwrap_or("unknown"),
            "connection opened"
        );
        Ok(client)
    }
}

impl<S> BoltClient<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Handshake and HELLO over an already open stream.
    pub async fn open(stream: S, hello: Hello) -> DriverResult<Self> {
        let mut state = ConnectionState::Disconnected.transition(ConnectionEvent::Connect)?;

        let mut connection = BoltConnection::handshake(stream).await?;
        state = state.transition(ConnectionEvent::Negotiated)?;

        connection.send(BoltRequest::Hello(hello)).await?;
        match connection.recv().await? {
            BoltResponse::Success(success) => {
                state = state.transition(ConnectionEvent::Authenticated)?;
                Ok(Self {
                    connection,
                    state,
                    server_agent: success.server().map(String::from),
                    connection_id: success.connection_id().map(String::from),
                })
            }
            BoltResponse::Failure(failure) => {
                connection.shutdown().await;
                Err(DriverError::from_failure(failure))
            }
            other => {
                connection.shutdown().await;
                Err(unexpected("HELLO", &other))
            }
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn version(&self) -> BoltVersion {
        self.connection.version()
    }

    pub fn server_agent(&self) -> Option<&str> {
        self.server_agent.as_deref()
    }

    pub fn connection_id(&self) -> Option<&str> {
        self.connection_id.as_deref()
    }

    /// Mark the connection unusable after an abandoned or broken exchange.
    pub fn mark_failed(&mut self) {
        if let Ok(next) = self.state.transition(ConnectionEvent::Fatal) {
            self.state = next;
        }
    }

    fn advance(&mut self, event: ConnectionEvent) -> DriverResult<()> {
        self.state = self.state.transition(event)?;
        Ok(())
    }

    fn ensure_ready(&self, what: &str) -> DriverResult<()> {
        if self.state == ConnectionState::Ready {
            Ok(())
        } else {
            Err(DriverError::protocol(format!(
                "cannot {} on a connection in state {:?}",
                what, self.state
            )))
        }
    }

    /// Run a query in an auto-commit transaction and pull every record.
    ///
    /// A server FAILURE leaves the connection in `AwaitingReset`; any other
    /// error leaves it `Failed`.
    pub async fn run(&mut self, run: Run, fetch_size: i64) -> DriverResult<EagerResult> {
        self.ensure_ready("run a query")?;
        let result = self.run_and_pull(run, fetch_size).await;
        if let Err(e) = &result {
            if e.is_fatal_to_connection() {
                self.mark_failed();
            }
        }
        result
    }

    async fn run_and_pull(&mut self, run: Run, fetch_size: i64) -> DriverResult<EagerResult> {
        // RUN and the first PULL share a round trip
        self.connection
            .send_all([BoltRequest::Run(run), BoltRequest::Pull { n: fetch_size }])
            .await?;

        let run_success = match self.connection.recv().await? {
            BoltResponse::Success(success) => {
                self.advance(ConnectionEvent::RunAccepted)?;
                success
            }
            BoltResponse::Failure(failure) => {
                self.advance(ConnectionEvent::ServerFailure)?;
                // the pipelined PULL is answered with IGNORED
                match self.connection.recv().await? {
                    BoltResponse::Ignored => {}
                    other => return Err(unexpected("PULL after a failed RUN", &other)),
                }
                return Err(DriverError::from_failure(failure));
            }
            other => return Err(unexpected("RUN", &other)),
        };

        let keys: Arc<[String]> = run_success.fields().into();
        let mut records = Vec::new();
        loop {
            match self.connection.recv().await? {
                BoltResponse::Record(fields) => records.push(Record::decode(&keys, fields)?),
                BoltResponse::Success(pull) if pull.has_more() => {
                    self.connection.send(BoltRequest::Pull { n: fetch_size }).await?;
                }
                BoltResponse::Success(pull) => {
                    self.advance(ConnectionEvent::StreamCompleted)?;
                    return Ok(EagerResult {
                        keys: keys.to_vec(),
                        records,
                        summary: ResultSummary::from_metadata(&run_success, &pull),
                    });
                }
                BoltResponse::Failure(failure) => {
                    self.advance(ConnectionEvent::ServerFailure)?;
                    return Err(DriverError::from_failure(failure));
                }
                other => return Err(unexpected("PULL", &other)),
            }
        }
    }

    /// Clear a server failure. A connection whose RESET fails is `Failed`.
    pub async fn reset(&mut self) -> DriverResult<()> {
        let result = self.send_reset().await;
        if result.is_err() {
            self.mark_failed();
        }
        result
    }

    async fn send_reset(&mut self) -> DriverResult<()> {
        if !self.state.accepts_requests() {
            return Err(DriverError::protocol(format!(
                "cannot reset a connection in state {:?}",
                self.state
            )));
        }
        self.connection.send(BoltRequest::Reset).await?;
        match self.connection.recv().await? {
            BoltResponse::Success(_) => self.advance(ConnectionEvent::ResetSucceeded),
            BoltResponse::Failure(failure) => Err(DriverError::from_failure(failure)),
            other => Err(unexpected("RESET", &other)),
        }
    }

    /// Ask a router for the routing table of `database`.
    ///
    /// Returns the raw SUCCESS metadata; its `rt` entry holds the table.
    pub async fn route(
        &mut self,
        routing: HashMap<String, String>,
        bookmarks: Vec<String>,
        database: Option<String>,
    ) -> DriverResult<Success> {
        self.ensure_ready("request a routing table")?;
        let request = BoltRequest::Route(Route {
            routing,
            bookmarks,
            database,
        });
        let response = match self.connection.send(request).await {
            Ok(()) => self.connection.recv().await,
            Err(e) => Err(e),
        };
        match response {
            Ok(BoltResponse::Success(success)) => Ok(success),
            Ok(BoltResponse::Failure(failure)) => {
                self.advance(ConnectionEvent::ServerFailure)?;
                Err(DriverError::from_failure(failure))
            }
            Ok(other) => {
                self.mark_failed();
                Err(unexpected("ROUTE", &other))
            }
            Err(e) => {
                self.mark_failed();
                Err(e.into())
            }
        }
    }

    /// Say GOODBYE if the connection is still usable, then shut the socket.
    pub async fn close(&mut self) {
        if self.state.accepts_requests() {
            let _ = self.connection.send(BoltRequest::Goodbye).await;
        }
        self.connection.shutdown().await;
        self.state = ConnectionState::Closed;
    }
}

impl<S> std::fmt::Debug for BoltClient<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoltClient")
            .field("state", &self.state)
            .field("connection", &self.connection)
            .field("server_agent", &self.server_agent)
            .field("connection_id", &self.connection_id)
            .finish()
    }
}

fn unexpected(exchange: &str, response: &BoltResponse) -> DriverError {
    DriverError::protocol(format!("unexpected {} in response to {}", response.name(), exchange))
}
