//! Connection lifecycle state machine.
//!
//! ```text
//! Disconnected -> Handshaking -> Authenticating -> Ready <-> InTransaction
//!                                                    ^            |
//!                                                    |      ServerFailure
//!                                                    |            v
//!                                                    +------ AwaitingReset
//!
//! any open state --Fatal--> Failed;  any state --Close--> Closed
//! ```
//!
//! `transition` is defined for every (state, event) pair: pairs outside the
//! diagram return [`IllegalTransition`] instead of leaving the state as is.

use std::fmt;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No socket yet
    Disconnected,
    /// Socket open, version negotiation in progress
    Handshaking,
    /// Version agreed, HELLO in flight
    Authenticating,
    /// Idle and reusable
    Ready,
    /// A query is running in an auto-commit transaction
    InTransaction,
    /// The server reported a failure; only RESET is accepted
    AwaitingReset,
    /// I/O or protocol error; the connection must be destroyed
    Failed,
    /// Closed on purpose
    Closed,
}

/// Something that happened on a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionEvent {
    /// TCP connection established
    Connect,
    /// Server accepted a protocol version
    Negotiated,
    /// HELLO succeeded
    Authenticated,
    /// RUN succeeded, records may follow
    RunAccepted,
    /// Final PULL summary received
    StreamCompleted,
    /// FAILURE received
    ServerFailure,
    /// RESET succeeded
    ResetSucceeded,
    /// Socket error, undecodable data or abandoned exchange
    Fatal,
    /// Deliberate close
    Close,
}

/// A (state, event) pair the lifecycle does not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IllegalTransition {
    pub from: ConnectionState,
    pub event: ConnectionEvent,
}

impl fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "illegal connection transition: {:?} on {:?}", self.event, self.from)
    }
}

impl std::error::Error for IllegalTransition {}

impl ConnectionState {
    pub fn transition(self, event: ConnectionEvent) -> Result<ConnectionState, IllegalTransition> {
        use ConnectionEvent as E;
        use ConnectionState as S;

        let next = match (self, event) {
            (S::Closed, E::Close) => S::Closed,
            (S::Closed, _) => return Err(IllegalTransition { from: self, event }),
            (_, E::Close) => S::Closed,

            (S::Failed, _) => return Err(IllegalTransition { from: self, event }),
            (_, E::Fatal) => S::Failed,

            (S::Disconnected, E::Connect) => S::Handshaking,
            (S::Handshaking, E::Negotiated) => S::Authenticating,
            (S::Authenticating, E::Authenticated) => S::Ready,
            // a rejected HELLO leaves nothing to reset
            (S::Authenticating, E::ServerFailure) => S::Failed,

            (S::Ready, E::RunAccepted) => S::InTransaction,
            (S::Ready, E::ServerFailure) => S::AwaitingReset,
            (S::Ready, E::ResetSucceeded) => S::Ready,

            (S::InTransaction, E::StreamCompleted) => S::Ready,
            (S::InTransaction, E::ServerFailure) => S::AwaitingReset,
            (S::InTransaction, E::ResetSucceeded) => S::Ready,

            (S::AwaitingReset, E::ResetSucceeded) => S::Ready,
            (S::AwaitingReset, E::ServerFailure) => S::AwaitingReset,

            _ => return Err(IllegalTransition { from: self, event }),
        };
        Ok(next)
    }

    /// Requests may be written in this state.
    pub fn accepts_requests(self) -> bool {
        matches!(
            self,
            ConnectionState::Authenticating
                | ConnectionState::Ready
                | ConnectionState::InTransaction
                | ConnectionState::AwaitingReset
        )
    }

    /// The connection can never be used again.
    pub fn is_terminal(self) -> bool {
        matches!(self, ConnectionState::Failed | ConnectionState::Closed)
    }
}
