//! # Thrimp Client
//!
//! This module implements the session and call-framing layer: one
//! [`ThrimpClient`] per logical service connection, owning the transport, the
//! binary protocol codecs bound to it, and the sequence counter.
//!
//! ## Call lifecycle
//!
//! 1. **Send**: lazily open the transport, bump the sequence id, write the
//!    message envelope and a synthetic request struct whose fields are the
//!    method's declared arguments matched positionally, then flush.
//! 2. **Receive**: read the response envelope; an `Exception` message kind
//!    carries an application-level error, otherwise the sequence id must match
//!    the outstanding request. The response struct's field 0 is the success
//!    slot and fields `1..=N` are the method's declared exceptions.
//!
//! ## Session state
//!
//! A session is not safe for concurrent calls: `call` takes `&mut self`, which
//! makes the serialization requirement a compile-time property. Any failure
//! other than a decoded server exception leaves the stream in an unknown state,
//! so the session latches into a faulted state and refuses further calls until
//! [`ThrimpClient::close`] is invoked; the next call then reconnects lazily.
use crate::codec::{CodecError, ValueReader, ValueWriter};
use crate::registry::ResolvedService;
use crate::schema::Method;
use serde_json::Value;
use std::io::ErrorKind;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;
use thrift::protocol::{
    TBinaryInputProtocol, TBinaryOutputProtocol, TInputProtocol, TMessageIdentifier, TMessageType,
    TOutputProtocol, TStructIdentifier, TType,
};
use thrift::transport::{
    ReadHalf, TBufferedReadTransport, TBufferedWriteTransport, TIoChannel, TTcpChannel, WriteHalf,
};

/// Errors that can occur while opening the transport.
#[derive(Debug, thiserror::Error)]
pub enum ClientConnectError {
    #[error("Invalid endpoint '{0}': {1}")]
    InvalidEndpoint(String, #[source] std::io::Error),
    #[error("Endpoint '{0}' did not resolve to any address")]
    NoAddress(String),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] std::io::Error),
    #[error("Failed to set up the protocol stack for '{0}': {1}")]
    Channel(String, #[source] thrift::Error),
}

/// Errors that can occur during a dynamic call.
///
/// [`CallError::Remote`] and [`CallError::ServiceException`] are completed protocol
/// exchanges — the server answered, with an error — and leave the session usable.
/// Every other variant faults the session.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("Method '{0}' not found")]
    UnknownMethod(String),
    #[error("Missing positional argument for parameter '{name}' (id {id})")]
    MissingArgument { name: String, id: i16 },
    #[error("Response out of sequence: expected {expected}, received {received}")]
    SequenceMismatch { expected: i32, received: i32 },
    #[error("Unexpected field id {id} in the response to '{method}'")]
    UnexpectedResponseField { method: String, id: i16 },
    #[error("Session is faulted; close it before issuing further calls")]
    SessionFaulted,
    #[error("Connection failed: {0}")]
    Connect(#[from] ClientConnectError),
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("Wire protocol failure: {0}")]
    Protocol(#[from] thrift::Error),
    #[error("Server exception ({:?}): {}", .0.kind, .0.message)]
    Remote(thrift::ApplicationError),
    #[error("Call raised '{name}': {value}")]
    ServiceException { name: String, value: Value },
}

impl CallError {
    fn faults_session(&self) -> bool {
        !matches!(
            self,
            CallError::Remote(_) | CallError::ServiceException { .. }
        )
    }
}

type SessionInputProtocol = TBinaryInputProtocol<TBufferedReadTransport<ReadHalf<TTcpChannel>>>;
type SessionOutputProtocol = TBinaryOutputProtocol<TBufferedWriteTransport<WriteHalf<TTcpChannel>>>;

struct Connection {
    stream: TcpStream,
    input: SessionInputProtocol,
    output: SessionOutputProtocol,
}

impl Connection {
    fn open(endpoint: &str, timeout: Duration) -> Result<Connection, ClientConnectError> {
        let address = endpoint
            .to_socket_addrs()
            .map_err(|source| ClientConnectError::InvalidEndpoint(endpoint.to_string(), source))?
            .next()
            .ok_or_else(|| ClientConnectError::NoAddress(endpoint.to_string()))?;

        let stream = TcpStream::connect_timeout(&address, timeout)
            .map_err(|source| ClientConnectError::ConnectionFailed(endpoint.to_string(), source))?;

        // Keep our own handle on the stream so `close` can shut the socket down;
        // the channel works on a clone.
        let channel = TTcpChannel::with_stream(
            stream
                .try_clone()
                .map_err(|source| ClientConnectError::ConnectionFailed(endpoint.to_string(), source))?,
        );
        let (read_half, write_half) = channel
            .split()
            .map_err(|source| ClientConnectError::Channel(endpoint.to_string(), source))?;

        tracing::debug!(endpoint, "transport opened");

        Ok(Connection {
            stream,
            input: TBinaryInputProtocol::new(TBufferedReadTransport::new(read_half), true),
            output: TBinaryOutputProtocol::new(TBufferedWriteTransport::new(write_half), true),
        })
    }

    fn shutdown(self) -> std::io::Result<()> {
        match self.stream.shutdown(Shutdown::Both) {
            Err(error) if error.kind() == ErrorKind::NotConnected => Ok(()),
            result => result,
        }
    }
}

/// A dynamic Thrift client session: transport, protocol codecs, sequence counter,
/// and the resolved service schema.
pub struct ThrimpClient {
    endpoint: String,
    connect_timeout: Duration,
    service: Arc<ResolvedService>,
    connection: Option<Connection>,
    sequence_number: i32,
    faulted: bool,
}

impl ThrimpClient {
    /// Creates a session without touching the network; the transport is opened
    /// lazily on the first call.
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        service: Arc<ResolvedService>,
    ) -> Self {
        ThrimpClient {
            endpoint: endpoint.into(),
            connect_timeout,
            service,
            connection: None,
            sequence_number: 0,
            faulted: false,
        }
    }

    /// Creates a session and opens the transport eagerly.
    pub fn connect(
        endpoint: impl Into<String>,
        connect_timeout: Duration,
        service: Arc<ResolvedService>,
    ) -> Result<Self, ClientConnectError> {
        let mut client = Self::new(endpoint, connect_timeout, service);
        client.ensure_open()?;
        Ok(client)
    }

    /// The resolved service this session is bound to.
    pub fn service(&self) -> &ResolvedService {
        &self.service
    }

    /// Whether a previous call left the session in a faulted state.
    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Performs one request/response round trip.
    ///
    /// `args` are matched to the method's declared arguments by their 1-based
    /// argument IDs. On success the decoded return value is produced (`Null` for
    /// void methods); a server-side exception is surfaced as the call's error.
    pub fn call(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        if self.faulted {
            return Err(CallError::SessionFaulted);
        }
        match self.call_inner(method, args) {
            Ok(value) => Ok(value),
            Err(error) => {
                if error.faults_session() {
                    tracing::debug!(method, %error, "call faulted the session");
                    self.faulted = true;
                }
                Err(error)
            }
        }
    }

    /// Shuts the transport down and clears the fault latch. The next call
    /// reconnects lazily.
    pub fn close(&mut self) -> std::io::Result<()> {
        self.faulted = false;
        match self.connection.take() {
            Some(connection) => {
                tracing::debug!(endpoint = %self.endpoint, "closing transport");
                connection.shutdown()
            }
            None => Ok(()),
        }
    }

    fn ensure_open(&mut self) -> Result<&mut Connection, ClientConnectError> {
        match self.connection {
            Some(ref mut connection) => Ok(connection),
            None => {
                let connection = Connection::open(&self.endpoint, self.connect_timeout)?;
                Ok(self.connection.insert(connection))
            }
        }
    }

    fn call_inner(&mut self, method: &str, args: &[Value]) -> Result<Value, CallError> {
        self.send(method, args)?;
        self.receive(method)
    }

    fn send(&mut self, method_name: &str, args: &[Value]) -> Result<(), CallError> {
        let service = Arc::clone(&self.service);
        self.sequence_number += 1;
        let sequence_number = self.sequence_number;
        let connection = self.ensure_open()?;

        tracing::debug!(method = method_name, sequence_number, "sending call");

        connection.output.write_message_begin(&TMessageIdentifier::new(
            method_name,
            TMessageType::Call,
            sequence_number,
        ))?;

        let method = service
            .method(method_name)
            .ok_or_else(|| CallError::UnknownMethod(method_name.to_string()))?;

        connection
            .output
            .write_struct_begin(&TStructIdentifier::new(format!(
                "{}{}Args",
                service.name(),
                method.name
            )))?;
        let mut writer = ValueWriter::new(&mut connection.output, &service);
        for argument in &method.arguments {
            let position = usize::try_from(argument.id)
                .ok()
                .and_then(|id| id.checked_sub(1));
            let value = position.and_then(|position| args.get(position)).ok_or_else(|| {
                CallError::MissingArgument {
                    name: argument.name.clone(),
                    id: argument.id,
                }
            })?;
            writer.write_field(argument, value)?;
        }
        connection.output.write_field_stop()?;
        connection.output.write_struct_end()?;
        connection.output.write_message_end()?;
        connection.output.flush()?;
        Ok(())
    }

    fn receive(&mut self, method_name: &str) -> Result<Value, CallError> {
        let service = Arc::clone(&self.service);
        let expected = self.sequence_number;
        let connection = self.ensure_open()?;

        let envelope = connection.input.read_message_begin()?;

        if envelope.message_type == TMessageType::Exception {
            let remote =
                thrift::Error::read_application_error_from_in_protocol(&mut connection.input)?;
            connection.input.read_message_end()?;
            tracing::debug!(method = method_name, "server returned an application exception");
            return Err(CallError::Remote(remote));
        }

        if envelope.sequence_number != expected {
            return Err(CallError::SequenceMismatch {
                expected,
                received: envelope.sequence_number,
            });
        }

        let method = service
            .method(method_name)
            .ok_or_else(|| CallError::UnknownMethod(method_name.to_string()))?;

        let outcome = read_response(&mut connection.input, &service, method)?;
        connection.input.read_message_end()?;

        match outcome {
            Response::Success(value) => Ok(value),
            Response::ServiceException { name, value } => {
                Err(CallError::ServiceException { name, value })
            }
        }
    }
}

enum Response {
    Success(Value),
    ServiceException { name: String, value: Value },
}

/// Reads the response struct: field 0 is the success slot, typed by the method's
/// declared return type; fields `1..=N` are the declared exceptions in declared
/// order. Whatever follows the meaningful field is read and discarded until the
/// stop marker.
fn read_response(
    input: &mut dyn TInputProtocol,
    service: &ResolvedService,
    method: &Method,
) -> Result<Response, CallError> {
    input.read_struct_begin()?;

    let header = input.read_field_begin()?;
    if header.field_type == TType::Stop {
        input.read_struct_end()?;
        return Ok(Response::Success(Value::Null));
    }

    let index = header.id.unwrap_or(0);
    let outcome = if index == 0 {
        let value = ValueReader::new(&mut *input, service).read_value(&method.return_type)?;
        Response::Success(value)
    } else if let Some(declared) = usize::try_from(index)
        .ok()
        .and_then(|index| index.checked_sub(1))
        .and_then(|index| method.exceptions.get(index))
    {
        let value = ValueReader::new(&mut *input, service).read_value(&declared.ty)?;
        Response::ServiceException {
            name: declared.ty.name.clone(),
            value,
        }
    } else {
        return Err(CallError::UnexpectedResponseField {
            method: method.name.clone(),
            id: index,
        });
    };
    input.read_field_end()?;

    loop {
        let extra = input.read_field_begin()?;
        if extra.field_type == TType::Stop {
            break;
        }
        input.skip(extra.field_type)?;
        input.read_field_end()?;
    }
    input.read_struct_end()?;

    Ok(outcome)
}
