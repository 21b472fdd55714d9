//! Test support: the calculator document fixture and a scripted in-process
//! Thrift server the client tests run against.
use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::thread::{self, JoinHandle};
use thrimp_core::schema::{Document, Field, Method, Service, Struct, Type};
use thrimp_core::thrift::protocol::{
    TBinaryInputProtocol, TBinaryOutputProtocol, TInputProtocol, TMessageIdentifier, TMessageType,
    TOutputProtocol, TStructIdentifier, TType,
};
use thrimp_core::thrift::transport::{
    TBufferedReadTransport, TBufferedWriteTransport, TIoChannel, TTcpChannel,
};
use thrimp_core::thrift::{ApplicationError, ApplicationErrorKind};

/// A document with one service covering the call shapes the tests exercise:
/// plain returns, struct returns, a declared exception, and a void method.
pub fn calculator_document() -> Document {
    let mut structs = HashMap::new();
    structs.insert(
        "UserProfile".to_string(),
        Struct {
            name: "UserProfile".to_string(),
            fields: vec![
                Field {
                    id: 1,
                    name: "name".to_string(),
                    ty: Type::named("string"),
                    optional: false,
                },
                Field {
                    id: 2,
                    name: "shard".to_string(),
                    ty: Type::named("ShardId"),
                    optional: true,
                },
            ],
        },
    );

    let mut exceptions = HashMap::new();
    exceptions.insert(
        "DivisionError".to_string(),
        Struct {
            name: "DivisionError".to_string(),
            fields: vec![Field {
                id: 1,
                name: "message".to_string(),
                ty: Type::named("string"),
                optional: false,
            }],
        },
    );

    let mut typedefs = HashMap::new();
    typedefs.insert("ShardId".to_string(), Type::named("i64"));

    let mut methods = HashMap::new();
    methods.insert(
        "add".to_string(),
        Method {
            name: "add".to_string(),
            return_type: Type::named("i32"),
            arguments: vec![
                Field {
                    id: 1,
                    name: "a".to_string(),
                    ty: Type::named("i32"),
                    optional: false,
                },
                Field {
                    id: 2,
                    name: "b".to_string(),
                    ty: Type::named("i32"),
                    optional: false,
                },
            ],
            exceptions: vec![],
        },
    );
    methods.insert(
        "divide".to_string(),
        Method {
            name: "divide".to_string(),
            return_type: Type::named("i32"),
            arguments: vec![
                Field {
                    id: 1,
                    name: "numerator".to_string(),
                    ty: Type::named("i32"),
                    optional: false,
                },
                Field {
                    id: 2,
                    name: "denominator".to_string(),
                    ty: Type::named("i32"),
                    optional: false,
                },
            ],
            exceptions: vec![Field {
                id: 1,
                name: "err".to_string(),
                ty: Type::named("DivisionError"),
                optional: false,
            }],
        },
    );
    methods.insert(
        "ping".to_string(),
        Method {
            name: "ping".to_string(),
            return_type: Type::named("void"),
            arguments: vec![],
            exceptions: vec![],
        },
    );
    methods.insert(
        "profile".to_string(),
        Method {
            name: "profile".to_string(),
            return_type: Type::named("UserProfile"),
            arguments: vec![Field {
                id: 1,
                name: "name".to_string(),
                ty: Type::named("string"),
                optional: false,
            }],
            exceptions: vec![],
        },
    );

    let mut services = HashMap::new();
    services.insert(
        "Calculator".to_string(),
        Service {
            name: "Calculator".to_string(),
            methods,
        },
    );

    Document {
        services,
        structs,
        exceptions,
        enums: vec![],
        typedefs,
    }
}

/// Spawns a loopback listener, accepts a single connection, and hands the
/// scripted handler the binary protocols bound to it.
pub fn spawn_server<F>(script: F) -> (SocketAddr, JoinHandle<()>)
where
    F: FnOnce(&mut dyn TInputProtocol, &mut dyn TOutputProtocol) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept client connection");
        let channel = TTcpChannel::with_stream(stream);
        let (read_half, write_half) = channel.split().expect("split channel");
        let mut input = TBinaryInputProtocol::new(TBufferedReadTransport::new(read_half), true);
        let mut output = TBinaryOutputProtocol::new(TBufferedWriteTransport::new(write_half), true);
        script(&mut input, &mut output);
    });
    (addr, handle)
}

/// Reads one incoming CALL envelope, discarding the argument payload. Returns
/// the method name and sequence id so replies can echo them.
pub fn drain_call(input: &mut dyn TInputProtocol) -> (String, i32) {
    let envelope = input.read_message_begin().expect("read call envelope");
    assert_eq!(envelope.message_type, TMessageType::Call);
    input.skip(TType::Struct).expect("skip argument struct");
    input.read_message_end().expect("read call end");
    (envelope.name, envelope.sequence_number)
}

/// Writes a REPLY envelope whose response struct body is produced by `body`
/// (typically a single success or exception field).
pub fn reply_with<F>(output: &mut dyn TOutputProtocol, method: &str, sequence_number: i32, body: F)
where
    F: FnOnce(&mut dyn TOutputProtocol),
{
    output
        .write_message_begin(&TMessageIdentifier::new(
            method,
            TMessageType::Reply,
            sequence_number,
        ))
        .expect("write reply envelope");
    output
        .write_struct_begin(&TStructIdentifier::new(format!("{method}_result")))
        .expect("write result struct");
    body(&mut *output);
    output.write_field_stop().expect("write field stop");
    output.write_struct_end().expect("end result struct");
    output.write_message_end().expect("end reply envelope");
    output.flush().expect("flush reply");
}

/// Writes an EXCEPTION envelope carrying an application error.
pub fn reply_exception(
    output: &mut dyn TOutputProtocol,
    method: &str,
    sequence_number: i32,
    kind: ApplicationErrorKind,
    message: &str,
) {
    let error = ApplicationError::new(kind, message);
    output
        .write_message_begin(&TMessageIdentifier::new(
            method,
            TMessageType::Exception,
            sequence_number,
        ))
        .expect("write exception envelope");
    thrimp_core::thrift::Error::write_application_error_to_out_protocol(&error, &mut *output)
        .expect("write application error");
    output.write_message_end().expect("end exception envelope");
    output.flush().expect("flush exception");
}
