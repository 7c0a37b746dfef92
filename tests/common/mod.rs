//! Shared test infrastructure for catalog, packet and loopback tests.

#![allow(dead_code)]

use std::io;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::{DNSClass, Name, RData, RecordType};
use hickory_proto::serialize::binary::{BinDecodable, BinDecoder, BinEncoder};
use hickory_server::authority::{Catalog, MessageRequest, MessageResponse};
use hickory_server::proto::rr::Record;
use hickory_server::proto::xfer::Protocol;
use hickory_server::server::{Request, RequestHandler, ResponseHandler, ResponseInfo};

use registry_dns::entry::{Endpoint, Location, Resolution, ServicePort, ServiceEntry};
use registry_dns::resolver::Resolver;
use registry_dns::server::build_catalog;
use registry_dns::state::SnapshotStore;
use registry_dns::table::TableBuilder;

pub const TTL: u32 = 3600;

// --- TestResponseHandler ---

/// Captures the serialized DNS response for inspection in tests.
#[derive(Clone)]
pub struct TestResponseHandler {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl TestResponseHandler {
    pub fn new() -> Self {
        Self {
            buf: Arc::new(Mutex::new(Vec::with_capacity(512))),
        }
    }

    /// Parse the captured wire bytes into a `Message`.
    pub fn into_message(self) -> Message {
        let buf = self.buf.lock().unwrap();
        assert!(!buf.is_empty(), "no response was captured");
        Message::from_vec(&buf).expect("failed to parse captured DNS response")
    }
}

#[async_trait]
impl ResponseHandler for TestResponseHandler {
    async fn send_response<'a>(
        &mut self,
        response: MessageResponse<
            '_,
            'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
            impl Iterator<Item = &'a Record> + Send + 'a,
        >,
    ) -> io::Result<ResponseInfo> {
        let mut buf = self.buf.lock().unwrap();
        buf.clear();
        let mut encoder = BinEncoder::new(&mut *buf);
        encoder.set_max_size(u16::MAX);
        response
            .destructive_emit(&mut encoder)
            .map_err(io::Error::other)
    }
}

// --- Entry builders ---

/// A valid static-resolution entry.
pub fn entry(name: &str, hosts: &[&str], addresses: &[&str]) -> ServiceEntry {
    ServiceEntry {
        name: name.to_string(),
        namespace: "default".to_string(),
        hosts: hosts.iter().map(|h| h.to_string()).collect(),
        addresses: addresses.iter().map(|a| a.to_string()).collect(),
        ports: vec![ServicePort {
            number: 443,
            protocol: "TLS".to_string(),
            name: "tls".to_string(),
        }],
        location: Location::MeshExternal,
        resolution: Resolution::Static,
        endpoints: vec![Endpoint {
            address: "192.168.10.1".to_string(),
        }],
    }
}

/// An entry whose callers supply their own destination IP.
pub fn passthrough_entry(name: &str, hosts: &[&str], addresses: &[&str]) -> ServiceEntry {
    ServiceEntry {
        resolution: Resolution::None,
        endpoints: Vec::new(),
        ..entry(name, hosts, addresses)
    }
}

pub fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

/// Store holding a table built from `entries`.
pub fn store_with(entries: &[ServiceEntry]) -> SnapshotStore {
    let store = SnapshotStore::new();
    store.replace(TableBuilder::build(entries).0);
    store
}

pub fn catalog_for(store: &SnapshotStore) -> Catalog {
    build_catalog(Resolver::new(store.clone()), TTL)
}

// --- Query/Request construction ---

/// Build wire-format bytes for a DNS query.
pub fn build_query_bytes(name: &str, record_type: RecordType, id: u16) -> Vec<u8> {
    let mut msg = Message::new();
    msg.set_id(id);
    msg.set_message_type(MessageType::Query);
    msg.set_op_code(OpCode::Query);
    msg.set_recursion_desired(true);
    let mut query = Query::new();
    query.set_name(Name::from_ascii(name).unwrap());
    query.set_query_type(record_type);
    query.set_query_class(DNSClass::IN);
    msg.add_query(query);
    msg.to_vec().unwrap()
}

/// Build a full `Request` as if received over UDP.
pub fn build_request(name: &str, record_type: RecordType, id: u16) -> Request {
    let bytes = build_query_bytes(name, record_type, id);
    let mut decoder = BinDecoder::new(&bytes);
    let msg = MessageRequest::read(&mut decoder).expect("failed to parse MessageRequest");
    let src: SocketAddr = "10.0.0.100:53000".parse().unwrap();
    Request::new(msg, src, Protocol::Udp)
}

/// Execute a query through the catalog and return the parsed response.
pub async fn execute_query(
    catalog: &Catalog,
    name: &str,
    record_type: RecordType,
    id: u16,
) -> Message {
    let request = build_request(name, record_type, id);
    let handler = TestResponseHandler::new();
    catalog.handle_request(&request, handler.clone()).await;
    handler.into_message()
}

// --- Response helpers ---

/// Extract A addresses from a response, in answer order.
pub fn extract_a_ips(msg: &Message) -> Vec<Ipv4Addr> {
    msg.answers()
        .iter()
        .filter_map(|r| match r.data() {
            RData::A(a) => Some(a.0),
            _ => None,
        })
        .collect()
}

/// Assert response code.
pub fn assert_response_code(msg: &Message, expected: ResponseCode) {
    assert_eq!(
        msg.response_code(),
        expected,
        "expected {:?}, got {:?}",
        expected,
        msg.response_code()
    );
}

/// Assert response is successful with exactly the expected IPs.
pub fn assert_a_response(msg: &Message, expected_ips: &[Ipv4Addr]) {
    assert_response_code(msg, ResponseCode::NoError);
    let mut actual = extract_a_ips(msg);
    actual.sort();
    let mut expected: Vec<Ipv4Addr> = expected_ips.to_vec();
    expected.sort();
    assert_eq!(
        actual, expected,
        "A records mismatch.\nactual:   {:?}\nexpected: {:?}",
        actual, expected
    );
}

/// Assert an authoritative NXDOMAIN with no answers.
pub fn assert_nxdomain(msg: &Message) {
    assert_response_code(msg, ResponseCode::NXDomain);
    assert!(msg.authoritative(), "negative answers must be authoritative");
    assert!(extract_a_ips(msg).is_empty());
}
