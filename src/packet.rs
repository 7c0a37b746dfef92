//! Byte-level query operation: wire-format query in, wire-format answer out.
//!
//! This is the contract a packet transport (for example an RPC backend that
//! forwards raw DNS messages) consumes. Undecodable payloads surface as
//! [`DnsError::Decode`] and never produce an answer message.

use hickory_proto::op::{Message, MessageType, ResponseCode};
use tracing::{debug, trace};

use crate::error::DnsError;
use crate::metrics::{self, QueryResult, Timer};
use crate::resolver::{QueryOutcome, Resolver};
use crate::response;

/// Answers raw DNS query messages.
#[derive(Debug, Clone)]
pub struct PacketHandler {
    resolver: Resolver,
    ttl: u32,
}

impl PacketHandler {
    /// Create a handler answering from `resolver` with records of the given TTL.
    pub fn new(resolver: Resolver, ttl: u32) -> Self {
        Self { resolver, ttl }
    }

    /// Decode a query, resolve every question and encode the answer.
    pub fn handle(&self, payload: &[u8]) -> Result<Vec<u8>, DnsError> {
        let timer = Timer::start();

        let request = Message::from_vec(payload).map_err(|e| {
            debug!(len = payload.len(), error = %e, "failed to decode DNS query");
            metrics::record_query("unknown", QueryResult::DecodeError, timer.elapsed());
            DnsError::Decode(e)
        })?;

        let response = self.answer(&request);
        Ok(response.to_vec()?)
    }

    /// Build the authoritative reply to a decoded query.
    pub fn answer(&self, request: &Message) -> Message {
        let mut response = Message::new();
        response
            .set_id(request.id())
            .set_message_type(MessageType::Response)
            .set_op_code(request.op_code())
            .set_recursion_desired(request.recursion_desired())
            .set_authoritative(true);

        let mut not_found = false;
        for query in request.queries() {
            let timer = Timer::start();
            let rtype = query.query_type();
            let rtype_str = format!("{rtype:?}");
            let name = query.name().to_string();

            response.add_query(query.clone());

            match self.resolver.query(&name, rtype) {
                QueryOutcome::Found(ips) => {
                    trace!(name = %name, count = ips.len(), "A lookup: returning records");
                    metrics::record_a_ips_returned(ips.len());
                    metrics::record_query(&rtype_str, QueryResult::Found, timer.elapsed());
                    response.add_answers(response::a_records(query.name(), &ips, self.ttl));
                }
                QueryOutcome::NotFound => {
                    debug!(name = %name, "A lookup: no records found");
                    metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
                    not_found = true;
                }
                QueryOutcome::Unsupported => {
                    metrics::record_query(&rtype_str, QueryResult::Unsupported, timer.elapsed());
                }
            }
        }

        if not_found && response.answers().is_empty() {
            response.set_response_code(ResponseCode::NXDomain);
        } else {
            response.set_response_code(ResponseCode::NoError);
        }

        response
    }
}
