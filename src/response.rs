//! Answer record construction shared by the authority and the packet handler.

use hickory_proto::rr::rdata::A;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordSet, RecordType};
use std::net::Ipv4Addr;

/// Default TTL of synthesized A records, in seconds.
pub const DEFAULT_TTL: u32 = 3600;

/// One `IN A` record per address, in order.
pub fn a_records(name: &Name, ips: &[Ipv4Addr], ttl: u32) -> Vec<Record> {
    ips.iter()
        .map(|ip| {
            let mut record = Record::from_rdata(name.clone(), ttl, RData::A(A::from(*ip)));
            record.set_dns_class(DNSClass::IN);
            record
        })
        .collect()
}

/// The same records collected into a [`RecordSet`].
pub fn a_record_set(name: &Name, ips: &[Ipv4Addr], ttl: u32) -> RecordSet {
    let mut record_set = RecordSet::new(name.clone(), RecordType::A, 0);
    for record in a_records(name, ips, ttl) {
        record_set.insert(record, 0);
    }
    record_set
}
