//! Hickory DNS authority answering from the routing table.
//!
//! The authority is rooted at `.` so the catalog hands it every query; the
//! routing table decides what exists.

use async_trait::async_trait;
use hickory_proto::op::ResponseCode;
use hickory_proto::rr::{LowerName, Name, RecordType};
use hickory_server::authority::{
    Authority, LookupControlFlow, LookupError, LookupOptions, LookupRecords, MessageRequest,
    UpdateResult, ZoneType,
};
use hickory_server::server::RequestInfo;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::metrics::{self, QueryResult, Timer};
use crate::resolver::{QueryOutcome, Resolver};
use crate::response;

/// Authority backed by the current routing table.
pub struct RegistryAuthority {
    origin: LowerName,
    resolver: Resolver,
    ttl: u32,
}

impl RegistryAuthority {
    /// Create a root-origin authority serving records with the given TTL.
    pub fn new(resolver: Resolver, ttl: u32) -> Self {
        Self {
            origin: LowerName::from(Name::root()),
            resolver,
            ttl,
        }
    }
}

#[async_trait]
impl Authority for RegistryAuthority {
    type Lookup = LookupRecords;

    fn zone_type(&self) -> ZoneType {
        ZoneType::Primary
    }

    fn is_axfr_allowed(&self) -> bool {
        false
    }

    fn origin(&self) -> &LowerName {
        &self.origin
    }

    async fn lookup(
        &self,
        name: &LowerName,
        rtype: RecordType,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        let timer = Timer::start();
        let rtype_str = format!("{:?}", rtype);
        let name_str = name.to_string();

        trace!(name = %name_str, rtype = ?rtype, "DNS lookup");

        match self.resolver.query(&name_str, rtype) {
            QueryOutcome::Found(ips) => {
                debug!(name = %name_str, count = ips.len(), "A lookup: returning records");
                metrics::record_a_ips_returned(ips.len());
                metrics::record_query(&rtype_str, QueryResult::Found, timer.elapsed());
                let dns_name = Name::from(name.clone());
                let record_set = Arc::new(response::a_record_set(&dns_name, &ips, self.ttl));
                LookupControlFlow::Break(Ok(LookupRecords::new(lookup_options, record_set)))
            }
            QueryOutcome::NotFound => {
                debug!(name = %name_str, "A lookup: no records found");
                metrics::record_query(&rtype_str, QueryResult::NxDomain, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NXDomain)))
            }
            QueryOutcome::Unsupported => {
                metrics::record_query(&rtype_str, QueryResult::Unsupported, timer.elapsed());
                LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
            }
        }
    }

    async fn search(
        &self,
        request_info: RequestInfo<'_>,
        lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        self.lookup(
            request_info.query.name(),
            request_info.query.query_type(),
            lookup_options,
        )
        .await
    }

    async fn get_nsec_records(
        &self,
        _name: &LowerName,
        _lookup_options: LookupOptions,
    ) -> LookupControlFlow<Self::Lookup> {
        // DNSSEC not supported
        LookupControlFlow::Break(Err(LookupError::ResponseCode(ResponseCode::NoError)))
    }

    async fn update(&self, _update: &MessageRequest) -> UpdateResult<bool> {
        // Dynamic updates not supported
        Err(ResponseCode::NotImp)
    }
}
