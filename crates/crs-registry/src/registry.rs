//! Priority-ordered authority factory registry.
//!
//! Registration is rare and decoding is hot, so the factory list is
//! copy-on-write: readers clone an `Arc` snapshot of the ordered list
//! and never hold the lock while a factory runs.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, instrument};

use crs_common::{AuthorityCode, Crs, CrsError, CrsResult, FactoryError};

use crate::factory::AuthorityFactory;

struct Entry {
    factory: Arc<dyn AuthorityFactory>,
    priority: i32,
    /// Registration order, breaks priority ties first-registered-first.
    seq: u64,
}

/// Holds the registered factories and routes codes to them.
pub struct AuthorityRegistry {
    entries: RwLock<Arc<Vec<Entry>>>,
    next_seq: RwLock<u64>,
}

impl AuthorityRegistry {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Arc::new(Vec::new())),
            next_seq: RwLock::new(0),
        }
    }

    /// Register a factory. Higher priority is consulted earlier; equal
    /// priorities keep registration order.
    pub fn register(&self, factory: Arc<dyn AuthorityFactory>, priority: i32) {
        let seq = {
            let mut next = self.next_seq.write();
            let seq = *next;
            *next += 1;
            seq
        };
        let mut guard = self.entries.write();
        let mut entries: Vec<Entry> = guard
            .iter()
            .map(|e| Entry {
                factory: Arc::clone(&e.factory),
                priority: e.priority,
                seq: e.seq,
            })
            .collect();
        debug!(
            authority = factory.authority(),
            priority, "registering authority factory"
        );
        entries.push(Entry {
            factory,
            priority,
            seq,
        });
        entries.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.seq.cmp(&b.seq)));
        *guard = Arc::new(entries);
    }

    /// The authority namespaces currently registered, in consultation
    /// order, deduplicated.
    pub fn authorities(&self) -> Vec<String> {
        let snapshot = Arc::clone(&self.entries.read());
        let mut seen = Vec::new();
        for entry in snapshot.iter() {
            let name = entry.factory.authority().to_string();
            if !seen.contains(&name) {
                seen.push(name);
            }
        }
        seen
    }

    /// Decode "AUTHORITY:CODE" text.
    pub fn decode(&self, text: &str) -> CrsResult<Crs> {
        let code = AuthorityCode::parse(text)?;
        self.decode_code(&code)
    }

    /// Consult matching factories in priority order. The first success
    /// wins. `UnknownCode` moves on to the next factory; store failures
    /// are recorded and the scan continues, so a broken store never
    /// shadows a healthy lower-priority one.
    #[instrument(skip(self), fields(code = %code))]
    pub fn decode_code(&self, code: &AuthorityCode) -> CrsResult<Crs> {
        let snapshot = Arc::clone(&self.entries.read());
        let mut consulted = Vec::new();
        let mut causes = Vec::new();
        for entry in snapshot.iter() {
            if !entry.factory.authority().eq_ignore_ascii_case(code.authority()) {
                continue;
            }
            consulted.push(entry.factory.authority().to_string());
            match entry.factory.create_crs(code) {
                Ok(crs) => return Ok(crs),
                Err(FactoryError::UnknownCode(_)) => continue,
                Err(err) => {
                    debug!(
                        authority = entry.factory.authority(),
                        error = %err,
                        "factory failed, continuing scan"
                    );
                    causes.push(err.to_string());
                }
            }
        }
        if consulted.is_empty() {
            consulted = self.authorities();
        }
        Err(CrsError::NoSuchAuthorityCode {
            code: code.to_string(),
            authorities: consulted,
            causes,
        })
    }
}

impl Default for AuthorityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
