use ddugi_core::{log_lookup_failure, VenueLookup, VerifiedVenue};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Venues requested from the provider per entity
pub const VENUES_PER_ENTITY: u32 = 3;
/// Upper bound on the concatenated venue list
pub const MAX_VENUES: usize = 10;

/// Sequential per-entity verification against the local-search provider.
///
/// A failed or slow lookup for one entity is logged and skipped; it never
/// aborts the remaining entities.
#[derive(Clone)]
pub struct Verifier {
    search: Arc<dyn VenueLookup>,
    lookup_timeout: Duration,
}

impl Verifier {
    pub fn new(search: Arc<dyn VenueLookup>, lookup_timeout: Duration) -> Self {
        Self {
            search,
            lookup_timeout,
        }
    }

    pub async fn verify(&self, entities: &[String]) -> Vec<VerifiedVenue> {
        if entities.is_empty() {
            return Vec::new();
        }
        if !self.search.is_configured() {
            warn!(
                entities = entities.len(),
                "Local search not configured, skipping verification"
            );
            return Vec::new();
        }

        let region = self.search.default_region().to_string();
        let mut venues = Vec::new();

        for entity in entities {
            let lookup = self.search.lookup(entity, &region, VENUES_PER_ENTITY);
            match timeout(self.lookup_timeout, lookup).await {
                Ok(Ok(found)) => {
                    debug!(entity = %entity, found = found.len(), "Entity verified");
                    venues.extend(found.into_iter().take(VENUES_PER_ENTITY as usize));
                }
                Ok(Err(e)) => {
                    log_lookup_failure(entity, &e);
                    warn!(entity = %entity, "Verification lookup failed, continuing");
                }
                Err(_) => {
                    warn!(
                        entity = %entity,
                        timeout_ms = self.lookup_timeout.as_millis() as u64,
                        "Verification lookup timed out, continuing"
                    );
                }
            }
        }

        venues.truncate(MAX_VENUES);
        info!(
            entities = entities.len(),
            venues = venues.len(),
            "Verification fan-out complete"
        );
        venues
    }
}
