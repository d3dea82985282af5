use automatch::matching::{
    AlertError, AlertPublisher, AutoMatchRepository, AutoMatchService, CdeId, CdeInput, DealId,
    DealInput, MatchAlert, MatchRecord, RepositoryError,
};
use automatch::error::AppError;
use automatch::roster::CdeRosterImporter;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryAutoMatchRepository {
    deals: Arc<Mutex<HashMap<DealId, DealInput>>>,
    cdes: Arc<Mutex<BTreeMap<CdeId, CdeInput>>>,
    matches: Arc<Mutex<HashMap<DealId, Vec<MatchRecord>>>>,
}

impl AutoMatchRepository for InMemoryAutoMatchRepository {
    fn insert_deal(&self, deal: DealInput) -> Result<DealInput, RepositoryError> {
        let mut guard = self.deals.lock().expect("deal mutex poisoned");
        if guard.contains_key(&deal.deal_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(deal.deal_id.clone(), deal.clone());
        Ok(deal)
    }

    fn fetch_deal(&self, id: &DealId) -> Result<Option<DealInput>, RepositoryError> {
        let guard = self.deals.lock().expect("deal mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn insert_cde(&self, cde: CdeInput) -> Result<CdeInput, RepositoryError> {
        let mut guard = self.cdes.lock().expect("cde mutex poisoned");
        if guard.contains_key(&cde.cde_id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(cde.cde_id.clone(), cde.clone());
        Ok(cde)
    }

    fn candidate_cdes(&self) -> Result<Vec<CdeInput>, RepositoryError> {
        let guard = self.cdes.lock().expect("cde mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn replace_matches(
        &self,
        deal_id: &DealId,
        records: Vec<MatchRecord>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.matches.lock().expect("match mutex poisoned");
        guard.insert(deal_id.clone(), records);
        Ok(())
    }

    fn matches_for(&self, deal_id: &DealId) -> Result<Vec<MatchRecord>, RepositoryError> {
        let guard = self.matches.lock().expect("match mutex poisoned");
        Ok(guard.get(deal_id).cloned().unwrap_or_default())
    }
}

/// Collects match alerts in memory and logs each one; stands in for the notification dispatcher.
#[derive(Default, Clone)]
pub(crate) struct InMemoryAlertPublisher {
    events: Arc<Mutex<Vec<MatchAlert>>>,
}

impl AlertPublisher for InMemoryAlertPublisher {
    fn publish(&self, alert: MatchAlert) -> Result<(), AlertError> {
        info!(
            template = %alert.template,
            deal_id = %alert.deal_id,
            cde_id = %alert.cde_id,
            "match alert queued"
        );
        let mut guard = self.events.lock().expect("alert mutex poisoned");
        guard.push(alert);
        Ok(())
    }
}

#[cfg(test)]
impl InMemoryAlertPublisher {
    pub(crate) fn events(&self) -> Vec<MatchAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

pub(crate) type InMemoryAutoMatchService =
    AutoMatchService<InMemoryAutoMatchRepository, InMemoryAlertPublisher>;

/// Loads a CDE roster file into the service's candidate pool.
pub(crate) fn seed_roster(
    service: &InMemoryAutoMatchService,
    path: &Path,
) -> Result<usize, AppError> {
    let cdes = CdeRosterImporter::from_path(path)?;
    let parsed = cdes.len();
    let mut stored = 0;
    for cde in cdes {
        match service.store_cde(cde) {
            Ok(_) => stored += 1,
            Err(err) => tracing::warn!(error = %err, "skipping roster entry"),
        }
    }
    info!(path = %path.display(), parsed, stored, "seeded CDE roster");
    Ok(stored)
}
