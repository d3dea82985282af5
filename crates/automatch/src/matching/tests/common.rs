use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::matching::domain::{
    AllocationType, AreaType, CdeId, CdeInput, DealId, DealInput, EntityType, FinancingFocus,
    MatchRecord, ServiceArea, VentureType,
};
use crate::matching::intake::{CdeSubmission, DealSubmission};
use crate::matching::ranking::RankingPolicy;
use crate::matching::repository::{
    AlertError, AlertPublisher, AutoMatchRepository, MatchAlert, RepositoryError,
};
use crate::matching::service::{AutoMatchConfig, AutoMatchService};
use crate::matching::states::StateCode;

pub(super) const REFERENCE_YEAR: i32 = 2024;

pub(super) fn state(raw: &str) -> StateCode {
    StateCode::parse(raw).expect("known state")
}

/// California real-estate deal that clears every criterion of [`full_fit_cde`].
pub(super) fn california_deal() -> DealInput {
    DealInput {
        deal_id: DealId("deal-ca-001".to_string()),
        project_name: Some("Eastside Health Hub".to_string()),
        state: state("CA"),
        sector: Some("health care".to_string()),
        financing_amount: 2_000_000,
        venture_type: VentureType::RealEstate,
        owner_occupied: true,
        area: Some(AreaType::Urban),
        severely_distressed: true,
        distress_percentile: 60,
        minority_owned: true,
        tribal: false,
        underserved_target: false,
        entity_type: None,
        allocation_type: Some(AllocationType::Federal),
    }
}

pub(super) fn full_fit_cde() -> CdeInput {
    CdeInput {
        cde_id: CdeId("cde-pacific".to_string()),
        name: "Pacific Community Capital".to_string(),
        service_area: ServiceArea {
            national: true,
            states: [state("CA")].into_iter().collect(),
        },
        financing_focus: FinancingFocus::RealEstate,
        area_focus: None,
        sectors: Vec::new(),
        min_deal_size: Some(1_000_000),
        max_deal_size: Some(10_000_000),
        small_deal_fund: true,
        requires_severely_distressed: true,
        min_distress_percentile: 50,
        minority_focus: true,
        underserved_states_focus: false,
        nonprofit_preferred: true,
        for_profit_accepted: true,
        owner_occupied_preference: None,
        tribal_focus: false,
        allocation_types: [AllocationType::Federal].into_iter().collect(),
        remaining_allocation: 5_000_000,
    }
}

pub(super) fn new_york_only_cde() -> CdeInput {
    CdeInput {
        cde_id: CdeId("cde-empire".to_string()),
        name: "Empire Impact Fund".to_string(),
        service_area: ServiceArea::states([state("NY")]),
        ..full_fit_cde()
    }
}

/// A CDE with no stated restrictions beyond geography and financing.
pub(super) fn open_cde(id: &str) -> CdeInput {
    CdeInput {
        cde_id: CdeId(id.to_string()),
        name: format!("Open CDE {id}"),
        service_area: ServiceArea::national(),
        financing_focus: FinancingFocus::Both,
        area_focus: None,
        sectors: Vec::new(),
        min_deal_size: None,
        max_deal_size: None,
        small_deal_fund: true,
        requires_severely_distressed: false,
        min_distress_percentile: 0,
        minority_focus: false,
        underserved_states_focus: false,
        nonprofit_preferred: false,
        for_profit_accepted: false,
        owner_occupied_preference: None,
        tribal_focus: false,
        allocation_types: BTreeSet::new(),
        remaining_allocation: 1_000_000,
    }
}

pub(super) fn deal_submission() -> DealSubmission {
    DealSubmission {
        deal_id: "deal-ca-001".to_string(),
        project_name: Some("Eastside Health Hub".to_string()),
        state: Some("California".to_string()),
        sector: Some("Health_Care".to_string()),
        financing_amount: Some(2_000_000.0),
        venture_type: Some("real-estate".to_string()),
        owner_occupied: None,
        urban_rural: Some("Urban".to_string()),
        severely_distressed: Some(true),
        distress_percentile: Some(60.0),
        minority_owned: Some(true),
        tribal: Some(false),
        underserved_target: None,
        entity_type: Some("Nonprofit".to_string()),
        allocation_type: Some("Federal".to_string()),
    }
}

pub(super) fn cde_submission() -> CdeSubmission {
    CdeSubmission {
        cde_id: "cde-pacific".to_string(),
        name: "Pacific Community Capital".to_string(),
        service_states: vec!["ca".to_string(), "Oregon".to_string()],
        national: Some(true),
        financing_focus: Some("REAL_ESTATE".to_string()),
        urban_rural_focus: None,
        sectors: Vec::new(),
        min_deal_size: Some(1_000_000.0),
        max_deal_size: Some(10_000_000.0),
        small_deal_fund: Some(true),
        requires_severely_distressed: Some(true),
        min_distress_percentile: Some(50.0),
        minority_focus: Some(true),
        underserved_states_focus: Some(false),
        nonprofit_preferred: Some(true),
        for_profit_accepted: Some(true),
        owner_occupied_preference: None,
        tribal_focus: Some(false),
        allocation_type: Some("federal".to_string()),
        remaining_allocation: Some(5_000_000.0),
    }
}

pub(super) fn service_config() -> AutoMatchConfig {
    AutoMatchConfig {
        reference_year: REFERENCE_YEAR,
        ranking: RankingPolicy::default(),
    }
}

pub(super) fn build_service() -> (
    AutoMatchService<MemoryRepository, MemoryAlerts>,
    Arc<MemoryRepository>,
    Arc<MemoryAlerts>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let alerts = Arc::new(MemoryAlerts::default());
    let service = AutoMatchService::new(repository.clone(), alerts.clone(), service_config());
    (service, repository, alerts)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    deals: Arc<Mutex<HashMap<DealId, DealInput>>>,
    cdes: Arc<Mutex<BTreeMap<CdeId, CdeInput>>>,
    matches: Arc<Mutex<HashMap<DealId, Vec<MatchRecord>>>>,
}

impl AutoMatchRepository for MemoryRepository {
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

#[derive(Default, Clone)]
pub(super) struct MemoryAlerts {
    events: Arc<Mutex<Vec<MatchAlert>>>,
}

impl MemoryAlerts {
    pub(super) fn events(&self) -> Vec<MatchAlert> {
        self.events.lock().expect("alert mutex poisoned").clone()
    }
}

impl AlertPublisher for MemoryAlerts {
    fn publish(&self, alert: MatchAlert) -> Result<(), AlertError> {
        self.events
            .lock()
            .expect("alert mutex poisoned")
            .push(alert);
        Ok(())
    }
}

pub(super) struct FailingAlerts;

impl AlertPublisher for FailingAlerts {
    fn publish(&self, _alert: MatchAlert) -> Result<(), AlertError> {
        Err(AlertError::Transport("smtp relay offline".to_string()))
    }
}

pub(super) struct UnavailableRepository;

impl AutoMatchRepository for UnavailableRepository {
    fn insert_deal(&self, _deal: DealInput) -> Result<DealInput, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_deal(&self, _id: &DealId) -> Result<Option<DealInput>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_cde(&self, _cde: CdeInput) -> Result<CdeInput, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn candidate_cdes(&self) -> Result<Vec<CdeInput>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace_matches(
        &self,
        _deal_id: &DealId,
        _records: Vec<MatchRecord>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn matches_for(&self, _deal_id: &DealId) -> Result<Vec<MatchRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) fn entity_deal(entity_type: Option<EntityType>) -> DealInput {
    DealInput {
        entity_type,
        ..california_deal()
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
