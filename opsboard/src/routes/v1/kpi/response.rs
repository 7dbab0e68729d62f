use serde::Serialize;

use crate::libs::kpi::{DepotAlerts, StockEstimate, SupplySummary};

#[derive(Serialize)]
pub struct GetCalls {
    pub data: GetCallsData,
}

#[derive(Serialize)]
pub struct GetCallsData {
    pub waiting_now: usize,
    pub answered_today: usize,
    pub agents_online: usize,
    /// `null` before the first successful poll.
    pub updated_at: Option<String>,
}

#[derive(Serialize)]
pub struct GetDepots {
    pub data: DepotAlerts,
}

#[derive(Serialize)]
pub struct GetSupplies {
    pub data: SupplySummary,
}

#[derive(Serialize)]
pub struct GetDepotEstimate {
    pub data: StockEstimate,
}
