use serde::Serialize;
use serde_json::Value;

use crate::libs::normalize::{self, DepotState, Supply};

#[derive(Serialize)]
pub struct GetDepotLevel {
    pub data: GetDepotLevelData,
}

#[derive(Serialize)]
pub struct GetDepotLevelData {
    #[serde(rename = "ID_DEPOSITO")]
    pub id: Value,
    /// `null` when upstream has no readable level.
    #[serde(rename = "LITROS_ACTUALES", serialize_with = "normalize::ser_opt_num")]
    pub level: Option<f64>,
}

#[derive(Serialize)]
pub struct GetDepotState {
    pub data: Vec<DepotState>,
}

#[derive(Serialize)]
pub struct GetSupplies {
    pub data: Vec<Supply>,
}
