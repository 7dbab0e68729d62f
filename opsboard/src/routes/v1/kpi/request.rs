use serde::Deserialize;

#[derive(Deserialize)]
pub struct GetDepotsQuery {
    /// Overrides the low threshold in liters.
    pub threshold: Option<f64>,
    /// Overrides the critical threshold in liters.
    pub critical: Option<f64>,
}

#[derive(Deserialize)]
pub struct GetSuppliesQuery {
    pub date: Option<String>,
}

#[derive(Deserialize)]
pub struct GetDepotEstimateQuery {
    pub id: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}
