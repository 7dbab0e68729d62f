use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize)]
pub struct GetDepotLevelQuery {
    pub id: Option<String>,
    pub date: Option<String>,
}

/// The body form of the depot level request. `id` may be a number or a string.
#[derive(Deserialize)]
pub struct PostDepotLevelBody {
    pub id: Option<Value>,
    pub fecha: Option<String>,
}

#[derive(Deserialize)]
pub struct GetDepotStateQuery {
    pub date: Option<String>,
}

#[derive(Deserialize)]
pub struct GetSupplyListQuery {
    pub start: Option<String>,
    pub end: Option<String>,
    /// `raw` (default) or `normalized`.
    pub format: Option<String>,
}

#[derive(Deserialize)]
pub struct GetSupplyDepotQuery {
    pub id: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub format: Option<String>,
}
