use serde::Deserialize;

#[derive(Deserialize)]
pub struct PostFlowQuery {
    /// `day` or `night`.
    pub mode: Option<String>,
    /// A single PBX to switch instead of the configured list.
    pub pbx: Option<String>,
}
