use serde::Serialize;

use crate::libs::mundosms::FlowResult;

#[derive(Serialize)]
pub struct PostFlow {
    pub ok: bool,
    pub mode: String,
    pub flow_id: String,
    pub results: Vec<FlowResult>,
}

#[derive(Serialize)]
pub struct PostFlowErr {
    pub ok: bool,
    pub error: String,
}
