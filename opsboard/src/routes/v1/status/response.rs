use serde::Serialize;

#[derive(Serialize)]
pub struct GetStatus {
    pub data: GetStatusData,
}

#[derive(Serialize)]
pub struct GetStatusData {
    pub gasoges: &'static str,
    pub mundosms: &'static str,
}
