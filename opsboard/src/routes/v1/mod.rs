pub mod calls;
pub mod contacts;
pub mod gasoil;
pub mod kpi;
pub mod status;
