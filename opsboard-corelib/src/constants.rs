//! Common constants for the dashboard services.

pub struct CacheControl;
pub struct ContentType;
pub struct UpstreamStatus;

impl CacheControl {
    /// Live values such as tank levels.
    pub const NO_CACHE: &'static str = "no-cache";
    /// Lists that change every few seconds.
    pub const SHORT: &'static str = "s-maxage=60, stale-while-revalidate";
    /// Largely static lists.
    pub const LONG: &'static str = "s-maxage=300, stale-while-revalidate";
    /// Generated phonebook.
    pub const PHONEBOOK: &'static str = "s-maxage=60, stale-while-revalidate=300";
}

impl ContentType {
    pub const TEXT: &'static str = "text/plain; charset=utf-8";
    pub const XML: &'static str = "application/xml; charset=utf-8";
}

impl UpstreamStatus {
    pub const IDLE: &'static str = "idle";
    pub const OK: &'static str = "ok";
    pub const ERROR: &'static str = "error";
}
