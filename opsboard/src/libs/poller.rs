//! Periodic polling with a cached value and a stale time.
//!
//! A [`Poller`] fetches in a background task on a fixed interval. Reads within the stale time are
//! served from the cache. Older reads await one refetch and fall back to the cached value when it
//! fails. The background task is aborted when the poller is dropped.

use std::{
    future::Future,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU8, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use log::warn;
use tokio::{
    task::JoinHandle,
    time::{self, MissedTickBehavior},
};

use opsboard_corelib::{constants::UpstreamStatus, err::ErrResp};

/// The last known status of an upstream API: `idle`, `ok` or `error`.
#[derive(Clone, Default)]
pub struct ApiStatus(Arc<AtomicU8>);

/// Cached value with its fetch time.
#[derive(Clone, Debug)]
pub struct Snapshot<T> {
    pub value: T,
    /// `None` means the value is the initial one.
    pub updated_at: Option<DateTime<Utc>>,
}

pub struct Poller<T> {
    name: &'static str,
    cache: Arc<Mutex<Snapshot<T>>>,
    fetch: Fetcher<T>,
    stale: Duration,
    status: ApiStatus,
    handle: JoinHandle<()>,
}

type Fetcher<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, ErrResp>> + Send + Sync>;

const STATUS_IDLE: u8 = 0;
const STATUS_OK: u8 = 1;
const STATUS_ERROR: u8 = 2;

impl ApiStatus {
    pub fn get(&self) -> &'static str {
        match self.0.load(Ordering::Relaxed) {
            STATUS_IDLE => UpstreamStatus::IDLE,
            STATUS_OK => UpstreamStatus::OK,
            _ => UpstreamStatus::ERROR,
        }
    }

    pub fn set_ok(&self) {
        self.0.store(STATUS_OK, Ordering::Relaxed);
    }

    pub fn set_error(&self) {
        self.0.store(STATUS_ERROR, Ordering::Relaxed);
    }

    /// Track the result of an upstream call.
    pub fn track<T>(&self, result: &Result<T, ErrResp>) {
        match result {
            Err(_) => self.set_error(),
            Ok(_) => self.set_ok(),
        }
    }
}

impl<T> Poller<T>
where
    T: Clone + Send + 'static,
{
    /// To create a poller and start polling. Must be called inside a tokio runtime.
    ///
    /// The stale time is half of the interval.
    pub fn new<F, Fut>(
        name: &'static str,
        initial: T,
        interval: Duration,
        status: ApiStatus,
        fetch: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, ErrResp>> + Send + 'static,
    {
        let fetch: Fetcher<T> =
            Arc::new(move || -> BoxFuture<'static, Result<T, ErrResp>> { Box::pin(fetch()) });
        let cache = Arc::new(Mutex::new(Snapshot {
            value: initial,
            updated_at: None,
        }));

        let handle = {
            let cache = cache.clone();
            let fetch = fetch.clone();
            let status = status.clone();
            tokio::spawn(async move {
                let mut ticker = time::interval(interval);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
                loop {
                    ticker.tick().await;
                    let _ = refresh(name, &cache, &fetch, &status).await;
                }
            })
        };

        Poller {
            name,
            cache,
            fetch,
            stale: interval / 2,
            status,
            handle,
        }
    }

    /// To get the cached value, refetching it first when it is stale.
    pub async fn get(&self) -> Snapshot<T> {
        let snapshot = self.cached();
        let fresh = match snapshot.updated_at {
            None => false,
            Some(time) => match (Utc::now() - time).to_std() {
                Err(_) => true,
                Ok(age) => age < self.stale,
            },
        };
        if fresh {
            return snapshot;
        }
        match refresh(self.name, &self.cache, &self.fetch, &self.status).await {
            Err(_) => self.cached(),
            Ok(snapshot) => snapshot,
        }
    }

    /// The cached value without refetching.
    pub fn cached(&self) -> Snapshot<T> {
        match self.cache.lock() {
            Err(e) => e.into_inner().clone(),
            Ok(cache) => cache.clone(),
        }
    }

    pub fn status(&self) -> &'static str {
        self.status.get()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn refresh<T: Clone>(
    name: &'static str,
    cache: &Arc<Mutex<Snapshot<T>>>,
    fetch: &Fetcher<T>,
    status: &ApiStatus,
) -> Result<Snapshot<T>, ErrResp> {
    const FN_NAME: &'static str = "refresh";

    let result = fetch().await;
    status.track(&result);
    let value = match result {
        Err(e) => {
            warn!("[{}] poll {} error: {}", FN_NAME, name, e);
            return Err(e);
        }
        Ok(value) => value,
    };
    let snapshot = Snapshot {
        value,
        updated_at: Some(Utc::now()),
    };
    match cache.lock() {
        Err(e) => *e.into_inner() = snapshot.clone(),
        Ok(mut cache) => *cache = snapshot.clone(),
    }
    Ok(snapshot)
}
