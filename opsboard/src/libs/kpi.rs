//! Dashboard KPI aggregations over normalized records.
//!
//! All functions are pure and do not depend on the order of the input records.

use std::{cmp::Ordering, collections::BTreeSet};

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use super::normalize::{self, CallRecord, DepotState, Supply};

/// Status code of answered calls.
pub const STATUS_ANSWERED: &'static str = "1";

/// Number of latest supplies in the day summary.
const LATEST_SUPPLIES: usize = 5;

/// Calls KPI policy.
#[derive(Clone, Copy, Debug)]
pub struct CallsPolicy {
    pub window_seconds: i64,
    pub agent_active_minutes: i64,
}

/// Depot level thresholds in liters.
#[derive(Clone, Copy, Debug)]
pub struct DepotThresholds {
    pub low: f64,
    pub critical: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CallsKpis {
    pub waiting_now: usize,
    pub answered_today: usize,
    pub agents_online: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DepotAlerts {
    pub low: Vec<DepotState>,
    pub critical: Vec<DepotState>,
    #[serde(rename = "hasLowLevel")]
    pub has_low_level: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SupplySummary {
    pub items: Vec<Supply>,
    #[serde(rename = "totalLitros", serialize_with = "normalize::ser_num")]
    pub total_liters: f64,
    #[serde(rename = "operaciones")]
    pub operations: usize,
    #[serde(rename = "promedio", serialize_with = "normalize::ser_num")]
    pub average: f64,
    #[serde(rename = "ultimos")]
    pub latest: Vec<Supply>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StockEstimate {
    #[serde(rename = "capacidad", serialize_with = "normalize::ser_opt_num")]
    pub capacity: Option<f64>,
    #[serde(rename = "stockInicial", serialize_with = "normalize::ser_opt_num")]
    pub initial_stock: Option<f64>,
    #[serde(rename = "entradas", serialize_with = "normalize::ser_num")]
    pub inputs: f64,
    #[serde(rename = "consumos", serialize_with = "normalize::ser_num")]
    pub consumption: f64,
    #[serde(rename = "stockEstimado", serialize_with = "normalize::ser_opt_num")]
    pub estimated: Option<f64>,
    #[serde(rename = "porcentaje", serialize_with = "normalize::ser_opt_num")]
    pub percentage: Option<f64>,
    #[serde(rename = "ultimo")]
    pub last_supply: Option<Supply>,
}

impl Default for CallsPolicy {
    fn default() -> Self {
        CallsPolicy {
            window_seconds: 60,
            agent_active_minutes: 10,
        }
    }
}

impl Default for DepotThresholds {
    fn default() -> Self {
        DepotThresholds {
            low: 400.0,
            critical: 200.0,
        }
    }
}

/// To count waiting calls, answered calls and online agents.
///
/// `now` must be in the same (local) time zone as the call timestamps.
pub fn calls_kpis(calls: &[CallRecord], now: NaiveDateTime, policy: &CallsPolicy) -> CallsKpis {
    let recent_cutoff = now - Duration::seconds(policy.window_seconds);
    let agent_cutoff = now - Duration::minutes(policy.agent_active_minutes);

    let mut kpis = CallsKpis::default();
    let mut agents = BTreeSet::new();
    for call in calls {
        if call.status == STATUS_ANSWERED {
            kpis.answered_today += 1;
            if let (Some(answer), Some(agent)) = (call.answer, call.agent.as_ref()) {
                if answer >= agent_cutoff {
                    agents.insert(agent.as_str());
                }
            }
        }
        if let Some(start) = call.start {
            if call.answer.is_none() && call.end.is_none() && start >= recent_cutoff {
                kpis.waiting_now += 1;
            }
        }
    }
    kpis.agents_online = agents.len();
    kpis
}

/// To select depots below the low threshold and low depots below the critical threshold.
///
/// Depots without a known level are never low. Results are sorted by depot ID, then name, level
/// and capacity.
pub fn depot_alerts(depots: &[DepotState], thresholds: &DepotThresholds) -> DepotAlerts {
    let mut low: Vec<DepotState> = depots
        .iter()
        .filter(|d| match d.level {
            Some(level) => level.is_finite() && level < thresholds.low,
            None => false,
        })
        .cloned()
        .collect();
    low.sort_by(|a, b| {
        a.id.cmp(&b.id)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| cmp_num(a.level, b.level))
            .then_with(|| cmp_num(a.capacity, b.capacity))
    });
    let critical: Vec<DepotState> = low
        .iter()
        .filter(|d| d.level.is_some_and(|level| level < thresholds.critical))
        .cloned()
        .collect();
    DepotAlerts {
        has_low_level: !low.is_empty(),
        low,
        critical,
    }
}

fn cmp_num(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        _ => a.is_some().cmp(&b.is_some()),
    }
}

/// To summarize the supplies of a day.
pub fn supply_summary(supplies: Vec<Supply>) -> SupplySummary {
    let total_liters: f64 = supplies.iter().map(|s| s.liters).sum();
    let operations = supplies.len();
    let average = match operations {
        0 => 0.0,
        _ => (total_liters / operations as f64 * 100.0).round() / 100.0,
    };
    let mut latest = supplies.clone();
    latest.sort_by(latest_first);
    latest.truncate(LATEST_SUPPLIES);
    SupplySummary {
        items: supplies,
        total_liters,
        operations,
        average,
        latest,
    }
}

/// To estimate the depot stock from the configured capacity, initial stock and refills, and the
/// supplies taken from the depot.
///
/// Returns no estimation when neither the capacity nor the initial stock is known.
pub fn stock_estimate(
    capacity: Option<f64>,
    initial_stock: Option<f64>,
    inputs: Option<f64>,
    supplies: &[Supply],
) -> StockEstimate {
    let capacity = capacity.filter(|v| v.is_finite());
    let initial_stock = initial_stock.filter(|v| v.is_finite());
    let inputs = inputs.filter(|v| v.is_finite()).unwrap_or(0.0);
    let consumption: f64 = supplies.iter().map(|s| s.liters).sum();
    let last_supply = supplies.iter().min_by(|a, b| latest_first(a, b)).cloned();

    if capacity.is_none() && initial_stock.is_none() {
        return StockEstimate {
            capacity,
            initial_stock,
            inputs,
            consumption,
            estimated: None,
            percentage: None,
            last_supply,
        };
    }

    let mut estimated = initial_stock.unwrap_or(0.0) + inputs - consumption;
    if let Some(capacity) = capacity {
        estimated = estimated.min(capacity).max(0.0);
    }
    let percentage = match capacity {
        Some(capacity) if capacity > 0.0 && estimated.is_finite() => {
            Some((estimated / capacity * 100.0).round())
        }
        _ => None,
    };
    StockEstimate {
        capacity,
        initial_stock,
        inputs,
        consumption,
        estimated: Some(estimated).filter(|v| v.is_finite()),
        percentage,
        last_supply,
    }
}

/// Latest timestamp first. Ties are ordered by the remaining fields.
fn latest_first(a: &Supply, b: &Supply) -> Ordering {
    b.timestamp
        .cmp(&a.timestamp)
        .then_with(|| b.liters.total_cmp(&a.liters))
        .then_with(|| cmp_opt(&b.depot_id, &a.depot_id))
        .then_with(|| cmp_opt(&b.user_id, &a.user_id))
        .then_with(|| cmp_opt(&b.km, &a.km))
}

fn cmp_opt(a: &Option<f64>, b: &Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => a.total_cmp(b),
    }
}
