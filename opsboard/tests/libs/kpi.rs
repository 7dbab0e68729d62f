use chrono::{NaiveDate, NaiveDateTime};
use laboratory::{SpecContext, expect};
use serde_json::json;

use opsboard::libs::{
    kpi::{self, CallsKpis, CallsPolicy, DepotThresholds},
    normalize::{self, CallRecord, DepotState, Supply},
};

use crate::TestState;

fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 3, 1)
        .and_then(|d| d.and_hms_opt(h, m, s))
        .unwrap()
}

fn call(
    status: &str,
    start: Option<NaiveDateTime>,
    answer: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
    agent: Option<&str>,
) -> CallRecord {
    CallRecord {
        status: status.to_string(),
        start,
        answer,
        end,
        agent: agent.map(|a| a.to_string()),
    }
}

fn sample_calls() -> Vec<CallRecord> {
    vec![
        // waiting
        call("0", Some(at(12, 0, 0)), None, None, None),
        call("0", Some(at(11, 59, 30)), None, None, Some("a3")),
        // too old to be waiting
        call("0", Some(at(11, 58, 0)), None, None, None),
        // ended without answer
        call("0", Some(at(11, 59, 50)), None, Some(at(11, 59, 55)), None),
        // answered recently
        call("1", Some(at(11, 55, 0)), Some(at(11, 55, 5)), None, Some("a1")),
        call("1", Some(at(11, 56, 0)), Some(at(11, 56, 5)), Some(at(11, 57, 0)), Some("a1")),
        call("1", Some(at(11, 57, 0)), Some(at(11, 57, 5)), None, Some("a2")),
        // answered long ago
        call("1", Some(at(9, 0, 0)), Some(at(9, 0, 5)), Some(at(9, 3, 0)), Some("a4")),
        // answered without agent key
        call("1", Some(at(11, 58, 0)), Some(at(11, 58, 5)), None, None),
    ]
}

fn depot(id: i64, level: Option<f64>) -> DepotState {
    DepotState {
        id,
        name: format!("DEP-{}", id),
        capacity: None,
        level,
        percentage: None,
        last_supply: None,
    }
}

fn supplies() -> Vec<Supply> {
    normalize::supplies(json!([
        [7, "A", 100, 45.5, 1.4, "2025-03-01 08:15:00", "S1", 2, 1],
        [8, "B", 200, 30.25, 1.4, "2025-03-01 12:00:00", "S1", 2, 1],
        [9, "C", 300, 10, 1.4, "2025-03-01 09:30:00", "S1", 2, 1],
        [7, "A", 400, 5, 1.4, "2025-03-01 10:00:00", "S1", 2, 1],
        [8, "B", 500, 4, 1.4, "2025-03-01 11:00:00", "S1", 2, 1],
        [9, "C", 600, 3, 1.4, "2025-03-01 07:00:00", "S1", 2, 1]
    ]))
}

/// Test [`kpi::calls_kpis`].
pub fn calls_kpis(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let policy = CallsPolicy::default();
    let kpis = kpi::calls_kpis(&sample_calls(), at(12, 0, 0), &policy);
    expect(kpis).to_equal(CallsKpis {
        waiting_now: 2,
        answered_today: 5,
        agents_online: 2,
    })?;

    let policy = CallsPolicy {
        window_seconds: 180,
        agent_active_minutes: 240,
    };
    let kpis = kpi::calls_kpis(&sample_calls(), at(12, 0, 0), &policy);
    expect(kpis).to_equal(CallsKpis {
        waiting_now: 3,
        answered_today: 5,
        agents_online: 3,
    })?;

    let kpis = kpi::calls_kpis(&[], at(12, 0, 0), &CallsPolicy::default());
    expect(kpis).to_equal(CallsKpis::default())
}

/// Permutations of the input give the same counts.
pub fn calls_kpis_order(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let policy = CallsPolicy::default();
    let calls = sample_calls();
    let expected = kpi::calls_kpis(&calls, at(12, 0, 0), &policy);

    let mut reversed = calls.clone();
    reversed.reverse();
    expect(kpi::calls_kpis(&reversed, at(12, 0, 0), &policy)).to_equal(expected.clone())?;
    for shift in 1..calls.len() {
        let mut rotated = calls.clone();
        rotated.rotate_left(shift);
        expect(kpi::calls_kpis(&rotated, at(12, 0, 0), &policy)).to_equal(expected.clone())?;
    }
    Ok(())
}

/// Test [`kpi::depot_alerts`].
pub fn depot_alerts(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let depots = vec![
        depot(1, Some(1000.0)),
        depot(2, Some(399.0)),
        depot(3, Some(150.0)),
        depot(4, None),
        depot(5, Some(400.0)),
        depot(6, Some(0.0)),
    ];
    let alerts = kpi::depot_alerts(&depots, &DepotThresholds::default());
    let low: Vec<i64> = alerts.low.iter().map(|d| d.id).collect();
    let critical: Vec<i64> = alerts.critical.iter().map(|d| d.id).collect();
    expect(low).to_equal(vec![2, 3, 6])?;
    expect(critical).to_equal(vec![3, 6])?;
    expect(alerts.has_low_level).to_equal(true)?;

    let thresholds = DepotThresholds {
        low: 100.0,
        critical: 50.0,
    };
    let alerts = kpi::depot_alerts(&depots, &thresholds);
    let low: Vec<i64> = alerts.low.iter().map(|d| d.id).collect();
    expect(low).to_equal(vec![6])?;

    let alerts = kpi::depot_alerts(&[depot(1, Some(1000.0)), depot(2, None)], &thresholds);
    expect(alerts.has_low_level).to_equal(false)?;
    let value = serde_json::to_value(&alerts).map_err(|e| e.to_string())?;
    expect(value).to_equal(json!({"low": [], "critical": [], "hasLowLevel": false}))
}

/// Permutations of the input give the same alerts.
pub fn depot_alerts_order(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let depots = vec![
        depot(3, Some(150.0)),
        depot(1, Some(1000.0)),
        depot(6, Some(0.0)),
        depot(2, Some(399.0)),
    ];
    let thresholds = DepotThresholds::default();
    let expected = kpi::depot_alerts(&depots, &thresholds);
    for shift in 1..depots.len() {
        let mut rotated = depots.clone();
        rotated.rotate_left(shift);
        expect(kpi::depot_alerts(&rotated, &thresholds)).to_equal(expected.clone())?;
    }
    Ok(())
}

/// Rows with the same depot ID and name are ordered by level whatever the input order.
pub fn depot_alerts_duplicated(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let depots = vec![
        depot(4, Some(300.0)),
        depot(2, Some(120.0)),
        depot(4, Some(20.0)),
        depot(4, Some(250.0)),
    ];
    let thresholds = DepotThresholds::default();
    let expected = kpi::depot_alerts(&depots, &thresholds);
    let levels: Vec<(i64, Option<f64>)> = expected.low.iter().map(|d| (d.id, d.level)).collect();
    expect(levels).to_equal(vec![
        (2, Some(120.0)),
        (4, Some(20.0)),
        (4, Some(250.0)),
        (4, Some(300.0)),
    ])?;
    let critical: Vec<Option<f64>> = expected.critical.iter().map(|d| d.level).collect();
    expect(critical).to_equal(vec![Some(120.0), Some(20.0)])?;

    let mut reversed = depots.clone();
    reversed.reverse();
    expect(kpi::depot_alerts(&reversed, &thresholds)).to_equal(expected.clone())?;
    for shift in 1..depots.len() {
        let mut rotated = depots.clone();
        rotated.rotate_left(shift);
        expect(kpi::depot_alerts(&rotated, &thresholds)).to_equal(expected.clone())?;
    }
    Ok(())
}

/// Test [`kpi::supply_summary`].
pub fn supply_summary(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let summary = kpi::supply_summary(supplies());
    expect(summary.items.len()).to_equal(6)?;
    expect(summary.operations).to_equal(6)?;
    expect(summary.total_liters).to_equal(97.75)?;
    expect(summary.average).to_equal(16.29)?;
    let latest: Vec<&str> = summary.latest.iter().map(|s| s.timestamp.as_str()).collect();
    expect(latest).to_equal(vec![
        "2025-03-01 12:00:00",
        "2025-03-01 11:00:00",
        "2025-03-01 10:00:00",
        "2025-03-01 09:30:00",
        "2025-03-01 08:15:00",
    ])?;

    let mut reversed = supplies();
    reversed.reverse();
    expect(kpi::supply_summary(reversed).latest).to_equal(summary.latest.clone())?;

    let summary = kpi::supply_summary(vec![]);
    expect(summary.operations).to_equal(0)?;
    let value = serde_json::to_value(&summary).map_err(|e| e.to_string())?;
    expect(value).to_equal(json!({
        "items": [],
        "totalLitros": 0,
        "operaciones": 0,
        "promedio": 0,
        "ultimos": []
    }))
}

/// Test [`kpi::stock_estimate`].
pub fn stock_estimate(_context: &mut SpecContext<TestState>) -> Result<(), String> {
    let list = supplies();

    let estimate = kpi::stock_estimate(Some(5000.0), Some(3000.0), Some(1000.0), &list);
    expect(estimate.consumption).to_equal(97.75)?;
    expect(estimate.estimated).to_equal(Some(3902.25))?;
    expect(estimate.percentage).to_equal(Some(78.0))?;
    expect(estimate.last_supply.as_ref().map(|s| s.timestamp.as_str()))
        .to_equal(Some("2025-03-01 12:00:00"))?;

    // Clamped to the capacity and to zero.
    let estimate = kpi::stock_estimate(Some(1000.0), Some(1200.0), Some(500.0), &[]);
    expect(estimate.estimated).to_equal(Some(1000.0))?;
    expect(estimate.percentage).to_equal(Some(100.0))?;
    let estimate = kpi::stock_estimate(Some(1000.0), Some(50.0), None, &list);
    expect(estimate.estimated).to_equal(Some(0.0))?;
    expect(estimate.inputs).to_equal(0.0)?;

    // Without capacity the estimation is not clamped and has no percentage.
    let estimate = kpi::stock_estimate(None, Some(50.0), None, &list);
    expect(estimate.estimated).to_equal(Some(-47.75))?;
    expect(estimate.percentage).to_equal(None)?;

    let estimate = kpi::stock_estimate(None, None, Some(100.0), &list);
    expect(estimate.estimated).to_equal(None)?;
    expect(estimate.percentage).to_equal(None)?;
    expect(estimate.consumption).to_equal(97.75)?;

    let estimate = kpi::stock_estimate(Some(5000.0), Some(3000.0), None, &[]);
    let value = serde_json::to_value(&estimate).map_err(|e| e.to_string())?;
    expect(value).to_equal(json!({
        "capacidad": 5000,
        "stockInicial": 3000,
        "entradas": 0,
        "consumos": 0,
        "stockEstimado": 3000,
        "porcentaje": 60,
        "ultimo": null
    }))
}
