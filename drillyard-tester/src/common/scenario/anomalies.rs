use anyhow::{Context, Result, ensure};
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;

use drillyard_game::{
    AnomalyEffectSpec, Controllable, GameState, VehicleEffect, ZoneConfig, ZoneId,
};

use super::ScenarioCtx;
use super::campaign::open_store;
use crate::logic::driver::{FRAME_SECONDS, Harness, ScenarioSummary};

const STRESS_CHANCE: f64 = 0.35;

pub fn anomaly_stress(ctx: &ScenarioCtx) -> Result<ScenarioSummary> {
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let mut harness =
        Harness::new(&ctx.config, open_store(ctx)?)?.with_anomaly_chance(STRESS_CHANCE);
    harness.new_game()?;

    let mut zones: Vec<ZoneId> = ctx
        .config
        .zones
        .iter()
        .filter(|zone| !zone.anomalies.is_empty())
        .map(|zone| zone.zone)
        .collect();
    zones.shuffle(&mut rng);

    for zone in &zones {
        harness.train(*zone, &mut rng, true)?;
    }
    for zone in &zones {
        let cfg = ctx.config.zone(*zone).context("zone vanished from config")?;
        probe_zone(&mut harness, cfg)?;
    }
    Ok(harness.finish())
}

/// First spec per kind, the one a trigger resolves to.
fn effective_specs(cfg: &ZoneConfig) -> Vec<AnomalyEffectSpec> {
    let mut specs: Vec<AnomalyEffectSpec> = Vec::new();
    for spec in &cfg.anomalies {
        if specs.iter().all(|seen| seen.kind != spec.kind) {
            specs.push(*spec);
        }
    }
    specs
}

/// Trigger every configured anomaly in turn, let timed effects expire, then
/// fail the mission and check nothing leaks past teardown.
fn probe_zone(harness: &mut Harness, cfg: &ZoneConfig) -> Result<()> {
    let zone = cfg.zone;
    ensure!(harness.app_mut().enter_zone(zone), "entrance to {zone} refused");
    let state = harness.settle()?;
    ensure!(state == GameState::InTraining, "{zone} load ended in {state:?}");
    let vehicle = harness.app().vehicle();

    for spec in effective_specs(cfg) {
        let applied = harness.inject_anomaly(spec.kind)?;
        let expected = spec.vehicle_effect != VehicleEffect::None && vehicle.is_some();
        ensure!(
            applied == expected,
            "{zone} {:?} applied={applied}, expected {expected}",
            spec.kind
        );
        let Some(vehicle) = &vehicle else { continue };
        if !applied {
            continue;
        }
        {
            let vehicle = vehicle.borrow();
            match spec.vehicle_effect {
                VehicleEffect::ReduceSpeed => ensure!(
                    (vehicle.speed_multiplier() - spec.reduced_multiplier()).abs() <= f32::EPSILON,
                    "{zone} {:?} left multiplier {}",
                    spec.kind,
                    vehicle.speed_multiplier()
                ),
                VehicleEffect::DisableControls => ensure!(
                    !vehicle.control_enabled(),
                    "{zone} {:?} did not disable controls",
                    spec.kind
                ),
                VehicleEffect::None => {}
            }
        }

        if spec.duration_seconds > 0.0 {
            let frames = frames_for(spec.duration_seconds) + 1;
            for _ in 0..frames {
                harness.tick();
            }
            let anomalies = harness.app().anomalies().context("anomaly controller missing")?;
            ensure!(
                anomalies.active_count() == 0,
                "{zone} {:?} outlived its {}s duration",
                spec.kind,
                spec.duration_seconds
            );
            let vehicle = vehicle.borrow();
            ensure!(
                vehicle.control_enabled()
                    && (vehicle.speed_multiplier() - 1.0).abs() <= f32::EPSILON,
                "{zone} {:?} expired without restoring the vehicle",
                spec.kind
            );
        }
    }

    ensure!(harness.app_mut().fail_mission(), "{zone} probe mission refused to fail");
    let state = harness.settle()?;
    ensure!(state == GameState::Hub, "{zone} probe returned to {state:?}");
    if let Some(vehicle) = vehicle {
        let vehicle = vehicle.borrow();
        ensure!(
            vehicle.control_enabled() && (vehicle.speed_multiplier() - 1.0).abs() <= f32::EPSILON,
            "{zone} probe left anomaly residue after teardown"
        );
        ensure!(!vehicle.is_active(), "{zone} vehicle still active after teardown");
    }
    ensure!(
        harness.app().roster().is_empty(),
        "{zone} vehicle still registered after teardown"
    );
    Ok(())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn frames_for(seconds: f32) -> usize {
    (seconds / FRAME_SECONDS).ceil() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use drillyard_game::AnomalyKind;

    #[test]
    fn first_spec_of_each_kind_wins() {
        let mut cfg = ctx_zone(ZoneId::Harbor);
        cfg.anomalies.push(AnomalyEffectSpec::new(
            AnomalyKind::UnexpectedEvent,
            9.0,
            0.1,
            VehicleEffect::ReduceSpeed,
        ));
        let specs = effective_specs(&cfg);
        assert_eq!(specs.len(), 2);
        assert!(
            specs
                .iter()
                .any(|spec| spec.kind == AnomalyKind::UnexpectedEvent
                    && spec.vehicle_effect == VehicleEffect::DisableControls)
        );
    }

    #[test]
    fn stress_applies_anomalies_and_cleans_up() {
        let summary = anomaly_stress(&ScenarioCtx::default().with_seed(77)).unwrap();
        assert!(summary.anomalies_applied > 0);
        assert_eq!(summary.final_state, Some(GameState::Hub));
        assert_eq!(summary.badges_earned, ZoneId::COUNT);
    }

    fn ctx_zone(zone: ZoneId) -> ZoneConfig {
        ScenarioCtx::default().config.zone(zone).cloned().unwrap()
    }
}
