use anyhow::{Context, Result, ensure};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;

use drillyard_game::{GameState, ProgressionEvent, ZoneId};

use super::ScenarioCtx;
use super::campaign::open_store;
use crate::logic::driver::{Harness, ScenarioSummary};

pub fn load_fault(ctx: &ScenarioCtx) -> Result<ScenarioSummary> {
    let mut rng = ChaCha20Rng::seed_from_u64(ctx.seed);
    let mut harness = Harness::new(&ctx.config, open_store(ctx)?)?;
    harness.new_game()?;

    let zone = *ZoneId::ALL.choose(&mut rng).context("no zones")?;
    let scene = ctx
        .config
        .scene_for(zone)
        .with_context(|| format!("{zone} has no scene"))?
        .to_string();

    let mid_load_first = rng.gen_bool(0.5);
    for mid_load in [mid_load_first, !mid_load_first] {
        let faults_before = fault_count(&harness);
        if mid_load {
            harness.loader().fail_mid_load(scene.clone());
            ensure!(harness.app_mut().enter_zone(zone), "faulty {zone} load never started");
        } else {
            harness.loader().fail_on_start(scene.clone());
            ensure!(
                !harness.app_mut().enter_zone(zone),
                "refused {zone} load reported as started"
            );
        }
        let state = harness.settle()?;
        ensure!(state == GameState::Hub, "{zone} fault left the game in {state:?}");
        ensure!(
            fault_count(&harness) == faults_before + 1,
            "{zone} fault was not reported exactly once"
        );
        ensure!(harness.app().mission().is_none(), "faulted {zone} spawned a mission");
        ensure!(harness.app().roster().is_empty(), "faulted {zone} spawned a vehicle");
        ensure!(
            !harness.display().loading_visible(),
            "loading indicator stuck after {zone} fault"
        );
        ensure!(
            !harness.app().progression().is_badge_earned(zone),
            "{zone} fault earned a badge"
        );
        harness.loader().heal(&scene);
    }

    harness.train(zone, &mut rng, true)?;
    ensure!(
        harness.loader().activated().contains(&scene),
        "healed {zone} scene never activated"
    );
    Ok(harness.finish())
}

fn fault_count(harness: &Harness) -> usize {
    harness.count_events(|event| matches!(event, ProgressionEvent::LoadFailed { .. }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_recover_on_several_seeds() {
        for seed in [2, 19, 404] {
            let summary = load_fault(&ScenarioCtx::default().with_seed(seed)).unwrap();
            assert_eq!(summary.load_faults, 2);
            assert_eq!(summary.badges_earned, 1);
            assert_eq!(summary.final_state, Some(GameState::Hub));
        }
    }
}
