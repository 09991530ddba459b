//! Combat lifecycle: slot resets, damage over time, expiry and cleanup.

mod common;

use combat_core::{
    Ability, AbilityKind, ActionType, Actor, ActorId, ActorKind, Boundary, Change, Combatant,
    DurationRule, DurationUnits, EffectKey, EffectTemplate, ItemId, Limitation, LimitationUnits,
    ResourcePools, Status,
};
use combat_runtime::{EngineError, Event, ItemStore, Topic};

use common::{ALLY, GOBLIN, HERO, Harness, self_action};

fn burning() -> EffectTemplate {
    EffectTemplate::new("Burning").with_change(Change::custom(EffectKey::DamageOverTime, "5"))
}

fn brace(h: &Harness) -> ItemId {
    let mut stance = Ability::new(
        ItemId(151),
        "Steady Stance",
        AbilityKind::Trait,
        ActionType::Secondary,
    );
    stance.sacrifices_movement = true;
    h.add_item(stance);
    let mut brace = self_action(150, "Brace", ActionType::Secondary);
    brace.enables = vec![ItemId(151)];
    h.add_item(brace)
}

async fn next_round(h: &Harness) {
    for _ in 0..3 {
        h.engine.next_turn().await.unwrap();
    }
}

#[tokio::test]
async fn turn_start_grants_base_slots_plus_focus() {
    let h = Harness::new([]);
    h.start_skirmish().await;
    assert_eq!(h.actor(HERO).action_state.slot_count(), 2);
    h.edit_actor(HERO, |a| {
        a.toggle_status(Status::Focus, true);
    });

    next_round(&h).await;
    let hero = h.actor(HERO);
    assert_eq!(hero.action_state.slot_count(), 3);
    assert!(!hero.has_status(&Status::Focus));

    h.engine.next_turn().await.unwrap();
    assert_eq!(h.actor(ALLY).action_state.slot_count(), 2);
}

#[tokio::test]
async fn focus_lapses_after_the_next_turn_start() {
    let h = Harness::new([]);
    let brace = brace(&h);
    h.start_skirmish().await;
    h.engine.use_ability(HERO, brace).await.unwrap();
    assert!(h.actor(HERO).has_status(&Status::Focus));

    next_round(&h).await;
    let hero = h.actor(HERO);
    assert_eq!(hero.action_state.slot_count(), 3);
    assert!(!hero.has_status(&Status::Focus));
    assert!(!hero.has_moved);

    next_round(&h).await;
    assert_eq!(h.actor(HERO).action_state.slot_count(), 2);
}

#[tokio::test]
async fn focus_does_not_carry_into_the_next_combat() {
    let h = Harness::new([]);
    let brace = brace(&h);
    h.start_skirmish().await;
    h.engine.use_ability(HERO, brace).await.unwrap();
    h.edit_actor(HERO, |a| {
        a.toggle_status(Status::Custom("bleeding".into()), true);
        a.toggle_status(Status::Brink, true);
    });

    h.engine.end_combat().await.unwrap();
    let hero = h.actor(HERO);
    assert!(!hero.has_status(&Status::Focus));
    assert!(!hero.has_status(&Status::Custom("bleeding".into())));
    assert!(hero.has_status(&Status::Brink));

    h.start_skirmish().await;
    assert_eq!(h.actor(HERO).action_state.slot_count(), 2);
}

#[tokio::test]
async fn damage_over_time_ticks_on_phase_transitions_and_undoes() {
    let h = Harness::new([]);
    h.start_skirmish().await;
    h.plant_effect(HERO, &burning()).await;
    h.plant_effect(ALLY, &burning()).await;

    // hero -> ally stays on the player side
    h.engine.next_turn().await.unwrap();
    assert_eq!(h.actor(HERO).points.hp.value, 30);
    assert_eq!(h.actor(ALLY).points.hp.value, 30);

    // ally -> goblin hands play over
    h.engine.next_turn().await.unwrap();
    assert_eq!(h.actor(ALLY).points.hp.value, 25);

    h.engine.previous_turn().await.unwrap();
    assert_eq!(h.actor(ALLY).points.hp.value, 30);
    assert_eq!(h.actor(HERO).points.hp.value, 30);
}

#[tokio::test]
async fn extreme_damage_over_time_values_saturate() {
    let h = Harness::new([]);
    h.start_skirmish().await;
    h.edit_actor(ALLY, |a| a.points.hp.value = 20);
    let surge = EffectTemplate::new("Wild Surge").with_change(Change::custom(
        EffectKey::DamageOverTime,
        i64::MIN.to_string(),
    ));
    h.plant_effect(ALLY, &surge).await;

    h.engine.next_turn().await.unwrap();
    h.engine.next_turn().await.unwrap();
    assert_eq!(h.actor(ALLY).points.hp.value, 30);

    h.engine.previous_turn().await.unwrap();
    let ally = h.actor(ALLY);
    assert_eq!(ally.points.hp.value, 0);
    assert!(!ally.has_status(&Status::Ko));
}

#[tokio::test]
async fn damage_over_time_can_knock_out() {
    let h = Harness::new([]);
    h.start_skirmish().await;
    h.edit_actor(ALLY, |a| a.points.hp.value = 4);
    h.plant_effect(ALLY, &burning()).await;

    h.engine.next_turn().await.unwrap();
    h.engine.next_turn().await.unwrap();

    let ally = h.actor(ALLY);
    assert_eq!(ally.points.hp.value, 0);
    assert!(ally.has_status(&Status::Ko));
}

#[tokio::test]
async fn turn_boundaries_expire_effects() {
    let h = Harness::new([]);
    h.start_skirmish().await;
    let brief = EffectTemplate::new("Flinch").with_duration(DurationRule::Boundary {
        boundary: Boundary::EndOfThis,
        units: DurationUnits::Turns,
    });
    let round = EffectTemplate::new("Guarded").with_duration(DurationRule::Amount {
        amount: 1,
        units: DurationUnits::Rounds,
    });
    h.plant_effect(GOBLIN, &brief).await;
    h.plant_effect(GOBLIN, &round).await;

    h.engine.next_turn().await.unwrap();
    assert_eq!(h.effect_names(GOBLIN), vec!["Guarded"]);

    h.engine.next_turn().await.unwrap();
    assert_eq!(h.effect_names(GOBLIN), vec!["Guarded"]);

    // wraps into round 2
    h.engine.next_turn().await.unwrap();
    assert!(h.effect_names(GOBLIN).is_empty());
}

#[tokio::test]
async fn ending_combat_keeps_only_persistent_conditions() {
    let h = Harness::new([]);
    let mut surge = self_action(60, "Surge", ActionType::Primary);
    surge.limitation = Some(Limitation {
        max: 1,
        units: LimitationUnits::Combat,
    });
    let surge = h.add_item(surge);

    h.start_skirmish().await;
    h.plant_effect(HERO, &EffectTemplate::new("Haste")).await;
    h.plant_effect(HERO, &EffectTemplate::new("Downed").with_status(Status::Ko))
        .await;
    assert!(h.engine.use_ability(HERO, surge).await.unwrap().handled_successfully);
    assert_eq!(h.store.item_cached(surge).unwrap().uses, 1);

    h.engine.end_combat().await.unwrap();

    assert_eq!(h.effect_names(HERO), vec!["Downed"]);
    assert_eq!(h.store.item_cached(surge).unwrap().uses, 0);
    let hero = h.actor(HERO);
    assert_eq!(hero.action_state.slot_count(), 2);
    assert!(hero.action_state.used.is_empty());
    assert!(h.engine.context().combat().await.is_none());
}

#[tokio::test]
async fn turn_limited_uses_reset_on_the_owners_next_turn() {
    let h = Harness::new([]);
    let mut riposte = self_action(61, "Riposte", ActionType::Secondary);
    riposte.limitation = Some(Limitation {
        max: 1,
        units: LimitationUnits::Turn,
    });
    let riposte = h.add_item(riposte);

    h.start_skirmish().await;
    assert!(h.engine.use_ability(HERO, riposte).await.unwrap().handled_successfully);
    assert!(!h.engine.use_ability(HERO, riposte).await.unwrap().handled_successfully);
    assert!(
        h.notifier
            .warnings()
            .iter()
            .any(|w| w.contains("has no uses left"))
    );

    for _ in 0..3 {
        h.engine.next_turn().await.unwrap();
    }
    assert_eq!(h.store.item_cached(riposte).unwrap().uses, 0);
    assert!(h.engine.use_ability(HERO, riposte).await.unwrap().handled_successfully);
}

#[tokio::test]
async fn turn_controls_need_a_combat() {
    let h = Harness::new([]);
    assert!(matches!(
        h.engine.next_turn().await,
        Err(EngineError::NoActiveCombat)
    ));
    assert!(matches!(
        h.engine.end_combat().await,
        Err(EngineError::NoActiveCombat)
    ));

    h.start_skirmish().await;
    // already at round 1, turn 0
    assert_eq!(h.engine.previous_turn().await.unwrap(), None);
}

#[tokio::test]
async fn late_combatants_join_once() {
    let h = Harness::new([]);
    let wolf = ActorId(4);
    h.store
        .insert_actor(Actor::new(wolf, "Wolf", ActorKind::Npc, ResourcePools::new(12, 0)))
        .unwrap();

    h.start_skirmish().await;
    let late = Combatant::new(wolf, ActorKind::Npc, Some(3));
    h.engine.add_combatant(late.clone()).await.unwrap();
    h.engine.add_combatant(late).await.unwrap();

    let combat = h.engine.context().combat().await.expect("combat active");
    assert_eq!(combat.turns_per_round(), 4);
    assert_eq!(combat.combatants().last().map(|c| c.actor), Some(wolf));
    assert_eq!(combat.current().map(|c| c.actor), Some(HERO));
}

#[tokio::test]
async fn observers_see_turn_changes() {
    let h = Harness::new([]);
    let mut updates = h.engine.observe(Topic::Combat).expect("combat topic");

    h.start_skirmish().await;
    h.engine.next_turn().await.unwrap();

    let Event::CombatUpdated { change, .. } = updates.recv().await.unwrap() else {
        panic!("expected a combat update");
    };
    assert_eq!(change.current.round, 1);
    let Event::CombatUpdated { change, combat } = updates.recv().await.unwrap() else {
        panic!("expected a combat update");
    };
    assert!(change.is_forward());
    assert_eq!(combat.current().map(|c| c.actor), Some(ALLY));
}
