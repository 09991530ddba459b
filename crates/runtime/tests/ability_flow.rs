//! End-to-end ability use: guards, resolution, damage settlement and undo.

mod common;

use combat_core::{ActionType, DamageState, EffectTemplate, SlotTag, TargetMode};
use combat_runtime::{ActionLog, EngineError, GuardChain, GuardKind, SlotManager};

use common::{GOBLIN, HERO, Harness, action, carrier, self_action};

#[tokio::test]
async fn natural_twenty_doubles_healing_and_spends_mp() {
    let h = Harness::new([20, 3, 4]);
    let mut cure = self_action(10, "Cure", ActionType::Primary);
    cure.cost_mp = 4;
    cure.healing = Some("1d8".into());
    let cure = h.add_item(cure);
    h.edit_actor(HERO, |a| a.points.hp.value = 10);

    let result = h
        .engine
        .use_ability(HERO, cure)
        .await
        .expect("ability should resolve");

    assert!(result.handled_successfully);
    assert!(result.is_critical);
    assert_eq!(result.is_success, None);
    assert_eq!(result.targets, vec![HERO]);
    assert_eq!(h.roller.evaluated_formulas(), vec!["1d20", "2d8"]);

    let hero = h.actor(HERO);
    assert_eq!(hero.points.mp.value, 6);
    assert_eq!(hero.points.hp.value, 17);
}

#[tokio::test]
async fn missing_guard_rejects_without_side_effects() {
    let mut guards = GuardChain::standard();
    guards.unregister(GuardKind::IsAction);
    let h = Harness::with_guards([20], guards);
    let mut cure = self_action(10, "Cure", ActionType::Primary);
    cure.cost_mp = 4;
    cure.healing = Some("1d8".into());
    let cure = h.add_item(cure);

    let result = h.engine.use_ability(HERO, cure).await.expect("no hard error");

    assert!(!result.handled_successfully);
    assert_eq!(h.actor(HERO).points.mp.value, 10);
    assert!(h.roller.evaluated_formulas().is_empty());
    let errors = h.notifier.errors();
    assert!(
        errors.iter().any(|e| e.contains("isAction is not registered")),
        "{errors:?}"
    );
}

#[tokio::test]
async fn critical_strike_rolls_doubled_damage_and_settles_it() {
    // check die, then four d6 for the doubled "2d6+3"
    let h = Harness::new([20, 2, 2, 2, 2]);
    let mut slash = action(20, "Slash", ActionType::Primary);
    slash.target = TargetMode::Enemy;
    slash.resistance = Some("defense".into());
    slash.base_damage = Some("2d6+3".into());
    let slash = h.add_item(slash);

    h.start_skirmish().await;
    h.engine.select_targets(vec![GOBLIN]);
    let result = h
        .engine
        .use_ability(HERO, slash)
        .await
        .expect("ability should resolve");

    assert!(result.handled_successfully);
    assert!(result.is_critical);
    assert_eq!(result.is_success, Some(true));
    assert!(h.roller.evaluated_formulas().contains(&"4d6+3".to_owned()));

    let message = result.message.expect("log entry written");
    let entry = h.store.entry(message).await.unwrap().expect("entry stored");
    assert_eq!(entry.damage[&GOBLIN].amount, 11);
    assert_eq!(entry.damage[&GOBLIN].state, DamageState::Pending);
    assert!(!h.actor(HERO).action_state.is_available(&SlotTag::Primary));

    let lost = h.engine.apply_damage(message, GOBLIN).await.unwrap();
    assert_eq!(lost, 11);
    assert_eq!(h.actor(GOBLIN).points.hp.value, 19);
    // settling twice is a no-op
    assert_eq!(h.engine.apply_damage(message, GOBLIN).await.unwrap(), 0);

    assert!(!h.engine.delete_log_entry(message).await.unwrap());
    assert!(!h.notifier.warnings().is_empty());

    h.engine.revert_damage(message, GOBLIN).await.unwrap();
    assert_eq!(h.actor(GOBLIN).points.hp.value, 30);
    assert!(h.engine.delete_log_entry(message).await.unwrap());
    assert!(h.actor(HERO).action_state.is_available(&SlotTag::Primary));
}

#[tokio::test]
async fn failed_check_deals_no_damage() {
    let h = Harness::new([3]);
    let mut slash = action(20, "Slash", ActionType::Primary);
    slash.target = TargetMode::Enemy;
    slash.resistance = Some("defense".into());
    slash.base_damage = Some("2d6+3".into());
    let slash = h.add_item(slash);

    h.start_skirmish().await;
    h.engine.select_targets(vec![GOBLIN]);
    let result = h.engine.use_ability(HERO, slash).await.unwrap();

    assert!(result.handled_successfully);
    assert_eq!(result.is_success, Some(false));
    let entry = h
        .store
        .entry(result.message.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert!(entry.damage.is_empty());
    // the slot is spent on a miss
    assert!(!h.actor(HERO).action_state.is_available(&SlotTag::Primary));
}

#[tokio::test]
async fn pending_damage_blocks_the_next_action() {
    let h = Harness::new([15, 1, 1]);
    let mut slash = action(20, "Slash", ActionType::Primary);
    slash.target = TargetMode::Enemy;
    slash.base_damage = Some("2d6".into());
    let slash = h.add_item(slash);
    let jab = h.add_item({
        let mut jab = action(21, "Jab", ActionType::Secondary);
        jab.target = TargetMode::Enemy;
        jab
    });

    h.start_skirmish().await;
    h.engine.select_targets(vec![GOBLIN]);
    assert!(h.engine.use_ability(HERO, slash).await.unwrap().handled_successfully);

    let blocked = h.engine.use_ability(HERO, jab).await.unwrap();
    assert!(!blocked.handled_successfully);
    assert!(
        h.notifier
            .warnings()
            .iter()
            .any(|w| w.contains("hasNoUnappliedDamage"))
    );
}

#[tokio::test]
async fn reaction_is_limited_to_one_per_round() {
    let h = Harness::new([]);
    let parry = h.add_item(self_action(30, "Parry", ActionType::Reaction));

    h.start_skirmish().await;
    // off-turn: the ally acts now
    h.engine.next_turn().await.unwrap();

    let first = h.engine.use_ability(HERO, parry).await.unwrap();
    assert!(first.handled_successfully);
    let hero = h.actor(HERO);
    assert!(hero.action_state.used_reaction);
    assert_eq!(hero.action_state.slot_count(), 2);

    let second = h.engine.use_ability(HERO, parry).await.unwrap();
    assert!(!second.handled_successfully);

    h.engine.next_turn().await.unwrap();
    assert!(!h.actor(HERO).action_state.used_reaction);
}

#[tokio::test]
async fn deleting_an_entry_refunds_mp_and_slot_once() {
    let h = Harness::new([]);
    let mut fire = self_action(40, "Kindle", ActionType::Secondary);
    fire.cost_mp = 4;
    fire.barrier = Some("3".into());
    let fire = h.add_item(fire);

    h.start_skirmish().await;
    let result = h.engine.use_ability(HERO, fire).await.unwrap();
    let message = result.message.expect("entry");
    let hero = h.actor(HERO);
    assert_eq!(hero.points.mp.value, 6);
    assert_eq!(hero.points.bp.value, 3);
    assert!(!hero.action_state.is_available(&SlotTag::Secondary));

    assert!(h.engine.delete_log_entry(message).await.unwrap());
    let hero = h.actor(HERO);
    assert_eq!(hero.points.mp.value, 10);
    assert!(hero.action_state.is_available(&SlotTag::Secondary));
    assert_eq!(hero.action_state.slot_count(), 2);

    let err = h.engine.delete_log_entry(message).await.unwrap_err();
    assert!(matches!(err, EngineError::LogEntryNotFound(id) if id == message));
}

#[tokio::test]
async fn deleting_a_reaction_frees_the_reaction() {
    let h = Harness::new([]);
    let mut parry = self_action(30, "Parry", ActionType::Reaction);
    parry.cost_mp = 2;
    let parry = h.add_item(parry);

    h.start_skirmish().await;
    h.engine.next_turn().await.unwrap();
    let result = h.engine.use_ability(HERO, parry).await.unwrap();
    let message = result.message.expect("entry");
    assert!(h.actor(HERO).action_state.used_reaction);
    assert_eq!(h.actor(HERO).points.mp.value, 8);

    assert!(h.engine.delete_log_entry(message).await.unwrap());
    let hero = h.actor(HERO);
    assert!(!hero.action_state.used_reaction);
    assert_eq!(hero.points.mp.value, 10);
    assert_eq!(hero.action_state.slot_count(), 2);

    // the freed reaction can be spent again this round
    assert!(h.engine.use_ability(HERO, parry).await.unwrap().handled_successfully);
}

#[tokio::test]
async fn rolling_back_an_entry_twice_refunds_once() {
    let h = Harness::new([]);
    let mut fire = self_action(40, "Kindle", ActionType::Secondary);
    fire.cost_mp = 4;
    let fire = h.add_item(fire);

    h.start_skirmish().await;
    let message = h
        .engine
        .use_ability(HERO, fire)
        .await
        .unwrap()
        .message
        .expect("entry");
    let ctx = h.engine.context();

    let mut entry = h.store.entry(message).await.unwrap().expect("stored");
    assert!(SlotManager::rollback(ctx, &mut entry).await.unwrap());

    // a fresh read sees the refund already taken
    let mut again = h.store.entry(message).await.unwrap().expect("stored");
    assert!(!SlotManager::rollback(ctx, &mut again).await.unwrap());
    assert!(!SlotManager::rollback(ctx, &mut entry).await.unwrap());

    let hero = h.actor(HERO);
    assert_eq!(hero.points.mp.value, 10);
    assert_eq!(hero.action_state.slot_count(), 2);
    assert_eq!(
        hero.action_state
            .available
            .iter()
            .filter(|s| **s == SlotTag::Secondary)
            .count(),
        1
    );
}

#[tokio::test]
async fn applied_damage_blocks_deleting_the_entry() {
    let h = Harness::new([15, 1, 1]);
    let mut slash = action(20, "Slash", ActionType::Primary);
    slash.target = TargetMode::Enemy;
    slash.cost_mp = 3;
    slash.base_damage = Some("2d6".into());
    let slash = h.add_item(slash);

    h.start_skirmish().await;
    h.engine.select_targets(vec![GOBLIN]);
    let message = h
        .engine
        .use_ability(HERO, slash)
        .await
        .unwrap()
        .message
        .expect("entry");
    h.engine.apply_damage(message, GOBLIN).await.unwrap();

    assert!(!h.engine.delete_log_entry(message).await.unwrap());
    assert!(
        h.notifier
            .warnings()
            .iter()
            .any(|w| w.contains("revert it first"))
    );
    let hero = h.actor(HERO);
    assert_eq!(hero.points.mp.value, 7);
    assert!(!hero.action_state.is_available(&SlotTag::Primary));
    let entry = h.store.entry(message).await.unwrap().expect("entry kept");
    assert_eq!(entry.damage[&GOBLIN].state, DamageState::Applied);
}

#[tokio::test]
async fn prerequisite_effects_are_claimed_one_at_a_time() {
    let h = Harness::new([]);
    let charge = h.add_item(carrier(90, EffectTemplate::new("Charged")));
    let mut overload = self_action(91, "Overload", ActionType::Primary);
    overload.requires = vec![charge];
    overload.cost_mp = 20;
    let overload = h.add_item(overload);
    let mut discharge = self_action(92, "Discharge", ActionType::Primary);
    discharge.requires = vec![charge];
    let discharge = h.add_item(discharge);

    h.start_skirmish().await;
    h.plant_effect(HERO, &EffectTemplate::new("Charged")).await;
    h.plant_effect(HERO, &EffectTemplate::new("Charged")).await;

    // the MP check rejects after the prerequisite was flagged
    assert!(!h.engine.use_ability(HERO, overload).await.unwrap().handled_successfully);
    let hero = h.actor(HERO);
    assert_eq!(hero.effects.len(), 2);
    assert!(hero.effects.iter().all(|e| !e.flags.pending_deletion));

    assert!(h.engine.use_ability(HERO, discharge).await.unwrap().handled_successfully);
    let hero = h.actor(HERO);
    assert_eq!(hero.effects.len(), 1);
    assert!(!hero.effects[0].flags.pending_deletion);
}

#[tokio::test]
async fn secondary_falls_back_to_primary_slot() {
    let h = Harness::new([]);
    let dash = h.add_item(self_action(50, "Dash", ActionType::Secondary));

    h.start_skirmish().await;
    assert!(h.engine.use_ability(HERO, dash).await.unwrap().handled_successfully);
    assert!(h.engine.use_ability(HERO, dash).await.unwrap().handled_successfully);
    let hero = h.actor(HERO);
    assert!(hero.action_state.available.is_empty());

    let third = h.engine.use_ability(HERO, dash).await.unwrap();
    assert!(!third.handled_successfully);
}

#[tokio::test]
async fn not_your_turn_is_rejected() {
    let h = Harness::new([]);
    let dash = h.add_item(self_action(50, "Dash", ActionType::Secondary));

    h.start_skirmish().await;
    h.engine.next_turn().await.unwrap();
    let result = h.engine.use_ability(HERO, dash).await.unwrap();

    assert!(!result.handled_successfully);
    assert!(
        h.notifier
            .warnings()
            .iter()
            .any(|w| w.contains("it is not your turn"))
    );
}
