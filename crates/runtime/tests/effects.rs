//! Effect application, stacking and the built-in processors.

mod common;

use combat_core::{
    AbilityKind, ActionType, Change, DurationRule, EffectKey, EffectTemplate, ItemId, Qualifier,
    RulesConfig, SlotTag, StackingPolicy, Status, TargetMode,
};
use combat_runtime::{ActionLog, EffectPipeline, ItemStore};

use common::{ALLY, GOBLIN, HERO, Harness, action, carrier, self_action};

#[tokio::test]
async fn different_source_stacks_once_per_granting_actor() {
    let h = Harness::new([]);
    let ctx = h.engine.context();
    h.add_item(carrier(70, EffectTemplate::new("Blessed")));
    let bless = action(60, "Bless", ActionType::Primary);
    let greater = action(61, "Greater Bless", ActionType::Primary);
    let lesser = action(62, "Lesser Bless", ActionType::Primary);
    let pipeline = EffectPipeline;

    pipeline
        .apply_granted(ctx, &bless, &[ItemId(70)], &[GOBLIN], HERO)
        .await
        .unwrap();
    // same granting item again: already applied
    pipeline
        .apply_granted(ctx, &bless, &[ItemId(70)], &[GOBLIN], HERO)
        .await
        .unwrap();
    pipeline
        .apply_granted(ctx, &greater, &[ItemId(70)], &[GOBLIN], ALLY)
        .await
        .unwrap();
    // another item, but the hero already holds an instance on the goblin
    pipeline
        .apply_granted(ctx, &lesser, &[ItemId(70)], &[GOBLIN], HERO)
        .await
        .unwrap();

    let goblin = h.actor(GOBLIN);
    let sources: Vec<_> = goblin.effects.iter().map(|e| e.source).collect();
    assert_eq!(sources, vec![Some(HERO), Some(ALLY)]);
}

#[tokio::test]
async fn replaces_keeps_only_the_newest_instance() {
    let h = Harness::new([]);
    let ctx = h.engine.context();
    h.add_item(carrier(
        71,
        EffectTemplate::new("Marked").with_stacking(StackingPolicy::Replaces),
    ));
    let mark = action(60, "Mark", ActionType::Primary);
    let hunt = action(61, "Hunter's Mark", ActionType::Primary);

    EffectPipeline
        .apply_granted(ctx, &mark, &[ItemId(71)], &[GOBLIN], HERO)
        .await
        .unwrap();
    EffectPipeline
        .apply_granted(ctx, &hunt, &[ItemId(71)], &[GOBLIN], ALLY)
        .await
        .unwrap();

    let goblin = h.actor(GOBLIN);
    assert_eq!(goblin.effects.len(), 1);
    assert_eq!(goblin.effects[0].source, Some(ALLY));
    assert_eq!(goblin.effects[0].origin_item(), Some(ItemId(61)));
}

#[tokio::test]
async fn any_source_always_stacks() {
    let h = Harness::new([]);
    let ctx = h.engine.context();
    h.add_item(carrier(
        72,
        EffectTemplate::new("Bleeding").with_stacking(StackingPolicy::AnySource),
    ));
    let cut = action(60, "Cut", ActionType::Primary);

    for _ in 0..2 {
        EffectPipeline
            .apply_granted(ctx, &cut, &[ItemId(72)], &[GOBLIN], HERO)
            .await
            .unwrap();
    }
    assert_eq!(h.effect_names(GOBLIN), vec!["Bleeding", "Bleeding"]);
}

#[tokio::test]
async fn status_templates_toggle_statuses_instead_of_creating_effects() {
    let h = Harness::new([]);
    let ctx = h.engine.context();
    h.add_item(carrier(73, EffectTemplate::new("Stun").with_status(Status::Ko)));
    let bash = action(60, "Bash", ActionType::Primary);

    EffectPipeline
        .apply_granted(ctx, &bash, &[ItemId(73)], &[GOBLIN], HERO)
        .await
        .unwrap();

    let goblin = h.actor(GOBLIN);
    assert!(goblin.has_status(&Status::Ko));
    assert!(goblin.effects.is_empty());
}

#[tokio::test]
async fn unregistered_change_key_is_reported() {
    let h = Harness::new([]);
    h.add_item(carrier(
        81,
        EffectTemplate::new("Dreaming")
            .with_change(Change::custom(EffectKey::Other("LucidDreaming".into()), "1")),
    ));
    let mut dream = self_action(80, "Dream", ActionType::Primary);
    dream.source_grants = vec![ItemId(81)];
    let dream = h.add_item(dream);

    let result = h.engine.use_ability(HERO, dream).await.unwrap();

    assert!(result.handled_successfully);
    let errors = h.notifier.errors();
    assert!(
        errors
            .iter()
            .any(|e| e.contains("no processor registered for effect key LucidDreaming")),
        "{errors:?}"
    );
}

#[tokio::test]
async fn next_ability_effect_survives_its_own_ability() {
    let h = Harness::new([]);
    h.add_item(carrier(101, EffectTemplate::new("Aimed")));
    let mut aim = self_action(100, "Aim", ActionType::Primary);
    aim.source_grants = vec![ItemId(101)];
    aim.durations = vec![DurationRule::Qualifier(Qualifier::NextAbility)];
    let aim = h.add_item(aim);
    let strike = h.add_item(self_action(102, "Strike", ActionType::Primary));

    h.engine.use_ability(HERO, aim).await.unwrap();
    assert_eq!(h.effect_names(HERO), vec!["Aimed"]);

    h.engine.use_ability(HERO, aim).await.unwrap();
    assert_eq!(h.effect_names(HERO), vec!["Aimed"]);

    h.engine.use_ability(HERO, strike).await.unwrap();
    assert!(h.effect_names(HERO).is_empty());
}

#[tokio::test]
async fn until_damage_ends_when_damage_lands() {
    let h = Harness::new([10, 4]);
    let shield = h.add_item(carrier(
        110,
        EffectTemplate::new("Warded").with_duration(DurationRule::Qualifier(Qualifier::UntilDamage)),
    ));
    let mut ward = action(111, "Ward", ActionType::Primary);
    ward.grants = vec![shield];
    ward.target = TargetMode::Enemy;
    ward.base_damage = Some("1d6".into());
    let ward = h.add_item(ward);

    h.engine.select_targets(vec![GOBLIN]);
    let result = h.engine.use_ability(HERO, ward).await.unwrap();
    assert_eq!(h.effect_names(GOBLIN), vec!["Warded"]);

    h.engine
        .apply_damage(result.message.unwrap(), GOBLIN)
        .await
        .unwrap();
    assert!(h.effect_names(GOBLIN).is_empty());
    assert_eq!(h.actor(GOBLIN).points.hp.value, 26);
}

#[tokio::test]
async fn damage_only_restriction_blocks_pure_support() {
    let h = Harness::new([]);
    let limiter = EffectTemplate::new(RulesConfig::DEFAULT_LIMITER_EFFECT_NAME)
        .with_change(Change::custom(EffectKey::AbilitiesLimiter, ""));
    h.plant_effect(HERO, &limiter).await;
    let mut cure = self_action(10, "Cure", ActionType::Primary);
    cure.cost_mp = 4;
    cure.healing = Some("1d8".into());
    let cure = h.add_item(cure);

    let result = h.engine.use_ability(HERO, cure).await.unwrap();

    assert!(!result.handled_successfully);
    assert_eq!(h.actor(HERO).points.mp.value, 10);
    assert!(h.effect_names(HERO).is_empty());
    assert!(
        h.notifier
            .warnings()
            .contains(&"Your next ability can only deal damage".to_owned())
    );
}

#[tokio::test]
async fn damage_only_restriction_strips_healing_from_mixed_abilities() {
    let h = Harness::new([12, 4]);
    let limiter = EffectTemplate::new(RulesConfig::DEFAULT_LIMITER_EFFECT_NAME)
        .with_change(Change::custom(EffectKey::AbilitiesLimiter, ""));
    h.plant_effect(HERO, &limiter).await;
    h.edit_actor(HERO, |a| a.points.hp.value = 10);
    let mut drain = action(11, "Drain", ActionType::Primary);
    drain.target = TargetMode::Enemy;
    drain.base_damage = Some("1d6".into());
    drain.healing = Some("1d6".into());
    let drain = h.add_item(drain);

    h.engine.select_targets(vec![GOBLIN]);
    let result = h.engine.use_ability(HERO, drain).await.unwrap();

    assert!(result.handled_successfully);
    assert_eq!(h.actor(HERO).points.hp.value, 10);
    let entry = h
        .store
        .entry(result.message.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.damage[&GOBLIN].amount, 4);
    assert!(h.effect_names(HERO).is_empty());
}

#[tokio::test]
async fn primary_damage_buff_adds_flat_bonus() {
    let h = Harness::new([10, 3, 10, 3]);
    let buff = EffectTemplate::new("Fury")
        .with_change(Change::custom(EffectKey::PrimaryBaseDamageBuff, "2"));
    h.plant_effect(HERO, &buff).await;
    let mut slash = action(20, "Slash", ActionType::Primary);
    slash.target = TargetMode::Enemy;
    slash.base_damage = Some("1d6".into());
    let slash = h.add_item(slash);
    let mut jab = action(21, "Jab", ActionType::Secondary);
    jab.target = TargetMode::Enemy;
    jab.base_damage = Some("1d6".into());
    let jab = h.add_item(jab);

    h.engine.select_targets(vec![GOBLIN]);
    let primary = h.engine.use_ability(HERO, slash).await.unwrap();
    let secondary = h.engine.use_ability(HERO, jab).await.unwrap();

    let amount = |entry: combat_core::ActionLogEntry| entry.damage[&GOBLIN].amount;
    let primary = h.store.entry(primary.message.unwrap()).await.unwrap().unwrap();
    let secondary = h
        .store
        .entry(secondary.message.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(amount(primary), 5);
    assert_eq!(amount(secondary), 3);
}

#[tokio::test]
async fn reroll_adds_kept_dice_to_direct_hits() {
    let h = Harness::new([10, 1, 6, 5]);
    let reroll = EffectTemplate::new("Precision")
        .with_change(Change::custom(EffectKey::DamageDiceReroll, "1"));
    h.plant_effect(HERO, &reroll).await;
    let mut shot = action(22, "Shot", ActionType::Primary);
    shot.target = TargetMode::Enemy;
    shot.direct_hit_damage = Some("2d6".into());
    let shot = h.add_item(shot);

    h.engine.select_targets(vec![GOBLIN]);
    let result = h.engine.use_ability(HERO, shot).await.unwrap();

    assert!(h.roller.evaluated_formulas().contains(&"3d6kh2".to_owned()));
    let entry = h
        .store
        .entry(result.message.unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(entry.damage[&GOBLIN].amount, 11);
}

#[tokio::test]
async fn proc_applies_linked_effects_when_the_die_meets_the_threshold() {
    // check die, then the fresh proc d20
    let h = Harness::new([5, 19, 5, 10]);
    h.add_item(carrier(121, EffectTemplate::new("Lucky")));
    let mut swing = self_action(120, "Lucky Swing", ActionType::Primary);
    swing.proc_trigger = Some(18);
    swing.procs = vec![ItemId(121)];
    let swing = h.add_item(swing);

    h.engine.use_ability(HERO, swing).await.unwrap();
    assert_eq!(h.effect_names(HERO), vec!["Lucky"]);

    h.edit_actor(HERO, |a| a.effects.clear());
    h.engine.use_ability(HERO, swing).await.unwrap();
    assert!(h.effect_names(HERO).is_empty());
}

#[tokio::test]
async fn transferred_effect_follows_its_original() {
    let h = Harness::new([]);
    h.add_item(carrier(
        131,
        EffectTemplate::new("Inspired")
            .with_change(Change::custom(EffectKey::TransferEffectToAllies, "")),
    ));
    let mut rally = self_action(130, "Rally", ActionType::Secondary);
    rally.source_grants = vec![ItemId(131)];
    let rally = h.add_item(rally);

    h.start_skirmish().await;
    let result = h.engine.use_ability(HERO, rally).await.unwrap();
    assert!(result.handled_successfully);

    let clone = h
        .actor(ALLY)
        .find_effect_named("Inspired")
        .cloned()
        .expect("ally receives a copy");
    assert_eq!(clone.flags.transferred_by, Some(HERO));
    assert_eq!(clone.duration.rule, DurationRule::None);
    assert!(h.effect_names(GOBLIN).is_empty());

    let original = h.actor(HERO).find_effect_named("Inspired").unwrap().id;
    EffectPipeline
        .delete_effect(h.engine.context(), HERO, original)
        .await
        .unwrap();
    assert!(h.effect_names(ALLY).is_empty());
}

#[tokio::test]
async fn enabler_opens_a_custom_slot() {
    let h = Harness::new([]);
    h.add_item(carrier(
        141,
        EffectTemplate::new("Flurry")
            .with_change(Change::custom(EffectKey::EnableCombatTurnSlot, "flurry")),
    ));
    let mut ready = self_action(140, "Ready Flurry", ActionType::Secondary);
    ready.enables = vec![ItemId(141)];
    let ready = h.add_item(ready);

    h.start_skirmish().await;
    assert!(h.engine.use_ability(HERO, ready).await.unwrap().handled_successfully);

    let hero = h.actor(HERO);
    assert!(hero.action_state.is_available(&SlotTag::Custom("flurry".into())));
    assert!(!hero.action_state.is_available(&SlotTag::Secondary));
    assert_eq!(h.effect_names(HERO), vec!["Flurry"]);
}

#[tokio::test]
async fn consuming_a_custom_slot_spends_the_effect_that_opened_it() {
    let h = Harness::new([]);
    let flurry = h.add_item(carrier(
        141,
        EffectTemplate::new("Flurry")
            .with_change(Change::custom(EffectKey::EnableCombatTurnSlot, "flurry")),
    ));
    let mut ready = self_action(140, "Ready Flurry", ActionType::Primary);
    ready.enables = vec![flurry];
    let ready = h.add_item(ready);
    let mut strike = self_action(142, "Flurry Strike", ActionType::Primary);
    strike.tags.insert("flurry".into());
    let strike = h.add_item(strike);

    h.start_skirmish().await;
    h.engine.use_ability(HERO, ready).await.unwrap();
    assert_eq!(h.store.item_cached(flurry).unwrap().uses, 0);

    assert!(h.engine.use_ability(HERO, strike).await.unwrap().handled_successfully);

    let hero = h.actor(HERO);
    assert!(!hero.action_state.is_available(&SlotTag::Custom("flurry".into())));
    assert!(h.effect_names(HERO).is_empty());
    assert_eq!(h.store.item_cached(flurry).unwrap().uses, 1);
}

#[tokio::test]
async fn sacrificing_movement_grants_focus_once_per_turn() {
    let h = Harness::new([]);
    let mut steady = combat_core::Ability::new(
        ItemId(151),
        "Steady Stance",
        AbilityKind::Trait,
        ActionType::Secondary,
    );
    steady.sacrifices_movement = true;
    h.add_item(steady);
    let mut brace = self_action(150, "Brace", ActionType::Secondary);
    brace.enables = vec![ItemId(151)];
    let brace = h.add_item(brace);

    h.start_skirmish().await;
    h.engine.use_ability(HERO, brace).await.unwrap();

    let hero = h.actor(HERO);
    assert!(hero.has_status(&Status::Focus));
    assert!(hero.has_moved);
    // the bonus secondary replaces the one Brace spent
    assert!(hero.action_state.is_available(&SlotTag::Secondary));
    assert_eq!(hero.action_state.slot_count(), 3);

    h.engine.use_ability(HERO, brace).await.unwrap();
    assert!(
        h.notifier
            .warnings()
            .iter()
            .any(|w| w.contains("has already moved this turn"))
    );
}
