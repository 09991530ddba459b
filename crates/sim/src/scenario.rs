//! A scripted skirmish: two players against a goblin.
use std::sync::Arc;

use anyhow::{Context, Result};
use combat_core::{
    Ability, AbilityKind, ActionType, Actor, ActorId, ActorKind, Attributes, Change, Combatant,
    DamageState, EffectKey, EffectTemplate, ItemId, ResourcePools, TargetMode,
};
use combat_runtime::{ActionLog, ActorStore, Engine, InMemoryStore};
use tracing::{info, warn};

use crate::config::SimConfig;

const ARIA: ActorId = ActorId(1);
const BRANN: ActorId = ActorId(2);
const GOBLIN: ActorId = ActorId(3);

const SLASH: ItemId = ItemId(1);
const KINDLE: ItemId = ItemId(2);
const MEND: ItemId = ItemId(3);
const BASH: ItemId = ItemId(4);
const CLAW: ItemId = ItemId(5);
const BURNING: ItemId = ItemId(6);

/// Final standing of one actor.
#[derive(Debug)]
pub struct Standing {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub effects: Vec<String>,
}

#[derive(Debug)]
pub struct Outcome {
    pub rounds: u32,
    pub standings: Vec<Standing>,
}

pub struct Skirmish {
    engine: Engine,
    store: Arc<InMemoryStore>,
    rounds: u32,
}

impl Skirmish {
    pub fn new(config: SimConfig) -> Result<Self> {
        let store = Arc::new(InMemoryStore::new());
        seed(&store).context("failed to seed the encounter")?;

        let engine = Engine::builder()
            .config(config.engine)
            .store(Arc::clone(&store))
            .build()
            .context("failed to build engine")?;

        Ok(Self {
            engine,
            store,
            rounds: config.rounds,
        })
    }

    pub async fn run(self) -> Result<Outcome> {
        self.engine
            .start_combat(vec![
                Combatant::new(ARIA, ActorKind::Player, Some(18)),
                Combatant::new(BRANN, ActorKind::Player, Some(11)),
                Combatant::new(GOBLIN, ActorKind::Npc, Some(14)),
            ])
            .await?;

        let mut played = 0;
        'rounds: while played < self.rounds {
            let Some(combat) = self.engine.context().combat().await else {
                break;
            };
            played = combat.round();
            for _ in 0..combat.turns_per_round() {
                let Some(current) = self.engine.context().combat().await else {
                    break 'rounds;
                };
                let Some(actor) = current.current().map(|c| c.actor) else {
                    break 'rounds;
                };
                self.take_turn(actor).await?;
                if self.is_downed(GOBLIN)? {
                    info!(round = played, "goblin is down");
                    break 'rounds;
                }
                self.engine.next_turn().await?;
            }
        }

        self.engine.end_combat().await?;
        self.outcome(played)
    }

    async fn take_turn(&self, actor: ActorId) -> Result<()> {
        let plan: &[(ItemId, ActorId)] = match actor {
            ARIA => &[(SLASH, GOBLIN), (KINDLE, GOBLIN)],
            BRANN => &[(BASH, GOBLIN), (MEND, BRANN)],
            _ => &[(CLAW, ARIA)],
        };

        for &(item, target) in plan {
            self.engine.select_targets(vec![target]);
            let result = self.engine.use_ability(actor, item).await?;
            if !result.handled_successfully {
                warn!(actor = %actor, item = %item, "action did not resolve");
                continue;
            }
            info!(
                actor = %actor,
                item = %item,
                critical = result.is_critical,
                success = ?result.is_success,
                "action resolved"
            );

            let Some(message) = result.message else {
                continue;
            };
            let Some(entry) = self.store.entry(message).await? else {
                continue;
            };
            for (defender, damage) in &entry.damage {
                if damage.state == DamageState::Pending {
                    let lost = self.engine.apply_damage(message, *defender).await?;
                    info!(defender = %defender, lost, "damage landed");
                }
            }
        }
        Ok(())
    }

    fn is_downed(&self, id: ActorId) -> Result<bool> {
        let actor = self
            .store
            .actor_cached(id)
            .with_context(|| format!("actor {id} vanished"))?;
        Ok(actor.points.hp.value == 0)
    }

    fn outcome(&self, rounds: u32) -> Result<Outcome> {
        let standings = [ARIA, BRANN, GOBLIN]
            .into_iter()
            .map(|id| {
                let actor = self
                    .store
                    .actor_cached(id)
                    .with_context(|| format!("actor {id} vanished"))?;
                Ok(Standing {
                    name: actor.name,
                    hp: actor.points.hp.value,
                    max_hp: actor.points.hp.max,
                    effects: actor.effects.into_iter().map(|e| e.name).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Outcome { rounds, standings })
    }
}

fn seed(store: &InMemoryStore) -> Result<()> {
    store.insert_actor(
        Actor::new(ARIA, "Aria", ActorKind::Player, ResourcePools::new(30, 12)).with_attributes(
            Attributes::default()
                .with_primary("might", 3)
                .with_secondary("defense", 12),
        ),
    )?;
    store.insert_actor(
        Actor::new(BRANN, "Brann", ActorKind::Player, ResourcePools::new(26, 10))
            .with_attributes(Attributes::default().with_secondary("defense", 11)),
    )?;
    store.insert_actor(
        Actor::new(GOBLIN, "Goblin", ActorKind::Npc, ResourcePools::new(40, 0)).with_attributes(
            Attributes::default()
                .with_primary("defense", 10)
                .with_primary("might", 1),
        ),
    )?;

    let burning = EffectTemplate::new("Burning")
        .with_change(Change::custom(EffectKey::DamageOverTime, "3"));
    store.insert_item(Ability::effect_item(BURNING, "Burning", vec![burning]))?;

    store.insert_item(ability(SLASH, "Slash", ARIA, ActionType::Primary, |a| {
        a.target = TargetMode::Enemy;
        a.check_attribute = Some("might".into());
        a.resistance = Some("defense".into());
        a.base_damage = Some("1d8+@might".into());
    }))?;
    store.insert_item(ability(KINDLE, "Kindle", ARIA, ActionType::Secondary, |a| {
        a.target = TargetMode::Enemy;
        a.cost_mp = 3;
        a.resistance = Some("defense".into());
        a.grants = vec![BURNING];
    }))?;
    store.insert_item(ability(BASH, "Shield Bash", BRANN, ActionType::Primary, |a| {
        a.target = TargetMode::Enemy;
        a.resistance = Some("defense".into());
        a.base_damage = Some("1d6+1".into());
    }))?;
    store.insert_item(ability(MEND, "Mend", BRANN, ActionType::Secondary, |a| {
        a.target = TargetMode::SelfOnly;
        a.cost_mp = 2;
        a.healing = Some("1d6+1".into());
    }))?;
    store.insert_item(ability(CLAW, "Claw", GOBLIN, ActionType::Primary, |a| {
        a.target = TargetMode::Enemy;
        a.check_attribute = Some("might".into());
        a.resistance = Some("defense".into());
        a.base_damage = Some("1d6".into());
    }))?;
    Ok(())
}

fn ability(
    id: ItemId,
    name: &str,
    owner: ActorId,
    action_type: ActionType,
    configure: impl FnOnce(&mut Ability),
) -> Ability {
    let mut ability = Ability::new(id, name, AbilityKind::Action, action_type);
    ability.owner = Some(owner);
    configure(&mut ability);
    ability
}
