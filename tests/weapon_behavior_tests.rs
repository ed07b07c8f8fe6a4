//! Weapon-firing behavior integration tests.
//!
//! Game data here is loaded from JSON, the way a data-driven game would
//! ship it, and the tests check how reaction, continuous and death
//! weapons interact through the damage pipeline.

use rts_behaviors::core::{DamageType, DeathType, TeamId, FOREVER};
use rts_behaviors::services::EffectEvent;
use rts_behaviors::{
    Coord3, DamageInfo, GameData, ModuleHandle, ObjectId, SimConfig, Simulation, ThingTemplate, WeaponTemplate,
};

const WEAPONS: &str = r#"[
    { "name": "Sparks", "primary_damage": 0.0 },
    { "name": "Flamer", "primary_damage": 1.0, "delay_between_shots": 3 },
    {
        "name": "Wreck",
        "primary_damage": 60.0,
        "primary_radius": 25.0,
        "damage_type": "Explosion",
        "death_type": "Exploded"
    }
]"#;

const TEMPLATES: &str = r#"[
    {
        "name": "Tank",
        "kind": "VEHICLE",
        "max_health": 100.0,
        "modules": [
            {
                "module": "FireWeaponWhenDamaged",
                "upgrade": { "triggered_by": ["Reactive"] },
                "damage_types": ["Explosion", "SmallArms"],
                "damage_amount": 5.0,
                "reaction": { "pristine": "Sparks", "damaged": "Sparks" },
                "continuous": { "damaged": "Flamer" }
            },
            { "module": "FireWeaponWhenDead", "weapon": "Wreck" },
            { "module": "DestroyDie" }
        ]
    },
    {
        "name": "Barrel",
        "max_health": 10.0,
        "modules": [
            { "module": "InstantDeath", "fx": ["FX_Pop"], "die": { "death_types": ["Burned"] } }
        ]
    }
]"#;

fn game() -> GameData {
    let weapons: Vec<WeaponTemplate> = serde_json::from_str(WEAPONS).unwrap();
    let templates: Vec<ThingTemplate> = serde_json::from_str(TEMPLATES).unwrap();
    let mut game = GameData::new().with_upgrade("Reactive").with_fx("FX_Pop");
    for weapon in weapons {
        game = game.with_weapon(weapon);
    }
    for template in templates {
        game = game.with_template(template);
    }
    game
}

fn shots_by(sim: &Simulation, weapon: &str, source: ObjectId) -> Vec<u32> {
    sim.effects()
        .iter()
        .filter_map(|e| match e {
            EffectEvent::WeaponFired { frame, weapon: w, source: s, .. } if w == weapon && *s == source => {
                Some(*frame)
            }
            _ => None,
        })
        .collect()
}

fn hit(amount: f32) -> DamageInfo {
    DamageInfo::new(amount, DamageType::Explosion, DeathType::Normal)
}

// =============================================================================
// Reaction weapons
// =============================================================================

/// Test that an un-upgraded reaction module neither fires nor polls.
#[test]
fn test_inactive_module_is_silent_and_asleep() {
    let mut sim = Simulation::new(SimConfig::default(), game()).unwrap();
    let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
    sim.run(5);

    sim.attempt_damage(tank, hit(40.0));
    sim.run(10);

    assert!(sim.effects().iter().all(|e| e.weapon_name().is_none()));
    assert_eq!(sim.wake_frame(ModuleHandle::new(tank, 0)), Some(FOREVER));
    assert_eq!(sim.find(tank).unwrap().body.health, 60.0);
}

/// Test that the upgrade arms the reaction, gated by type and threshold.
#[test]
fn test_upgrade_arms_reaction() {
    let mut sim = Simulation::new(SimConfig::default(), game()).unwrap();
    let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
    sim.give_upgrade(tank, "Reactive").unwrap();

    sim.attempt_damage(tank, hit(2.0));
    sim.attempt_damage(tank, DamageInfo::new(20.0, DamageType::Flame, DeathType::Burned));
    assert!(shots_by(&sim, "Sparks", tank).is_empty());

    sim.attempt_damage(tank, hit(6.0));
    assert_eq!(shots_by(&sim, "Sparks", tank), vec![0]);
}

/// Test that continuous fire starts only once the body reaches its tier.
#[test]
fn test_continuous_fire_follows_damage_tier() {
    let mut sim = Simulation::new(SimConfig::default(), game()).unwrap();
    let tank = sim.create_object("Tank", None, Coord3::zero()).unwrap();
    sim.give_upgrade(tank, "Reactive").unwrap();
    sim.run(10);
    assert!(shots_by(&sim, "Flamer", tank).is_empty());

    sim.attempt_damage(tank, hit(40.0));
    sim.run(7);
    assert_eq!(shots_by(&sim, "Flamer", tank), vec![10, 13, 16]);
}

// =============================================================================
// Death weapons
// =============================================================================

/// Test that a death blast provokes the neighbour's reaction once the callback unwinds.
#[test]
fn test_death_blast_provokes_neighbour() {
    let mut sim = Simulation::new(SimConfig::default(), game()).unwrap();
    let team = TeamId(1);
    sim.give_team_upgrade(team, "Reactive").unwrap();
    let a = sim.create_object("Tank", Some(team), Coord3::zero()).unwrap();
    let b = sim.create_object("Tank", Some(team), Coord3::new(20.0, 0.0, 0.0)).unwrap();

    sim.kill(a);
    assert_eq!(shots_by(&sim, "Wreck", a), vec![0]);
    assert!(shots_by(&sim, "Sparks", a).is_empty(), "the killing blow is unresistable");
    assert_eq!(shots_by(&sim, "Sparks", b), vec![0]);
    assert_eq!(sim.find(b).unwrap().body.health, 40.0);

    sim.run(7);
    assert!(sim.find(a).is_none());
    assert_eq!(shots_by(&sim, "Flamer", b), vec![0, 3, 6]);
}

/// Test that instant death honours its death-type filter.
#[test]
fn test_instant_death_filters_by_death_type() {
    let mut sim = Simulation::new(SimConfig::default(), game()).unwrap();
    let shot = sim.create_object("Barrel", None, Coord3::zero()).unwrap();
    let burnt = sim.create_object("Barrel", None, Coord3::new(50.0, 0.0, 0.0)).unwrap();

    sim.kill(shot);
    sim.kill_with(burnt, DeathType::Burned);
    sim.tick();

    let corpse = sim.find(shot).unwrap();
    assert!(corpse.is_effectively_dead());
    assert!(sim.find(burnt).is_none());
    let pops: Vec<ObjectId> = sim
        .effects()
        .iter()
        .filter_map(|e| match e {
            EffectEvent::Fx { name, object, .. } if name == "FX_Pop" => Some(*object),
            _ => None,
        })
        .collect();
    assert_eq!(pops, vec![burnt]);
}
