//! Weapons, fx and object creation lists, as fired by modules.

use std::f32::consts::TAU;
use std::sync::Arc;

use tracing::{trace, warn};

use super::{DamageInfo, Simulation};
use crate::core::{Coord3, ObjectId};
use crate::services::{EffectEvent, Weapon, WeaponTemplate};

impl Simulation {
    /// Fire `weapon` from `source` at a point and record the shot.
    pub fn fire_weapon(&mut self, weapon: &mut Weapon, source: ObjectId, target: Coord3) {
        let now = self.frame;
        weapon.record_shot(now);
        let template = Arc::clone(weapon.template());
        self.record(EffectEvent::WeaponFired {
            frame: now,
            weapon: template.name.clone(),
            source,
            target,
        });
        trace!(frame = now, weapon = %template.name, source = %source, "weapon fired");
        self.deal_weapon_damage(&template, source, target);
    }

    /// Fire a one-shot weapon built from a template. Returns false for an unknown weapon.
    pub fn fire_temporary_weapon(&mut self, name: &str, source: ObjectId, target: Coord3) -> bool {
        let Some(template) = self.data.weapons.get(name).cloned() else {
            warn!(weapon = name, "unknown temporary weapon");
            return false;
        };
        let mut weapon = Weapon::new(template);
        self.fire_weapon(&mut weapon, source, target);
        true
    }

    /// Damage every live, uncontained object within the blast radius.
    ///
    /// The source is spared unless the weapon affects its shooter.
    fn deal_weapon_damage(&mut self, template: &WeaponTemplate, source: ObjectId, target: Coord3) {
        if template.primary_radius <= 0.0 || template.primary_damage <= 0.0 {
            return;
        }
        let radius_sq = template.primary_radius * template.primary_radius;
        let victims: Vec<ObjectId> = self
            .objects
            .iter()
            .filter(|e| !e.is_contained() && (e.id != source || template.affects_self))
            .filter(|e| e.position.distance_sq_2d(target) <= radius_sq)
            .map(|e| e.id)
            .collect();
        for victim in victims {
            let damage = DamageInfo::new(template.primary_damage, template.damage_type, template.death_type)
                .with_source(source);
            self.attempt_damage(victim, damage);
        }
    }

    /// Play an fx at an object's position.
    pub fn do_fx(&mut self, name: &str, object: ObjectId) {
        let at = self.objects.find_any(object).map_or(Coord3::zero(), |e| e.position);
        self.record(EffectEvent::Fx {
            frame: self.frame,
            name: name.to_owned(),
            object,
            at,
        });
    }

    /// Spawn the objects of a creation list around `source`.
    pub fn create_from_ocl(&mut self, name: &str, source: ObjectId) -> Vec<ObjectId> {
        let Some(ocl) = self.data.effects.ocl(name).cloned() else {
            warn!(ocl = name, "unknown object creation list");
            return Vec::new();
        };
        let Some((origin, team)) = self.objects.find_any(source).map(|e| (e.position, e.team)) else {
            return Vec::new();
        };

        let mut created = Vec::new();
        for entry in &ocl.entries {
            for _ in 0..entry.count {
                let mut at = origin;
                if entry.offset_radius > 0.0 {
                    let angle = self.rng.random_real(0.0, TAU);
                    let dist = self.rng.random_real(0.0, entry.offset_radius);
                    at += Coord3::new(angle.cos() * dist, angle.sin() * dist, 0.0);
                }
                let at = self.terrain.on_ground(at);
                match self.create_object(&entry.template, team, at) {
                    Ok(id) => {
                        if let Some(e) = self.objects.find_mut(id) {
                            e.producer = source;
                        }
                        self.record(EffectEvent::ObjectCreated {
                            frame: self.frame,
                            ocl: ocl.name.clone(),
                            source,
                            created: id,
                        });
                        created.push(id);
                    }
                    Err(err) => warn!(ocl = name, %err, "creation list entry failed"),
                }
            }
        }
        created
    }
}
