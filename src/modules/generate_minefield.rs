//! Procedural mine placement around an object or a target point.
//!
//! Three strategies, chosen by data:
//!
//! - **Border only**: mines evenly spaced one mine-diameter apart along the
//!   perimeter of the expanded footprint (four edges for a box, a circle
//!   otherwise).
//! - **Smart border**: concentric perimeter rings from the footprint out to
//!   the full distance, one mine-diameter apart, optionally with a mine at
//!   the centre first.
//! - **Filled interior**: `ceil(density * area)` random points inside the
//!   expanded footprint, each at least two mine radii from the mines
//!   already placed in this pass (bounded retries, then the last
//!   candidate is taken).
//!
//! Every candidate is jittered, given a random orientation and dropped if
//! it lands underwater, on a cliff, or too far under another structure.
//! Placement runs once per generation; an upgrade destroys the tracked
//! mines and places the upgraded kind.

use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DieModule, ModuleHandle, UpdateModule, UpgradeModule};
use crate::core::{
    ConfigError, Coord3, DieMuxData, GeometryInfo, KindOf, ObjectId, TeamId, UpdateSleep, UpgradeMask, UpgradeMuxData,
    UpgradeToggle, XferError,
};
use crate::sim::{DamageInfo, GameData, Simulation};
use crate::xfer::Xfer;

/// Attempts per interior mine before the last candidate is accepted.
const MAX_SPACING_RETRIES: usize = 8;

/// Samples per axis when measuring how much of a mine sits under a structure.
const COVERAGE_SAMPLES: usize = 5;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateMinefieldData {
    pub mine_name: String,
    /// Mine kind placed once upgraded; defaults to `mine_name`.
    pub upgraded_mine_name: Option<String>,
    /// Upgrade that swaps the field for upgraded mines.
    pub mine_upgrade_trigger: Option<String>,
    pub gen_fx: Option<String>,
    pub distance_around_object: f32,
    /// Interior density, mines per square unit.
    pub mines_per_square_foot: f32,
    /// Place on death instead of on creation / upgrade.
    pub on_death: bool,
    pub border_only: bool,
    pub always_circular: bool,
    pub smart_border: bool,
    pub smart_border_skip_interior: bool,
    pub upgradable: bool,
    pub random_jitter: f32,
    /// Largest fraction of a mine that may sit under another structure.
    pub skip_if_this_much_under_structure: f32,
    pub upgrade: UpgradeMuxData,
    pub die: DieMuxData,
}

impl Default for GenerateMinefieldData {
    fn default() -> Self {
        Self {
            mine_name: String::new(),
            upgraded_mine_name: None,
            mine_upgrade_trigger: None,
            gen_fx: None,
            distance_around_object: 20.0,
            mines_per_square_foot: 0.01,
            on_death: false,
            border_only: true,
            always_circular: false,
            smart_border: false,
            smart_border_skip_interior: true,
            upgradable: false,
            random_jitter: 0.0,
            skip_if_this_much_under_structure: 0.33,
            upgrade: UpgradeMuxData::always_active(),
            die: DieMuxData::default(),
        }
    }
}

impl GenerateMinefieldData {
    #[must_use]
    pub fn new(mine_name: impl Into<String>) -> Self {
        Self {
            mine_name: mine_name.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self, game: &GameData) -> Result<(), ConfigError> {
        game.templates.require(&self.mine_name)?;
        if let Some(name) = &self.upgraded_mine_name {
            game.templates.require(name)?;
        }
        if let Some(name) = &self.mine_upgrade_trigger {
            game.upgrades.mask_of(name)?;
        }
        if let Some(name) = &self.gen_fx {
            game.effects.require_fx(name)?;
        }
        if self.mines_per_square_foot < 0.0 {
            return Err(ConfigError::InvalidValue {
                module: GenerateMinefieldBehavior::KIND,
                field: "mines_per_square_foot",
                reason: format!("must not be negative, got {}", self.mines_per_square_foot),
            });
        }
        self.upgrade.resolve(&game.upgrades)?;
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct GenerateMinefieldBehavior {
    data: Arc<GenerateMinefieldData>,
    toggle: UpgradeToggle,
    upgrade_trigger: UpgradeMask,
    target: Coord3,
    has_target: bool,
    generated: bool,
    upgraded: bool,
    mines: Vec<ObjectId>,
}

impl GenerateMinefieldBehavior {
    pub const KIND: &'static str = "GenerateMinefieldBehavior";
    const VERSION: u8 = 2;

    pub fn new(data: Arc<GenerateMinefieldData>, game: &GameData) -> Result<Self, ConfigError> {
        let toggle = UpgradeToggle::new(data.upgrade.resolve(&game.upgrades)?);
        let upgrade_trigger = match &data.mine_upgrade_trigger {
            Some(name) => game.upgrades.mask_of(name)?,
            None => UpgradeMask::NONE,
        };
        Ok(Self {
            data,
            toggle,
            upgrade_trigger,
            target: Coord3::zero(),
            has_target: false,
            generated: false,
            upgraded: false,
            mines: Vec::new(),
        })
    }

    pub(crate) fn wakes_on_creation(&self) -> bool {
        (!self.data.on_death && self.toggle.is_executed()) || self.data.upgradable
    }

    #[must_use]
    pub fn mines(&self) -> &[ObjectId] {
        &self.mines
    }

    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    #[must_use]
    pub fn is_upgraded(&self) -> bool {
        self.upgraded
    }

    #[must_use]
    pub fn target(&self) -> Option<Coord3> {
        self.has_target.then_some(self.target)
    }

    /// Centre placement on `target` instead of the owner; `None` clears it.
    pub fn set_target(&mut self, target: Option<Coord3>) {
        self.has_target = target.is_some();
        self.target = target.unwrap_or_else(Coord3::zero);
    }

    /// Place the minefield unless it has already been placed this generation.
    ///
    /// Returns the number of mines created by this call.
    pub fn place_mines(&mut self, sim: &mut Simulation, this: ModuleHandle) -> usize {
        if self.generated {
            return 0;
        }
        let Some(owner) = sim.find_any(this.object) else {
            return 0;
        };
        let (owner_pos, owner_orientation, owner_geometry, team) =
            (owner.position, owner.orientation, owner.geometry, owner.team);
        self.generated = true;

        let d = Arc::clone(&self.data);
        let mine_name = match (&d.upgraded_mine_name, self.upgraded) {
            (Some(name), true) => name.as_str(),
            _ => d.mine_name.as_str(),
        };
        let Some(mine_radius) = sim.data().templates.get(mine_name).map(|t| t.geometry.major_radius.max(0.1)) else {
            warn!(object = %this.object, mine = mine_name, "mine template missing");
            return 0;
        };

        let (center, orientation, inner) = if self.has_target {
            (self.target, 0.0, GeometryInfo::circle(0.0))
        } else {
            (owner_pos, owner_orientation, owner_geometry)
        };
        let mut area = inner;
        area.expand_footprint(d.distance_around_object);
        if d.always_circular || self.has_target {
            area.make_circular();
        }

        let spacing = 2.0 * mine_radius;
        let placer = MinePlacer {
            owner: this.object,
            team,
            mine_name,
            mine_radius,
            jitter: d.random_jitter,
            skip_fraction: d.skip_if_this_much_under_structure,
        };

        let before = self.mines.len();
        if d.smart_border {
            let mut points = Vec::new();
            if !d.smart_border_skip_interior {
                points.push(center);
            }
            let mut ring = inner;
            if d.always_circular || self.has_target {
                ring.make_circular();
            }
            let rings = (d.distance_around_object / spacing).ceil().max(1.0) as usize;
            let mut grown = 0.0;
            for k in 1..=rings {
                let step = (k as f32 * spacing).min(d.distance_around_object) - grown;
                ring.expand_footprint(step);
                grown += step;
                points.extend(border_points(&ring, center, orientation, spacing));
            }
            self.place_all(sim, &placer, points);
        } else if d.border_only {
            let points = border_points(&area, center, orientation, spacing);
            self.place_all(sim, &placer, points);
        } else {
            let count = (d.mines_per_square_foot * area.footprint_area()).ceil().max(0.0) as usize;
            let mut placed: Vec<Coord3> = Vec::with_capacity(count);
            for _ in 0..count {
                let mut candidate = center;
                for _ in 0..MAX_SPACING_RETRIES {
                    candidate = area.random_point_within(center, orientation, sim.rng_mut());
                    if placed.iter().all(|p| p.distance_2d(candidate) >= spacing) {
                        break;
                    }
                }
                if let Some((id, at)) = placer.place(sim, candidate) {
                    self.mines.push(id);
                    placed.push(at);
                }
            }
        }

        if let Some(fx) = &d.gen_fx {
            sim.do_fx(fx, this.object);
        }
        let created = self.mines.len() - before;
        debug!(object = %this.object, mines = created, upgraded = self.upgraded, "minefield placed");
        created
    }

    fn place_all(&mut self, sim: &mut Simulation, placer: &MinePlacer<'_>, points: Vec<Coord3>) {
        for pt in points {
            if let Some((id, _)) = placer.place(sim, pt) {
                self.mines.push(id);
            }
        }
    }

    /// Swap to upgraded mines once the trigger upgrade is held.
    fn check_upgrade(&mut self, sim: &mut Simulation, this: ModuleHandle, held: UpgradeMask) {
        if !self.data.upgradable || self.upgraded || self.upgrade_trigger.is_empty() {
            return;
        }
        if !held.intersects(self.upgrade_trigger) {
            return;
        }
        self.upgraded = true;
        if !self.generated {
            return;
        }
        for mine in std::mem::take(&mut self.mines) {
            sim.destroy_object(mine);
        }
        self.generated = false;
        self.place_mines(sim, this);
    }

    /// Forget mines that no longer exist.
    pub fn load_post_process(&mut self, sim: &Simulation) {
        self.mines.retain(|id| sim.find(*id).is_some());
    }

    /// Transfer state. Version 2 added the explicit target point.
    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        let mut version = Self::VERSION;
        xfer.xfer_version(&mut version, Self::VERSION, Self::KIND)?;
        let mut executed = self.toggle.is_executed();
        xfer.xfer_bool(&mut executed)?;
        self.toggle.set_executed(executed);
        xfer.xfer_bool(&mut self.generated)?;
        xfer.xfer_bool(&mut self.upgraded)?;
        xfer.xfer_object_id_list(&mut self.mines)?;
        if version >= 2 {
            xfer.xfer_bool(&mut self.has_target)?;
            xfer.xfer_coord3(&mut self.target)?;
        } else {
            self.has_target = false;
            self.target = Coord3::zero();
        }
        Ok(())
    }
}

impl UpdateModule for GenerateMinefieldBehavior {
    fn update(&mut self, sim: &mut Simulation, this: ModuleHandle) -> UpdateSleep {
        let held = sim.held_upgrades(this.object);
        self.check_upgrade(sim, this, held);
        if !self.data.on_death && self.toggle.is_active(held) {
            self.place_mines(sim, this);
        }
        UpdateSleep::Forever
    }
}

impl UpgradeModule for GenerateMinefieldBehavior {
    fn on_upgrade(&mut self, sim: &mut Simulation, this: ModuleHandle, held: UpgradeMask) {
        self.toggle.try_trigger(held);
        self.check_upgrade(sim, this, held);
        if !self.data.on_death && self.toggle.is_active(held) {
            self.place_mines(sim, this);
        }
    }
}

impl DieModule for GenerateMinefieldBehavior {
    fn on_die(&mut self, sim: &mut Simulation, this: ModuleHandle, damage: &DamageInfo) {
        if !self.data.on_death {
            return;
        }
        let Some(status) = sim.find_any(this.object).map(|e| e.status) else {
            return;
        };
        if !self.data.die.is_die_applicable(status, damage.death_type) {
            return;
        }
        if self.toggle.is_active(sim.held_upgrades(this.object)) {
            self.place_mines(sim, this);
        }
    }
}

/// Perimeter points one `spacing` apart.
fn border_points(area: &GeometryInfo, center: Coord3, orientation: f32, spacing: f32) -> Vec<Coord3> {
    let mut points = Vec::new();
    if area.is_rectangular() {
        let corners = area.corners(center, orientation);
        for i in 0..corners.len() {
            let (a, b) = (corners[i], corners[(i + 1) % corners.len()]);
            let n = (a.distance_2d(b) / spacing).ceil().max(1.0) as usize;
            for k in 0..n {
                points.push(a + (b - a) * (k as f32 / n as f32));
            }
        }
    } else {
        let radius = area.major_radius;
        let n = (TAU * radius / spacing).ceil().max(1.0) as usize;
        for k in 0..n {
            let angle = orientation + TAU * k as f32 / n as f32;
            points.push(Coord3::new(
                center.x + radius * angle.cos(),
                center.y + radius * angle.sin(),
                center.z,
            ));
        }
    }
    points
}

struct MinePlacer<'a> {
    owner: ObjectId,
    team: Option<TeamId>,
    mine_name: &'a str,
    mine_radius: f32,
    jitter: f32,
    skip_fraction: f32,
}

impl MinePlacer<'_> {
    /// Jitter, orient and create one mine, unless the spot is unusable.
    fn place(&self, sim: &mut Simulation, pt: Coord3) -> Option<(ObjectId, Coord3)> {
        let mut pt = pt;
        if self.jitter > 0.0 {
            pt.x += sim.rng_mut().random_real(-self.jitter, self.jitter);
            pt.y += sim.rng_mut().random_real(-self.jitter, self.jitter);
        }
        let orientation = sim.rng_mut().random_real(-PI, PI);

        let terrain = sim.terrain();
        if terrain.is_underwater(pt.x, pt.y) || terrain.is_cliff(pt.x, pt.y) {
            return None;
        }
        if self.fraction_under_structure(sim, pt) > self.skip_fraction {
            return None;
        }
        let pt = terrain.on_ground(pt);

        let id = match sim.create_object(self.mine_name, self.team, pt) {
            Ok(id) => id,
            Err(err) => {
                warn!(owner = %self.owner, error = %err, "mine creation failed");
                return None;
            }
        };
        if let Some(mine) = sim.find_mut(id) {
            mine.orientation = orientation;
            mine.producer = self.owner;
        }
        Some((id, pt))
    }

    /// Fraction of the mine's footprint covered by structures other than the owner.
    fn fraction_under_structure(&self, sim: &Simulation, pt: Coord3) -> f32 {
        let r = self.mine_radius;
        let structures: Vec<_> = sim
            .objects()
            .iter()
            .filter(|e| e.id != self.owner && e.is_kind(KindOf::STRUCTURE) && !e.is_contained())
            .filter(|e| e.position.distance_2d(pt) <= e.geometry.bounding_circle_radius() + r)
            .collect();
        if structures.is_empty() {
            return 0.0;
        }

        let mut total = 0usize;
        let mut covered = 0usize;
        let step = 2.0 * r / (COVERAGE_SAMPLES - 1) as f32;
        for i in 0..COVERAGE_SAMPLES {
            for j in 0..COVERAGE_SAMPLES {
                let sample = Coord3::new(pt.x - r + i as f32 * step, pt.y - r + j as f32 * step, pt.z);
                if sample.distance_2d(pt) > r {
                    continue;
                }
                total += 1;
                if structures
                    .iter()
                    .any(|s| s.geometry.contains_point(s.position, s.orientation, sample))
                {
                    covered += 1;
                }
            }
        }
        if total == 0 {
            0.0
        } else {
            covered as f32 / total as f32
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::ThingTemplate;
    use crate::xfer::{XferLoad, XferSave};
    use crate::SimConfig;

    fn game(data: GenerateMinefieldData) -> GameData {
        GameData::new()
            .with_upgrade("BetterMines")
            .with_fx("FX_MinesPlaced")
            .with_template(
                ThingTemplate::new("Mine")
                    .with_kind(KindOf::MINE)
                    .with_geometry(GeometryInfo::circle(2.0)),
            )
            .with_template(
                ThingTemplate::new("EmpMine")
                    .with_kind(KindOf::MINE)
                    .with_geometry(GeometryInfo::circle(2.0)),
            )
            .with_template(
                ThingTemplate::new("Bunker")
                    .with_kind(KindOf::STRUCTURE)
                    .with_geometry(GeometryInfo::rect(10.0, 10.0))
                    .with_module(data),
            )
    }

    fn minefield(sim: &Simulation, id: ObjectId) -> GenerateMinefieldBehavior {
        sim.find(id)
            .and_then(|e| e.module(0))
            .and_then(|m| m.as_minefield())
            .cloned()
            .unwrap()
    }

    #[test]
    fn test_border_places_on_first_update() {
        let mut sim = Simulation::new(SimConfig::default(), game(GenerateMinefieldData::new("Mine"))).unwrap();
        let bunker = sim.create_object("Bunker", None, Coord3::zero()).unwrap();
        sim.tick();

        let m = minefield(&sim, bunker);
        assert!(m.is_generated());
        // 60x60 box perimeter, mines 4 apart: 15 per edge
        assert_eq!(m.mines().len(), 60);
        for id in m.mines() {
            let mine = sim.find(*id).unwrap();
            assert_eq!(mine.producer, bunker);
            assert!(mine.is_kind(KindOf::MINE));
            let p = mine.position;
            assert!((p.x.abs() - 30.0).abs() < 1e-3 || (p.y.abs() - 30.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_generation_guard() {
        let mut sim = Simulation::new(SimConfig::default(), game(GenerateMinefieldData::new("Mine"))).unwrap();
        let bunker = sim.create_object("Bunker", None, Coord3::zero()).unwrap();
        let first = sim.generate_minefield(bunker);
        assert!(first > 0);
        assert_eq!(sim.generate_minefield(bunker), 0);
        sim.tick();
        assert_eq!(minefield(&sim, bunker).mines().len(), first);
    }

    #[test]
    fn test_upgrade_replaces_mines() {
        let data = GenerateMinefieldData {
            upgradable: true,
            upgraded_mine_name: Some("EmpMine".into()),
            mine_upgrade_trigger: Some("BetterMines".into()),
            ..GenerateMinefieldData::new("Mine")
        };
        let mut sim = Simulation::new(SimConfig::default(), game(data)).unwrap();
        let bunker = sim.create_object("Bunker", None, Coord3::zero()).unwrap();
        sim.tick();
        let old = minefield(&sim, bunker).mines().to_vec();

        sim.give_upgrade(bunker, "BetterMines").unwrap();
        sim.tick();

        let m = minefield(&sim, bunker);
        assert!(m.is_upgraded());
        assert_eq!(m.mines().len(), old.len());
        assert!(old.iter().all(|id| sim.find(*id).is_none()));
        assert!(m.mines().iter().all(|id| sim.find(*id).unwrap().template_name() == "EmpMine"));
    }

    #[test]
    fn test_on_death_uses_target() {
        let data = GenerateMinefieldData {
            on_death: true,
            border_only: false,
            mines_per_square_foot: 0.02,
            gen_fx: Some("FX_MinesPlaced".into()),
            ..GenerateMinefieldData::new("Mine")
        };
        let mut sim = Simulation::new(SimConfig::default().with_seed(5), game(data)).unwrap();
        let bunker = sim.create_object("Bunker", None, Coord3::zero()).unwrap();
        sim.set_minefield_target(bunker, Some(Coord3::new(200.0, 0.0, 0.0)));
        sim.tick();
        assert!(!minefield(&sim, bunker).is_generated());

        sim.kill(bunker);
        let m = minefield(&sim, bunker);
        // circle of radius 20 at density 0.02
        assert_eq!(m.mines().len(), (0.02 * PI * 400.0).ceil() as usize);
        for id in m.mines() {
            assert!(sim.find(*id).unwrap().position.distance_2d(Coord3::new(200.0, 0.0, 0.0)) <= 20.0 + 1e-3);
        }
        assert!(sim.effects().iter().any(|e| e.fx_name() == Some("FX_MinesPlaced")));
    }

    #[test]
    fn test_smart_border_rings() {
        let data = GenerateMinefieldData {
            smart_border: true,
            smart_border_skip_interior: false,
            always_circular: true,
            distance_around_object: 8.0,
            ..GenerateMinefieldData::new("Mine")
        };
        let mut sim = Simulation::new(SimConfig::default(), game(data)).unwrap();
        let bunker = sim.create_object("Bunker", None, Coord3::zero()).unwrap();
        let count = sim.generate_minefield(bunker);

        // centre + rings at radius 10*sqrt(2)+4 and +8
        let r0 = 200f32.sqrt();
        let expected = 1 + (TAU * (r0 + 4.0) / 4.0).ceil() as usize + (TAU * (r0 + 8.0) / 4.0).ceil() as usize;
        assert_eq!(count, expected);
    }

    #[test]
    fn test_post_process_prunes_stale_mines() {
        let mut sim = Simulation::new(SimConfig::default(), game(GenerateMinefieldData::new("Mine"))).unwrap();
        let bunker = sim.create_object("Bunker", None, Coord3::zero()).unwrap();
        sim.tick();
        let mut m = minefield(&sim, bunker);
        let gone = m.mines()[0];
        sim.destroy_object(gone);
        sim.tick();

        m.load_post_process(&sim);
        assert_eq!(m.mines().len(), 59);
        assert!(!m.mines().contains(&gone));
    }

    #[test]
    fn test_version_one_stream_loads() {
        let game = game(GenerateMinefieldData::new("Mine"));
        let data = Arc::new(GenerateMinefieldData::new("Mine"));

        let mut save = XferSave::new();
        let mut version = 1;
        save.xfer_version(&mut version, 1, "v1").unwrap();
        save.xfer_bool(&mut true).unwrap();
        save.xfer_bool(&mut true).unwrap();
        save.xfer_bool(&mut false).unwrap();
        save.xfer_object_id_list(&mut vec![ObjectId(4), ObjectId(8)]).unwrap();
        let bytes = save.into_bytes();

        let mut m = GenerateMinefieldBehavior::new(data, &game).unwrap();
        m.set_target(Some(Coord3::new(1.0, 1.0, 0.0)));
        let mut load = XferLoad::new(&bytes);
        m.xfer(&mut load).unwrap();
        assert!(load.is_exhausted());
        assert!(m.is_generated());
        assert_eq!(m.mines(), &[ObjectId(4), ObjectId(8)]);
        assert_eq!(m.target(), None);
    }
}
