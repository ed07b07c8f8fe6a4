//! Scripted loading and unloading for a transport with no walkable interior.
//!
//! Dockers are slid in a straight line into the transport over a fixed
//! number of frames ("pull-in"), then contained. Unloading releases one
//! contained object at a time and slides it out to the exit point
//! ("push-out"), then orders it on to the waiting point.
//!
//! Pull-in marks the docker `UNSELECTABLE | DISABLED_HELD` and leaves the
//! flags set once it is contained; only push-out clears them.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DockModule, ModuleHandle, UpdateModule};
use crate::core::{ConfigError, Coord3, Frame, ObjectId, StatusFlags, UpdateSleep, XferError};
use crate::sim::Simulation;
use crate::xfer::Xfer;

/// Distance from the target point at which a slide counts as arrived.
pub const CLOSE_ENOUGH: f32 = 6.0;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailedTransportDockData {
    pub pull_inside_duration: Frame,
    pub push_outside_duration: Frame,
    /// Exit point relative to the transport, in its local frame.
    pub exit_offset: Coord3,
    /// Where unloaded objects are sent after leaving, in the local frame.
    pub waiting_offset: Coord3,
}

impl Default for RailedTransportDockData {
    fn default() -> Self {
        Self {
            pull_inside_duration: 30,
            push_outside_duration: 30,
            exit_offset: Coord3::new(-30.0, 0.0, 0.0),
            waiting_offset: Coord3::new(-60.0, 0.0, 0.0),
        }
    }
}

impl RailedTransportDockData {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("pull_inside_duration", self.pull_inside_duration),
            ("push_outside_duration", self.push_outside_duration),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    module: RailedTransportDockUpdate::KIND,
                    field,
                    reason: "must be at least one frame".into(),
                });
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug)]
pub struct RailedTransportDockUpdate {
    data: Arc<RailedTransportDockData>,
    docking: ObjectId,
    pull_step: Coord3,
    unloading: ObjectId,
    push_step: Coord3,
    /// Objects still to unload, counting the one in transit.
    unload_budget: u32,
}

impl RailedTransportDockUpdate {
    pub const KIND: &'static str = "RailedTransportDockUpdate";

    #[must_use]
    pub fn new(data: Arc<RailedTransportDockData>) -> Self {
        Self {
            data,
            docking: ObjectId::INVALID,
            pull_step: Coord3::zero(),
            unloading: ObjectId::INVALID,
            push_step: Coord3::zero(),
            unload_budget: 0,
        }
    }

    /// Object currently being pulled in, or invalid.
    #[must_use]
    pub fn docking(&self) -> ObjectId {
        self.docking
    }

    /// Object currently being pushed out, or invalid.
    #[must_use]
    pub fn unloading(&self) -> ObjectId {
        self.unloading
    }

    #[must_use]
    pub fn pull_step(&self) -> Coord3 {
        self.pull_step
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.docking.is_valid() || self.unloading.is_valid() || self.unload_budget > 0
    }

    fn local_point(sim: &Simulation, transport: ObjectId, offset: Coord3) -> Option<Coord3> {
        let t = sim.find(transport)?;
        Some(t.position + offset.rotated_2d(t.orientation))
    }

    /// Advance the pull-in by one step.
    fn pull(&mut self, sim: &mut Simulation, this: ModuleHandle) {
        let Some(center) = sim.find(this.object).map(|t| t.position) else {
            return;
        };
        let step = self.pull_step;
        let Some(docker) = sim.find_mut(self.docking) else {
            debug!(transport = %this.object, docker = %self.docking, "docker vanished during pull-in");
            self.docking = ObjectId::INVALID;
            return;
        };
        docker.position.x += step.x;
        docker.position.y += step.y;
        if docker.position.distance_2d(center) > CLOSE_ENOUGH {
            return;
        }
        let docker = self.docking;
        self.docking = ObjectId::INVALID;
        sim.idle(docker);
        if !sim.contain(this.object, docker) {
            // filled up during the slide: hand the docker back
            if let Some(d) = sim.find_mut(docker) {
                d.status.remove(StatusFlags::UNSELECTABLE | StatusFlags::DISABLED_HELD);
            }
            warn!(transport = %this.object, docker = %docker, "transport full at end of pull-in");
            return;
        }
        debug!(transport = %this.object, docker = %docker, "docker pulled inside");
    }

    /// Advance the push-out, starting the next unload whenever one finishes.
    fn push(&mut self, sim: &mut Simulation, this: ModuleHandle) {
        let Some(exit) = Self::local_point(sim, this.object, self.data.exit_offset) else {
            return;
        };
        let bound = sim
            .find(this.object)
            .and_then(|t| t.contain.as_ref())
            .map_or(0, |c| c.contained.len())
            + 1;
        for _ in 0..=bound {
            if !self.unloading.is_valid() && !self.begin_unload(sim, this, exit) {
                return;
            }
            let step = self.push_step;
            let Some(rider) = sim.find_mut(self.unloading) else {
                debug!(transport = %this.object, rider = %self.unloading, "unloading object vanished");
                self.unloading = ObjectId::INVALID;
                continue;
            };
            rider.position.x += step.x;
            rider.position.y += step.y;
            if rider.position.distance_2d(exit) > CLOSE_ENOUGH {
                return;
            }
            rider.status.remove(StatusFlags::UNSELECTABLE | StatusFlags::DISABLED_HELD);
            let rider = self.unloading;
            self.unloading = ObjectId::INVALID;
            if let Some(waiting) = Self::local_point(sim, this.object, self.data.waiting_offset) {
                sim.move_to(rider, waiting);
            }
            debug!(transport = %this.object, rider = %rider, "object pushed outside");
        }
    }

    /// Release the next contained object and aim it at the exit.
    fn begin_unload(&mut self, sim: &mut Simulation, this: ModuleHandle, exit: Coord3) -> bool {
        if self.unload_budget == 0 {
            return false;
        }
        let next = sim
            .find(this.object)
            .and_then(|t| t.contain.as_ref())
            .and_then(|c| c.contained.first().copied());
        let Some(next) = next else {
            self.unload_budget = 0;
            return false;
        };
        self.unload_budget -= 1;
        sim.release(this.object, next);

        let frames = self.data.push_outside_duration.max(1) as f32;
        let Some(rider) = sim.find_mut(next) else {
            return true;
        };
        let delta = exit - rider.position;
        self.push_step = Coord3::new(delta.x / frames, delta.y / frames, 0.0);
        rider.orientation = delta.heading();
        rider.status.insert(StatusFlags::UNSELECTABLE | StatusFlags::DISABLED_HELD);
        self.unloading = next;
        true
    }

    /// Drop references to objects that no longer exist.
    pub fn load_post_process(&mut self, sim: &Simulation) {
        if self.docking.is_valid() && sim.find(self.docking).is_none() {
            self.docking = ObjectId::INVALID;
        }
        if self.unloading.is_valid() && sim.find(self.unloading).is_none() {
            self.unloading = ObjectId::INVALID;
        }
    }

    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        let mut version = 1;
        xfer.xfer_version(&mut version, 1, Self::KIND)?;
        xfer.xfer_object_id(&mut self.docking)?;
        xfer.xfer_coord3(&mut self.pull_step)?;
        xfer.xfer_object_id(&mut self.unloading)?;
        xfer.xfer_coord3(&mut self.push_step)?;
        xfer.xfer_u32(&mut self.unload_budget)
    }
}

impl UpdateModule for RailedTransportDockUpdate {
    fn update(&mut self, sim: &mut Simulation, this: ModuleHandle) -> UpdateSleep {
        if self.docking.is_valid() {
            self.pull(sim, this);
        }
        if self.unloading.is_valid() || self.unload_budget > 0 {
            self.push(sim, this);
        }
        if self.is_busy() {
            UpdateSleep::NextFrame
        } else {
            UpdateSleep::Forever
        }
    }
}

impl DockModule for RailedTransportDockUpdate {
    fn dock_action(&mut self, sim: &mut Simulation, this: ModuleHandle, docker: ObjectId) -> bool {
        if self.docking == docker {
            return true;
        }
        if self.docking.is_valid() {
            return false;
        }
        let Some((center, full)) = sim.find(this.object).map(|t| {
            (t.position, t.contain.as_ref().map_or(true, |c| c.is_full()))
        }) else {
            return false;
        };
        if full {
            return false;
        }
        let frames = self.data.pull_inside_duration.max(1) as f32;
        let Some(entity) = sim.find_mut(docker) else {
            return false;
        };
        if entity.is_contained() {
            return false;
        }
        let delta = center - entity.position;
        self.pull_step = Coord3::new(delta.x / frames, delta.y / frames, 0.0);
        entity.orientation = delta.heading();
        entity.status.insert(StatusFlags::UNSELECTABLE | StatusFlags::DISABLED_HELD);
        self.docking = docker;
        debug!(transport = %this.object, docker = %docker, step = self.pull_step.length_2d(), "pull-in started");
        sim.wake_module(this);
        true
    }

    fn unload_all(&mut self, sim: &mut Simulation, this: ModuleHandle) {
        let count = sim
            .find(this.object)
            .and_then(|t| t.contain.as_ref())
            .map_or(0, |c| c.contained.len() as u32);
        self.unload_budget = count;
        sim.wake_module(this);
    }

    fn unload_single(&mut self, sim: &mut Simulation, this: ModuleHandle) {
        self.unload_budget = self.unload_budget.saturating_add(1);
        sim.wake_module(this);
    }
}
