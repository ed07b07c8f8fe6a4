//! Destroy the object when it dies.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{DieModule, ModuleHandle};
use crate::core::{DieMuxData, XferError};
use crate::sim::{DamageInfo, Simulation};
use crate::xfer::Xfer;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DestroyDieData {
    pub die: DieMuxData,
}

#[derive(Clone, Debug)]
pub struct DestroyDieBehavior {
    data: Arc<DestroyDieData>,
}

impl DestroyDieBehavior {
    pub const KIND: &'static str = "DestroyDie";

    #[must_use]
    pub fn new(data: Arc<DestroyDieData>) -> Self {
        Self { data }
    }

    pub fn xfer(&mut self, xfer: &mut dyn Xfer) -> Result<(), XferError> {
        let mut version = 1;
        xfer.xfer_version(&mut version, 1, Self::KIND)
    }
}

impl DieModule for DestroyDieBehavior {
    fn on_die(&mut self, sim: &mut Simulation, this: ModuleHandle, damage: &DamageInfo) {
        let applicable = sim
            .find_any(this.object)
            .is_some_and(|e| self.data.die.is_die_applicable(e.status, damage.death_type));
        if applicable {
            sim.destroy_object(this.object);
        }
    }
}
