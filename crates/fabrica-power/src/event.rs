use fabrica_core::fixed::Ticks;
use fabrica_core::id::{BlockPos, NetworkId};
use fabrica_core::ledger::EnergyAmount;
use serde::{Deserialize, Serialize};

use crate::machine::MachineStatus;

/// Events emitted by power networks. Fire on transitions only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PowerEvent {
    /// Demand exceeded what the network could deliver.
    Brownout {
        network: NetworkId,
        deficit: EnergyAmount,
        tick: Ticks,
    },
    /// A network in brownout is fully powered again.
    Restored { network: NetworkId, tick: Ticks },
    /// A machine's display status changed.
    MachineStatusChanged {
        network: NetworkId,
        position: BlockPos,
        from: MachineStatus,
        to: MachineStatus,
        tick: Ticks,
    },
}
