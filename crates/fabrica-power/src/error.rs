use fabrica_core::id::{BlockPos, NetworkId};

use crate::machine::MachineKind;

pub type PowerResult<T> = Result<T, PowerError>;

/// Errors from network membership and placement operations.
///
/// Energy accounting never fails: capacity overruns are clamped and unknown
/// fuels or recipes leave the machine idle.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PowerError {
    #[error("machine at {0} is not registered to any network")]
    UnregisteredMachine(BlockPos),

    #[error("machine at {pos} already belongs to network {network:?}")]
    AlreadyRegistered { pos: BlockPos, network: NetworkId },

    #[error("unknown power network {0:?}")]
    UnknownNetwork(NetworkId),

    #[error("unknown machine type '{0}'")]
    UnknownMachineType(String),

    #[error("machine at {pos} is not a {expected:?}")]
    WrongMachineKind { pos: BlockPos, expected: MachineKind },

    #[error("split groups do not partition the members of network {0:?}")]
    SplitMismatch(NetworkId),
}
