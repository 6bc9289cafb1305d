//! Flow producer adapters.

pub mod command;
pub mod scripted;

pub use command::{CommandFlowProducer, CommandProducerConfig};
pub use scripted::{ScriptedFlowProducer, ScriptedProduction};
