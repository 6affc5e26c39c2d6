pub mod observer;
pub mod orchestrator;

// Re-exports for convenience
pub use observer::{
    CallbackObserver, ChannelObserver, StdoutObserver, TransferEvent, TransferObserver,
};
pub use orchestrator::{spawn_transfer, TransferOrchestrator, TransferSummary};
