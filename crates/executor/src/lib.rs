pub mod command_executor;
pub mod command_guard;
pub mod sync_gate;

pub use command_executor::{run_process, CommandExecutor, ExecConfig, ExecOutput, ExecutorError, ProcessSpec};
pub use command_guard::CommandGuard;
pub use sync_gate::{SyncConfig, SyncError, SyncHealth, SyncHealthGate};
