pub mod command_executor;

pub use command_executor::{
    CommandExecutor, CommandRequest, CommandResult, CommandRunner, ExecutionOutcome,
    ExecutorError, COMMAND_TIMEOUT, DEFAULT_SHELL,
};
