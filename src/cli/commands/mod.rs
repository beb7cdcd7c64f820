//! Command execution functions.

mod helpers;
mod plan;
mod release;

use crate::cli::{Args, Command, OutputManager, RuntimeConfig};
use crate::error::Result;

use helpers::print_recovery_suggestions;
use plan::execute_plan;
use release::execute_release;

/// Execute the command selected on the command line
pub async fn execute_command(args: Args) -> Result<i32> {
    if let Err(validation_error) = args.validate() {
        // Validation errors are never quiet
        let output = OutputManager::new(false, false);
        output.error(&format!("Invalid arguments: {validation_error}"));
        return Ok(2);
    }

    let config = RuntimeConfig::from(&args);
    let command = args.command();

    let result = match command {
        Command::Release => execute_release(&args, &config).await,
        Command::Plan => execute_plan(&args, &config).await,
    };

    match result {
        Ok(exit_code) => Ok(exit_code),
        Err(e) => {
            config.error_println(&format!("Command '{}' failed: {e}", command.name()));
            print_recovery_suggestions(&config, &e);
            Ok(1)
        }
    }
}
