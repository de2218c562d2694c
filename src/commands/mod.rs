pub mod config;
pub mod fields;
pub mod rename;

pub type CmdResult<T> = kifield::Result<(T, i32)>;

pub(crate) struct GlobalArgs {}

/// Dispatch a command to its handler and map result to JSON.
macro_rules! dispatch {
    ($args:expr, $global:expr, $module:ident) => {
        crate::output::map_cmd_result_to_json($module::run($args, $global))
    };
}

pub(crate) fn run_json(
    command: crate::Commands,
    global: &GlobalArgs,
) -> (kifield::Result<serde_json::Value>, i32) {
    match command {
        crate::Commands::Rename(args) => dispatch!(args, global, rename),
        crate::Commands::Fields(args) => dispatch!(args, global, fields),
        crate::Commands::Config(args) => dispatch!(args, global, config),
    }
}
