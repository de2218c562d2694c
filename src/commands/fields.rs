use clap::Args;
use regex::RegexBuilder;
use serde::Serialize;

use kifield::board::{self, FormatPreference};
use kifield::field::{self, FieldUsage};
use kifield::Error;

use super::CmdResult;

#[derive(Args)]
pub struct FieldsArgs {
    /// Board file (.kicad_pcb or .json snapshot)
    board: String,
    /// Only list names matching this pattern (case-insensitive regex)
    #[arg(long)]
    filter: Option<String>,
    /// How to read .kicad_pcb metadata: auto, legacy, fields
    #[arg(long)]
    format: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldsOutput {
    command: String,
    path: String,
    kind: String,
    components: usize,
    fields: Vec<FieldUsage>,
}

pub fn run(args: FieldsArgs, _global: &crate::commands::GlobalArgs) -> CmdResult<FieldsOutput> {
    let format = match args.format.as_deref() {
        Some(raw) => FormatPreference::from_str(raw)?,
        None => kifield::defaults::load_defaults().format,
    };

    let filter = args
        .filter
        .as_deref()
        .map(|pattern| {
            RegexBuilder::new(pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| {
                    Error::validation_invalid_argument("filter", e.to_string(), None, None)
                })
        })
        .transpose()?;

    let path = kifield::paths::expand(&args.board);
    let mut loaded = board::load(&path, format)?;
    let mut usages = field::inventory(loaded.as_board_mut());

    if let Some(re) = &filter {
        usages.retain(|usage| re.is_match(&usage.name) || usage.variants.iter().any(|v| re.is_match(v)));
    }

    Ok((
        FieldsOutput {
            command: "fields".to_string(),
            path: path.display().to_string(),
            kind: loaded.kind(),
            components: loaded.component_count(),
            fields: usages,
        },
        0,
    ))
}
