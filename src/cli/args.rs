use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Parser, Clone, PartialEq, Eq)]
#[command(name = "escola-chat")]
#[command(
    about = "Terminal chat assistant for Escola Tecnologia para Todos",
    long_about = "Terminal chat assistant for Escola Tecnologia para Todos\n\nReads alunos.csv and cursos.csv from the configured data directory, answers known questions from them and asks Amazon Bedrock otherwise.\n\nConfig file loading:\n  - --config <path> (explicit file, overrides default path discovery)\n  - Default probe path when --config is not provided:\n    1. $XDG_CONFIG_HOME/escola-chat/config.toml\n    2. ~/.config/escola-chat/config.toml"
)]
pub struct CliArgs {
    /// Load config from this file path instead of the default discovery path.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}
