use crate::cli::{actions::Action, commands};
use anyhow::Result;
use secrecy::SecretString;

/// Build the Action from parsed arguments.
///
/// # Errors
///
/// Returns an error if a required argument is missing from the matches
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let required = |name: &str| -> Result<String> {
        matches
            .get_one::<String>(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{name}"))
    };

    Ok(Action::Server {
        port: matches
            .get_one::<u16>(commands::ARG_PORT)
            .copied()
            .unwrap_or(8080),
        dsn: required(commands::ARG_DSN)?,
        access_id: required(commands::ARG_ACCESS_ID)?,
        secret: SecretString::from(required(commands::ARG_SECRET)?),
    })
}
