use crate::api;
use crate::auth::AuthConfig;
use crate::cli::actions::Action;
use anyhow::Result;

/// Handle the server action
///
/// # Errors
///
/// Returns an error if the server fails to start
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Server {
            port,
            dsn,
            access_id,
            secret,
        } => {
            let auth_config = AuthConfig::new(access_id, secret);

            api::new(port, dsn, auth_config).await?;
        }
    }

    Ok(())
}
