use std::path::{Path, PathBuf};

use passporter_core::auth::{AuthGateway, FederatedProvider, Registration};
use passporter_core::User;

use crate::cli::AuthCommands;
use crate::commands::common::Context;
use crate::error::CliError;

pub async fn run_auth(
    command: AuthCommands,
    config_path: Option<&Path>,
    db_path: Option<PathBuf>,
) -> Result<(), CliError> {
    let context = Context::open(config_path, db_path).await?;
    let auth = &context.auth;

    match command {
        AuthCommands::Login {
            email,
            password,
            provider,
            token,
        } => {
            let user = if let Some(provider) = provider {
                let provider = provider.parse::<FederatedProvider>()?;
                let token = token.ok_or(CliError::MissingArgument("--token"))?;
                auth.sign_in_federated(provider, &token).await?
            } else {
                let email = email.ok_or(CliError::MissingArgument("--email"))?;
                let password = password.ok_or(CliError::MissingArgument("--password"))?;
                auth.sign_in_email(&email, &password).await?
            };
            println!("Signed in as {}", user.label());
        }
        AuthCommands::Register {
            email,
            password,
            name,
            phone,
            language,
        } => {
            let user = auth
                .register(Registration {
                    email,
                    password,
                    display_name: name,
                    phone_number: phone,
                    preferred_language: language,
                })
                .await?;
            println!("Registered {}", user.label());
        }
        AuthCommands::ResetPassword { email } => {
            auth.reset_password(&email).await?;
            println!("Password reset email sent to {}", email.trim());
        }
        AuthCommands::Logout => {
            auth.sign_out().await?;
            println!("Signed out");
        }
        AuthCommands::Status => match auth.restore_session().await? {
            Some(session) => {
                let user = auth.current_user();
                println!(
                    "Signed in as {} (expires_at={})",
                    status_label(user.as_ref(), session.email.as_deref()),
                    session.expires_at
                );
            }
            None => println!("Not signed in"),
        },
    }
    Ok(())
}

pub fn status_label(user: Option<&User>, session_email: Option<&str>) -> String {
    user.map(User::label)
        .or(session_email)
        .unwrap_or("(unknown account)")
        .to_string()
}
