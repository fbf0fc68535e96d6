//! Command-line surface. With no subcommand the binary serves MCP on stdio;
//! the remaining subcommands bootstrap OAuth credentials from a terminal.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::app::App;
use crate::errors::ToolError;
use crate::services::config::ConfigLayer;
use crate::services::config_store::{default_config_path, save_credential};
use crate::services::token::{TokenGrant, TokenManager, DEFAULT_REDIRECT_URI};

#[derive(Debug, Parser)]
#[command(name = "clio-mcp", version, about = "MCP server for the Clio practice management API")]
pub struct Cli {
    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Highest-priority configuration layer.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    /// OAuth client id
    #[arg(long, global = true)]
    pub client_id: Option<String>,
    /// OAuth client secret
    #[arg(long, global = true)]
    pub client_secret: Option<String>,
    /// Access token used when a tool call does not carry one
    #[arg(long, global = true)]
    pub access_token: Option<String>,
    #[arg(long, global = true)]
    pub refresh_token: Option<String>,
    /// Data region: us, eu or ca
    #[arg(long, global = true)]
    pub region: Option<String>,
}

impl Overrides {
    pub fn into_layer(self) -> ConfigLayer {
        ConfigLayer {
            client_id: self.client_id,
            client_secret: self.client_secret,
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            region: self.region,
        }
        .normalized()
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve MCP over stdio (default)
    Serve,
    /// Print the OAuth authorization URL
    AuthUrl {
        #[arg(long, default_value = DEFAULT_REDIRECT_URI)]
        redirect_uri: String,
    },
    /// Exchange an authorization code for tokens
    ExchangeCode {
        code: String,
        #[arg(long, default_value = DEFAULT_REDIRECT_URI)]
        redirect_uri: String,
        /// Merge the tokens into this config file
        #[arg(long)]
        save_to: Option<PathBuf>,
        /// Merge the tokens into ./clio-config.json
        #[arg(long, conflicts_with = "save_to")]
        save: bool,
    },
    /// Obtain a new access token from the configured refresh token
    Refresh {
        #[arg(long)]
        save_to: Option<PathBuf>,
        #[arg(long, conflicts_with = "save_to")]
        save: bool,
    },
}

fn save_target(save_to: Option<PathBuf>, save: bool) -> Option<PathBuf> {
    save_to.or_else(|| save.then(default_config_path))
}

fn report_grant(app: &App, grant: &TokenGrant, target: Option<PathBuf>) -> Result<(), ToolError> {
    println!("Access Token: {}", grant.credential.access_token);
    if let Some(refresh) = &grant.credential.refresh_token {
        println!("Refresh Token: {}", refresh);
    }
    if let Some(path) = target {
        let written = save_credential(&path, &app.config, &grant.credential)?;
        println!("Saved credentials to {}", written.display());
    } else {
        println!("\nSet CLIO_ACCESS_TOKEN or rerun with --save to persist these tokens.");
    }
    Ok(())
}

pub async fn run(cli: Cli) -> Result<(), ToolError> {
    let app = App::initialize(cli.overrides.into_layer())?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => app.server().run_stdio().await,
        Command::AuthUrl { redirect_uri } => {
            let url = TokenManager::authorize_url(&app.config, &redirect_uri)?;
            println!("{}", url);
            Ok(())
        }
        Command::ExchangeCode {
            code,
            redirect_uri,
            save_to,
            save,
        } => {
            let grant = app
                .tokens
                .exchange_code(&code, &redirect_uri, &app.config)
                .await?;
            report_grant(&app, &grant, save_target(save_to, save))
        }
        Command::Refresh { save_to, save } => {
            let refresh_token = app
                .credentials
                .refresh_token()
                .or_else(|| app.config.refresh_token.clone())
                .ok_or_else(|| {
                    ToolError::invalid_params("No refresh token available")
                        .with_hint("Pass --refresh-token or set CLIO_REFRESH_TOKEN")
                })?;
            let grant = app.tokens.refresh(&refresh_token, &app.config).await?;
            report_grant(&app, &grant, save_target(save_to, save))
        }
    }
}
