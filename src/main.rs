//! Resideo CLI - control Honeywell Home thermostats from the terminal

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use resideo_cli::config::Config;
use resideo_cli::models::Device;
use resideo_cli::{FileTokenStore, ResideoClient, TokenStore};

#[derive(Parser)]
#[command(name = "resideo-cli")]
#[command(about = "Lightweight CLI client for Resideo / Honeywell Home thermostats", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    creds: CredentialArgs,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct CredentialArgs {
    /// Developer app client ID
    #[arg(long, global = true, env = "RESIDEO_CLIENT_ID")]
    client_id: Option<String>,

    /// Developer app client secret
    #[arg(long, global = true, env = "RESIDEO_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// OAuth2 redirect URI registered with the app
    #[arg(long, global = true, env = "RESIDEO_REDIRECT_URI")]
    redirect_uri: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Save credentials to the config file
    Configure,

    /// Print the URL to open in a browser to authorize this app
    AuthUrl,

    /// Exchange an authorization code for tokens
    Login {
        /// `code` query parameter from the redirect
        #[arg(short, long)]
        code: String,
    },

    /// Show current token status
    Status,

    /// Delete stored tokens
    Logout,

    #[command(flatten)]
    Api(ApiCommand),
}

/// Commands that talk to the device API with stored tokens
#[derive(Subcommand)]
enum ApiCommand {
    /// Refresh the access token now
    Refresh,

    /// List locations
    Locations,

    /// List all devices
    Devices,

    /// List thermostats
    Thermostats,

    /// Show the full status of a thermostat
    Show {
        device_id: String,

        #[arg(short, long)]
        location: i64,
    },

    /// Set mode and setpoints (permanent hold)
    SetTemp {
        device_id: String,

        /// HVAC mode: Heat, Cool, Auto, Off
        #[arg(short, long)]
        mode: String,

        /// Heating setpoint
        #[arg(long)]
        heat: Option<f64>,

        /// Cooling setpoint
        #[arg(long)]
        cool: Option<f64>,

        /// Location ID (default: first location)
        #[arg(short, long)]
        location: Option<i64>,
    },

    /// Set fan mode: auto, on, circulate
    Fan {
        device_id: String,

        mode: String,

        /// Location ID (default: first location)
        #[arg(short, long)]
        location: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut config = Config::load()?;

    match cli.command {
        Commands::Configure => configure(&mut config, cli.creds)?,
        Commands::AuthUrl => {
            let (client, _) = connect(&config, cli.creds)?;
            println!("Open this URL, approve access, then run 'resideo-cli login --code <code>':");
            println!();
            println!("{}", client.authorization_url()?);
        }
        Commands::Login { code } => {
            let (client, store) = connect(&config, cli.creds)?;
            tracing::info!("Exchanging authorization code...");
            client.exchange_code(&code).await?;
            save_tokens(&client, &store).await?;
            println!("Login successful.");
        }
        Commands::Logout => {
            FileTokenStore::new(config.token_file()?).remove()?;
            println!("Logged out.");
        }
        Commands::Status => {
            let (client, store) = connect(&config, cli.creds)?;
            load_tokens(&client, &store).await;
            status(&client).await;
        }
        Commands::Api(command) => {
            let (client, store) = connect(&config, cli.creds)?;
            if !load_tokens(&client, &store).await {
                anyhow::bail!("No stored tokens. Run 'resideo-cli auth-url' and 'login' first.");
            }
            let result = run_api_command(&client, command).await;
            // Refresh may have rotated tokens even if the call failed
            save_tokens(&client, &store).await?;
            result?;
        }
    }

    Ok(())
}

/// Client and token store from flags/env, falling back to the config file.
fn connect(config: &Config, creds: CredentialArgs) -> Result<(ResideoClient, FileTokenStore)> {
    let credentials = config.credentials(creds.client_id, creds.client_secret, creds.redirect_uri)?;
    let client = ResideoClient::new(credentials, config.endpoints(), config.timeout())?;
    let store = FileTokenStore::new(config.token_file()?);
    Ok((client, store))
}

fn configure(config: &mut Config, creds: CredentialArgs) -> Result<()> {
    if creds.client_id.is_none() && creds.client_secret.is_none() && creds.redirect_uri.is_none() {
        anyhow::bail!("Nothing to save. Pass --client-id, --client-secret and/or --redirect-uri.");
    }
    if creds.client_id.is_some() {
        config.client_id = creds.client_id;
    }
    if creds.client_secret.is_some() {
        config.client_secret = creds.client_secret;
    }
    if creds.redirect_uri.is_some() {
        config.redirect_uri = creds.redirect_uri;
    }
    config.save()?;
    println!("Saved to {}", Config::config_path()?.display());
    Ok(())
}

async fn load_tokens(client: &ResideoClient, store: &dyn TokenStore) -> bool {
    client.restore(store).await
}

async fn save_tokens(client: &ResideoClient, store: &FileTokenStore) -> Result<()> {
    if !client.persist(store).await {
        anyhow::bail!("Failed to save tokens to {}", store.path().display());
    }
    Ok(())
}

async fn status(client: &ResideoClient) {
    let tokens = client.tokens().await;
    match (&tokens.access_token, tokens.expires_at) {
        (None, _) => println!("Access token:  none"),
        (Some(_), Some(exp)) if tokens.is_valid() => {
            println!("Access token:  valid");
            println!("  expires_at:  {}", exp.to_rfc3339());
        }
        (Some(_), Some(exp)) => {
            println!("Access token:  expired or expiring");
            println!("  expires_at:  {}", exp.to_rfc3339());
        }
        (Some(_), None) => println!("Access token:  present, expiry unknown"),
    }
    match tokens.refresh_token {
        Some(_) => println!("Refresh token: present"),
        None => println!("Refresh token: none"),
    }
    if tokens.access_token.is_none() {
        println!("\nRun 'resideo-cli auth-url' to authenticate.");
    }
}

fn print_device(device: &Device) {
    println!("{}", device.display_name());
    println!("  Device ID: {}", device.device_id);
    if let Some(ref model) = device.device_model {
        println!("  Model:     {}", model);
    }
    if let Some(mode) = device.changeable_values.get("mode").and_then(|m| m.as_str()) {
        println!("  Mode:      {}", mode);
    }
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to format response")?;
    println!("{}", text);
    Ok(())
}

async fn run_api_command(client: &ResideoClient, command: ApiCommand) -> Result<()> {
    match command {
        ApiCommand::Refresh => {
            client.refresh().await?;
            println!("Token refreshed.");
        }
        ApiCommand::Locations => {
            let locations = client.get_locations().await?;
            for loc in &locations {
                println!(
                    "{}  {} ({} devices)",
                    loc.location_id,
                    loc.name.as_deref().unwrap_or("(unnamed)"),
                    loc.devices.len()
                );
            }
        }
        ApiCommand::Devices => {
            for device in client.get_all_devices().await? {
                print_device(&device);
            }
        }
        ApiCommand::Thermostats => {
            let thermostats = client.get_thermostats().await;
            if thermostats.is_empty() {
                println!("No thermostats found.");
            }
            for device in &thermostats {
                print_device(device);
            }
        }
        ApiCommand::Show {
            device_id,
            location,
        } => {
            let status = client.get_thermostat_status(&device_id, location).await?;
            print_json(&status)?;
        }
        ApiCommand::SetTemp {
            device_id,
            mode,
            heat,
            cool,
            location,
        } => {
            tracing::info!("Setting {} to {}...", device_id, mode);
            client
                .set_temperature(&device_id, &mode, heat, cool, location)
                .await?;
            println!("Thermostat updated.");
        }
        ApiCommand::Fan {
            device_id,
            mode,
            location,
        } => {
            client.set_fan_mode(&device_id, &mode, location).await?;
            println!("Fan mode set to {}.", mode);
        }
    }
    Ok(())
}
