use clap::{Args, Parser, Subcommand};
use frontend_core::{InstanceDescriptor, RegistrationRequest, RegistryClientConfig};
use frontend_registry::{HeartbeatOutcome, RegistryClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "frontendctl")]
#[command(about = "Frontend registry handshake tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    instance: InstanceArgs,
}

#[derive(Args)]
struct InstanceArgs {
    #[arg(long, global = true, env = "SERVICE_NAME", default_value = "FRONTEND")]
    service_name: String,

    #[arg(long, global = true, env = "HOST_NAME", default_value = "frontend-staging")]
    host_name: String,

    #[arg(long, global = true, env = "SERVICE_PORT", default_value_t = 3000)]
    port: u16,

    #[arg(long, global = true, env = "EUREKA_URL", default_value = "http://eureka:8761")]
    registry_url: String,
}

impl From<InstanceArgs> for RegistryClientConfig {
    fn from(args: InstanceArgs) -> Self {
        RegistryClientConfig::new(args.service_name, args.host_name, args.port, args.registry_url)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the registration payload without contacting the registry
    Descriptor,
    /// Register this instance once
    Register,
    /// Send a single lease renewal
    Heartbeat,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = RegistryClientConfig::from(cli.instance);

    match cli.command {
        Commands::Descriptor => {
            let request = RegistrationRequest::from(InstanceDescriptor::from_config(&config));
            println!("{}", serde_json::to_string_pretty(&request)?);
        }
        Commands::Register => {
            let url = config.registry_url.clone();
            let app = config.service_name.clone();
            let mut client = RegistryClient::from_config(config)?;
            if !client.register().await {
                return Err(format!("registration of {} with {} failed", app, url).into());
            }
            println!("Registered {} with {}", app, url);
        }
        Commands::Heartbeat => {
            let client = RegistryClient::from_config(config)?;
            match client.send_heartbeat().await {
                HeartbeatOutcome::Renewed => println!("Lease renewed"),
                HeartbeatOutcome::Rejected(status) => {
                    return Err(format!("registry rejected heartbeat: {}", status).into());
                }
                HeartbeatOutcome::Failed => return Err("registry unreachable".into()),
            }
        }
    }

    Ok(())
}
