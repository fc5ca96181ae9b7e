//! lmclient - command-line access to the Lifemapper web services
//!
//! Opens a session (logging in when credentials are configured), runs one
//! request and logs out again.

mod error;

use clap::{Parser, Subcommand};
use lifemapper_client::{ClientConfig, LmClient, LmRequest, Method, Param, VersionCheck, XmlNode};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use crate::error::Result;

#[derive(Debug, Parser)]
#[command(name = "lmclient", version, about = "Query the Lifemapper web services")]
struct Cli {
    /// Server root, overrides LM_SERVER
    #[arg(long)]
    server: Option<String>,

    /// User id, overrides LM_USER
    #[arg(long)]
    user: Option<String>,

    /// Password, overrides LM_PASSWORD
    #[arg(long)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print `items.itemCount` of a count service
    Count {
        url: String,
        /// Query parameter as name=value; a bare name is dropped
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<Param>,
    },
    /// Print the items of a list service as JSON
    List {
        url: String,
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<Param>,
    },
    /// Issue a request and print the response
    Get {
        url: String,
        #[arg(long, default_value = "GET", value_parser = parse_method)]
        method: Method,
        #[arg(short = 'p', long = "param", value_parser = parse_param)]
        params: Vec<Param>,
        /// Print the body as received instead of JSON
        #[arg(long)]
        raw: bool,
    },
    /// Check a client version against the server
    Version {
        #[arg(long)]
        client_name: Option<String>,
        #[arg(long)]
        client_version: Option<String>,
    },
}

fn parse_param(s: &str) -> std::result::Result<Param, String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => {
            Ok((name.to_string(), Some(value.to_string())))
        }
        Some(_) => Err(format!("parameter has no name: {}", s)),
        None if s.is_empty() => Err("empty parameter".to_string()),
        None => Ok((s.to_string(), None)),
    }
}

fn parse_method(s: &str) -> std::result::Result<Method, String> {
    s.parse()
}

/// Resolve a path against the server unless it is already absolute
fn resolve(server: &str, url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("{}/{}", server, url.trim_start_matches('/'))
    }
}

fn build_config(cli: &Cli) -> ClientConfig {
    let mut config = ClientConfig::from_env();
    if let Some(server) = &cli.server {
        let defaults = ClientConfig::new(server);
        config.server = defaults.server;
    }
    if let Some(user) = &cli.user {
        config.user_id = user.clone();
    }
    if let Some(password) = &cli.password {
        config.credential = Some(password.clone());
    }
    config
}

/// Result of one command, printed after the session is closed
#[derive(Debug)]
enum Output {
    Count(u64),
    Items(Vec<XmlNode>),
    Node(XmlNode),
    Raw(String),
    Version(String, VersionCheck),
}

impl Output {
    /// Text printed for this output; response trees are rendered as JSON
    fn render(&self) -> Result<String> {
        Ok(match self {
            Self::Count(count) => count.to_string(),
            Self::Items(items) => serde_json::to_string_pretty(items)?,
            Self::Node(node) => serde_json::to_string_pretty(node)?,
            Self::Raw(body) => body.clone(),
            Self::Version(name, check) => format!("{}: {:?}", name, check),
        })
    }
}

fn run(client: &LmClient, command: &Command) -> lifemapper_client::Result<Output> {
    let server = client.session().server();
    let output = match command {
        Command::Count { url, params } => {
            Output::Count(client.get_count(&resolve(server, url), params)?)
        }
        Command::List { url, params } => {
            Output::Items(client.get_list(&resolve(server, url), params)?)
        }
        Command::Get {
            url,
            method,
            params,
            raw,
        } => {
            let request = LmRequest::new(*method, &resolve(server, url)).params(params);
            if *raw {
                Output::Raw(client.make_request(&request)?)
            } else {
                Output::Node(client.make_object_request(&request)?)
            }
        }
        Command::Version {
            client_name,
            client_version,
        } => {
            let name = client_name
                .clone()
                .unwrap_or_else(|| client.config().client_name.clone());
            let check = client.check_version(&name, client_version.as_deref())?;
            Output::Version(name, check)
        }
    };
    Ok(output)
}

fn main() -> Result<()> {
    // Initialize logging
    let env_filter = EnvFilter::from_default_env()
        .add_directive("lifemapper_client=info".parse()?)
        .add_directive("lmclient=info".parse()?);

    // Use JSON format for Cloud Logging when LOG_FORMAT=json
    if std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false)
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_stackdriver::layer())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    }

    let cli = Cli::parse();
    let config = build_config(&cli);
    info!(server = %config.server, user = %config.user_id, "Opening Lifemapper session");

    let output = LmClient::scoped(config, |client| run(client, &cli.command))?;
    println!("{}", output.render()?);
    Ok(())
}
