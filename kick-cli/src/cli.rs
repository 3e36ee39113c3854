use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about = "Kick API command line client", long_about = None)]
pub struct Args {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to <config dir>/kick/config.toml)
    #[arg(short, long, global = true, env = "KICK_CONFIG")]
    pub config: Option<PathBuf>,

    /// OAuth client id, overriding the config file and `KICK_CLIENT_ID`
    #[arg(long, global = true)]
    pub client_id: Option<String>,

    /// OAuth client secret, overriding the config file and `KICK_CLIENT_SECRET`
    #[arg(long, global = true, hide = true)]
    pub client_secret: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authorize this app against a Kick account and store the credential
    Authorize {
        /// Local port for the OAuth callback (defaults to the redirect URI's port)
        #[arg(short, long)]
        port: Option<u16>,

        /// Callback path (defaults to the redirect URI's path)
        #[arg(long)]
        path: Option<String>,

        /// Scopes to request, comma separated
        #[arg(short, long, value_delimiter = ',')]
        scopes: Vec<String>,

        /// Print the credential instead of saving it to the config file
        #[arg(long)]
        no_save: bool,
    },

    /// Receive webhook deliveries and log every event
    Serve {
        /// Address to bind
        #[arg(long)]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long)]
        port: Option<u16>,

        /// Webhook path
        #[arg(long)]
        path: Option<String>,
    },

    /// Subscribe to webhook events, given as `name` or `name:version`
    Subscribe {
        #[arg(required = true)]
        events: Vec<String>,

        /// Broadcaster to subscribe for (app tokens only)
        #[arg(short, long)]
        broadcaster_user_id: Option<u64>,
    },

    /// Send a chat message
    Chat {
        message: String,

        /// Send as the authorized user into this broadcaster's chat instead of as the bot
        #[arg(short, long)]
        broadcaster_user_id: Option<u64>,

        /// Message id to reply to
        #[arg(short, long)]
        reply_to: Option<String>,
    },

    /// Show the authorized user
    Whoami,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_args_are_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_scopes_are_comma_separated() {
        let args = Args::parse_from(["kick", "authorize", "-s", "user:read,chat:write"]);
        match args.command {
            Commands::Authorize { scopes, .. } => assert_eq!(scopes, ["user:read", "chat:write"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_subscribe_requires_events() {
        assert!(Args::try_parse_from(["kick", "subscribe"]).is_err());
    }
}
