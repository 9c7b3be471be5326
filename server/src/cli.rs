use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "chainhook-relay")]
#[command(about = "Confirm invoices from chainhook webhook deliveries", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Write the effective configuration to the config file
    InitConfig,
    /// Keep the webhook bearer secret in the OS keychain
    SetWebhookSecret {
        secret: String,
    },
    /// Remove the webhook bearer secret from the OS keychain
    ClearWebhookSecret,
}

impl Cli {
    pub fn command(&self) -> &Command {
        self.command.as_ref().unwrap_or(&Command::Serve)
    }
}
