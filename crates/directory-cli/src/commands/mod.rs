//! CLI command definitions and implementations.

mod contacts;
mod import;
mod keys;
mod sheet;
mod users;

use clap::{Parser, Subcommand};
use directory_storage::{PgStore, PgStoreConfig};

use crate::output::{self, CliError};

pub use contacts::PopulateContactsCommand;
pub use import::{ImportContactsCommand, ImportExtendedCommand, ImportTsvCommand};
pub use keys::{DecryptPasswordCommand, EncryptPasswordCommand};
pub use users::CreateUserCommand;

/// Supplier Directory administration
///
/// Imports, backfills and maintenance for the supplier directory database.
#[derive(Parser)]
#[command(name = "directory-admin")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// PostgreSQL connection URL
    #[arg(long, env = "DATABASE_URL", global = true, hide_env_values = true)]
    pub database_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Import vendors, suppliers and categories from a TSV file
    #[command(name = "import-tsv")]
    ImportTsv(ImportTsvCommand),

    /// Update supplier contact fields from a CSV file
    #[command(name = "import-supplier-contacts")]
    ImportSupplierContacts(ImportContactsCommand),

    /// Upsert supplier credentials and account details from a TSV file
    #[command(name = "import-supplier-contacts-extended")]
    ImportSupplierContactsExtended(ImportExtendedCommand),

    /// Create contact records from the supplier contact fields
    #[command(name = "populate-contacts")]
    PopulateContacts(PopulateContactsCommand),

    /// Decrypt a stored website password
    #[command(name = "decrypt-password")]
    DecryptPassword(DecryptPasswordCommand),

    /// Encrypt a website password into a storable token
    #[command(name = "encrypt-password")]
    EncryptPassword(EncryptPasswordCommand),

    /// Print a fresh password encryption key
    #[command(name = "generate-key")]
    GenerateKey,

    /// Create a login account
    #[command(name = "create-user")]
    CreateUser(CreateUserCommand),

    /// Apply pending database migrations
    Migrate,
}

impl Cli {
    /// Runs the CLI command.
    pub async fn run(self) -> Result<(), CliError> {
        if self.no_color {
            colored::control::set_override(false);
        }

        match self.command {
            Commands::DecryptPassword(cmd) => cmd.run(),
            Commands::EncryptPassword(cmd) => cmd.run(),
            Commands::GenerateKey => keys::generate_key(),
            Commands::ImportTsv(cmd) => cmd.run(&connect(self.database_url).await?).await,
            Commands::ImportSupplierContacts(cmd) => cmd.run(&connect(self.database_url).await?).await,
            Commands::ImportSupplierContactsExtended(cmd) => cmd.run(&connect(self.database_url).await?).await,
            Commands::PopulateContacts(cmd) => cmd.run(&connect(self.database_url).await?).await,
            Commands::CreateUser(cmd) => cmd.run(&connect(self.database_url).await?).await,
            Commands::Migrate => {
                let store = connect(self.database_url).await?;
                output::info("Running migrations");
                store.migrate().await?;
                output::success("Database is up to date");
                Ok(())
            }
        }
    }
}

/// Opens the database named by `--database-url`.
async fn connect(url: Option<String>) -> Result<PgStore, CliError> {
    let url = url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| CliError::config("No database configured. Set DATABASE_URL or use --database-url"))?;
    let config = PgStoreConfig {
        url,
        max_connections: 2,
        ..PgStoreConfig::default()
    };
    Ok(PgStore::connect(&config).await?)
}
