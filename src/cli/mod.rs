use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::application::{
    CreateTransferRequest, TransferResponse, TransferService, format_timestamp,
};
use crate::config::StoreConfig;
use crate::domain::{
    DEFAULT_PAGE_SIZE, PageRequest, TransferDirection, format_amount, parse_amount,
};

/// Ledgerline - double-entry money transfers
#[derive(Parser)]
#[command(name = "ledgerline")]
#[command(about = "Atomic money transfers between bank accounts over a double-entry ledger")]
#[command(version)]
pub struct Cli {
    /// Database file path
    #[arg(short, long, default_value = "ledgerline.db")]
    pub database: String,

    /// Maximum pooled database connections
    #[arg(long, default_value_t = 8)]
    pub max_connections: u32,

    /// How long a writer waits for the database lock, in milliseconds
    #[arg(long, default_value_t = 5000)]
    pub busy_timeout_ms: u64,

    /// Log filter used when RUST_LOG is unset (e.g. "info", "ledgerline=debug")
    #[arg(long, default_value = "warn", global = true)]
    pub log_level: String,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Account management commands
    #[command(subcommand)]
    Account(AccountCommands),

    /// Move money between two accounts
    Transfer {
        /// Amount to transfer in the source account's currency (e.g., "50.00" or "50")
        amount: String,

        /// Source account ID
        #[arg(long)]
        from: String,

        /// Destination account ID
        #[arg(long)]
        to: String,

        /// Authenticated user performing the transfer
        #[arg(long)]
        user: String,

        /// Key that makes retries of the same request safe
        #[arg(long)]
        idempotency_key: Option<String>,
    },

    /// List transfers of an account
    Transfers {
        /// Account ID
        #[arg(long)]
        account: String,

        /// Authenticated user owning the account
        #[arg(long)]
        user: String,

        /// Direction: all, incoming, outgoing
        #[arg(long, default_value = "all")]
        direction: String,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Transfers per page
        #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
        limit: u32,
    },

    /// Show a single transfer
    #[command(name = "show")]
    ShowTransfer {
        /// Transfer ID
        id: String,
    },

    /// Verify ledger integrity
    Check,
}

#[derive(Subcommand)]
pub enum AccountCommands {
    /// Open a new account
    Create {
        /// Owning user ID (a new one is generated if omitted)
        #[arg(long)]
        user: Option<String>,

        /// Display name of the owner
        #[arg(long)]
        owner: String,

        /// Currency code: USD, EUR, GBP, JPY, EGP, CAD, AUD
        #[arg(short, long, default_value = "USD")]
        currency: String,

        /// Opening balance (e.g., "1000.00")
        #[arg(short, long)]
        balance: Option<String>,
    },

    /// List accounts owned by a user
    List {
        /// Authenticated user
        #[arg(long)]
        user: String,
    },

    /// Show account balance
    Show {
        /// Account ID
        id: String,

        /// Authenticated user owning the account
        #[arg(long)]
        user: String,
    },

    /// List ledger entries of an account
    Entries {
        /// Account ID
        id: String,

        /// Authenticated user owning the account
        #[arg(long)]
        user: String,
    },
}

impl Cli {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::for_path(&self.database)
            .with_max_connections(self.max_connections)
            .with_busy_timeout(Duration::from_millis(self.busy_timeout_ms))
    }

    pub async fn run(self) -> Result<()> {
        let config = self.store_config();
        let json = self.json;

        match self.command {
            Commands::Init => {
                TransferService::init(&config).await?;
                println!("Database initialized: {}", self.database);
            }

            Commands::Account(account_cmd) => {
                let service = TransferService::connect(&config).await?;
                run_account_command(&service, account_cmd, json).await?;
            }

            Commands::Transfer {
                amount,
                from,
                to,
                user,
                idempotency_key,
            } => {
                let service = TransferService::connect(&config).await?;
                let source = service.get_account(&user, &from).await?;
                let amount = parse_amount(&amount, &source.currency)
                    .context("Invalid amount format. Use '50.00' or '50'")?;

                let mut request = CreateTransferRequest::new(from, to, amount);
                if let Some(key) = idempotency_key {
                    request = request.with_idempotency_key(key);
                }

                let response = service.transfer(&user, request).await?;
                if json {
                    print_json(&response)?;
                } else {
                    println!(
                        "{} transfer: {} {} {} -> {} ({})",
                        if response.replayed { "Replayed" } else { "Executed" },
                        format_amount(response.amount, &source.currency),
                        source.currency,
                        response.from_account_id,
                        response.to_account_id,
                        response.id
                    );
                }
            }

            Commands::Transfers {
                account,
                user,
                direction,
                page,
                limit,
            } => {
                let service = TransferService::connect(&config).await?;
                let direction = TransferDirection::parse(&direction);
                let listing = service
                    .list_transfers(&user, &account, direction, PageRequest::new(page, limit))
                    .await?;

                if json {
                    print_json(&listing)?;
                } else if listing.data.is_empty() {
                    println!("No transfers found.");
                } else {
                    let currency = service.get_account(&user, &account).await?.currency;
                    println!(
                        "{:<21} {:>12} {:<36} {:<36}",
                        "DATE", "AMOUNT", "FROM", "TO"
                    );
                    println!("{}", "-".repeat(108));
                    for t in &listing.data {
                        println!("{}", transfer_row(t, &currency));
                    }
                    println!(
                        "Page {} of {} ({} transfers, direction: {})",
                        listing.page, listing.total_pages, listing.total, direction
                    );
                }
            }

            Commands::ShowTransfer { id } => {
                let service = TransferService::connect(&config).await?;
                let transfer = service.get_transfer(&id).await?;
                if json {
                    print_json(&transfer)?;
                } else {
                    println!("Transfer: {}", transfer.id);
                    println!("From:     {}", transfer.from_account_id);
                    println!("To:       {}", transfer.to_account_id);
                    let source = Uuid::parse_str(&transfer.from_account_id)
                        .context("Invalid account ID in transfer")?;
                    match service.repository().get_account(source).await? {
                        Some(account) => println!(
                            "Amount:   {} {}",
                            format_amount(transfer.amount, &account.currency),
                            account.currency
                        ),
                        None => println!("Amount:   {}", transfer.amount),
                    }
                    println!("Created:  {}", transfer.created_at);
                }
            }

            Commands::Check => {
                let service = TransferService::connect(&config).await?;
                run_check_command(&service, json).await?;
            }
        }

        Ok(())
    }
}

async fn run_account_command(
    service: &TransferService,
    cmd: AccountCommands,
    json: bool,
) -> Result<()> {
    match cmd {
        AccountCommands::Create {
            user,
            owner,
            currency,
            balance,
        } => {
            let user_id = match user {
                Some(raw) => Uuid::parse_str(&raw).context("Invalid user ID")?,
                None => Uuid::new_v4(),
            };
            let currency = currency.to_uppercase();
            let opening = balance
                .map(|b| parse_amount(&b, &currency))
                .transpose()
                .context("Invalid balance format. Use '1000.00' or '1000'")?;

            let account = service
                .create_account(user_id, owner, currency, opening)
                .await?;

            if json {
                print_json(&account)?;
            } else {
                println!("Created account: {}", account.id);
                println!("User:    {}", account.user_id);
                println!(
                    "Balance: {} {}",
                    format_amount(account.balance, &account.currency),
                    account.currency
                );
            }
        }

        AccountCommands::List { user } => {
            let accounts = service.list_accounts(&user).await?;
            if json {
                print_json(&accounts)?;
            } else if accounts.is_empty() {
                println!("No accounts found.");
            } else {
                println!("{:<36} {:<20} {:>14} CUR", "ID", "OWNER", "BALANCE");
                println!("{}", "-".repeat(76));
                for account in &accounts {
                    println!(
                        "{:<36} {:<20} {:>14} {}",
                        account.id,
                        account.owner,
                        format_amount(account.balance, &account.currency),
                        account.currency
                    );
                }
            }
        }

        AccountCommands::Show { id, user } => {
            let balance = service.account_balance(&user, &id).await?;
            if json {
                print_json(&balance)?;
            } else {
                println!(
                    "{}: {} {}",
                    balance.id,
                    format_amount(balance.balance, &balance.currency),
                    balance.currency
                );
            }
        }

        AccountCommands::Entries { id, user } => {
            let account = service.get_account(&user, &id).await?;
            let entries = service.list_entries(&user, &id).await?;
            if json {
                print_json(&entries)?;
            } else if entries.is_empty() {
                println!("No entries found.");
            } else {
                println!("{:<21} {:<6} {:>12} ID", "DATE", "SIDE", "AMOUNT");
                println!("{}", "-".repeat(79));
                for entry in &entries {
                    println!(
                        "{:<21} {:<6} {:>12} {}",
                        format_timestamp(entry.created_at),
                        if entry.is_debit() { "debit" } else { "credit" },
                        format_amount(entry.amount, &account.currency),
                        entry.id
                    );
                }
            }
        }
    }
    Ok(())
}

async fn run_check_command(service: &TransferService, json: bool) -> Result<()> {
    let report = service.check_integrity().await?;

    if json {
        print_json(&report)?;
    } else {
        println!("Checking ledger integrity...\n");
        println!("Accounts:  {}", report.account_count);
        println!("Transfers: {}", report.transfer_count);
        println!("Entries:   {}", report.entry_count);
        println!();
    }

    if report.is_healthy() {
        if !json {
            println!("Ledger is consistent.");
        }
    } else {
        if !json {
            println!("Issues found:");
            for issue in &report.issues {
                println!("  - {}", issue);
            }
        }
        anyhow::bail!("Ledger integrity check failed");
    }

    Ok(())
}

fn transfer_row(t: &TransferResponse, currency: &str) -> String {
    format!(
        "{:<21} {:>12} {:<36} {:<36}",
        t.created_at,
        format_amount(t.amount, currency),
        t.from_account_id,
        t.to_account_id
    )
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
