use std::error::Error;

use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use engine::{Currency, Engine, Money};
use migration::MigratorTrait;
use sea_orm::Database;

#[derive(Parser, Debug)]
#[command(name = "bottega_admin")]
#[command(about = "Admin utilities for Bottega (wallets, payment methods, effects)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./bottega.db?mode=rwc"
    )]
    database_url: String,

    /// User recorded as the acting administrator on mutations.
    #[arg(long, env = "BOTTEGA_ADMIN", default_value = "admin")]
    admin: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Wallet(Wallet),
    Payments(Payments),
    Effects(Effects),
}

#[derive(Args, Debug)]
struct Wallet {
    #[command(subcommand)]
    command: WalletCommand,
}

#[derive(Subcommand, Debug)]
enum WalletCommand {
    Create(WalletCreateArgs),
    Show(WalletShowArgs),
    Topup(WalletTopupArgs),
}

#[derive(Args, Debug)]
struct WalletCreateArgs {
    #[arg(long)]
    user: String,
    #[arg(long, default_value = "USD")]
    currency: String,
}

#[derive(Args, Debug)]
struct WalletShowArgs {
    #[arg(long)]
    user: String,
    /// How many history entries to print.
    #[arg(long, default_value_t = 10)]
    history: u64,
}

#[derive(Args, Debug)]
struct WalletTopupArgs {
    #[arg(long)]
    user: String,
    /// Amount in major units, e.g. `10.50`.
    #[arg(long)]
    amount: String,
    #[arg(long)]
    note: Option<String>,
}

#[derive(Args, Debug)]
struct Payments {
    #[command(subcommand)]
    command: PaymentsCommand,
}

#[derive(Subcommand, Debug)]
enum PaymentsCommand {
    /// Seed the default method catalog (safe to rerun).
    Seed,
    List,
    Enable(PaymentTagArgs),
    Disable(PaymentTagArgs),
}

#[derive(Args, Debug)]
struct PaymentTagArgs {
    #[arg(long)]
    tag: String,
}

#[derive(Args, Debug)]
struct Effects {
    #[command(subcommand)]
    command: EffectsCommand,
}

#[derive(Subcommand, Debug)]
enum EffectsCommand {
    /// Apply pending post-settlement effects.
    Drain(EffectsDrainArgs),
}

#[derive(Args, Debug)]
struct EffectsDrainArgs {
    #[arg(long, default_value_t = 100)]
    limit: u64,
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    let engine = Engine::builder().database(db).build();

    match cli.command {
        Command::Wallet(wallet) => match wallet.command {
            WalletCommand::Create(args) => {
                let currency = parse_currency(&args.currency)?;
                let wallet = engine
                    .create_wallet(&args.user, currency, Utc::now())
                    .await?;
                println!("created wallet {} for {}", wallet.id, wallet.user_id);
            }
            WalletCommand::Show(args) => {
                let wallet = engine.wallet(&args.user).await?;
                println!(
                    "wallet {} user={} balance={} {}",
                    wallet.id,
                    wallet.user_id,
                    wallet.balance,
                    wallet.currency.code()
                );
                for entry in engine.wallet_histories(wallet.id, args.history).await? {
                    println!(
                        "  {} {:>8} {} {}",
                        entry.created_at.format("%Y-%m-%d %H:%M"),
                        entry.amount.to_string(),
                        entry.direction.as_str(),
                        entry.note.as_deref().unwrap_or("-"),
                    );
                }
            }
            WalletCommand::Topup(args) => {
                let amount: Money = args.amount.parse()?;
                let transaction = engine
                    .admin_top_up(&args.user, amount, args.note, &cli.admin, Utc::now())
                    .await?;
                println!(
                    "topped up {} by {} (transaction {})",
                    args.user, amount, transaction.id
                );
            }
        },
        Command::Payments(payments) => match payments.command {
            PaymentsCommand::Seed => {
                engine.seed_payment_methods().await?;
                println!("payment methods seeded");
            }
            PaymentsCommand::List => {
                for method in engine.payment_methods().await? {
                    println!(
                        "{:>2} {:<14} {} {}",
                        method.position,
                        method.tag.as_str(),
                        if method.active { "active" } else { "disabled" },
                        method.id,
                    );
                }
            }
            PaymentsCommand::Enable(args) => {
                engine.set_payment_method_active(&args.tag, true).await?;
                println!("enabled {}", args.tag);
            }
            PaymentsCommand::Disable(args) => {
                engine.set_payment_method_active(&args.tag, false).await?;
                println!("disabled {}", args.tag);
            }
        },
        Command::Effects(effects) => match effects.command {
            EffectsCommand::Drain(args) => {
                let applied = engine.drain_pending_effects(args.limit).await?;
                println!("applied {applied} effects");
            }
        },
    }

    Ok(())
}
