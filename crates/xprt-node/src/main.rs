//! xprt-node: ledger maintenance binary for the Persistence chain state.
//!
//! Subcommands:
//!   init     apply a genesis document to a fresh state database
//!   upgrade  run a named upgrade at a given height, committing only on success
//!   query    print balances, supply, validators, delegations or signing info
//!            as JSON

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};

use xprt_core::constants::BOND_DENOM;
use xprt_core::context::BlockContext;
use xprt_core::types::{AccAddress, ConsAddress, Height, Timestamp, ValAddress};
use xprt_genesis::{apply_genesis, GenesisState, META_CHAIN_ID};
use xprt_state::{BankKeeper, Ledger, SlashingKeeper, StakingKeeper, StateDb};
use xprt_upgrades::{load_records, CosPatchParams};

#[derive(Parser, Debug)]
#[command(
    name = "xprt-node",
    version,
    about = "Persistence ledger state tool: genesis, upgrades and queries"
)]
struct Args {
    /// Directory for the persistent state database.
    #[arg(long, global = true, default_value = "~/.xprt/data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a genesis document to an empty database.
    Init {
        /// Path to the genesis JSON.
        #[arg(long)]
        genesis: PathBuf,
    },

    /// Run a named upgrade handler against the stored state.
    Upgrade {
        /// Upgrade name, e.g. `v5.1.0`.
        #[arg(long)]
        name: String,

        /// Height of the block the upgrade runs in.
        #[arg(long)]
        height: Height,

        /// Block time: Unix seconds or RFC 3339. Defaults to now.
        #[arg(long, value_parser = parse_block_time)]
        time: Option<Timestamp>,

        /// Chain ID. Defaults to the one recorded at genesis.
        #[arg(long)]
        chain_id: Option<String>,

        /// Patch parameters JSON (validator and consensus address). Defaults
        /// to the mainnet COS validator.
        #[arg(long)]
        params: Option<PathBuf>,

        /// Lost-token records JSON.
        #[arg(long)]
        records: PathBuf,
    },

    /// Read state and print it as JSON.
    Query {
        #[command(subcommand)]
        what: Query,
    },
}

#[derive(Subcommand, Debug)]
enum Query {
    /// All balances of an account.
    Balance { address: AccAddress },
    /// Total supply of a denom.
    Supply {
        #[arg(default_value = BOND_DENOM)]
        denom: String,
    },
    Validator { address: ValAddress },
    /// One delegation, with the tokens its shares represent.
    Delegation {
        delegator: AccAddress,
        validator: ValAddress,
    },
    /// Every delegation made by an account.
    Delegations { delegator: AccAddress },
    SigningInfo { address: ConsAddress },
    /// Height an upgrade was applied at, if any.
    Upgrade { name: String },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,xprt=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let data_dir = expand_tilde(&args.data_dir);

    match args.command {
        Command::Init { genesis } => cmd_init(&data_dir, &genesis),
        Command::Upgrade {
            name,
            height,
            time,
            chain_id,
            params,
            records,
        } => cmd_upgrade(
            &data_dir,
            &name,
            height,
            time,
            chain_id,
            params.as_deref(),
            &records,
        ),
        Command::Query { what } => cmd_query(&data_dir, what),
    }
}

// ── init ──────────────────────────────────────────────────────────────────────

fn cmd_init(data_dir: &Path, genesis_path: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    let db = StateDb::open(data_dir).context("opening state database")?;

    let json = std::fs::read_to_string(genesis_path)
        .with_context(|| format!("reading genesis from {}", genesis_path.display()))?;
    let genesis: GenesisState = serde_json::from_str(&json).context("parsing genesis JSON")?;

    let summary = apply_genesis(&db, &genesis).context("applying genesis")?;
    info!(
        accounts = summary.accounts,
        validators = summary.validators,
        delegations = summary.delegations,
        "genesis applied"
    );
    Ok(())
}

// ── upgrade ───────────────────────────────────────────────────────────────────

fn cmd_upgrade(
    data_dir: &Path,
    name: &str,
    height: Height,
    time: Option<Timestamp>,
    chain_id: Option<String>,
    params_path: Option<&Path>,
    records_path: &Path,
) -> anyhow::Result<()> {
    let db = open_existing(data_dir)?;

    let handler = xprt_upgrades::lookup(name).ok_or_else(|| {
        let known: Vec<&str> = xprt_upgrades::known_upgrades().collect();
        anyhow!("unknown upgrade {name:?} (known: {})", known.join(", "))
    })?;
    if let Some(done_at) = db.upgrade_done_height(name)? {
        bail!("upgrade {name} was already applied at height {done_at}");
    }

    let chain_id = match chain_id {
        Some(id) => id,
        None => stored_chain_id(&db)?,
    };
    let ctx = BlockContext::new(chain_id, height, time.unwrap_or_else(|| Utc::now().timestamp()));

    let params = match params_path {
        Some(path) => CosPatchParams::load(path)
            .with_context(|| format!("loading upgrade params from {}", path.display()))?,
        None => {
            warn!("no --params given, using the mainnet COS validator");
            CosPatchParams::mainnet()
        }
    };
    let records = load_records(records_path)
        .with_context(|| format!("loading records from {}", records_path.display()))?;

    let mut ledger = Ledger::new(&db);
    let summary = handler(&ctx, &mut ledger, &params, &records)
        .with_context(|| format!("upgrade {name} failed at height {height}; no state was written"))?;

    ledger.set_upgrade_done(name, height);
    let written = ledger.commit().context("committing upgrade")?;
    info!(upgrade = name, height, keys = written, "upgrade committed");

    print_json(&summary)
}

fn stored_chain_id(db: &StateDb) -> anyhow::Result<String> {
    let raw = db
        .get_meta(META_CHAIN_ID)?
        .context("no chain id recorded at genesis; pass --chain-id")?;
    String::from_utf8(raw).context("stored chain id is not UTF-8")
}

/// Accept either Unix seconds or an RFC 3339 timestamp.
fn parse_block_time(s: &str) -> Result<Timestamp, String> {
    if let Ok(secs) = s.parse::<Timestamp>() {
        return Ok(secs);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp())
        .map_err(|e| format!("expected Unix seconds or RFC 3339 time: {e}"))
}

// ── query ─────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct DelegationView {
    delegator_address: AccAddress,
    validator_address: ValAddress,
    shares: String,
    tokens: String,
}

fn cmd_query(data_dir: &Path, what: Query) -> anyhow::Result<()> {
    let db = open_existing(data_dir)?;
    let ledger = Ledger::new(&db);

    match what {
        Query::Balance { address } => {
            let balances = ledger.get_all_balances(&address)?;
            print_json(&serde_json::json!({ "address": address, "balances": balances }))
        }
        Query::Supply { denom } => print_json(&ledger.get_supply(&denom)?),
        Query::Validator { address } => {
            let validator = ledger
                .get_validator(&address)?
                .with_context(|| format!("validator {address} not found"))?;
            print_json(&validator)
        }
        Query::Delegation {
            delegator,
            validator,
        } => {
            let delegation = ledger
                .get_delegation(&delegator, &validator)?
                .with_context(|| format!("no delegation from {delegator} to {validator}"))?;
            let view = delegation_view(&ledger, delegation)?;
            print_json(&view)
        }
        Query::Delegations { delegator } => {
            let views = ledger
                .get_delegator_delegations(&delegator)?
                .into_iter()
                .map(|d| delegation_view(&ledger, d))
                .collect::<anyhow::Result<Vec<_>>>()?;
            print_json(&views)
        }
        Query::SigningInfo { address } => {
            let info = ledger
                .get_validator_signing_info(&address)?
                .with_context(|| format!("no signing info for {address}"))?;
            print_json(&info)
        }
        Query::Upgrade { name } => {
            let height = ledger.upgrade_done_height(&name)?;
            print_json(&serde_json::json!({ "name": name, "height": height }))
        }
    }
}

fn delegation_view(
    ledger: &Ledger<'_>,
    delegation: xprt_core::staking::Delegation,
) -> anyhow::Result<DelegationView> {
    let validator = ledger
        .get_validator(&delegation.validator_address)?
        .with_context(|| format!("validator {} not found", delegation.validator_address))?;
    Ok(DelegationView {
        tokens: validator.tokens_from_shares(delegation.shares).to_string(),
        shares: delegation.shares.to_string(),
        delegator_address: delegation.delegator_address,
        validator_address: delegation.validator_address,
    })
}

// ── helpers ───────────────────────────────────────────────────────────────────

/// Open a database that genesis has already been applied to.
fn open_existing(data_dir: &Path) -> anyhow::Result<StateDb> {
    if !data_dir.exists() {
        bail!("no state database at {}; run `init` first", data_dir.display());
    }
    let db = StateDb::open(data_dir).context("opening state database")?;
    if db.is_empty() {
        bail!("state database at {} is empty; run `init` first", data_dir.display());
    }
    Ok(db)
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Expand a leading `~` to the user's home directory (`HOME` or `USERPROFILE`).
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_time_accepts_seconds_and_rfc3339() {
        assert_eq!(parse_block_time("1680000000"), Ok(1_680_000_000));
        assert_eq!(parse_block_time("1970-01-01T00:01:00Z"), Ok(60));
        assert!(parse_block_time("yesterday").is_err());
    }

    #[test]
    fn tilde_expands_to_home() {
        std::env::set_var("HOME", "/home/xprt");
        assert_eq!(expand_tilde(Path::new("~/.xprt/data")), PathBuf::from("/home/xprt/.xprt/data"));
        assert_eq!(expand_tilde(Path::new("/var/xprt")), PathBuf::from("/var/xprt"));
    }
}
