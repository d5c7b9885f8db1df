//! Operator tool for squad tournaments.
//!
//! Advances rounds, recomputes standings and substitutes pairings against the
//! PostgreSQL store, printing results as JSON.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Error, bail};
use arena::{
    ArenaError, PrizeCatalog, RoundManager, StaticPrizeCatalog,
    db::{Database, PgArenaRepository},
    models::{SquadsPairing, TournamentId},
};
use config::ArenaConfig;
use ctrlc::set_handler;
use log::{error, info};
use pico_args::Arguments;
use serde_json::json;

const HELP: &str = "\
Advance and inspect squad tournament rounds

USAGE:
  arena_cli [OPTIONS] <COMMAND> <TOURNAMENT> [ROUND] [FILE]

COMMANDS:
  advance     TOURNAMENT              Rank the last round and pair the next one
  standings   TOURNAMENT ROUND        Recompute and print every prize table of ROUND
  show        TOURNAMENT ROUND        Print the pairings of ROUND
  substitute  TOURNAMENT ROUND FILE   Replace the pairings of ROUND with the JSON list in FILE

OPTIONS:
  --db-url     URL         Database connection string  [default: env DATABASE_URL]
  --prizes     FILE        Prize catalog as JSON        [default: Team Score and Most TD]

FLAGS:
  --players                With show: print individual games instead of squad tables
  -h, --help               Print help information

ENVIRONMENT:
  DATABASE_URL                  PostgreSQL connection string
  ARENA_QUERY_TIMEOUT_MS        Single query deadline
  ARENA_TRANSACTION_TIMEOUT_MS  Round creation / standings write deadline
  ARENA_DIRECTORY_TIMEOUT_MS    Player lookup deadline
  ARENA_WIN_POINTS, ARENA_DRAW_POINTS, ARENA_LOSS_POINTS
  RUST_LOG                      Log filter (e.g. info, arena=debug)
";

enum Command {
    Advance,
    Standings(u32),
    Show { round: u32, players: bool },
    Substitute { round: u32, file: PathBuf },
}

struct Args {
    database_url: Option<String>,
    prizes: Option<PathBuf>,
    tournament: TournamentId,
    command: Command,
}

fn parse_args() -> Result<Args, Error> {
    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let database_url = pargs.opt_value_from_str("--db-url")?;
    let prizes = pargs.opt_value_from_str("--prizes")?;
    let players = pargs.contains("--players");

    let name: String = pargs.free_from_str().context("missing command, see --help")?;
    let tournament: TournamentId = pargs
        .free_from_str()
        .context("missing or invalid tournament id")?;

    let command = match name.as_str() {
        "advance" => Command::Advance,
        "standings" => Command::Standings(pargs.free_from_str().context("missing round")?),
        "show" => Command::Show {
            round: pargs.free_from_str().context("missing round")?,
            players,
        },
        "substitute" => Command::Substitute {
            round: pargs.free_from_str().context("missing round")?,
            file: pargs.free_from_str().context("missing pairings file")?,
        },
        other => bail!("unknown command '{}', see --help", other),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        bail!("unexpected arguments: {:?}", remaining);
    }

    Ok(Args {
        database_url,
        prizes,
        tournament,
        command,
    })
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let args = parse_args()?;

    // Catching signals for exit. Round creation is a single transaction, so an
    // interrupted advance leaves nothing behind.
    set_handler(|| std::process::exit(130))?;

    env_logger::builder().format_target(false).init();

    let config = ArenaConfig::from_env(args.database_url)?;
    config.validate()?;

    let catalog = match &args.prizes {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading prize catalog {}", path.display()))?;
            StaticPrizeCatalog::from_json(&json)?
        }
        None => StaticPrizeCatalog::standard(config.scoring),
    };
    let catalog = Arc::new(catalog);

    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {}", e))?;
    info!("Database connected successfully");

    let repository = Arc::new(PgArenaRepository::new(db.pool().clone(), config.timeouts));
    let manager = RoundManager::new(
        repository.clone(),
        repository,
        catalog.clone(),
        config.timeouts,
    );

    let result = run(&manager, catalog.as_ref(), args.tournament, args.command).await;
    db.close().await;

    match result {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            if e.is_retryable() {
                error!("{} (retryable)", e);
            } else {
                error!("{}", e);
            }
            Err(e.into())
        }
    }
}

async fn run(
    manager: &RoundManager,
    catalog: &StaticPrizeCatalog,
    tournament: TournamentId,
    command: Command,
) -> Result<serde_json::Value, ArenaError> {
    match command {
        Command::Advance => {
            let round = manager.prepare_next_round(tournament).await?;
            Ok(serde_json::to_value(round)?)
        }
        Command::Standings(round) => {
            manager.calculate_standings(tournament, round).await?;

            let mut tables = Vec::new();
            let squad_prizes = catalog.squad_prizes(tournament).await?;
            let player_prizes = catalog.player_prizes(tournament).await?;
            for prize in squad_prizes.iter().chain(player_prizes.iter()) {
                let scores = manager.get_standings(tournament, round, prize.id).await?;
                tables.push(json!({
                    "prize": prize.name,
                    "prize_id": prize.id,
                    "scores": scores,
                }));
            }
            Ok(json!({ "round": round, "standings": tables }))
        }
        Command::Show { round, players } => {
            if players {
                Ok(serde_json::to_value(
                    manager.players_round(tournament, round).await?,
                )?)
            } else {
                Ok(serde_json::to_value(
                    manager.get_round(tournament, round).await?,
                )?)
            }
        }
        Command::Substitute { round, file } => {
            let json = std::fs::read_to_string(&file).map_err(|e| {
                ArenaError::DataUnavailable(format!("{}: {}", file.display(), e))
            })?;
            let pairings: Vec<SquadsPairing> = serde_json::from_str(&json)?;
            let round = manager.substitute_round(tournament, round, pairings).await?;
            Ok(serde_json::to_value(round)?)
        }
    }
}
