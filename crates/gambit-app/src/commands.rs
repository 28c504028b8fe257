// Command-line commands and their execution against a session.

use std::fmt::Write as _;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};

use gambit_core::catalog::PlayerCatalog;
use gambit_core::draw::RandomSource;
use gambit_core::matches::MatchOutcome;
use gambit_core::pack::PackId;
use gambit_core::player::PlayerId;
use gambit_core::session::GameSession;
use gambit_core::tier::Tier;

#[derive(Debug, Parser)]
#[command(name = "gambit", version, about = "Fantasy chess card packs, collection, and team")]
pub struct Cli {
    /// Directory holding defaults/ and config/ (defaults to the working directory).
    #[arg(long, global = true)]
    pub base_dir: Option<std::path::PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show balance, collection, team, and recent matches.
    Status,
    /// Buy and open a pack (starter, pawn, knight, king).
    Open { pack: String },
    /// Quicksell an owned card.
    Sell { id: String },
    /// Buy a catalog player outright.
    Sign { id: String },
    /// Manage the lineup.
    Team {
        #[command(subcommand)]
        action: TeamAction,
    },
    /// Set the captain, or `none` to clear it.
    Captain { id: String },
    /// Change the profile name.
    Rename { name: String },
    /// Record a finished match (outcome: win, draw, loss).
    Match {
        opponent: String,
        outcome: String,
        #[arg(default_value_t = 0)]
        points: u64,
    },
    /// List the catalog with tiers and values.
    Catalog,
    /// Wipe the profile, collection, team, and match history.
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum TeamAction {
    Add { id: String },
    Remove { id: String },
}

impl Command {
    /// Whether the command needs a loaded catalog.
    pub fn needs_catalog(&self) -> bool {
        matches!(
            self,
            Command::Status
                | Command::Open { .. }
                | Command::Sell { .. }
                | Command::Sign { .. }
                | Command::Catalog
        )
    }
}

/// Run `command` and return the text to print.
pub fn execute(
    command: &Command,
    session: &mut GameSession,
    catalog: &PlayerCatalog,
    rng: &mut dyn RandomSource,
) -> anyhow::Result<String> {
    match command {
        Command::Status => Ok(render_status(session, catalog)),
        Command::Open { pack } => {
            let pack = PackId::from_name(pack)
                .ok_or_else(|| anyhow!("unknown pack '{pack}' (expected starter, pawn, knight, king)"))?;
            let opening = session
                .open_pack(pack, catalog, rng)
                .with_context(|| format!("could not open {pack}"))?;
            let mut out = String::new();
            let _ = writeln!(out, "Opened {} for {} coins:", pack.config().name, opening.price);
            for card in &opening.cards {
                let tag = if card.is_new {
                    "NEW".to_string()
                } else if card.refund > 0 {
                    format!("duplicate, +{}", card.refund)
                } else {
                    "duplicate".to_string()
                };
                let _ = writeln!(
                    out,
                    "  [{}] {} ({})",
                    Tier::for_rating(card.player.rating),
                    card.player,
                    tag
                );
            }
            let _ = write!(out, "Balance: {}", session.economy().balance());
            Ok(out)
        }
        Command::Sell { id } => {
            let id = PlayerId::new(id.as_str());
            let refund = session.quicksell(&id, catalog)?;
            Ok(format!(
                "Sold {} for {} coins. Balance: {}",
                id,
                refund,
                session.economy().balance()
            ))
        }
        Command::Sign { id } => {
            let id = PlayerId::new(id.as_str());
            let player = session.sign_player(&id, catalog)?;
            Ok(format!(
                "Signed {}. Balance: {}",
                player,
                session.economy().balance()
            ))
        }
        Command::Team { action } => match action {
            TeamAction::Add { id } => {
                let id = PlayerId::new(id.as_str());
                session.add_to_team(&id)?;
                Ok(format!("Added {} to the team", id))
            }
            TeamAction::Remove { id } => {
                let id = PlayerId::new(id.as_str());
                if session.remove_from_team(&id) {
                    Ok(format!("Removed {} from the team", id))
                } else {
                    Ok(format!("{} is not in the team", id))
                }
            }
        },
        Command::Captain { id } => {
            if id.eq_ignore_ascii_case("none") {
                session.set_captain(None)?;
                return Ok("Captain cleared".to_string());
            }
            let id = PlayerId::new(id.as_str());
            session.set_captain(Some(&id))?;
            Ok(format!("{} is now captain", id))
        }
        Command::Rename { name } => {
            if !session.set_username(name) {
                bail!("name must not be blank");
            }
            Ok(format!("Profile renamed to {}", session.economy().profile().username))
        }
        Command::Match {
            opponent,
            outcome,
            points,
        } => {
            let outcome = parse_outcome(outcome)?;
            session.record_match(opponent, outcome, *points)?;
            Ok(format!(
                "Recorded {} vs {}. Points: {}",
                outcome,
                opponent.trim(),
                session.economy().total_points()
            ))
        }
        Command::Catalog => {
            let mut out = String::new();
            for (rank, player) in catalog.players().iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{:>3}. {:<28} {:>4} {:<3} {:<9} {:>5.1}  {}",
                    rank + 1,
                    player.name,
                    player.rating,
                    player.country,
                    Tier::for_rating(player.rating),
                    player.value,
                    player.id
                );
            }
            Ok(out.trim_end().to_string())
        }
        Command::Reset => {
            session.reset_all();
            Ok("All progress reset".to_string())
        }
    }
}

fn parse_outcome(s: &str) -> anyhow::Result<MatchOutcome> {
    match s.to_lowercase().as_str() {
        "win" | "w" => Ok(MatchOutcome::Win),
        "draw" | "d" => Ok(MatchOutcome::Draw),
        "loss" | "l" => Ok(MatchOutcome::Loss),
        other => bail!("unknown outcome '{other}' (expected win, draw, loss)"),
    }
}

fn render_status(session: &GameSession, catalog: &PlayerCatalog) -> String {
    let profile = session.economy().profile();
    let roster = session.roster();
    let mut out = String::new();

    let _ = writeln!(out, "{}", profile.username);
    let _ = writeln!(
        out,
        "Balance: {}  Points: {}",
        profile.balance, profile.total_points
    );
    if !profile.onboarded {
        let _ = writeln!(out, "Starter pack available: run `gambit open starter`");
    }

    let _ = writeln!(out, "Collection ({}):", session.collection().len());
    for id in session.collection().ids() {
        let label = catalog
            .find(id)
            .map(|p| p.to_string())
            .unwrap_or_else(|| id.to_string());
        let marker = if roster.contains(id) { "*" } else { " " };
        let _ = writeln!(out, " {marker} {label}  [{id}]");
    }

    let _ = write!(out, "Team ({}/{})", roster.team().len(), gambit_core::roster::TEAM_CAPACITY);
    match roster.captain() {
        Some(captain) => {
            let _ = write!(out, ", captain {captain}");
        }
        None => {
            let _ = write!(out, ", no captain");
        }
    }

    let recent = session.matches().recent();
    if !recent.is_empty() {
        let _ = write!(out, "\nRecent matches:");
        for record in recent.iter().take(5) {
            let _ = write!(
                out,
                "\n  {} vs {} (+{})",
                record.outcome, record.opponent, record.points
            );
        }
    }
    out
}
