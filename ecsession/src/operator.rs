//! Commandes de chat : `/skip` pour tous, `/ec ...` pour les opérateurs
//!
//! Le contrôle d'accès reste du ressort de l'hôte.

use crate::error::SessionError;
use crate::host::Player;
use crate::session::EliminationSession;
use tracing::info;

const HELP: &[&str] = &[
    "EliminationChamber Admin Commands:",
    "/ec start [lives] - Start session with optional lives count",
    "/ec stop - Stop current session",
    "/ec lives <number> - Set lives for next session",
    "/ec next - Force next map",
    "/ec status - Show session status",
];

/// Une commande reconnue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Skip,
    Start(Option<u32>),
    Stop,
    Lives(Option<u32>),
    Next,
    Status,
    Help,
}

impl Command {
    /// Analyse une ligne de chat ; `None` si elle ne s'adresse pas à nous
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let head = words.next()?.to_lowercase();
        match head.as_str() {
            "/skip" => Some(Command::Skip),
            "/ec" => {
                let Some(sub) = words.next() else {
                    return Some(Command::Help);
                };
                let arg = words.next().and_then(|w| w.parse::<u32>().ok());
                Some(match sub.to_lowercase().as_str() {
                    "start" => Command::Start(arg),
                    "stop" => Command::Stop,
                    "lives" => Command::Lives(arg),
                    "next" => Command::Next,
                    "status" => Command::Status,
                    _ => Command::Help,
                })
            }
            _ => None,
        }
    }
}

/// Messages produits par une commande
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply {
    /// Pour le joueur qui a tapé la commande
    pub to_caller: Vec<String>,
    /// Pour tout le serveur
    pub to_all: Vec<String>,
}

impl Reply {
    fn caller(line: impl Into<String>) -> Self {
        Self {
            to_caller: vec![line.into()],
            to_all: Vec::new(),
        }
    }

    fn both(caller: impl Into<String>, all: impl Into<String>) -> Self {
        Self {
            to_caller: vec![caller.into()],
            to_all: vec![all.into()],
        }
    }
}

/// Exécute `command` pour le compte de `caller`
pub async fn execute(session: &EliminationSession, caller: &Player, command: Command) -> Reply {
    info!(login = %caller.login, ?command, "Chat command");

    match command {
        Command::Skip => {
            if session.is_active() {
                // Le vote lui-même est compté par le mode scripté
                Reply::caller("Skip vote registered. Check the HUD for vote status.")
            } else {
                Reply::caller("No EliminationChamber session is active.")
            }
        }
        Command::Start(lives) => match session.start(lives).await {
            Ok(()) => Reply::both(
                "EliminationChamber session started!",
                format!("EliminationChamber session started by {}!", caller.nickname),
            ),
            Err(SessionError::AlreadyActive) => {
                Reply::caller("An EliminationChamber session is already running.")
            }
            Err(e @ SessionError::InvalidLives { .. }) => Reply::caller(format!("{}.", e)),
            Err(_) => Reply::caller("Failed to start session. Check logs for details."),
        },
        Command::Stop => {
            session.stop().await;
            Reply::both(
                "EliminationChamber session stopped.",
                format!("EliminationChamber session stopped by {}.", caller.nickname),
            )
        }
        Command::Lives(None) => Reply::caller("Usage: /ec lives <number>"),
        Command::Lives(Some(lives)) => match session.set_next_lives(lives) {
            Ok(lives) => Reply::caller(format!(
                "Lives setting changed to {} (takes effect next session).",
                lives
            )),
            Err(_) => Reply::caller("Lives must be between 1 and 10."),
        },
        Command::Next => match session.force_next().await {
            Ok(()) => Reply::both(
                "Forced next map.",
                format!("Map skipped by {}.", caller.nickname),
            ),
            Err(SessionError::NotActive) => Reply::caller("No session is active."),
            Err(_) => Reply::caller("Could not skip the map. Check logs for details."),
        },
        Command::Status => {
            let status = session.status().await;
            Reply {
                to_caller: vec![
                    format!(
                        "Session Active: {}",
                        if status.active { "Yes" } else { "No" }
                    ),
                    format!("Maps in Queue: {}", status.queue_size),
                ],
                to_all: Vec::new(),
            }
        }
        Command::Help => Reply {
            to_caller: HELP.iter().map(|line| line.to_string()).collect(),
            to_all: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        assert_eq!(Command::parse("/skip"), Some(Command::Skip));
        assert_eq!(Command::parse("/ec"), Some(Command::Help));
        assert_eq!(Command::parse("/ec start"), Some(Command::Start(None)));
        assert_eq!(Command::parse("/EC Start 4"), Some(Command::Start(Some(4))));
        assert_eq!(Command::parse("/ec lives"), Some(Command::Lives(None)));
        assert_eq!(Command::parse("/ec lives many"), Some(Command::Lives(None)));
        assert_eq!(Command::parse("/ec lives 7"), Some(Command::Lives(Some(7))));
        assert_eq!(Command::parse("/ec next"), Some(Command::Next));
        assert_eq!(Command::parse("/ec status"), Some(Command::Status));
        assert_eq!(Command::parse("/ec dance"), Some(Command::Help));
        assert_eq!(Command::parse("gg"), None);
        assert_eq!(Command::parse("   "), None);
    }
}
