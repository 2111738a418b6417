//! Boucle d'événements sur stdin
//!
//! Une ligne par événement :
//! - `begin_map` / `end_map`
//! - `join <login> [nickname]` / `leave <login>`
//! - `loglevel <LEVEL>`
//! - toute ligne commençant par `/` est une commande de chat tapée par
//!   l'opérateur de la console

use crate::host::ConsoleHud;
use crate::logs::{LogControl, string_to_level};
use ecsession::{Command, EliminationSession, HostEvent, Player, operator};
use tracing::{info, warn};

const OPERATOR_LOGIN: &str = "console";

/// Une ligne de la console, analysée
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleLine {
    BeginMap,
    EndMap,
    Join(Player),
    Leave(String),
    LogLevel(String),
    Chat(Command),
    Empty,
    Unknown(String),
}

impl ConsoleLine {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return ConsoleLine::Empty;
        }
        if line.starts_with('/') {
            return match Command::parse(line) {
                Some(command) => ConsoleLine::Chat(command),
                None => ConsoleLine::Unknown(line.to_string()),
            };
        }

        let mut words = line.split_whitespace();
        match (words.next(), words.next()) {
            (Some("begin_map"), None) => ConsoleLine::BeginMap,
            (Some("end_map"), None) => ConsoleLine::EndMap,
            (Some("join"), Some(login)) => {
                let nickname = words.collect::<Vec<_>>().join(" ");
                let nickname = if nickname.is_empty() {
                    login.to_string()
                } else {
                    nickname
                };
                ConsoleLine::Join(Player::new(login, nickname))
            }
            (Some("leave"), Some(login)) => ConsoleLine::Leave(login.to_string()),
            (Some("loglevel"), Some(level)) => ConsoleLine::LogLevel(level.to_string()),
            _ => ConsoleLine::Unknown(line.to_string()),
        }
    }
}

/// Exécute une ligne de la console
pub async fn dispatch(
    session: &EliminationSession,
    hud: &ConsoleHud,
    logs: &LogControl,
    line: &str,
) {
    match ConsoleLine::parse(line) {
        ConsoleLine::Empty => {}
        ConsoleLine::BeginMap => session.handle(HostEvent::BeginMap).await,
        ConsoleLine::EndMap => session.handle(HostEvent::EndMap).await,
        ConsoleLine::Join(player) => {
            hud.connect(player.clone()).await;
            session.handle(HostEvent::PlayerConnect(player)).await;
        }
        ConsoleLine::Leave(login) => match hud.disconnect(&login).await {
            Some(player) => session.handle(HostEvent::PlayerDisconnect(player)).await,
            None => warn!(login = %login, "Unknown player"),
        },
        ConsoleLine::LogLevel(level) => match string_to_level(&level) {
            Some(level) => match logs.set_max_level(level) {
                Ok(()) => info!(%level, "Log level changed"),
                Err(e) => warn!(error = %e, "Failed to change log level"),
            },
            None => warn!(level = %level, "Unknown log level"),
        },
        ConsoleLine::Chat(command) => {
            let caller = Player::new(OPERATOR_LOGIN, OPERATOR_LOGIN);
            let reply = operator::execute(session, &caller, command).await;
            for line in reply.to_caller {
                println!("{}", line);
            }
            for line in reply.to_all {
                println!("[all] {}", line);
            }
        }
        ConsoleLine::Unknown(line) => warn!(line = %line, "Unrecognized console input"),
    }
}
