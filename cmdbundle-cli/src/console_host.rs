//! A [`ServerHost`] for running bundles from a terminal.
//!
//! There is no game server behind it: players are names registered up front,
//! dispatched commands and chat messages are written as lines to the
//! configured writer (stdout by default).

use std::collections::HashSet;
use std::io::{self, Write};
use std::sync::Mutex;

use cmdbundle_core::host::ServerHost;
use cmdbundle_core::{Actor, ActorSnapshot, StyledText, Team};
use dashmap::DashMap;
use tracing::{debug, warn};
use uuid::Uuid;

pub const CONSOLE_NAME: &str = "CONSOLE";

pub struct ConsoleHost {
    players: DashMap<Uuid, ActorSnapshot>,
    permissions: DashMap<Uuid, HashSet<String>>,
    teams: Mutex<Vec<Team>>,
    out: Mutex<Box<dyn Write + Send>>,
}

impl Default for ConsoleHost {
    fn default() -> Self {
        Self::with_writer(Box::new(io::stdout()))
    }
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_writer(out: Box<dyn Write + Send>) -> Self {
        Self {
            players: DashMap::new(),
            permissions: DashMap::new(),
            teams: Mutex::new(Vec::new()),
            out: Mutex::new(out),
        }
    }

    /// Registers an online player; an already known name returns the existing actor.
    pub fn add_player(&self, name: &str) -> Actor {
        if let Some(actor) = self.find_online_actor(name) {
            return actor;
        }
        let id = Uuid::new_v4();
        self.players.insert(id, ActorSnapshot::new(name, id));
        Actor::Player(id)
    }

    pub fn set_op(&self, actor: &Actor, op: bool) {
        if let Some(mut player) = actor.id().and_then(|id| self.players.get_mut(&id)) {
            player.is_op = op;
        }
    }

    pub fn grant(&self, actor: &Actor, node: &str) {
        if let Some(id) = actor.id() {
            self.permissions
                .entry(id)
                .or_default()
                .insert(node.to_string());
        }
    }

    pub fn add_team(&self, name: &str, members: Vec<String>) {
        if let Ok(mut teams) = self.teams.lock() {
            teams.push(Team {
                name: name.to_string(),
                members,
            });
        }
    }

    fn display_name(&self, actor: &Actor) -> String {
        actor
            .id()
            .and_then(|id| self.players.get(&id).map(|p| p.name.clone()))
            .unwrap_or_else(|| CONSOLE_NAME.to_string())
    }

    fn emit(&self, line: String) {
        let Ok(mut out) = self.out.lock() else {
            warn!(line, "console writer lock poisoned, dropping line");
            return;
        };
        if let Err(e) = writeln!(out, "{}", line).and_then(|_| out.flush()) {
            warn!(line, error = %e, "failed to write console output");
        }
    }
}

impl ServerHost for ConsoleHost {
    fn has_permission(&self, actor: &Actor, node: &str) -> bool {
        let Some(id) = actor.id() else {
            return true;
        };
        if self.players.get(&id).map(|p| p.is_op).unwrap_or(false) {
            return true;
        }
        self.permissions
            .get(&id)
            .map(|nodes| nodes.contains(node) || nodes.contains("*"))
            .unwrap_or(false)
    }

    fn dispatch_command(&self, actor: &Actor, command_line: &str, silent: bool) {
        let who = self.display_name(actor);
        debug!(actor = %who, command_line, silent, "dispatch");
        let suffix = if silent { " (silent)" } else { "" };
        self.emit(format!("[{}] /{}{}", who, command_line, suffix));
    }

    fn send_text(&self, actor: &Actor, text: StyledText) {
        let who = self.display_name(actor);
        let style = text
            .color
            .map(|c| c.to_string())
            .into_iter()
            .chain(text.decorations.iter().map(|d| d.to_string()))
            .collect::<Vec<_>>()
            .join(",");
        if style.is_empty() {
            self.emit(format!("-> {}: {}", who, text.text));
        } else {
            self.emit(format!("-> {} <{}>: {}", who, style, text.text));
        }
    }

    fn query_actor(&self, actor: &Actor) -> Option<ActorSnapshot> {
        let id = actor.id()?;
        self.players.get(&id).map(|p| p.clone())
    }

    fn find_online_actor(&self, name: &str) -> Option<Actor> {
        self.players
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| Actor::Player(p.id))
    }

    fn online_actors(&self) -> Vec<ActorSnapshot> {
        let mut players: Vec<ActorSnapshot> = self.players.iter().map(|p| p.clone()).collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));
        players
    }

    fn teams(&self) -> Vec<Team> {
        self.teams.lock().map(|t| t.clone()).unwrap_or_default()
    }
}
