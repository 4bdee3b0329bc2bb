#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use cmdbundle_core::host::{
    HostServices, MockFileAccess, MockProcessRunner, MockWebhookClient, ServerHost,
};
use cmdbundle_core::{Actor, ActorSnapshot, BundleExecutor, EngineConfig, StyledText, Team, VariableStore};
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Dispatch {
        actor: Actor,
        line: String,
        silent: bool,
        at: Instant,
    },
    Text {
        actor: Actor,
        text: StyledText,
        at: Instant,
    },
}

/// In-memory server that records everything the engine does to it.
#[derive(Default)]
pub struct RecordingHost {
    players: Mutex<Vec<ActorSnapshot>>,
    permissions: Mutex<HashMap<Actor, HashSet<String>>>,
    teams: Mutex<Vec<Team>>,
    events: Mutex<Vec<Event>>,
}

impl RecordingHost {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn add_player(&self, name: &str) -> Actor {
        let id = Uuid::new_v4();
        self.players
            .lock()
            .unwrap()
            .push(ActorSnapshot::new(name, id));
        Actor::Player(id)
    }

    pub fn update_player(&self, actor: &Actor, f: impl FnOnce(&mut ActorSnapshot)) {
        let mut players = self.players.lock().unwrap();
        if let Some(player) = players.iter_mut().find(|p| Some(p.id) == actor.id()) {
            f(player);
        }
    }

    pub fn grant(&self, actor: &Actor, node: &str) {
        self.permissions
            .lock()
            .unwrap()
            .entry(*actor)
            .or_default()
            .insert(node.to_string());
    }

    pub fn add_team(&self, name: &str, members: &[&str]) {
        self.teams.lock().unwrap().push(Team {
            name: name.to_string(),
            members: members.iter().map(|m| m.to_string()).collect(),
        });
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn dispatched(&self) -> Vec<String> {
        self.dispatches().into_iter().map(|(_, line, _)| line).collect()
    }

    pub fn dispatches(&self) -> Vec<(Actor, String, bool)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Dispatch {
                    actor, line, silent, ..
                } => Some((actor, line, silent)),
                _ => None,
            })
            .collect()
    }

    pub fn dispatch_times(&self) -> Vec<(String, Instant)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Dispatch { line, at, .. } => Some((line, at)),
                _ => None,
            })
            .collect()
    }

    pub fn texts_for(&self, actor: &Actor) -> Vec<StyledText> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Text { actor: to, text, .. } if to == *actor => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn messages_for(&self, actor: &Actor) -> Vec<String> {
        self.texts_for(actor).into_iter().map(|t| t.text).collect()
    }
}

impl ServerHost for RecordingHost {
    fn has_permission(&self, actor: &Actor, node: &str) -> bool {
        actor.is_console()
            || self
                .permissions
                .lock()
                .unwrap()
                .get(actor)
                .map(|nodes| nodes.contains(node))
                .unwrap_or(false)
    }

    fn dispatch_command(&self, actor: &Actor, command_line: &str, silent: bool) {
        self.events.lock().unwrap().push(Event::Dispatch {
            actor: *actor,
            line: command_line.to_string(),
            silent,
            at: Instant::now(),
        });
    }

    fn send_text(&self, actor: &Actor, text: StyledText) {
        self.events.lock().unwrap().push(Event::Text {
            actor: *actor,
            text,
            at: Instant::now(),
        });
    }

    fn query_actor(&self, actor: &Actor) -> Option<ActorSnapshot> {
        let id = actor.id()?;
        self.players
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    fn find_online_actor(&self, name: &str) -> Option<Actor> {
        self.players
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| Actor::Player(p.id))
    }

    fn online_actors(&self) -> Vec<ActorSnapshot> {
        self.players.lock().unwrap().clone()
    }

    fn teams(&self) -> Vec<Team> {
        self.teams.lock().unwrap().clone()
    }
}

pub fn services(host: Arc<RecordingHost>) -> HostServices {
    HostServices {
        server: host,
        processes: Arc::new(MockProcessRunner::new()),
        webhooks: Arc::new(MockWebhookClient::new()),
        files: Arc::new(MockFileAccess::new()),
    }
}

pub fn executor(services: HostServices, config: EngineConfig) -> BundleExecutor {
    BundleExecutor::new(services, Arc::new(VariableStore::new()), config)
}

pub fn lines(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}
