//! Server-wide tokens: online players and scoreboard teams.

use crate::actor::Team;
use crate::host::ServerHost;

use super::scan::replace_delimited;

const TEAM_PLAYERS: &str = "%teamplayers:";
const TEAM_PLAYERS_UUID: &str = "%teamplayers_uuid:";

/// `inner_lookup` resolves the bare token in `%teamplayers:%name%%`.
pub fn replace_server_constants<F>(text: &str, host: &dyn ServerHost, inner_lookup: F) -> String
where
    F: Fn(&str) -> String,
{
    let mut text = text.to_string();

    if text.contains("%players%") || text.contains("%players_uuid%") || text.contains("%playercount%") {
        let online = host.online_actors();
        let names: Vec<&str> = online.iter().map(|a| a.name.as_str()).collect();
        let ids: Vec<String> = online.iter().map(|a| a.id.to_string()).collect();
        text = text
            .replace("%players%", &names.join(","))
            .replace("%players_uuid%", &ids.join(","))
            .replace("%playercount%", &online.len().to_string());
    }

    if !text.contains("%teams%") && !text.contains(TEAM_PLAYERS) && !text.contains(TEAM_PLAYERS_UUID) {
        return text;
    }
    let teams = host.teams();
    if text.contains("%teams%") {
        let names: Vec<&str> = teams.iter().map(|t| t.name.as_str()).collect();
        text = text.replace("%teams%", &names.join(","));
    }

    for (prefix, uuids) in [(TEAM_PLAYERS, false), (TEAM_PLAYERS_UUID, true)] {
        text = replace_nested_team_tokens(&text, prefix, |name| {
            team_members(host, &teams, &inner_lookup(name), uuids)
        });
        text = replace_delimited(&text, prefix, "%", |name| {
            Some(team_members(host, &teams, name, uuids))
        });
    }
    text
}

/// `prefix%inner%%`, with the inner token handed to `members`.
fn replace_nested_team_tokens<F>(text: &str, prefix: &str, members: F) -> String
where
    F: Fn(&str) -> String,
{
    let open = format!("{}%", prefix);
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find(&open) {
        let inner_start = start + open.len();
        let closing = rest[inner_start..]
            .find('%')
            .map(|len| inner_start + len)
            .filter(|end| rest[end + 1..].starts_with('%'));
        let Some(inner_end) = closing else {
            out.push_str(&rest[..inner_start]);
            rest = &rest[inner_start..];
            continue;
        };
        out.push_str(&rest[..start]);
        out.push_str(&members(&rest[inner_start..inner_end]));
        rest = &rest[inner_end + 2..];
    }
    out.push_str(rest);
    out
}

/// Comma-joined member entries; with `uuids`, online members render as their id.
fn team_members(host: &dyn ServerHost, teams: &[Team], name: &str, uuids: bool) -> String {
    let Some(team) = teams.iter().find(|t| t.name == name) else {
        return String::new();
    };
    team.members
        .iter()
        .map(|entry| {
            if !uuids {
                return entry.clone();
            }
            host.find_online_actor(entry)
                .and_then(|actor| actor.id())
                .map(|id| id.to_string())
                .unwrap_or_else(|| entry.clone())
        })
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, ActorSnapshot};
    use crate::host::MockServerHost;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn host(alice: Uuid) -> MockServerHost {
        let mut host = MockServerHost::new();
        host.expect_online_actors().returning(move || {
            vec![
                ActorSnapshot::new("Alice", alice),
                ActorSnapshot::new("Bob", Uuid::nil()),
            ]
        });
        host.expect_teams().returning(|| {
            vec![
                Team {
                    name: "red".to_string(),
                    members: vec!["Alice".to_string(), "Carol".to_string()],
                },
                Team {
                    name: "blue".to_string(),
                    members: vec![],
                },
            ]
        });
        host.expect_find_online_actor().returning(move |name| {
            (name == "Alice").then_some(Actor::Player(alice))
        });
        host
    }

    fn no_inner(_: &str) -> String {
        String::new()
    }

    #[test]
    fn test_online_players() {
        let alice = Uuid::new_v4();
        let out = replace_server_constants("%players% (%playercount%) %players_uuid%", &host(alice), no_inner);
        assert_eq!(out, format!("Alice,Bob (2) {},{}", alice, Uuid::nil()));
    }

    #[test]
    fn test_teams() {
        let alice = Uuid::new_v4();
        let host = host(alice);
        assert_eq!(replace_server_constants("%teams%", &host, no_inner), "red,blue");
        assert_eq!(
            replace_server_constants("%teamplayers:red%|%teamplayers:blue%|%teamplayers:gold%", &host, no_inner),
            "Alice,Carol||"
        );
        assert_eq!(
            replace_server_constants("%teamplayers_uuid:red%", &host, no_inner),
            format!("{},Carol", alice)
        );
    }

    #[test]
    fn test_nested_team_name() {
        let alice = Uuid::new_v4();
        let host = host(alice);
        let lookup = |name: &str| if name == "myteam" { "red".to_string() } else { name.to_string() };
        assert_eq!(
            replace_server_constants("[%teamplayers:%myteam%%]", &host, lookup),
            "[Alice,Carol]"
        );
        assert_eq!(
            replace_server_constants("%teamplayers_uuid:%red%%", &host, lookup),
            format!("{},Carol", alice)
        );
    }
}
