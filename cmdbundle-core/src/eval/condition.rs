//! `[if:type:value[:param]]` predicates.

use tracing::debug;

use super::json_path::extract_json_value;
use crate::actor::{Actor, ActorSnapshot};
use crate::host::ServerHost;
use crate::store::VariableStore;

const NUMERIC_EPSILON: f64 = 0.01;
pub const CONSOLE_NAME: &str = "CONSOLE";

/// Evaluates one condition for `actor`. Empty conditions hold; malformed or
/// unknown ones do not.
pub fn evaluate_condition(
    host: &dyn ServerHost,
    actor: &Actor,
    condition: &str,
    store: &VariableStore,
) -> bool {
    if condition.is_empty() {
        return true;
    }

    let snapshot = host.query_actor(actor);
    let condition = substitute_actor_tokens(condition, actor, snapshot.as_ref());

    let parts: Vec<&str> = condition.splitn(3, ':').collect();
    if parts.len() < 2 {
        return false;
    }
    let kind = parts[0].to_lowercase();
    let value = parts[1];
    let param = parts.get(2).copied();

    let result = match kind.as_str() {
        "permission" | "perm" => host.has_permission(actor, value),
        "op" => {
            let is_op = match actor {
                Actor::Console => true,
                Actor::Player(_) => snapshot.as_ref().map(|s| s.is_op).unwrap_or(false),
            };
            is_op == parse_bool(value)
        }
        "var" => evaluate_variable(actor, value, param, store),
        _ => match snapshot.as_ref() {
            Some(snapshot) => evaluate_actor_query(snapshot, &kind, value, param),
            None => false,
        },
    };
    debug!(condition = %condition, result, "condition evaluated");
    result
}

fn substitute_actor_tokens(condition: &str, actor: &Actor, snapshot: Option<&ActorSnapshot>) -> String {
    let (name, id) = match (actor, snapshot) {
        (Actor::Console, _) => (CONSOLE_NAME.to_string(), String::new()),
        (Actor::Player(id), Some(s)) => (s.name.clone(), id.to_string()),
        (Actor::Player(id), None) => (String::new(), id.to_string()),
    };
    condition
        .replace("%player_uuid%", &id)
        .replace("%uuid%", &id)
        .replace("%player%", &name)
}

fn evaluate_actor_query(snapshot: &ActorSnapshot, kind: &str, value: &str, param: Option<&str>) -> bool {
    match kind {
        "item" => {
            let required = param
                .and_then(|p| p.trim().parse::<u32>().ok())
                .unwrap_or(1);
            snapshot.item_count(value) >= required
        }
        "world" => snapshot.world.eq_ignore_ascii_case(value),
        "gamemode" | "gm" => snapshot.gamemode.eq_ignore_ascii_case(value),
        "health" => compare_numeric(snapshot.health, value),
        "level" | "xp" => compare_numeric(snapshot.level as f64, value),
        "flying" => snapshot.is_flying == parse_bool(value),
        "sneaking" => snapshot.is_sneaking == parse_bool(value),
        "player" => snapshot.name.eq_ignore_ascii_case(value),
        _ => false,
    }
}

/// `var:name[.json.path]:expected`; `!=` alone (or no expectation) means non-empty.
fn evaluate_variable(actor: &Actor, reference: &str, expected: Option<&str>, store: &VariableStore) -> bool {
    let actual = match reference.split_once('.') {
        Some((name, path)) => extract_json_value(&store.resolve(actor, name), path),
        None => store.resolve(actor, reference),
    };
    match expected {
        None | Some("!=") => !actual.is_empty(),
        Some(expected) => match expected.strip_prefix("!=") {
            Some(other) => actual != other,
            None => actual == expected,
        },
    }
}

fn parse_bool(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("true")
}

fn parse_number(value: &str) -> f64 {
    value.trim().parse().unwrap_or(0.0)
}

/// `>=`, `<=`, `>`, `<`, `==`, `=` or a bare number (approximate equality).
pub fn compare_numeric(actual: f64, condition: &str) -> bool {
    let condition = condition.trim();
    if let Some(rest) = condition.strip_prefix(">=") {
        actual >= parse_number(rest)
    } else if let Some(rest) = condition.strip_prefix("<=") {
        actual <= parse_number(rest)
    } else if let Some(rest) = condition.strip_prefix('>') {
        actual > parse_number(rest)
    } else if let Some(rest) = condition.strip_prefix('<') {
        actual < parse_number(rest)
    } else {
        let rest = condition
            .strip_prefix("==")
            .or_else(|| condition.strip_prefix('='))
            .unwrap_or(condition);
        (actual - parse_number(rest)).abs() < NUMERIC_EPSILON
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MockServerHost;
    use uuid::Uuid;

    fn host_with(snapshot: ActorSnapshot) -> MockServerHost {
        let mut host = MockServerHost::new();
        host.expect_query_actor()
            .returning(move |_| Some(snapshot.clone()));
        host
    }

    fn alice() -> (Actor, ActorSnapshot) {
        let id = Uuid::new_v4();
        (Actor::Player(id), ActorSnapshot::new("Alice", id))
    }

    #[test]
    fn test_empty_condition_holds() {
        let host = MockServerHost::new();
        assert!(evaluate_condition(&host, &Actor::Console, "", &VariableStore::new()));
    }

    #[test]
    fn test_malformed_and_unknown_fail() {
        let (actor, snapshot) = alice();
        let host = host_with(snapshot);
        let store = VariableStore::new();
        assert!(!evaluate_condition(&host, &actor, "health", &store));
        assert!(!evaluate_condition(&host, &actor, "weather:rain", &store));
    }

    #[test]
    fn test_health_boundary() {
        let (actor, mut snapshot) = alice();
        let store = VariableStore::new();

        snapshot.health = 10.0;
        let host = host_with(snapshot.clone());
        assert!(evaluate_condition(&host, &actor, "health:>=10", &store));

        snapshot.health = 9.99;
        let host = host_with(snapshot);
        assert!(!evaluate_condition(&host, &actor, "health:>=10", &store));
    }

    #[test]
    fn test_numeric_operators() {
        assert!(compare_numeric(5.0, ">4"));
        assert!(!compare_numeric(5.0, "<5"));
        assert!(compare_numeric(5.0, "<=5"));
        assert!(compare_numeric(5.005, "==5"));
        assert!(compare_numeric(5.0, "=5"));
        assert!(compare_numeric(5.0, "5"));
        assert!(!compare_numeric(5.02, "5"));
        assert!(compare_numeric(0.0, "=abc"));
    }

    #[test]
    fn test_permission() {
        let (actor, snapshot) = alice();
        let mut host = host_with(snapshot);
        host.expect_has_permission()
            .withf(|_, node| node == "admin")
            .return_const(false);
        host.expect_has_permission().return_const(true);
        let store = VariableStore::new();
        assert!(!evaluate_condition(&host, &actor, "permission:admin", &store));
        assert!(evaluate_condition(&host, &actor, "perm:build", &store));
    }

    #[test]
    fn test_actor_properties() {
        let (actor, mut snapshot) = alice();
        snapshot.world = "world_nether".to_string();
        snapshot.gamemode = "CREATIVE".to_string();
        snapshot.level = 30;
        snapshot.is_flying = true;
        snapshot.inventory.insert("diamond".to_string(), 3);
        let host = host_with(snapshot);
        let store = VariableStore::new();

        assert!(evaluate_condition(&host, &actor, "world:WORLD_NETHER", &store));
        assert!(evaluate_condition(&host, &actor, "gm:creative", &store));
        assert!(evaluate_condition(&host, &actor, "xp:>=30", &store));
        assert!(evaluate_condition(&host, &actor, "flying:true", &store));
        assert!(evaluate_condition(&host, &actor, "sneaking:false", &store));
        assert!(evaluate_condition(&host, &actor, "item:diamond", &store));
        assert!(evaluate_condition(&host, &actor, "item:DIAMOND:3", &store));
        assert!(!evaluate_condition(&host, &actor, "item:diamond:4", &store));
        assert!(evaluate_condition(&host, &actor, "player:alice", &store));
        assert!(evaluate_condition(&host, &actor, "player:%player%", &store));
        assert!(!evaluate_condition(&host, &actor, "op:true", &store));
    }

    #[test]
    fn test_console_queries() {
        let mut host = MockServerHost::new();
        host.expect_query_actor().return_const(None);
        let store = VariableStore::new();
        assert!(evaluate_condition(&host, &Actor::Console, "op:true", &store));
        assert!(!evaluate_condition(&host, &Actor::Console, "health:>0", &store));
        assert!(!evaluate_condition(&host, &Actor::Console, "player:CONSOLE", &store));
    }

    #[test]
    fn test_variables() {
        let (actor, snapshot) = alice();
        let host = host_with(snapshot);
        let store = VariableStore::new();
        let id = actor.id().unwrap();
        store.set_actor(id, "coins", "10");
        store.set_global("mode", "pvp");
        store.set_actor(id, "profile", r#"{"rank": "gold", "stats": {"wins": 4}}"#);

        assert!(evaluate_condition(&host, &actor, "var:coins:10", &store));
        assert!(!evaluate_condition(&host, &actor, "var:coins:11", &store));
        assert!(evaluate_condition(&host, &actor, "var:coins:!=", &store));
        assert!(evaluate_condition(&host, &actor, "var:coins", &store));
        assert!(evaluate_condition(&host, &actor, "var:coins:!=5", &store));
        assert!(!evaluate_condition(&host, &actor, "var:missing:!=", &store));
        assert!(evaluate_condition(&host, &actor, "var:mode:pvp", &store));
        assert!(evaluate_condition(&host, &actor, "var:profile.rank:gold", &store));
        assert!(evaluate_condition(&host, &actor, "var:profile.stats.wins:4", &store));
        assert!(!evaluate_condition(&host, &actor, "var:profile.stats.losses:!=", &store));
    }
}
