//! Who is calling. Authentication itself happens upstream; the resolver
//! only reads what the upstream layer forwarded.

use axum::http::HeaderMap;

use crate::grid::access::Actor;

/// Header carrying the caller's id
pub const ACTOR_ID_HEADER: &str = "x-actor-id";

/// Header carrying the caller's group ids, comma-separated
pub const ACTOR_GROUPS_HEADER: &str = "x-actor-groups";

/// Maps request headers to the calling actor
pub trait ActorResolver: Send + Sync {
    /// `None` for anonymous requests
    fn resolve(&self, headers: &HeaderMap) -> Option<Actor>;
}

/// Reads `X-Actor-Id` and `X-Actor-Groups`
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderActorResolver;

impl ActorResolver for HeaderActorResolver {
    fn resolve(&self, headers: &HeaderMap) -> Option<Actor> {
        let id = headers
            .get(ACTOR_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|id| !id.is_empty())?;

        // Unparsable group ids are ignored
        let groups = headers
            .get(ACTOR_GROUPS_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(|raw| {
                raw.split(',')
                    .filter_map(|g| g.trim().parse::<i64>().ok())
                    .collect()
            })
            .unwrap_or_default();

        Some(Actor::new(id, groups))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_resolve_actor() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("42"));
        headers.insert(ACTOR_GROUPS_HEADER, HeaderValue::from_static("1, 2,x,3"));

        let actor = HeaderActorResolver.resolve(&headers).unwrap();
        assert_eq!(actor.id, "42");
        assert_eq!(actor.groups, vec![1, 2, 3]);
    }

    #[test]
    fn test_anonymous() {
        assert!(HeaderActorResolver.resolve(&HeaderMap::new()).is_none());

        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("  "));
        assert!(HeaderActorResolver.resolve(&headers).is_none());
    }

    #[test]
    fn test_no_groups() {
        let mut headers = HeaderMap::new();
        headers.insert(ACTOR_ID_HEADER, HeaderValue::from_static("7"));
        assert!(HeaderActorResolver.resolve(&headers).unwrap().groups.is_empty());
    }
}
