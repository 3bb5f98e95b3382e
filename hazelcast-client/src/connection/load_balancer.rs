//! Member selection for invocations that may run on any connection.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::Rng;

use crate::listener::Member;

/// Picks the member that carries an invocation with no routing preference.
///
/// The manager only offers members it currently holds a connection to, so a
/// selection can always be turned into a connection.
pub trait LoadBalancer: Send + Sync {
    /// Selects a member from `members`. Returns `None` if the slice is empty.
    fn select<'a>(&self, members: &'a [Member]) -> Option<&'a Member>;
}

impl std::fmt::Debug for dyn LoadBalancer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("LoadBalancer")
    }
}

/// Cycles through members in order.
#[derive(Debug, Default)]
pub struct RoundRobinLoadBalancer {
    index: AtomicUsize,
}

impl RoundRobinLoadBalancer {
    /// Creates a new round-robin load balancer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for RoundRobinLoadBalancer {
    fn select<'a>(&self, members: &'a [Member]) -> Option<&'a Member> {
        if members.is_empty() {
            return None;
        }
        let idx = self.index.fetch_add(1, Ordering::Relaxed) % members.len();
        members.get(idx)
    }
}

/// Picks a uniformly random member.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomLoadBalancer;

impl RandomLoadBalancer {
    /// Creates a new random load balancer.
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for RandomLoadBalancer {
    fn select<'a>(&self, members: &'a [Member]) -> Option<&'a Member> {
        if members.is_empty() {
            return None;
        }
        members.get(rand::thread_rng().gen_range(0..members.len()))
    }
}

/// Creates the default load balancer (round-robin).
pub fn default_load_balancer() -> Arc<dyn LoadBalancer> {
    Arc::new(RoundRobinLoadBalancer::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hazelcast_core::protocol::codecs::custom::Address;
    use uuid::Uuid;

    fn create_test_members(count: usize) -> Vec<Member> {
        (0..count)
            .map(|i| Member::new(Uuid::new_v4(), Address::new("127.0.0.1", 5701 + i as u16)))
            .collect()
    }

    #[test]
    fn test_round_robin_empty_members() {
        let lb = RoundRobinLoadBalancer::new();
        assert!(lb.select(&[]).is_none());
    }

    #[test]
    fn test_round_robin_cycles_through_members() {
        let lb = RoundRobinLoadBalancer::new();
        let members = create_test_members(3);

        for round in 0..3 {
            for (i, member) in members.iter().enumerate() {
                let selected = lb.select(&members).unwrap();
                assert_eq!(
                    selected.uuid(),
                    member.uuid(),
                    "round {}, index {}",
                    round,
                    i
                );
            }
        }
    }

    #[test]
    fn test_random_selects_from_members() {
        let lb = RandomLoadBalancer::new();
        let members = create_test_members(5);
        assert!(lb.select(&[]).is_none());

        for _ in 0..20 {
            let selected = lb.select(&members).unwrap();
            assert!(members.iter().any(|m| m.uuid() == selected.uuid()));
        }
    }

    #[test]
    fn test_default_load_balancer() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RoundRobinLoadBalancer>();
        assert_send_sync::<RandomLoadBalancer>();

        let lb = default_load_balancer();
        let members = create_test_members(2);
        assert!(lb.select(&members).is_some());
    }
}
