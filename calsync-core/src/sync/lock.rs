use dashmap::DashSet;

use crate::credential::Provider;

/// One running invocation per (user, provider).
#[derive(Debug, Default)]
pub struct SyncLocks {
    held: DashSet<(String, Provider)>,
}

impl SyncLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` if an invocation for this pair is already running.
    pub fn try_acquire(&self, user: &str, provider: Provider) -> Option<SyncGuard<'_>> {
        let key = (user.to_string(), provider);
        if self.held.insert(key.clone()) {
            Some(SyncGuard { locks: self, key })
        } else {
            None
        }
    }

    #[cfg(test)]
    fn is_held(&self, user: &str, provider: Provider) -> bool {
        self.held.contains(&(user.to_string(), provider))
    }
}

/// Releases the pair when dropped, including on early return or panic.
#[derive(Debug)]
pub struct SyncGuard<'a> {
    locks: &'a SyncLocks,
    key: (String, Provider),
}

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.locks.held.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused_until_release() {
        let locks = SyncLocks::new();

        let guard = locks.try_acquire("alice", Provider::Google);
        assert!(guard.is_some());
        assert!(locks.try_acquire("alice", Provider::Google).is_none());

        // Other pairs are independent
        assert!(locks.try_acquire("alice", Provider::Ical).is_some());
        assert!(locks.try_acquire("bob", Provider::Google).is_some());

        drop(guard);
        assert!(!locks.is_held("alice", Provider::Google));
        assert!(locks.try_acquire("alice", Provider::Google).is_some());
    }
}
