//! Remote ICE candidates of a transport.

use std::net::SocketAddr;

use log::info;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RemoteCandidate {
    pub addr: SocketAddr,
    pub priority: u32,
}

/// Append-only candidate list with one active candidate that all outgoing
/// traffic is sent to.
#[derive(Debug, Default, Clone)]
pub struct CandidateSet {
    candidates: Vec<RemoteCandidate>,
    active: Option<usize>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a candidate, activating it if none is active yet or if ICE
    /// nominated it. A known address is not added twice but may still be
    /// activated. Returns whether the active candidate changed.
    pub fn add(&mut self, addr: SocketAddr, priority: u32, use_candidate: bool) -> bool {
        let index = match self.candidates.iter().position(|c| c.addr == addr) {
            Some(index) => index,
            None => {
                self.candidates.push(RemoteCandidate { addr, priority });
                self.candidates.len() - 1
            }
        };

        if (self.active.is_none() || use_candidate) && self.active != Some(index) {
            info!("remote candidate {addr} is active");
            self.active = Some(index);
            return true;
        }
        false
    }

    pub fn active(&self) -> Option<&RemoteCandidate> {
        self.active.and_then(|i| self.candidates.get(i))
    }

    pub fn contains(&self, addr: &SocketAddr) -> bool {
        self.candidates.iter().any(|c| c.addr == *addr)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RemoteCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.active = None;
    }
}
