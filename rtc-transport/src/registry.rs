//! SSRC to group lookup for one direction of a transport.

use std::collections::HashMap;

use log::info;
use shared::error::{Error, Result};

use crate::group::{GroupId, IncomingSourceGroup, OutgoingSourceGroup, SourceGroup};

#[derive(Debug)]
pub struct Registry<G> {
    groups: HashMap<GroupId, G>,
    lookup: HashMap<u32, GroupId>,
    next_id: u64,
}

impl<G> Default for Registry<G> {
    fn default() -> Self {
        Registry {
            groups: HashMap::new(),
            lookup: HashMap::new(),
            next_id: 1,
        }
    }
}

pub type IncomingRegistry = Registry<IncomingSourceGroup>;
pub type OutgoingRegistry = Registry<OutgoingSourceGroup>;

impl IncomingRegistry {
    /// Registers the media SSRC and any non-zero RTX and FEC SSRCs.
    pub fn add(&mut self, group: IncomingSourceGroup) -> Result<GroupId> {
        if group.media.ssrc == 0 {
            return Err(Error::MissingMediaSsrc);
        }
        let ssrcs: Vec<u32> = group
            .ssrcs()
            .into_iter()
            .enumerate()
            .filter(|(i, ssrc)| *i == 0 || *ssrc != 0)
            .map(|(_, ssrc)| ssrc)
            .collect();
        self.insert(group, &ssrcs)
    }
}

impl OutgoingRegistry {
    /// Registers all three SSRCs, zero included.
    pub fn add(&mut self, group: OutgoingSourceGroup) -> Result<GroupId> {
        let ssrcs = group.ssrcs();
        self.insert(group, &ssrcs)
    }
}

impl<G: SourceGroup> Registry<G> {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, group: G, ssrcs: &[u32]) -> Result<GroupId> {
        for (i, ssrc) in ssrcs.iter().enumerate() {
            if *ssrc == 0 {
                continue;
            }
            if ssrcs[..i].contains(ssrc) {
                return Err(Error::DuplicateSsrc(*ssrc));
            }
            if self.lookup.contains_key(ssrc) {
                return Err(Error::SsrcAlreadyRegistered(*ssrc));
            }
        }

        let id = GroupId(self.next_id);
        self.next_id += 1;
        for ssrc in ssrcs {
            self.lookup.insert(*ssrc, id);
        }
        info!(
            "registered {} {} with ssrcs {:?}",
            group.media_type(),
            id,
            group.ssrcs()
        );
        self.groups.insert(id, group);
        Ok(id)
    }

    /// Unregisters every SSRC of the group and hands the group back.
    pub fn remove(&mut self, id: GroupId) -> Option<G> {
        let group = self.groups.remove(&id)?;
        for ssrc in group.ssrcs() {
            if self.lookup.get(&ssrc) == Some(&id) {
                self.lookup.remove(&ssrc);
            }
        }
        info!("unregistered {id}");
        Some(group)
    }

    pub fn lookup(&self, ssrc: u32) -> Option<GroupId> {
        self.lookup.get(&ssrc).copied()
    }

    pub fn get(&self, id: GroupId) -> Option<&G> {
        self.groups.get(&id)
    }

    pub fn get_mut(&mut self, id: GroupId) -> Option<&mut G> {
        self.groups.get_mut(&id)
    }

    pub fn find(&self, ssrc: u32) -> Option<(GroupId, &G)> {
        let id = self.lookup(ssrc)?;
        self.groups.get(&id).map(|g| (id, g))
    }

    pub fn find_mut(&mut self, ssrc: u32) -> Option<(GroupId, &mut G)> {
        let id = self.lookup(ssrc)?;
        self.groups.get_mut(&id).map(|g| (id, g))
    }

    pub fn iter(&self) -> impl Iterator<Item = (GroupId, &G)> {
        self.groups.iter().map(|(id, g)| (*id, g))
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
