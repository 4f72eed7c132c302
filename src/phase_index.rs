//! Dense phase numbering in first-seen order
//!
//! The order in which phase names are first seen becomes the column order of
//! every report written in the same run.

use fnv::FnvHashMap;
use std::rc::Rc;

/// Dense position of a phase in every phase-time vector
pub type PhaseId = usize;

/// Maps phase names to stable dense ids
#[derive(Debug, Default)]
pub struct PhaseIndex {
    ids: FnvHashMap<Rc<str>, PhaseId>,
    names: Vec<Rc<str>>,
}

impl PhaseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `name`, assigning the next free id on first sight
    pub fn index(&mut self, name: Rc<str>) -> PhaseId {
        if let Some(&id) = self.ids.get(&name) {
            return id;
        }
        let id = self.names.len();
        self.ids.insert(Rc::clone(&name), id);
        self.names.push(name);
        id
    }

    /// Name for a previously assigned id
    pub fn name(&self, id: PhaseId) -> Option<&str> {
        self.names.get(id).map(|s| &**s)
    }

    /// The id the next new phase will get (also the number of known phases)
    pub fn next_index(&self) -> usize {
        self.names.len()
    }

    /// Phase names in id order
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.names.iter().map(|s| &**s)
    }
}
