//! String interning for repeated log tokens
//!
//! Build logs repeat the same paths, package names and function names
//! thousands of times. Each distinct string is stored once and handed out
//! as a shared `Rc<str>`.

use fnv::FnvHashSet;
use std::rc::Rc;

/// Deduplicates strings to one canonical allocation each
#[derive(Debug, Default)]
pub struct Interner {
    strings: FnvHashSet<Rc<str>>,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical handle for `s`, storing it on first sight
    pub fn intern(&mut self, s: &str) -> Rc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Rc::clone(existing);
        }
        let handle: Rc<str> = Rc::from(s);
        self.strings.insert(Rc::clone(&handle));
        handle
    }

    /// Number of distinct strings stored
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}
