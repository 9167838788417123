use crate::{completer::Completer, config::Config};
use core::iter::FusedIterator;

/// Iterator over a node and its completers, ending at the root.
#[must_use]
#[derive(Debug)]
pub struct Ancestors<'a, C: Config> {
    next: Option<&'a Completer<C>>,
}

impl<'a, C: Config> Iterator for Ancestors<'a, C> {
    type Item = &'a Completer<C>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.next?;
        self.next = node.completer().map(|completer| &**completer);
        Some(node)
    }
}

impl<C: Config> FusedIterator for Ancestors<'_, C> {}

impl<C: Config> Completer<C> {
    /// This node followed by every completer up to and including the root.
    pub fn ancestors(&self) -> Ancestors<'_, C> {
        Ancestors { next: Some(self) }
    }

    /// The node of this tree that has no completer.
    #[must_use]
    pub fn root(&self) -> &Self {
        self.ancestors()
            .last()
            .expect("Completer::root: [1]")
    }

    #[must_use]
    pub fn is_root(&self) -> bool {
        self.completer().is_none()
    }

    /// Number of completer links between this node and the root.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }
}
