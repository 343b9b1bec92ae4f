//! Pending mode changes

use super::ModeHandler;
use std::sync::Arc;

/// A single add or remove of one mode
#[derive(Debug, Clone)]
pub struct Change {
    pub handler: Arc<ModeHandler>,
    pub adding: bool,
    pub param: String,
}

impl Change {
    pub fn new(handler: Arc<ModeHandler>, adding: bool, param: impl Into<String>) -> Self {
        Self {
            handler,
            adding,
            param: param.into(),
        }
    }
}

/// An ordered batch of mode changes.
///
/// Changes are kept in insertion order with no deduplication; that order is
/// the order they are processed and announced in.
#[derive(Debug, Clone, Default)]
pub struct ChangeList {
    items: Vec<Change>,
}

impl ChangeList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, handler: &Arc<ModeHandler>, adding: bool, param: impl Into<String>) {
        self.items.push(Change::new(Arc::clone(handler), adding, param));
    }

    pub fn push_add(&mut self, handler: &Arc<ModeHandler>) {
        self.push(handler, true, String::new());
    }

    pub fn push_add_param(&mut self, handler: &Arc<ModeHandler>, param: impl Into<String>) {
        self.push(handler, true, param);
    }

    pub fn push_remove(&mut self, handler: &Arc<ModeHandler>) {
        self.push(handler, false, String::new());
    }

    pub fn push_remove_param(&mut self, handler: &Arc<ModeHandler>, param: impl Into<String>) {
        self.push(handler, false, param);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Change> {
        self.items.iter()
    }

    pub fn items(&self) -> &[Change] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut [Change] {
        &mut self.items
    }

    /// Render as MODE parameters: one letter string, then each non-empty parameter
    pub fn to_params(&self) -> Vec<String> {
        let mut letters = String::new();
        let mut params = Vec::new();
        let mut direction = None;

        for change in &self.items {
            if direction != Some(change.adding) {
                letters.push(if change.adding { '+' } else { '-' });
                direction = Some(change.adding);
            }
            letters.push(change.handler.letter());
            if !change.param.is_empty() {
                params.push(change.param.clone());
            }
        }

        let mut out = Vec::with_capacity(params.len() + 1);
        out.push(letters);
        out.extend(params);
        out
    }
}

impl<'a> IntoIterator for &'a ChangeList {
    type Item = &'a Change;
    type IntoIter = std::slice::Iter<'a, Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl Extend<Change> for ChangeList {
    fn extend<T: IntoIterator<Item = Change>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mode::ModeType;

    #[test]
    fn test_to_params_groups_directions() {
        let moderated = Arc::new(ModeHandler::simple("test", "moderated", 'm', ModeType::Channel));
        let op = Arc::new(ModeHandler::prefix("test", "op", 'o', 30000, '@'));

        let mut list = ChangeList::new();
        list.push_add(&moderated);
        list.push_add_param(&op, "alice");
        list.push_remove(&moderated);
        list.push_remove_param(&op, "bob");

        assert_eq!(list.len(), 4);
        assert_eq!(list.to_params(), vec!["+mo-mo", "alice", "bob"]);
    }

    #[test]
    fn test_insertion_order_kept() {
        let moderated = Arc::new(ModeHandler::simple("test", "moderated", 'm', ModeType::Channel));
        let mut list = ChangeList::new();
        list.push_remove(&moderated);
        list.push_add(&moderated);
        list.push_add(&moderated);

        let directions: Vec<bool> = list.iter().map(|c| c.adding).collect();
        assert_eq!(directions, vec![false, true, true]);
    }
}
