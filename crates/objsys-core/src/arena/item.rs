use std::ops::{Deref, DerefMut};

/// One slot in an [`Arena`](super::data::Arena). Soft-deleted items keep their
/// storage (and their index) so outstanding ids stay well-formed, and are only
/// reclaimed by an explicit [`gc`](super::data::Arena::gc) pass.
#[derive(Debug, Clone)]
pub struct Item<T> {
    deleted: bool,
    data: T,
}

#[bon::bon]
impl<T> Item<T> {
    #[builder]
    pub fn new(data: T, deleted: Option<bool>) -> Self {
        Self {
            data,
            deleted: deleted.unwrap_or(false),
        }
    }
}

impl<T> Item<T> {
    pub fn deleted(&self) -> bool {
        self.deleted
    }

    pub(crate) fn mark_deleted(&mut self) {
        self.deleted = true;
    }

    pub fn unwrap(self) -> T {
        self.data
    }
}

impl<T> Deref for Item<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for Item<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}
