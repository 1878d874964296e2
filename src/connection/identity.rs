use std::cell::RefCell;

/// Identity generated by the most recent insert on one connection.
///
/// Lives inside its [`super::Connection`] and is never shared, so one
/// connection's inserts cannot leak into another's value.
#[derive(Debug, Default)]
pub struct LastInsertId {
    value: RefCell<Option<String>>,
}

impl LastInsertId {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self) -> Option<String> {
        self.value.borrow().clone()
    }

    pub(crate) fn set(&self, id: Option<String>) {
        *self.value.borrow_mut() = id;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty_and_keeps_latest() {
        let tracker = LastInsertId::new();
        assert_eq!(tracker.get(), None);
        tracker.set(Some("7".into()));
        tracker.set(Some("8".into()));
        assert_eq!(tracker.get().as_deref(), Some("8"));
    }
}
