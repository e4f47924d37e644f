use std::borrow::Borrow;
use std::collections::HashSet;
use std::hash::Hash;

use tracing::trace;

/// Row keys currently selected.
///
/// Selection is keyed by row identity, so it survives filtering, sorting and
/// paging. Only `toggle`, `toggle_all_on_page`, `remove` and `clear` change it.
#[derive(Debug, Clone)]
pub struct Selection<K: Eq + Hash> {
    keys: HashSet<K>,
}

impl<K: Eq + Hash> Default for Selection<K> {
    fn default() -> Self {
        Selection { keys: HashSet::new() }
    }
}

impl<K: Eq + Hash + Clone> Selection<K> {
    /// Flips one key and returns whether it is now selected.
    pub fn toggle(&mut self, key: K) -> bool {
        if self.keys.remove(&key) {
            false
        } else {
            self.keys.insert(key);
            true
        }
    }

    /// Selects every key of the page, or deselects them all when the whole
    /// page is already selected. Keys of other pages are untouched.
    pub fn toggle_all_on_page(&mut self, page_keys: &[K]) {
        if page_keys.is_empty() {
            return;
        }
        if self.all_selected(page_keys) {
            for key in page_keys {
                self.keys.remove(key);
            }
        } else {
            self.keys.extend(page_keys.iter().cloned());
        }
        trace!("Selection after page toggle: {} keys", self.keys.len());
    }

    pub fn all_selected(&self, keys: &[K]) -> bool {
        !keys.is_empty() && keys.iter().all(|k| self.keys.contains(k))
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    /// Forgets one key, e.g. after its row was deleted.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.keys.remove(key)
    }

    pub fn is_selected(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    pub fn selected_keys(&self) -> &HashSet<K> {
        &self.keys
    }

    /// Number of selected keys, including keys whose rows are gone.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The selected rows, in source order. Keys without a row are skipped.
    pub fn selected_rows<'a, T, F>(&self, rows: &'a [T], key_fn: F) -> Vec<&'a T>
    where
        F: Fn(&T) -> K,
    {
        rows.iter().filter(|r| self.keys.contains(&key_fn(r))).collect()
    }

    /// Sum of `value_fn` over the selected rows, recomputed from `rows` on
    /// every call.
    pub fn selected_sum<T, F, V>(&self, rows: &[T], key_fn: F, value_fn: V) -> f64
    where
        F: Fn(&T) -> K,
        V: Fn(&T) -> f64,
    {
        self.selected_rows(rows, key_fn).into_iter().map(value_fn).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ks: &[&str]) -> Vec<String> {
        ks.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn toggle_flips_state() {
        let mut sel = Selection::default();
        assert!(sel.toggle("PAY-001".to_string()));
        assert!(sel.is_selected(&"PAY-001".to_string()));
        assert!(!sel.toggle("PAY-001".to_string()));
        assert!(sel.is_empty());
    }

    #[test]
    fn page_toggle_selects_then_deselects_only_that_page() {
        let mut sel = Selection::default();
        sel.toggle("x".to_string());
        let page = keys(&["a", "b", "c"]);

        sel.toggle("a".to_string());
        sel.toggle_all_on_page(&page);
        assert_eq!(sel.len(), 4);

        sel.toggle_all_on_page(&page);
        assert_eq!(sel.len(), 1);
        assert!(sel.is_selected(&"x".to_string()));
    }

    #[test]
    fn empty_page_is_a_no_op() {
        let mut sel: Selection<String> = Selection::default();
        sel.toggle_all_on_page(&[]);
        assert!(sel.is_empty());
    }

    #[test]
    fn stale_keys_are_ignored_in_aggregates() {
        let rows = vec![("a", 10.0), ("b", 20.0), ("c", 30.0)];
        let mut sel = Selection::default();
        sel.toggle("a");
        sel.toggle("c");
        sel.toggle("gone");
        assert_eq!(sel.len(), 3);
        assert_eq!(sel.selected_rows(&rows, |r| r.0).len(), 2);
        assert_eq!(sel.selected_sum(&rows, |r| r.0, |r| r.1), 40.0);
    }

    #[test]
    fn selected_keys_and_remove() {
        let mut sel = Selection::default();
        sel.toggle_all_on_page(&keys(&["a", "b", "c"]));
        assert!(sel.remove("b"));
        assert!(!sel.remove("b"));
        let mut ks: Vec<&String> = sel.selected_keys().iter().collect();
        ks.sort();
        assert_eq!(ks, vec!["a", "c"]);
    }

    #[test]
    fn clear_unselects_everything() {
        let mut sel = Selection::default();
        sel.toggle_all_on_page(&keys(&["a", "b"]));
        sel.clear();
        assert!(!sel.is_selected(&"a".to_string()));
        assert!(sel.is_empty());
    }
}
