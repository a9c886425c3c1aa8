use serde::{Deserialize, Serialize};

/// One arena slot. Top-level entries hang off the root sentinel at index 0;
/// sub-entries hang off their parent through `first_child`/`next_sibling`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct VarEntry {
    name_hash: u32,
    value: u32,
    first_child: Option<usize>,
    next_sibling: Option<usize>,
}

const ROOT_INDEX: usize = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSubVar {
    pub sub_name_hash: u32,
    pub value: u32,
}

/// Persistence tuple: `(nameHash, value, childCount, [subNameHash, value]*)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedVar {
    pub name_hash: u32,
    pub value: u32,
    #[serde(default)]
    pub sub_vars: Vec<SavedSubVar>,
}

/// Hashed global and sub-variable store holding game progress.
///
/// Reads of absent keys return 0 and never create entries.
#[derive(Debug, Clone)]
pub struct VariableStore {
    entries: Vec<VarEntry>,
}

impl Default for VariableStore {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableStore {
    pub fn new() -> Self {
        Self {
            entries: vec![VarEntry {
                name_hash: 0,
                value: 0,
                first_child: None,
                next_sibling: None,
            }],
        }
    }

    /// Number of top-level variables.
    pub fn len(&self) -> usize {
        self.chain(ROOT_INDEX).count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries[ROOT_INDEX].first_child.is_none()
    }

    pub fn global_var(&self, name_hash: u32) -> u32 {
        self.find_in_chain(ROOT_INDEX, name_hash)
            .map(|index| self.entries[index].value)
            .unwrap_or(0)
    }

    pub fn set_global_var(&mut self, name_hash: u32, value: u32) {
        match self.find_in_chain(ROOT_INDEX, name_hash) {
            Some(index) => self.entries[index].value = value,
            None => {
                self.push_front(ROOT_INDEX, name_hash, value);
            }
        }
    }

    pub fn sub_var(&self, name_hash: u32, sub_name_hash: u32) -> u32 {
        self.find_in_chain(ROOT_INDEX, name_hash)
            .and_then(|parent| self.find_in_chain(parent, sub_name_hash))
            .map(|index| self.entries[index].value)
            .unwrap_or(0)
    }

    pub fn set_sub_var(&mut self, name_hash: u32, sub_name_hash: u32, value: u32) {
        let parent = match self.find_in_chain(ROOT_INDEX, name_hash) {
            Some(index) => index,
            None => self.push_front(ROOT_INDEX, name_hash, 0),
        };
        match self.find_in_chain(parent, sub_name_hash) {
            Some(index) => self.entries[index].value = value,
            None => {
                self.push_front(parent, sub_name_hash, value);
            }
        }
    }

    /// Snapshot in chain order, suitable for save games.
    pub fn to_saved(&self) -> Vec<SavedVar> {
        self.chain(ROOT_INDEX)
            .map(|index| {
                let entry = self.entries[index];
                SavedVar {
                    name_hash: entry.name_hash,
                    value: entry.value,
                    sub_vars: self
                        .chain(index)
                        .map(|sub_index| {
                            let sub = self.entries[sub_index];
                            SavedSubVar {
                                sub_name_hash: sub.name_hash,
                                value: sub.value,
                            }
                        })
                        .collect(),
                }
            })
            .collect()
    }

    /// Rebuilds a store so that `to_saved` reproduces `saved` exactly.
    pub fn from_saved(saved: &[SavedVar]) -> Self {
        let mut store = Self::new();
        // Head insertion reverses order, so replay back to front.
        for var in saved.iter().rev() {
            let parent = match store.find_in_chain(ROOT_INDEX, var.name_hash) {
                Some(index) => {
                    store.entries[index].value = var.value;
                    index
                }
                None => store.push_front(ROOT_INDEX, var.name_hash, var.value),
            };
            for sub in var.sub_vars.iter().rev() {
                match store.find_in_chain(parent, sub.sub_name_hash) {
                    Some(index) => store.entries[index].value = sub.value,
                    None => {
                        store.push_front(parent, sub.sub_name_hash, sub.value);
                    }
                }
            }
        }
        store
    }

    fn find_in_chain(&self, parent: usize, name_hash: u32) -> Option<usize> {
        self.chain(parent)
            .find(|index| self.entries[*index].name_hash == name_hash)
    }

    fn push_front(&mut self, parent: usize, name_hash: u32, value: u32) -> usize {
        let index = self.entries.len();
        let previous_head = self.entries[parent].first_child;
        self.entries.push(VarEntry {
            name_hash,
            value,
            first_child: None,
            next_sibling: previous_head,
        });
        self.entries[parent].first_child = Some(index);
        index
    }

    fn chain(&self, parent: usize) -> ChainIter<'_> {
        ChainIter {
            entries: &self.entries,
            next: self.entries[parent].first_child,
        }
    }
}

struct ChainIter<'a> {
    entries: &'a [VarEntry],
    next: Option<usize>,
}

impl Iterator for ChainIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self
            .entries
            .get(current)
            .and_then(|entry| entry.next_sibling);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn global_var_round_trips_and_defaults_to_zero() {
        let mut vars = VariableStore::new();
        assert_eq!(vars.global_var(0xABCD), 0);
        vars.set_global_var(0xABCD, 5);
        assert_eq!(vars.global_var(0xABCD), 5);
        vars.set_global_var(0xABCD, 7);
        assert_eq!(vars.global_var(0xABCD), 7);
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn sub_var_does_not_disturb_parent_value() {
        let mut vars = VariableStore::new();
        vars.set_global_var(0xABCD, 5);
        vars.set_sub_var(0xABCD, 0x01, 9);
        assert_eq!(vars.sub_var(0xABCD, 0x01), 9);
        assert_eq!(vars.global_var(0xABCD), 5);
    }

    #[test]
    fn sibling_sub_vars_are_independent() {
        let mut vars = VariableStore::new();
        vars.set_sub_var(0x10, 0x1, 11);
        vars.set_sub_var(0x10, 0x2, 22);
        vars.set_sub_var(0x10, 0x1, 33);
        assert_eq!(vars.sub_var(0x10, 0x1), 33);
        assert_eq!(vars.sub_var(0x10, 0x2), 22);
        // Implicit parent is created with value 0.
        assert_eq!(vars.global_var(0x10), 0);
    }

    #[test]
    fn reads_never_create_entries() {
        let vars = VariableStore::new();
        assert_eq!(vars.sub_var(0x99, 0x1), 0);
        assert!(vars.is_empty());
    }

    #[test]
    fn sub_var_names_are_scoped_to_their_parent() {
        let mut vars = VariableStore::new();
        vars.set_sub_var(0xA, 0x1, 1);
        vars.set_sub_var(0xB, 0x1, 2);
        vars.set_global_var(0x1, 3);
        assert_eq!(vars.sub_var(0xA, 0x1), 1);
        assert_eq!(vars.sub_var(0xB, 0x1), 2);
        assert_eq!(vars.global_var(0x1), 3);
    }

    #[test]
    fn saved_form_rebuilds_identical_store() {
        let mut vars = VariableStore::new();
        vars.set_global_var(0x91080831, 0x1A214010);
        vars.set_sub_var(0x40050052, 0x8C9819C2, 1);
        vars.set_sub_var(0x00504B86, 0, 4);
        vars.set_sub_var(0x00504B86, 1, 9);
        vars.set_sub_var(0x00504B86, 2, 0);

        let saved = vars.to_saved();
        assert_eq!(saved.len(), 3);
        let restored = VariableStore::from_saved(&saved);
        assert_eq!(restored.to_saved(), saved);
        assert_eq!(restored.sub_var(0x00504B86, 1), 9);
        assert_eq!(restored.global_var(0x91080831), 0x1A214010);
    }

    #[test]
    fn saved_tuple_lists_children_per_parent() {
        let mut vars = VariableStore::new();
        vars.set_sub_var(0x5, 0x1, 10);
        vars.set_sub_var(0x5, 0x2, 20);
        let saved = vars.to_saved();
        assert_eq!(saved[0].name_hash, 0x5);
        assert_eq!(saved[0].sub_vars.len(), 2);
        // Newest sub-entry sits at the head of the chain.
        assert_eq!(saved[0].sub_vars[0].sub_name_hash, 0x2);
    }

    #[test]
    fn saved_form_survives_json() {
        let mut vars = VariableStore::new();
        vars.set_global_var(0x1, 7);
        vars.set_sub_var(0x2, 0x3, 4);
        let json = serde_json::to_string(&vars.to_saved()).expect("encode");
        let decoded: Vec<SavedVar> = serde_json::from_str(&json).expect("decode");
        let restored = VariableStore::from_saved(&decoded);
        assert_eq!(restored.global_var(0x1), 7);
        assert_eq!(restored.sub_var(0x2, 0x3), 4);

        let bare: Vec<SavedVar> =
            serde_json::from_str(r#"[{"name_hash":5,"value":6}]"#).expect("decode without sub_vars");
        assert!(bare[0].sub_vars.is_empty());
    }
}
