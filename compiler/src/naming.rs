// naming.rs — Storage names for node inputs
//
// Every (node, input) pair gets one shader variable, `inp_<node>_<input>`.
// The join is not injective (`a_b`/`c` and `a`/`b_c` meet), so generated
// names are registered in a `StorageNames` table that rejects collisions.
//
// Preconditions: node ids and input names are valid identifier fragments.
// Postconditions: registered names map back to exactly one (node, input) pair.
// Failure modes: two pairs with one name → `BuildError::StorageNameCollision`.
// Side effects: none.

use std::collections::HashMap;

use crate::diag::BuildError;

const INPUT_PREFIX: &str = "inp_";

/// Storage variable for input `input` of node `node_id`.
pub fn input_var_name(node_id: &str, input: &str) -> String {
    let mut name = String::with_capacity(INPUT_PREFIX.len() + node_id.len() + input.len() + 1);
    name.push_str(INPUT_PREFIX);
    name.push_str(node_id);
    name.push('_');
    name.push_str(input);
    name
}

/// Registry of storage names handed out during one build.
#[derive(Debug, Default)]
pub struct StorageNames {
    owners: HashMap<String, (String, String)>,
}

impl StorageNames {
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the pair and record it. Registering the same pair twice is fine.
    pub fn register(&mut self, node_id: &str, input: &str) -> Result<String, BuildError> {
        let name = input_var_name(node_id, input);
        match self.owners.get(&name) {
            Some((n, i)) if n == node_id && i == input => {}
            Some(first) => {
                return Err(BuildError::StorageNameCollision {
                    name,
                    first: first.clone(),
                    second: (node_id.to_string(), input.to_string()),
                });
            }
            None => {
                self.owners
                    .insert(name.clone(), (node_id.to_string(), input.to_string()));
            }
        }
        Ok(name)
    }

    /// The pair a name was registered for.
    pub fn owner(&self, name: &str) -> Option<(&str, &str)> {
        self.owners
            .get(name)
            .map(|(n, i)| (n.as_str(), i.as_str()))
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
