//! Recognised gate names and their signatures.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Shape of a gate: how many qubits and parameters a call must supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSignature {
    /// Canonical gate name (aliases resolve to this).
    pub name: String,
    /// Number of qubit operands, before control modifiers.
    pub num_qubits: usize,
    /// Number of parameters.
    pub num_params: usize,
    /// Built into the language; usable without any include.
    pub builtin: bool,
}

/// The set of gate names a program may call without defining them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GateVocabulary {
    gates: FxHashMap<String, GateSignature>,
}

impl GateVocabulary {
    /// Create an empty vocabulary.
    pub fn new() -> Self {
        Self::default()
    }

    /// The `stdgates.inc` library plus the language built-ins.
    pub fn standard() -> Self {
        let mut vocab = Self::new();

        for name in [
            "id", "x", "y", "z", "h", "s", "sdg", "t", "tdg", "sx", "sxdg",
        ] {
            vocab.add(name, 1, 0);
        }
        for name in ["rx", "ry", "rz", "p", "u1"] {
            vocab.add(name, 1, 1);
        }
        vocab.add("u2", 1, 2);
        vocab.add("prx", 1, 2);
        vocab.add("u", 1, 3);
        vocab.add("u3", 1, 3);

        for name in ["cx", "cy", "cz", "ch", "swap", "iswap", "ecr"] {
            vocab.add(name, 2, 0);
        }
        for name in ["crx", "cry", "crz", "cp", "rxx", "ryy", "rzz"] {
            vocab.add(name, 2, 1);
        }

        vocab.add("ccx", 3, 0);
        vocab.add("cswap", 3, 0);

        vocab.alias("i", "id");
        vocab.alias("phase", "p");
        vocab.alias("cnot", "cx");
        vocab.alias("cphase", "cp");
        vocab.alias("toffoli", "ccx");
        vocab.alias("fredkin", "cswap");

        vocab.add_builtin("U", 1, 3);
        vocab.add_builtin("CX", 2, 0);
        vocab.add_builtin("gphase", 0, 1);

        vocab
    }

    /// Add a library gate.
    pub fn add(&mut self, name: &str, num_qubits: usize, num_params: usize) {
        self.insert(name, num_qubits, num_params, false);
    }

    /// Add a language built-in gate.
    pub fn add_builtin(&mut self, name: &str, num_qubits: usize, num_params: usize) {
        self.insert(name, num_qubits, num_params, true);
    }

    fn insert(&mut self, name: &str, num_qubits: usize, num_params: usize, builtin: bool) {
        self.gates.insert(
            name.to_string(),
            GateSignature {
                name: name.to_string(),
                num_qubits,
                num_params,
                builtin,
            },
        );
    }

    /// Register `alias` as another name for `target`. Unknown targets are ignored.
    pub fn alias(&mut self, alias: &str, target: &str) {
        if let Some(signature) = self.gates.get(target).cloned() {
            self.gates.insert(alias.to_string(), signature);
        }
    }

    /// Look up a gate by name or alias.
    pub fn get(&self, name: &str) -> Option<&GateSignature> {
        self.gates.get(name)
    }

    /// Check if a name (or alias) is recognised.
    pub fn contains(&self, name: &str) -> bool {
        self.gates.contains_key(name)
    }

    /// Check if a name is a library gate that needs a standard include.
    pub fn needs_include(&self, name: &str) -> bool {
        self.gates.get(name).is_some_and(|sig| !sig.builtin)
    }

    /// All recognised names, aliases included, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.gates.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of recognised names, aliases included.
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    /// Check if the vocabulary is empty.
    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_signatures() {
        let vocab = GateVocabulary::standard();

        assert_eq!(vocab.get("h").unwrap().num_qubits, 1);
        assert_eq!(vocab.get("u3").unwrap().num_params, 3);
        assert_eq!(vocab.get("rzz").unwrap().num_qubits, 2);
        assert_eq!(vocab.get("rzz").unwrap().num_params, 1);
        assert_eq!(vocab.get("cswap").unwrap().num_qubits, 3);
        assert!(!vocab.contains("foo"));
    }

    #[test]
    fn test_aliases_resolve_to_canonical() {
        let vocab = GateVocabulary::standard();

        assert_eq!(vocab.get("cnot").unwrap().name, "cx");
        assert_eq!(vocab.get("toffoli").unwrap().name, "ccx");
        assert_eq!(vocab.get("cphase").unwrap().num_params, 1);
    }

    #[test]
    fn test_builtins_need_no_include() {
        let vocab = GateVocabulary::standard();

        assert!(vocab.contains("U"));
        assert!(!vocab.needs_include("U"));
        assert!(!vocab.needs_include("gphase"));
        assert!(vocab.needs_include("cx"));
        assert!(!vocab.needs_include("unknown"));
    }

    #[test]
    fn test_names_sorted() {
        let vocab = GateVocabulary::standard();
        let names = vocab.names();

        assert_eq!(names.len(), vocab.len());
        assert!(names.windows(2).all(|w| w[0] <= w[1]));
    }
}
