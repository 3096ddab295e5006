//! Vocabulary command implementation.

use anyhow::Result;
use console::style;
use serde::Serialize;

use qforge_compile::GateVocabulary;

#[derive(Serialize)]
struct Entry<'a> {
    name: &'a str,
    canonical: &'a str,
    num_qubits: usize,
    num_params: usize,
    builtin: bool,
}

fn entries(vocabulary: &GateVocabulary) -> Vec<Entry<'_>> {
    vocabulary
        .names()
        .into_iter()
        .filter_map(|name| {
            vocabulary.get(name).map(|sig| Entry {
                name,
                canonical: &sig.name,
                num_qubits: sig.num_qubits,
                num_params: sig.num_params,
                builtin: sig.builtin,
            })
        })
        .collect()
}

/// Execute the vocabulary command.
pub fn execute(json: bool) -> Result<()> {
    let vocabulary = GateVocabulary::standard();
    let entries = entries(&vocabulary);

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    println!("{}", style("Standard gate vocabulary").bold());
    println!();
    println!("  {:<10} {:>6} {:>6}  NOTE", "NAME", "QUBITS", "PARAMS");
    for entry in &entries {
        let note = if entry.builtin {
            "built-in".to_string()
        } else if entry.name != entry.canonical {
            format!("alias of {}", entry.canonical)
        } else {
            String::new()
        };
        println!(
            "  {:<10} {:>6} {:>6}  {}",
            style(entry.name).cyan(),
            entry.num_qubits,
            entry.num_params,
            style(note).dim()
        );
    }
    println!();
    println!("{} names", entries.len());
    Ok(())
}
