// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `validate` and `normalize` over JSON graph files.

use std::path::Path;

use anyhow::{bail, Context, Result};
use comfy_table::Table;
use egp_core::{ConnectionSpec, Finding, Wiring};
use rand::rngs::StdRng;
use rand::SeedableRng;

fn read_graph(path: &Path) -> Result<ConnectionSpec> {
    let shown = path.display();
    let text = std::fs::read_to_string(path).with_context(|| format!("failed to read {shown}"))?;
    serde_json::from_str(&text).with_context(|| format!("{shown} is not a valid JSON graph"))
}

fn findings_table(findings: &[Finding]) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["code", "finding"]);
    for f in findings {
        table.add_row(vec![f.code.as_str().to_owned(), f.message.clone()]);
    }
    table
}

pub fn validate(path: &Path) -> Result<()> {
    let wiring = Wiring::from_spec(&read_graph(path)?);
    let findings = wiring.validate();
    if findings.is_empty() {
        println!("{}: valid ({} endpoints)", path.display(), wiring.len());
        return Ok(());
    }
    println!("{}", findings_table(&findings));
    bail!("{}: {} finding(s)", path.display(), findings.len());
}

pub fn normalize(path: &Path, out: Option<&Path>, seed: u64) -> Result<()> {
    let mut wiring = Wiring::from_spec(&read_graph(path)?);
    if !wiring.normalize(&mut StdRng::seed_from_u64(seed)) {
        let findings = wiring.validate();
        println!("{}", findings_table(&findings));
        bail!("{}: no viable source for every destination", path.display());
    }
    let spec = wiring.to_spec()?;
    let text = serde_json::to_string_pretty(&spec)?;
    match out {
        Some(out) => {
            let shown = out.display();
            std::fs::write(out, text).with_context(|| format!("failed to write {shown}"))?;
        }
        None => println!("{text}"),
    }
    Ok(())
}
