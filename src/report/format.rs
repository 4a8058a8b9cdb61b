//! Terminal formatting for schemas, flattened records and sweeps.
//!
//! Formatting lives in one place so the core modules stay free of presentation
//! code and output changes stay local.

use crate::catalog::Catalog;
use crate::domain::{FieldDefault, Mapping, Record, RecordType, Value};
use crate::instantiate::TargetRegistry;
use crate::sweep::SettingsSlot;

/// List every record type in the catalog with its fields.
pub fn format_catalog(catalog: &Catalog) -> String {
    let mut out = String::new();
    out.push_str("=== params - record types ===\n");
    for ty in catalog.types() {
        out.push('\n');
        out.push_str(&format_record_type(ty));
    }
    out.push('\n');
    out.push_str(&format_targets(catalog.targets()));
    out
}

/// One record type: header line plus a field table.
pub fn format_record_type(ty: &RecordType) -> String {
    let mut out = String::new();
    let mut header = ty.name().to_string();
    if let Some(parent) = ty.parent() {
        header.push_str(&format!(" : {}", parent.name()));
    }
    if let Some(disc) = ty.discriminator() {
        header.push_str(&format!(" [instantiable via '{disc}']"));
    }
    let unions = ty.disambiguators().len();
    if unions > 0 {
        header.push_str(&format!(" [{unions} disambiguator(s)]"));
    }
    out.push_str(&header);
    out.push('\n');

    for field in ty.fields() {
        let default = match field.default() {
            FieldDefault::Required => "<required>".to_string(),
            other => other.produce().map(|v| short(&v)).unwrap_or_default(),
        };
        out.push_str(
            format!(
                "  {:<14} {:<28} {}\n",
                field.name(),
                truncate(&field.ty().to_string(), 28),
                default
            )
            .trim_end(),
        );
        out.push('\n');
    }
    out
}

pub fn format_targets(targets: &TargetRegistry) -> String {
    let mut out = String::new();
    out.push_str("Targets:\n");
    for target in targets.iter() {
        let params: Vec<String> = target
            .params
            .iter()
            .map(|p| if p.required { p.name.clone() } else { format!("{}?", p.name) })
            .collect();
        out.push_str(
            format!("  {:<14} ({}) {}\n", target.name, params.join(", "), target.doc).trim_end(),
        );
        out.push('\n');
    }
    out
}

/// `key = value` lines, keys padded to a common width.
pub fn format_flat(flat: &Mapping) -> String {
    let width = flat.keys().map(|k| k.chars().count()).max().unwrap_or(0);
    let mut out = String::new();
    for (k, v) in flat {
        out.push_str(&format!("{k:<width$} = {v}\n"));
    }
    out
}

/// Slot listing plus the total number of combinations.
pub fn format_sweep_summary(
    record: &Record,
    slots: &[SettingsSlot],
    combinations: usize,
    sep: &str,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Sweep over {}: {} slot(s)\n", record.type_name(), slots.len()));
    for slot in slots {
        out.push_str(&format!("- {} ({} candidates)\n", slot.key(sep), slot.candidates));
    }
    out.push_str(&format!("Combinations: {combinations}\n"));
    out
}

/// One row per combination, one column per slot.
///
/// Cells are read from each expanded record at the slot's path, so slots
/// inside plain lists work too. Record candidates show their type name.
pub fn format_sweep_table(records: &[Record], slots: &[SettingsSlot], sep: &str) -> String {
    let keys: Vec<String> = slots.iter().map(|s| s.key(sep)).collect();
    let cells: Vec<Vec<String>> = records
        .iter()
        .map(|record| {
            slots
                .iter()
                .map(|slot| slot.value_in(record).map(short).unwrap_or_else(|| "-".to_string()))
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = keys.iter().map(|k| k.chars().count().min(24)).collect();
    for row in &cells {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.chars().count().min(24));
        }
    }

    let mut out = String::new();
    let mut line = format!("{:>5}", "#");
    for (key, &w) in keys.iter().zip(&widths) {
        line.push_str(&format!(" {:<w$}", truncate(key, w)));
    }
    out.push_str(line.trim_end());
    out.push('\n');

    let mut rule = format!("{:->5}", "");
    for &w in &widths {
        rule.push_str(&format!(" {:-<w$}", ""));
    }
    out.push_str(rule.trim_end());
    out.push('\n');

    for (i, row) in cells.iter().enumerate() {
        let mut line = format!("{i:>5}");
        for (cell, &w) in row.iter().zip(&widths) {
            line.push_str(&format!(" {:<w$}", truncate(cell, w)));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

fn short(v: &Value) -> String {
    match v {
        Value::Str(s) => s.clone(),
        Value::Record(r) => r.type_name().to_string(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
