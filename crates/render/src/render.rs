//! Rendering a decoded [`StructVal`] tree in one of four textual styles
//! (§4.4), driven entirely by the [`FieldDef`] metadata already present
//! on the registered [`StructDefinition`] — no per-type printer callback
//! is needed.

use registry::{FieldKind, StructDefinition, StructVal, TypeRegistry, Value};

use crate::error::RenderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Human,
    Kvp,
    CsvHeader,
    CsvData,
}

struct Entry {
    key_path: String,
    name: String,
    value: Value,
    conversion: Option<fn(f64) -> f64>,
    unit: Option<&'static str>,
    depth: usize,
}

impl Entry {
    /// HUMAN applies the field's engineering-units conversion (when
    /// present); every other style always emits the raw value (§4.4).
    fn text(&self, apply_conversion: bool) -> String {
        scalar_repr(&self.value, self.conversion, apply_conversion)
    }
}

pub fn render(registry: &TypeRegistry, def: &StructDefinition, value: &StructVal, style: Style) -> Result<String, RenderError> {
    let mut entries = Vec::new();
    flatten(registry, def, value, "", 0, &mut entries)?;

    Ok(match style {
        Style::Human => render_human(&entries),
        Style::Kvp => entries.iter().map(|e| format!("{}={}\n", e.key_path, e.text(false))).collect(),
        Style::CsvHeader => entries.iter().map(|e| e.key_path.as_str()).collect::<Vec<_>>().join(","),
        Style::CsvData => entries.iter().map(|e| e.text(false)).collect::<Vec<_>>().join(","),
    })
}

fn render_human(entries: &[Entry]) -> String {
    const NAME_COLUMN: usize = 24;
    let mut out = String::new();
    for (i, e) in entries.iter().enumerate() {
        let indent = "  ".repeat(e.depth);
        let unit_suffix = e.unit.map(|u| format!(" [{u}]")).unwrap_or_default();
        let text = e.text(true);
        out.push_str(&format!("{:3}. {indent}{:<width$} = {text}{unit_suffix}\n", i + 1, e.name, width = NAME_COLUMN.saturating_sub(indent.len())));
    }
    out
}

fn flatten(
    registry: &TypeRegistry,
    def: &StructDefinition,
    value: &StructVal,
    prefix: &str,
    depth: usize,
    entries: &mut Vec<Entry>,
) -> Result<(), RenderError> {
    for field in &def.fields {
        let Some(field_value) = value.get(field.key) else { continue };
        let key_path = format!("{prefix}{}", field.key);
        match &field.kind {
            FieldKind::Struct(type_id) => {
                let Value::Struct(inner) = field_value else { continue };
                let inner_def = registry.get(*type_id)?;
                flatten(registry, inner_def, inner, &format!("{key_path}_"), depth + 1, entries)?;
            }
            FieldKind::Union => {
                let Value::Union(u) = field_value else { continue };
                if let Value::Struct(inner) = &u.payload {
                    let inner_def = registry.get(u.type_id)?;
                    flatten(registry, inner_def, inner, &format!("{key_path}_"), depth + 1, entries)?;
                }
            }
            _ => {
                entries.push(Entry {
                    key_path,
                    name: field.name.to_string(),
                    value: field_value.clone(),
                    conversion: field.conversion,
                    unit: field.unit,
                    depth,
                });
            }
        }
    }
    Ok(())
}

/// Renders a single scalar (or array of scalars) to its textual form.
/// `apply_conversion` gates HUMAN-style engineering-units conversion;
/// all other styles always emit raw values (§4.4).
pub(crate) fn scalar_repr(value: &Value, conversion: Option<fn(f64) -> f64>, apply_conversion: bool) -> String {
    match value {
        Value::U32(v) => numeric_repr(*v as f64, conversion, apply_conversion),
        Value::I32(v) => numeric_repr(*v as f64, conversion, apply_conversion),
        Value::U64(v) => numeric_repr(*v as f64, conversion, apply_conversion),
        Value::I64(v) => numeric_repr(*v as f64, conversion, apply_conversion),
        Value::F32(v) => numeric_repr(*v as f64, conversion, apply_conversion),
        Value::F64(v) => numeric_repr(*v, conversion, apply_conversion),
        Value::Bytes(b) => hex_encode(b),
        Value::Str(s) => s.clone(),
        Value::Array(items) => items.iter().map(|v| scalar_repr(v, conversion, apply_conversion)).collect::<Vec<_>>().join(","),
        Value::Struct(_) | Value::Union(_) => String::new(),
    }
}

fn numeric_repr(raw: f64, conversion: Option<fn(f64) -> f64>, apply_conversion: bool) -> String {
    if apply_conversion {
        if let Some(convert) = conversion {
            return format!("{}", convert(raw));
        }
    }
    if raw.fract() == 0.0 && raw.abs() < 1e15 {
        format!("{}", raw as i64)
    } else {
        format!("{raw}")
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
