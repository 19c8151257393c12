//! LoRA prompt composition (spec §4.G).

use loraflow_core::Adapter;

/// One adapter selected for a generation request, with its effective
/// weight (the catalog default unless the caller overrode it).
#[derive(Debug, Clone)]
pub struct SelectedAdapter {
    pub adapter: Adapter,
    pub weight: f64,
}

/// Order selected adapters `(active == true, ordinal asc, id asc)` (spec
/// §4.G). Explicit selections may include inactive adapters, so this is not
/// a no-op even though implicit selection already only offers active ones.
pub fn order_selection(mut selected: Vec<SelectedAdapter>) -> Vec<SelectedAdapter> {
    selected.sort_by(|a, b| {
        b.adapter
            .active
            .cmp(&a.adapter.active)
            .then(a.adapter.ordinal.cmp(&b.adapter.ordinal))
            .then(a.adapter.id.as_str().cmp(b.adapter.id.as_str()))
    });
    selected
}

/// Compose the final prompt: `prefix`, then every `<lora:NAME:WEIGHT>`
/// token in selection order, then every adapter's trigger words (in
/// selection order), then `suffix`. Whitespace is single-spaced; empty
/// segments are omitted entirely rather than leaving a gap.
pub fn compose(prefix: Option<&str>, suffix: Option<&str>, selected: &[SelectedAdapter]) -> String {
    let tokens = selected
        .iter()
        .map(|s| format!("<lora:{}:{:.1}>", s.adapter.name, s.weight))
        .collect::<Vec<_>>()
        .join(" ");

    let trigger_words = selected
        .iter()
        .flat_map(|s| s.adapter.trigger_words.iter().cloned())
        .collect::<Vec<_>>()
        .join(", ");

    [prefix.unwrap_or(""), tokens.as_str(), trigger_words.as_str(), suffix.unwrap_or("")]
        .into_iter()
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
#[path = "prompt_tests.rs"]
mod tests;
