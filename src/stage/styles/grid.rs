//! IE 10/11 grid: `-ms-` declarations ahead of their standard forms.
//!
//! Lightningcss prefixes flexbox but not grid, so the old grid syntax is
//! added here for targets that include IE:
//!
//! ```text
//! display: grid                    → display: -ms-grid
//! grid-template-columns: repeat(2, 1fr) 10px → -ms-grid-columns: (1fr)[2] 10px
//! grid-column: 1 / span 2          → -ms-grid-column: 1; -ms-grid-column-span: 2
//! grid-row-start: 3                → -ms-grid-row: 3
//! ```
//!
//! Parsed declarations borrow their text, so lowering runs in two passes:
//! [`GridPlan::new`] reads a first parse and records what to insert, then
//! [`GridPlan::apply`] inserts it into a second parse whose input buffer
//! also holds the inserted values.

use std::ops::Range;

use lightningcss::declaration::DeclarationBlock;
use lightningcss::properties::{Property, PropertyId};
use lightningcss::rules::{CssRule, CssRuleList};
use lightningcss::stylesheet::{ParserOptions, PrinterOptions, StyleSheet};

#[derive(Debug)]
struct Insert {
    /// Index of the standard declaration the insert goes in front of.
    before: usize,
    name: &'static str,
    /// Range in `GridPlan::values`.
    value: Range<usize>,
}

/// Declarations to insert, one list per declaration list in traversal
/// order (normal, then `!important`, for every style rule).
#[derive(Debug, Default)]
pub struct GridPlan {
    blocks: Vec<Vec<Insert>>,
    values: String,
}

impl GridPlan {
    pub fn new(css: &str) -> Result<Self, String> {
        let stylesheet =
            StyleSheet::parse(css, ParserOptions::default()).map_err(|e| e.to_string())?;
        let mut plan = Self::default();
        plan.visit_rules(&stylesheet.rules);
        Ok(plan)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Every inserted value, concatenated. Append it to the CSS source so
    /// both share one lifetime, then pass it to [`Self::apply`].
    pub fn values(&self) -> &str {
        &self.values
    }

    /// Insert the planned declarations into `rules`, which must come from
    /// the same CSS the plan was made from.
    pub fn apply<'i>(&self, rules: &mut CssRuleList<'i>, values: &'i str) -> Result<(), String> {
        let mut blocks = self.blocks.iter();
        apply_rules(rules, &mut blocks, values)
    }

    fn visit_rules(&mut self, rules: &CssRuleList<'_>) {
        for rule in &rules.0 {
            match rule {
                CssRule::Style(style) => {
                    self.visit_block(&style.declarations);
                    self.visit_rules(&style.rules);
                }
                CssRule::Media(media) => self.visit_rules(&media.rules),
                CssRule::Supports(supports) => self.visit_rules(&supports.rules),
                CssRule::LayerBlock(layer) => self.visit_rules(&layer.rules),
                CssRule::Container(container) => self.visit_rules(&container.rules),
                _ => {}
            }
        }
    }

    fn visit_block(&mut self, block: &DeclarationBlock<'_>) {
        for list in [&block.declarations, &block.important_declarations] {
            let mut inserts = Vec::new();
            for (index, property) in list.iter().enumerate() {
                let id = property.property_id();
                let Ok(value) = property.value_to_css_string(PrinterOptions::default()) else {
                    continue;
                };
                for (name, lowered) in lower(id.name(), &value) {
                    let start = self.values.len();
                    self.values.push_str(&lowered);
                    inserts.push(Insert {
                        before: index,
                        name,
                        value: start..self.values.len(),
                    });
                }
            }
            self.blocks.push(inserts);
        }
    }
}

fn apply_rules<'i, 'p>(
    rules: &mut CssRuleList<'i>,
    blocks: &mut impl Iterator<Item = &'p Vec<Insert>>,
    values: &'i str,
) -> Result<(), String> {
    for rule in &mut rules.0 {
        match rule {
            CssRule::Style(style) => {
                let block = &mut style.declarations;
                for list in [&mut block.declarations, &mut block.important_declarations] {
                    let inserts = blocks.next().ok_or("stylesheet changed between passes")?;
                    insert(list, inserts, values)?;
                }
                apply_rules(&mut style.rules, blocks, values)?;
            }
            CssRule::Media(media) => apply_rules(&mut media.rules, blocks, values)?,
            CssRule::Supports(supports) => apply_rules(&mut supports.rules, blocks, values)?,
            CssRule::LayerBlock(layer) => apply_rules(&mut layer.rules, blocks, values)?,
            CssRule::Container(container) => apply_rules(&mut container.rules, blocks, values)?,
            _ => {}
        }
    }
    Ok(())
}

fn insert<'i>(list: &mut Vec<Property<'i>>, inserts: &[Insert], values: &'i str) -> Result<(), String> {
    // back to front keeps earlier indices valid; same-index inserts keep their order
    for group in inserts.chunk_by(|a, b| a.before == b.before).rev() {
        let before = group[0].before;
        for insert in group.iter().rev() {
            let value = values
                .get(insert.value.clone())
                .ok_or("grid value out of range")?;
            let property = Property::parse_string(
                PropertyId::from(insert.name),
                value,
                ParserOptions::default(),
            )
            .map_err(|e| format!("{}: {value}: {e:?}", insert.name))?;
            list.insert(before, property);
        }
    }
    Ok(())
}

/// `-ms-` declarations for one standard declaration.
fn lower(name: &str, value: &str) -> Vec<(&'static str, String)> {
    match name {
        "display" => match value {
            "grid" => vec![("display", "-ms-grid".to_string())],
            "inline-grid" => vec![("display", "-ms-inline-grid".to_string())],
            _ => Vec::new(),
        },
        "grid-template-columns" => track_list(value)
            .map(|v| vec![("-ms-grid-columns", v)])
            .unwrap_or_default(),
        "grid-template-rows" => track_list(value)
            .map(|v| vec![("-ms-grid-rows", v)])
            .unwrap_or_default(),
        "grid-column" => placement(value, "-ms-grid-column", "-ms-grid-column-span"),
        "grid-row" => placement(value, "-ms-grid-row", "-ms-grid-row-span"),
        "grid-column-start" => line_number(value)
            .map(|n| vec![("-ms-grid-column", n.to_string())])
            .unwrap_or_default(),
        "grid-row-start" => line_number(value)
            .map(|n| vec![("-ms-grid-row", n.to_string())])
            .unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// Old track syntax: `repeat(n, tracks)` becomes `(tracks)[n]`. Named
/// lines and automatic repetition have no equivalent.
fn track_list(value: &str) -> Option<String> {
    const UNSUPPORTED: [&str; 5] = ["[", "auto-fill", "auto-fit", "subgrid", "masonry"];
    if value == "none" || UNSUPPORTED.iter().any(|u| value.contains(u)) {
        return None;
    }

    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find("repeat(") {
        out.push_str(&rest[..start]);
        let args_start = start + "repeat(".len();
        let args_len = closing_paren(&rest[args_start..])?;
        let args = &rest[args_start..args_start + args_len];

        let (count, tracks) = args.split_once(',')?;
        let count: u32 = count.trim().parse().ok()?;
        out.push_str(&format!("({})[{count}]", tracks.trim()));
        rest = &rest[args_start + args_len + 1..];
    }
    out.push_str(rest);
    Some(out)
}

/// Length of `s` up to the `)` closing an already-open paren.
fn closing_paren(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in s.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' if depth == 0 => return Some(i),
            ')' => depth -= 1,
            _ => {}
        }
    }
    None
}

/// `start [/ end]` → position and span. Only numeric starts lower.
fn placement(value: &str, position: &'static str, span: &'static str) -> Vec<(&'static str, String)> {
    let mut parts = value.split('/').map(str::trim);
    let Some(start) = parts.next().and_then(line_number) else {
        return Vec::new();
    };

    let mut out = vec![(position, start.to_string())];
    let width = match parts.next() {
        Some(end) => match end.strip_prefix("span") {
            Some(n) => n.trim().parse::<i32>().ok(),
            None => line_number(end).map(|end| end - start),
        },
        None => None,
    };
    if let Some(width) = width.filter(|w| *w > 1) {
        out.push((span, width.to_string()));
    }
    out
}

fn line_number(value: &str) -> Option<i32> {
    value.trim().parse().ok().filter(|n| *n > 0)
}
