//! Reader for the subset of CSS the Word exporter honours.
//!
//! Only flat rules with type or class selectors are considered, and only the
//! declarations that map onto run or paragraph properties. Everything else in
//! the style block is skipped without error.

use std::collections::HashMap;

/// Formatting extracted from one or more CSS rules.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct TextStyle {
    pub font: Option<String>,
    /// Size in half-points, the unit WordprocessingML uses.
    pub size: Option<usize>,
    pub color: Option<String>,
    pub background: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underline: Option<bool>,
    pub strike: Option<bool>,
    /// Spacing in twentieths of a point.
    pub space_before: Option<u32>,
    pub space_after: Option<u32>,
}

impl TextStyle {
    fn merge(&mut self, other: &TextStyle) {
        macro_rules! take {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field.clone();
                })*
            };
        }
        take!(
            font,
            size,
            color,
            background,
            bold,
            italic,
            underline,
            strike,
            space_before,
            space_after
        );
    }

    fn apply_declaration(&mut self, property: &str, value: &str) {
        match property {
            "font-family" => self.font = first_family(value),
            "font-size" => {
                if let Some(points) = length_in_points(value) {
                    self.size = Some((points * 2.0).round() as usize);
                }
            }
            "color" => {
                if let Some(color) = hex_color(value) {
                    self.color = Some(color);
                }
            }
            "background-color" | "background" => {
                if let Some(color) = hex_color(value) {
                    self.background = Some(color);
                }
            }
            "font-weight" => self.bold = font_weight(value),
            "font-style" => match value {
                "italic" | "oblique" => self.italic = Some(true),
                "normal" => self.italic = Some(false),
                _ => {}
            },
            "text-decoration" | "text-decoration-line" => {
                if value.contains("underline") {
                    self.underline = Some(true);
                }
                if value.contains("line-through") {
                    self.strike = Some(true);
                }
                if value == "none" {
                    self.underline = Some(false);
                    self.strike = Some(false);
                }
            }
            "margin-top" => self.space_before = length_in_twips(value),
            "margin-bottom" => self.space_after = length_in_twips(value),
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct StyleSheet {
    rules: HashMap<String, TextStyle>,
}

impl StyleSheet {
    pub(crate) fn parse(css: &str) -> Self {
        let mut sheet = Self::default();
        let css = strip_comments(css);

        for block in css.split('}') {
            let Some((selectors, body)) = block.split_once('{') else {
                continue;
            };
            let selectors = selectors.trim();
            if selectors.is_empty() || selectors.starts_with('@') {
                continue;
            }

            let mut style = TextStyle::default();
            for declaration in body.split(';') {
                let Some((property, value)) = declaration.split_once(':') else {
                    continue;
                };
                let property = property.trim().to_ascii_lowercase();
                let value = value.trim().trim_end_matches("!important").trim();
                if property == "font-family" {
                    style.apply_declaration(&property, value);
                } else {
                    style.apply_declaration(&property, &value.to_ascii_lowercase());
                }
            }

            for selector in selectors.split(',').map(str::trim) {
                if !is_simple_selector(selector) {
                    continue;
                }
                sheet
                    .rules
                    .entry(selector.to_ascii_lowercase())
                    .or_default()
                    .merge(&style);
            }
        }

        sheet
    }

    /// Merge the rules for `selectors` in order; later selectors win.
    pub(crate) fn resolve(&self, selectors: &[&str]) -> TextStyle {
        let mut style = TextStyle::default();
        for selector in selectors {
            if let Some(rule) = self.rules.get(*selector) {
                style.merge(rule);
            }
        }
        style
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn is_simple_selector(selector: &str) -> bool {
    !selector.is_empty()
        && selector
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

fn first_family(value: &str) -> Option<String> {
    value
        .split(',')
        .next()
        .map(|family| family.trim().trim_matches(|c| c == '"' || c == '\'').trim())
        .filter(|family| !family.is_empty())
        .map(str::to_string)
}

fn length_in_points(value: &str) -> Option<f32> {
    let value = value.trim();
    if let Some(number) = value.strip_suffix("pt") {
        return number.trim().parse().ok();
    }
    if let Some(number) = value.strip_suffix("px") {
        return number.trim().parse::<f32>().ok().map(|px| px * 0.75);
    }
    match value.parse::<f32>() {
        Ok(number) if number == 0.0 => Some(0.0),
        _ => None,
    }
}

fn length_in_twips(value: &str) -> Option<u32> {
    length_in_points(value)
        .filter(|points| *points >= 0.0)
        .map(|points| (points * 20.0).round() as u32)
}

fn font_weight(value: &str) -> Option<bool> {
    match value {
        "bold" | "bolder" => Some(true),
        "normal" | "lighter" => Some(false),
        numeric => numeric.parse::<u16>().ok().map(|weight| weight >= 600),
    }
}

fn hex_color(value: &str) -> Option<String> {
    let hex = value.trim().strip_prefix('#')?;
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        3 => Some(hex.chars().flat_map(|c| [c, c]).collect::<String>().to_ascii_uppercase()),
        6 => Some(hex.to_ascii_uppercase()),
        _ => None,
    }
}
