//! Cardinal plural rules.
//!
//! Rules follow the CLDR cardinal groups for the languages commonly shipped
//! in language packs. Operands are derived from the number as it would be
//! printed: `n` absolute value, `i` integer digits, `v` visible fraction
//! digit count. Unknown languages use `one` for exactly 1 and `other`
//! otherwise.

use std::fmt;

use crate::resolve::base_language;

/// A CLDR plural category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluralCategory {
    Zero,
    One,
    Two,
    Few,
    Many,
    Other,
}

impl PluralCategory {
    /// Parse a category keyword as used in plural messages.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "zero" => Some(PluralCategory::Zero),
            "one" => Some(PluralCategory::One),
            "two" => Some(PluralCategory::Two),
            "few" => Some(PluralCategory::Few),
            "many" => Some(PluralCategory::Many),
            "other" => Some(PluralCategory::Other),
            _ => None,
        }
    }

    /// The category keyword.
    pub fn as_str(&self) -> &'static str {
        match self {
            PluralCategory::Zero => "zero",
            PluralCategory::One => "one",
            PluralCategory::Two => "two",
            PluralCategory::Few => "few",
            PluralCategory::Many => "many",
            PluralCategory::Other => "other",
        }
    }
}

impl fmt::Display for PluralCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plural operands of a number.
#[derive(Debug, Clone, Copy)]
struct Operands {
    n: f64,
    i: u64,
    v: usize,
}

impl Operands {
    fn new(value: f64) -> Self {
        let n = value.abs();
        let printed = n.to_string();
        let v = printed
            .split_once('.')
            .map(|(_, fraction)| fraction.len())
            .unwrap_or(0);
        Self {
            n,
            i: n.trunc() as u64,
            v,
        }
    }

    fn is_int(&self) -> bool {
        self.v == 0
    }

    /// `n % m` when `n` is an integer.
    fn int_mod(&self, m: u64) -> Option<u64> {
        self.is_int().then_some(self.i % m)
    }
}

/// Rule groups sharing identical cardinal rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RuleGroup {
    /// No plural distinction.
    Invariant,
    /// one: i = 1 and v = 0.
    Germanic,
    /// one: n = 1.
    OneExact,
    /// one: i = 0,1.
    French,
    /// one: i = 0 or n = 1.
    Hindi,
    Slavic,
    Polish,
    Czech,
    Arabic,
    Welsh,
    Hebrew,
    Irish,
    Romanian,
    Slovenian,
}

fn rule_group(language: &str) -> RuleGroup {
    match language {
        "ja" | "ko" | "zh" | "th" | "vi" | "id" | "ms" | "lo" | "my" | "km" | "yue" => {
            RuleGroup::Invariant
        }
        "en" | "de" | "nl" | "sv" | "it" | "ca" | "et" | "fi" | "gl" | "da" | "fy" | "ur" => {
            RuleGroup::Germanic
        }
        "es" | "el" | "hu" | "tr" | "bg" | "nb" | "nn" | "no" | "sw" | "eu" | "az" | "ka"
        | "kk" | "sq" => RuleGroup::OneExact,
        "fr" | "pt" => RuleGroup::French,
        "hi" | "bn" | "fa" | "gu" | "kn" | "mr" | "zu" | "am" => RuleGroup::Hindi,
        "ru" | "uk" | "be" => RuleGroup::Slavic,
        "pl" => RuleGroup::Polish,
        "cs" | "sk" => RuleGroup::Czech,
        "ar" => RuleGroup::Arabic,
        "cy" => RuleGroup::Welsh,
        "he" | "iw" => RuleGroup::Hebrew,
        "ga" => RuleGroup::Irish,
        "ro" | "mo" => RuleGroup::Romanian,
        "sl" => RuleGroup::Slovenian,
        _ => RuleGroup::OneExact,
    }
}

/// The cardinal plural category of `value` in `locale`.
pub fn plural_category(locale: &str, value: f64) -> PluralCategory {
    use PluralCategory::*;

    let op = Operands::new(value);
    let i10 = op.i % 10;
    let i100 = op.i % 100;

    match rule_group(&base_language(locale)) {
        RuleGroup::Invariant => Other,
        RuleGroup::Germanic => {
            if op.i == 1 && op.is_int() {
                One
            } else {
                Other
            }
        }
        RuleGroup::OneExact => {
            if op.n == 1.0 {
                One
            } else {
                Other
            }
        }
        RuleGroup::French => {
            if op.i <= 1 {
                One
            } else {
                Other
            }
        }
        RuleGroup::Hindi => {
            if op.i == 0 || op.n == 1.0 {
                One
            } else {
                Other
            }
        }
        RuleGroup::Slavic => {
            if !op.is_int() {
                Other
            } else if i10 == 1 && i100 != 11 {
                One
            } else if (2..=4).contains(&i10) && !(12..=14).contains(&i100) {
                Few
            } else {
                Many
            }
        }
        RuleGroup::Polish => {
            if !op.is_int() {
                Other
            } else if op.i == 1 {
                One
            } else if (2..=4).contains(&i10) && !(12..=14).contains(&i100) {
                Few
            } else {
                Many
            }
        }
        RuleGroup::Czech => {
            if !op.is_int() {
                Many
            } else if op.i == 1 {
                One
            } else if (2..=4).contains(&op.i) {
                Few
            } else {
                Other
            }
        }
        RuleGroup::Arabic => match op.int_mod(100) {
            _ if op.n == 0.0 => Zero,
            _ if op.n == 1.0 => One,
            _ if op.n == 2.0 => Two,
            Some(m) if (3..=10).contains(&m) => Few,
            Some(m) if (11..=99).contains(&m) => Many,
            _ => Other,
        },
        RuleGroup::Welsh => match op.n {
            n if n == 0.0 => Zero,
            n if n == 1.0 => One,
            n if n == 2.0 => Two,
            n if n == 3.0 => Few,
            n if n == 6.0 => Many,
            _ => Other,
        },
        RuleGroup::Hebrew => {
            if op.is_int() && op.i == 1 {
                One
            } else if op.is_int() && op.i == 2 {
                Two
            } else {
                Other
            }
        }
        RuleGroup::Irish => match op.is_int().then_some(op.i) {
            Some(1) => One,
            Some(2) => Two,
            Some(3..=6) => Few,
            Some(7..=10) => Many,
            _ => Other,
        },
        RuleGroup::Romanian => {
            if op.i == 1 && op.is_int() {
                One
            } else if !op.is_int() || op.n == 0.0 || (2..=19).contains(&i100) {
                Few
            } else {
                Other
            }
        }
        RuleGroup::Slovenian => {
            if !op.is_int() {
                Few
            } else if i100 == 1 {
                One
            } else if i100 == 2 {
                Two
            } else if (3..=4).contains(&i100) {
                Few
            } else {
                Other
            }
        }
    }
}
