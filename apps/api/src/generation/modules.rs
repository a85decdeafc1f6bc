//! Subject modules — pluggable problem generators behind a common trait.
//!
//! Each module is a pure content template: `settings -> ProblemRecord`, one
//! call per unit, no state between calls. Practice-sheet modules produce one
//! record per page rather than per problem; the paginator branches on that
//! flag. The registry is built once at startup and shared through `AppState`.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

use crate::models::problem::{ProblemLayout, ProblemRecord};
use crate::models::settings::ModuleSettings;

const MAX_DIGITS: u8 = 6;

/// A settings combination a module cannot satisfy. Aborts the whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeneratorError {
    #[error("invalid digit count: {0} (expected 1-{MAX_DIGITS})")]
    InvalidDigits(u8),
    #[error("max_denominator must be at least 2, got {0}")]
    InvalidDenominator(u32),
    #[error("max_value must be at least 1")]
    InvalidMaxValue,
}

/// One subject module. Implementations must be stateless and cheap — the
/// pipeline calls `generate` once per requested unit, in order.
pub trait GeneratorModule: Send + Sync {
    fn key(&self) -> &'static str;
    fn title(&self) -> &'static str;

    /// Whole-page worksheets (counting drills): one unit = one page.
    fn practice_sheet(&self) -> bool {
        false
    }

    /// Manual-mode default and the auto-fit zero-estimate fallback.
    fn default_problems_per_page(&self) -> u32 {
        20
    }

    /// Instruction line printed above the first page, if the module has one.
    fn preamble(&self, _settings: &ModuleSettings) -> Option<String> {
        None
    }

    fn generate(&self, settings: &ModuleSettings) -> Result<ProblemRecord, GeneratorError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Shared helpers
// ────────────────────────────────────────────────────────────────────────────

/// Inclusive operand range for a digit count: 1 digit is 1–9, n digits is
/// 10^(n-1) – 10^n - 1.
fn operand_range(digits: u8) -> Result<(i64, i64), GeneratorError> {
    if digits == 0 || digits > MAX_DIGITS {
        return Err(GeneratorError::InvalidDigits(digits));
    }
    let low = if digits == 1 {
        1
    } else {
        10_i64.pow(u32::from(digits) - 1)
    };
    let high = 10_i64.pow(u32::from(digits)) - 1;
    Ok((low, high))
}

fn draw_operand(digits: u8) -> Result<i64, GeneratorError> {
    let (low, high) = operand_range(digits)?;
    Ok(rand::rng().random_range(low..=high))
}

/// Multi-digit operands read better stacked.
fn arithmetic_layout(digits: u8) -> Option<ProblemLayout> {
    if digits >= 3 {
        Some(ProblemLayout::Vertical)
    } else {
        Some(ProblemLayout::Horizontal)
    }
}

fn gcd(a: u64, b: u64) -> u64 {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Arithmetic modules
// ────────────────────────────────────────────────────────────────────────────

pub struct AdditionModule;

impl GeneratorModule for AdditionModule {
    fn key(&self) -> &'static str {
        "addition"
    }

    fn title(&self) -> &'static str {
        "Addition"
    }

    fn generate(&self, settings: &ModuleSettings) -> Result<ProblemRecord, GeneratorError> {
        let a = draw_operand(settings.digits)?;
        let b = draw_operand(settings.digits)?;
        Ok(ProblemRecord {
            question: format!("{a} + {b} ="),
            answer: (a + b).to_string(),
            category: self.key().to_string(),
            layout: arithmetic_layout(settings.digits),
            display: None,
        })
    }
}

pub struct SubtractionModule;

impl GeneratorModule for SubtractionModule {
    fn key(&self) -> &'static str {
        "subtraction"
    }

    fn title(&self) -> &'static str {
        "Subtraction"
    }

    fn generate(&self, settings: &ModuleSettings) -> Result<ProblemRecord, GeneratorError> {
        let mut a = draw_operand(settings.digits)?;
        let mut b = draw_operand(settings.digits)?;
        if !settings.allow_negative && b > a {
            std::mem::swap(&mut a, &mut b);
        }
        Ok(ProblemRecord {
            question: format!("{a} - {b} ="),
            answer: (a - b).to_string(),
            category: self.key().to_string(),
            layout: arithmetic_layout(settings.digits),
            display: None,
        })
    }
}

pub struct MultiplicationModule;

impl GeneratorModule for MultiplicationModule {
    fn key(&self) -> &'static str {
        "multiplication"
    }

    fn title(&self) -> &'static str {
        "Multiplication"
    }

    fn default_problems_per_page(&self) -> u32 {
        16
    }

    fn generate(&self, settings: &ModuleSettings) -> Result<ProblemRecord, GeneratorError> {
        let a = draw_operand(settings.digits)?;
        let b = draw_operand(settings.digits.min(2))?;
        Ok(ProblemRecord {
            question: format!("{a} × {b} ="),
            answer: (a * b).to_string(),
            category: self.key().to_string(),
            layout: arithmetic_layout(settings.digits),
            display: None,
        })
    }
}

pub struct DivisionModule;

impl GeneratorModule for DivisionModule {
    fn key(&self) -> &'static str {
        "division"
    }

    fn title(&self) -> &'static str {
        "Division"
    }

    fn default_problems_per_page(&self) -> u32 {
        16
    }

    fn generate(&self, settings: &ModuleSettings) -> Result<ProblemRecord, GeneratorError> {
        // Built from quotient × divisor so the result always divides evenly.
        let quotient = draw_operand(settings.digits)?;
        let divisor = rand::rng().random_range(2..=9_i64);
        let dividend = quotient * divisor;
        Ok(ProblemRecord {
            question: format!("{dividend} ÷ {divisor} ="),
            answer: quotient.to_string(),
            category: self.key().to_string(),
            layout: Some(ProblemLayout::Horizontal),
            display: None,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fractions
// ────────────────────────────────────────────────────────────────────────────

pub struct FractionAdditionModule;

impl GeneratorModule for FractionAdditionModule {
    fn key(&self) -> &'static str {
        "fraction-addition"
    }

    fn title(&self) -> &'static str {
        "Adding Fractions"
    }

    fn default_problems_per_page(&self) -> u32 {
        12
    }

    fn preamble(&self, _settings: &ModuleSettings) -> Option<String> {
        Some("Add the fractions. Write each answer in lowest terms.".to_string())
    }

    fn generate(&self, settings: &ModuleSettings) -> Result<ProblemRecord, GeneratorError> {
        if settings.max_denominator < 2 {
            return Err(GeneratorError::InvalidDenominator(settings.max_denominator));
        }
        let mut rng = rand::rng();
        let d1 = rng.random_range(2..=u64::from(settings.max_denominator));
        let d2 = rng.random_range(2..=u64::from(settings.max_denominator));
        let n1 = rng.random_range(1..d1);
        let n2 = rng.random_range(1..d2);

        let num = n1 * d2 + n2 * d1;
        let den = d1 * d2;
        let g = gcd(num, den);
        let (num, den) = (num / g, den / g);

        Ok(ProblemRecord {
            question: format!("{n1}/{d1} + {n2}/{d2} ="),
            answer: if den == 1 {
                num.to_string()
            } else {
                format!("{num}/{den}")
            },
            category: self.key().to_string(),
            layout: Some(ProblemLayout::Horizontal),
            display: None,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Counting practice sheet
// ────────────────────────────────────────────────────────────────────────────

pub struct CountingModule;

impl GeneratorModule for CountingModule {
    fn key(&self) -> &'static str {
        "counting"
    }

    fn title(&self) -> &'static str {
        "Counting Practice"
    }

    fn practice_sheet(&self) -> bool {
        true
    }

    fn preamble(&self, _settings: &ModuleSettings) -> Option<String> {
        Some("Count the objects and write the number in the box.".to_string())
    }

    fn generate(&self, settings: &ModuleSettings) -> Result<ProblemRecord, GeneratorError> {
        if settings.max_value == 0 {
            return Err(GeneratorError::InvalidMaxValue);
        }
        let count = rand::rng().random_range(1..=settings.max_value);
        Ok(ProblemRecord {
            question: "How many stars?".to_string(),
            answer: count.to_string(),
            category: self.key().to_string(),
            layout: Some(ProblemLayout::Grid),
            display: Some("★".repeat(count as usize)),
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Registry
// ────────────────────────────────────────────────────────────────────────────

/// Wire-facing module description for the listing endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleInfo {
    pub key: &'static str,
    pub title: &'static str,
    pub practice_sheet: bool,
    pub default_problems_per_page: u32,
}

/// Lookup table of all registered modules, built once at startup.
pub struct ModuleRegistry {
    modules: HashMap<&'static str, Arc<dyn GeneratorModule>>,
}

impl ModuleRegistry {
    pub fn with_builtins() -> Self {
        let mut registry = ModuleRegistry {
            modules: HashMap::new(),
        };
        registry.register(Arc::new(AdditionModule));
        registry.register(Arc::new(SubtractionModule));
        registry.register(Arc::new(MultiplicationModule));
        registry.register(Arc::new(DivisionModule));
        registry.register(Arc::new(FractionAdditionModule));
        registry.register(Arc::new(CountingModule));
        registry
    }

    pub fn register(&mut self, module: Arc<dyn GeneratorModule>) {
        self.modules.insert(module.key(), module);
    }

    pub fn get(&self, key: &str) -> Option<Arc<dyn GeneratorModule>> {
        self.modules.get(key).cloned()
    }

    /// All modules, sorted by key for a stable listing.
    pub fn list(&self) -> Vec<ModuleInfo> {
        let mut infos: Vec<ModuleInfo> = self
            .modules
            .values()
            .map(|m| ModuleInfo {
                key: m.key(),
                title: m.title(),
                practice_sheet: m.practice_sheet(),
                default_problems_per_page: m.default_problems_per_page(),
            })
            .collect();
        infos.sort_by_key(|info| info.key);
        infos
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
