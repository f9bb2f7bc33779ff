use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{NutritionCategory, NutritionItem, NutritionPlan};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    Amount,
    Description,
}

impl Field {
    const ALL: [Field; 3] = [Field::Name, Field::Amount, Field::Description];

    fn label(&self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Amount => "Amount",
            Field::Description => "Description",
        }
    }

    fn slot<'a>(&self, item: &'a mut NutritionItem) -> &'a mut String {
        match self {
            Field::Name => &mut item.name,
            Field::Amount => &mut item.amount,
            Field::Description => &mut item.description,
        }
    }
}

lazy_static! {
    // "<Heading>:" up to a blank line or end of text.
    static ref SECTION_PATTERNS: Vec<(NutritionCategory, Regex)> = NutritionCategory::ALL
        .iter()
        .map(|category| {
            let pattern = format!(r"(?is){}:(.*?)(?:\n\n|$)", regex::escape(category.heading()));
            (*category, Regex::new(&pattern).expect("valid section pattern"))
        })
        .collect();

    // "<Field>:" up to the end of the line.
    static ref FIELD_PATTERNS: Vec<(Field, Regex)> = Field::ALL
        .iter()
        .map(|field| {
            let pattern = format!(r"(?i){}:[ \t]*(.+?)(?:\n|$)", regex::escape(field.label()));
            (*field, Regex::new(&pattern).expect("valid field pattern"))
        })
        .collect();
}

/// Prompt asking for a plan in the layout `parse_nutrition_response` understands.
pub fn nutrition_prompt(breed: &str) -> String {
    let mut prompt = format!(
        "You are an expert in cattle nutrition. Provide a detailed nutrition plan for a {} cow in this exact format:\n\n",
        breed
    );

    for category in NutritionCategory::ALL {
        prompt.push_str(&format!(
            "{}:\n\
             - Name: [specific {} type]\n\
             - Amount: [daily amount with units]\n\
             - Description: [1-2 sentence benefit explanation]\n\n",
            category.heading(),
            category.heading().to_lowercase()
        ));
    }

    prompt.push_str("Include seasonal considerations and use metric units.");
    prompt
}

/// Turn free-form plan text into a fully populated `NutritionPlan`.
///
/// Starts from the default plan and overwrites only the fields that could be
/// found, so a missing section or a missing line keeps its default value.
pub fn parse_nutrition_response(text: &str) -> NutritionPlan {
    let text = text.replace("\r\n", "\n");
    let mut plan = NutritionPlan::default();

    for category in NutritionCategory::ALL {
        let Some(section) = extract_section(&text, category) else {
            log::debug!("Nutrition section '{}' not found, keeping defaults", category.heading());
            continue;
        };

        let item = plan.item_mut(category);
        for field in Field::ALL {
            if let Some(value) = extract_value(section, field) {
                *field.slot(item) = value.to_string();
            }
        }
    }

    plan
}

fn extract_section(text: &str, category: NutritionCategory) -> Option<&str> {
    let (_, pattern) = SECTION_PATTERNS.iter().find(|(c, _)| *c == category)?;
    let section = pattern.captures(text)?.get(1)?.as_str().trim();
    (!section.is_empty()).then_some(section)
}

fn extract_value(section: &str, field: Field) -> Option<&str> {
    let (_, pattern) = FIELD_PATTERNS.iter().find(|(f, _)| *f == field)?;
    let value = pattern.captures(section)?.get(1)?.as_str().trim();
    (!value.is_empty()).then_some(value)
}
