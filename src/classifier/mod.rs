//! Category suggestion for free-text donation descriptions.
//!
//! Two stages: a deterministic keyword cascade that always produces a label,
//! and a best-effort generative-AI refinement that may override it. Faults in
//! the AI stage never reach the caller; the cascade result is the floor.

mod gemini;

pub use gemini::{GeminiClient, GenerativeModel};

/// The closed vocabulary. Every classification result is one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Clothes,
    Books,
    Toys,
    Electronics,
    Furniture,
    Footwear,
    EducationalMaterials,
    HouseholdItems,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Clothes => "Clothes",
            Category::Books => "Books",
            Category::Toys => "Toys",
            Category::Electronics => "Electronics",
            Category::Furniture => "Furniture",
            Category::Footwear => "Footwear",
            Category::EducationalMaterials => "Educational Materials",
            Category::HouseholdItems => "Household Items",
        }
    }
}

/// Ordered keyword rules, first match wins. The order is part of the
/// contract: rules are not mutually exclusive, so a description containing
/// both "book" and "toy" resolves to Books. "Educational Materials" has no
/// rule on purpose; it is reachable only through the AI reply.
const KEYWORD_RULES: &[(&[&str], Category)] = &[
    (&["book", "textbook", "notebook"], Category::Books),
    (&["toy"], Category::Toys),
    (&["laptop", "mobile", "charger"], Category::Electronics),
    (&["shoe", "slipper"], Category::Footwear),
    (&["shirt", "pant", "jacket"], Category::Clothes),
    (&["table", "chair"], Category::Furniture),
];

/// Ordered scan keys for the AI reply. The first key contained anywhere in
/// the lower-cased reply decides the category.
const REPLY_KEYS: &[(&str, Category)] = &[
    ("clothes", Category::Clothes),
    ("books", Category::Books),
    ("toys", Category::Toys),
    ("electronics", Category::Electronics),
    ("furniture", Category::Furniture),
    ("footwear", Category::Footwear),
    ("educational", Category::EducationalMaterials),
    ("household", Category::HouseholdItems),
];

/// Deterministic stage. `description` must already be lower-cased.
fn fallback_category(description: &str) -> Category {
    for (keywords, category) in KEYWORD_RULES {
        if keywords.iter().any(|k| description.contains(k)) {
            return *category;
        }
    }
    Category::HouseholdItems
}

fn build_prompt(description: &str) -> String {
    format!(
        "Choose ONE category from this list ONLY:\n\
         Clothes, Books, Toys, Electronics, Furniture, Footwear, \
         Educational Materials, Household Items.\n\n\
         Description: {}\n\
         Return only the category name.",
        description
    )
}

/// AI stage: map a model reply onto the vocabulary, or nothing.
fn refine_from_reply(reply: &str) -> Option<Category> {
    let reply = reply.to_lowercase();
    REPLY_KEYS
        .iter()
        .find(|(key, _)| reply.contains(key))
        .map(|(_, category)| *category)
}

/// Suggests a category for a free-text description. Total: always returns a
/// vocabulary label, regardless of input or AI availability. Issues at most
/// one model call, with no retries and no caching.
pub async fn classify(description: &str, model: Option<&dyn GenerativeModel>) -> Category {
    let description = description.to_lowercase();
    let fallback = fallback_category(&description);

    let Some(model) = model else {
        return fallback;
    };

    match model.generate(&build_prompt(&description)).await {
        Ok(reply) => refine_from_reply(&reply).unwrap_or(fallback),
        Err(e) => {
            tracing::warn!("AI category suggestion failed, using fallback: {:#}", e);
            fallback
        }
    }
}
