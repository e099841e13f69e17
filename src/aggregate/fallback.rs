//! Fixed answers for when every source came back empty.

use crate::quote::{Category, Quote, SourceId, DEFAULT_QUALITY, UNKNOWN_AUTHOR};
use crate::tagging::classify_origin;
use std::collections::BTreeSet;

fn entry(category: Option<Category>) -> (&'static str, &'static str) {
    match category {
        Some(Category::Wisdom) => ("Знание — сила.", "Фрэнсис Бэкон"),
        Some(Category::Motivation) => (
            "Дорогу осилит идущий.",
            "Народная мудрость",
        ),
        Some(Category::Life) => (
            "Жизнь — это то, что с тобой происходит, пока ты строишь планы.",
            "Джон Леннон",
        ),
        Some(Category::Love) => ("Любовь долготерпит, милосердствует.", "Апостол Павел"),
        Some(Category::Success) => (
            "Успех — это способность идти от неудачи к неудаче, не теряя энтузиазма.",
            "Уинстон Черчилль",
        ),
        Some(Category::Happiness) => (
            "Счастье — это когда тебя понимают.",
            "Георгий Полонский",
        ),
        Some(Category::Humor) => (
            "Если долго мучиться, что-нибудь получится.",
            UNKNOWN_AUTHOR,
        ),
        None => ("Всё будет хорошо.", UNKNOWN_AUTHOR),
    }
}

/// The fallback quote for a category. Never fails.
pub fn quote_for(category: Option<Category>) -> Quote {
    let (text, author) = entry(category);
    let tags: BTreeSet<String> = category.map(|c| c.slug().to_string()).into_iter().collect();
    Quote {
        text: text.to_string(),
        author: author.to_string(),
        origin_class: classify_origin(author),
        tags,
        source_id: SourceId::Fallback,
        quality_score: DEFAULT_QUALITY,
    }
}
