// src/tagging.rs
//! Keyword tagging and origin classification shared by every adapter.

use once_cell::sync::Lazy;
use std::collections::{BTreeSet, HashSet};

use crate::quote::{normalize, Category, OriginClass};

/// Words that mark a text as belonging to a category.
/// A trailing `*` makes the entry a stem matched with `starts_with`; everything else
/// must equal a whole token. Entries with a space are matched as phrases.
fn keywords(category: Category) -> &'static [&'static str] {
    match category {
        Category::Wisdom => &[
            "wisdom", "wise", "wiser", "knowledge", "know", "knows", "knowing", "truth", "mind",
            "minds", "understand*", "learn*", "think*", "thought*", "мудр*", "знани*", "истин*",
            "ум", "ума", "уме", "умом", "умный", "умная", "умное", "умные", "умнее",
        ],
        Category::Motivation => &[
            "dream*", "goal*", "action*", "begin*", "start*", "effort*", "persever*", "courage*",
            "try", "trying", "never give", "motivat*", "мечт*", "цель", "цели", "целью", "целей",
            "действ*", "смел*",
        ],
        Category::Life => &[
            "life", "live", "lives", "living", "death", "die", "dies", "dying", "time", "times",
            "world", "жизн*", "жить", "живи", "живите", "смерт*", "время", "времени",
        ],
        Category::Love => &[
            "love*", "loving", "heart*", "kindness", "friend*", "любов*", "люблю", "любить",
            "любит", "любимы*", "любима*", "сердц*", "сердце",
        ],
        Category::Success => &[
            "success*", "succeed*", "achiev*", "failure*", "fail", "fails", "failed", "win",
            "wins", "winner*", "winning", "work", "works", "working", "успех*", "успеш*", "труд",
            "труда", "трудом", "трудолюб*", "побед*",
        ],
        Category::Happiness => &[
            "happy", "happiness", "joy*", "smile*", "cheer*", "счаст*", "радост*", "улыб*",
        ],
        Category::Humor => &[
            "funny", "laugh*", "joke*", "humor*", "humour*", "fool*", "смех*", "шутк*", "шути*",
            "смеш*",
        ],
    }
}

fn keyword_matches(tokens: &[&str], joined: &str, kw: &str) -> bool {
    if kw.contains(' ') {
        return joined.contains(kw);
    }
    match kw.strip_suffix('*') {
        Some(stem) => tokens.iter().any(|t| t.starts_with(stem)),
        None => tokens.iter().any(|t| *t == kw),
    }
}

fn matches_category(tokens: &[&str], joined: &str, category: Category) -> bool {
    keywords(category)
        .iter()
        .any(|kw| keyword_matches(tokens, joined, kw))
}

/// Infer category tags for an item from its text.
///
/// The requested category is checked first; any other category whose
/// keywords occur in the text is added as well.
pub fn infer_tags(text: &str, requested: Option<Category>) -> BTreeSet<String> {
    let joined = normalize(text);
    let tokens: Vec<&str> = joined.split(' ').filter(|t| !t.is_empty()).collect();

    let mut tags = BTreeSet::new();
    if let Some(c) = requested {
        if matches_category(&tokens, &joined, c) {
            tags.insert(c.slug().to_string());
        }
    }
    for c in Category::ALL {
        if Some(c) != requested && matches_category(&tokens, &joined, c) {
            tags.insert(c.slug().to_string());
        }
    }
    tags
}

/// Map a provider-specific tag onto one of our categories, if it has a counterpart.
pub fn canonical_tag(raw: &str) -> Option<Category> {
    let t = raw.trim().to_lowercase();
    let c = match t.as_str() {
        "wisdom" | "knowledge" | "philosophy" | "truth" => Category::Wisdom,
        "motivation" | "motivational" | "inspirational" | "inspiration" | "courage" => {
            Category::Motivation
        }
        "life" => Category::Life,
        "love" | "friendship" => Category::Love,
        "success" | "business" | "work" => Category::Success,
        "happiness" | "happy" => Category::Happiness,
        "humor" | "humorous" | "humour" | "funny" => Category::Humor,
        _ => return None,
    };
    Some(c)
}

/// Known domestic authors, stored normalized (see [`normalize`]) with `ё` folded to `е`.
static DOMESTIC_AUTHORS: Lazy<HashSet<String>> = Lazy::new(|| {
    [
        "Leo Tolstoy",
        "Lev Tolstoy",
        "Tolstoy",
        "Fyodor Dostoevsky",
        "Fyodor Dostoyevsky",
        "Dostoevsky",
        "Anton Chekhov",
        "Chekhov",
        "Alexander Pushkin",
        "Pushkin",
        "Ivan Turgenev",
        "Nikolai Gogol",
        "Mikhail Bulgakov",
        "Maxim Gorky",
        "Mikhail Lermontov",
        "Boris Pasternak",
        "Anna Akhmatova",
        "Ivan Bunin",
        "Marina Tsvetaeva",
        "Sergei Yesenin",
        "Vladimir Mayakovsky",
        "Mikhail Lomonosov",
        "Dmitri Mendeleev",
        "Ivan Pavlov",
        "Alexander Solzhenitsyn",
        "Kozma Prutkov",
        "Alexander Suvorov",
        "Лев Толстой",
        "Лев Николаевич Толстой",
        "Толстой",
        "Фёдор Достоевский",
        "Федор Михайлович Достоевский",
        "Достоевский",
        "Антон Чехов",
        "Антон Павлович Чехов",
        "Чехов",
        "Александр Пушкин",
        "Александр Сергеевич Пушкин",
        "Пушкин",
        "Иван Тургенев",
        "Николай Гоголь",
        "Михаил Булгаков",
        "Максим Горький",
        "Михаил Лермонтов",
        "Борис Пастернак",
        "Анна Ахматова",
        "Иван Бунин",
        "Марина Цветаева",
        "Сергей Есенин",
        "Владимир Маяковский",
        "Михаил Ломоносов",
        "Дмитрий Менделеев",
        "Иван Павлов",
        "Александр Солженицын",
        "Козьма Прутков",
        "Александр Суворов",
    ]
    .iter()
    .map(|name| fold_author(name))
    .collect()
});

fn fold_author(name: &str) -> String {
    normalize(name).replace('ё', "е")
}

/// Static membership lookup; unknown authors are foreign.
pub fn classify_origin(author: &str) -> OriginClass {
    if DOMESTIC_AUTHORS.contains(&fold_author(author)) {
        OriginClass::Domestic
    } else {
        OriginClass::Foreign
    }
}
