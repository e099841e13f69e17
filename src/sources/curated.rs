//! Hand-picked in-process collection. Always available.

use async_trait::async_trait;
use std::sync::Arc;

use super::{QuoteSource, SourceError};
use crate::quote::{Category, Quote, SourceId};
use crate::random::RandomSource;

// (text, author, tags, quality)
const ENTRIES: &[(&str, &str, &[&str], u8)] = &[
    ("Чтобы поверить в добро, надо начать делать его.", "Лев Толстой", &["wisdom", "life"], 9),
    ("Все счастливые семьи похожи друг на друга, каждая несчастливая семья несчастлива по-своему.", "Лев Толстой", &["life", "happiness"], 8),
    ("Красота спасёт мир.", "Фёдор Достоевский", &["wisdom"], 8),
    ("Тайна бытия человеческого не в том, чтобы только жить, а в том, для чего жить.", "Фёдор Достоевский", &["life", "wisdom"], 9),
    ("Краткость — сестра таланта.", "Антон Чехов", &["wisdom", "humor"], 8),
    ("В человеке должно быть всё прекрасно: и лицо, и одежда, и душа, и мысли.", "Антон Чехов", &["life"], 8),
    ("Любви все возрасты покорны.", "Александр Пушкин", &["love"], 8),
    ("Я вас любил: любовь ещё, быть может, в душе моей угасла не совсем.", "Александр Пушкин", &["love"], 9),
    ("Рукописи не горят.", "Михаил Булгаков", &["wisdom"], 8),
    ("Никогда и ничего не просите! Никогда и ничего, и в особенности у тех, кто сильнее вас.", "Михаил Булгаков", &["wisdom", "success"], 7),
    ("Человек — это звучит гордо!", "Максим Горький", &["motivation"], 7),
    ("Рождённый ползать летать не может.", "Максим Горький", &["motivation"], 7),
    ("Счастье не в том, чтобы делать всегда, что хочешь, а в том, чтобы всегда хотеть того, что делаешь.", "Лев Толстой", &["happiness", "success"], 9),
    ("Смех — это солнце: оно прогоняет зиму с человеческого лица.", "Виктор Гюго", &["humor", "happiness"], 7),
    ("Ученье — свет, а неученье — тьма.", "Александр Суворов", &["wisdom", "motivation"], 7),
    ("Тяжело в учении — легко в бою.", "Александр Суворов", &["motivation", "success"], 8),
    ("The only true wisdom is in knowing you know nothing.", "Socrates", &["wisdom"], 8),
    ("The unexamined life is not worth living.", "Socrates", &["life", "wisdom"], 8),
    ("It does not matter how slowly you go as long as you do not stop.", "Confucius", &["motivation", "success"], 8),
    ("Happiness depends upon ourselves.", "Aristotle", &["happiness"], 7),
    ("Success is not final, failure is not fatal: it is the courage to continue that counts.", "Winston Churchill", &["success", "motivation"], 9),
    ("The best way to predict the future is to create it.", "Peter Drucker", &["success", "motivation"], 7),
    ("Life is what happens when you're busy making other plans.", "John Lennon", &["life"], 7),
    ("Where there is love there is life.", "Mahatma Gandhi", &["love", "life"], 8),
    ("Love all, trust a few, do wrong to none.", "William Shakespeare", &["love", "wisdom"], 8),
    ("I have not failed. I've just found 10,000 ways that won't work.", "Thomas Edison", &["success", "humor"], 8),
    ("I can resist everything except temptation.", "Oscar Wilde", &["humor"], 7),
    ("Always forgive your enemies; nothing annoys them so much.", "Oscar Wilde", &["humor", "wisdom"], 8),
    ("Happiness is not something ready made. It comes from your own actions.", "Dalai Lama", &["happiness", "motivation"], 8),
    ("The purpose of our lives is to be happy.", "Dalai Lama", &["happiness", "life"], 7),
];

/// Every curated quote, in declaration order.
pub fn collection() -> Vec<Quote> {
    ENTRIES
        .iter()
        .filter_map(|(text, author, tags, quality)| {
            Quote::new(text, author, SourceId::Curated).map(|q| {
                q.with_tags(tags.iter().copied().chain(["curated"]))
                    .with_quality(*quality)
            })
        })
        .collect()
}

pub struct CuratedSource {
    quotes: Vec<Quote>,
    rng: Arc<dyn RandomSource>,
}

impl CuratedSource {
    pub fn new(rng: Arc<dyn RandomSource>) -> Self {
        Self {
            quotes: collection(),
            rng,
        }
    }

    /// Candidates for a category; the whole collection when none match.
    fn candidates(&self, category: Option<Category>) -> Vec<&Quote> {
        let all: Vec<&Quote> = self.quotes.iter().collect();
        match category {
            Some(c) => {
                let matching: Vec<&Quote> =
                    self.quotes.iter().filter(|q| q.has_tag(c.slug())).collect();
                if matching.is_empty() {
                    all
                } else {
                    matching
                }
            }
            None => all,
        }
    }
}

#[async_trait]
impl QuoteSource for CuratedSource {
    fn id(&self) -> SourceId {
        SourceId::Curated
    }

    async fn fetch_quote(&self, category: Option<Category>) -> Result<Quote, SourceError> {
        let pool = self.candidates(category);
        if pool.is_empty() {
            return Err(SourceError::Empty);
        }
        let idx = self.rng.pick_index(pool.len());
        Ok(pool[idx].clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quote::OriginClass;
    use crate::random::SequenceRandom;

    #[test]
    fn collection_is_well_formed() {
        let all = collection();
        assert_eq!(all.len(), ENTRIES.len());
        assert!(all.iter().all(|q| q.has_tag("curated")));
        assert!(all.iter().all(|q| (7..=9).contains(&q.quality_score)));
        assert!(all.iter().any(|q| q.origin_class == OriginClass::Domestic));
        assert!(all.iter().any(|q| q.origin_class == OriginClass::Foreign));
        for c in Category::ALL {
            assert!(
                all.iter().any(|q| q.has_tag(c.slug())),
                "no curated quote for {c}"
            );
        }
    }

    #[tokio::test]
    async fn picks_within_category() {
        let src = CuratedSource::new(Arc::new(SequenceRandom::new(vec![], vec![0, 1, 2, 3])));
        for _ in 0..4 {
            let q = src.fetch_quote(Some(Category::Love)).await.unwrap();
            assert!(q.has_tag("love"));
            assert_eq!(q.source_id, SourceId::Curated);
        }
    }
}
