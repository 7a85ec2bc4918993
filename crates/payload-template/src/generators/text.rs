//! Free-text generators: word-salad sentences and sentiment phrases.

use rand::Rng;

pub const SENTIMENT_OPENERS: [&str; 6] = ["I love", "I hate", "I think", "I feel", "I wish", "I see"];
pub const SENTIMENT_ADJECTIVES: [&str; 6] =
    ["great", "terrible", "amazing", "awful", "funny", "boring"];
pub const SENTIMENT_OBJECTS: [&str; 6] = [
    "this product",
    "the service",
    "the movie",
    "the food",
    "the weather",
    "the app",
];

const WORDS: [&str; 48] = [
    "lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit", "sed", "do",
    "eiusmod", "tempor", "incididunt", "ut", "labore", "et", "dolore", "magna", "aliqua", "enim",
    "ad", "minim", "veniam", "quis", "nostrud", "exercitation", "ullamco", "laboris", "nisi",
    "aliquip", "ex", "ea", "commodo", "consequat", "duis", "aute", "irure", "in", "reprehenderit",
    "voluptate", "velit", "esse", "cillum", "fugiat", "nulla", "pariatur", "excepteur", "sint",
];

const MIN_WORDS: usize = 4;
const MAX_WORDS: usize = 12;

fn pick<'a, R: Rng>(rng: &mut R, items: &[&'a str]) -> &'a str {
    items[rng.random_range(0..items.len())]
}

/// `<opener> <adjective> <object>`, one pick from each fixed list.
pub fn generate_sentiment<R: Rng>(rng: &mut R) -> String {
    let opener = pick(rng, &SENTIMENT_OPENERS);
    let adjective = pick(rng, &SENTIMENT_ADJECTIVES);
    let object = pick(rng, &SENTIMENT_OBJECTS);
    format!("{opener} {adjective} {object}")
}

/// A capitalised sentence of random words ending with a period.
pub fn generate_sentence<R: Rng>(rng: &mut R) -> String {
    let count = rng.random_range(MIN_WORDS..=MAX_WORDS);
    let words: Vec<&str> = (0..count).map(|_| pick(rng, &WORDS)).collect();
    let sentence = words.join(" ");

    let mut chars = sentence.chars();
    match chars.next() {
        Some(first) => format!("{}{}.", first.to_uppercase(), chars.as_str()),
        None => String::from("."),
    }
}
