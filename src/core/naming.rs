//! Name forms derived from a model's canonical name
//!
//! `ResourceNames::derive("BlogPost")` yields every casing the HTTP surface
//! and the store need (`blog_posts`, `blog-posts`, `BlogPosts`, ...). The
//! derivation only depends on the word sequence of the input, so deriving
//! again from any of the produced forms gives back the same set.

use serde::Serialize;

/// All casings of a resource name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNames {
    /// `BlogPost`
    pub singular: String,
    /// `BlogPosts`
    pub plural: String,
    /// `blog_post`
    pub snake_singular: String,
    /// `blog_posts`
    pub snake_plural: String,
    /// `blog-post`
    pub kebab_singular: String,
    /// `blog-posts`
    pub kebab_plural: String,
}

impl ResourceNames {
    /// Derive every name form from a singular model name
    ///
    /// # Examples
    ///
    /// ```
    /// use warden::core::naming::ResourceNames;
    ///
    /// let names = ResourceNames::derive("BlogCategory");
    /// assert_eq!(names.plural, "BlogCategories");
    /// assert_eq!(names.snake_plural, "blog_categories");
    /// assert_eq!(names.kebab_plural, "blog-categories");
    /// ```
    pub fn derive(name: &str) -> Self {
        let words = split_words(name);
        let mut plural_words = words.clone();
        if let Some(last) = plural_words.last_mut() {
            *last = pluralize_word(last);
        }

        Self {
            singular: pascal(&words),
            plural: pascal(&plural_words),
            snake_singular: joined(&words, "_"),
            snake_plural: joined(&plural_words, "_"),
            kebab_singular: joined(&words, "-"),
            kebab_plural: joined(&plural_words, "-"),
        }
    }

    /// Every form, for name-based lookups
    pub fn all(&self) -> [&str; 6] {
        [
            &self.singular,
            &self.plural,
            &self.snake_singular,
            &self.snake_plural,
            &self.kebab_singular,
            &self.kebab_plural,
        ]
    }
}

/// Convert a camelCase, PascalCase or kebab-case identifier to snake_case
pub fn to_snake_case(name: &str) -> String {
    joined(&split_words(name), "_")
}

/// Split an identifier into words on separators and case boundaries
///
/// Acronyms stay together: `HTTPRequest` splits as `HTTP`, `Request`.
fn split_words(name: &str) -> Vec<String> {
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut current = String::new();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c.is_whitespace() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }

        if c.is_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
            let boundary = prev.is_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_uppercase() && next_is_lower);
            if boundary {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }

    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn joined(words: &[String], separator: &str) -> String {
    words
        .iter()
        .map(|w| w.to_lowercase())
        .collect::<Vec<_>>()
        .join(separator)
}

fn pascal(words: &[String]) -> String {
    words.iter().map(|w| capitalize(w)).collect()
}

fn capitalize(word: &str) -> String {
    // Acronyms keep their casing
    if word.len() > 1 && word.chars().all(|c| !c.is_lowercase()) {
        return word.to_string();
    }
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("datum", "data"),
];

const UNCOUNTABLE: &[&str] = &["data", "info", "information", "media", "news", "series", "metadata"];

/// Plural of a single English word, preserving an all-caps acronym
fn pluralize_word(word: &str) -> String {
    let acronym = word.len() > 1 && word.chars().all(|c| !c.is_lowercase());
    let lower = word.to_lowercase();
    let plural = pluralize_lower(&lower);

    if acronym {
        return format!("{}s", word);
    }
    if word.chars().next().is_some_and(char::is_uppercase) {
        capitalize(&plural)
    } else {
        plural
    }
}

fn pluralize_lower(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }
    if let Some((_, plural)) = IRREGULAR.iter().find(|(singular, _)| *singular == word) {
        return plural.to_string();
    }

    let stem_before = |n: usize| &word[..word.len() - n];
    let penultimate = word.chars().rev().nth(1);
    let is_vowel = |c: char| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u');

    if word.ends_with('y') && penultimate.is_some_and(|c| !is_vowel(c)) {
        format!("{}ies", stem_before(1))
    } else if ["s", "sh", "ch", "x", "z"].iter().any(|s| word.ends_with(s)) {
        format!("{}es", word)
    } else if word.ends_with("fe") && word.len() > 2 {
        format!("{}ves", stem_before(2))
    } else if word.ends_with('f') && !word.ends_with("ff") && word.len() > 1 {
        format!("{}ves", stem_before(1))
    } else if word.ends_with('o') && penultimate.is_some_and(|c| !is_vowel(c)) {
        match word {
            "photo" | "piano" | "halo" | "memo" | "logo" | "video" | "demo" => format!("{}s", word),
            _ => format!("{}es", word),
        }
    } else {
        format!("{}s", word)
    }
}
