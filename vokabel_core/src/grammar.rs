//! Built-in grammar notes served when no remote content service is wired up.

use crate::{Example, Explanation, QuickCheck};
use once_cell::sync::Lazy;

struct CatalogEntry {
    aliases: &'static [&'static str],
    explanation: Explanation,
}

/// Built once and reused across lookups
static GRAMMAR_CATALOG: Lazy<Vec<CatalogEntry>> = Lazy::new(build_catalog);

/// Find a built-in explanation by topic name or alias (case-insensitive)
pub fn lookup(topic: &str) -> Option<&'static Explanation> {
    let wanted = topic.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    GRAMMAR_CATALOG
        .iter()
        .find(|entry| {
            entry.explanation.topic.to_lowercase() == wanted
                || entry.aliases.iter().any(|alias| *alias == wanted)
        })
        .map(|entry| &entry.explanation)
}

/// Topic names available offline
pub fn topics() -> Vec<&'static str> {
    GRAMMAR_CATALOG
        .iter()
        .map(|entry| entry.explanation.topic.as_str())
        .collect()
}

fn row(cells: &[&str]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

fn example(de: &str, en: &str) -> Example {
    Example {
        de: de.into(),
        en: en.into(),
    }
}

fn check(q: &str, a: &str) -> QuickCheck {
    QuickCheck {
        q: q.into(),
        a: a.into(),
    }
}

fn build_catalog() -> Vec<CatalogEntry> {
    vec![
        CatalogEntry {
            aliases: &["artikel", "kasus", "articles", "cases"],
            explanation: Explanation {
                topic: "Artikel und Kasus".into(),
                summary: "Der bestimmte Artikel zeigt Genus und Kasus. \
                          Das Verb oder die Präposition bestimmt den Kasus."
                    .into(),
                rule_table: vec![
                    row(&["Kasus", "maskulin", "feminin", "neutral", "Plural"]),
                    row(&["Nominativ", "der", "die", "das", "die"]),
                    row(&["Akkusativ", "den", "die", "das", "die"]),
                    row(&["Dativ", "dem", "der", "dem", "den"]),
                    row(&["Genitiv", "des", "der", "des", "der"]),
                ],
                examples: vec![
                    example("Der Tisch ist neu.", "The table is new."),
                    example("Ich kaufe den Tisch.", "I am buying the table."),
                    example("Das Buch liegt auf dem Tisch.", "The book is on the table."),
                ],
                quick_check: vec![
                    check("Ich sehe ___ Hund. (der Hund)", "den"),
                    check("Ich helfe ___ Frau. (die Frau)", "der"),
                ],
            },
        },
        CatalogEntry {
            aliases: &["dativ", "dative", "dativ-artikel"],
            explanation: Explanation {
                topic: "Dativartikel".into(),
                summary: "Im Dativ: dem (m/n), der (f), den (Plural, Nomen + n). \
                          Nach mit, bei, von, zu, aus, nach, seit immer Dativ."
                    .into(),
                rule_table: vec![
                    row(&["Genus", "bestimmt", "unbestimmt"]),
                    row(&["maskulin", "dem", "einem"]),
                    row(&["feminin", "der", "einer"]),
                    row(&["neutral", "dem", "einem"]),
                    row(&["Plural", "den", "-"]),
                ],
                examples: vec![
                    example("Ich fahre mit dem Bus.", "I take the bus."),
                    example("Sie gibt der Lehrerin das Heft.", "She gives the teacher the notebook."),
                ],
                quick_check: vec![
                    check("Ich wohne bei ___ Eltern.", "den"),
                    check("Er kommt aus ___ Schweiz.", "der"),
                ],
            },
        },
        CatalogEntry {
            aliases: &["plural", "plurals", "mehrzahl"],
            explanation: Explanation {
                topic: "Pluralbildung".into(),
                summary: "Deutsche Nomen bilden den Plural mit -e, -er, -n/-en, -s oder ohne Endung, \
                          oft mit Umlaut. Der Artikel im Plural ist immer die."
                    .into(),
                rule_table: vec![
                    row(&["Endung", "Singular", "Plural"]),
                    row(&["-e", "der Tisch", "die Tische"]),
                    row(&["-er", "das Kind", "die Kinder"]),
                    row(&["-(e)n", "die Frau", "die Frauen"]),
                    row(&["-s", "das Auto", "die Autos"]),
                    row(&["-", "der Lehrer", "die Lehrer"]),
                ],
                examples: vec![example("Die Kinder spielen.", "The children are playing.")],
                quick_check: vec![check("das Buch → die ___", "Bücher")],
            },
        },
        CatalogEntry {
            aliases: &["wortstellung", "word order", "verb position"],
            explanation: Explanation {
                topic: "Verbposition".into(),
                summary: "Im Hauptsatz steht das konjugierte Verb an Position 2. \
                          Im Nebensatz steht es am Ende."
                    .into(),
                rule_table: vec![
                    row(&["Satz", "Position 1", "Position 2", "Ende"]),
                    row(&["Hauptsatz", "Heute", "lerne", "ich Deutsch."]),
                    row(&["Nebensatz", "..., weil", "ich Deutsch", "lerne."]),
                ],
                examples: vec![
                    example("Morgen fahre ich nach Berlin.", "Tomorrow I am going to Berlin."),
                    example("Ich bleibe zu Hause, weil ich krank bin.", "I am staying home because I am ill."),
                ],
                quick_check: vec![check("Heute (ich / arbeiten) ...", "Heute arbeite ich.")],
            },
        },
    ]
}
