use crate::chords::catalog::{ChordCatalog, Voicing};

/// A chord name split into catalog root key and suffix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordName {
    pub root: String,
    pub suffix: String,
}

/// Roots spelled one way by players and the other way by the catalog.
const ENHARMONIC: &[(&str, &str)] = &[
    ("Db", "Csharp"),
    ("Dsharp", "Eb"),
    ("Gb", "Fsharp"),
    ("Gsharp", "Ab"),
    ("Asharp", "Bb"),
];

/// Split `Am`, `F#m7`, `Bbmaj7` into catalog root and suffix.
///
/// Empty suffix reads as `major`, a bare `m` as `minor`; anything else is
/// passed through as catalog vocabulary (`7`, `m7`, `sus4`, ...).
pub fn parse_chord_name(name: &str) -> Option<ChordName> {
    let name = name.trim();
    let mut chars = name.chars();
    let letter = chars.next().filter(|c| ('A'..='G').contains(c))?;
    let rest = chars.as_str();

    let (root, suffix) = if let Some(s) = rest.strip_prefix('#') {
        (format!("{letter}sharp"), s)
    } else if let Some(s) = rest.strip_prefix('b') {
        (format!("{letter}b"), s)
    } else {
        (letter.to_string(), rest)
    };

    let suffix = match suffix {
        "" => "major",
        "m" => "minor",
        other => other,
    };

    Some(ChordName {
        root,
        suffix: suffix.to_string(),
    })
}

impl ChordCatalog {
    /// All voicings of a chord in catalog order; index 0 is the default.
    ///
    /// `None` means the name is not a chord this catalog can draw.
    pub fn resolve(&self, chord_name: &str) -> Option<&[Voicing]> {
        let parsed = parse_chord_name(chord_name)?;
        let entry = self.lookup(&parsed.root, &parsed.suffix).or_else(|| {
            let (_, alias) = ENHARMONIC.iter().find(|(from, _)| *from == parsed.root)?;
            self.lookup(alias, &parsed.suffix)
        })?;
        Some(entry.positions.as_slice())
    }

    pub fn is_valid(&self, chord_name: &str) -> bool {
        self.resolve(chord_name).is_some_and(|v| !v.is_empty())
    }
}

/// Resolve against the bundled catalog.
pub fn resolve(chord_name: &str) -> Option<&'static [Voicing]> {
    ChordCatalog::bundled().resolve(chord_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_root_and_suffix() {
        let p = |n: &str| parse_chord_name(n).map(|c| (c.root, c.suffix));
        assert_eq!(p("Am"), Some(("A".into(), "minor".into())));
        assert_eq!(p("G"), Some(("G".into(), "major".into())));
        assert_eq!(p("G7"), Some(("G".into(), "7".into())));
        assert_eq!(p("F#"), Some(("Fsharp".into(), "major".into())));
        assert_eq!(p("F#m"), Some(("Fsharp".into(), "minor".into())));
        assert_eq!(p("Bbmaj7"), Some(("Bb".into(), "maj7".into())));
        assert_eq!(p("Esus4"), Some(("E".into(), "sus4".into())));
        assert_eq!(p("x"), None);
        assert_eq!(p(""), None);
    }

    #[test]
    fn resolves_known_chords_and_is_stable() {
        let first = resolve("Am").unwrap();
        let second = resolve("Am").unwrap();
        assert_eq!(first, second);
        assert_eq!(first[0].frets, [-1, 0, 2, 2, 1, 0]);
    }

    #[test]
    fn unknown_chords_resolve_to_none() {
        assert!(resolve("Xx").is_none());
        assert!(resolve("Am13b9").is_none());
        assert!(resolve("H").is_none());
    }

    #[test]
    fn enharmonic_spellings_find_catalog_entries() {
        assert_eq!(resolve("Db"), resolve("C#"));
        assert_eq!(resolve("G#m"), resolve("Abm"));
        assert_eq!(resolve("A#7"), resolve("Bb7"));
        assert!(resolve("Gb").is_some());
    }

    #[test]
    fn multiple_voicings_are_ordered() {
        let c = resolve("C").unwrap();
        assert!(c.len() >= 2);
        assert_eq!(c[0].frets, [-1, 3, 2, 0, 1, 0]);
        assert!(c[1].base_fret > 1);
    }
}
