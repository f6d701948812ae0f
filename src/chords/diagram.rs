use crate::chords::catalog::Voicing;

/// Fret rows drawn below the nut.
pub const FRETS_SHOWN: i8 = 4;

/// Draw a voicing as a small text fretboard, low E on the left.
///
/// ```text
///  Am
///  x o       o
///  ===========
///  | | | | 1 |
///  | | 2 3 | |
///  | | | | | |
///  | | | | | |
/// ```
pub fn render(name: &str, voicing: &Voicing) -> Vec<String> {
    let mut out = Vec::with_capacity(FRETS_SHOWN as usize + 3);
    out.push(name.to_string());

    let markers: Vec<String> = voicing
        .frets
        .iter()
        .map(|f| match f {
            -1 => "x".to_string(),
            0 => "o".to_string(),
            _ => " ".to_string(),
        })
        .collect();
    out.push(markers.join(" ").trim_end().to_string());

    if voicing.base_fret <= 1 {
        out.push("=".repeat(11));
    } else {
        out.push(format!("{} {}fr", "-".repeat(11), voicing.base_fret));
    }

    for row in 1..=FRETS_SHOWN {
        let cells: Vec<String> = voicing
            .frets
            .iter()
            .zip(voicing.fingers.iter())
            .map(|(&fret, &finger)| {
                if fret == row {
                    if finger > 0 {
                        finger.to_string()
                    } else {
                        "*".to_string()
                    }
                } else {
                    "|".to_string()
                }
            })
            .collect();
        let mut line = cells.join(" ");
        if voicing.barres.contains(&(row as u8)) {
            line.push_str("  barre");
        }
        out.push(line);
    }
    if voicing.capo {
        out.push("capo".to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chords::resolve;

    #[test]
    fn draws_open_a_minor() {
        let am = &resolve("Am").unwrap()[0];
        let lines = render("Am", am);
        assert_eq!(
            lines,
            vec![
                "Am",
                "x o       o",
                "===========",
                "| | | | 1 |",
                "| | 2 3 | |",
                "| | | | | |",
                "| | | | | |",
            ]
        );
    }

    #[test]
    fn barre_shapes_show_base_fret() {
        let voicings = resolve("Bm").unwrap();
        let lines = render("Bm", &voicings[0]);
        assert!(lines[2].ends_with(&format!("{}fr", voicings[0].base_fret)));
        assert!(lines[3].ends_with("barre"));
    }
}
