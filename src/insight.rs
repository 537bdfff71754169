//! Maps scores into user-facing text: percentage bars plus a small rule
//! table of canned phrases. When the remote classifier answered, its
//! suggestions replace the rule table wholesale.

use crate::metrics::Scores;
use crate::remote::Verdict;

const BAR_SLOTS: usize = 20;

pub fn insights(scores: &Scores, remote: Option<&Verdict>) -> Vec<String> {
    if let Some(verdict) = remote {
        if !verdict.suggestions.is_empty() {
            return verdict.suggestions.clone();
        }
    }

    let mut out = Vec::new();
    if scores.symmetry >= 90 {
        out.push("Facial proportions are close to mirror-symmetric.".to_string());
    } else if scores.symmetry < 70 {
        out.push("Left and right proportions differ noticeably in this shot.".to_string());
    }

    if scores.oiliness >= 60 {
        out.push("Strong shine across the forehead; a mattifier would help.".to_string());
    } else if scores.oiliness <= 15 {
        out.push("Forehead reads matte in this light.".to_string());
    }

    if scores.texture >= 55 {
        out.push("Cheek surface shows pronounced texture.".to_string());
    } else if scores.texture <= 20 {
        out.push("Cheek surface reads smooth.".to_string());
    }

    if scores.beard >= 40 {
        out.push("Dense beard shadow along the jaw.".to_string());
    } else if scores.beard >= 15 {
        out.push("Light stubble is visible on the lower face.".to_string());
    }

    if out.is_empty() {
        out.push("Everything in the mid range; nothing stands out.".to_string());
    }
    out
}

/// Terminal percentage bar, e.g. `oiliness  [########------------]  42%`.
pub fn score_bar(label: &str, value: u8) -> String {
    let filled = (value as usize * BAR_SLOTS) / 100;
    let mut bar = String::with_capacity(BAR_SLOTS);
    for slot in 0..BAR_SLOTS {
        bar.push(if slot < filled { '#' } else { '-' });
    }
    format!("{label:<9} [{bar}] {value:>3}%")
}
