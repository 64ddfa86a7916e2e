use std::cmp::Ordering;
use std::collections::HashMap;

/// Relevance scores keyed by candidate id.
///
/// Scores are non-negative. A sheet carries no ordering of its own; use
/// [`rank`] to derive one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreSheet {
    scores: HashMap<String, f64>,
}

impl ScoreSheet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a score, clamping negatives and NaN to zero. A later insert for
    /// the same id replaces the earlier one.
    pub fn insert(&mut self, id: impl Into<String>, score: f64) {
        let score = if score.is_nan() { 0.0 } else { score.max(0.0) };
        self.scores.insert(id.into(), score);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<f64> {
        self.scores.get(id).copied()
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.scores.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.scores.iter().map(|(id, score)| (id.as_str(), *score))
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for ScoreSheet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut sheet = Self::new();
        for (id, score) in iter {
            sheet.insert(id, score);
        }
        sheet
    }
}

/// Every id's contributions across `sheets`, each list sorted ascending.
///
/// Summing a sorted list makes the total independent of sheet order.
fn contributions(sheets: &[ScoreSheet]) -> HashMap<&str, Vec<f64>> {
    let mut by_id: HashMap<&str, Vec<f64>> = HashMap::new();
    for sheet in sheets {
        for (id, score) in sheet.iter() {
            by_id.entry(id).or_default().push(score);
        }
    }
    for values in by_id.values_mut() {
        values.sort_by(f64::total_cmp);
    }
    by_id
}

/// Per id, the sum of its scores across all sheets.
///
/// The result does not depend on the order of `sheets`.
#[must_use]
pub fn merge(sheets: &[ScoreSheet]) -> ScoreSheet {
    contributions(sheets)
        .into_iter()
        .map(|(id, values)| (id, values.iter().sum::<f64>()))
        .collect()
}

/// Per id, the mean of its scores over the sheets it appears in.
///
/// Sheets that do not mention an id do not dilute its average.
#[must_use]
pub fn average(sheets: &[ScoreSheet]) -> ScoreSheet {
    contributions(sheets)
        .into_iter()
        .map(|(id, values)| {
            let total: f64 = values.iter().sum();
            (id, total / values.len() as f64)
        })
        .collect()
}

/// Ids of `sheet` by descending score.
///
/// Ties keep their position in `insertion_order`. Ids missing from
/// `insertion_order` come after all known ids, ordered by id.
#[must_use]
pub fn rank<S: AsRef<str>>(sheet: &ScoreSheet, insertion_order: &[S]) -> Vec<String> {
    let position: HashMap<&str, usize> = insertion_order
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_ref(), idx))
        .rev()
        .collect();

    let mut ranked: Vec<(&str, f64, Option<usize>)> = sheet
        .iter()
        .map(|(id, score)| (id, score, position.get(id).copied()))
        .collect();

    ranked.sort_by(|a, b| {
        b.1.total_cmp(&a.1).then_with(|| match (a.2, b.2) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.0.cmp(b.0),
        })
    });

    ranked.into_iter().map(|(id, _, _)| id.to_string()).collect()
}
