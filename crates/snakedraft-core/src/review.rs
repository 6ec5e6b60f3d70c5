// Post-draft review scoring: every participant rates a watched entry and
// the panel's score is their mean, rounded down to a half point.

use thiserror::Error;
use tracing::debug;

use crate::pool::ListEntry;
use crate::selector::Person;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 5.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReviewError {
    #[error("score {0} is outside 0..=5")]
    ScoreOutOfRange(f64),

    #[error("no reviewer with color '{0}'")]
    UnknownReviewer(String),

    #[error("still waiting on scores from {}", .0.join(", "))]
    MissingScores(Vec<String>),

    #[error("a review needs at least one reviewer")]
    NoReviewers,
}

/// One participant's seat on the review panel.
#[derive(Debug, Clone, PartialEq)]
pub struct Reviewer {
    pub person: Person,
    pub score: Option<f64>,
}

impl Reviewer {
    fn has_color(&self, color: &str) -> bool {
        self.person.color.eq_ignore_ascii_case(color)
    }
}

/// Scores for a single entry. Each reviewer holds at most one score.
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    entry: ListEntry,
    reviewers: Vec<Reviewer>,
}

impl Review {
    pub fn new(entry: ListEntry, people: impl IntoIterator<Item = Person>) -> Self {
        Review {
            entry,
            reviewers: people
                .into_iter()
                .map(|person| Reviewer { person, score: None })
                .collect(),
        }
    }

    pub fn entry(&self) -> &ListEntry {
        &self.entry
    }

    pub fn reviewers(&self) -> &[Reviewer] {
        &self.reviewers
    }

    /// Record `score` for the reviewer with `color`, replacing any earlier
    /// score. Returns the replaced score.
    pub fn add_or_replace_score(
        &mut self,
        color: &str,
        score: f64,
    ) -> Result<Option<f64>, ReviewError> {
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ReviewError::ScoreOutOfRange(score));
        }
        let reviewer = find_reviewer(&mut self.reviewers, color)?;
        let previous = reviewer.score.replace(score);
        debug!(
            "{} scored '{}' {} (was {:?})",
            reviewer.person.name, self.entry.title, score, previous
        );
        Ok(previous)
    }

    pub fn remove_score(&mut self, color: &str) -> Result<Option<f64>, ReviewError> {
        Ok(find_reviewer(&mut self.reviewers, color)?.score.take())
    }

    /// Names of reviewers who have not scored yet.
    pub fn missing(&self) -> Vec<String> {
        self.reviewers
            .iter()
            .filter(|r| r.score.is_none())
            .map(|r| r.person.name.clone())
            .collect()
    }

    /// The panel's score: the mean of every reviewer's score, rounded down
    /// to the nearest half point.
    pub fn finish(&self) -> Result<f64, ReviewError> {
        if self.reviewers.is_empty() {
            return Err(ReviewError::NoReviewers);
        }
        let missing = self.missing();
        if !missing.is_empty() {
            return Err(ReviewError::MissingScores(missing));
        }
        let total: f64 = self.reviewers.iter().filter_map(|r| r.score).sum();
        let mean = total / self.reviewers.len() as f64;
        Ok((mean * 2.0).floor() / 2.0)
    }
}

fn find_reviewer<'a>(
    reviewers: &'a mut [Reviewer],
    color: &str,
) -> Result<&'a mut Reviewer, ReviewError> {
    reviewers
        .iter_mut()
        .find(|r| r.has_color(color))
        .ok_or_else(|| ReviewError::UnknownReviewer(color.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn film() -> ListEntry {
        ListEntry {
            position: 4,
            title: "Dr. Strangelove".into(),
            year: "1964".into(),
            url_slug: "dr-strangelove".into(),
            poster_url: String::new(),
            suggested_by: None,
            disabled: false,
        }
    }

    fn panel() -> Review {
        Review::new(
            film(),
            vec![
                Person::new("Ann", "#e6194b", "#ffffff"),
                Person::new("Ben", "#3cb44b", "#000000"),
                Person::new("Cat", "#4363d8", "#ffffff"),
            ],
        )
    }

    #[test]
    fn mean_rounds_down_to_half_points() {
        let mut review = panel();
        review.add_or_replace_score("#e6194b", 2.5).unwrap();
        review.add_or_replace_score("#3cb44b", 3.69).unwrap();
        review.add_or_replace_score("#4363d8", 5.0).unwrap();
        // 11.19 / 3 = 3.73
        assert_eq!(review.finish(), Ok(3.5));

        review.add_or_replace_score("#4363d8", 4.0).unwrap();
        // 10.19 / 3 = 3.39
        assert_eq!(review.finish(), Ok(3.0));
    }

    #[test]
    fn whole_and_half_means_are_kept() {
        let mut review = panel();
        for color in ["#e6194b", "#3cb44b", "#4363d8"] {
            review.add_or_replace_score(color, 4.5).unwrap();
        }
        assert_eq!(review.finish(), Ok(4.5));
    }

    #[test]
    fn scores_outside_range_are_rejected() {
        let mut review = panel();
        assert_eq!(
            review.add_or_replace_score("#e6194b", 6.0),
            Err(ReviewError::ScoreOutOfRange(6.0))
        );
        assert!(review.add_or_replace_score("#e6194b", -0.5).is_err());
        assert!(review.add_or_replace_score("#e6194b", f64::NAN).is_err());
        assert_eq!(review.reviewers()[0].score, None);

        assert_eq!(review.add_or_replace_score("#e6194b", 0.0), Ok(None));
        assert_eq!(review.add_or_replace_score("#e6194b", 5.0), Ok(Some(0.0)));
    }

    #[test]
    fn replacing_a_score_does_not_count_twice() {
        let mut review = Review::new(film(), vec![Person::new("Ann", "#e6194b", "#ffffff")]);
        review.add_or_replace_score("#E6194B", 1.0).unwrap();
        review.add_or_replace_score("#e6194b", 3.0).unwrap();
        assert_eq!(review.finish(), Ok(3.0));
    }

    #[test]
    fn unknown_reviewer_is_an_error() {
        let mut review = panel();
        assert_eq!(
            review.add_or_replace_score("#000000", 3.0),
            Err(ReviewError::UnknownReviewer("#000000".into()))
        );
        assert!(review.remove_score("#000000").is_err());
    }

    #[test]
    fn finish_waits_for_every_reviewer() {
        let mut review = panel();
        review.add_or_replace_score("#e6194b", 3.0).unwrap();
        assert_eq!(
            review.finish(),
            Err(ReviewError::MissingScores(vec!["Ben".into(), "Cat".into()]))
        );

        review.add_or_replace_score("#3cb44b", 3.0).unwrap();
        review.add_or_replace_score("#4363d8", 3.0).unwrap();
        assert_eq!(review.remove_score("#3cb44b"), Ok(Some(3.0)));
        assert_eq!(review.remove_score("#3cb44b"), Ok(None));
        assert_eq!(
            review.finish(),
            Err(ReviewError::MissingScores(vec!["Ben".into()]))
        );
    }

    #[test]
    fn empty_panel_cannot_finish() {
        let review = Review::new(film(), Vec::new());
        assert_eq!(review.finish(), Err(ReviewError::NoReviewers));
    }
}
