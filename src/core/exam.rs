// exam grading

use serde::Serialize;

use super::model::ExamSection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamScore {
    pub correct: usize,
    pub total: usize,
    /// Whole percent, rounded down.
    pub percent: u8,
    pub passed: bool,
}

/// Grade one attempt. `answers[i]` is the chosen option for question `i`;
/// `None` or a missing entry counts as wrong, extra entries are ignored.
pub fn grade(exam: &ExamSection, answers: &[Option<usize>]) -> ExamScore {
    let total = exam.correct_answers.len();
    let correct = exam
        .correct_answers
        .iter()
        .enumerate()
        .filter(|(i, expected)| answers.get(*i).copied().flatten() == Some(**expected))
        .count();

    let percent = if total == 0 {
        0
    } else {
        (correct * 100 / total) as u8
    };

    ExamScore {
        correct,
        total,
        percent,
        passed: total > 0 && percent >= exam.passing_score,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn exam(correct: Vec<usize>, passing: u8) -> ExamSection {
        let n = correct.len();
        ExamSection {
            id: "e1".into(),
            title: "Quiz".into(),
            description: String::new(),
            questions: vec!["q".into(); n],
            options: vec![vec!["a".into(), "b".into(), "c".into()]; n],
            correct_answers: correct,
            time_limit: 30,
            passing_score: passing,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn percent_rounds_down() {
        let score = grade(&exam(vec![0, 1, 2], 70), &[Some(0), Some(1), Some(0)]);
        assert_eq!(score.correct, 2);
        assert_eq!(score.percent, 66);
        assert!(!score.passed);
    }

    #[test]
    fn passing_is_inclusive() {
        let exam = exam(vec![0, 0, 0, 0, 0, 0, 0, 0, 0, 0], 70);
        let mut answers = vec![Some(0); 7];
        answers.extend([Some(1), Some(1), None]);
        let score = grade(&exam, &answers);
        assert_eq!(score.percent, 70);
        assert!(score.passed);
    }

    #[test]
    fn missing_answers_are_wrong_and_extras_ignored() {
        let score = grade(&exam(vec![1, 1], 50), &[Some(1)]);
        assert_eq!(score.correct, 1);
        assert!(score.passed);

        let score = grade(&exam(vec![1], 50), &[Some(1), Some(2), Some(0)]);
        assert_eq!((score.correct, score.total), (1, 1));
    }

    #[test]
    fn empty_exam_never_passes() {
        let score = grade(&exam(vec![], 0), &[]);
        assert_eq!(score.percent, 0);
        assert!(!score.passed);
    }
}
