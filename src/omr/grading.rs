//! # Grading
//!
//! Compares the extracted answers against an answer key.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use super::types::AnswerResult;
use crate::errors::AppError;
use crate::scan_errors::ScanError;

/// Correct option index per question, in question order.
///
/// Parsed from a comma-separated list of 0-based indices (`2,0,4`) or
/// option letters (`C,A,E`), case-insensitive.
///
/// # Examples
///
/// ```
/// use answer_sheet_scanner::omr::AnswerKey;
///
/// let key: AnswerKey = "2,0,4,1,3".parse().unwrap();
/// assert_eq!(key.answers(), &[2, 0, 4, 1, 3]);
///
/// let letters: AnswerKey = "c, a, E".parse().unwrap();
/// assert_eq!(letters.answers(), &[2, 0, 4]);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKey {
    answers: Vec<usize>,
}

impl AnswerKey {
    pub fn new(answers: Vec<usize>) -> Self {
        Self { answers }
    }

    pub fn answers(&self) -> &[usize] {
        &self.answers
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Rejects entries that point past the last option of a row.
    pub fn validate(&self, options_per_row: usize) -> Result<(), AppError> {
        match self
            .answers
            .iter()
            .enumerate()
            .find(|&(_, &answer)| answer >= options_per_row)
        {
            Some((question, answer)) => Err(AppError::Validation(format!(
                "answer {} for question {} exceeds the {} options per row",
                answer,
                question + 1,
                options_per_row
            ))),
            None => Ok(()),
        }
    }
}

impl FromStr for AnswerKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let answers = s
            .split(',')
            .map(str::trim)
            .enumerate()
            .map(|(position, entry)| parse_entry(entry, position))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(answers))
    }
}

fn parse_entry(entry: &str, position: usize) -> Result<usize, AppError> {
    if let Ok(index) = entry.parse::<usize>() {
        return Ok(index);
    }

    let mut chars = entry.chars();
    match (chars.next(), chars.next()) {
        (Some(letter), None) if letter.is_ascii_alphabetic() => {
            Ok((letter.to_ascii_uppercase() as u8 - b'A') as usize)
        }
        _ => Err(AppError::Validation(format!(
            "invalid answer key entry '{}' at position {}",
            entry,
            position + 1
        ))),
    }
}

impl fmt::Display for AnswerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries: Vec<String> = self.answers.iter().map(usize::to_string).collect();
        write!(f, "{}", entries.join(","))
    }
}

/// Outcome for a single question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionGrade {
    pub question: usize,
    pub selected: usize,
    pub expected: usize,
    pub correct: bool,
}

/// Score of one sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeReport {
    pub correct: usize,
    pub total: usize,
    pub score_percent: f64,
    pub questions: Vec<QuestionGrade>,
}

/// Grades `answers` against `key`.
///
/// # Errors
///
/// Returns `ScanError::AnswerKeyMismatch` when the key does not have exactly
/// one entry per detected question.
pub fn grade(answers: &AnswerResult, key: &AnswerKey) -> Result<GradeReport, ScanError> {
    if answers.len() != key.len() {
        return Err(ScanError::AnswerKeyMismatch {
            expected: key.len(),
            actual: answers.len(),
        });
    }

    let questions: Vec<QuestionGrade> = answers
        .rows
        .iter()
        .zip(key.answers())
        .map(|(row, &expected)| QuestionGrade {
            question: row.question,
            selected: row.selected,
            expected,
            correct: row.selected == expected,
        })
        .collect();

    let correct = questions.iter().filter(|q| q.correct).count();
    let total = questions.len();
    let score_percent = if total == 0 {
        0.0
    } else {
        correct as f64 * 100.0 / total as f64
    };

    Ok(GradeReport {
        correct,
        total,
        score_percent,
        questions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::omr::types::RowReading;

    fn answers(selected: &[usize]) -> AnswerResult {
        AnswerResult {
            rows: selected
                .iter()
                .enumerate()
                .map(|(question, &selected)| RowReading {
                    question,
                    selected,
                    fill_counts: vec![0; 5],
                })
                .collect(),
        }
    }

    #[test]
    fn test_parse_numeric_and_letter_keys() {
        let key: AnswerKey = "1, 4,0 ,2,3".parse().expect("numeric key should parse");
        assert_eq!(key.answers(), &[1, 4, 0, 2, 3]);

        let key: AnswerKey = "B,e,A,c,D".parse().expect("letter key should parse");
        assert_eq!(key.answers(), &[1, 4, 0, 2, 3]);
        assert_eq!(key.to_string(), "1,4,0,2,3");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for input in ["1,,2", "1,x2", "-1", ""] {
            let result = input.parse::<AnswerKey>();
            assert!(
                matches!(result, Err(AppError::Validation(_))),
                "'{}' should be rejected",
                input
            );
        }
    }

    #[test]
    fn test_validate_against_row_width() {
        let key = AnswerKey::new(vec![0, 4, 5]);
        assert!(key.validate(6).is_ok());
        assert!(matches!(key.validate(5), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_grade_counts_correct_answers() {
        let key = AnswerKey::new(vec![1, 4, 0, 2, 3]);
        let report = grade(&answers(&[1, 4, 0, 3, 3]), &key).expect("lengths match");

        assert_eq!(report.correct, 4);
        assert_eq!(report.total, 5);
        assert_eq!(report.score_percent, 80.0);
        assert!(!report.questions[3].correct);
        assert_eq!(report.questions[3].expected, 2);
    }

    #[test]
    fn test_grade_rejects_key_of_wrong_length() {
        let key = AnswerKey::new(vec![1, 4, 0]);
        assert_eq!(
            grade(&answers(&[1, 4, 0, 2, 3]), &key),
            Err(ScanError::AnswerKeyMismatch {
                expected: 3,
                actual: 5
            })
        );
    }
}
