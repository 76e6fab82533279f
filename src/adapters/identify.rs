use crate::domain::model::{Student, StudentId};
use crate::domain::ports::{Identification, Identifier};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

/// Matches captures that carry a printed label, such as a badge showing the
/// roll number. Anything that is not a known label is reported as no match.
#[derive(Debug, Clone, Default)]
pub struct LabelIdentifier {
    labels: HashMap<String, StudentId>,
}

impl LabelIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_roster(students: &[Student]) -> Self {
        let labels = students
            .iter()
            .map(|s| (normalize(&s.roll_number), s.id.clone()))
            .collect();
        Self { labels }
    }

    pub fn register(&mut self, label: &str, student_id: StudentId) {
        self.labels.insert(normalize(label), student_id);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

fn normalize(label: &str) -> String {
    label.trim().to_ascii_uppercase()
}

#[async_trait]
impl Identifier for LabelIdentifier {
    async fn identify(&self, image: &[u8]) -> Result<Identification> {
        let Ok(label) = std::str::from_utf8(image) else {
            return Ok(Identification::NoMatch);
        };

        Ok(match self.labels.get(&normalize(label)) {
            Some(id) => Identification::Match(id.clone()),
            None => Identification::NoMatch,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_labels_match_case_insensitively() {
        let mut identifier = LabelIdentifier::new();
        identifier.register("CS2021001", StudentId::new("s-1"));

        assert_eq!(
            identifier.identify(b" cs2021001\n").await.unwrap(),
            Identification::Match(StudentId::new("s-1"))
        );
        assert_eq!(
            identifier.identify(b"EE2020042").await.unwrap(),
            Identification::NoMatch
        );
        assert_eq!(
            identifier.identify(&[0xff, 0xd8, 0xff]).await.unwrap(),
            Identification::NoMatch
        );
    }
}
