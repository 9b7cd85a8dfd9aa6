//! The eight fixed performance criteria.
//!
//! Criterion ids are stable: they match the `criteria_id` column the
//! reporting queries group on, so the payload-field-to-id mapping lives
//! here and nowhere else.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Criterion {
    JobKnowledge,
    WorkQuality,
    Productivity,
    Communication,
    Teamwork,
    ProblemSolving,
    Initiative,
    Adaptability,
}

impl Criterion {
    pub const ALL: [Criterion; 8] = [
        Criterion::JobKnowledge,
        Criterion::WorkQuality,
        Criterion::Productivity,
        Criterion::Communication,
        Criterion::Teamwork,
        Criterion::ProblemSolving,
        Criterion::Initiative,
        Criterion::Adaptability,
    ];

    pub fn id(self) -> i32 {
        match self {
            Criterion::JobKnowledge => 1,
            Criterion::WorkQuality => 2,
            Criterion::Productivity => 3,
            Criterion::Communication => 4,
            Criterion::Teamwork => 5,
            Criterion::ProblemSolving => 6,
            Criterion::Initiative => 7,
            Criterion::Adaptability => 8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_one_through_eight_in_order() {
        let ids: Vec<i32> = Criterion::ALL.iter().map(|c| c.id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
