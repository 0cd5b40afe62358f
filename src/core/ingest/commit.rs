//! Upsert committer
//!
//! The insert/update split comes only from what the destination reports for
//! the merge statement.

use super::staging::StagingLoader;
use crate::adapters::database::AffectedRow;
use crate::domain::Result;

/// Destination identifiers touched by a job, each list ascending
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitOutcome {
    pub inserted: Vec<i64>,
    pub updated: Vec<i64>,
}

impl CommitOutcome {
    pub fn from_affected(rows: &[AffectedRow]) -> Self {
        let (inserted, updated): (Vec<AffectedRow>, Vec<AffectedRow>) =
            rows.iter().partition(|row| row.inserted);
        let mut inserted: Vec<i64> = inserted.into_iter().map(|r| r.id).collect();
        let mut updated: Vec<i64> = updated.into_iter().map(|r| r.id).collect();
        inserted.sort_unstable();
        updated.sort_unstable();
        Self { inserted, updated }
    }

    pub fn total(&self) -> usize {
        self.inserted.len() + self.updated.len()
    }
}

/// Merges a job's staging area into the destination and commits
///
/// On error the transaction is already rolled back and nothing is applied.
pub async fn commit(loader: StagingLoader) -> Result<CommitOutcome> {
    let affected = loader.into_session().commit().await?;
    Ok(CommitOutcome::from_affected(&affected))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_sorted() {
        let rows = [
            AffectedRow { id: 9, inserted: true },
            AffectedRow { id: 4, inserted: false },
            AffectedRow { id: 2, inserted: true },
            AffectedRow { id: 1, inserted: false },
        ];
        let outcome = CommitOutcome::from_affected(&rows);
        assert_eq!(outcome.inserted, vec![2, 9]);
        assert_eq!(outcome.updated, vec![1, 4]);
        assert_eq!(outcome.total(), 4);
    }

    #[test]
    fn test_empty() {
        assert_eq!(CommitOutcome::from_affected(&[]), CommitOutcome::default());
    }
}
