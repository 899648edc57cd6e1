use crate::error::Result;
use crate::trainer::EpisodeRecord;

use serde::{Serialize, Deserialize};
use std::path::Path;

pub const MEAN_WINDOW: usize = 5;

/// One line of the score report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub episode: usize,
    pub score: i32,
    pub net_reward: f32,
    pub steps: usize,
    /// trailing mean of the score over the last `MEAN_WINDOW` episodes
    pub mean_score: f32,
}

/// Trailing mean; the first entries average over however many values exist so far.
pub fn moving_average(values: &[f32], window: usize) -> Vec<f32> {
    let window = window.max(1);
    (0..values.len())
        .map(|i| {
            let start = (i + 1).saturating_sub(window);
            let slice = &values[start..=i];
            slice.iter().sum::<f32>() / slice.len() as f32
        })
        .collect()
}

pub fn score_rows(records: &[EpisodeRecord]) -> Vec<ScoreRow> {
    let scores: Vec<f32> = records.iter().map(|r| r.score as f32).collect();
    let means = moving_average(&scores, MEAN_WINDOW);

    records.iter()
        .zip(means)
        .map(|(record, mean_score)| ScoreRow {
            episode: record.episode + 1,
            score: record.score,
            net_reward: record.net_reward,
            steps: record.steps,
            mean_score,
        })
        .collect()
}

pub fn write_scores_csv<P: AsRef<Path>>(path: P, records: &[EpisodeRecord]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for row in score_rows(records) {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_scores_csv<P: AsRef<Path>>(path: P) -> Result<Vec<ScoreRow>> {
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader.deserialize().collect::<std::result::Result<Vec<ScoreRow>, _>>()?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use rstest::rstest;

    fn assert_vec_approx_eq(a: &[f32], b: &[f32], epsilon: f32) {
        assert_eq!(a.len(), b.len(), "Vector lengths differ");
        for (i, (x, y)) in a.iter().zip(b.iter()).enumerate() {
            assert!((x - y).abs() < epsilon, "Mismatch at index {}: {} vs {}", i, x, y);
        }
    }

    fn record(episode: usize, score: i32) -> EpisodeRecord {
        EpisodeRecord { episode, net_reward: score as f32 * 200.0 - 10.0, score, steps: 10 + episode }
    }

    #[rstest]
    #[case(vec![], 5, vec![])]
    #[case(vec![4.0], 5, vec![4.0])]
    #[case(vec![1.0, 2.0, 3.0], 1, vec![1.0, 2.0, 3.0])]
    #[case(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0], 5, vec![1.0, 1.5, 2.0, 2.5, 3.0, 4.0, 5.0])]
    #[case(vec![2.0, 4.0], 0, vec![2.0, 4.0])]
    fn test_moving_average(#[case] values: Vec<f32>, #[case] window: usize, #[case] expected: Vec<f32>) {
        assert_vec_approx_eq(&moving_average(&values, window), &expected, 1e-6);
    }

    #[test]
    fn test_write_and_read_scores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scores.csv");
        let records: Vec<EpisodeRecord> = [0, 2, 1, 5, 0, 3].iter().enumerate()
            .map(|(i, &score)| record(i, score))
            .collect();

        write_scores_csv(&path, &records).unwrap();
        let rows = read_scores_csv(&path).unwrap();

        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].episode, 1);
        assert_eq!(rows[3].score, 5);
        assert_eq!(rows[3].steps, 13);
        assert!((rows[5].mean_score - 11.0 / 5.0).abs() < 1e-6);

        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("episode,score,net_reward,steps,mean_score"));
    }

    #[test]
    fn test_write_to_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("scores.csv");
        assert!(matches!(write_scores_csv(&path, &[record(0, 1)]), Err(Error::Csv(_))));
    }
}
