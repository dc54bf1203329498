use super::estimator::ErrorRecord;

/// Relative difference below which two element contributions are considered equal
pub const TIE_TOLERANCE: f64 = 1e-3;

/// Rules for choosing which elements to refine from a ranked list of [ErrorRecord]s
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// (0) Refine the largest contributors until `sqrt(threshold)` of the total error has been processed
    ProcessedFraction,
    /// (1) Refine every element whose contribution exceeds `threshold` times the largest contribution
    RelativeToMax,
    /// (2) Refine every element whose contribution exceeds `threshold`
    Absolute,
}

impl Strategy {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::ProcessedFraction),
            1 => Some(Self::RelativeToMax),
            2 => Some(Self::Absolute),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            Self::ProcessedFraction => 0,
            Self::RelativeToMax => 1,
            Self::Absolute => 2,
        }
    }

    /// Select elements from `records`, which must be sorted by descending contribution
    ///
    /// Returns the selected element ids in ranking order.
    pub fn select(&self, records: &[ErrorRecord], threshold: f64) -> Vec<usize> {
        match self {
            Self::ProcessedFraction => {
                let total: f64 = records.iter().map(ErrorRecord::contribution).sum();
                let bound = threshold.sqrt() * total;

                let mut processed = 0.0;
                let mut last: Option<f64> = None;
                let mut selected = Vec::new();

                for record in records {
                    let c = record.contribution();
                    let tied = last.map_or(false, |l| is_tied(l, c));
                    if (processed >= bound && !tied) || c <= 0.0 {
                        break;
                    }
                    processed += c;
                    last = Some(c);
                    selected.push(record.elem_id);
                }

                selected
            }
            Self::RelativeToMax => {
                let max = records.first().map_or(0.0, ErrorRecord::contribution);
                records
                    .iter()
                    .take_while(|r| r.contribution() > threshold * max)
                    .map(|r| r.elem_id)
                    .collect()
            }
            Self::Absolute => records
                .iter()
                .take_while(|r| r.contribution() > threshold)
                .map(|r| r.elem_id)
                .collect(),
        }
    }
}

fn is_tied(reference: f64, other: f64) -> bool {
    reference > 0.0 && ((reference - other) / reference).abs() <= TIE_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records(relative_errors: &[f64]) -> Vec<ErrorRecord> {
        relative_errors
            .iter()
            .enumerate()
            .map(|(elem_id, r)| ErrorRecord {
                elem_id,
                absolute: *r,
                relative: *r,
            })
            .collect()
    }

    fn from_contributions(contributions: &[f64]) -> Vec<ErrorRecord> {
        records(&contributions.iter().map(|c| c.sqrt()).collect::<Vec<_>>())
    }

    #[test]
    fn codes() {
        for code in 0..3 {
            assert_eq!(Strategy::from_code(code).unwrap().code() as i64, code);
        }
        assert_eq!(Strategy::from_code(-1), None);
        assert_eq!(Strategy::from_code(3), None);
    }

    #[test]
    fn relative_to_max() {
        // contributions: 16, 9, 4, 2.25, 1
        let recs = records(&[4.0, 3.0, 2.0, 1.5, 1.0]);
        assert_eq!(Strategy::RelativeToMax.select(&recs, 0.3), vec![0, 1]);
        assert_eq!(Strategy::RelativeToMax.select(&recs, 0.0), vec![0, 1, 2, 3, 4]);
        assert!(Strategy::RelativeToMax.select(&recs, 1.0).is_empty());
    }

    #[test]
    fn relative_to_max_bound_is_exclusive() {
        let recs = records(&[2.0, 1.0, 0.5]);
        assert_eq!(Strategy::RelativeToMax.select(&recs, 0.25), vec![0]);
    }

    #[test]
    fn absolute() {
        let recs = records(&[4.0, 3.0, 2.0, 1.5, 1.0]);
        assert_eq!(Strategy::Absolute.select(&recs, 2.5), vec![0, 1, 2]);
        assert_eq!(Strategy::Absolute.select(&recs, 4.0), vec![0, 1]);
        assert!(Strategy::Absolute.select(&recs, 16.0).is_empty());
    }

    #[test]
    fn processed_fraction() {
        // total 20, sqrt(0.25) * 20 = 10
        let recs = from_contributions(&[6.0, 5.0, 4.0, 3.0, 2.0]);
        let selected = Strategy::ProcessedFraction.select(&recs, 0.25);
        assert_eq!(selected, vec![0, 1]);

        let processed: f64 = selected.iter().map(|id| recs[*id].contribution()).sum();
        assert!(processed >= 10.0);
        assert!(processed - recs[1].contribution() < 10.0);
    }

    #[test]
    fn processed_fraction_includes_ties() {
        let recs = from_contributions(&[6.0, 5.0, 5.0 * (1.0 - 5e-4), 4.0, 1.0]);
        assert_eq!(Strategy::ProcessedFraction.select(&recs, 0.25), vec![0, 1, 2]);
    }

    #[test]
    fn nothing_to_select() {
        let recs = records(&[0.0, 0.0, 0.0]);
        for strategy in [
            Strategy::ProcessedFraction,
            Strategy::RelativeToMax,
            Strategy::Absolute,
        ] {
            assert!(strategy.select(&recs, 0.3).is_empty());
            assert!(strategy.select(&[], 0.3).is_empty());
        }
    }
}
